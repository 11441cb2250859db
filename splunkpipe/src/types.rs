use std::fmt::Display;

use serde::Serialize;

/// Severity of a log record, as reported by the host logging framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Chatty development output
    Trace,
    /// Diagnostic output
    Debug,
    /// Normal operational output
    Information,
    /// Something looks off
    Warning,
    /// Something failed
    Error,
    /// The process is in trouble
    Critical,
}

impl Severity {
    /// an &str view of the severity
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "Trace",
            Severity::Debug => "Debug",
            Severity::Information => "Information",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Critical => "Critical",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identifier for metrics and dimension names.
#[derive(Debug, Clone)]
pub enum Name {
    /// A static string name. Feel really good about these.
    Str(&'static str),
    /// A String name. Avoid these when you can, because clones can add up.
    String(String),
}

impl Name {
    /// an &str view of the name
    pub fn as_str(&self) -> &str {
        match self {
            Name::Str(s) => s,
            Name::String(s) => s,
        }
    }
}

// Names compare, hash, and order by their text - not by which variant
// carries it - so key encoding is canonical either way.
impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Name {}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        match name {
            Name::Str(s) => s.to_owned(),
            Name::String(s) => s,
        }
    }
}

impl From<&'static str> for Name {
    #[inline]
    fn from(s: &'static str) -> Self {
        Self::Str(s)
    }
}

impl From<String> for Name {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// The value part of a dimension's key/value pair.
#[derive(Debug, Eq, Hash, PartialEq, Clone)]
pub enum Dimension {
    /// A static string dimension.
    Str(&'static str),
    /// Avoid String dimensions when you can, as clones can add up.
    String(String),
    /// A number dimension.
    Number(u64),
    /// A boolean dimension.
    Boolean(bool),
}

impl Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Str(s) => write!(f, "{s}"),
            Dimension::String(s) => write!(f, "{s}"),
            Dimension::Number(n) => write!(f, "{n}"),
            Dimension::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&'static str> for Dimension {
    #[inline]
    fn from(s: &'static str) -> Self {
        Self::Str(s)
    }
}

impl From<String> for Dimension {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<u64> for Dimension {
    #[inline]
    fn from(n: u64) -> Self {
        Dimension::Number(n)
    }
}

impl From<u32> for Dimension {
    #[inline]
    fn from(n: u32) -> Self {
        Dimension::Number(n as u64)
    }
}

impl From<bool> for Dimension {
    #[inline]
    fn from(b: bool) -> Self {
        Dimension::Boolean(b)
    }
}

/// One structured submission for the HEC event endpoint.
///
/// Optional fields are omitted from the serialized envelope when they are
/// empty or zero, matching what the collector expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HecEvent {
    /// Text to be used at event.
    pub event: String,
    /// Event epoch time, seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    /// Host entry value.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    /// Source entry value.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    /// Sourcetype entry value.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sourcetype: String,
    /// Index entry value.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub index: String,
}

impl HecEvent {
    /// An envelope carrying only event text.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            time: None,
            host: String::new(),
            source: String::new(),
            sourcetype: String::new(),
            index: String::new(),
        }
    }

    /// Stamp the envelope with an epoch time. Zero means "not stamped".
    pub fn at_epoch_seconds(mut self, time: u64) -> Self {
        if time > 0 {
            self.time = Some(time);
        }
        self
    }
}

/// What producers hand to the event buffer: either a pre-rendered line or a
/// structured envelope. The decision is made once, at the producer boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryRecord {
    /// A pre-rendered text line
    Text(String),
    /// A structured HEC envelope
    Event(HecEvent),
}

impl TelemetryRecord {
    /// The record as one wire line, for line-oriented transports.
    pub fn into_wire_line(self) -> String {
        match self {
            TelemetryRecord::Text(line) => line,
            TelemetryRecord::Event(event) => {
                serde_json::to_string(&event).expect("hec envelope serializes")
            }
        }
    }

    /// The record as a structured envelope, for the HEC event transport.
    pub fn into_event(self) -> HecEvent {
        match self {
            TelemetryRecord::Text(line) => HecEvent::new(line),
            TelemetryRecord::Event(event) => event,
        }
    }
}

impl From<String> for TelemetryRecord {
    #[inline]
    fn from(line: String) -> Self {
        TelemetryRecord::Text(line)
    }
}

impl From<&str> for TelemetryRecord {
    #[inline]
    fn from(line: &str) -> Self {
        TelemetryRecord::Text(line.to_owned())
    }
}

impl From<HecEvent> for TelemetryRecord {
    #[inline]
    fn from(event: HecEvent) -> Self {
        TelemetryRecord::Event(event)
    }
}

#[cfg(test)]
mod test {
    use super::HecEvent;

    #[test_log::test]
    fn envelope_omits_empty_optionals() {
        let json = serde_json::to_string(&HecEvent::new("hello")).expect("serializes");
        assert_eq!(r#"{"event":"hello"}"#, json);
    }

    #[test_log::test]
    fn envelope_keeps_populated_fields() {
        let mut event = HecEvent::new("hello").at_epoch_seconds(1500000000);
        event.host = "web01".to_owned();
        event.sourcetype = "Log".to_owned();
        let json = serde_json::to_string(&event).expect("serializes");
        assert_eq!(
            r#"{"event":"hello","time":1500000000,"host":"web01","sourcetype":"Log"}"#,
            json
        );
    }

    #[test_log::test]
    fn zero_time_is_not_stamped() {
        let event = HecEvent::new("hello").at_epoch_seconds(0);
        assert_eq!(None, event.time);
    }
}
