//! The formatter capability: how one log record becomes wire content.
//!
//! The host adapter decides *when* to log; a formatter decides what the
//! shipped line looks like. Callers with opinions about their Splunk search
//! syntax bring their own implementation.

use crate::types::{HecEvent, Severity, TelemetryRecord};

/// One record as the host logging framework describes it, borrowed for the
/// duration of the format call.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    /// Category (usually the emitting module or type).
    pub category: &'a str,
    /// Record severity.
    pub severity: Severity,
    /// Host framework event id, zero when unused.
    pub event_id: u32,
    /// Host framework event name, empty when unused.
    pub event_name: &'a str,
    /// The message body.
    pub message: &'a str,
    /// The error being reported, if this record carries one.
    pub error: Option<&'a (dyn std::error::Error + 'static)>,
}

/// Renders one record to text, or to a structured envelope for the HEC
/// event endpoint.
pub trait LogFormatter {
    /// Render one record to a text line.
    fn render_text(&self, record: &LogRecord<'_>) -> String;

    /// Render one record to a structured envelope. The default wraps the
    /// text rendering.
    fn render_event(&self, record: &LogRecord<'_>) -> HecEvent {
        HecEvent::new(self.render_text(record))
    }
}

/// The stock rendering:
/// `{category}: [{severity}] [{event_id}:{event_name}] {message} {error}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicFormatter;

impl LogFormatter for BasicFormatter {
    fn render_text(&self, record: &LogRecord<'_>) -> String {
        let error = match record.error {
            Some(error) => error.to_string(),
            None => String::new(),
        };
        format!(
            "{}: [{}] [{}:{}] {} {}",
            record.category,
            record.severity,
            record.event_id,
            record.event_name,
            record.message,
            error,
        )
    }
}

/// Convenience for producers: render a record once, as text.
pub fn text_record(formatter: &impl LogFormatter, record: &LogRecord<'_>) -> TelemetryRecord {
    TelemetryRecord::Text(formatter.render_text(record))
}

/// Convenience for producers: render a record once, as an envelope.
pub fn event_record(formatter: &impl LogFormatter, record: &LogRecord<'_>) -> TelemetryRecord {
    TelemetryRecord::Event(formatter.render_event(record))
}
