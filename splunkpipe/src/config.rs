//! Configuration consumed by the transports and the batching engine.
//!
//! Loading these from files or environments is the host application's
//! business; the library only reads the values.

use std::time::Duration;

/// How an HTTP sink identifies its submission channel to the collector.
/// Older collector versions require a channel id to deduplicate raw-mode
/// submissions; newer ones ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelIdMode {
    /// No channel identification.
    #[default]
    None,
    /// `?channel=<id>` appended to the endpoint url, id fixed per sink.
    QueryString,
    /// An `x-splunk-request-channel` header added once at construction.
    RequestHeader,
}

/// Where the auth token travels on HTTP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPlacement {
    /// `Authorization: Splunk <token>` request header.
    #[default]
    Header,
    /// `token=<value>` query parameter.
    QueryString,
}

/// Configuration for the HEC transports (raw and event endpoints).
#[derive(Debug, Clone)]
pub struct HecConfig {
    /// Collector base url, e.g. `https://host:8088/services/collector`.
    pub collector_url: String,
    /// The HEC auth token.
    pub token: String,
    /// Channel identification mode.
    pub channel_id: ChannelIdMode,
    /// Auth token placement.
    pub token_placement: TokenPlacement,
    /// Extra fixed request headers, applied once at construction.
    pub extra_headers: Vec<(String, String)>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Flush when this many items are buffered.
    pub batch_size: usize,
    /// Flush at least this often while items are buffered.
    /// Zero disables the timer trigger, leaving only the size trigger.
    pub batch_interval: Duration,
}

impl HecConfig {
    /// A configuration with the stock thresholds: batches of 10, flushed at
    /// least every 5 seconds, requests timing out after 10.
    pub fn new(collector_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            collector_url: collector_url.into(),
            token: token.into(),
            channel_id: ChannelIdMode::default(),
            token_placement: TokenPlacement::default(),
            extra_headers: Vec::new(),
            request_timeout: Duration::from_millis(10000),
            batch_size: 10,
            batch_interval: Duration::from_millis(5000),
        }
    }
}

/// Configuration for the stream and datagram socket transports.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Remote host name or address.
    pub host: String,
    /// Remote port.
    pub port: u16,
}

impl SocketConfig {
    /// Address in `host:port` form, for connect calls and diagnostics.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
