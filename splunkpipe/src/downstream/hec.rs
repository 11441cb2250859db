//! Shared plumbing for the HEC transports: endpoint construction, fixed
//! request headers, and the response-status table.

use std::fmt::Display;
use std::fmt::Write as _;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use uuid::Uuid;

use crate::config::{ChannelIdMode, HecConfig, TokenPlacement};
use crate::errors::ConfigError;

/// What the collector said about a submission. Diagnostic only - nothing
/// downstream of this enum retries or blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStatus {
    /// 200
    Success,
    /// 201
    Created,
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 402
    PaymentRequired,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// 500
    InternalServerError,
    /// 503
    ServiceUnavailable,
    /// Anything else
    Unknown(u16),
}

impl CollectorStatus {
    /// Classify an HTTP status code.
    pub fn classify(code: u16) -> Self {
        match code {
            200 => CollectorStatus::Success,
            201 => CollectorStatus::Created,
            400 => CollectorStatus::BadRequest,
            401 => CollectorStatus::Unauthorized,
            402 => CollectorStatus::PaymentRequired,
            403 => CollectorStatus::Forbidden,
            404 => CollectorStatus::NotFound,
            409 => CollectorStatus::Conflict,
            500 => CollectorStatus::InternalServerError,
            503 => CollectorStatus::ServiceUnavailable,
            other => CollectorStatus::Unknown(other),
        }
    }

    /// True for 2xx outcomes.
    pub fn is_success(&self) -> bool {
        matches!(self, CollectorStatus::Success | CollectorStatus::Created)
    }

    fn describe(&self) -> &'static str {
        match self {
            CollectorStatus::Success => "request completed successfully",
            CollectorStatus::Created => "create request completed successfully",
            CollectorStatus::BadRequest => "request error, see response body for details",
            CollectorStatus::Unauthorized => "authentication failure, invalid access credentials",
            CollectorStatus::PaymentRequired => "in-use license disables this feature",
            CollectorStatus::Forbidden => "insufficient permission",
            CollectorStatus::NotFound => "requested endpoint does not exist",
            CollectorStatus::Conflict => "invalid operation for this endpoint",
            CollectorStatus::InternalServerError => "unspecified internal server error",
            CollectorStatus::ServiceUnavailable => "feature is disabled in configuration",
            CollectorStatus::Unknown(_) => "unrecognized response status",
        }
    }
}

impl Display for CollectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorStatus::Unknown(code) => write!(f, "{} ({code})", self.describe()),
            status => f.write_str(status.describe()),
        }
    }
}

/// Build the full endpoint url for one sink instance:
/// `{base}/{endpoint}[?channel=<id>][?&token=<token>]`, with the base
/// gaining a trailing `/` when it lacks one.
pub(crate) fn collector_endpoint(
    config: &HecConfig,
    endpoint: &str,
    channel: &Uuid,
) -> Result<reqwest::Url, ConfigError> {
    if config.collector_url.trim().is_empty() {
        return Err(ConfigError::MissingUrl);
    }
    if config.token.trim().is_empty() {
        return Err(ConfigError::MissingToken);
    }

    let mut url = config.collector_url.clone();
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(endpoint);

    if config.channel_id == ChannelIdMode::QueryString {
        write!(url, "?channel={channel}").expect("writing to a string");
    }
    if config.token_placement == TokenPlacement::QueryString {
        let separator = if url.contains('?') { '&' } else { '?' };
        write!(url, "{separator}token={}", config.token).expect("writing to a string");
    }

    reqwest::Url::parse(&url).map_err(|error| ConfigError::InvalidUrl {
        url,
        reason: error.to_string(),
    })
}

/// The fixed headers a sink carries on every request: auth (unless the
/// token rides the query string), the channel header when so configured,
/// and whatever extra headers the configuration asks for.
pub(crate) fn collector_headers(
    config: &HecConfig,
    channel: &Uuid,
) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();

    if config.token_placement == TokenPlacement::Header {
        let authorization = HeaderValue::from_str(&format!("Splunk {}", config.token))
            .map_err(|_| ConfigError::InvalidHeader {
                name: "authorization".to_owned(),
            })?;
        headers.insert(AUTHORIZATION, authorization);
    }

    if config.channel_id == ChannelIdMode::RequestHeader {
        let channel = HeaderValue::from_str(&channel.to_string()).map_err(|_| {
            ConfigError::InvalidHeader {
                name: "x-splunk-request-channel".to_owned(),
            }
        })?;
        headers.insert("x-splunk-request-channel", channel);
    }

    for (name, value) in &config.extra_headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| ConfigError::InvalidHeader {
                name: name.clone(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader {
                name: name.clone(),
            })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// One http client per sink, carrying the fixed headers and the configured
/// per-request timeout.
pub(crate) fn collector_client(
    config: &HecConfig,
    headers: HeaderMap,
) -> Result<reqwest::Client, ConfigError> {
    let mut builder = reqwest::Client::builder().default_headers(headers);
    if !config.request_timeout.is_zero() {
        builder = builder.timeout(config.request_timeout);
    }
    builder.build().map_err(ConfigError::HttpClient)
}
