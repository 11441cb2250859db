use thiserror::Error;

/// Fatal problems detected while constructing a transport. These surface to
/// the caller at wiring time; nothing in the delivery path produces them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The collector base url was empty.
    #[error("collector url is missing")]
    MissingUrl,

    /// The collector base url did not parse.
    #[error("invalid collector url `{url}`: {reason}")]
    InvalidUrl {
        /// the offending url
        url: String,
        /// what the parser disliked about it
        reason: String,
    },

    /// The auth token was empty.
    #[error("auth token is missing")]
    MissingToken,

    /// An extra request header had a name or value the wire format rejects.
    #[error("invalid request header `{name}`")]
    InvalidHeader {
        /// the offending header name
        name: String,
    },

    /// The http client could not be built.
    #[error("could not build http client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// A stream or datagram socket could not be opened at construction.
    #[error("could not open socket to {address}: {source}")]
    Socket {
        /// the remote host:port
        address: String,
        /// the underlying io error
        source: std::io::Error,
    },
}

/// Non-fatal delivery failures. These are logged and dropped; they never
/// reach a producer, and the batch is gone either way.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The http request could not be completed (refused, timed out, ...).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A socket write failed.
    #[error("socket write failed: {0}")]
    Io(#[from] std::io::Error),
}
