use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::config::SocketConfig;
use crate::downstream::Transport;
use crate::errors::{ConfigError, TransportError};
use crate::types::TelemetryRecord;

/// Ships each item as one newline-terminated line on a long-lived TCP
/// connection.
///
/// The connection is established eagerly at construction and never
/// reestablished: a sink whose peer goes away keeps failing deliveries,
/// which are logged and dropped like any other transport failure.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to the configured collector.
    pub async fn connect(config: &SocketConfig) -> Result<Self, ConfigError> {
        let address = config.address();
        let stream = TcpStream::connect(&address)
            .await
            .map_err(|source| ConfigError::Socket { address, source })?;
        Ok(Self { stream })
    }
}

impl Transport for TcpTransport {
    async fn deliver(&mut self, batch: Vec<TelemetryRecord>) -> Result<(), TransportError> {
        for record in batch {
            let mut line = record.into_wire_line();
            line.push('\n');
            self.stream.write_all(line.as_bytes()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::TcpTransport;
    use crate::config::SocketConfig;
    use crate::downstream::Transport;
    use crate::errors::ConfigError;

    #[test_log::test(tokio::test)]
    async fn writes_one_line_per_item() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let config = SocketConfig {
            host: "127.0.0.1".to_owned(),
            port,
        };

        let mut transport = TcpTransport::connect(&config).await.expect("connect");
        let (mut peer, _) = listener.accept().await.expect("accept");

        transport
            .deliver(vec!["first".into(), "second".into()])
            .await
            .expect("deliver");
        drop(transport);

        let mut received = String::new();
        peer.read_to_string(&mut received).await.expect("read");
        assert_eq!("first\nsecond\n", received);
    }

    #[test_log::test(tokio::test)]
    async fn refused_connection_fails_construction() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let config = SocketConfig {
            host: "127.0.0.1".to_owned(),
            port,
        };
        assert!(matches!(
            TcpTransport::connect(&config).await,
            Err(ConfigError::Socket { .. })
        ));
    }
}
