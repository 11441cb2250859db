use tokio::net::UdpSocket;

use crate::config::SocketConfig;
use crate::downstream::Transport;
use crate::errors::{ConfigError, TransportError};
use crate::types::TelemetryRecord;

/// Largest payload a single datagram can carry over ipv4 (65535 minus the
/// ip and udp headers). Anything bigger would fail at the os layer anyway;
/// checking here makes the loss visible in the log.
const MAX_DATAGRAM_BYTES: usize = 65507;

/// Ships each item as its own datagram to a fixed remote address. Batching
/// governs buffering cadence only, not wire framing: a batch of ten items
/// is ten datagrams.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind an ephemeral local port and fix the remote address.
    pub async fn connect(config: &SocketConfig) -> Result<Self, ConfigError> {
        let address = config.address();
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|source| ConfigError::Socket {
                address: "0.0.0.0:0".to_owned(),
                source,
            })?;
        socket
            .connect(&address)
            .await
            .map_err(|source| ConfigError::Socket { address, source })?;
        Ok(Self { socket })
    }
}

impl Transport for UdpTransport {
    async fn deliver(&mut self, batch: Vec<TelemetryRecord>) -> Result<(), TransportError> {
        for record in batch {
            let mut line = record.into_wire_line();
            line.push('\n');
            if line.len() > MAX_DATAGRAM_BYTES {
                log::error!(
                    "dropping oversize datagram: {} bytes exceeds the {MAX_DATAGRAM_BYTES} byte limit",
                    line.len()
                );
                continue;
            }
            self.socket.send(line.as_bytes()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    use super::UdpTransport;
    use crate::config::SocketConfig;
    use crate::downstream::Transport;

    async fn receiver() -> (UdpSocket, SocketConfig) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let port = socket.local_addr().expect("local addr").port();
        (
            socket,
            SocketConfig {
                host: "127.0.0.1".to_owned(),
                port,
            },
        )
    }

    async fn next_datagram(socket: &UdpSocket) -> String {
        let mut buffer = vec![0u8; 128 * 1024];
        let received = timeout(Duration::from_secs(5), socket.recv(&mut buffer))
            .await
            .expect("datagram should arrive")
            .expect("recv");
        String::from_utf8_lossy(&buffer[..received]).into_owned()
    }

    #[test_log::test(tokio::test)]
    async fn each_item_is_its_own_datagram() {
        let (socket, config) = receiver().await;
        let mut transport = UdpTransport::connect(&config).await.expect("connect");

        transport
            .deliver(vec!["first".into(), "second".into()])
            .await
            .expect("deliver");

        assert_eq!("first\n", next_datagram(&socket).await);
        assert_eq!("second\n", next_datagram(&socket).await);
    }

    #[test_log::test(tokio::test)]
    async fn oversize_items_are_dropped_not_sent() {
        let (socket, config) = receiver().await;
        let mut transport = UdpTransport::connect(&config).await.expect("connect");

        let oversize = "x".repeat(70_000);
        transport
            .deliver(vec![oversize.into(), "small".into()])
            .await
            .expect("deliver");

        assert_eq!(
            "small\n",
            next_datagram(&socket).await,
            "the oversize item is skipped, the rest of the batch still ships"
        );
    }
}
