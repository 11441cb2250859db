//! Transports that carry flushed batches to a collector.

use std::future::Future;

use tokio::sync::mpsc;

use crate::errors::TransportError;
use crate::types::TelemetryRecord;

mod hec;
mod hec_event;
mod hec_raw;
mod tcp;
mod udp;

pub use hec::CollectorStatus;
pub use hec_event::HecEventTransport;
pub use hec_raw::HecRawTransport;
pub use tcp::TcpTransport;
pub use udp::UdpTransport;

/// Accept one batch, render it, send it. One implementation per wire
/// transport; rendering choices (line-joined, enveloped, per-datagram) live
/// with the transport that needs them.
pub trait Transport {
    /// Render and send one batch. An `Err` is for the log only: the batch
    /// is spent either way and nobody retries it.
    fn deliver(
        &mut self,
        batch: Vec<TelemetryRecord>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Consume batches from the channel until every sender is gone, delivering
/// each as it arrives. Spawn this next to the buffer that feeds the
/// channel; it owns the transport, so socket writes are serialized here.
pub async fn ship_batches_forever<T: Transport>(
    mut transport: T,
    mut batches: mpsc::Receiver<Vec<TelemetryRecord>>,
) {
    while let Some(batch) = batches.recv().await {
        let count = batch.len();
        match transport.deliver(batch).await {
            Ok(()) => log::debug!("delivered batch of {count}"),
            Err(error) => log::error!("failed to deliver batch of {count}: {error}"),
        }
    }
    log::debug!("batch channel closed; shipping done");
}
