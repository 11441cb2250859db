use uuid::Uuid;

use crate::config::HecConfig;
use crate::downstream::hec::{
    collector_client, collector_endpoint, collector_headers, CollectorStatus,
};
use crate::downstream::Transport;
use crate::errors::{ConfigError, TransportError};
use crate::types::TelemetryRecord;

/// Ships batches to the collector's `raw` endpoint: one POST per batch,
/// rendered lines joined with newlines.
pub struct HecRawTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HecRawTransport {
    /// The channel id is minted here and fixed for the sink's lifetime.
    pub fn new(config: &HecConfig) -> Result<Self, ConfigError> {
        let channel = Uuid::new_v4();
        let endpoint = collector_endpoint(config, "raw", &channel)?;
        let client = collector_client(config, collector_headers(config, &channel)?)?;
        Ok(Self { client, endpoint })
    }
}

impl Transport for HecRawTransport {
    async fn deliver(&mut self, batch: Vec<TelemetryRecord>) -> Result<(), TransportError> {
        let body = batch
            .into_iter()
            .map(TelemetryRecord::into_wire_line)
            .collect::<Vec<_>>()
            .join("\n");

        let response = self.client.post(self.endpoint.clone()).body(body).send().await?;
        let status = CollectorStatus::classify(response.status().as_u16());
        if status.is_success() {
            log::debug!("hec raw: {status}");
        } else {
            log::error!("hec raw: {status}");
        }
        Ok(())
    }
}
