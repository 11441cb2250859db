use reqwest::header::CONTENT_TYPE;
use uuid::Uuid;

use crate::config::HecConfig;
use crate::downstream::hec::{
    collector_client, collector_endpoint, collector_headers, CollectorStatus,
};
use crate::downstream::Transport;
use crate::errors::{ConfigError, TransportError};
use crate::types::TelemetryRecord;

/// Ships batches to the collector's `event` endpoint: one POST per batch,
/// one serialized envelope per item, space-separated. The collector parses
/// concatenated envelopes; no enclosing array.
pub struct HecEventTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HecEventTransport {
    /// The channel id is minted here and fixed for the sink's lifetime.
    pub fn new(config: &HecConfig) -> Result<Self, ConfigError> {
        let channel = Uuid::new_v4();
        let endpoint = collector_endpoint(config, "event", &channel)?;
        let client = collector_client(config, collector_headers(config, &channel)?)?;
        Ok(Self { client, endpoint })
    }
}

impl Transport for HecEventTransport {
    async fn deliver(&mut self, batch: Vec<TelemetryRecord>) -> Result<(), TransportError> {
        let body = batch
            .into_iter()
            .map(|record| {
                serde_json::to_string(&record.into_event()).expect("hec envelope serializes")
            })
            .collect::<Vec<_>>()
            .join(" ");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = CollectorStatus::classify(response.status().as_u16());
        if status.is_success() {
            log::debug!("hec event: {status}");
        } else {
            log::error!("hec event: {status}");
        }
        Ok(())
    }
}
