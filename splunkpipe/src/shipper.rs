//! The assembled pipeline: one buffer, one shipping task, and optionally a
//! KPI pipeline feeding summarized metrics into the same buffer.
//!
//! ```no_run
//! # let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().expect("runtime can be built");
//! # runtime.block_on(async {
//! use splunkpipe::config::HecConfig;
//! use splunkpipe::downstream::HecRawTransport;
//! use splunkpipe::shipper::Shipper;
//!
//! let config = HecConfig::new("https://host:8088/services/collector", "token-value");
//! let transport = HecRawTransport::new(&config).expect("valid collector config");
//! let shipper = Shipper::start(transport, &config).with_kpis("checkout");
//!
//! shipper.add("orders: [Information] [0:] order placed ");
//! shipper.register_metric("latency", 5.0, "acme", [("region", "east")]);
//!
//! shipper.shutdown(std::time::Duration::from_secs(2)).await;
//! # });
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::HecConfig;
use crate::downstream::{ship_batches_forever, Transport};
use crate::pipeline::{BatchBuffer, ClockSource, KpiPipeline, KpiRecord};
use crate::types::{Dimension, Name, TelemetryRecord};

/// How many undelivered batches may queue between the buffer and the
/// shipping task before new ones are dropped.
const BATCH_QUEUE_DEPTH: usize = 128;

/// A buffer wired to one transport. Producers only ever touch `add` and
/// `register_metric`; everything network-shaped happens on the shipping
/// task this struct spawned.
pub struct Shipper {
    buffer: Arc<BatchBuffer<TelemetryRecord>>,
    kpis: Option<KpiPipeline>,
    shipping: JoinHandle<()>,
}

impl Shipper {
    /// Wire a buffer to `transport` using the batching thresholds from
    /// `config`, and start shipping. Requires a tokio runtime to be
    /// current.
    pub fn start<T>(transport: T, config: &HecConfig) -> Self
    where
        T: Transport + Send + 'static,
    {
        Self::start_with_thresholds(transport, config.batch_size, config.batch_interval)
    }

    /// Wire a buffer to `transport` with explicit batching thresholds, for
    /// the socket transports (whose configuration carries none).
    pub fn start_with_thresholds<T>(
        transport: T,
        batch_size: usize,
        batch_interval: Duration,
    ) -> Self
    where
        T: Transport + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(BATCH_QUEUE_DEPTH);
        let buffer = Arc::new(BatchBuffer::new(
            batch_size,
            batch_interval,
            move |batch: Vec<TelemetryRecord>| {
                if let Err(error) = sender.try_send(batch) {
                    log::error!("could not queue batch for delivery: {error}");
                }
            },
        ));
        let shipping = tokio::spawn(ship_batches_forever(transport, receiver));
        Self {
            buffer,
            kpis: None,
            shipping,
        }
    }

    /// Add a KPI pipeline: metrics registered on this shipper summarize
    /// once per wall-clock minute and ship through the same buffer, using
    /// the default text rendering of [`KpiRecord`].
    pub fn with_kpis(self, application: impl Into<String>) -> Self {
        self.with_kpi_rendering(application, |record: KpiRecord| {
            TelemetryRecord::Text(record.to_string())
        })
    }

    /// Add a KPI pipeline with a caller-supplied rendering of finalized
    /// records.
    pub fn with_kpi_rendering(
        mut self,
        application: impl Into<String>,
        render: impl Fn(KpiRecord) -> TelemetryRecord + Send + 'static,
    ) -> Self {
        let buffer = self.buffer.clone();
        self.kpis = Some(KpiPipeline::start(
            application,
            ClockSource::default(),
            move |record| {
                buffer.add(render(record));
            },
        ));
        self
    }

    /// Buffer one record for delivery. Never blocks; a no-op after
    /// `dispose`.
    pub fn add(&self, record: impl Into<TelemetryRecord>) {
        self.buffer.add(record.into());
    }

    /// Record one metric observation. Logged and dropped when no KPI
    /// pipeline is configured.
    pub fn register_metric(
        &self,
        name: impl Into<Name>,
        value: f64,
        account: &str,
        dimensions: impl IntoIterator<Item = (impl Into<Name>, impl Into<Dimension>)>,
    ) {
        match &self.kpis {
            Some(kpis) => kpis.register(name, value, account, dimensions),
            None => log::debug!("no kpi pipeline configured; dropping metric observation"),
        }
    }

    /// Flush everything currently buffered, without shutting down.
    pub fn flush(&self) {
        self.buffer.flush();
    }

    /// Stop the timers, drain the buffer, and reject further `add` calls.
    /// Batches already queued for delivery are left to the shipping task;
    /// use [`Shipper::shutdown`] to also wait for those.
    pub fn dispose(&self) {
        if let Some(kpis) = &self.kpis {
            kpis.stop();
        }
        self.buffer.dispose();
    }

    /// Dispose, then give the shipping task up to `grace` to deliver what
    /// is already queued.
    pub async fn shutdown(self, grace: Duration) {
        self.dispose();
        let Shipper {
            buffer,
            kpis,
            shipping,
        } = self;

        // The clock task owns a clone of the buffer; it has to be fully
        // stopped before dropping ours closes the batch channel.
        if let Some(kpis) = kpis {
            kpis.shutdown().await;
        }
        drop(buffer);

        match tokio::time::timeout(grace, shipping).await {
            Ok(_) => log::debug!("shipping task drained"),
            Err(_) => log::error!("shipping task did not drain within {grace:?}; abandoning it"),
        }
    }
}
