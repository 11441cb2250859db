use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::fmt::Write as _;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use crate::pipeline::minute_clock::{ClockSource, MinuteClock};
use crate::types::{Dimension, Name};

// Key-string delimiters. The ingestion side decodes these; do not change
// them without changing the decoder there too.
const METRIC_SPLIT: &str = "-#-";
const ENTRY_SPLIT: &str = ":#:";
const PAIR_SPLIT: &str = "|#|";

const ORDERING: Ordering = Ordering::Relaxed;

/// The finalized summary of one metric key over one window.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiRecord {
    /// Application that produced the observations.
    pub application: String,
    /// Account the observations were attributed to, empty when none.
    pub account: String,
    /// Metric name.
    pub name: String,
    /// Number of observations in the window.
    pub count: u64,
    /// Sum of observed values.
    pub sum: f64,
    /// Smallest observed value.
    pub min: f64,
    /// Largest observed value.
    pub max: f64,
    /// Remaining dimensions, sorted by name.
    pub dimensions: BTreeMap<String, String>,
}

impl Display for KpiRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let account = if self.account.is_empty() {
            "-"
        } else {
            self.account.as_str()
        };
        write!(
            f,
            "kpi=\"{}\" application=\"{}\" account={} count={} sum={} min={} max={}",
            self.name, self.application, account, self.count, self.sum, self.min, self.max
        )?;
        for (name, value) in &self.dimensions {
            write!(f, " {name}=\"{value}\"")?;
        }
        Ok(())
    }
}

/// One key's live statistics. All four numbers live in one record and each
/// is updated by a compare-and-swap retry loop, so concurrent observers
/// never lose an update and a snapshot never mixes windows.
#[derive(Debug)]
struct KpiCell {
    count: AtomicU64,
    // f64 bit patterns
    sum: AtomicU64,
    min: AtomicU64,
    max: AtomicU64,
}

impl Default for KpiCell {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0f64.to_bits()),
            min: AtomicU64::new(f64::INFINITY.to_bits()),
            max: AtomicU64::new(f64::NEG_INFINITY.to_bits()),
        }
    }
}

fn fetch_update_f64(cell: &AtomicU64, update: impl Fn(f64) -> f64) {
    let mut current = cell.load(ORDERING);
    loop {
        let next = update(f64::from_bits(current)).to_bits();
        match cell.compare_exchange_weak(current, next, ORDERING, ORDERING) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}

#[derive(Debug, PartialEq)]
struct WindowSummary {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl KpiCell {
    fn observe(&self, value: f64) {
        self.count.fetch_add(1, ORDERING);
        fetch_update_f64(&self.sum, |sum| sum + value);
        fetch_update_f64(&self.min, |min| min.min(value));
        fetch_update_f64(&self.max, |max| max.max(value));
    }

    /// None for a cell that was created but never observed - the lone
    /// observation races with removal and is charged to data loss.
    fn summarize(&self) -> Option<WindowSummary> {
        let count = self.count.load(ORDERING);
        if count == 0 {
            return None;
        }
        Some(WindowSummary {
            count,
            sum: f64::from_bits(self.sum.load(ORDERING)),
            min: f64::from_bits(self.min.load(ORDERING)),
            max: f64::from_bits(self.max.load(ORDERING)),
        })
    }
}

/// Per-key running statistics for one application, drained once per window.
///
/// Producers call [`KpiAccumulator::register`] concurrently; the minute
/// clock calls [`KpiAccumulator::drain`]. A registration that arrives for a
/// key while that key is being drained may land on the removed cell and be
/// lost with it - an accepted trade for never blocking producers.
#[derive(Debug)]
pub struct KpiAccumulator {
    application: String,
    cells: Mutex<HashMap<String, Arc<KpiCell>>>,
}

impl KpiAccumulator {
    /// An empty accumulator attributing its output to `application`.
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Record one observation of `name` with `value`. Dimensions are sorted
    /// before key encoding, so set-equal dimension maps always land on the
    /// same key. Never blocks; an empty metric name is logged and dropped.
    pub fn register(
        &self,
        name: impl Into<Name>,
        value: f64,
        account: &str,
        dimensions: impl IntoIterator<Item = (impl Into<Name>, impl Into<Dimension>)>,
    ) {
        let name = name.into();
        if name.as_str().trim().is_empty() {
            log::error!("dropping kpi observation with empty metric name");
            return;
        }

        let mut position: BTreeMap<Name, Dimension> = dimensions
            .into_iter()
            .map(|(name, dimension)| (name.into(), dimension.into()))
            .collect();
        position.insert(
            Name::Str("application"),
            Dimension::String(self.application.clone()),
        );
        if !account.trim().is_empty() {
            position.insert(Name::Str("account"), Dimension::String(account.to_owned()));
        }

        let key = encode_key(name.as_str(), &position);
        let cell = {
            let mut cells = self.cells.lock().expect("kpi mutex should not be poisoned");
            cells.entry(key).or_default().clone()
        };
        cell.observe(value);
    }

    /// Close the current window: remove every live key and return one
    /// finalized record per key. Keys are removed one at a time, so
    /// registrations for *other* keys proceed undisturbed.
    pub fn drain(&self) -> Vec<KpiRecord> {
        let keys: Vec<String> = {
            let cells = self.cells.lock().expect("kpi mutex should not be poisoned");
            cells.keys().cloned().collect()
        };

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let removed = {
                let mut cells = self.cells.lock().expect("kpi mutex should not be poisoned");
                cells.remove(&key)
            };
            let Some(cell) = removed else { continue };
            let Some(summary) = cell.summarize() else { continue };
            records.push(self.finalize(&key, summary));
        }
        records
    }

    fn finalize(&self, key: &str, summary: WindowSummary) -> KpiRecord {
        let (name, mut dimensions) = decode_key(key);
        let application = dimensions
            .remove("application")
            .unwrap_or_else(|| self.application.clone());
        let account = dimensions.remove("account").unwrap_or_default();
        KpiRecord {
            application,
            account,
            name,
            count: summary.count,
            sum: summary.sum,
            min: summary.min,
            max: summary.max,
            dimensions,
        }
    }
}

/// `name-#-dim|#|value:#:dim|#|value`, dimensions already sorted by name.
fn encode_key(name: &str, position: &BTreeMap<Name, Dimension>) -> String {
    if position.is_empty() {
        return name.to_owned();
    }
    let mut key = String::with_capacity(name.len() + 16 * position.len());
    key.push_str(name);
    key.push_str(METRIC_SPLIT);
    let mut first = true;
    for (dimension, value) in position {
        if !first {
            key.push_str(ENTRY_SPLIT);
        }
        first = false;
        write!(key, "{dimension}{PAIR_SPLIT}{value}").expect("writing to a string");
    }
    key
}

/// Exact inverse of [`encode_key`].
fn decode_key(key: &str) -> (String, BTreeMap<String, String>) {
    let mut parts = key.splitn(2, METRIC_SPLIT);
    let name = parts.next().unwrap_or_default().to_owned();
    let mut dimensions = BTreeMap::new();
    if let Some(block) = parts.next() {
        for entry in block.split(ENTRY_SPLIT).filter(|entry| !entry.is_empty()) {
            let mut pair = entry.splitn(2, PAIR_SPLIT);
            let dimension = pair.next().unwrap_or_default();
            let value = pair.next().unwrap_or_default();
            dimensions.insert(dimension.to_owned(), value.to_owned());
        }
    }
    (name, dimensions)
}

/// The accumulator wired to a minute clock: observations summarize once per
/// wall-clock minute and flow to `on_kpi` as finalized records.
pub struct KpiPipeline {
    accumulator: Arc<KpiAccumulator>,
    clock: MinuteClock,
}

impl KpiPipeline {
    /// Start summarizing. Requires a tokio runtime to be current.
    pub fn start(
        application: impl Into<String>,
        source: ClockSource,
        mut on_kpi: impl FnMut(KpiRecord) + Send + 'static,
    ) -> Self {
        let accumulator = Arc::new(KpiAccumulator::new(application));
        let window = accumulator.clone();
        let clock = MinuteClock::start(source, move || {
            for record in window.drain() {
                on_kpi(record);
            }
        });
        Self { accumulator, clock }
    }

    /// Record one observation. See [`KpiAccumulator::register`].
    pub fn register(
        &self,
        name: impl Into<Name>,
        value: f64,
        account: &str,
        dimensions: impl IntoIterator<Item = (impl Into<Name>, impl Into<Dimension>)>,
    ) {
        self.accumulator.register(name, value, account, dimensions);
    }

    /// Stop the clock. Observations still in the open window are dropped,
    /// like everything else the process abandons at shutdown.
    pub fn stop(&self) {
        self.clock.stop();
    }

    /// Stop the clock and wait for its task to wind down.
    pub async fn shutdown(self) {
        self.clock.shutdown().await;
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::{decode_key, KpiAccumulator};

    #[test_log::test]
    fn one_window_summarizes_count_sum_min_max() {
        let accumulator = KpiAccumulator::new("checkout");
        accumulator.register("latency", 5.0, "acme", [("region", "east")]);
        accumulator.register("latency", 7.0, "acme", [("region", "east")]);

        let records = accumulator.drain();
        assert_eq!(1, records.len());
        let record = &records[0];
        assert_eq!("latency", record.name);
        assert_eq!(2, record.count);
        assert_eq!(12.0, record.sum);
        assert_eq!(5.0, record.min);
        assert_eq!(7.0, record.max);
        assert_eq!("checkout", record.application);
        assert_eq!("acme", record.account);
        assert_eq!(
            BTreeMap::from([("region".to_owned(), "east".to_owned())]),
            record.dimensions
        );

        assert!(accumulator.drain().is_empty(), "window was reset");
    }

    #[test_log::test]
    fn dimension_order_does_not_split_keys() {
        let accumulator = KpiAccumulator::new("checkout");
        accumulator.register("latency", 1.0, "", [("a", "1"), ("b", "2")]);
        accumulator.register("latency", 3.0, "", [("b", "2"), ("a", "1")]);

        let records = accumulator.drain();
        assert_eq!(1, records.len(), "set-equal dimensions share one key");
        assert_eq!(2, records[0].count);
        assert_eq!(4.0, records[0].sum);
    }

    #[test_log::test]
    fn distinct_dimension_values_keep_distinct_keys() {
        let accumulator = KpiAccumulator::new("checkout");
        accumulator.register("latency", 1.0, "", [("region", "east")]);
        accumulator.register("latency", 1.0, "", [("region", "west")]);

        assert_eq!(2, accumulator.drain().len());
    }

    #[test_log::test]
    fn key_decoding_reverses_encoding() {
        let (name, dimensions) =
            decode_key("latency-#-application|#|checkout:#:region|#|east:#:zone|#|");
        assert_eq!("latency", name);
        assert_eq!(
            BTreeMap::from([
                ("application".to_owned(), "checkout".to_owned()),
                ("region".to_owned(), "east".to_owned()),
                ("zone".to_owned(), String::new()),
            ]),
            dimensions
        );

        let (bare_name, bare_dimensions) = decode_key("latency");
        assert_eq!("latency", bare_name);
        assert!(bare_dimensions.is_empty());
    }

    #[test_log::test]
    fn empty_metric_name_is_dropped() {
        let accumulator = KpiAccumulator::new("checkout");
        accumulator.register("  ", 1.0, "", [("region", "east")]);
        assert!(accumulator.drain().is_empty());
    }

    #[test_log::test]
    fn concurrent_registrations_lose_no_updates() {
        let accumulator = Arc::new(KpiAccumulator::new("checkout"));
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let accumulator = accumulator.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        accumulator.register("hits", 1.0, "", [("region", "east")]);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("producer thread");
        }

        let records = accumulator.drain();
        assert_eq!(1, records.len());
        assert_eq!(4000, records[0].count);
        assert_eq!(4000.0, records[0].sum);
        assert_eq!(1.0, records[0].min);
        assert_eq!(1.0, records[0].max);
    }

    #[test_log::test]
    fn rendering_quotes_dimensions_and_dashes_empty_accounts() {
        let accumulator = KpiAccumulator::new("checkout");
        accumulator.register("latency", 5.0, "", [("region", "east")]);
        let records = accumulator.drain();
        assert_eq!(
            "kpi=\"latency\" application=\"checkout\" account=- count=1 sum=5 min=5 max=5 region=\"east\"",
            records[0].to_string()
        );
    }
}
