use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;

/// Boxed sleep future, so a test can substitute its own timers.
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Where the clock reads time and how it waits. Primarily for testing and
/// getting really deep into some stuff.
pub enum ClockSource {
    /// Wall clock + tokio timers.
    SystemTime,
    /// Bring your own time.
    Dynamic {
        /// Current wall-clock time.
        now: Box<dyn Fn() -> SystemTime + Send + Sync>,
        /// Wait for (about) this long.
        sleep: Box<dyn Fn(Duration) -> SleepFuture + Send + Sync>,
    },
}

impl std::fmt::Debug for ClockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SystemTime => write!(f, "SystemTime"),
            Self::Dynamic { .. } => f.debug_tuple("Dynamic").finish(),
        }
    }
}

impl Default for ClockSource {
    fn default() -> Self {
        Self::SystemTime
    }
}

impl ClockSource {
    fn now(&self) -> SystemTime {
        match self {
            ClockSource::SystemTime => SystemTime::now(),
            ClockSource::Dynamic { now, .. } => now(),
        }
    }

    fn sleep(&self, delay: Duration) -> SleepFuture {
        match self {
            ClockSource::SystemTime => Box::pin(tokio::time::sleep(delay)),
            ClockSource::Dynamic { sleep, .. } => sleep(delay),
        }
    }
}

/// Fires a callback once per distinct wall-clock minute, at the minute
/// boundary (second = 0).
///
/// Each cycle recomputes its delay from the wall clock instead of
/// accumulating a fixed period, so the clock doesn't drift; and a fire is
/// swallowed when the minute hasn't actually changed, so timer jitter can't
/// produce duplicates.
pub struct MinuteClock {
    task: JoinHandle<()>,
}

impl MinuteClock {
    /// Start ticking. The first callback lands at the next minute boundary,
    /// at most 60s away. Requires a tokio runtime to be current.
    pub fn start(source: ClockSource, on_minute: impl FnMut() + Send + 'static) -> Self {
        let mut ticker = Ticker {
            source,
            last_fired: None,
            on_minute,
        };
        let task = tokio::spawn(async move {
            loop {
                ticker.cycle().await;
            }
        });
        Self { task }
    }

    /// Stop ticking.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Stop ticking and wait for the task to wind down.
    pub async fn shutdown(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
    }
}

impl Drop for MinuteClock {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Ticker<F> {
    source: ClockSource,
    last_fired: Option<u64>,
    on_minute: F,
}

impl<F: FnMut()> Ticker<F> {
    async fn cycle(&mut self) {
        let delay = delay_to_next_minute(self.source.now());
        self.source.sleep(delay).await;
        let minute = minute_of_epoch(self.source.now());
        if self.last_fired != Some(minute) {
            (self.on_minute)();
            self.last_fired = Some(minute);
        }
    }
}

fn minute_of_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .expect("could not get system time")
        .as_secs()
        / 60
}

/// Time until the next second-zero boundary: in (0, 60s].
fn delay_to_next_minute(time: SystemTime) -> Duration {
    let since_epoch = time
        .duration_since(UNIX_EPOCH)
        .expect("could not get system time");
    let into_minute = since_epoch - Duration::from_secs(since_epoch.as_secs() / 60 * 60);
    Duration::from_secs(60) - into_minute
}
