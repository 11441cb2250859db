use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use tokio::task::JoinHandle;

const OPEN: u8 = 0;
const DISPOSING: u8 = 1;
const DISPOSED: u8 = 2;

/// A thread-safe holding area with two independent flush triggers: a count
/// threshold crossed by whichever producer lands the item, and a wall-clock
/// interval checked by a background timer task.
///
/// Extraction is exactly-once per item; the *decision* to flush may race
/// between the two triggers, which is fine - a flush of an already-emptied
/// buffer dispatches nothing.
///
/// The emit callback must not block: hand batches to a channel or a queue
/// and do network io elsewhere.
pub struct BatchBuffer<T> {
    inner: Arc<BufferInner<T>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

struct BufferInner<T> {
    live: Mutex<Vec<T>>,
    batch_size: usize,
    state: AtomicU8,
    emit: Box<dyn Fn(Vec<T>) + Send + Sync>,
}

impl<T: Send + 'static> BatchBuffer<T> {
    /// A buffer that flushes on `batch_size` items, and - when
    /// `batch_interval` is nonzero - at least once per interval while
    /// non-empty. A nonzero interval requires a tokio runtime to be
    /// current, because the timer is a spawned task.
    pub fn new(
        batch_size: usize,
        batch_interval: Duration,
        emit: impl Fn(Vec<T>) + Send + Sync + 'static,
    ) -> Self {
        let inner = Arc::new(BufferInner {
            live: Mutex::new(Vec::new()),
            batch_size: batch_size.max(1),
            state: AtomicU8::new(OPEN),
            emit: Box::new(emit),
        });

        let timer = if batch_interval.is_zero() {
            None
        } else {
            let timer_inner = Arc::clone(&inner);
            Some(tokio::spawn(async move {
                // Single-shot re-arm: the next interval starts only after
                // this pass (including its flush) completes, so timer
                // flushes never overlap themselves.
                loop {
                    tokio::time::sleep(batch_interval).await;
                    if timer_inner.state.load(Ordering::Acquire) != OPEN {
                        break;
                    }
                    timer_inner.emit_one_batch();
                }
            }))
        };

        Self {
            inner,
            timer: Mutex::new(timer),
        }
    }

    /// Insert an item. A no-op once disposal has begun. If this insert
    /// reaches the size threshold, one batch is extracted on the calling
    /// thread and handed to the emit callback.
    pub fn add(&self, item: T) {
        if self.inner.state.load(Ordering::Acquire) != OPEN {
            return;
        }
        let reached_threshold = {
            let mut live = self.inner.live.lock().expect("buffer mutex should not be poisoned");
            live.push(item);
            live.len() >= self.inner.batch_size
        };
        if reached_threshold {
            self.inner.emit_one_batch();
        }
    }

    /// Drain the live set completely, emitting batches of at most the size
    /// threshold back-to-back until nothing is left.
    pub fn flush(&self) {
        self.inner.drain();
    }

    /// Stop the timer, reject new `add` calls, and drain everything still
    /// buffered. Idempotent.
    pub fn dispose(&self) {
        if self
            .inner
            .state
            .compare_exchange(OPEN, DISPOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        if let Some(timer) = self
            .timer
            .lock()
            .expect("timer mutex should not be poisoned")
            .take()
        {
            timer.abort();
        }
        self.inner.drain();
        self.inner.state.store(DISPOSED, Ordering::Release);
    }

    /// True once `dispose` has completed.
    pub fn is_disposed(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == DISPOSED
    }
}

impl<T> Drop for BatchBuffer<T> {
    fn drop(&mut self) {
        // The timer task holds the inner alive; without this it would
        // outlive the buffer.
        if let Some(timer) = self
            .timer
            .lock()
            .expect("timer mutex should not be poisoned")
            .take()
        {
            timer.abort();
        }
    }
}

impl<T> BufferInner<T> {
    /// Extract up to one threshold's worth of items. Items leave the live
    /// set exactly once no matter how many flush decisions raced.
    fn take_batch(&self) -> Vec<T> {
        let mut live = self.live.lock().expect("buffer mutex should not be poisoned");
        let take = live.len().min(self.batch_size);
        live.drain(..take).collect()
    }

    fn emit_one_batch(&self) {
        let batch = self.take_batch();
        if !batch.is_empty() {
            (self.emit)(batch);
        }
    }

    fn drain(&self) {
        loop {
            let batch = self.take_batch();
            if batch.is_empty() {
                break;
            }
            (self.emit)(batch);
        }
    }
}
