//! The batching engine: the event buffer with its two flush triggers, the
//! per-window KPI accumulator, and the minute clock that closes windows.

mod batch_buffer;
mod kpi;
mod minute_clock;

pub use batch_buffer::BatchBuffer;
pub use kpi::{KpiAccumulator, KpiPipeline, KpiRecord};
pub use minute_clock::{ClockSource, MinuteClock, SleepFuture};
