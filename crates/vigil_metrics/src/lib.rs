//! Vigil Metrics - lock-free statistics for the AOI engine
//!
//! Counters are plain atomics so the update and event pipelines can bump them
//! without blocking. Rolling timings live in a [`SampleWindow`] behind the
//! [`BatchTimer`], which only the batch scheduler touches.
//!
//! # Usage
//!
//! ```
//! use vigil_metrics::AoiStatistics;
//!
//! let stats = AoiStatistics::new();
//! stats.entities.increment();
//! stats.enter_events.increment();
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.total_entities, 1);
//! assert_eq!(snapshot.total_events, 1);
//! ```

mod batch_timer;
mod counter;
mod sample_window;
mod statistics;

pub use batch_timer::BatchTimer;
pub use counter::{Counter, Gauge};
pub use sample_window::SampleWindow;
pub use statistics::{AoiStatistics, CounterSnapshot};
