//! Batch timing utilities

use super::sample_window::SampleWindow;
use std::time::Duration;

/// Rolling record of update batch durations.
pub struct BatchTimer {
    batch_times: SampleWindow,
    batches: u64,
}

impl BatchTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            batch_times: SampleWindow::new(capacity),
            batches: 0,
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.batch_times.push(elapsed);
        self.batches += 1;
    }

    /// Batches recorded since creation.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn batch_time_ms(&self) -> f64 {
        self.batch_times.average().as_secs_f64() * 1000.0
    }

    pub fn batch_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.batch_times.range();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}

impl Default for BatchTimer {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_recorded_batches() {
        let mut timer = BatchTimer::new(4);
        timer.record(Duration::from_millis(2));
        timer.record(Duration::from_millis(4));
        assert_eq!(timer.batches(), 2);
        assert!((timer.batch_time_ms() - 3.0).abs() < 1e-9);
        let (min, max) = timer.batch_time_range_ms();
        assert!((min - 2.0).abs() < 1e-9 && (max - 4.0).abs() < 1e-9);
    }
}
