//! Fixed-size window of recent batch durations.

use std::collections::VecDeque;
use std::time::Duration;

/// Keeps the last `capacity` durations and their running total.
#[derive(Debug)]
pub struct SampleWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
    total: Duration,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            total: Duration::ZERO,
        }
    }

    /// Record a sample, evicting the oldest once full.
    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.total = self.total.saturating_sub(oldest);
            }
        }
        self.samples.push_back(sample);
        self.total = self.total.saturating_add(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn average(&self) -> Duration {
        match self.samples.len() {
            0 => Duration::ZERO,
            n => self.total / n as u32,
        }
    }

    /// Shortest and longest sample in the window; zero when empty.
    pub fn range(&self) -> (Duration, Duration) {
        let min = self.samples.iter().min().copied().unwrap_or_default();
        let max = self.samples.iter().max().copied().unwrap_or_default();
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn evicts_oldest_once_full() {
        let mut window = SampleWindow::new(3);
        for value in [10, 20, 30] {
            window.push(ms(value));
        }
        assert_eq!(window.average(), ms(20));

        window.push(ms(40));
        assert_eq!(window.len(), 3);
        assert_eq!(window.average(), ms(30));
        assert_eq!(window.range(), (ms(20), ms(40)));
    }

    #[test]
    fn empty_and_zero_capacity() {
        let mut window = SampleWindow::new(0);
        assert!(window.is_empty());
        assert_eq!(window.average(), Duration::ZERO);
        assert_eq!(window.range(), (Duration::ZERO, Duration::ZERO));

        window.push(ms(5));
        window.push(ms(7));
        assert_eq!(window.len(), 1);
        assert_eq!(window.range(), (ms(7), ms(7)));
    }
}
