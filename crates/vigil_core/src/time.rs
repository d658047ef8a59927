//! Time keeping for the AOI pipelines
//!
//! Wall-clock stamps for queued tasks and the default cadences

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default batch drain period (5 Hz).
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(200);

/// Default period for refreshing derived statistics.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Milliseconds since the Unix epoch, used to stamp queued tasks.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Milliseconds elapsed since `stamp`, saturating at zero for stamps from the future.
pub fn millis_since(stamp: u64) -> u64 {
    now_millis().saturating_sub(stamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_are_monotonic_enough() {
        let stamp = now_millis();
        assert!(stamp > 0);
        assert!(millis_since(stamp) < 60_000);
        assert_eq!(millis_since(u64::MAX), 0);
    }
}
