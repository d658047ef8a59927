//! Engine-wide AOI counters

use crate::{Counter, Gauge};
use serde::Serialize;

/// Counters shared by the manager and both pipelines.
#[derive(Debug, Default)]
pub struct AoiStatistics {
    /// Registered entities.
    pub entities: Counter,
    /// Position updates applied to the grid.
    pub updates: Counter,
    /// Queued updates superseded by a later update for the same entity in one batch.
    pub updates_coalesced: Counter,
    /// Updates refused because the queue was full or the engine stopped.
    pub updates_rejected: Counter,
    pub enter_events: Counter,
    pub leave_events: Counter,
    /// Events lost to a full event queue or a shutdown.
    pub events_dropped: Counter,
    /// Events whose sink refused or panicked.
    pub deliveries_failed: Counter,
    pub batches: Counter,
    pub avg_entities_per_cell: Gauge,
    pub avg_batch_ms: Gauge,
}

impl AoiStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// ENTER plus LEAVE events processed.
    pub fn total_events(&self) -> u64 {
        self.enter_events.get() + self.leave_events.get()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total_entities: self.entities.get(),
            total_updates: self.updates.get(),
            updates_coalesced: self.updates_coalesced.get(),
            updates_rejected: self.updates_rejected.get(),
            total_events: self.total_events(),
            enter_events: self.enter_events.get(),
            leave_events: self.leave_events.get(),
            events_dropped: self.events_dropped.get(),
            deliveries_failed: self.deliveries_failed.get(),
            batches: self.batches.get(),
            avg_entities_per_cell: self.avg_entities_per_cell.get(),
            avg_batch_ms: self.avg_batch_ms.get(),
        }
    }
}

/// Point-in-time copy of [`AoiStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CounterSnapshot {
    pub total_entities: u64,
    pub total_updates: u64,
    pub updates_coalesced: u64,
    pub updates_rejected: u64,
    pub total_events: u64,
    pub enter_events: u64,
    pub leave_events: u64,
    pub events_dropped: u64,
    pub deliveries_failed: u64,
    pub batches: u64,
    pub avg_entities_per_cell: f64,
    pub avg_batch_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_splits_event_kinds() {
        let stats = AoiStatistics::new();
        stats.enter_events.add(3);
        stats.leave_events.increment();
        stats.entities.add(2);
        stats.entities.decrement();
        stats.avg_entities_per_cell.set(1.5);

        let snap = stats.snapshot();
        assert_eq!(snap.total_events, 4);
        assert_eq!(snap.enter_events, 3);
        assert_eq!(snap.leave_events, 1);
        assert_eq!(snap.total_entities, 1);
        assert_eq!(snap.avg_entities_per_cell, 1.5);
    }
}
