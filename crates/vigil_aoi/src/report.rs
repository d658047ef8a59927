use serde::Serialize;
use vigil_core::GridStatistics;
use vigil_metrics::CounterSnapshot;

/// Point-in-time view of the engine, suitable for logging or a status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub running: bool,
    pub counters: CounterSnapshot,
    pub grid: GridStatistics,
    /// Watch edges across all entities.
    pub relations: usize,
    pub pending_updates: usize,
    pub pending_events: usize,
    /// Fastest and slowest recent batch, in milliseconds.
    pub batch_time_range_ms: (f64, f64),
}
