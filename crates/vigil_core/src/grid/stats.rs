//! Occupancy statistics for the spatial grid.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridStatistics {
    /// Cell count of a bounded grid; `None` when the grid is unbounded.
    pub total_cells: Option<u64>,
    /// Cells currently holding at least one entity.
    pub active_cells: usize,
    pub total_entities: usize,
    /// Mean occupancy over active cells.
    pub avg_entities_per_cell: f64,
    pub max_entities_in_cell: usize,
    /// Cell membership changes (insert, cross-cell move, remove).
    pub structural_updates: u64,
    pub queries: u64,
}

impl GridStatistics {
    /// Build occupancy figures from per-cell entity counts.
    pub(crate) fn tally(cell_sizes: impl IntoIterator<Item = usize>) -> Self {
        let mut stats = GridStatistics::default();
        for count in cell_sizes.into_iter().filter(|&n| n > 0) {
            stats.active_cells += 1;
            stats.total_entities += count;
            stats.max_entities_in_cell = stats.max_entities_in_cell.max(count);
        }
        if stats.active_cells > 0 {
            stats.avg_entities_per_cell = stats.total_entities as f64 / stats.active_cells as f64;
        }
        stats
    }

    /// Fraction of a bounded grid's cells that are occupied.
    pub fn utilization(&self) -> Option<f64> {
        self.total_cells
            .filter(|&total| total > 0)
            .map(|total| self.active_cells as f64 / total as f64)
    }
}
