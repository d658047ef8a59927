//! Vigil Core
//!
//! Contains the data structures behind area-of-interest tracking:
//! - Entity identity and kind tags
//! - Uniform spatial grid with nine-grid and radius queries
//! - Bidirectional watch relation table
//! - Deterministic math and time helpers

pub mod entity;
pub mod grid;
pub mod math;
pub mod time;
pub mod watch;

pub use entity::{EntityId, EntityKind};
pub use glam;
pub use grid::{GridBounds, GridCoordinate, GridStatistics, SpatialGrid};
pub use watch::{SeveredRelations, WatchTable};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
