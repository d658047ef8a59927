//! Uniform spatial grid for area-of-interest candidate search.
//!
//! World positions are bucketed into square cells on the x/z plane. The grid
//! keeps a forward index (cell -> entity ids) and a reverse index
//! (entity id -> cell and last position) so moves and removals never scan.
//!
//! The per-tick query is [`SpatialGrid::neighbors_nine_grid`]: the 3x3 block
//! around a cell. It only finds everything in range while view ranges do not
//! exceed the cell size, so size the grid accordingly.

mod coord;
mod stats;

pub use coord::{GridBounds, GridCoordinate};
pub use stats::GridStatistics;

use crate::math::planar_distance_squared;
use crate::EntityId;
use dashmap::DashMap;
use glam::{Vec2, Vec3};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Reverse index entry.
#[derive(Debug, Clone, Copy)]
struct Location {
    cell: GridCoordinate,
    position: Vec3,
}

/// Spatial grid of entity ids.
///
/// All methods take `&self`; concurrent reads are safe. Writes are expected to
/// be serialized by the owner (the AOI manager funnels them through its
/// pipelines).
pub struct SpatialGrid {
    cell_size: f32,
    inv_cell_size: f32,
    bounds: Option<GridBounds>,
    /// (width, height) in cells when bounded.
    dims: Option<(i32, i32)>,
    cells: DashMap<GridCoordinate, HashSet<EntityId>>,
    locations: DashMap<EntityId, Location>,
    structural_updates: AtomicU64,
    queries: AtomicU64,
}

impl SpatialGrid {
    /// Create an unbounded grid. Coordinates are clamped to `>= 0`.
    pub fn new(cell_size: f32) -> Self {
        assert!(
            cell_size.is_finite() && cell_size > 0.0,
            "grid cell size must be positive, got {cell_size}"
        );
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            bounds: None,
            dims: None,
            cells: DashMap::new(),
            locations: DashMap::new(),
            structural_updates: AtomicU64::new(0),
            queries: AtomicU64::new(0),
        }
    }

    /// Create a grid covering `bounds`. Positions outside the bounds land in
    /// the nearest edge cell.
    pub fn with_bounds(cell_size: f32, bounds: GridBounds) -> Self {
        assert!(bounds.is_valid(), "grid bounds are inverted: {bounds:?}");
        let mut grid = Self::new(cell_size);
        grid.dims = Some(bounds.dimensions(cell_size));
        grid.bounds = Some(bounds);
        debug!(
            cell_size,
            dims = ?grid.dims,
            "bounded AOI grid created"
        );
        grid
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn bounds(&self) -> Option<GridBounds> {
        self.bounds
    }

    /// Width and height in cells, if bounded.
    pub fn dimensions(&self) -> Option<(i32, i32)> {
        self.dims
    }

    fn origin(&self) -> Vec2 {
        self.bounds.map(|b| b.origin()).unwrap_or(Vec2::ZERO)
    }

    /// Convert a world position to its cell.
    pub fn cell_of(&self, position: Vec3) -> GridCoordinate {
        let origin = self.origin();
        let x = ((position.x - origin.x) * self.inv_cell_size).floor() as i32;
        let z = ((position.z - origin.y) * self.inv_cell_size).floor() as i32;
        self.clamp(GridCoordinate::new(x, z))
    }

    fn clamp(&self, coord: GridCoordinate) -> GridCoordinate {
        let (max_x, max_z) = self.dims.map(|(w, h)| (w - 1, h - 1)).unwrap_or((i32::MAX, i32::MAX));
        GridCoordinate::new(coord.x.clamp(0, max_x), coord.z.clamp(0, max_z))
    }

    /// Whether `coord` can hold entities.
    pub fn is_valid_coordinate(&self, coord: GridCoordinate) -> bool {
        if coord.x < 0 || coord.z < 0 {
            return false;
        }
        match self.dims {
            Some((w, h)) => coord.x < w && coord.z < h,
            None => true,
        }
    }

    /// World-space center of a cell (y = 0).
    pub fn cell_center(&self, coord: GridCoordinate) -> Vec3 {
        let origin = self.origin();
        Vec3::new(
            origin.x + (coord.x as f32 + 0.5) * self.cell_size,
            0.0,
            origin.y + (coord.z as f32 + 0.5) * self.cell_size,
        )
    }

    /// Area a cell collects entities from. Edge cells extend to infinity on
    /// the clamped side, since out-of-range positions are clamped into them.
    fn cell_catchment(&self, coord: GridCoordinate) -> (Vec2, Vec2) {
        let origin = self.origin();
        let mut min = Vec2::new(
            origin.x + coord.x as f32 * self.cell_size,
            origin.y + coord.z as f32 * self.cell_size,
        );
        let mut max = min + Vec2::splat(self.cell_size);
        if coord.x == 0 {
            min.x = f32::NEG_INFINITY;
        }
        if coord.z == 0 {
            min.y = f32::NEG_INFINITY;
        }
        let (last_x, last_z) = self.dims.map(|(w, h)| (w - 1, h - 1)).unwrap_or((i32::MAX, i32::MAX));
        if coord.x == last_x {
            max.x = f32::INFINITY;
        }
        if coord.z == last_z {
            max.y = f32::INFINITY;
        }
        (min, max)
    }

    /// Number of indexed entities.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.locations.contains_key(&id)
    }

    /// Cell currently holding `id`.
    pub fn cell_of_entity(&self, id: EntityId) -> Option<GridCoordinate> {
        self.locations.get(&id).map(|loc| loc.cell)
    }

    /// Last position recorded for `id`.
    pub fn position_of(&self, id: EntityId) -> Option<Vec3> {
        self.locations.get(&id).map(|loc| loc.position)
    }

    /// Index `id` at `position`.
    ///
    /// Inserting an id that is already present is a caller bug: it asserts in
    /// debug builds and degrades to a move in release builds.
    pub fn insert(&self, id: EntityId, position: Vec3) {
        let cell = self.cell_of(position);
        let previous = self.locations.insert(id, Location { cell, position });
        debug_assert!(previous.is_none(), "entity {id} inserted into grid twice");
        if let Some(prev) = previous {
            warn!(%id, "entity inserted into grid twice; treating as move");
            if prev.cell == cell {
                return;
            }
            self.detach(id, prev.cell);
        }
        self.cells.entry(cell).or_default().insert(id);
        self.structural_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Move `id` to `position`. Returns `true` when the entity changed cells.
    ///
    /// Staying inside the same cell only refreshes the stored position.
    /// Moving an id that was never inserted indexes it fresh.
    pub fn move_to(&self, id: EntityId, position: Vec3) -> bool {
        let cell = self.cell_of(position);
        let previous = {
            let Some(mut loc) = self.locations.get_mut(&id) else {
                self.locations.insert(id, Location { cell, position });
                self.cells.entry(cell).or_default().insert(id);
                self.structural_updates.fetch_add(1, Ordering::Relaxed);
                return true;
            };
            loc.position = position;
            if loc.cell == cell {
                return false;
            }
            std::mem::replace(&mut loc.cell, cell)
        };

        self.detach(id, previous);
        self.cells.entry(cell).or_default().insert(id);
        self.structural_updates.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Remove `id`, returning the cell it occupied. Absent ids are a no-op.
    pub fn remove(&self, id: EntityId) -> Option<GridCoordinate> {
        let (_, loc) = self.locations.remove(&id)?;
        self.detach(id, loc.cell);
        self.structural_updates.fetch_add(1, Ordering::Relaxed);
        Some(loc.cell)
    }

    fn detach(&self, id: EntityId, cell: GridCoordinate) {
        let removed = self
            .cells
            .get_mut(&cell)
            .map(|mut members| members.remove(&id))
            .unwrap_or(false);
        debug_assert!(removed, "entity {id} missing from its cell {cell}");
    }

    /// Insert many entities. Returns how many were newly indexed.
    pub fn insert_batch(&self, entries: impl IntoIterator<Item = (EntityId, Vec3)>) -> usize {
        let mut inserted = 0;
        for (id, position) in entries {
            if self.contains(id) {
                continue;
            }
            self.insert(id, position);
            inserted += 1;
        }
        inserted
    }

    /// Remove many entities. Returns how many were present.
    pub fn remove_batch(&self, ids: impl IntoIterator<Item = EntityId>) -> usize {
        ids.into_iter().filter(|&id| self.remove(id).is_some()).count()
    }

    /// Snapshot of the ids in one cell.
    pub fn entities_in_cell(&self, coord: GridCoordinate) -> Vec<EntityId> {
        self.cells
            .get(&coord)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Ids in the 3x3 block of cells centered on `center`.
    pub fn neighbors_nine_grid(&self, center: GridCoordinate) -> HashSet<EntityId> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let mut result = HashSet::new();
        for coord in center.nine_grid() {
            self.collect_cell(coord, &mut result);
        }
        result
    }

    /// Ids in the square of cells within `rings` steps of `center`.
    pub fn entities_in_range(&self, center: GridCoordinate, rings: u32) -> HashSet<EntityId> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let mut result = HashSet::new();
        for coord in center.square(rings) {
            self.collect_cell(coord, &mut result);
        }
        result
    }

    fn collect_cell(&self, coord: GridCoordinate, out: &mut HashSet<EntityId>) {
        if !self.is_valid_coordinate(coord) {
            return;
        }
        if let Some(members) = self.cells.get(&coord) {
            out.extend(members.iter().copied());
        }
    }

    /// Ids whose planar distance to `center` is at most `radius`.
    ///
    /// Scans only cells whose area intersects the circle, then filters on
    /// exact distance.
    pub fn entities_in_circle(&self, center: Vec3, radius: f32) -> HashSet<EntityId> {
        let mut result = HashSet::new();
        if radius.is_nan() || radius <= 0.0 || radius.is_infinite() {
            return result;
        }
        self.queries.fetch_add(1, Ordering::Relaxed);

        let lo = self.cell_of(center - Vec3::new(radius, 0.0, radius));
        let hi = self.cell_of(center + Vec3::new(radius, 0.0, radius));
        let c = Vec2::new(center.x, center.z);
        let radius_sq = radius * radius;
        let intersects = |coord: GridCoordinate| {
            let (min, max) = self.cell_catchment(coord);
            c.clamp(min, max).distance_squared(c) <= radius_sq
        };

        let mut candidates = Vec::new();
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1) as u64;
        let window = span(lo.x, hi.x).saturating_mul(span(lo.z, hi.z));
        if window > self.cells.len() as u64 {
            // Sparse grid: walking the occupied cells is cheaper than the window.
            for entry in self.cells.iter() {
                let coord = *entry.key();
                let in_window = (lo.x..=hi.x).contains(&coord.x) && (lo.z..=hi.z).contains(&coord.z);
                if in_window && intersects(coord) {
                    candidates.extend(entry.value().iter().copied());
                }
            }
        } else {
            for x in lo.x..=hi.x {
                for z in lo.z..=hi.z {
                    let coord = GridCoordinate::new(x, z);
                    if !intersects(coord) {
                        continue;
                    }
                    if let Some(members) = self.cells.get(&coord) {
                        candidates.extend(members.iter().copied());
                    }
                }
            }
        }

        for id in candidates {
            if let Some(loc) = self.locations.get(&id) {
                if planar_distance_squared(loc.position, center) <= radius_sq {
                    result.insert(id);
                }
            }
        }
        result
    }

    /// Drop cells that no longer hold entities. Returns how many were dropped.
    pub fn clean_empty_cells(&self) -> usize {
        let before = self.cells.len();
        self.cells.retain(|_, members| !members.is_empty());
        let cleaned = before - self.cells.len();
        if cleaned > 0 {
            debug!(cleaned, "empty AOI cells compacted");
        }
        cleaned
    }

    /// Remove every entity and cell.
    pub fn clear(&self) {
        self.cells.clear();
        self.locations.clear();
        debug!("AOI grid cleared");
    }

    pub fn statistics(&self) -> GridStatistics {
        let mut stats = GridStatistics::tally(self.cells.iter().map(|entry| entry.value().len()));
        stats.total_cells = self.dims.map(|(w, h)| w as u64 * h as u64);
        stats.structural_updates = self.structural_updates.load(Ordering::Relaxed);
        stats.queries = self.queries.load(Ordering::Relaxed);
        stats
    }

    /// Check that the forward and reverse indexes agree and that each entity
    /// sits in the cell its recorded position maps to.
    pub fn is_consistent(&self) -> bool {
        let mut seen = 0usize;
        for entry in self.cells.iter() {
            for id in entry.value() {
                seen += 1;
                match self.locations.get(id) {
                    Some(loc) if loc.cell == *entry.key() => {
                        if self.cell_of(loc.position) != loc.cell {
                            return false;
                        }
                    }
                    _ => return false,
                }
            }
        }
        seen == self.locations.len()
    }
}

impl std::fmt::Debug for SpatialGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialGrid")
            .field("cell_size", &self.cell_size)
            .field("dims", &self.dims)
            .field("entities", &self.locations.len())
            .field("cells", &self.cells.len())
            .finish()
    }
}
