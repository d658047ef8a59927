//! Cell coordinates and world bounds.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid cell coordinates on the x/z plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoordinate {
    pub x: i32,
    pub z: i32,
}

impl GridCoordinate {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The cell itself plus its 8 surrounding cells. Saturates at the
    /// coordinate limits, so an edge cell may appear more than once.
    pub fn nine_grid(&self) -> [GridCoordinate; 9] {
        let (x0, x1) = (self.x.saturating_sub(1), self.x.saturating_add(1));
        let (z0, z1) = (self.z.saturating_sub(1), self.z.saturating_add(1));
        [
            GridCoordinate::new(x0, z0),
            GridCoordinate::new(self.x, z0),
            GridCoordinate::new(x1, z0),
            GridCoordinate::new(x0, self.z),
            GridCoordinate::new(self.x, self.z),
            GridCoordinate::new(x1, self.z),
            GridCoordinate::new(x0, z1),
            GridCoordinate::new(self.x, z1),
            GridCoordinate::new(x1, z1),
        ]
    }

    /// Every cell within `rings` steps (Chebyshev distance) of this one.
    pub fn square(&self, rings: u32) -> impl Iterator<Item = GridCoordinate> {
        let r = rings.min(i32::MAX as u32) as i32;
        let center = *self;
        (-r..=r).flat_map(move |dx| {
            (-r..=r).map(move |dz| {
                GridCoordinate::new(center.x.saturating_add(dx), center.z.saturating_add(dz))
            })
        })
    }

    pub fn manhattan_distance(&self, other: GridCoordinate) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }

    pub fn chebyshev_distance(&self, other: GridCoordinate) -> u32 {
        self.x.abs_diff(other.x).max(self.z.abs_diff(other.z))
    }
}

impl fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Axis-aligned world bounds of a scene. Only x and z are used for cell math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl GridBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.x < self.max.x && self.min.z < self.max.z
    }

    pub(crate) fn origin(&self) -> Vec2 {
        Vec2::new(self.min.x, self.min.z)
    }

    /// Number of cells along x and z for the given cell size.
    pub fn dimensions(&self, cell_size: f32) -> (i32, i32) {
        let width = ((self.max.x - self.min.x) / cell_size).ceil().max(1.0) as i32;
        let height = ((self.max.z - self.min.z) / cell_size).ceil().max(1.0) as i32;
        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_grid_contains_center_and_neighbors() {
        let cells = GridCoordinate::new(4, 4).nine_grid();
        assert!(cells.contains(&GridCoordinate::new(4, 4)));
        assert!(cells.contains(&GridCoordinate::new(3, 5)));
        assert!(!cells.contains(&GridCoordinate::new(6, 4)));
    }

    #[test]
    fn nine_grid_saturates_at_coordinate_limits() {
        let corner = GridCoordinate::new(i32::MAX, i32::MIN);
        let cells = corner.nine_grid();
        assert!(cells.contains(&corner));
        assert!(cells.contains(&GridCoordinate::new(i32::MAX - 1, i32::MIN + 1)));
        assert!(cells.iter().all(|c| c.x >= i32::MAX - 1 && c.z <= i32::MIN + 1));
    }

    #[test]
    fn square_matches_nine_grid_for_one_ring() {
        let center = GridCoordinate::new(2, 7);
        let mut square: Vec<_> = center.square(1).collect();
        let mut nine = center.nine_grid().to_vec();
        square.sort_by_key(|c| (c.x, c.z));
        nine.sort_by_key(|c| (c.x, c.z));
        assert_eq!(square, nine);
        assert_eq!(center.square(2).count(), 25);
    }

    #[test]
    fn distances() {
        let a = GridCoordinate::new(0, 0);
        let b = GridCoordinate::new(2, -3);
        assert_eq!(a.manhattan_distance(b), 5);
        assert_eq!(a.chebyshev_distance(b), 3);
    }

    #[test]
    fn bounds_dimensions_round_up() {
        let bounds = GridBounds::new(Vec3::ZERO, Vec3::new(1050.0, 0.0, 300.0));
        assert!(bounds.is_valid());
        assert_eq!(bounds.dimensions(100.0), (11, 3));
    }
}
