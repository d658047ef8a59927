//! Deterministic math utilities
//!
//! Re-exports glam with the distance helpers used by visibility checks

pub use glam::*;

/// Distance measure used when deciding whether one entity sees another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Full 3D distance.
    #[default]
    Euclidean,
    /// Ignores the vertical (y) axis.
    Planar,
}

impl DistanceMetric {
    #[inline]
    pub fn distance_squared(self, a: Vec3, b: Vec3) -> f32 {
        match self {
            DistanceMetric::Euclidean => a.distance_squared(b),
            DistanceMetric::Planar => planar_distance_squared(a, b),
        }
    }

    #[inline]
    pub fn within(self, a: Vec3, b: Vec3, range: f32) -> bool {
        range >= 0.0 && self.distance_squared(a, b) <= range * range
    }
}

/// Squared distance on the x/z plane.
#[inline]
pub fn planar_distance_squared(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

/// Deterministic random number generator for reproducible simulations.
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        // LCG constants
        const A: u64 = 1664525;
        const C: u64 = 1013904223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        self.state as u32
    }

    pub fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }

    /// Uniform sample in `[min, max)`.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_ignores_height() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 100.0, 4.0);
        assert_eq!(DistanceMetric::Planar.distance_squared(a, b), 25.0);
        assert!(DistanceMetric::Planar.within(a, b, 5.0));
        assert!(!DistanceMetric::Euclidean.within(a, b, 5.0));
    }

    #[test]
    fn rng_is_reproducible() {
        let mut a = DeterministicRng::new(42);
        let mut b = DeterministicRng::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        let v = a.range_f32(10.0, 20.0);
        assert!((10.0..=20.0).contains(&v));
    }
}
