//! AOI engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use vigil_core::math::DistanceMetric;
use vigil_core::GridBounds;

/// What `report_position` does when the update queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Fail immediately.
    #[default]
    Reject,
    /// Wait for room, up to `timeout_ms`.
    Wait { timeout_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AoiConfig {
    /// World units per grid cell.
    pub grid_size: f32,
    /// View range for entities registered without one.
    pub default_view_range: f32,
    /// Period of the batch update drain.
    pub update_interval_ms: u64,
    /// Maximum updates applied per drain.
    pub batch_size: usize,
    pub update_queue_size: usize,
    pub event_queue_size: usize,
    /// Event worker tasks when delivery is asynchronous.
    pub thread_pool_size: usize,
    /// Queue events for worker delivery instead of delivering inline.
    pub async_event_processing: bool,
    /// Apply only the last queued position per entity within one batch.
    pub coalesce_updates: bool,
    pub backpressure: BackpressurePolicy,
    pub distance_metric: DistanceMetric,
    /// Period of the derived statistics refresh.
    pub stats_interval_ms: u64,
    /// Scene bounds; unbounded grids clamp coordinates to `>= 0` only.
    pub bounds: Option<GridBounds>,
}

impl Default for AoiConfig {
    fn default() -> Self {
        Self {
            grid_size: 100.0,
            default_view_range: 150.0,
            update_interval_ms: vigil_core::time::DEFAULT_UPDATE_INTERVAL.as_millis() as u64,
            batch_size: 100,
            update_queue_size: 10_000,
            event_queue_size: 10_000,
            thread_pool_size: 2,
            async_event_processing: true,
            coalesce_updates: true,
            backpressure: BackpressurePolicy::Reject,
            distance_metric: DistanceMetric::Euclidean,
            stats_interval_ms: vigil_core::time::DEFAULT_STATS_INTERVAL.as_millis() as u64,
            bounds: None,
        }
    }
}

impl AoiConfig {
    pub fn new(grid_size: f32, default_view_range: f32) -> Self {
        Self {
            grid_size,
            default_view_range,
            ..Self::default()
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_f32("grid_size", self.grid_size)?;
        positive_f32("default_view_range", self.default_view_range)?;
        positive("update_interval_ms", self.update_interval_ms)?;
        positive("batch_size", self.batch_size as u64)?;
        positive("update_queue_size", self.update_queue_size as u64)?;
        positive("event_queue_size", self.event_queue_size as u64)?;
        positive("stats_interval_ms", self.stats_interval_ms)?;
        if self.async_event_processing {
            positive("thread_pool_size", self.thread_pool_size as u64)?;
        }
        if let BackpressurePolicy::Wait { timeout_ms } = self.backpressure {
            positive("backpressure.timeout_ms", timeout_ms)?;
        }
        if let Some(bounds) = self.bounds {
            if !bounds.is_valid() {
                return Err(ConfigError::InvalidBounds {
                    min: bounds.min.to_array(),
                    max: bounds.max.to_array(),
                });
            }
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { field });
    }
    Ok(())
}

fn positive_f32(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("`{field}` must be greater than zero")]
    Zero { field: &'static str },

    #[error("`{field}` must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("bounds min {min:?} must be below max {max:?} on x and z")]
    InvalidBounds { min: [f32; 3], max: [f32; 3] },
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::glam::Vec3;

    #[test]
    fn defaults_are_valid() {
        let config = AoiConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.update_interval(), Duration::from_millis(200));
        assert_eq!(config.stats_interval(), Duration::from_secs(10));
    }

    #[test]
    fn rejects_bad_values() {
        let config = AoiConfig::new(0.0, 10.0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "grid_size", value: 0.0 })
        );

        let config = AoiConfig { update_queue_size: 0, ..AoiConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::Zero { field: "update_queue_size" }));

        let config = AoiConfig {
            backpressure: BackpressurePolicy::Wait { timeout_ms: 0 },
            ..AoiConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AoiConfig {
            bounds: Some(GridBounds::new(Vec3::splat(10.0), Vec3::ZERO)),
            ..AoiConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBounds { .. })));
    }

    #[test]
    fn sync_delivery_ignores_pool_size() {
        let config = AoiConfig {
            async_event_processing: false,
            thread_pool_size: 0,
            ..AoiConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn deserializes_partial_json() {
        let config: AoiConfig = serde_json::from_str(
            r#"{ "grid_size": 64.0, "backpressure": { "mode": "wait", "timeout_ms": 5 } }"#,
        )
        .unwrap();
        assert_eq!(config.grid_size, 64.0);
        assert_eq!(config.backpressure, BackpressurePolicy::Wait { timeout_ms: 5 });
        assert_eq!(config.batch_size, 100);
    }
}
