//! Settings management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use vigil_aoi::{AoiConfig, ConfigError};

/// Engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub aoi: AoiConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info,vigil_aoi=info".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid AOI settings: {0}")]
    Invalid(#[from] ConfigError),
}

impl Settings {
    /// Parse and validate settings JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.aoi.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                debug!("no settings file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_aoi::BackpressurePolicy;

    #[test]
    fn empty_object_is_all_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn overrides_nested_fields() {
        let settings = Settings::from_json(
            r#"{
                "aoi": { "grid_size": 50.0, "async_event_processing": false,
                         "backpressure": { "mode": "wait", "timeout_ms": 25 } },
                "logging": { "filter": "debug" }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.aoi.grid_size, 50.0);
        assert!(!settings.aoi.async_event_processing);
        assert_eq!(settings.aoi.backpressure, BackpressurePolicy::Wait { timeout_ms: 25 });
        assert_eq!(settings.aoi.batch_size, 100);
        assert_eq!(settings.logging.filter, "debug");
    }

    #[test]
    fn rejects_invalid_config_and_bad_json() {
        assert!(matches!(
            Settings::from_json(r#"{ "aoi": { "batch_size": 0 } }"#),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!("vigil-settings-{}.json", std::process::id()));
        let mut settings = Settings::default();
        settings.aoi.default_view_range = 80.0;
        std::fs::write(&path, settings.to_json().unwrap()).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(Settings::load(&path), Err(SettingsError::Io { .. })));
        assert_eq!(Settings::load_or_default(None).unwrap(), Settings::default());
    }
}
