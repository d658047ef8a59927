//! Vigil Services Layer
//!
//! Settings storage for the engine binary.

pub mod settings;

pub use settings::{LoggingSettings, Settings, SettingsError};
