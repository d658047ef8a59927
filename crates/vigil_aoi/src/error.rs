use crate::config::ConfigError;
use std::time::Duration;
use thiserror::Error;
use vigil_core::EntityId;

/// Failures reported by the AOI manager's caller-facing operations.
///
/// Nothing here crosses the pipeline boundary: errors inside the update and
/// event pipelines are logged and the affected task is dropped.
#[derive(Debug, Error)]
pub enum AoiError {
    #[error("entity id {0} is reserved and cannot be registered")]
    InvalidEntityId(EntityId),

    #[error("entity {0} is already registered")]
    AlreadyRegistered(EntityId),

    #[error("entity {0} is not registered")]
    NotRegistered(EntityId),

    #[error("view range must be positive and finite, got {0}")]
    InvalidViewRange(f32),

    #[error("AOI engine is not running")]
    Stopped,

    #[error("update queue is full ({capacity} updates pending)")]
    Backpressure { capacity: usize },

    #[error("update queue stayed full for {0:?}")]
    EnqueueTimeout(Duration),

    #[error("no tokio runtime available to start the AOI engine")]
    NoRuntime,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
