//! Vigil AOI Engine
//!
//! Decides, for every entity in a shared scene, which other entities are of
//! interest to it, and emits ENTER/LEAVE notifications as that set changes.
//!
//! Callers never touch the spatial structures directly. They register
//! entities, report positions into a bounded queue, and receive events as
//! messages on the sink attached to each entity:
//!
//! ```no_run
//! use vigil_aoi::{AoiConfig, AoiEntity, AoiManager};
//! use vigil_core::{glam::Vec3, EntityId, EntityKind};
//!
//! # async fn run() -> Result<(), vigil_aoi::AoiError> {
//! let manager = AoiManager::new(AoiConfig::default())?;
//! let (hero, mut events) =
//!     AoiEntity::new(EntityId::new(1), EntityKind::Player, Vec3::ZERO).subscribe(64);
//! manager.register_entity(hero)?;
//! manager.start()?;
//!
//! manager.update_position(EntityId::new(1), Vec3::new(10.0, 0.0, 4.0))?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?} {} -> {}", event.kind, event.source, event.target);
//! }
//! manager.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
pub mod config;
mod dispatch;
pub mod entity;
pub mod error;
pub mod event;
pub mod manager;
pub mod report;
mod update;
pub mod visibility;

pub use broadcast::WatcherTransport;
pub use config::{AoiConfig, BackpressurePolicy, ConfigError};
pub use entity::{AoiEntity, EntityView};
pub use error::AoiError;
pub use event::{AoiEvent, AoiEventKind, DeliveryError, EventPayload, EventSink};
pub use manager::AoiManager;
pub use report::StatisticsReport;
pub use update::UpdateTask;
pub use visibility::{BlindPolicy, KindFilterPolicy, RangePolicy, StealthPolicy, VisibilityPolicy};
