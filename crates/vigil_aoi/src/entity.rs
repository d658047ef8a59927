//! Entities as seen by the AOI engine.

use crate::error::AoiError;
use crate::event::{AoiEvent, EventSink};
use crate::visibility::VisibilityPolicy;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use vigil_core::glam::Vec3;
use vigil_core::math::DistanceMetric;
use vigil_core::{EntityId, EntityKind};

/// Plain-data snapshot of an entity, handed to visibility policies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec3,
    pub view_range: f32,
    /// Inactive entities are skipped as viewers but stay visible to others.
    pub active: bool,
    /// Hidden entities are never seen.
    pub visible: bool,
}

impl EntityView {
    pub fn distance_to(&self, other: &EntityView, metric: DistanceMetric) -> f32 {
        metric.distance_squared(self.position, other.position).sqrt()
    }
}

/// Registration request for one entity.
///
/// Events about what this entity starts or stops watching go to its sink.
/// Entities without a sink, or built with [`AoiEntity::without_events`],
/// are still tracked and still produce relation changes.
pub struct AoiEntity {
    id: EntityId,
    kind: EntityKind,
    position: Vec3,
    view_range: Option<f32>,
    active: bool,
    visible: bool,
    needs_events: bool,
    policy: Option<Arc<dyn VisibilityPolicy>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl AoiEntity {
    pub fn new(id: EntityId, kind: EntityKind, position: Vec3) -> Self {
        Self {
            id,
            kind,
            position,
            view_range: None,
            active: true,
            visible: true,
            needs_events: true,
            policy: None,
            sink: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Override the configured default view range.
    pub fn with_view_range(mut self, view_range: f32) -> Self {
        self.view_range = Some(view_range);
        self
    }

    pub fn with_policy(mut self, policy: impl VisibilityPolicy + 'static) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn with_shared_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach a fresh bounded channel as the sink and hand back its receiver.
    pub fn subscribe(self, capacity: usize) -> (Self, mpsc::Receiver<AoiEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (self.with_sink(tx), rx)
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn without_events(mut self) -> Self {
        self.needs_events = false;
        self
    }

    pub(crate) fn into_record(self, default_view_range: f32) -> Result<EntityRecord, AoiError> {
        if !self.id.is_valid() {
            return Err(AoiError::InvalidEntityId(self.id));
        }
        let view_range = self.view_range.unwrap_or(default_view_range);
        validate_view_range(view_range)?;
        Ok(EntityRecord {
            view: EntityView {
                id: self.id,
                kind: self.kind,
                position: self.position,
                view_range,
                active: self.active,
                visible: self.visible,
            },
            generation: 0,
            needs_events: self.needs_events,
            policy: self.policy,
            sink: self.sink,
        })
    }
}

impl fmt::Debug for AoiEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AoiEntity")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("position", &self.position)
            .field("view_range", &self.view_range)
            .field("active", &self.active)
            .field("visible", &self.visible)
            .field("needs_events", &self.needs_events)
            .field("has_policy", &self.policy.is_some())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

pub(crate) fn validate_view_range(view_range: f32) -> Result<(), AoiError> {
    if view_range.is_finite() && view_range > 0.0 {
        Ok(())
    } else {
        Err(AoiError::InvalidViewRange(view_range))
    }
}

/// Registry entry owned by the manager.
pub(crate) struct EntityRecord {
    pub view: EntityView,
    /// Assigned by the manager on registration; unique for the manager's life.
    pub generation: u64,
    pub needs_events: bool,
    pub policy: Option<Arc<dyn VisibilityPolicy>>,
    pub sink: Option<Arc<dyn EventSink>>,
}
