//! ENTER/LEAVE notifications and the sinks that receive them.

use serde::Serialize;
use std::sync::mpsc as std_mpsc;
use thiserror::Error;
use tokio::sync::mpsc;
use vigil_core::glam::Vec3;
use vigil_core::{EntityId, EntityKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AoiEventKind {
    Enter,
    Leave,
}

/// Extra data carried with an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// State of the target when it entered view.
    Snapshot { position: Vec3, kind: EntityKind },
    /// The target left because it was unregistered.
    Removed,
}

/// `source` started or stopped watching `target`. Delivered to `source`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AoiEvent {
    pub kind: AoiEventKind,
    pub source: EntityId,
    pub target: EntityId,
    pub payload: Option<EventPayload>,
    /// Milliseconds since the Unix epoch at creation.
    pub timestamp: u64,
}

impl AoiEvent {
    pub fn new(kind: AoiEventKind, source: EntityId, target: EntityId) -> Self {
        Self {
            kind,
            source,
            target,
            payload: None,
            timestamp: vigil_core::time::now_millis(),
        }
    }

    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber queue is full")]
    Full,
    #[error("subscriber has gone away")]
    Closed,
    #[error("subscriber rejected event: {0}")]
    Rejected(String),
}

/// Receives the events addressed to one entity.
///
/// Called from the event pipeline, never while the engine holds one of its
/// locks, so a sink may call back into the manager. Must not block.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: AoiEvent) -> Result<(), DeliveryError>;
}

impl EventSink for mpsc::Sender<AoiEvent> {
    fn deliver(&self, event: AoiEvent) -> Result<(), DeliveryError> {
        self.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

impl EventSink for std_mpsc::SyncSender<AoiEvent> {
    fn deliver(&self, event: AoiEvent) -> Result<(), DeliveryError> {
        self.try_send(event).map_err(|err| match err {
            std_mpsc::TrySendError::Full(_) => DeliveryError::Full,
            std_mpsc::TrySendError::Disconnected(_) => DeliveryError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokio_sender_reports_full_and_closed() {
        let (tx, mut rx) = mpsc::channel(1);
        let event = AoiEvent::new(AoiEventKind::Enter, EntityId::new(1), EntityId::new(2));
        assert_eq!(tx.deliver(event.clone()), Ok(()));
        assert_eq!(tx.deliver(event.clone()), Err(DeliveryError::Full));
        assert_eq!(rx.try_recv().unwrap(), event);
        drop(rx);
        assert_eq!(tx.deliver(event), Err(DeliveryError::Closed));
    }

    #[test]
    fn std_sender_delivers() {
        let (tx, rx) = std_mpsc::sync_channel(4);
        let event = AoiEvent::new(AoiEventKind::Leave, EntityId::new(5), EntityId::new(6))
            .with_payload(EventPayload::Removed);
        tx.deliver(event.clone()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), event);
    }

    #[test]
    fn serializes_for_the_wire() {
        let event = AoiEvent {
            kind: AoiEventKind::Enter,
            source: EntityId::new(1),
            target: EntityId::new(2),
            payload: Some(EventPayload::Snapshot {
                position: Vec3::new(1.0, 2.0, 3.0),
                kind: EntityKind::Npc,
            }),
            timestamp: 42,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "enter");
        assert_eq!(json["source"], 1);
        assert_eq!(json["payload"]["type"], "snapshot");
    }
}
