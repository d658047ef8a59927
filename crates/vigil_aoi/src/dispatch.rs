//! Event pipeline: inline delivery, or a bounded queue drained by workers.

use crate::config::AoiConfig;
use crate::entity::EntityRecord;
use crate::event::{AoiEvent, AoiEventKind};
use crate::manager::Shared;
use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, trace, warn};
use vigil_core::EntityId;
use vigil_metrics::AoiStatistics;

pub(crate) type SharedReceiver = Arc<Mutex<mpsc::Receiver<Envelope>>>;

/// An event bound to one registration of its source entity. Delivery is
/// skipped when the id has since been unregistered and registered again.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub event: AoiEvent,
    pub generation: u64,
}

struct EventQueue {
    tx: mpsc::Sender<Envelope>,
    rx: SharedReceiver,
    capacity: usize,
}

pub(crate) struct EventPipeline {
    queue: Option<EventQueue>,
}

impl EventPipeline {
    pub fn new(config: &AoiConfig) -> Self {
        let queue = config.async_event_processing.then(|| {
            let capacity = config.event_queue_size.max(1);
            let (tx, rx) = mpsc::channel(capacity);
            EventQueue {
                tx,
                rx: Arc::new(Mutex::new(rx)),
                capacity,
            }
        });
        Self { queue }
    }

    pub fn is_async(&self) -> bool {
        self.queue.is_some()
    }

    /// Events queued but not yet delivered.
    pub fn pending(&self) -> usize {
        self.queue
            .as_ref()
            .map(|q| q.capacity - q.tx.capacity())
            .unwrap_or(0)
    }

    pub fn receiver(&self) -> Option<SharedReceiver> {
        self.queue.as_ref().map(|q| Arc::clone(&q.rx))
    }

    /// Deliver inline, or queue for the workers. A full queue drops the event.
    pub fn emit(&self, envelope: Envelope, registry: &DashMap<EntityId, EntityRecord>, stats: &AoiStatistics) {
        let Some(queue) = &self.queue else {
            deliver(envelope, registry, stats);
            return;
        };
        match queue.tx.try_send(envelope) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(Envelope { event, .. })) => {
                stats.events_dropped.increment();
                warn!(
                    kind = ?event.kind,
                    source = %event.source,
                    target = %event.target,
                    capacity = queue.capacity,
                    "event queue full, event dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                stats.events_dropped.increment();
            }
        }
    }

    /// Drop queued events. Only succeeds once no worker holds the receiver.
    pub fn discard(&self) -> usize {
        let Some(queue) = &self.queue else { return 0 };
        let Ok(mut rx) = queue.rx.try_lock() else {
            return 0;
        };
        let mut discarded = 0;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

/// Hand one event to its source entity's sink.
///
/// Sink failures and panics are contained here and counted; they never
/// reach the pipeline that produced the event.
pub(crate) fn deliver(envelope: Envelope, registry: &DashMap<EntityId, EntityRecord>, stats: &AoiStatistics) {
    let Envelope { event, generation } = envelope;
    match event.kind {
        AoiEventKind::Enter => stats.enter_events.increment(),
        AoiEventKind::Leave => stats.leave_events.increment(),
    };

    let (kind, source, target) = (event.kind, event.source, event.target);
    let sink = match registry.get(&source) {
        Some(record) if record.generation != generation => {
            trace!(%source, %target, "event for an earlier registration dropped");
            None
        }
        Some(record) if record.needs_events => record.sink.clone(),
        Some(_) => None,
        None => {
            trace!(%source, %target, "event source no longer registered");
            None
        }
    };
    let Some(sink) = sink else { return };

    match catch_unwind(AssertUnwindSafe(move || sink.deliver(event))) {
        Ok(Ok(())) => trace!(?kind, %source, %target, "event delivered"),
        Ok(Err(err)) => {
            stats.deliveries_failed.increment();
            debug!(?kind, %source, %target, %err, "event delivery failed");
        }
        Err(_) => {
            stats.deliveries_failed.increment();
            error!(?kind, %source, %target, "event sink panicked");
        }
    }
}

/// Worker loop: pull events off the shared queue until shutdown.
pub(crate) async fn run_worker(
    worker: usize,
    rx: SharedReceiver,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(worker, "event worker started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        let next = {
            let mut guard = tokio::select! {
                guard = rx.lock() => guard,
                _ = shutdown.changed() => break,
            };
            tokio::select! {
                event = guard.recv() => event,
                _ = shutdown.changed() => break,
            }
        };
        let Some(envelope) = next else { break };
        deliver(envelope, &shared.entities, &shared.stats);
    }
    debug!(worker, "event worker stopped");
}
