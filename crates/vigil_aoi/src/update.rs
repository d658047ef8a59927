//! Bounded position-update queue.

use crate::error::AoiError;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use vigil_core::glam::Vec3;
use vigil_core::EntityId;

/// One reported position, waiting for the next batch drain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateTask {
    pub entity: EntityId,
    pub position: Vec3,
    /// Milliseconds since the Unix epoch at enqueue.
    pub enqueued_at: u64,
    /// Registration the update was reported against.
    pub(crate) generation: u64,
}

impl UpdateTask {
    pub fn new(entity: EntityId, position: Vec3) -> Self {
        Self {
            entity,
            position,
            enqueued_at: vigil_core::time::now_millis(),
            generation: 0,
        }
    }

    pub(crate) fn for_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct DrainedBatch {
    pub tasks: Vec<UpdateTask>,
    /// Updates superseded by a later one for the same entity.
    pub coalesced: usize,
}

pub(crate) struct UpdateQueue {
    tx: mpsc::Sender<UpdateTask>,
    rx: Mutex<mpsc::Receiver<UpdateTask>>,
    capacity: usize,
}

impl UpdateQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
        }
    }

    /// Updates waiting to be drained.
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn try_enqueue(&self, task: UpdateTask) -> Result<(), AoiError> {
        self.tx.try_send(task).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => AoiError::Backpressure {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => AoiError::Stopped,
        })
    }

    pub async fn enqueue_within(&self, task: UpdateTask, timeout: Duration) -> Result<(), AoiError> {
        self.tx.send_timeout(task, timeout).await.map_err(|err| match err {
            mpsc::error::SendTimeoutError::Timeout(_) => AoiError::EnqueueTimeout(timeout),
            mpsc::error::SendTimeoutError::Closed(_) => AoiError::Stopped,
        })
    }

    /// Take up to `max` queued updates in FIFO order.
    ///
    /// With `coalesce`, later updates for an entity registration replace
    /// earlier ones in place, so each appears at most once per batch.
    pub fn drain(&self, max: usize, coalesce: bool) -> DrainedBatch {
        let mut rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        let mut batch = DrainedBatch::default();
        let mut slots: HashMap<(EntityId, u64), usize> = HashMap::new();

        for _ in 0..max {
            let Ok(task) = rx.try_recv() else { break };
            if coalesce {
                let key = (task.entity, task.generation);
                if let Some(&slot) = slots.get(&key) {
                    batch.tasks[slot] = task;
                    batch.coalesced += 1;
                    continue;
                }
                slots.insert(key, batch.tasks.len());
            }
            batch.tasks.push(task);
        }
        batch
    }

    /// Drop everything queued. Returns how many updates were discarded.
    pub fn discard(&self) -> usize {
        let mut rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        let mut discarded = 0;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64, x: f32) -> UpdateTask {
        UpdateTask::new(EntityId::new(id), Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn rejects_when_full() {
        let queue = UpdateQueue::new(2);
        queue.try_enqueue(task(1, 0.0)).unwrap();
        queue.try_enqueue(task(2, 0.0)).unwrap();
        assert!(matches!(
            queue.try_enqueue(task(3, 0.0)),
            Err(AoiError::Backpressure { capacity: 2 })
        ));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn drain_is_fifo_and_bounded() {
        let queue = UpdateQueue::new(8);
        for i in 1..=5 {
            queue.try_enqueue(task(i, i as f32)).unwrap();
        }
        let batch = queue.drain(3, false);
        let ids: Vec<_> = batch.tasks.iter().map(|t| t.entity.raw()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn coalescing_keeps_last_position() {
        let queue = UpdateQueue::new(8);
        queue.try_enqueue(task(1, 1.0)).unwrap();
        queue.try_enqueue(task(2, 5.0)).unwrap();
        queue.try_enqueue(task(1, 2.0)).unwrap();
        queue.try_enqueue(task(1, 3.0)).unwrap();

        let batch = queue.drain(10, true);
        assert_eq!(batch.coalesced, 2);
        assert_eq!(batch.tasks.len(), 2);
        assert_eq!(batch.tasks[0].entity, EntityId::new(1));
        assert_eq!(batch.tasks[0].position.x, 3.0);
        assert_eq!(batch.tasks[1].entity, EntityId::new(2));
    }

    #[test]
    fn coalescing_keeps_registrations_apart() {
        let queue = UpdateQueue::new(8);
        queue.try_enqueue(task(1, 1.0).for_generation(1)).unwrap();
        queue.try_enqueue(task(1, 2.0).for_generation(2)).unwrap();
        queue.try_enqueue(task(1, 3.0).for_generation(2)).unwrap();

        let batch = queue.drain(10, true);
        assert_eq!(batch.coalesced, 1);
        let kept: Vec<_> = batch.tasks.iter().map(|t| (t.generation, t.position.x)).collect();
        assert_eq!(kept, vec![(1, 1.0), (2, 3.0)]);
    }

    #[test]
    fn discard_empties_queue() {
        let queue = UpdateQueue::new(4);
        queue.try_enqueue(task(1, 0.0)).unwrap();
        queue.try_enqueue(task(1, 1.0)).unwrap();
        assert_eq!(queue.discard(), 2);
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn waits_then_times_out() {
        let queue = UpdateQueue::new(1);
        queue.try_enqueue(task(1, 0.0)).unwrap();
        let timeout = Duration::from_millis(10);
        assert!(matches!(
            queue.enqueue_within(task(2, 0.0), timeout).await,
            Err(AoiError::EnqueueTimeout(t)) if t == timeout
        ));
        queue.drain(1, true);
        queue.enqueue_within(task(2, 0.0), timeout).await.unwrap();
    }
}
