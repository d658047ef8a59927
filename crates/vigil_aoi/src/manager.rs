//! The AOI manager: entity registry, update scheduler and event emission.
//!
//! Writers (registration, removal, recomputation) are serialized by a single
//! gate so the grid, the watch table and the registry always move together.
//! Readers go straight to the concurrent maps and see a snapshot that is at
//! most one in-flight operation old.

use crate::broadcast::WatcherTransport;
use crate::config::{AoiConfig, BackpressurePolicy};
use crate::dispatch::{self, Envelope, EventPipeline};
use crate::entity::{validate_view_range, AoiEntity, EntityRecord, EntityView};
use crate::error::AoiError;
use crate::event::{AoiEvent, AoiEventKind, EventPayload};
use crate::report::StatisticsReport;
use crate::update::{UpdateQueue, UpdateTask};
use crate::visibility::{RangePolicy, VisibilityPolicy};
use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};
use vigil_core::glam::Vec3;
use vigil_core::{EntityId, EntityKind, SpatialGrid, WatchTable};
use vigil_metrics::{AoiStatistics, BatchTimer};

/// How long `stop` waits for a background task before aborting it.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Changes to one viewer's watching set.
struct ViewDiff {
    generation: u64,
    entering: Vec<EntityView>,
    leaving: Vec<EntityId>,
}

/// State shared between the manager handle and its background tasks.
pub(crate) struct Shared {
    pub config: AoiConfig,
    pub grid: SpatialGrid,
    pub watch: WatchTable,
    pub entities: DashMap<EntityId, EntityRecord>,
    pub stats: AoiStatistics,
    kind_policies: DashMap<EntityKind, Arc<dyn VisibilityPolicy>>,
    default_policy: Arc<dyn VisibilityPolicy>,
    updates: UpdateQueue,
    events: EventPipeline,
    timer: Mutex<BatchTimer>,
    writer: Mutex<()>,
    next_generation: AtomicU64,
    running: AtomicBool,
}

impl Shared {
    fn running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn write_gate(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `event` for the workers, or hold it in `outbox` for inline
    /// delivery once the write gate is released.
    fn emit(&self, event: AoiEvent, generation: u64, outbox: &mut Vec<Envelope>) {
        let envelope = Envelope { event, generation };
        if self.events.is_async() {
            self.events.emit(envelope, &self.entities, &self.stats);
        } else {
            outbox.push(envelope);
        }
    }

    /// Deliver held events. Callers must not hold the write gate.
    fn flush_outbox(&self, outbox: Vec<Envelope>) {
        for envelope in outbox {
            self.events.emit(envelope, &self.entities, &self.stats);
        }
    }

    /// Entity override, then kind policy, then the range default.
    fn policy_for(
        &self,
        own: Option<Arc<dyn VisibilityPolicy>>,
        kind: EntityKind,
    ) -> Arc<dyn VisibilityPolicy> {
        own.or_else(|| self.kind_policies.get(&kind).map(|p| Arc::clone(p.value())))
            .unwrap_or_else(|| Arc::clone(&self.default_policy))
    }

    fn view_of(&self, id: EntityId) -> Option<EntityView> {
        self.entities.get(&id).map(|record| record.view)
    }

    /// Work out what `id` should be watching now. Read-only.
    fn compute_view(&self, id: EntityId) -> Option<ViewDiff> {
        let (viewer, generation, own_policy) = {
            let record = self.entities.get(&id)?;
            (record.view, record.generation, record.policy.clone())
        };
        if !viewer.active {
            return None;
        }
        let policy = self.policy_for(own_policy, viewer.kind);

        let candidates = self.grid.neighbors_nine_grid(self.grid.cell_of(viewer.position));
        let mut visible: HashMap<EntityId, EntityView> = HashMap::with_capacity(candidates.len());
        for candidate in candidates {
            if candidate == id {
                continue;
            }
            let Some(target) = self.view_of(candidate) else { continue };
            if policy.can_see(&viewer, &target) {
                visible.insert(candidate, target);
            }
        }

        let current = self.watch.watching_of(id);
        let mut entering: Vec<EntityView> = visible
            .values()
            .filter(|target| !current.contains(&target.id))
            .copied()
            .collect();
        let mut leaving: Vec<EntityId> = current
            .into_iter()
            .filter(|watched| !visible.contains_key(watched))
            .collect();
        entering.sort_by_key(|target| target.id);
        leaving.sort();
        Some(ViewDiff {
            generation,
            entering,
            leaving,
        })
    }

    /// Apply a diff to the watch table and emit one event per changed
    /// relation. Returns whether anything changed.
    fn apply_diff(&self, id: EntityId, diff: ViewDiff, outbox: &mut Vec<Envelope>) -> bool {
        let mut changed = false;
        for target in diff.entering {
            if self.watch.add_relation(id, target.id) {
                changed = true;
                let event = AoiEvent::new(AoiEventKind::Enter, id, target.id).with_payload(
                    EventPayload::Snapshot {
                        position: target.position,
                        kind: target.kind,
                    },
                );
                self.emit(event, diff.generation, outbox);
            }
        }
        for target in diff.leaving {
            if self.watch.remove_relation(id, target) {
                changed = true;
                let event = AoiEvent::new(AoiEventKind::Leave, id, target);
                self.emit(event, diff.generation, outbox);
            }
        }
        changed
    }

    /// Recompute one viewer. Caller holds the write gate.
    fn recompute_locked(&self, id: EntityId, outbox: &mut Vec<Envelope>) -> bool {
        match catch_unwind(AssertUnwindSafe(|| self.compute_view(id))) {
            Ok(Some(diff)) => self.apply_diff(id, diff, outbox),
            Ok(None) => false,
            Err(_) => {
                error!(%id, "recomputation panicked, watching set left unchanged");
                false
            }
        }
    }

    fn apply_update(&self, task: UpdateTask) -> bool {
        let mut outbox = Vec::new();
        {
            let _gate = self.write_gate();
            match self.entities.get_mut(&task.entity) {
                Some(mut record) if record.generation == task.generation => {
                    record.view.position = task.position;
                }
                Some(_) => {
                    debug!(entity = %task.entity, "update for an earlier registration dropped");
                    return false;
                }
                None => {
                    debug!(entity = %task.entity, "update for unregistered entity dropped");
                    return false;
                }
            }
            let crossed = self.grid.move_to(task.entity, task.position);
            self.stats.updates.increment();
            trace!(
                entity = %task.entity,
                crossed,
                queued_ms = vigil_core::time::millis_since(task.enqueued_at),
                "update applied"
            );
            self.recompute_locked(task.entity, &mut outbox);
        }
        self.flush_outbox(outbox);
        true
    }

    /// Drain and apply one batch. With `cooperative`, a stop request ends
    /// the batch between tasks.
    fn process_batch(&self, cooperative: bool) -> usize {
        let batch = self
            .updates
            .drain(self.config.batch_size, self.config.coalesce_updates);
        if batch.tasks.is_empty() {
            return 0;
        }

        let started = std::time::Instant::now();
        let coalesced = batch.coalesced;
        let total = batch.tasks.len();
        self.stats.updates_coalesced.add(coalesced as u64);

        let mut applied = 0;
        for (index, task) in batch.tasks.into_iter().enumerate() {
            if cooperative && !self.running() {
                debug!(dropped = total - index, "stop requested, rest of batch dropped");
                break;
            }
            if self.apply_update(task) {
                applied += 1;
            }
        }

        let elapsed = started.elapsed();
        let average_ms = {
            let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
            timer.record(elapsed);
            timer.batch_time_ms()
        };
        self.stats.batches.increment();
        self.stats.avg_batch_ms.set(average_ms);
        debug!(
            applied,
            coalesced,
            elapsed_us = elapsed.as_micros() as u64,
            "update batch processed"
        );
        applied
    }

    fn refresh_statistics(&self) {
        let compacted = self.grid.clean_empty_cells();
        let grid = self.grid.statistics();
        self.stats.avg_entities_per_cell.set(grid.avg_entities_per_cell);
        debug!(
            entities = self.stats.entities.get(),
            active_cells = grid.active_cells,
            compacted,
            avg_entities_per_cell = grid.avg_entities_per_cell,
            pending_updates = self.updates.len(),
            pending_events = self.events.pending(),
            total_events = self.stats.total_events(),
            "AOI statistics"
        );
    }
}

#[derive(Default)]
struct Lifecycle {
    shutdown: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

/// Area-of-interest engine.
///
/// Positions reported through [`update_position`](Self::update_position)
/// are applied in batches every `update_interval_ms` once
/// [`start`](Self::start) has been called. Each applied update recomputes
/// what the moved entity can see and emits ENTER/LEAVE events to it.
///
/// Recomputation is one-directional: moving `a` refreshes what `a`
/// watches, not who watches `a`. Use [`recompute`](Self::recompute) on
/// the other side for symmetric updates.
///
/// Inline event delivery happens after the manager's locks are released, so
/// an [`EventSink`](crate::EventSink) may call back into the manager.
pub struct AoiManager {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

impl AoiManager {
    pub fn new(config: AoiConfig) -> Result<Self, AoiError> {
        config.validate()?;
        let grid = match config.bounds {
            Some(bounds) => SpatialGrid::with_bounds(config.grid_size, bounds),
            None => SpatialGrid::new(config.grid_size),
        };
        let shared = Shared {
            grid,
            watch: WatchTable::new(),
            entities: DashMap::new(),
            stats: AoiStatistics::new(),
            kind_policies: DashMap::new(),
            default_policy: Arc::new(RangePolicy::new(config.distance_metric)),
            updates: UpdateQueue::new(config.update_queue_size),
            events: EventPipeline::new(&config),
            timer: Mutex::new(BatchTimer::default()),
            writer: Mutex::new(()),
            next_generation: AtomicU64::new(1),
            running: AtomicBool::new(false),
            config,
        };
        debug!(
            grid_size = shared.config.grid_size,
            async_events = shared.events.is_async(),
            "AOI manager created"
        );
        Ok(Self {
            shared: Arc::new(shared),
            lifecycle: Mutex::new(Lifecycle::default()),
        })
    }

    pub fn config(&self) -> &AoiConfig {
        &self.shared.config
    }

    pub fn is_running(&self) -> bool {
        self.shared.running()
    }

    /// Spawn the batch scheduler and, for async delivery, the event workers
    /// on the current tokio runtime. Starting twice is a no-op.
    pub fn start(&self) -> Result<(), AoiError> {
        let handle = Handle::try_current().map_err(|_| AoiError::NoRuntime)?;
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = vec![handle.spawn(run_scheduler(
            Arc::clone(&self.shared),
            shutdown_rx.clone(),
        ))];
        let mut workers = 0;
        if let Some(rx) = self.shared.events.receiver() {
            workers = self.shared.config.thread_pool_size;
            for worker in 0..workers {
                tasks.push(handle.spawn(dispatch::run_worker(
                    worker,
                    Arc::clone(&rx),
                    Arc::clone(&self.shared),
                    shutdown_rx.clone(),
                )));
            }
        }
        lifecycle.shutdown = Some(shutdown_tx);
        lifecycle.tasks = tasks;

        info!(
            update_interval_ms = self.shared.config.update_interval_ms,
            batch_size = self.shared.config.batch_size,
            event_workers = workers,
            "AOI engine started"
        );
        Ok(())
    }

    /// Stop the background tasks and discard whatever is still queued.
    ///
    /// A batch already in progress finishes its current update first.
    /// Stopping a stopped engine is a no-op.
    pub async fn stop(&self) {
        let (shutdown, tasks) = {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.shared.running.swap(false, Ordering::AcqRel) {
                return;
            }
            (lifecycle.shutdown.take(), std::mem::take(&mut lifecycle.tasks))
        };

        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(true);
        }
        for mut task in tasks {
            match tokio::time::timeout(STOP_TIMEOUT, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.is_panic() => error!("AOI background task panicked"),
                Ok(Err(_)) => {}
                Err(_) => {
                    warn!(timeout = ?STOP_TIMEOUT, "AOI background task did not stop, aborting");
                    task.abort();
                }
            }
        }

        let discarded_updates = self.shared.updates.discard();
        let discarded_events = self.shared.events.discard();
        info!(discarded_updates, discarded_events, "AOI engine stopped");
    }

    pub fn register_entity(&self, entity: AoiEntity) -> Result<(), AoiError> {
        let mut record = entity.into_record(self.shared.config.default_view_range)?;
        let view = record.view;

        let _gate = self.shared.write_gate();
        if self.shared.entities.contains_key(&view.id) {
            return Err(AoiError::AlreadyRegistered(view.id));
        }
        record.generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        self.shared.watch.track(view.id);
        self.shared.grid.insert(view.id, view.position);
        self.shared.entities.insert(view.id, record);
        self.shared.stats.entities.increment();

        debug!(
            id = %view.id,
            kind = %view.kind,
            cell = %self.shared.grid.cell_of(view.position),
            view_range = view.view_range,
            "entity registered"
        );
        Ok(())
    }

    /// Remove an entity. Every former watcher receives a LEAVE event for it.
    ///
    /// Updates still queued for the entity are dropped when drained, even if
    /// the id has been registered again by then.
    pub fn unregister_entity(&self, id: EntityId) -> Result<(), AoiError> {
        let mut outbox = Vec::new();
        {
            let _gate = self.shared.write_gate();
            let Some((_, record)) = self.shared.entities.remove(&id) else {
                return Err(AoiError::NotRegistered(id));
            };
            self.shared.grid.remove(id);
            let severed = self.shared.watch.clear_entity(id);
            self.shared.stats.entities.decrement();

            let mut watchers: Vec<EntityId> = severed.watchers.into_iter().collect();
            watchers.sort();
            for &watcher in &watchers {
                let generation = self.shared.entities.get(&watcher).map(|r| r.generation);
                let Some(generation) = generation else { continue };
                let event = AoiEvent::new(AoiEventKind::Leave, watcher, id)
                    .with_payload(EventPayload::Removed);
                self.shared.emit(event, generation, &mut outbox);
            }

            debug!(
                %id,
                kind = %record.view.kind,
                generation = record.generation,
                watchers = watchers.len(),
                watching = severed.watching.len(),
                "entity unregistered"
            );
        }
        self.shared.flush_outbox(outbox);
        Ok(())
    }

    /// Registration generation of `id`, if updates are being accepted.
    fn check_accepting(&self, id: EntityId) -> Result<u64, AoiError> {
        if !self.shared.running() {
            self.shared.stats.updates_rejected.increment();
            return Err(AoiError::Stopped);
        }
        self.shared
            .entities
            .get(&id)
            .map(|record| record.generation)
            .ok_or(AoiError::NotRegistered(id))
    }

    /// Queue a position update without waiting.
    ///
    /// Fails with [`AoiError::Backpressure`] when the update queue is full,
    /// regardless of the configured backpressure policy.
    pub fn update_position(&self, id: EntityId, position: Vec3) -> Result<(), AoiError> {
        let generation = self.check_accepting(id)?;
        self.shared
            .updates
            .try_enqueue(UpdateTask::new(id, position).for_generation(generation))
            .inspect_err(|err| self.note_rejection(id, err))
    }

    /// Queue a position update, honoring the configured backpressure policy.
    pub async fn report_position(&self, id: EntityId, position: Vec3) -> Result<(), AoiError> {
        let generation = self.check_accepting(id)?;
        let task = UpdateTask::new(id, position).for_generation(generation);
        let result = match self.shared.config.backpressure {
            BackpressurePolicy::Reject => self.shared.updates.try_enqueue(task),
            BackpressurePolicy::Wait { timeout_ms } => {
                self.shared
                    .updates
                    .enqueue_within(task, Duration::from_millis(timeout_ms))
                    .await
            }
        };
        result.inspect_err(|err| self.note_rejection(id, err))
    }

    fn note_rejection(&self, id: EntityId, err: &AoiError) {
        self.shared.stats.updates_rejected.increment();
        warn!(%id, %err, "position update rejected");
    }

    /// Apply one batch of queued updates now. Returns how many were applied.
    ///
    /// Works whether or not the scheduler is running.
    pub fn flush_updates(&self) -> usize {
        self.shared.process_batch(false)
    }

    /// Recompute what `id` watches. Returns whether its watching set changed.
    pub fn recompute(&self, id: EntityId) -> Result<bool, AoiError> {
        let mut outbox = Vec::new();
        let changed = {
            let _gate = self.shared.write_gate();
            if !self.shared.entities.contains_key(&id) {
                return Err(AoiError::NotRegistered(id));
            }
            self.shared.recompute_locked(id, &mut outbox)
        };
        self.shared.flush_outbox(outbox);
        Ok(changed)
    }

    /// Recompute every active entity. Visibility is evaluated in parallel
    /// against one snapshot, then applied. Returns how many watching sets
    /// changed.
    pub fn recompute_all(&self) -> usize {
        let shared = &*self.shared;
        let mut outbox = Vec::new();
        let gate = shared.write_gate();
        let ids: Vec<EntityId> = shared
            .entities
            .iter()
            .filter(|record| record.view.active)
            .map(|record| *record.key())
            .collect();

        let diffs: Vec<(EntityId, ViewDiff)> = ids
            .par_iter()
            .filter_map(|&id| match catch_unwind(AssertUnwindSafe(|| shared.compute_view(id))) {
                Ok(diff) => diff.map(|diff| (id, diff)),
                Err(_) => {
                    error!(%id, "recomputation panicked, watching set left unchanged");
                    None
                }
            })
            .collect();

        let changed = diffs
            .into_iter()
            .filter(|(_, diff)| !diff.entering.is_empty() || !diff.leaving.is_empty())
            .map(|(id, diff)| shared.apply_diff(id, diff, &mut outbox))
            .filter(|&changed| changed)
            .count();
        drop(gate);
        shared.flush_outbox(outbox);
        debug!(entities = ids.len(), changed, "full recomputation");
        changed
    }

    fn modify(&self, id: EntityId, apply: impl FnOnce(&mut EntityRecord)) -> Result<(), AoiError> {
        let _gate = self.shared.write_gate();
        let mut record = self
            .shared
            .entities
            .get_mut(&id)
            .ok_or(AoiError::NotRegistered(id))?;
        apply(&mut record);
        Ok(())
    }

    /// Inactive entities keep their relations and stay visible to others,
    /// but are skipped when recomputing.
    pub fn set_active(&self, id: EntityId, active: bool) -> Result<(), AoiError> {
        self.modify(id, |record| record.view.active = active)
    }

    /// Hidden entities drop out of other viewers' sets on their next
    /// recomputation.
    pub fn set_visible(&self, id: EntityId, visible: bool) -> Result<(), AoiError> {
        self.modify(id, |record| record.view.visible = visible)
    }

    pub fn set_view_range(&self, id: EntityId, view_range: f32) -> Result<(), AoiError> {
        validate_view_range(view_range)?;
        self.modify(id, |record| record.view.view_range = view_range)
    }

    /// Visibility policy for every entity of `kind` without its own.
    pub fn set_kind_policy(&self, kind: EntityKind, policy: impl VisibilityPolicy + 'static) {
        self.shared.kind_policies.insert(kind, Arc::new(policy));
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.shared.entities.contains_key(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.shared.entities.len()
    }

    pub fn entity(&self, id: EntityId) -> Option<EntityView> {
        self.shared.view_of(id)
    }

    /// Evaluate `viewer`'s policy against `target` without touching relations.
    pub fn can_see(&self, viewer: EntityId, target: EntityId) -> Option<bool> {
        let (viewer_view, own) = {
            let record = self.shared.entities.get(&viewer)?;
            (record.view, record.policy.clone())
        };
        let target_view = self.shared.view_of(target)?;
        if viewer == target {
            return Some(false);
        }
        let policy = self.shared.policy_for(own, viewer_view.kind);
        Some(policy.can_see(&viewer_view, &target_view))
    }

    /// Entities currently watching `id`.
    pub fn watchers_of(&self, id: EntityId) -> HashSet<EntityId> {
        self.shared.watch.watchers_of(id)
    }

    /// Entities `id` currently watches.
    pub fn watching_of(&self, id: EntityId) -> HashSet<EntityId> {
        self.shared.watch.watching_of(id)
    }

    /// Registered entities within planar `radius` of `position`.
    pub fn entities_near(&self, position: Vec3, radius: f32) -> HashSet<EntityId> {
        self.shared.grid.entities_in_circle(position, radius)
    }

    /// Watchers of `id` accepted by `filter`, in id order.
    pub fn resolve_watchers(&self, id: EntityId, filter: impl Fn(&EntityView) -> bool) -> Vec<EntityId> {
        let mut recipients: Vec<EntityId> = self
            .shared
            .watch
            .watchers_of(id)
            .into_iter()
            .filter(|&watcher| {
                self.shared
                    .view_of(watcher)
                    .map(|view| filter(&view))
                    .unwrap_or(false)
            })
            .collect();
        recipients.sort();
        recipients
    }

    /// Send `message` to every watcher of `id` accepted by `filter`.
    /// Returns how many sends succeeded.
    pub fn broadcast_to_watchers<M, T>(
        &self,
        id: EntityId,
        message: &M,
        filter: impl Fn(&EntityView) -> bool,
        transport: &T,
    ) -> usize
    where
        M: ?Sized,
        T: WatcherTransport<M> + ?Sized,
    {
        let recipients = self.resolve_watchers(id, filter);
        let mut sent = 0;
        for recipient in &recipients {
            match transport.send_to(*recipient, message) {
                Ok(()) => sent += 1,
                Err(err) => debug!(source = %id, %recipient, %err, "broadcast send failed"),
            }
        }
        debug!(source = %id, recipients = recipients.len(), sent, "broadcast to watchers");
        sent
    }

    pub fn statistics(&self) -> StatisticsReport {
        let batch_time_range_ms = self
            .shared
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .batch_time_range_ms();
        StatisticsReport {
            running: self.is_running(),
            counters: self.shared.stats.snapshot(),
            grid: self.shared.grid.statistics(),
            relations: self.shared.watch.relation_count(),
            pending_updates: self.shared.updates.len(),
            pending_events: self.shared.events.pending(),
            batch_time_range_ms,
        }
    }

    /// Refresh derived statistics and compact empty cells now.
    pub fn refresh_statistics(&self) {
        self.shared.refresh_statistics();
    }

    /// Forget every entity and relation and drop queued work. No events
    /// are emitted.
    pub fn clear(&self) {
        let _gate = self.shared.write_gate();
        let entities = self.shared.entities.len();
        self.shared.entities.clear();
        self.shared.watch.clear();
        self.shared.grid.clear();
        let discarded_updates = self.shared.updates.discard();
        let discarded_events = self.shared.events.discard();
        self.shared.stats.entities.reset();
        info!(entities, discarded_updates, discarded_events, "AOI state cleared");
    }

    /// Registry, grid and watch table agree with each other.
    pub fn is_consistent(&self) -> bool {
        let _gate = self.shared.write_gate();
        let shared = &*self.shared;
        shared.grid.is_consistent()
            && shared.watch.is_consistent()
            && shared.grid.len() == shared.entities.len()
            && shared.watch.len() == shared.entities.len()
            && shared.entities.iter().all(|record| {
                shared.grid.position_of(*record.key()) == Some(record.view.position)
                    && shared.watch.is_tracked(*record.key())
            })
    }
}

impl Drop for AoiManager {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(shutdown) = lifecycle.shutdown.take() {
            let _ = shutdown.send(true);
        }
        for task in lifecycle.tasks.drain(..) {
            task.abort();
        }
        self.shared.running.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for AoiManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AoiManager")
            .field("running", &self.is_running())
            .field("entities", &self.shared.entities.len())
            .field("grid", &self.shared.grid)
            .field("watch", &self.shared.watch)
            .finish()
    }
}

/// Periodic batch drain and statistics refresh.
async fn run_scheduler(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let update_period = shared.config.update_interval();
    let stats_period = shared.config.stats_interval();
    let mut updates = interval_at(Instant::now() + update_period, update_period);
    updates.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stats = interval_at(Instant::now() + stats_period, stats_period);
    stats.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!("update scheduler started");
    loop {
        tokio::select! {
            _ = updates.tick() => {
                if !shared.running() {
                    break;
                }
                shared.process_batch(true);
            }
            _ = stats.tick() => shared.refresh_statistics(),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("update scheduler stopped");
}
