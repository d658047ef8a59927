//! Deterministic crowd simulation used by the binary.

use anyhow::Result;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use vigil_aoi::{
    AoiConfig, AoiEntity, AoiError, AoiEvent, AoiEventKind, AoiManager, BlindPolicy, EventSink,
};
use vigil_core::glam::Vec3;
use vigil_core::math::DeterministicRng;
use vigil_core::{EntityId, EntityKind};

pub const DEFAULT_TICKS: u32 = 20;

const PLAYERS: u64 = 200;
const NPCS: u64 = 40;
const WORLD_EXTENT: f32 = 1_000.0;
const MAX_STEP: f32 = 25.0;
const SEED: u64 = 0x5EED;

/// Run the crowd for `ticks` update intervals and summarize what happened.
pub async fn run(config: AoiConfig, ticks: u32) -> Result<serde_json::Value> {
    let interval = config.update_interval();
    let manager = AoiManager::new(config)?;
    manager.set_kind_policy(EntityKind::Npc, BlindPolicy);

    let mut rng = DeterministicRng::new(SEED);
    let (tx, rx) = mpsc::channel::<AoiEvent>(16_384);
    let sink: Arc<dyn EventSink> = Arc::new(tx);
    let mut positions = HashMap::new();

    for raw in 1..=PLAYERS + NPCS {
        let id = EntityId::new(raw);
        let kind = if raw <= PLAYERS { EntityKind::Player } else { EntityKind::Npc };
        let position = Vec3::new(
            rng.range_f32(0.0, WORLD_EXTENT),
            0.0,
            rng.range_f32(0.0, WORLD_EXTENT),
        );
        let entity = AoiEntity::new(id, kind, position).with_shared_sink(Arc::clone(&sink));
        manager.register_entity(entity)?;
        positions.insert(id, position);
    }
    drop(sink);
    let consumer = tokio::spawn(count_events(rx));

    manager.start()?;
    let changed = manager.recompute_all();
    info!(entities = manager.entity_count(), changed, "crowd spawned");

    let mut rejected = 0u64;
    for tick in 0..ticks {
        for raw in 1..=PLAYERS {
            let id = EntityId::new(raw);
            let Some(position) = positions.get_mut(&id) else { continue };
            let step = Vec3::new(
                rng.range_f32(-MAX_STEP, MAX_STEP),
                0.0,
                rng.range_f32(-MAX_STEP, MAX_STEP),
            );
            *position = (*position + step).clamp(Vec3::ZERO, Vec3::splat(WORLD_EXTENT));
            match manager.report_position(id, *position).await {
                Ok(()) => {}
                Err(err @ (AoiError::Backpressure { .. } | AoiError::EnqueueTimeout(_))) => {
                    rejected += 1;
                    warn!(%id, tick, %err, "position dropped");
                }
                Err(err) => return Err(err.into()),
            }
        }
        tokio::time::sleep(interval).await;
    }

    while manager.flush_updates() > 0 {}
    manager.stop().await;
    manager.refresh_statistics();
    let report = manager.statistics();
    drop(manager);

    let (enters, leaves) = consumer.await?;
    info!(enters, leaves, rejected, "crowd finished");
    Ok(json!({
        "ticks": ticks,
        "players": PLAYERS,
        "npcs": NPCS,
        "received": { "enter": enters, "leave": leaves },
        "statistics": report,
    }))
}

async fn count_events(mut rx: mpsc::Receiver<AoiEvent>) -> (u64, u64) {
    let (mut enters, mut leaves) = (0, 0);
    while let Some(event) = rx.recv().await {
        match event.kind {
            AoiEventKind::Enter => enters += 1,
            AoiEventKind::Leave => leaves += 1,
        }
    }
    (enters, leaves)
}
