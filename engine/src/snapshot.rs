//! Per-tick snapshot capture and restore.
//!
//! A snapshot is the serializable state of one engine at one tick plus the
//! events of that tick. Capture drains the engine's event buffer (it is
//! the buffer's single consumer). Restore is asymmetric on purpose: a
//! pinball's kinematics are only written back if its owner is
//! server-controlled, unless the caller explicitly opts in — the rollback
//! replay is the one legitimate case where authoritative state overwrites
//! local prediction.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiltball_shared::map::GameMapName;
use tiltball_shared::protocol::GameEvent;
use tiltball_shared::vec2::{distance, Vec2};
use tiltball_shared::PlayerId;

use crate::engine::Engine;

/// Positional tolerance (px) under which two snapshots are considered in
/// agreement and reconciliation is skipped.
pub const MAX_SNAPSHOT_DISTANCE: f32 = 4.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("cannot capture snapshot: no map is loaded")]
    NoMapLoaded,
    #[error("cannot capture snapshot: no tracked local player is set")]
    NoTrackedPlayer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPinball {
    pub id: String,
    pub player_id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub frame: u64,
    pub timestamp: f64,
    pub last_delta: f64,
    pub map_name: GameMapName,
    pub player_id: PlayerId,
    pub player_score: u32,
    pub player_current_score: u32,
    pub player_high_score: u32,
    pub map_active_objects: Vec<String>,
    pub events: Vec<GameEvent>,
    pub pinballs: Vec<SnapshotPinball>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Also restore pinballs whose owner is not server-controlled.
    /// Only the rollback replay sets this.
    pub restore_non_server_controlled: bool,
}

/// Capture the engine's state at the current tick.
///
/// Calling this without a loaded map or a designated tracked player is a
/// caller-ordering bug and fails hard.
pub fn generate_snapshot(engine: &mut Engine) -> Result<Snapshot, SnapshotError> {
    let world = &engine.game.world;
    let map = world.map.as_ref().ok_or(SnapshotError::NoMapLoaded)?;
    let player_id = engine
        .game
        .me
        .clone()
        .ok_or(SnapshotError::NoTrackedPlayer)?;
    let player = world
        .players
        .get(&player_id)
        .ok_or(SnapshotError::NoTrackedPlayer)?;

    let mut pinballs: Vec<SnapshotPinball> = world
        .pinballs
        .values()
        .map(|pinball| SnapshotPinball {
            id: pinball.id.clone(),
            player_id: pinball.player_id.clone(),
            position: pinball.position(&world.physics),
            velocity: pinball.velocity(&world.physics),
        })
        .collect();
    pinballs.sort_by(|a, b| a.id.cmp(&b.id));

    let mut map_active_objects: Vec<String> = map.active_paddles.iter().cloned().collect();
    map_active_objects.sort();

    let map_name = map.name;
    let player_score = player.score;
    let player_current_score = player.current_score;
    let player_high_score = player.high_score;

    let events = engine.game.take_events();

    Ok(Snapshot {
        frame: engine.frame,
        timestamp: engine.timestamp,
        last_delta: engine.last_delta,
        map_name,
        player_id,
        player_score,
        player_current_score,
        player_high_score,
        map_active_objects,
        events,
        pinballs,
    })
}

/// Restore an engine to a snapshot's state.
///
/// Sets the frame/clock, replays the snapshot's events into the pending
/// event queue, restores the tracked player's score fields, pinball
/// kinematics (subject to the server-controlled asymmetry) and the active
/// object set.
pub fn restore_engine_from_snapshot(
    engine: &mut Engine,
    snapshot: &Snapshot,
    options: RestoreOptions,
) {
    engine.set_clock(snapshot.frame, snapshot.timestamp);
    engine.last_delta = snapshot.last_delta;
    engine.game.events = snapshot.events.clone();

    restore_player_from_snapshot(engine, snapshot);
    restore_pinballs_from_snapshot(engine, &snapshot.pinballs, options);
    restore_map_active_objects_from_snapshot(engine, snapshot);
}

/// Unconditionally restore the tracked player's score fields.
pub fn restore_player_from_snapshot(engine: &mut Engine, snapshot: &Snapshot) {
    let Some(player) = engine.game.world.players.get_mut(&snapshot.player_id) else {
        tracing::debug!(player = %snapshot.player_id, "score restore skipped: player not in world");
        return;
    };
    player.score = snapshot.player_score;
    player.current_score = snapshot.player_current_score;
    player.high_score = snapshot.player_high_score;
}

/// Restore pinball kinematics for server-controlled owners, or for all
/// owners when `restore_non_server_controlled` is set.
pub fn restore_pinballs_from_snapshot(
    engine: &mut Engine,
    pinballs: &[SnapshotPinball],
    options: RestoreOptions,
) {
    let world = &mut engine.game.world;
    for snapshot_pinball in pinballs {
        let Some(player) = world.players.get(&snapshot_pinball.player_id) else {
            continue;
        };
        if !player.is_server_controlled && !options.restore_non_server_controlled {
            continue;
        }
        let Some(pinball) = world.pinballs.get(&snapshot_pinball.player_id) else {
            continue;
        };
        pinball.set_kinematics(
            &mut world.physics,
            snapshot_pinball.position,
            snapshot_pinball.velocity,
        );
    }
}

/// Restore the active-object set, but only for a server-controlled tracked
/// player; a predicting client owns its own input set.
pub fn restore_map_active_objects_from_snapshot(engine: &mut Engine, snapshot: &Snapshot) {
    let world = &mut engine.game.world;
    let Some(player) = world.players.get(&snapshot.player_id) else {
        return;
    };
    if !player.is_server_controlled {
        return;
    }
    if let Some(map) = world.map.as_mut() {
        map.active_paddles = snapshot.map_active_objects.iter().cloned().collect();
    }
}

/// True iff every pinball present in both snapshots sits within
/// [`MAX_SNAPSHOT_DISTANCE`] of its counterpart. A pinball missing from
/// either side counts as divergence.
pub fn are_snapshots_close(a: &Snapshot, b: &Snapshot) -> bool {
    for pinball_a in &a.pinballs {
        let Some(pinball_b) = b.pinballs.iter().find(|p| p.id == pinball_a.id) else {
            return false;
        };
        if distance(pinball_a.position, pinball_b.position) > MAX_SNAPSHOT_DISTANCE {
            return false;
        }
    }
    true
}
