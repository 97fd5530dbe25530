//! Helpers shared by the module test suites.

use tiltball_shared::map::GameMapName;
use tiltball_shared::maps::game_map;
use tiltball_shared::vec2::Vec2;

use crate::engine::{Engine, TickStamp};
use crate::snapshot::{Snapshot, SnapshotPinball};

pub(crate) fn stamp(frame: u64, timestamp: f64) -> TickStamp {
    TickStamp { frame, timestamp }
}

/// A ready-to-start engine: multiplayer board, player "1" with a pinball,
/// tracked as the local player.
pub(crate) fn test_engine() -> Engine {
    let mut engine = Engine::new();
    engine
        .game
        .load_map(game_map(GameMapName::Multiplayer))
        .unwrap();
    engine.game.world.add_player("1".to_string()).unwrap();
    engine
        .game
        .world
        .add_pinball_for_player("1".to_string(), "1".to_string())
        .unwrap();
    engine.game.set_me("1".to_string()).unwrap();
    engine
}

pub(crate) fn bare_snapshot(frame: u64, timestamp: f64) -> Snapshot {
    Snapshot {
        frame,
        timestamp,
        last_delta: 1000.0 / 60.0,
        map_name: GameMapName::Multiplayer,
        player_id: "1".to_string(),
        player_score: 0,
        player_current_score: 0,
        player_high_score: 0,
        map_active_objects: Vec::new(),
        events: Vec::new(),
        pinballs: Vec::new(),
    }
}

pub(crate) fn snapshot_with_ball(frame: u64, timestamp: f64, position: Vec2) -> Snapshot {
    let mut snapshot = bare_snapshot(frame, timestamp);
    snapshot.pinballs.push(SnapshotPinball {
        id: "1".to_string(),
        player_id: "1".to_string(),
        position,
        velocity: Vec2::ZERO,
    });
    snapshot
}
