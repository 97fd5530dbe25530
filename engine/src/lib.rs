//! Tiltball simulation engine.
//!
//! A deterministic fixed-tick pinball simulation: a rapier2d physics world,
//! a board loaded from static map data, per-tick snapshots and a bounded
//! snapshot vault. One [`Engine`] simulates exactly one player's board;
//! multiplayer is N independent engines compared by score.

pub mod engine;
pub mod game;
pub mod map;
pub mod paddle;
pub mod physics;
pub mod pinball;
pub mod player;
pub mod snapshot;
pub mod vault;
pub mod world;

#[cfg(test)]
pub(crate) mod test_util;

pub use engine::{Engine, TickStamp, MIN_FPS, SNAPSHOTS_VAULT_SIZE, TICK_DELTA_MS};
pub use game::{Game, GAME_DURATION_MS};
pub use map::{GameMap, MapError};
pub use snapshot::{
    are_snapshots_close, generate_snapshot, restore_engine_from_snapshot, RestoreOptions, Snapshot,
    SnapshotError, SnapshotPinball,
};
pub use vault::Vault;
pub use world::{World, WorldError, WorldEvent};
