//! The fixed-tick simulation driver.

use crate::game::Game;
use crate::snapshot::{self, Snapshot, SnapshotError};
use crate::vault::Vault;

/// Simulation tick rate.
pub const MIN_FPS: u32 = 60;
/// Fixed tick delta, ms.
pub const TICK_DELTA_MS: f64 = 1000.0 / MIN_FPS as f64;
/// Bound on the per-engine snapshot history.
pub const SNAPSHOTS_VAULT_SIZE: usize = 200;

/// Frame/time pair identifying one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickStamp {
    pub frame: u64,
    pub timestamp: f64,
}

/// One complete simulation instance: a game (with its world and physics),
/// a monotonic frame counter, a simulated clock and a snapshot vault.
///
/// The clock is simulated time advanced by tick deltas, not wall time, so
/// two engines fed the same inputs stay comparable tick for tick.
pub struct Engine {
    pub game: Game,
    pub frame: u64,
    pub timestamp: f64,
    pub last_delta: f64,
    pub snapshots: Vault,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            game: Game::new(),
            frame: 0,
            timestamp: 0.0,
            last_delta: 0.0,
            snapshots: Vault::new(SNAPSHOTS_VAULT_SIZE),
        }
    }

    pub fn stamp(&self) -> TickStamp {
        TickStamp {
            frame: self.frame,
            timestamp: self.timestamp,
        }
    }

    pub fn start_game(&mut self) {
        let stamp = self.stamp();
        self.game.start(stamp);
    }

    /// Advance one tick of `delta_ms` simulated milliseconds.
    ///
    /// A stopped or ended engine's tick is a no-op returning `Ok(None)`.
    /// Otherwise the tick's snapshot is captured, vaulted and returned.
    pub fn update(&mut self, delta_ms: f64) -> Result<Option<Snapshot>, SnapshotError> {
        if !self.game.has_started || self.game.has_ended {
            return Ok(None);
        }

        self.frame += 1;
        self.timestamp += delta_ms;
        self.last_delta = delta_ms;

        let stamp = self.stamp();
        self.game.update(stamp, delta_ms);

        let snapshot = snapshot::generate_snapshot(self)?;
        self.snapshots.add(snapshot.clone());
        Ok(Some(snapshot))
    }

    /// Move the frame counter and clock, used by snapshot restoration.
    pub fn set_clock(&mut self, frame: u64, timestamp: f64) {
        self.frame = frame;
        self.timestamp = timestamp;
    }

    /// Tear the engine down to a blank, stopped state.
    pub fn reset(&mut self) {
        self.frame = 0;
        self.timestamp = 0.0;
        self.last_delta = 0.0;
        self.snapshots.clear();
        self.game.clear();
    }
}
