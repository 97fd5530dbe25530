//! Authoritative game controller.
//!
//! Each connected player owns a fully independent engine (physics world,
//! map copy, pinball); boards never interact physically. Multiplayer is
//! score comparison over the shared clock, synchronized through the
//! room-state document the per-player snapshots are merged into.

use std::collections::HashMap;

use thiserror::Error;
use tiltball_engine::map::MapError;
use tiltball_engine::snapshot::{generate_snapshot, Snapshot, SnapshotError};
use tiltball_engine::world::WorldError;
use tiltball_engine::Engine;
use tiltball_shared::map::GameMapData;
use tiltball_shared::maps::game_map;
use tiltball_shared::protocol::{
    GameResult, Placement, RatingChange, RoomPinball, RoomPlayer, RoomState,
};
use tiltball_shared::PlayerId;

use crate::config::{ServerConfig, TieBreakRule};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

pub struct GamePlayer {
    pub id: PlayerId,
    /// Rating at join time, used for the end-of-game delta.
    pub rating: u32,
    /// Join order, the final tie-break.
    pub joined_at: u64,
    pub engine: Engine,
}

pub struct GameController {
    pub players: HashMap<PlayerId, GamePlayer>,
    config: ServerConfig,
    map: GameMapData,
    join_counter: u64,
}

impl GameController {
    pub fn new(config: ServerConfig) -> Self {
        let map = game_map(config.map_name);
        Self {
            players: HashMap::new(),
            config,
            map,
            join_counter: 0,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Create the player's private engine and return its initial snapshot
    /// for merging into the room state.
    pub fn handle_player_join(
        &mut self,
        player_id: PlayerId,
        rating: u32,
    ) -> Result<Snapshot, ControllerError> {
        if self.players.remove(&player_id).is_some() {
            tracing::info!(player = %player_id, "previous session replaced on rejoin");
        }

        let mut engine = Engine::new();
        engine.game.set_authoritative(true);
        engine.game.duration_ms = self.config.game_duration_ms;
        engine.game.load_map(self.map.clone())?;
        engine.game.world.add_player(player_id.clone())?;
        engine
            .game
            .world
            .add_pinball_for_player(player_id.clone(), player_id.clone())?;
        engine.game.set_me(player_id.clone())?;

        let snapshot = generate_snapshot(&mut engine)?;

        self.players.insert(
            player_id.clone(),
            GamePlayer {
                id: player_id.clone(),
                rating,
                joined_at: self.join_counter,
                engine,
            },
        );
        self.join_counter += 1;

        tracing::info!(player = %player_id, rating, "player joined");
        Ok(snapshot)
    }

    pub fn handle_player_leave(&mut self, player_id: &PlayerId) -> bool {
        match self.players.remove(player_id) {
            Some(mut player) => {
                player.engine.reset();
                tracing::info!(player = %player_id, "player left");
                true
            }
            None => false,
        }
    }

    pub fn start_game(&mut self) {
        for player in self.players.values_mut() {
            player.engine.start_game();
        }
    }

    pub fn all_ended(&self) -> bool {
        !self.players.is_empty()
            && self
                .players
                .values()
                .all(|player| player.engine.game.has_ended)
    }

    /// Advance every player engine by one fixed tick.
    ///
    /// Engines are stepped sequentially in stable player order; they share
    /// no state, so the order only matters for reproducibility.
    pub fn update(&mut self, delta_ms: f64) -> Vec<Snapshot> {
        let mut ids: Vec<PlayerId> = self.players.keys().cloned().collect();
        ids.sort();

        let mut snapshots = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(player) = self.players.get_mut(&id) else {
                continue;
            };
            match player.engine.update(delta_ms) {
                Ok(Some(snapshot)) => snapshots.push(snapshot),
                Ok(None) => {}
                Err(error) => {
                    tracing::error!(player = %id, %error, "engine tick failed");
                }
            }
        }
        snapshots
    }

    /// Merge one player snapshot into the shared room-state document.
    /// Events are not merged here; the room flushes them one-shot itself.
    pub fn sync_room_state(&self, state: &mut RoomState, snapshot: &Snapshot) {
        state.frame = snapshot.frame;
        state.timestamp = snapshot.timestamp;

        let player = state
            .players
            .entry(snapshot.player_id.clone())
            .or_insert_with(|| RoomPlayer::new(snapshot.player_id.clone()));

        player.score = snapshot.player_score;
        player.current_score = snapshot.player_current_score;
        player.high_score = snapshot.player_high_score;
        player.active_objects = snapshot.map_active_objects.clone();

        for snapshot_pinball in &snapshot.pinballs {
            let pinball = player
                .pinballs
                .entry(snapshot_pinball.id.clone())
                .or_insert_with(|| RoomPinball {
                    id: snapshot_pinball.id.clone(),
                    player_id: snapshot_pinball.player_id.clone(),
                    position: snapshot_pinball.position,
                    velocity: snapshot_pinball.velocity,
                });
            pinball.position = snapshot_pinball.position;
            pinball.velocity = snapshot_pinball.velocity;
        }
    }

    /// Buffer a paddle press into the player's engine; it takes effect at
    /// that engine's next tick.
    pub fn handle_activate_objects(&mut self, player_id: &PlayerId, labels: Vec<String>) -> bool {
        match self.players.get_mut(player_id) {
            Some(player) => {
                let stamp = player.engine.stamp();
                player.engine.game.handle_activate_objects(stamp, labels);
                true
            }
            None => {
                tracing::warn!(player = %player_id, "activate for unknown player dropped");
                false
            }
        }
    }

    pub fn handle_deactivate_objects(&mut self, player_id: &PlayerId, labels: Vec<String>) -> bool {
        match self.players.get_mut(player_id) {
            Some(player) => {
                let stamp = player.engine.stamp();
                player.engine.game.handle_deactivate_objects(stamp, labels);
                true
            }
            None => {
                tracing::warn!(player = %player_id, "deactivate for unknown player dropped");
                false
            }
        }
    }

    /// Final standings and rating deltas: descending score, configured
    /// tie-break, fixed-magnitude delta with a floor at zero.
    pub fn compute_results(&self) -> (Vec<Placement>, HashMap<PlayerId, RatingChange>) {
        let mut rows: Vec<(&GamePlayer, u32, u32)> = self
            .players
            .values()
            .filter_map(|player| {
                player
                    .engine
                    .game
                    .me_player()
                    .map(|me| (player, me.score, me.high_score))
            })
            .collect();

        rows.sort_by(|a, b| {
            b.1.cmp(&a.1).then_with(|| match self.config.tie_break {
                TieBreakRule::HighScore => b.2.cmp(&a.2).then(a.0.joined_at.cmp(&b.0.joined_at)),
                TieBreakRule::JoinOrder => a.0.joined_at.cmp(&b.0.joined_at),
            })
        });

        let mut placements = Vec::with_capacity(rows.len());
        let mut changes = HashMap::new();

        for (index, (player, score, high_score)) in rows.iter().enumerate() {
            let won = index == 0;
            placements.push(Placement {
                player_id: player.id.clone(),
                score: *score,
                high_score: *high_score,
                result: if won { GameResult::Won } else { GameResult::Lost },
            });

            let delta = self.config.rating_change;
            let (change, rating) = if won {
                (delta as i32, player.rating + delta)
            } else {
                // A rating never goes below zero.
                let applied = player.rating.min(delta);
                (-(applied as i32), player.rating - applied)
            };
            changes.insert(player.id.clone(), RatingChange { change, rating });
        }

        (placements, changes)
    }

    pub fn end_game(&mut self) {
        for player in self.players.values_mut() {
            player.engine.game.end();
        }
    }

    pub fn dispose(&mut self) {
        for player in self.players.values_mut() {
            player.engine.reset();
        }
        self.players.clear();
        tracing::info!("controller disposed");
    }
}
