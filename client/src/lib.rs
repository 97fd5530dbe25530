//! Tiltball client runtime.
//!
//! Holds two full simulation engines per the write/read split:
//! the *reconciliation engine* is the source of truth for predicted state
//! (ticked locally, rolled back and replayed against server snapshots),
//! while the *render engine* only feeds presentation and is nudged toward
//! the reconciliation engine by exponential smoothing — it is never
//! hard-corrected, so authoritative corrections are absorbed over a few
//! frames instead of popping.

pub mod reconcile;
pub mod smoothing;

use std::collections::HashMap;

use thiserror::Error;
use tiltball_engine::map::MapError;
use tiltball_engine::snapshot::{Snapshot, SnapshotPinball};
use tiltball_engine::world::WorldError;
use tiltball_engine::{Engine, Vault, SNAPSHOTS_VAULT_SIZE, TICK_DELTA_MS};
use tiltball_shared::map::GameMapData;
use tiltball_shared::protocol::{
    GameEvent, GameEventData, Placement, PlayerProfile, RatingChange, RoomState,
};
use tiltball_shared::PlayerId;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Roster entry mirrored from room state for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientPlayer {
    pub id: PlayerId,
    pub rating: u32,
    pub score: u32,
    pub current_score: u32,
    pub high_score: u32,
}

/// Outbound notifications for the presentation layer, drained per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    RoomInit {
        players: Vec<PlayerProfile>,
    },
    PlayerJoined {
        player_id: PlayerId,
        rating: u32,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    PlayerStatsChanged {
        player_id: PlayerId,
    },
    GameStarted,
    GameEnded {
        placements: Vec<Placement>,
        rating_changes: HashMap<PlayerId, RatingChange>,
    },
    /// Non-physical visual flash of a bumper that was hit.
    BumperFlash {
        label: String,
    },
}

pub struct ClientEngine {
    /// Smoothed read model, drives presentation.
    pub render_engine: Engine,
    /// Write model: predicted state, rolled back and replayed.
    pub reconciliation_engine: Engine,
    /// Authoritative snapshots as they arrive.
    pub server_snapshots: Vault,
    pub player_id: PlayerId,
    pub players: HashMap<PlayerId, ClientPlayer>,
    outbound: Vec<ClientEvent>,
    accumulator: f64,
    /// Set once the engines have been seeded from a server snapshot.
    pub(crate) initialized: bool,
}

impl ClientEngine {
    pub fn new(player_id: PlayerId, map: GameMapData) -> Result<Self, ClientError> {
        let render_engine = build_engine(&player_id, map.clone())?;
        let reconciliation_engine = build_engine(&player_id, map)?;

        Ok(Self {
            render_engine,
            reconciliation_engine,
            server_snapshots: Vault::new(SNAPSHOTS_VAULT_SIZE),
            player_id,
            players: HashMap::new(),
            outbound: Vec::new(),
            accumulator: 0.0,
            initialized: false,
        })
    }

    /// Ingest one authoritative room-state document.
    pub fn handle_room_state(&mut self, state: &RoomState) {
        self.sync_roster(state);
        self.process_server_events(&state.events);

        let Some(snapshot) = self.snapshot_from_room_state(state) else {
            tracing::debug!("room state does not contain us yet");
            return;
        };

        let lag = (self.reconciliation_engine.timestamp - snapshot.timestamp).max(0.0);
        if let Some(me) = self
            .reconciliation_engine
            .game
            .world
            .players
            .get_mut(&self.player_id)
        {
            me.set_latency(lag);
        }

        self.reconcile(snapshot);
    }

    /// Advance the local simulation by one presentation frame.
    ///
    /// Fixed-cadence ticking happens through an accumulator; inputs were
    /// already buffered into the engines, so they take effect at tick
    /// boundaries only. The render engine is then smoothed.
    pub fn update(&mut self, frame_dt_ms: f64) {
        self.accumulator += frame_dt_ms;
        while self.accumulator >= TICK_DELTA_MS {
            if let Err(error) = self.reconciliation_engine.update(TICK_DELTA_MS) {
                tracing::warn!(%error, "prediction tick failed");
            }
            if let Err(error) = self.render_engine.update(TICK_DELTA_MS) {
                tracing::warn!(%error, "render tick failed");
            }
            self.accumulator -= TICK_DELTA_MS;
        }
        self.sync_render(frame_dt_ms);
    }

    /// Press paddles: applied to the local simulation immediately for
    /// zero-latency response, and recorded for replay.
    pub fn handle_activate_objects(&mut self, labels: Vec<String>) {
        let stamp = self.reconciliation_engine.stamp();
        self.reconciliation_engine
            .game
            .handle_activate_objects(stamp, labels.clone());
        let stamp = self.render_engine.stamp();
        self.render_engine.game.handle_activate_objects(stamp, labels);
    }

    pub fn handle_deactivate_objects(&mut self, labels: Vec<String>) {
        let stamp = self.reconciliation_engine.stamp();
        self.reconciliation_engine
            .game
            .handle_deactivate_objects(stamp, labels.clone());
        let stamp = self.render_engine.stamp();
        self.render_engine
            .game
            .handle_deactivate_objects(stamp, labels);
    }

    /// Drain notifications for the presentation layer.
    pub fn take_events(&mut self) -> Vec<ClientEvent> {
        std::mem::take(&mut self.outbound)
    }

    /// Build the engine-side snapshot view of our subtree of the document.
    fn snapshot_from_room_state(&self, state: &RoomState) -> Option<Snapshot> {
        let room_player = state.players.get(&self.player_id)?;

        let mut pinballs: Vec<SnapshotPinball> = room_player
            .pinballs
            .values()
            .map(|p| SnapshotPinball {
                id: p.id.clone(),
                player_id: p.player_id.clone(),
                position: p.position,
                velocity: p.velocity,
            })
            .collect();
        pinballs.sort_by(|a, b| a.id.cmp(&b.id));

        let mut map_active_objects = room_player.active_objects.clone();
        map_active_objects.sort();

        Some(Snapshot {
            frame: state.frame,
            timestamp: state.timestamp,
            last_delta: TICK_DELTA_MS,
            map_name: state.map_name,
            player_id: room_player.id.clone(),
            player_score: room_player.score,
            player_current_score: room_player.current_score,
            player_high_score: room_player.high_score,
            map_active_objects,
            events: state.events.clone(),
            pinballs,
        })
    }

    /// Mirror roster statistics for presentation, reporting changes.
    fn sync_roster(&mut self, state: &RoomState) {
        for (id, room_player) in &state.players {
            let entry = self.players.entry(id.clone()).or_insert_with(|| ClientPlayer {
                id: id.clone(),
                rating: 0,
                score: 0,
                current_score: 0,
                high_score: 0,
            });
            let changed = entry.score != room_player.score
                || entry.current_score != room_player.current_score
                || entry.high_score != room_player.high_score;
            entry.score = room_player.score;
            entry.current_score = room_player.current_score;
            entry.high_score = room_player.high_score;
            if changed {
                self.outbound
                    .push(ClientEvent::PlayerStatsChanged { player_id: id.clone() });
            }
        }
    }

    fn process_server_events(&mut self, events: &[GameEvent]) {
        for event in events {
            match &event.data {
                GameEventData::Init { players } => {
                    for profile in players {
                        self.players
                            .entry(profile.id.clone())
                            .or_insert_with(|| ClientPlayer {
                                id: profile.id.clone(),
                                rating: profile.rating,
                                score: 0,
                                current_score: 0,
                                high_score: 0,
                            })
                            .rating = profile.rating;
                    }
                    self.outbound.push(ClientEvent::RoomInit {
                        players: players.clone(),
                    });
                }
                GameEventData::PlayerJoin { player_id, rating } => {
                    self.players
                        .entry(player_id.clone())
                        .or_insert_with(|| ClientPlayer {
                            id: player_id.clone(),
                            rating: *rating,
                            score: 0,
                            current_score: 0,
                            high_score: 0,
                        });
                    self.outbound.push(ClientEvent::PlayerJoined {
                        player_id: player_id.clone(),
                        rating: *rating,
                    });
                }
                GameEventData::PlayerLeft { player_id } => {
                    if self.players.remove(player_id).is_none() {
                        tracing::warn!(player = %player_id, "leave for unknown player dropped");
                        continue;
                    }
                    self.outbound.push(ClientEvent::PlayerLeft {
                        player_id: player_id.clone(),
                    });
                }
                GameEventData::GameStarted => {
                    self.reconciliation_engine.start_game();
                    self.render_engine.start_game();
                    self.outbound.push(ClientEvent::GameStarted);
                }
                GameEventData::GameEnded {
                    placements,
                    rating_changes,
                } => {
                    self.reconciliation_engine.game.end();
                    self.render_engine.game.end();
                    self.outbound.push(ClientEvent::GameEnded {
                        placements: placements.clone(),
                        rating_changes: rating_changes.clone(),
                    });
                }
                GameEventData::PingObject { player_id, label } => {
                    if *player_id == self.player_id {
                        self.outbound.push(ClientEvent::BumperFlash {
                            label: label.clone(),
                        });
                    }
                }
                // Input and round events for our own board are covered by
                // local prediction and replay, not applied out of band.
                GameEventData::ActivateObjects { .. }
                | GameEventData::DeactivateObjects { .. }
                | GameEventData::PlayerLostRound { .. }
                | GameEventData::PlayerPinballRedeploy { .. } => {}
            }
        }
    }

    /// Nudge the render engine toward the reconciliation engine.
    /// Only smoothing ever writes render pinball kinematics from here;
    /// scores and active labels mirror directly since they are not
    /// physical.
    fn sync_render(&mut self, frame_dt_ms: f64) {
        let recon = &self.reconciliation_engine.game.world;
        let render = &mut self.render_engine.game.world;

        for (player_id, recon_pinball) in &recon.pinballs {
            let target_position = recon_pinball.position(&recon.physics);
            let target_velocity = recon_pinball.velocity(&recon.physics);
            if let Some(render_pinball) = render.pinballs.get(player_id) {
                let current = render_pinball.position(&render.physics);
                let smoothed = smoothing::smooth_position(current, target_position, frame_dt_ms);
                render_pinball.set_kinematics(&mut render.physics, smoothed, target_velocity);
            }
        }

        if let Some(recon_me) = recon.players.get(&self.player_id) {
            let scores = (recon_me.score, recon_me.current_score, recon_me.high_score);
            if let Some(render_me) = render.players.get_mut(&self.player_id) {
                render_me.score = scores.0;
                render_me.current_score = scores.1;
                render_me.high_score = scores.2;
            }
        }

        if let (Some(recon_map), Some(render_map)) = (recon.map.as_ref(), render.map.as_mut()) {
            render_map.active_paddles = recon_map.active_paddles.clone();
        }
    }
}

fn build_engine(player_id: &PlayerId, map: GameMapData) -> Result<Engine, ClientError> {
    let mut engine = Engine::new();
    engine.game.load_map(map)?;
    engine.game.world.add_player(player_id.clone())?;
    engine
        .game
        .world
        .add_pinball_for_player(player_id.clone(), player_id.clone())?;
    engine.game.set_me(player_id.clone())?;
    Ok(engine)
}
