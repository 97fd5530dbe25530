//! The game room loop: the fixed-tick scheduler driving all player
//! engines, the sole owner of room state.
//!
//! Commands from connections arrive over an mpsc channel and are buffered
//! into engines; physics only ever advances on the interval tick. The
//! room-state document (with that tick's one-shot event list) is broadcast
//! every tick.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use tiltball_shared::protocol::{
    GameEvent, GameEventData, Placement, PlayerProfile, RatingChange, RoomState,
};
use tiltball_shared::PlayerId;

use crate::config::ServerConfig;
use crate::controller::GameController;
use crate::ratings::RatingStore;

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("room is full")]
    RoomFull,
    #[error("game already in progress")]
    GameInProgress,
    #[error("join failed: {0}")]
    Internal(String),
}

/// Commands from client connections to the room loop.
pub enum RoomCommand {
    Join {
        player_id: PlayerId,
        response: oneshot::Sender<Result<RoomState, JoinError>>,
    },
    Leave {
        player_id: PlayerId,
    },
    ActivateObjects {
        player_id: PlayerId,
        labels: Vec<String>,
    },
    DeactivateObjects {
        player_id: PlayerId,
        labels: Vec<String>,
    },
}

fn room_event(state: &RoomState, data: GameEventData) -> GameEvent {
    GameEvent {
        frame: state.frame,
        timestamp: state.timestamp,
        data,
    }
}

/// Run one game room to completion. Owns all game state.
pub async fn run_game_room(
    config: ServerConfig,
    mut store: Box<dyn RatingStore>,
    mut cmd_rx: mpsc::Receiver<RoomCommand>,
    state_tx: broadcast::Sender<RoomState>,
) {
    let mut controller = GameController::new(config.clone());
    let mut state = RoomState::new(config.map_name);
    let delta_ms = config.tick_delta_ms();

    let mut started = false;
    // Lifecycle events raised between ticks, flushed with the next tick.
    let mut pending_events: Vec<GameEvent> = Vec::new();
    // Results whose persistence failed; retried until they stick.
    let mut pending_results: Option<(Vec<Placement>, HashMap<PlayerId, RatingChange>)> = None;

    let mut interval = tokio::time::interval(Duration::from_secs_f64(delta_ms / 1000.0));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // One-shot semantics: last tick's events must not reappear.
                state.events.clear();
                state.events.append(&mut pending_events);

                if !started {
                    if controller.player_count() >= config.max_players_per_room {
                        controller.start_game();
                        started = true;
                        state.events.push(room_event(&state, GameEventData::GameStarted));
                        tracing::info!(players = controller.player_count(), "room full, game starting");
                    } else {
                        if !state.events.is_empty() {
                            let _ = state_tx.send(state.clone());
                        }
                        continue;
                    }
                }

                // A failed rating transaction blocks the terminal event.
                if let Some((placements, changes)) = pending_results.clone() {
                    match store.apply(&changes) {
                        Ok(()) => {
                            state.events.push(room_event(&state, GameEventData::GameEnded {
                                placements,
                                rating_changes: changes,
                            }));
                            let _ = state_tx.send(state.clone());
                            break;
                        }
                        Err(error) => {
                            tracing::error!(%error, "rating persistence retry failed");
                            let _ = state_tx.send(state.clone());
                            continue;
                        }
                    }
                }

                let snapshots = controller.update(delta_ms);
                for snapshot in &snapshots {
                    controller.sync_room_state(&mut state, snapshot);
                    state.events.extend(snapshot.events.iter().cloned());
                }

                if controller.all_ended() {
                    let (placements, changes) = controller.compute_results();
                    match store.apply(&changes) {
                        Ok(()) => {
                            state.events.push(room_event(&state, GameEventData::GameEnded {
                                placements,
                                rating_changes: changes,
                            }));
                            let _ = state_tx.send(state.clone());
                            tracing::info!("game over, results persisted");
                            break;
                        }
                        Err(error) => {
                            tracing::error!(%error, "rating persistence failed; game end blocked");
                            pending_results = Some((placements, changes));
                        }
                    }
                }

                let _ = state_tx.send(state.clone());
            }

            command = cmd_rx.recv() => {
                let Some(command) = command else { break };
                match command {
                    RoomCommand::Join { player_id, response } => {
                        let result = handle_join(
                            &config,
                            &mut controller,
                            &mut state,
                            &mut pending_events,
                            store.as_mut(),
                            started,
                            player_id,
                        );
                        let _ = response.send(result);
                    }
                    RoomCommand::Leave { player_id } => {
                        if controller.handle_player_leave(&player_id) {
                            state.players.remove(&player_id);
                            pending_events.push(room_event(&state, GameEventData::PlayerLeft {
                                player_id,
                            }));
                        }
                    }
                    RoomCommand::ActivateObjects { player_id, labels } => {
                        controller.handle_activate_objects(&player_id, labels);
                    }
                    RoomCommand::DeactivateObjects { player_id, labels } => {
                        controller.handle_deactivate_objects(&player_id, labels);
                    }
                }
            }
        }
    }

    controller.dispose();
    tracing::info!("game room closed");
}

fn handle_join(
    config: &ServerConfig,
    controller: &mut GameController,
    state: &mut RoomState,
    pending_events: &mut Vec<GameEvent>,
    store: &mut dyn RatingStore,
    started: bool,
    player_id: PlayerId,
) -> Result<RoomState, JoinError> {
    if started {
        return Err(JoinError::GameInProgress);
    }
    if controller.player_count() >= config.max_players_per_room {
        return Err(JoinError::RoomFull);
    }

    let rating = store
        .ensure(&player_id)
        .map_err(|e| JoinError::Internal(e.to_string()))?;
    let snapshot = controller
        .handle_player_join(player_id.clone(), rating)
        .map_err(|e| JoinError::Internal(e.to_string()))?;
    controller.sync_room_state(state, &snapshot);

    pending_events.push(room_event(
        state,
        GameEventData::PlayerJoin {
            player_id: player_id.clone(),
            rating,
        },
    ));

    // The join response is the current document plus the roster.
    let mut roster: Vec<&crate::controller::GamePlayer> = controller.players.values().collect();
    roster.sort_by_key(|p| p.joined_at);
    let mut welcome = state.clone();
    welcome.events = vec![room_event(
        state,
        GameEventData::Init {
            players: roster
                .into_iter()
                .map(|p| PlayerProfile {
                    id: p.id.clone(),
                    rating: p.rating,
                })
                .collect(),
        },
    )];
    Ok(welcome)
}
