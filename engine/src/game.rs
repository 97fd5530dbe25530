//! Game orchestration on top of the world: start/end gates, the session
//! clock budget, score rules and the per-tick event buffer.
//!
//! The event buffer is drained exactly once per tick, by snapshot
//! generation; nothing else consumes it.

use tiltball_shared::map::GameMapData;
use tiltball_shared::protocol::{GameEvent, GameEventData};
use tiltball_shared::PlayerId;

use crate::engine::TickStamp;
use crate::map::MapError;
use crate::world::{World, WorldError, WorldEvent};

/// Session length in milliseconds of simulated time.
pub const GAME_DURATION_MS: f64 = 60_000.0;

pub struct Game {
    pub world: World,
    /// The tracked local player.
    pub me: Option<PlayerId>,
    /// Authoritative engines also accumulate the match-aggregate score.
    pub authoritative: bool,
    pub has_started: bool,
    pub has_ended: bool,
    pub time_started: Option<f64>,
    pub duration_ms: f64,
    /// Events of the tick in progress.
    pub events: Vec<GameEvent>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            me: None,
            authoritative: false,
            has_started: false,
            has_ended: false,
            time_started: None,
            duration_ms: GAME_DURATION_MS,
            events: Vec::new(),
        }
    }

    pub fn set_authoritative(&mut self, state: bool) {
        self.authoritative = state;
    }

    pub fn load_map(&mut self, data: GameMapData) -> Result<(), MapError> {
        self.world.load_map(data)
    }

    /// Designate the tracked local player.
    pub fn set_me(&mut self, player_id: PlayerId) -> Result<(), WorldError> {
        let player = self
            .world
            .players
            .get_mut(&player_id)
            .ok_or_else(|| WorldError::UnknownPlayer(player_id.clone()))?;
        player.is_me = true;
        player.is_opponent = false;
        self.me = Some(player_id);
        Ok(())
    }

    pub fn me_player(&self) -> Option<&crate::player::Player> {
        self.me.as_ref().and_then(|id| self.world.players.get(id))
    }

    fn push_event(&mut self, stamp: TickStamp, data: GameEventData) {
        self.events.push(GameEvent {
            frame: stamp.frame,
            timestamp: stamp.timestamp,
            data,
        });
    }

    /// Open the session clock. Announcing the start to the outside world
    /// (the GameStarted event) is the orchestrator's job, so engine-local
    /// snapshots carry gameplay events only.
    pub fn start(&mut self, stamp: TickStamp) {
        if self.has_started {
            return;
        }
        self.has_started = true;
        self.time_started = Some(stamp.timestamp);
        tracing::info!(frame = stamp.frame, "game started");
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        self.time_started.map_or(0.0, |started| now - started)
    }

    pub fn should_end(&self, now: f64) -> bool {
        self.has_started && !self.has_ended && self.elapsed(now) >= self.duration_ms
    }

    /// End the session. The terminal GameEnded event with placements is the
    /// authoritative controller's to emit, not the engine's.
    pub fn end(&mut self) {
        self.has_ended = true;
        tracing::info!("game ended");
    }

    /// Hold the given paddles active.
    pub fn handle_activate_objects(&mut self, stamp: TickStamp, labels: Vec<String>) {
        let Some(me) = self.me.clone() else {
            tracing::debug!("activate ignored: no tracked player");
            return;
        };
        if let Some(map) = self.world.map.as_mut() {
            for label in &labels {
                map.active_paddles.insert(label.clone());
            }
        }
        self.push_event(
            stamp,
            GameEventData::ActivateObjects {
                player_id: me,
                labels,
            },
        );
    }

    pub fn handle_deactivate_objects(&mut self, stamp: TickStamp, labels: Vec<String>) {
        let Some(me) = self.me.clone() else {
            tracing::debug!("deactivate ignored: no tracked player");
            return;
        };
        if let Some(map) = self.world.map.as_mut() {
            for label in &labels {
                map.active_paddles.remove(label);
            }
        }
        self.push_event(
            stamp,
            GameEventData::DeactivateObjects {
                player_id: me,
                labels,
            },
        );
    }

    /// Turn raw world events into score changes and game events.
    pub fn apply_world_events(&mut self, stamp: TickStamp, world_events: Vec<WorldEvent>) {
        for event in world_events {
            match event {
                WorldEvent::LostRound { player_id } => {
                    match self.world.players.get_mut(&player_id) {
                        Some(player) => player.reset_current_score(),
                        None => {
                            tracing::warn!(player = %player_id, "lost round for unknown player dropped");
                            continue;
                        }
                    }
                    self.push_event(stamp, GameEventData::PlayerLostRound { player_id });
                }
                WorldEvent::PinballRedeploy {
                    player_id,
                    pinball_id,
                } => {
                    self.push_event(
                        stamp,
                        GameEventData::PlayerPinballRedeploy {
                            player_id,
                            pinball_id,
                        },
                    );
                }
                WorldEvent::BumperHit {
                    player_id,
                    label,
                    points,
                } => {
                    match self.world.players.get_mut(&player_id) {
                        Some(player) => {
                            player.add_points(points);
                            if self.authoritative {
                                player.add_match_points(points);
                            }
                        }
                        None => {
                            tracing::warn!(player = %player_id, "bumper hit for unknown player dropped");
                            continue;
                        }
                    }
                    self.push_event(stamp, GameEventData::PingObject { player_id, label });
                }
            }
        }
    }

    /// One tick: either the clock budget runs out (exactly once), or the
    /// world advances and its fallout is applied.
    pub fn update(&mut self, stamp: TickStamp, delta_ms: f64) {
        if self.should_end(stamp.timestamp) {
            self.end();
            return;
        }
        let world_events = self.world.update(delta_ms);
        self.apply_world_events(stamp, world_events);
    }

    /// Drain the event buffer. Called by snapshot generation only.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.me = None;
        self.has_started = false;
        self.has_ended = false;
        self.time_started = None;
        self.events.clear();
        self.world.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::stamp;
    use tiltball_shared::map::GameMapName;
    use tiltball_shared::maps::game_map;

    fn test_game() -> Game {
        let mut game = Game::new();
        game.load_map(game_map(GameMapName::Multiplayer)).unwrap();
        game.world.add_player("1".to_string()).unwrap();
        game.world
            .add_pinball_for_player("1".to_string(), "1".to_string())
            .unwrap();
        game.set_me("1".to_string()).unwrap();
        game
    }

    #[test]
    fn bumper_hits_award_points_and_ping() {
        let mut game = test_game();
        game.apply_world_events(
            stamp(1, 16.0),
            vec![WorldEvent::BumperHit {
                player_id: "1".to_string(),
                label: "bumper_1".to_string(),
                points: 100,
            }],
        );

        let player = game.me_player().unwrap();
        assert_eq!(player.current_score, 100);
        assert_eq!(player.high_score, 100);
        assert_eq!(player.score, 0, "aggregate is authoritative-only");
        assert!(matches!(
            game.events.last().unwrap().data,
            GameEventData::PingObject { .. }
        ));
    }

    #[test]
    fn authoritative_game_accumulates_match_score() {
        let mut game = test_game();
        game.set_authoritative(true);
        game.apply_world_events(
            stamp(1, 16.0),
            vec![WorldEvent::BumperHit {
                player_id: "1".to_string(),
                label: "bumper_1".to_string(),
                points: 100,
            }],
        );
        assert_eq!(game.me_player().unwrap().score, 100);
    }

    #[test]
    fn lost_round_zeroes_current_score_only() {
        let mut game = test_game();
        game.apply_world_events(
            stamp(1, 16.0),
            vec![
                WorldEvent::BumperHit {
                    player_id: "1".to_string(),
                    label: "bumper_1".to_string(),
                    points: 250,
                },
                WorldEvent::LostRound {
                    player_id: "1".to_string(),
                },
            ],
        );

        let player = game.me_player().unwrap();
        assert_eq!(player.current_score, 0);
        assert_eq!(player.high_score, 250);
    }

    #[test]
    fn world_events_for_unknown_players_are_dropped() {
        let mut game = test_game();
        game.apply_world_events(
            stamp(1, 16.0),
            vec![WorldEvent::LostRound {
                player_id: "ghost".to_string(),
            }],
        );
        assert!(game.events.is_empty());
    }

    #[test]
    fn activate_tracks_labels_and_records_the_event() {
        let mut game = test_game();
        game.start(stamp(0, 0.0));
        game.handle_activate_objects(stamp(1, 16.0), vec!["paddle_bottom_left".to_string()]);

        let map = game.world.map.as_ref().unwrap();
        assert!(map.active_paddles.contains("paddle_bottom_left"));

        game.handle_deactivate_objects(stamp(2, 33.0), vec!["paddle_bottom_left".to_string()]);
        let map = game.world.map.as_ref().unwrap();
        assert!(!map.active_paddles.contains("paddle_bottom_left"));
    }

    #[test]
    fn input_without_tracked_player_is_ignored() {
        let mut game = Game::new();
        game.load_map(game_map(GameMapName::Multiplayer)).unwrap();
        game.handle_activate_objects(stamp(1, 16.0), vec!["paddle_bottom_left".to_string()]);
        assert!(game.events.is_empty());
    }

    #[test]
    fn game_ends_exactly_once_when_budget_is_exceeded() {
        let mut game = test_game();
        game.start(stamp(0, 0.0));
        assert!(!game.should_end(GAME_DURATION_MS - 1.0));

        game.update(stamp(1, GAME_DURATION_MS + 1.0), 16.0);
        assert!(game.has_ended);
    }
}
