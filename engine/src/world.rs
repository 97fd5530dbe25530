//! The simulated world of one board: map, players, pinballs, physics.
//!
//! `update` advances everything by one tick and returns what happened as
//! plain [`WorldEvent`]s; turning those into game events and score changes
//! is [`Game`](crate::game::Game)'s job.

use std::collections::HashMap;

use thiserror::Error;
use tiltball_shared::map::GameMapData;
use tiltball_shared::PlayerId;

use crate::map::{GameMap, MapError};
use crate::physics::{BodyTag, FieldKind, PhysicsWorld};
use crate::pinball::Pinball;
use crate::player::Player;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("no map is currently loaded")]
    MapNotLoaded,
    #[error("player \"{0}\" not found")]
    UnknownPlayer(PlayerId),
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Something that happened during one physics tick.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    LostRound {
        player_id: PlayerId,
    },
    PinballRedeploy {
        player_id: PlayerId,
        pinball_id: String,
    },
    BumperHit {
        player_id: PlayerId,
        label: String,
        points: u32,
    },
}

#[derive(Default)]
pub struct World {
    pub physics: PhysicsWorld,
    pub map: Option<GameMap>,
    pub players: HashMap<PlayerId, Player>,
    /// Exactly one pinball per player, keyed by the owning player.
    pub pinballs: HashMap<PlayerId, Pinball>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_map(&mut self, data: GameMapData) -> Result<(), MapError> {
        let map = GameMap::load(data, &mut self.physics)?;
        self.map = Some(map);
        Ok(())
    }

    pub fn add_player(&mut self, id: PlayerId) -> Result<&mut Player, WorldError> {
        if self.map.is_none() {
            return Err(WorldError::MapNotLoaded);
        }
        tracing::debug!(player = %id, "player spawned");
        Ok(self
            .players
            .entry(id.clone())
            .or_insert_with(|| Player::new(id)))
    }

    pub fn add_pinball_for_player(
        &mut self,
        id: String,
        player_id: PlayerId,
    ) -> Result<&Pinball, WorldError> {
        let map = self.map.as_ref().ok_or(WorldError::MapNotLoaded)?;
        if !self.players.contains_key(&player_id) {
            return Err(WorldError::UnknownPlayer(player_id));
        }
        let template = map.data.pinball.clone();
        let pinball = Pinball::spawn(&mut self.physics, id, player_id.clone(), &template);
        self.pinballs.insert(player_id.clone(), pinball);
        Ok(&self.pinballs[&player_id])
    }

    pub fn remove_player(&mut self, id: &PlayerId) -> bool {
        if let Some(pinball) = self.pinballs.remove(id) {
            self.physics.remove_body(pinball.body);
        }
        self.players.remove(id).is_some()
    }

    /// Respawn the player's pinball and report the lost round.
    /// Score bookkeeping happens upstream.
    pub fn lose_round_for_player(&mut self, player_id: &PlayerId) -> Option<WorldEvent> {
        let pinball = self.pinballs.get(player_id)?;
        pinball.reset(&mut self.physics);
        Some(WorldEvent::LostRound {
            player_id: player_id.clone(),
        })
    }

    pub fn redeploy_for_player(&mut self, player_id: &PlayerId) -> Option<WorldEvent> {
        let pinball = self.pinballs.get(player_id)?;
        pinball.redeploy(&mut self.physics);
        Some(WorldEvent::PinballRedeploy {
            player_id: player_id.clone(),
            pinball_id: pinball.id.clone(),
        })
    }

    /// Advance one fixed tick: paddle interpolation, pinball housekeeping,
    /// physics step, collision dispatch.
    pub fn update(&mut self, delta_ms: f64) -> Vec<WorldEvent> {
        let Some(map) = self.map.as_mut() else {
            return Vec::new();
        };
        map.update(&mut self.physics);

        for pinball in self.pinballs.values() {
            pinball.update(&mut self.physics);
        }

        let pairs = self.physics.step((delta_ms / 1000.0) as f32);

        let mut events = Vec::new();
        for pair in pairs {
            let first = self.physics.tag(pair.first).cloned();
            let second = self.physics.tag(pair.second).cloned();

            let (player_id, label, kind) = match (first, second) {
                (
                    Some(BodyTag::Pinball { player_id }),
                    Some(BodyTag::Field { label, kind }),
                )
                | (
                    Some(BodyTag::Field { label, kind }),
                    Some(BodyTag::Pinball { player_id }),
                ) => (player_id, label, kind),
                _ => continue,
            };

            if !self.players.contains_key(&player_id) {
                tracing::warn!(player = %player_id, %label, "contact for unknown player dropped");
                continue;
            }

            match kind {
                FieldKind::Reset => {
                    events.extend(self.lose_round_for_player(&player_id));
                }
                FieldKind::RedeployBall => {
                    events.extend(self.redeploy_for_player(&player_id));
                }
                FieldKind::Bumper { points } => {
                    events.push(WorldEvent::BumperHit {
                        player_id,
                        label,
                        points,
                    });
                }
                FieldKind::Wall | FieldKind::Paddle => {}
            }
        }

        events
    }

    pub fn clear(&mut self) {
        self.physics = PhysicsWorld::new();
        self.map = None;
        self.players.clear();
        self.pinballs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiltball_shared::map::GameMapName;
    use tiltball_shared::maps::game_map;
    use tiltball_shared::vec2::vec2;

    const TICK_MS: f64 = 1000.0 / 60.0;

    fn test_world() -> World {
        let mut world = World::new();
        world.load_map(game_map(GameMapName::Multiplayer)).unwrap();
        world.add_player("1".to_string()).unwrap();
        world
            .add_pinball_for_player("1".to_string(), "1".to_string())
            .unwrap();
        world
    }

    fn run_until<F: Fn(&WorldEvent) -> bool>(
        world: &mut World,
        max_ticks: usize,
        predicate: F,
    ) -> Option<WorldEvent> {
        for _ in 0..max_ticks {
            for event in world.update(TICK_MS) {
                if predicate(&event) {
                    return Some(event);
                }
            }
        }
        None
    }

    #[test]
    fn adding_player_without_map_fails() {
        let mut world = World::new();
        assert!(matches!(
            world.add_player("1".to_string()),
            Err(WorldError::MapNotLoaded)
        ));
    }

    #[test]
    fn pinball_requires_existing_player() {
        let mut world = World::new();
        world.load_map(game_map(GameMapName::Multiplayer)).unwrap();
        assert!(matches!(
            world.add_pinball_for_player("2".to_string(), "2".to_string()),
            Err(WorldError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn draining_through_the_middle_loses_the_round() {
        let mut world = test_world();
        // Drop the ball straight into the gap between the paddles.
        world.pinballs["1"].set_kinematics(&mut world.physics, vec2(270.0, 880.0), vec2(0.0, 300.0));

        let event = run_until(&mut world, 120, |e| {
            matches!(e, WorldEvent::LostRound { .. })
        });
        assert!(event.is_some(), "ball never reached the reset floor");

        // Respawned at the spawn point.
        let pos = world.pinballs["1"].position(&world.physics);
        assert_eq!(pos, vec2(270.0, 716.0));
    }

    #[test]
    fn bumper_contact_reports_points() {
        let mut world = test_world();
        // Aim at bumper_1 (circle centered at 158, 328).
        world.pinballs["1"].set_kinematics(&mut world.physics, vec2(158.0, 450.0), vec2(0.0, -800.0));

        let event = run_until(&mut world, 120, |e| {
            matches!(e, WorldEvent::BumperHit { .. })
        });
        match event {
            Some(WorldEvent::BumperHit { label, points, .. }) => {
                assert_eq!(points, 100);
                assert!(label.starts_with("bumper_"));
            }
            other => panic!("expected a bumper hit, got {other:?}"),
        }
    }

    #[test]
    fn kicker_redeploys_without_respawning() {
        let mut world = test_world();
        // Fall onto the kicker (circle centered at 82, 582).
        world.pinballs["1"].set_kinematics(&mut world.physics, vec2(82.0, 500.0), vec2(0.0, 300.0));

        let event = run_until(&mut world, 120, |e| {
            matches!(e, WorldEvent::PinballRedeploy { .. })
        });
        assert!(event.is_some(), "ball never hit the kicker");

        // Still near the kicker, not back at spawn.
        let pos = world.pinballs["1"].position(&world.physics);
        assert!(pos.y < 700.0, "ball should not have respawned, at {pos:?}");
        // Kicked upward again.
        let vel = world.pinballs["1"].velocity(&world.physics);
        assert!(vel.y < 0.0);
    }

    #[test]
    fn contacts_for_removed_players_are_dropped() {
        let mut world = test_world();
        world.players.remove("1");
        world.pinballs["1"].set_kinematics(&mut world.physics, vec2(270.0, 880.0), vec2(0.0, 300.0));

        let event = run_until(&mut world, 120, |_| true);
        assert!(event.is_none(), "events should be dropped, got {event:?}");
    }
}
