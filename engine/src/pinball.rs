//! The pinball: one dynamic CCD ball per player.

use rapier2d::prelude::*;
use tiltball_shared::map::PinballTemplate;
use tiltball_shared::vec2::{vec2, Vec2};
use tiltball_shared::PlayerId;

use crate::physics::{BodyTag, PhysicsWorld};

const BODY_MASS: f32 = 0.1;
const RESTITUTION: f32 = 0.5;
/// Cap on linear speed, px/s. The solver can produce silly exit
/// velocities out of a bumper sandwich; everything above this is clamped.
pub const MAX_SPEED: f32 = 1200.0;
/// Velocity applied on spawn, reset and redeploy: straight up the board.
pub const INITIAL_VELOCITY: Vec2 = Vec2 { x: 0.0, y: -1200.0 };

pub struct Pinball {
    pub id: String,
    pub player_id: PlayerId,
    pub body: RigidBodyHandle,
    pub radius: f32,
    pub fill: String,
    spawn: Vec2,
}

impl Pinball {
    /// Spawn a pinball at the map's spawn point with the initial velocity.
    pub fn spawn(
        physics: &mut PhysicsWorld,
        id: String,
        player_id: PlayerId,
        template: &PinballTemplate,
    ) -> Pinball {
        // Template position is the top-left of the ball's bounding box.
        let spawn = vec2(
            template.position.x + template.radius,
            template.position.y + template.radius,
        );

        let body = physics.insert_body(
            RigidBodyBuilder::dynamic()
                .translation(vector![spawn.x, spawn.y])
                .linvel(vector![INITIAL_VELOCITY.x, INITIAL_VELOCITY.y])
                .ccd_enabled(true)
                .build(),
        );
        physics.insert_collider(
            ColliderBuilder::ball(template.radius)
                .restitution(RESTITUTION)
                .friction(0.0)
                .mass(BODY_MASS)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build(),
            body,
            Some(BodyTag::Pinball {
                player_id: player_id.clone(),
            }),
        );

        Pinball {
            id,
            player_id,
            body,
            radius: template.radius,
            fill: template.fill.clone(),
            spawn,
        }
    }

    /// Per-tick housekeeping: no spin, capped speed.
    pub fn update(&self, physics: &mut PhysicsWorld) {
        if let Some(body) = physics.body_mut(self.body) {
            body.set_angvel(0.0, false);
            let velocity = *body.linvel();
            let speed = velocity.norm();
            if speed > MAX_SPEED {
                body.set_linvel(velocity * (MAX_SPEED / speed), true);
            }
        }
    }

    /// Teleport back to the spawn point with the initial velocity.
    pub fn reset(&self, physics: &mut PhysicsWorld) {
        if let Some(body) = physics.body_mut(self.body) {
            body.set_translation(vector![self.spawn.x, self.spawn.y], true);
            body.set_linvel(vector![INITIAL_VELOCITY.x, INITIAL_VELOCITY.y], true);
            body.set_angvel(0.0, true);
        }
    }

    /// Re-apply the initial velocity without moving the ball.
    pub fn redeploy(&self, physics: &mut PhysicsWorld) {
        if let Some(body) = physics.body_mut(self.body) {
            body.set_linvel(vector![INITIAL_VELOCITY.x, INITIAL_VELOCITY.y], true);
        }
    }

    pub fn position(&self, physics: &PhysicsWorld) -> Vec2 {
        match physics.body(self.body) {
            Some(body) => vec2(body.translation().x, body.translation().y),
            None => Vec2::ZERO,
        }
    }

    pub fn velocity(&self, physics: &PhysicsWorld) -> Vec2 {
        match physics.body(self.body) {
            Some(body) => vec2(body.linvel().x, body.linvel().y),
            None => Vec2::ZERO,
        }
    }

    pub fn set_kinematics(&self, physics: &mut PhysicsWorld, position: Vec2, velocity: Vec2) {
        if let Some(body) = physics.body_mut(self.body) {
            body.set_translation(vector![position.x, position.y], true);
            body.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }
}
