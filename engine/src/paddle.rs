//! Flipper paddles.
//!
//! A paddle is a dynamic flipper body pinned to the board by a revolute
//! joint at its anchor. Its angle is not written directly: a kinematic
//! sensor lever body orbits the pivot at the interpolated lever angle, and
//! a stiff spring joint drags the flipper tip after it, so the constraint
//! solver is what actually swings the flipper and transfers momentum into
//! the pinball.

use rapier2d::prelude::*;
use tiltball_shared::map::FieldObject;
use tiltball_shared::vec2::{degrees_to_radians, lerp, vec2, Vec2};

use crate::map::{MapError, PADDLE_RESTITUTION};
use crate::physics::{BodyTag, FieldKind, PhysicsWorld};

/// Distance from pivot to the lever attachment point, px.
pub const LEVER_OFFSET: f32 = 64.0;
const LEVER_HALF_EXTENT: f32 = 16.0;
const LEVER_STIFFNESS: f32 = 4.0e4;
const LEVER_DAMPING: f32 = 5.0e2;
const BODY_MASS: f32 = 10.0;

/// Per-tick lerp factor while the paddle is pressed.
pub const ENGAGE_LERP: f32 = 0.8;
/// Per-tick lerp factor while the paddle is released.
pub const RELEASE_LERP: f32 = 0.5;

pub struct Paddle {
    pub label: String,
    pub body: RigidBodyHandle,
    pub lever: RigidBodyHandle,
    /// Lever angle in degrees.
    pub angle: f32,
    pub inactive_angle: f32,
    pub active_angle: f32,
    pub is_active: bool,
    pivot: Vec2,
}

/// Advance the lever angle one tick toward its target.
/// Engage is snappier than release.
pub fn step_paddle_angle(
    current: f32,
    is_active: bool,
    active_angle: f32,
    inactive_angle: f32,
) -> f32 {
    if is_active {
        lerp(current, active_angle, ENGAGE_LERP)
    } else {
        lerp(current, inactive_angle, RELEASE_LERP)
    }
}

impl Paddle {
    /// Build the flipper body, pin constraint, lever body and spring.
    ///
    /// `ground` is the map's static joint frame; `shape` is the already
    /// scaled collider shape; `anchor` is the pivot relative to the shape's
    /// top-left corner.
    pub fn new(
        physics: &mut PhysicsWorld,
        ground: RigidBodyHandle,
        field: &FieldObject,
        anchor: Vec2,
        shape: SharedShape,
    ) -> Result<Paddle, MapError> {
        let inactive_angle =
            field
                .inactive_angle_degrees
                .ok_or_else(|| MapError::PaddleMissingAngles {
                    label: field.label.clone(),
                })?;
        let active_angle =
            field
                .active_angle_degrees
                .ok_or_else(|| MapError::PaddleMissingAngles {
                    label: field.label.clone(),
                })?;

        let aabb = shape.compute_local_aabb();
        let translation = vec2(field.position.x - aabb.mins.x, field.position.y - aabb.mins.y);
        let pivot_local = vec2(aabb.mins.x + anchor.x, aabb.mins.y + anchor.y);
        let pivot = vec2(field.position.x + anchor.x, field.position.y + anchor.y);

        let body = physics.insert_body(
            RigidBodyBuilder::dynamic()
                .translation(vector![translation.x, translation.y])
                .build(),
        );
        physics.insert_collider(
            ColliderBuilder::new(shape)
                .restitution(PADDLE_RESTITUTION)
                .friction(0.0)
                .mass(BODY_MASS)
                .build(),
            body,
            Some(BodyTag::Field {
                label: field.label.clone(),
                kind: FieldKind::Paddle,
            }),
        );

        // Pinhole: flipper rotates freely about the pivot.
        physics.insert_joint(
            ground,
            body,
            RevoluteJointBuilder::new()
                .local_anchor1(point![pivot.x, pivot.y])
                .local_anchor2(point![pivot_local.x, pivot_local.y]),
        );

        let angle = field.angle_degrees.unwrap_or(inactive_angle);
        let lever_pos = lever_position(pivot, angle);
        let lever = physics.insert_body(
            RigidBodyBuilder::kinematic_position_based()
                .translation(vector![lever_pos.x, lever_pos.y])
                .build(),
        );
        physics.insert_collider(
            ColliderBuilder::cuboid(LEVER_HALF_EXTENT, LEVER_HALF_EXTENT)
                .sensor(true)
                .build(),
            lever,
            None,
        );

        // The spring drags the flipper tip after the lever.
        physics.insert_joint(
            body,
            lever,
            SpringJointBuilder::new(0.0, LEVER_STIFFNESS, LEVER_DAMPING)
                .local_anchor1(point![pivot_local.x + LEVER_OFFSET, pivot_local.y])
                .local_anchor2(point![0.0, 0.0]),
        );

        Ok(Paddle {
            label: field.label.clone(),
            body,
            lever,
            angle,
            inactive_angle,
            active_angle,
            is_active: false,
            pivot,
        })
    }

    pub fn activate(&mut self) {
        self.is_active = true;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Advance the lever angle and move the kinematic lever target.
    pub fn update(&mut self, physics: &mut PhysicsWorld) {
        self.angle =
            step_paddle_angle(self.angle, self.is_active, self.active_angle, self.inactive_angle);

        let target = lever_position(self.pivot, self.angle);
        if let Some(lever) = physics.body_mut(self.lever) {
            lever.set_next_kinematic_translation(vector![target.x, target.y]);
        }
    }
}

fn lever_position(pivot: Vec2, angle_degrees: f32) -> Vec2 {
    let radians = degrees_to_radians(angle_degrees);
    vec2(
        pivot.x + radians.cos() * LEVER_OFFSET,
        pivot.y + radians.sin() * LEVER_OFFSET,
    )
}
