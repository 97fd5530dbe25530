//! rapier2d wrapper owning all physics state for one board.
//!
//! Every collider carries a [`BodyTag`] in a side registry so collision
//! dispatch is a tagged-enum match instead of string label lookups.
//! Coordinates are pixels with y pointing down, so gravity is positive.
//!
//! rapier2d is compiled with `enhanced-determinism`; combined with the
//! fixed timestep and sorted collision pairs, stepping the same state with
//! the same inputs reproduces the same trajectories.

use std::collections::HashMap;

use rapier2d::prelude::*;
use tiltball_shared::PlayerId;

/// Gravity along +y (screen-down), px/s².
pub const GRAVITY_Y: f32 = 750.0;

/// Gameplay role of a field collider, resolved on contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Wall,
    Reset,
    RedeployBall,
    Bumper { points: u32 },
    Paddle,
}

/// What a collider is, for collision dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyTag {
    Pinball { player_id: PlayerId },
    Field { label: String, kind: FieldKind },
}

/// A collision that started during a step, as collider handle pair.
#[derive(Debug, Clone, Copy)]
pub struct CollisionPair {
    pub first: ColliderHandle,
    pub second: ColliderHandle,
}

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    tags: HashMap<ColliderHandle, BodyTag>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, GRAVITY_Y],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            tags: HashMap::new(),
        }
    }

    pub fn insert_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.bodies.insert(body)
    }

    /// Attach a collider to a body, registering its tag if it takes part
    /// in gameplay dispatch.
    pub fn insert_collider(
        &mut self,
        collider: Collider,
        parent: RigidBodyHandle,
        tag: Option<BodyTag>,
    ) -> ColliderHandle {
        let handle = self
            .colliders
            .insert_with_parent(collider, parent, &mut self.bodies);
        if let Some(tag) = tag {
            self.tags.insert(handle, tag);
        }
        handle
    }

    pub fn insert_joint(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> ImpulseJointHandle {
        self.impulse_joints.insert(body1, body2, joint, true)
    }

    /// Remove a body with its colliders and joints.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        let colliders = &self.colliders;
        self.tags.retain(|h, _| colliders.contains(*h));
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn tag(&self, handle: ColliderHandle) -> Option<&BodyTag> {
        self.tags.get(&handle)
    }

    /// Step the simulation by `dt` seconds.
    ///
    /// Returns collisions that started during the step, sorted by handle so
    /// dispatch order does not depend on rapier's internal channel order.
    pub fn step(&mut self, dt: f32) -> Vec<CollisionPair> {
        self.integration_params.dt = dt as Real;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        let mut pairs = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _flags) = event {
                pairs.push(CollisionPair {
                    first: h1,
                    second: h2,
                });
            }
        }

        pairs.sort_by_key(|p| {
            let a = p.first.into_raw_parts();
            let b = p.second.into_raw_parts();
            (a.min(b), a.max(b))
        });

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_ball_falls_under_gravity() {
        let mut physics = PhysicsWorld::new();
        let body = physics.insert_body(
            RigidBodyBuilder::dynamic()
                .translation(vector![100.0, 100.0])
                .build(),
        );
        physics.insert_collider(ColliderBuilder::ball(10.0).build(), body, None);

        for _ in 0..60 {
            physics.step(1.0 / 60.0);
        }

        let y = physics.body(body).unwrap().translation().y;
        assert!(y > 100.0, "ball should fall toward +y, got {y}");
    }

    #[test]
    fn collision_between_tagged_bodies_is_reported() {
        let mut physics = PhysicsWorld::new();

        let floor = physics.insert_body(
            RigidBodyBuilder::fixed()
                .translation(vector![100.0, 300.0])
                .build(),
        );
        physics.insert_collider(
            ColliderBuilder::cuboid(200.0, 10.0).build(),
            floor,
            Some(BodyTag::Field {
                label: "floor".to_string(),
                kind: FieldKind::Wall,
            }),
        );

        let ball = physics.insert_body(
            RigidBodyBuilder::dynamic()
                .translation(vector![100.0, 100.0])
                .ccd_enabled(true)
                .build(),
        );
        physics.insert_collider(
            ColliderBuilder::ball(10.0)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build(),
            ball,
            Some(BodyTag::Pinball {
                player_id: "1".to_string(),
            }),
        );

        let mut hit = false;
        for _ in 0..240 {
            for pair in physics.step(1.0 / 60.0) {
                let tags = (physics.tag(pair.first), physics.tag(pair.second));
                if let (Some(_), Some(_)) = tags {
                    hit = true;
                }
            }
        }
        assert!(hit, "ball never reached the floor");
    }

    #[test]
    fn removing_a_body_drops_its_tags() {
        let mut physics = PhysicsWorld::new();
        let body = physics.insert_body(RigidBodyBuilder::dynamic().build());
        let collider = physics.insert_collider(
            ColliderBuilder::ball(5.0).build(),
            body,
            Some(BodyTag::Pinball {
                player_id: "1".to_string(),
            }),
        );
        assert!(physics.tag(collider).is_some());

        physics.remove_body(body);
        assert!(physics.tag(collider).is_none());
    }
}
