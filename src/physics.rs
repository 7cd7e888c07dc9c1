//! Rigid-body world the character core runs inside.
//!
//! Bodies live in a private `hecs::World`; callers only ever see [`BodyHandle`]s.
//! Each fixed step runs, in order: previous-position snapshot, participant
//! pre-steps, integration, contact resolution, participant post-steps.

use std::collections::HashSet;

use glam::{Quat, Vec3};
use hecs::{Entity, World};
use tracing::trace;

use crate::components::{
    AngularVelocity, BodyKind, Collider, CollisionFilter, Disabled, Friction, Mass,
    PreContactVelocity, PreviousPosition, Restitution, RotationLocked, Transform, Velocity,
};
use crate::config::PhysicsConfig;
use crate::error::{ConfigError, PhysicsError};
use crate::systems::{
    integrate_bodies, raycast_closest, resolve_contacts, snapshot_pre_contact_velocities,
    snapshot_previous_positions,
};

/// Opaque reference to a rigid body owned by a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(Entity);

/// Everything needed to create a body.
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub collider: Collider,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub filter: CollisionFilter,
    pub restitution: Option<f32>,
    pub friction: Option<f32>,
    pub mass: Option<f32>,
    pub rotation_locked: bool,
}

impl BodyDesc {
    fn new(kind: BodyKind, collider: Collider, position: Vec3) -> Self {
        Self {
            kind,
            collider,
            position,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            filter: CollisionFilter::default(),
            restitution: None,
            friction: None,
            mass: None,
            rotation_locked: false,
        }
    }

    pub fn dynamic(collider: Collider, position: Vec3) -> Self {
        Self::new(BodyKind::Dynamic, collider, position)
    }

    pub fn fixed(collider: Collider, position: Vec3) -> Self {
        Self::new(BodyKind::Static, collider, position)
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_material(mut self, restitution: f32, friction: f32) -> Self {
        self.restitution = Some(restitution);
        self.friction = Some(friction);
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn rotation_locked(mut self) -> Self {
        self.rotation_locked = true;
        self
    }
}

/// Ray query filter: groups to test against and one body to ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayFilter {
    pub mask: u32,
    pub exclude: Option<BodyHandle>,
}

/// Nearest hit of a ray query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub body: BodyHandle,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// Object that wants callbacks around the integration of one body.
///
/// Registered with [`PhysicsWorld::register_participant`] by body identity and
/// passed to [`PhysicsWorld::step`] each tick. Callbacks only fire while the
/// body is registered and enabled.
pub trait PhysicsStepParticipant {
    fn body(&self) -> BodyHandle;

    /// Runs before the body is integrated this step.
    fn on_pre_step(&mut self, world: &mut PhysicsWorld, dt: f32) -> Result<(), PhysicsError>;

    /// Runs after integration and contact resolution.
    fn on_post_step(&mut self, world: &mut PhysicsWorld, dt: f32) -> Result<(), PhysicsError>;
}

pub struct PhysicsWorld {
    bodies: World,
    config: PhysicsConfig,
    participants: HashSet<BodyHandle>,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            bodies: World::new(),
            config,
            participants: HashSet::new(),
        })
    }

    #[inline]
    pub fn fixed_dt(&self) -> f32 {
        self.config.fixed_dt()
    }

    #[inline]
    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let entity = self.bodies.spawn((
            Transform {
                position: desc.position,
                rotation: desc.rotation,
            },
            Velocity(desc.velocity),
            AngularVelocity(Vec3::ZERO),
            desc.collider,
            desc.kind,
            desc.filter,
            PreviousPosition(desc.position),
            PreContactVelocity(desc.velocity),
        ));
        if let Some(r) = desc.restitution {
            let _ = self.bodies.insert_one(entity, Restitution(r));
        }
        if let Some(f) = desc.friction {
            let _ = self.bodies.insert_one(entity, Friction(f));
        }
        if let Some(m) = desc.mass {
            let _ = self.bodies.insert_one(entity, Mass(m));
        }
        if desc.rotation_locked {
            let _ = self.bodies.insert_one(entity, RotationLocked);
        }
        BodyHandle(entity)
    }

    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        self.participants.remove(&handle);
        self.bodies
            .despawn(handle.0)
            .map_err(|_| PhysicsError::MissingBody(handle))
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle.0)
    }

    pub fn register_participant(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        if !self.contains(handle) {
            return Err(PhysicsError::MissingBody(handle));
        }
        if !self.participants.insert(handle) {
            return Err(PhysicsError::AlreadyRegistered(handle));
        }
        Ok(())
    }

    /// Returns whether the body was registered.
    pub fn unregister_participant(&mut self, handle: BodyHandle) -> bool {
        self.participants.remove(&handle)
    }

    pub fn is_participant(&self, handle: BodyHandle) -> bool {
        self.participants.contains(&handle)
    }

    fn component<T: hecs::Component + Copy>(&self, handle: BodyHandle) -> Result<T, PhysicsError> {
        self.bodies
            .get::<&T>(handle.0)
            .map(|c| *c)
            .map_err(|_| PhysicsError::MissingBody(handle))
    }

    pub fn position(&self, handle: BodyHandle) -> Result<Vec3, PhysicsError> {
        self.component::<Transform>(handle).map(|t| t.position)
    }

    pub fn set_position(&mut self, handle: BodyHandle, position: Vec3) -> Result<(), PhysicsError> {
        let mut transform = self
            .bodies
            .get::<&mut Transform>(handle.0)
            .map_err(|_| PhysicsError::MissingBody(handle))?;
        transform.position = position;
        Ok(())
    }

    /// Move a body without leaving an interpolation trail: previous and current
    /// positions both become `position`.
    pub fn teleport(&mut self, handle: BodyHandle, position: Vec3) -> Result<(), PhysicsError> {
        self.set_position(handle, position)?;
        self.bodies
            .insert_one(handle.0, PreviousPosition(position))
            .map_err(|_| PhysicsError::MissingBody(handle))
    }

    /// Move a body that is not being integrated (e.g. disabled while seated),
    /// keeping its old position as the interpolation start.
    pub fn place(&mut self, handle: BodyHandle, position: Vec3) -> Result<(), PhysicsError> {
        let current = self.position(handle)?;
        self.bodies
            .insert_one(handle.0, PreviousPosition(current))
            .map_err(|_| PhysicsError::MissingBody(handle))?;
        self.set_position(handle, position)
    }

    pub fn velocity(&self, handle: BodyHandle) -> Result<Vec3, PhysicsError> {
        self.component::<Velocity>(handle).map(|v| v.0)
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> Result<(), PhysicsError> {
        let mut vel = self
            .bodies
            .get::<&mut Velocity>(handle.0)
            .map_err(|_| PhysicsError::MissingBody(handle))?;
        vel.0 = velocity;
        Ok(())
    }

    pub fn previous_position(&self, handle: BodyHandle) -> Result<Vec3, PhysicsError> {
        self.component::<PreviousPosition>(handle).map(|p| p.0)
    }

    pub fn pre_contact_velocity(&self, handle: BodyHandle) -> Result<Vec3, PhysicsError> {
        self.component::<PreContactVelocity>(handle).map(|v| v.0)
    }

    pub fn collider(&self, handle: BodyHandle) -> Result<Collider, PhysicsError> {
        self.component::<Collider>(handle)
    }

    pub fn filter(&self, handle: BodyHandle) -> Result<CollisionFilter, PhysicsError> {
        self.component::<CollisionFilter>(handle)
    }

    pub fn is_rotation_locked(&self, handle: BodyHandle) -> Result<bool, PhysicsError> {
        if !self.contains(handle) {
            return Err(PhysicsError::MissingBody(handle));
        }
        Ok(self.bodies.get::<&RotationLocked>(handle.0).is_ok())
    }

    /// A disabled body is skipped by integration, contacts, ray casts and step callbacks.
    pub fn set_enabled(&mut self, handle: BodyHandle, enabled: bool) -> Result<(), PhysicsError> {
        if !self.contains(handle) {
            return Err(PhysicsError::MissingBody(handle));
        }
        if enabled {
            let _ = self.bodies.remove_one::<Disabled>(handle.0);
        } else {
            let _ = self.bodies.insert_one(handle.0, Disabled);
        }
        Ok(())
    }

    pub fn is_enabled(&self, handle: BodyHandle) -> Result<bool, PhysicsError> {
        if !self.contains(handle) {
            return Err(PhysicsError::MissingBody(handle));
        }
        Ok(self.bodies.get::<&Disabled>(handle.0).is_err())
    }

    pub fn ray_cast_closest(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: RayFilter,
    ) -> Option<RayHit> {
        raycast_closest(
            &self.bodies,
            origin,
            direction,
            max_distance,
            filter.mask,
            filter.exclude.map(|h| h.0),
        )
        .map(|hit| RayHit {
            body: BodyHandle(hit.entity),
            point: hit.point,
            normal: hit.normal,
            distance: hit.distance,
        })
    }

    fn wants_callbacks(&self, handle: BodyHandle) -> bool {
        self.is_participant(handle) && self.bodies.get::<&Disabled>(handle.0).is_err()
    }

    /// Advance the world by one fixed step.
    pub fn step<P: PhysicsStepParticipant>(&mut self, participants: &mut [P]) -> Result<(), PhysicsError> {
        let dt = self.fixed_dt();

        snapshot_previous_positions(&mut self.bodies);

        for participant in participants.iter_mut() {
            if self.wants_callbacks(participant.body()) {
                participant.on_pre_step(self, dt)?;
            }
        }

        integrate_bodies(&mut self.bodies, self.config.gravity, dt);
        snapshot_pre_contact_velocities(&mut self.bodies);
        let contacts = resolve_contacts(&mut self.bodies, dt);
        trace!(contacts = contacts.len(), "contacts resolved");

        for participant in participants.iter_mut() {
            if self.wants_callbacks(participant.body()) {
                participant.on_post_step(self, dt)?;
            }
        }
        Ok(())
    }
}
