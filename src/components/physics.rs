use glam::{Quat, Vec3};
use hecs::Entity;

/// World-space placement of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Linear velocity in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec3);

/// Angular velocity (axis * radians per second). Ignored on rotation-locked bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularVelocity(pub Vec3);

/// Collision shape attached to a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    Sphere { radius: f32 },
    /// Vertical capsule. `height` is the segment length between hemisphere centers.
    Capsule { radius: f32, height: f32 },
    /// Infinite plane: points `p` with `p.dot(normal) == offset`.
    Plane { normal: Vec3, offset: f32 },
    /// Axis-aligned box. Body rotation is not applied to the shape.
    Box { half_extents: Vec3 },
}

/// How the integrator and the contact solver treat a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves. Infinite mass for contact response.
    Static,
    /// Gravity, velocity integration and contact response.
    Dynamic,
}

/// Collision groups. Each group is one bit of a [`CollisionFilter`] mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionGroup {
    Default,
    Characters,
    TrimeshColliders,
}

impl CollisionGroup {
    #[inline]
    pub const fn bit(self) -> u32 {
        match self {
            Self::Default => 1,
            Self::Characters => 1 << 1,
            Self::TrimeshColliders => 1 << 2,
        }
    }

    /// Mask containing every listed group.
    pub fn mask(groups: &[CollisionGroup]) -> u32 {
        groups.iter().fold(0, |mask, g| mask | g.bit())
    }
}

/// Group membership plus the set of groups this body reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionFilter {
    pub group: CollisionGroup,
    pub mask: u32,
}

impl CollisionFilter {
    pub const fn new(group: CollisionGroup, mask: u32) -> Self {
        Self { group, mask }
    }

    /// Both bodies must accept each other's group for a contact to exist.
    #[inline]
    pub fn interacts(&self, other: &CollisionFilter) -> bool {
        self.mask & other.group.bit() != 0 && other.mask & self.group.bit() != 0
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::new(CollisionGroup::Default, u32::MAX)
    }
}

/// Marker: integration never changes this body's rotation.
#[derive(Debug, Clone, Copy)]
pub struct RotationLocked;

/// Marker: body is skipped by integration, contacts, ray casts and step callbacks.
#[derive(Debug, Clone, Copy)]
pub struct Disabled;

/// Position at the start of the last fixed step, for render interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviousPosition(pub Vec3);

/// Velocity after integration but before contact resolution in the last step.
/// A landing body reads its touchdown speed from here since contacts zero it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreContactVelocity(pub Vec3);

/// Restitution coefficient. 0.0 = no bounce, 1.0 = perfect bounce.
#[derive(Debug, Clone, Copy)]
pub struct Restitution(pub f32);

/// Coulomb friction coefficient, averaged between the two bodies of a contact.
#[derive(Debug, Clone, Copy)]
pub struct Friction(pub f32);

/// Body mass in kilograms. Only weighs the push-out between two dynamic bodies;
/// bodies without one count as 1 kg.
#[derive(Debug, Clone, Copy)]
pub struct Mass(pub f32);

/// Contact produced by the detection phase.
/// `contact_normal` points from `entity_a` toward `entity_b`.
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent {
    pub entity_a: Entity,
    pub entity_b: Entity,
    pub contact_normal: Vec3,
    pub penetration_depth: f32,
}
