use glam::Vec3;

use crate::fsm::StateMachine;
use crate::physics::BodyHandle;
use crate::vehicle::{SeatKind, VehicleId};

/// Stable identity of a character inside a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharacterId(pub u32);

impl std::fmt::Display for CharacterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "character#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Per-tick records
// ---------------------------------------------------------------------------

/// Kinematic snapshot of a character, refreshed every tick.
///
/// The body is rotation-locked, so facing lives here as a horizontal unit
/// vector rather than as a body rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionState {
    /// Change of the smoothed arcade velocity over the last pre-step (m/s²).
    pub acceleration: Vec3,
    /// Smoothed arcade velocity (m/s).
    pub velocity: Vec3,
    /// Arcade velocity the spring is pulling toward (m/s).
    pub velocity_target: Vec3,
    /// Current facing. Always unit length and horizontal.
    pub orientation: Vec3,
    pub orientation_target: Vec3,
    /// Turn rate around +Y (radians per sub-step).
    pub angular_velocity: f32,
}

impl MotionState {
    pub fn facing(orientation: Vec3) -> Self {
        let orientation = flat_unit(orientation).unwrap_or(Vec3::Z);
        Self {
            acceleration: Vec3::ZERO,
            velocity: Vec3::ZERO,
            velocity_target: Vec3::ZERO,
            orientation,
            orientation_target: orientation,
            angular_velocity: 0.0,
        }
    }
}

/// Horizontal unit vector, or `None` if `v` has no horizontal extent.
pub fn flat_unit(v: Vec3) -> Option<Vec3> {
    Vec3::new(v.x, 0.0, v.z).try_normalize()
}

/// Heading (radians around +Y) of a horizontal direction; 0 faces +Z.
#[inline]
pub fn yaw_of(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

/// Horizontal unit vector for a heading; inverse of [`yaw_of`].
#[inline]
pub fn direction_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Result of the downward ground probe for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    pub has_hit: bool,
    pub hit_point: Vec3,
    pub hit_normal: Vec3,
    /// Distance from the probe origin to the hit.
    pub distance: f32,
    /// How far the hit lies above standing height: `max(0, ray_cast_length - distance)`.
    pub penetration_depth: f32,
    /// Total probe length (`ray_cast_length + safe_offset`).
    pub ray_length: f32,
    pub safe_offset: f32,
    pub ground_body: Option<BodyHandle>,
}

impl GroundContact {
    pub fn airborne(ray_length: f32, safe_offset: f32) -> Self {
        Self {
            has_hit: false,
            hit_point: Vec3::ZERO,
            hit_normal: Vec3::Y,
            distance: ray_length,
            penetration_depth: 0.0,
            ray_length,
            safe_offset,
            ground_body: None,
        }
    }
}

/// What the last landing looked like. Filled in while airborne and on touchdown.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroundImpactData {
    /// Body velocity at touchdown (or the latest airborne velocity while in the air).
    pub velocity: Vec3,
    /// Highest body height reached since leaving the ground.
    pub peak_height: f32,
    /// `peak_height` minus the touchdown height.
    pub fall_height: f32,
}

/// How the smoothed arcade velocity is combined with the simulated body velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VelocityMode {
    /// Per axis: `lerp(simulated, arcade, influence)`.
    #[default]
    Replace,
    /// Per axis: add `arcade * influence` while the body is still slower than
    /// the target or moving against it.
    Additive,
}

// ---------------------------------------------------------------------------
// Vehicle entry
// ---------------------------------------------------------------------------

/// Transient record of a character moving into or out of a seat.
///
/// The character follows `path` at constant speed over `duration` seconds.
/// Logic lives in `systems::vehicle_entry`.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleEntryInstance {
    pub vehicle: VehicleId,
    pub seat: usize,
    pub seat_kind: SeatKind,
    /// World-space polyline, at least two points.
    pub path: Vec<Vec3>,
    pub duration: f32,
    pub elapsed: f32,
    /// Arcade velocity the character had when the entry began.
    pub pre_entry_velocity: Vec3,
    /// The seat stays claimed until this path completes. False for an entry
    /// (the seat is taken on arrival) and for a cancelled entry backing out.
    pub holds_seat: bool,
}

// ---------------------------------------------------------------------------
// Character state machine
// ---------------------------------------------------------------------------

/// All discrete states a character can be in.
///
/// Transition logic lives in `systems::states` so this file stays pure data.
/// Variants carry only what they need.
#[derive(Debug, Clone, PartialEq)]
pub enum CharacterState {
    Idle,
    Walk,
    /// `timer` counts how long `run` has been held in this state.
    Run { timer: f32 },
    Sprint,
    /// Standing jump. `air_time` is `None` during the wind-up and counts up after launch.
    JumpIdle { timer: f32, air_time: Option<f32> },
    /// Jump out of locomotion. Same bookkeeping as `JumpIdle`.
    JumpRunning { timer: f32, air_time: Option<f32> },
    Falling,
    /// Hard-landing recovery.
    DropRolling { timer: f32, impact_speed: f32 },
    EnteringVehicle { entry: VehicleEntryInstance },
    Driving { vehicle: VehicleId, seat: usize },
    /// Sitting in a passenger seat.
    Seated { vehicle: VehicleId, seat: usize },
    ExitingVehicle { exit: VehicleEntryInstance },
}

/// FSM component owned by each character.
pub type CharacterFsm = StateMachine<CharacterState>;
