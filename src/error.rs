//! Error types.
//!
//! Construction-time problems are [`ConfigError`]s and stop a character from
//! ever entering the simulation loop. Missing bodies are [`PhysicsError`]s and
//! are propagated out of the tick instead of being papered over.

use thiserror::Error;

use crate::physics::BodyHandle;

/// Invalid tuning or a configuration file that could not be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("spring mass must be finite and > 0, got {0}")]
    SpringMass(f32),

    #[error("spring damping must be in (0, 1], got {0}")]
    SpringDamping(f32),

    #[error("spring frame rate must be finite and > 0, got {0}")]
    SpringFrameRate(f32),

    #[error("ground ray length must be > 0, got {0}")]
    RayLength(f32),

    #[error("ground ray safe offset must be >= 0, got {0}")]
    RaySafeOffset(f32),

    #[error("capsule {field} must be > 0, got {value}")]
    Capsule { field: &'static str, value: f32 },

    #[error("capsule bottom sits {bottom} below its center but the ground ray only reaches {ray}")]
    RayShorterThanCapsule { bottom: f32, ray: f32 },

    #[error("gravity must be finite, got {0}")]
    Gravity(glam::Vec3),

    #[error("{field} must be finite and >= 0, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must be finite and > 0, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Errors raised by the physics world.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhysicsError {
    #[error("no rigid body for handle {0:?}")]
    MissingBody(BodyHandle),

    #[error("body {0:?} is already registered as a step participant")]
    AlreadyRegistered(BodyHandle),
}

/// Seat occupancy failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeatError {
    #[error("seat {seat} is already occupied by character {occupant}")]
    Occupied { seat: usize, occupant: u32 },

    #[error("vehicle has no seat {0}")]
    NoSuchSeat(usize),

    #[error("character {character} does not occupy seat {seat}")]
    NotOccupant { seat: usize, character: u32 },
}

/// Top-level error for the simulation driver.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error(transparent)]
    Seat(#[from] SeatError),

    #[error("unknown character {0}")]
    UnknownCharacter(u32),

    #[error("unknown vehicle {0}")]
    UnknownVehicle(u32),
}
