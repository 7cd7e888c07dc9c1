//! Locomotion and interaction core for a physics-driven 3D character.
//!
//! A [`Simulation`](app::Simulation) owns the physics world, the characters
//! and the vehicles. Each fixed tick turns routed input into motion intent,
//! steps the physics with every character's pre/post hooks, and advances the
//! character state machines.

pub mod app;
pub mod camera;
pub mod character;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod fsm;
pub mod physics;
pub mod scene;
pub mod spring;
pub mod systems;
pub mod vehicle;

pub mod prelude {
    pub use crate::app::{InputReceiver, Simulation};
    pub use crate::character::{Character, CharacterDesc, ControlHandoff};
    pub use crate::components::{CharacterId, CharacterState, Collider, GroundContact, VelocityMode};
    pub use crate::config::{CharacterConfig, PhysicsConfig};
    pub use crate::engine::input::{Action, ActionSet, InputEvent};
    pub use crate::error::{ConfigError, PhysicsError, SeatError, SimulationError};
    pub use crate::physics::{BodyDesc, BodyHandle, PhysicsWorld};
    pub use crate::scene::{CharacterAssembly, SpawnPoint};
    pub use crate::vehicle::{SeatKind, Vehicle, VehicleDesc, VehicleId, VehicleSeat};
}
