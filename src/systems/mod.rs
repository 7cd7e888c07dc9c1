mod collision;
mod ground;
pub mod intent;
mod physics;
mod raycast;
mod states;
mod step;
mod vehicle_entry;

pub use collision::resolve_contacts;
pub use ground::GroundSensor;
pub use intent::{MotionIntent, MotionProfile, Steering};
pub use physics::{integrate_bodies, snapshot_pre_contact_velocities, snapshot_previous_positions};
pub use raycast::{raycast_closest, RaycastHit};
pub use states::{evaluate, JumpLaunch, StateCtx, StateTuning, VehicleSignals};
pub use vehicle_entry::find_seat;
