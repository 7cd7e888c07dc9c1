//! The playable character: a rotation-locked capsule body plus the state that
//! steers it.
//!
//! Per tick the simulation calls, in order: [`Character::resolve_intent`], the
//! physics step (which drives the [`PhysicsStepParticipant`] impl in
//! `systems::step`), then [`Character::update_state`].

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::components::{
    yaw_of, CharacterFsm, CharacterId, CharacterState, Collider, CollisionFilter, CollisionGroup,
    GroundContact, GroundImpactData, MotionState, VehicleEntryInstance, VelocityMode,
};
use crate::config::CharacterConfig;
use crate::engine::input::{Action, ActionSet};
use crate::error::{PhysicsError, SimulationError};
use crate::fsm::StateMachine;
use crate::physics::{BodyDesc, BodyHandle, PhysicsWorld};
use crate::spring::{Angle, AngleSpringSimulator, VectorSpringSimulator};
use crate::systems::{evaluate, find_seat, intent, GroundSensor, JumpLaunch, StateCtx, VehicleSignals};
use crate::vehicle::{SeatKind, Vehicle, VehicleId};

/// Where a new character appears and which way it faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterDesc {
    /// Capsule center.
    pub position: Vec3,
    /// Horizontal facing; falls back to +Z when degenerate.
    pub orientation: Vec3,
}

/// Who should receive input after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlHandoff {
    /// The character took the driver seat.
    ToVehicle { character: CharacterId, vehicle: VehicleId },
    /// The character left the driver seat.
    ToCharacter { character: CharacterId, vehicle: VehicleId },
}

pub struct Character {
    pub(crate) id: CharacterId,
    pub(crate) config: CharacterConfig,
    pub(crate) body: BodyHandle,
    pub(crate) sensor: GroundSensor,
    /// Logical input routed to this character.
    pub actions: ActionSet,
    pub(crate) fsm: CharacterFsm,
    pub(crate) motion: MotionState,
    pub(crate) ground: GroundContact,
    pub(crate) impact: GroundImpactData,
    pub(crate) velocity_spring: VectorSpringSimulator,
    pub(crate) rotation_spring: AngleSpringSimulator,
    pub(crate) mode: VelocityMode,
    pub(crate) influence: Vec3,
    pub(crate) view_vector: Vec3,
    pub(crate) pending_jump: Option<JumpLaunch>,
    /// Set by a pre-step that launched; keeps the post-step from snapping back down.
    pub(crate) jumped_this_step: bool,
    entry_cancel_requested: bool,
}

impl Character {
    /// Build a character and its body. The config is validated before anything
    /// touches the physics world, so a bad config never leaves a body behind.
    pub fn new(
        id: CharacterId,
        desc: CharacterDesc,
        config: CharacterConfig,
        physics: &mut PhysicsWorld,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let sensor = GroundSensor::new(&config.ground)?;
        let velocity_spring = VectorSpringSimulator::from_params(config.springs.velocity)?;
        let mut rotation_spring = AngleSpringSimulator::from_params(config.springs.rotation)?;

        let motion = MotionState::facing(desc.orientation);
        let yaw = Angle(yaw_of(motion.orientation));
        rotation_spring.reset(yaw, Angle(0.0));
        rotation_spring.set_target(yaw);

        let capsule = config.capsule;
        let body = physics.create_body(
            BodyDesc::dynamic(
                Collider::Capsule {
                    radius: capsule.radius,
                    height: capsule.height,
                },
                desc.position,
            )
            .with_filter(CollisionFilter::new(
                CollisionGroup::Characters,
                CollisionGroup::mask(&[CollisionGroup::Default, CollisionGroup::TrimeshColliders]),
            ))
            .with_material(0.0, 0.0)
            .with_mass(capsule.mass)
            .rotation_locked(),
        );
        physics.register_participant(body)?;

        let ground = sensor.probe(physics, body)?;
        let initial = if ground.has_hit {
            CharacterState::Idle
        } else {
            CharacterState::Falling
        };
        info!(character = %id, position = ?desc.position, state = initial.label(), "character spawned");

        let mut character = Self {
            id,
            config,
            body,
            sensor,
            actions: ActionSet::new(),
            fsm: StateMachine::new(initial),
            motion,
            ground,
            impact: GroundImpactData {
                peak_height: desc.position.y,
                ..GroundImpactData::default()
            },
            velocity_spring,
            rotation_spring,
            mode: VelocityMode::Replace,
            influence: Vec3::new(1.0, 0.0, 1.0),
            view_vector: Vec3::Z,
            pending_jump: None,
            jumped_this_step: false,
            entry_cancel_requested: false,
        };
        character.apply_tuning()?;
        Ok(character)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[inline]
    pub fn id(&self) -> CharacterId {
        self.id
    }

    #[inline]
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    #[inline]
    pub fn state(&self) -> &CharacterState {
        self.fsm.state()
    }

    #[inline]
    pub fn fsm(&self) -> &CharacterFsm {
        &self.fsm
    }

    #[inline]
    pub fn motion(&self) -> &MotionState {
        &self.motion
    }

    #[inline]
    pub fn ground(&self) -> &GroundContact {
        &self.ground
    }

    #[inline]
    pub fn impact(&self) -> &GroundImpactData {
        &self.impact
    }

    #[inline]
    pub fn config(&self) -> &CharacterConfig {
        &self.config
    }

    #[inline]
    pub fn velocity_mode(&self) -> VelocityMode {
        self.mode
    }

    /// Clip name for the animation layer.
    pub fn animation(&self) -> &'static str {
        self.fsm.state().animation()
    }

    /// Camera forward vector used for camera-relative movement.
    pub fn set_view_vector(&mut self, view: Vec3) {
        self.view_vector = view;
    }

    /// Render position between the last two physics steps.
    pub fn interpolated_position(&self, physics: &PhysicsWorld, alpha: f32) -> Result<Vec3, PhysicsError> {
        let previous = physics.previous_position(self.body)?;
        let current = physics.position(self.body)?;
        Ok(previous.lerp(current, alpha.clamp(0.0, 1.0)))
    }

    /// Abort an in-progress vehicle entry at the next state update.
    pub fn cancel_vehicle_entry(&mut self) {
        if matches!(self.fsm.state(), CharacterState::EnteringVehicle { .. }) {
            self.entry_cancel_requested = true;
        }
    }

    // -----------------------------------------------------------------------
    // Per-tick
    // -----------------------------------------------------------------------

    /// Turn this tick's input into velocity and facing targets.
    pub fn resolve_intent(&mut self) {
        let loco = &self.config.locomotion;
        let profile = self.fsm.state().motion_profile(loco);
        let intent = intent::resolve(
            &self.actions,
            self.view_vector,
            self.motion.orientation,
            self.motion.orientation_target,
            profile,
            loco.move_speed,
        );
        self.motion.velocity_target = intent.velocity_target;
        self.motion.orientation_target = intent.orientation_target;
    }

    /// Advance timers, move along any vehicle path and take at most one
    /// transition. Runs after the physics step.
    pub fn update_state(
        &mut self,
        dt: f32,
        physics: &mut PhysicsWorld,
        vehicles: &mut [Vehicle],
    ) -> Result<Option<ControlHandoff>, SimulationError> {
        self.fsm.tick(dt);

        if let Some(launch) = self.fsm.state_mut().tick_timers(dt, &self.config.locomotion) {
            debug!(character = %self.id, running = launch.running, "jump launched");
            self.pending_jump = Some(launch);
            self.apply_tuning()?;
        }

        let body = self.body;
        match self.fsm.state_mut() {
            CharacterState::EnteringVehicle { entry: path } | CharacterState::ExitingVehicle { exit: path } => {
                let position = path.advance(dt);
                physics.place(body, position)?;
            }
            _ => {}
        }

        let signals = self.vehicle_signals(physics, vehicles)?;
        self.entry_cancel_requested = false;
        let velocity = physics.velocity(self.body)?;
        let next = {
            let ctx = StateCtx {
                actions: &self.actions,
                ground: &self.ground,
                velocity,
                impact: &self.impact,
                config: &self.config.locomotion,
                signals: &signals,
            };
            evaluate(self.fsm.state(), &ctx)
        };

        let handoff = match next {
            Some(next) => self.transition(next, physics, vehicles)?,
            None => None,
        };

        debug_assert!(
            self.ground.has_hit || self.state().is_airborne_compatible() || self.state().is_vehicle_state(),
            "{} is {} without ground contact",
            self.id,
            self.state().label()
        );
        Ok(handoff)
    }

    /// Collect the vehicle facts the transition rules need this tick.
    fn vehicle_signals(&self, physics: &PhysicsWorld, vehicles: &[Vehicle]) -> Result<VehicleSignals, SimulationError> {
        let mut signals = VehicleSignals {
            cancel_requested: self.entry_cancel_requested,
            ..VehicleSignals::default()
        };
        let find = |id: VehicleId| vehicles.iter().find(|v| v.id() == id);

        match self.fsm.state() {
            CharacterState::EnteringVehicle { entry } => match find(entry.vehicle) {
                None => signals.vehicle_lost = true,
                Some(vehicle) => {
                    signals.seat_taken = match vehicle.seat(entry.seat) {
                        Ok(seat) => seat.occupant.is_some_and(|c| c != self.id),
                        Err(_) => true,
                    };
                }
            },

            CharacterState::Driving { vehicle, seat } | CharacterState::Seated { vehicle, seat } => {
                let Some(vehicle) = find(*vehicle) else {
                    signals.vehicle_lost = true;
                    return Ok(signals);
                };
                // The driver's input goes through the vehicle; a passenger keeps its own.
                let (exit, switch) = if matches!(self.fsm.state(), CharacterState::Driving { .. }) {
                    (vehicle.controls.exit_requested, vehicle.controls.seat_switch_requested)
                } else {
                    (
                        self.actions.just_pressed(Action::Enter),
                        self.actions.just_pressed(Action::SeatSwitch),
                    )
                };
                if exit {
                    signals.exit = Some(VehicleEntryInstance::exit(
                        vehicle,
                        *seat,
                        self.config.vehicle.exit_duration,
                    )?);
                } else if switch {
                    signals.switch_to = vehicle
                        .seat(*seat)?
                        .connected_seat
                        .and_then(|target| vehicle.seat(target).ok().map(|s| (target, s)))
                        .filter(|(_, s)| s.is_free())
                        .map(|(target, s)| (target, s.kind));
                }
            }

            CharacterState::ExitingVehicle { exit } => {
                signals.vehicle_lost = find(exit.vehicle).is_none();
            }

            state if state.is_grounded_locomotion() => {
                let kind = if self.actions.just_pressed(Action::Enter) {
                    Some(SeatKind::Driver)
                } else if self.actions.just_pressed(Action::EnterPassenger) {
                    Some(SeatKind::Passenger)
                } else {
                    None
                };
                if let Some(kind) = kind {
                    let position = physics.position(self.body)?;
                    let reach = self.config.vehicle.max_entry_distance;
                    match find_seat(vehicles, position, kind, reach).and_then(|(id, seat)| find(id).map(|v| (v, seat))) {
                        Some((vehicle, seat)) => {
                            signals.entry_candidate = Some(VehicleEntryInstance::enter(
                                vehicle,
                                seat,
                                position,
                                self.config.vehicle.entry_duration,
                                self.motion.velocity,
                            )?);
                        }
                        None => debug!(character = %self.id, ?kind, "no free seat within reach"),
                    }
                }
            }

            _ => {}
        }
        Ok(signals)
    }

    /// Apply the side effects of leaving `from` for `next`, then switch.
    fn transition(
        &mut self,
        next: CharacterState,
        physics: &mut PhysicsWorld,
        vehicles: &mut [Vehicle],
    ) -> Result<Option<ControlHandoff>, SimulationError> {
        let from = self.fsm.state().clone();
        let requested = next.clone();
        let mut next = next;
        let mut handoff = None;

        match (&from, &requested) {
            (_, CharacterState::EnteringVehicle { entry }) if !from.is_vehicle_state() => {
                info!(character = %self.id, vehicle = %entry.vehicle, seat = entry.seat, "entering vehicle");
                physics.set_enabled(self.body, false)?;
                physics.set_velocity(self.body, Vec3::ZERO)?;
                self.pending_jump = None;
                self.motion.velocity_target = Vec3::ZERO;
                self.velocity_spring.set_target(Vec3::ZERO);
                self.velocity_spring.reset(Vec3::ZERO, Vec3::ZERO);
            }

            (CharacterState::EnteringVehicle { entry }, CharacterState::Driving { vehicle, seat } | CharacterState::Seated { vehicle, seat }) => {
                let target = vehicle_mut(vehicles, *vehicle)?;
                match target.occupy(*seat, self.id) {
                    Ok(()) => {
                        physics.place(self.body, target.seat_anchor(*seat)?)?;
                        if matches!(next, CharacterState::Driving { .. }) {
                            handoff = Some(ControlHandoff::ToVehicle { character: self.id, vehicle: *vehicle });
                        }
                    }
                    Err(err) => {
                        warn!(character = %self.id, %err, "seat occupancy rejected");
                        next = self.cancel_entry(entry, physics)?;
                    }
                }
            }

            (CharacterState::EnteringVehicle { entry }, _) => {
                warn!(
                    character = %self.id,
                    vehicle = %entry.vehicle,
                    progress = entry.progress(),
                    "vehicle entry cancelled"
                );
                next = self.cancel_entry(entry, physics)?;
            }

            (
                CharacterState::Driving { vehicle, seat: old } | CharacterState::Seated { vehicle, seat: old },
                CharacterState::Driving { seat: new, .. } | CharacterState::Seated { seat: new, .. },
            ) => {
                let target = vehicle_mut(vehicles, *vehicle)?;
                target.vacate(*old, self.id)?;
                target.occupy(*new, self.id)?;
                physics.place(self.body, target.seat_anchor(*new)?)?;
                let (character, vehicle) = (self.id, *vehicle);
                handoff = match (&from, &next) {
                    (CharacterState::Seated { .. }, CharacterState::Driving { .. }) => {
                        Some(ControlHandoff::ToVehicle { character, vehicle })
                    }
                    (CharacterState::Driving { .. }, CharacterState::Seated { .. }) => {
                        Some(ControlHandoff::ToCharacter { character, vehicle })
                    }
                    _ => None,
                };
            }

            (CharacterState::Driving { .. } | CharacterState::Seated { .. }, CharacterState::ExitingVehicle { exit }) => {
                info!(character = %self.id, vehicle = %exit.vehicle, seat = exit.seat, "exiting vehicle");
            }

            // Vehicle vanished under a seated character.
            (CharacterState::Driving { vehicle, .. } | CharacterState::Seated { vehicle, .. }, _) => {
                warn!(character = %self.id, %vehicle, "vehicle removed while seated");
                if matches!(from, CharacterState::Driving { .. }) {
                    handoff = Some(ControlHandoff::ToCharacter { character: self.id, vehicle: *vehicle });
                }
                next = self.settle(physics)?;
            }

            (CharacterState::ExitingVehicle { exit }, _) => {
                if exit.holds_seat {
                    if let Ok(vehicle) = vehicle_mut(vehicles, exit.vehicle) {
                        vehicle.vacate(exit.seat, self.id)?;
                    }
                    if exit.seat_kind == SeatKind::Driver {
                        handoff = Some(ControlHandoff::ToCharacter { character: self.id, vehicle: exit.vehicle });
                    }
                } else {
                    self.restore_pre_entry_motion(exit.pre_entry_velocity);
                }
                physics.set_velocity(self.body, exit.pre_entry_velocity)?;
                next = self.settle(physics)?;
            }

            _ => {}
        }

        debug!(character = %self.id, from = from.label(), to = next.label(), "state transition");
        self.fsm.force_go(next);
        self.apply_tuning()?;
        Ok(handoff)
    }

    /// Put the body back into the simulation where it stands and pick Idle or
    /// Falling from a fresh probe.
    fn settle(&mut self, physics: &mut PhysicsWorld) -> Result<CharacterState, PhysicsError> {
        physics.set_enabled(self.body, true)?;
        self.ground = self.sensor.probe(physics, self.body)?;
        self.impact = GroundImpactData {
            peak_height: physics.position(self.body)?.y,
            ..GroundImpactData::default()
        };
        Ok(if self.ground.has_hit {
            CharacterState::Idle
        } else {
            CharacterState::Falling
        })
    }

    /// Leave an interrupted entry. Short of the door the character drops out
    /// where it stands. Past the door the capsule would overlap the vehicle, so
    /// it backs out to the door first with the body still disabled.
    /// Either way the springs restart from the velocity held before the entry.
    fn cancel_entry(
        &mut self,
        entry: &VehicleEntryInstance,
        physics: &mut PhysicsWorld,
    ) -> Result<CharacterState, PhysicsError> {
        self.restore_pre_entry_motion(entry.pre_entry_velocity);
        if entry.is_past_door() {
            return Ok(CharacterState::ExitingVehicle { exit: entry.retreat() });
        }
        physics.set_velocity(self.body, entry.pre_entry_velocity)?;
        self.settle(physics)
    }

    fn restore_pre_entry_motion(&mut self, velocity: Vec3) {
        self.velocity_spring.set_target(velocity);
        self.velocity_spring.reset(velocity, Vec3::ZERO);
        self.motion.velocity = velocity;
        self.motion.velocity_target = velocity;
    }

    fn apply_tuning(&mut self) -> Result<(), SimulationError> {
        let tuning = self.fsm.state().tuning(&self.config);
        self.velocity_spring.retune(tuning.velocity.mass, tuning.velocity.damping)?;
        self.rotation_spring.retune(tuning.rotation.mass, tuning.rotation.damping)?;
        self.mode = tuning.mode;
        self.influence = tuning.influence;
        Ok(())
    }

    /// Take the body out of the world and give up any seat.
    pub fn remove(self, physics: &mut PhysicsWorld, vehicles: &mut [Vehicle]) -> Result<(), SimulationError> {
        let seat = match self.fsm.state() {
            CharacterState::Driving { vehicle, seat } | CharacterState::Seated { vehicle, seat } => Some((*vehicle, *seat)),
            CharacterState::ExitingVehicle { exit } if exit.holds_seat => Some((exit.vehicle, exit.seat)),
            _ => None,
        };
        if let Some((vehicle, seat)) = seat {
            if let Ok(vehicle) = vehicle_mut(vehicles, vehicle) {
                vehicle.vacate(seat, self.id)?;
            }
        }
        physics.unregister_participant(self.body);
        physics.remove_body(self.body)?;
        info!(character = %self.id, "character removed");
        Ok(())
    }
}

fn vehicle_mut(vehicles: &mut [Vehicle], id: VehicleId) -> Result<&mut Vehicle, SimulationError> {
    vehicles
        .iter_mut()
        .find(|v| v.id() == id)
        .ok_or(SimulationError::UnknownVehicle(id.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::error::ConfigError;

    fn flat_world() -> PhysicsWorld {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        physics.create_body(
            BodyDesc::fixed(Collider::Plane { normal: Vec3::Y, offset: 0.0 }, Vec3::ZERO).with_material(0.0, 0.5),
        );
        physics
    }

    fn desc(y: f32) -> CharacterDesc {
        CharacterDesc {
            position: Vec3::new(0.0, y, 0.0),
            orientation: Vec3::Z,
        }
    }

    #[test]
    fn bad_config_creates_no_body() {
        let mut physics = flat_world();
        let mut config = CharacterConfig::default();
        config.springs.velocity.mass = 0.0;

        let result = Character::new(CharacterId(1), desc(0.57), config, &mut physics);

        assert!(matches!(
            result,
            Err(SimulationError::Config(ConfigError::SpringMass(_)))
        ));
        // Only the ground plane exists.
        let hit = physics.ray_cast_closest(
            Vec3::new(0.0, 0.57, 0.0),
            Vec3::NEG_Y,
            1.0,
            crate::physics::RayFilter { mask: u32::MAX, exclude: None },
        );
        assert!(hit.is_some_and(|h| h.distance > 0.5));
    }

    #[test]
    fn initial_state_follows_first_probe() {
        let mut physics = flat_world();
        let standing = Character::new(CharacterId(1), desc(0.57), CharacterConfig::default(), &mut physics).unwrap();
        let floating = Character::new(CharacterId(2), desc(3.0), CharacterConfig::default(), &mut physics).unwrap();

        assert_eq!(standing.state(), &CharacterState::Idle);
        assert!(standing.ground().has_hit);
        assert_eq!(floating.state(), &CharacterState::Falling);
        assert_eq!(floating.velocity_mode(), VelocityMode::Additive);
        assert!(physics.is_rotation_locked(standing.body()).unwrap());
        assert!(physics.is_participant(floating.body()));
    }

    #[test]
    fn orientation_target_survives_releasing_input() {
        let mut physics = flat_world();
        let mut character = Character::new(CharacterId(1), desc(0.57), CharacterConfig::default(), &mut physics).unwrap();
        character.fsm.force_go(CharacterState::Walk);
        character.set_view_vector(Vec3::X);
        character.actions.trigger(Action::Up, true);

        character.resolve_intent();
        assert!((character.motion().orientation_target - Vec3::X).length() < 1e-6);

        character.actions.trigger(Action::Up, false);
        character.resolve_intent();
        assert!((character.motion().orientation_target - Vec3::X).length() < 1e-6);
        assert_eq!(character.motion().velocity_target, Vec3::ZERO);
    }

    #[test]
    fn remove_releases_body() {
        let mut physics = flat_world();
        let character = Character::new(CharacterId(1), desc(0.57), CharacterConfig::default(), &mut physics).unwrap();
        let body = character.body();

        character.remove(&mut physics, &mut []).unwrap();

        assert!(!physics.contains(body));
        assert!(!physics.is_participant(body));
    }
}
