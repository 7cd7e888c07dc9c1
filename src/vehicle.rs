//! Vehicles at the boundary of the character core.
//!
//! A vehicle here is a static box with seats and a driver-control surface.
//! Driving physics are not simulated; only seat occupancy and control hand-off.

use glam::{Quat, Vec3};

use crate::components::{CharacterId, Collider};
use crate::engine::input::{Action, ActionSet};
use crate::error::{ConfigError, SeatError};
use crate::physics::{BodyDesc, BodyHandle, PhysicsWorld};
use crate::spring::ScalarSpringSimulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub u32);

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vehicle#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeatKind {
    Driver,
    Passenger,
}

/// One seat. Points are in the vehicle's local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSeat {
    pub kind: SeatKind,
    /// Where a seated character sits.
    pub anchor: Vec3,
    /// Where a character stands to get in and is put back on exit.
    pub entry_point: Vec3,
    /// Seat reachable with `seat_switch` without leaving the vehicle.
    pub connected_seat: Option<usize>,
    pub occupant: Option<CharacterId>,
}

impl VehicleSeat {
    pub fn new(kind: SeatKind, anchor: Vec3, entry_point: Vec3) -> Self {
        Self {
            kind,
            anchor,
            entry_point,
            connected_seat: None,
            occupant: None,
        }
    }

    pub fn connected_to(mut self, seat: usize) -> Self {
        self.connected_seat = Some(seat);
        self
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

/// World placement of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl VehicleTransform {
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }
}

/// Driver-control surface, derived each tick from the vehicle's action set.
#[derive(Debug, Clone)]
pub struct VehicleControls {
    /// -1 (reverse) ..= 1 (forward).
    pub throttle: f32,
    /// Smoothed steering, -1 (right) ..= 1 (left).
    pub steering: f32,
    pub handbrake: bool,
    pub exit_requested: bool,
    pub seat_switch_requested: bool,
    steering_spring: ScalarSpringSimulator,
}

impl VehicleControls {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            throttle: 0.0,
            steering: 0.0,
            handbrake: false,
            exit_requested: false,
            seat_switch_requested: false,
            steering_spring: ScalarSpringSimulator::new(60.0, 10.0, 0.6)?,
        })
    }

    pub fn update(&mut self, actions: &ActionSet, dt: f32) {
        let axis = |pos: Action, neg: Action| {
            (actions.is_pressed(pos) as i32 - actions.is_pressed(neg) as i32) as f32
        };
        self.throttle = axis(Action::Up, Action::Down);
        self.steering_spring.set_target(axis(Action::Left, Action::Right));
        self.steering = self.steering_spring.simulate(dt).0;
        self.handbrake = actions.is_pressed(Action::Jump);
        self.exit_requested = actions.just_pressed(Action::Enter);
        self.seat_switch_requested = actions.just_pressed(Action::SeatSwitch);
    }
}

/// Construction parameters for a [`Vehicle`].
#[derive(Debug, Clone)]
pub struct VehicleDesc {
    pub position: Vec3,
    pub rotation: Quat,
    pub half_extents: Vec3,
    pub seats: Vec<VehicleSeat>,
}

pub struct Vehicle {
    id: VehicleId,
    transform: VehicleTransform,
    body: BodyHandle,
    seats: Vec<VehicleSeat>,
    pub actions: ActionSet,
    pub controls: VehicleControls,
}

impl Vehicle {
    pub fn new(id: VehicleId, desc: VehicleDesc, physics: &mut PhysicsWorld) -> Result<Self, ConfigError> {
        let controls = VehicleControls::new()?;
        let body = physics.create_body(
            BodyDesc::fixed(Collider::Box { half_extents: desc.half_extents }, desc.position)
                .with_rotation(desc.rotation),
        );
        Ok(Self {
            id,
            transform: VehicleTransform {
                position: desc.position,
                rotation: desc.rotation,
            },
            body,
            seats: desc.seats,
            actions: ActionSet::new(),
            controls,
        })
    }

    #[inline]
    pub fn id(&self) -> VehicleId {
        self.id
    }

    #[inline]
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    #[inline]
    pub fn transform(&self) -> &VehicleTransform {
        &self.transform
    }

    pub fn seats(&self) -> &[VehicleSeat] {
        &self.seats
    }

    pub fn seat(&self, index: usize) -> Result<&VehicleSeat, SeatError> {
        self.seats.get(index).ok_or(SeatError::NoSuchSeat(index))
    }

    /// World position of a seat's anchor.
    pub fn seat_anchor(&self, index: usize) -> Result<Vec3, SeatError> {
        Ok(self.transform.to_world(self.seat(index)?.anchor))
    }

    /// World position of a seat's entry point.
    pub fn entry_point(&self, index: usize) -> Result<Vec3, SeatError> {
        Ok(self.transform.to_world(self.seat(index)?.entry_point))
    }

    pub fn occupy(&mut self, index: usize, character: CharacterId) -> Result<(), SeatError> {
        let seat = self.seats.get_mut(index).ok_or(SeatError::NoSuchSeat(index))?;
        match seat.occupant {
            Some(current) if current != character => Err(SeatError::Occupied {
                seat: index,
                occupant: current.0,
            }),
            _ => {
                seat.occupant = Some(character);
                tracing::info!(vehicle = %self.id, seat = index, %character, "seat occupied");
                Ok(())
            }
        }
    }

    pub fn vacate(&mut self, index: usize, character: CharacterId) -> Result<(), SeatError> {
        let seat = self.seats.get_mut(index).ok_or(SeatError::NoSuchSeat(index))?;
        if seat.occupant != Some(character) {
            return Err(SeatError::NotOccupant {
                seat: index,
                character: character.0,
            });
        }
        seat.occupant = None;
        tracing::info!(vehicle = %self.id, seat = index, %character, "seat vacated");
        Ok(())
    }

    /// Nearest free seat of `kind` whose entry point lies within `max_distance` of `from`.
    pub fn nearest_free_seat(&self, from: Vec3, kind: SeatKind, max_distance: f32) -> Option<(usize, f32)> {
        self.seats
            .iter()
            .enumerate()
            .filter(|(_, seat)| seat.kind == kind && seat.is_free())
            .map(|(i, seat)| (i, self.transform.to_world(seat.entry_point).distance(from)))
            .filter(|(_, d)| *d <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn update_controls(&mut self, dt: f32) {
        self.controls.update(&self.actions, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;

    fn car(physics: &mut PhysicsWorld) -> Vehicle {
        let desc = VehicleDesc {
            position: Vec3::new(5.0, 0.75, 0.0),
            rotation: Quat::IDENTITY,
            half_extents: Vec3::new(1.0, 0.75, 2.0),
            seats: vec![
                VehicleSeat::new(SeatKind::Driver, Vec3::new(0.4, 0.2, 0.0), Vec3::new(1.6, -0.2, 0.0))
                    .connected_to(1),
                VehicleSeat::new(SeatKind::Passenger, Vec3::new(-0.4, 0.2, 0.0), Vec3::new(-1.6, -0.2, 0.0))
                    .connected_to(0),
            ],
        };
        Vehicle::new(VehicleId(1), desc, physics).unwrap()
    }

    #[test]
    fn occupied_seat_rejects_second_character() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        let mut vehicle = car(&mut physics);

        vehicle.occupy(0, CharacterId(1)).unwrap();

        assert_eq!(
            vehicle.occupy(0, CharacterId(2)),
            Err(SeatError::Occupied { seat: 0, occupant: 1 })
        );
        assert_eq!(vehicle.occupy(7, CharacterId(2)), Err(SeatError::NoSuchSeat(7)));
        assert_eq!(
            vehicle.vacate(0, CharacterId(2)),
            Err(SeatError::NotOccupant { seat: 0, character: 2 })
        );
        vehicle.vacate(0, CharacterId(1)).unwrap();
        assert!(vehicle.seat(0).unwrap().is_free());
    }

    #[test]
    fn nearest_free_seat_respects_kind_and_distance() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        let mut vehicle = car(&mut physics);
        let driver_door = vehicle.entry_point(0).unwrap();
        assert!((driver_door - Vec3::new(6.6, 0.55, 0.0)).length() < 1e-5);

        let near = driver_door + Vec3::new(0.5, 0.0, 0.0);
        assert_eq!(vehicle.nearest_free_seat(near, SeatKind::Driver, 2.5).map(|s| s.0), Some(0));
        assert_eq!(vehicle.nearest_free_seat(near, SeatKind::Driver, 0.1), None);

        vehicle.occupy(0, CharacterId(3)).unwrap();
        assert_eq!(vehicle.nearest_free_seat(near, SeatKind::Driver, 2.5), None);
    }

    #[test]
    fn controls_follow_actions() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        let mut vehicle = car(&mut physics);
        vehicle.actions.trigger(Action::Up, true);
        vehicle.actions.trigger(Action::Left, true);
        vehicle.actions.trigger(Action::Enter, true);

        vehicle.update_controls(1.0 / 30.0);

        assert_eq!(vehicle.controls.throttle, 1.0);
        assert!(vehicle.controls.steering > 0.0 && vehicle.controls.steering < 1.0);
        assert!(vehicle.controls.exit_requested);

        vehicle.actions.end_tick();
        vehicle.update_controls(1.0 / 30.0);
        assert!(!vehicle.controls.exit_requested);
    }
}
