//! Simulation driver: owns the physics world, characters, vehicles and the
//! camera, routes input to one receiver, and runs ticks in a fixed order.

use glam::Vec2;
use tracing::{debug, info};

use crate::camera::Camera;
use crate::character::{Character, CharacterDesc, ControlHandoff};
use crate::components::CharacterId;
use crate::config::{CharacterConfig, PhysicsConfig};
use crate::engine::input::{ActionSet, InputEvent};
use crate::engine::time::FixedTimestep;
use crate::error::SimulationError;
use crate::physics::{BodyDesc, BodyHandle, PhysicsWorld};
use crate::scene::{CharacterAssembly, SpawnPoint};
use crate::vehicle::{SeatKind, Vehicle, VehicleDesc, VehicleId};

/// Who currently gets routed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputReceiver {
    Character(CharacterId),
    Vehicle(VehicleId),
}

pub struct Simulation {
    physics: PhysicsWorld,
    characters: Vec<Character>,
    vehicles: Vec<Vehicle>,
    camera: Camera,
    receiver: Option<InputReceiver>,
    timestep: FixedTimestep,
    /// Pointer motion accumulated since the last tick.
    pointer: Vec2,
    next_character: u32,
    next_vehicle: u32,
    character_config: CharacterConfig,
}

impl Simulation {
    pub fn new(config: PhysicsConfig) -> Result<Self, SimulationError> {
        let physics = PhysicsWorld::new(config)?;
        let timestep = FixedTimestep::new(physics.fixed_dt());
        Ok(Self {
            physics,
            characters: Vec::new(),
            vehicles: Vec::new(),
            camera: Camera::new(),
            receiver: None,
            timestep,
            pointer: Vec2::ZERO,
            next_character: 1,
            next_vehicle: 1,
            character_config: CharacterConfig::default(),
        })
    }

    /// Config used by [`spawn_character`](Self::spawn_character).
    pub fn with_character_config(mut self, config: CharacterConfig) -> Self {
        self.character_config = config;
        self
    }

    // -----------------------------------------------------------------------
    // World bookkeeping
    // -----------------------------------------------------------------------

    pub fn add_static(&mut self, desc: BodyDesc) -> BodyHandle {
        self.physics.create_body(desc)
    }

    /// Build a character at `spawn`. An assembly is normalized first and its
    /// capsule height hint overrides the configured height.
    pub fn spawn_character(
        &mut self,
        spawn: &SpawnPoint,
        assembly: Option<&mut CharacterAssembly>,
    ) -> Result<CharacterId, SimulationError> {
        let mut config = self.character_config;
        if let Some(assembly) = assembly {
            assembly.normalize();
            if let Some(height) = assembly.capsule_height_hint {
                config = config.with_capsule_height(height);
            }
        }

        let id = CharacterId(self.next_character);
        let desc = CharacterDesc {
            position: spawn.position,
            orientation: spawn.forward,
        };
        let character = Character::new(id, desc, config, &mut self.physics)?;
        self.next_character += 1;
        self.add(character);

        if spawn.take_control {
            self.take_control(InputReceiver::Character(id))?;
            self.camera = Camera::looking_along(spawn.forward);
        }
        Ok(id)
    }

    /// Join an already built character. Order of the collection carries no meaning.
    pub fn add(&mut self, character: Character) {
        self.next_character = self.next_character.max(character.id().0 + 1);
        self.characters.push(character);
    }

    pub fn remove(&mut self, id: CharacterId) -> Result<(), SimulationError> {
        let index = self
            .characters
            .iter()
            .position(|c| c.id() == id)
            .ok_or(SimulationError::UnknownCharacter(id.0))?;
        let character = self.characters.swap_remove(index);
        character.remove(&mut self.physics, &mut self.vehicles)?;
        if self.receiver == Some(InputReceiver::Character(id)) {
            self.receiver = None;
        }
        Ok(())
    }

    pub fn add_vehicle(&mut self, desc: VehicleDesc) -> Result<VehicleId, SimulationError> {
        let id = VehicleId(self.next_vehicle);
        let vehicle = Vehicle::new(id, desc, &mut self.physics)?;
        self.next_vehicle += 1;
        info!(vehicle = %id, seats = vehicle.seats().len(), "vehicle added");
        self.vehicles.push(vehicle);
        Ok(id)
    }

    /// Remove a vehicle. Occupants notice on their next state update; input
    /// goes straight back to the driver, if any.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> Result<(), SimulationError> {
        let index = self
            .vehicles
            .iter()
            .position(|v| v.id() == id)
            .ok_or(SimulationError::UnknownVehicle(id.0))?;
        let vehicle = self.vehicles.swap_remove(index);
        self.physics.remove_body(vehicle.body())?;

        if self.receiver == Some(InputReceiver::Vehicle(id)) {
            let driver = vehicle
                .seats()
                .iter()
                .find(|s| s.kind == SeatKind::Driver)
                .and_then(|s| s.occupant);
            self.receiver = driver.map(InputReceiver::Character);
        }
        info!(vehicle = %id, "vehicle removed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Route future input to `receiver`. The previous receiver has everything released.
    pub fn take_control(&mut self, receiver: InputReceiver) -> Result<(), SimulationError> {
        match receiver {
            InputReceiver::Character(id) if self.character(id).is_none() => {
                return Err(SimulationError::UnknownCharacter(id.0));
            }
            InputReceiver::Vehicle(id) if self.vehicle(id).is_none() => {
                return Err(SimulationError::UnknownVehicle(id.0));
            }
            _ => {}
        }
        if self.receiver == Some(receiver) {
            return Ok(());
        }
        if let Some(actions) = self.receiver_actions() {
            actions.release_all();
        }
        debug!(from = ?self.receiver, to = ?receiver, "input receiver changed");
        self.receiver = Some(receiver);
        Ok(())
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerDelta { dx, dy } => self.pointer += Vec2::new(dx, dy),
            InputEvent::Key { code, pressed } => {
                if let Some(actions) = self.receiver_actions() {
                    actions.trigger_code(&code, pressed);
                }
            }
            InputEvent::Action { action, pressed } => {
                if let Some(actions) = self.receiver_actions() {
                    actions.trigger(action, pressed);
                }
            }
        }
    }

    fn receiver_actions(&mut self) -> Option<&mut ActionSet> {
        match self.receiver? {
            InputReceiver::Character(id) => self.character_mut(id).map(|c| &mut c.actions),
            InputReceiver::Vehicle(id) => self.vehicles.iter_mut().find(|v| v.id() == id).map(|v| &mut v.actions),
        }
    }

    fn apply_handoff(&mut self, handoff: ControlHandoff) -> Result<(), SimulationError> {
        match handoff {
            ControlHandoff::ToVehicle { character, vehicle } => {
                if self.receiver == Some(InputReceiver::Character(character)) {
                    self.take_control(InputReceiver::Vehicle(vehicle))?;
                }
            }
            ControlHandoff::ToCharacter { character, vehicle } => {
                if self.receiver == Some(InputReceiver::Vehicle(vehicle)) {
                    self.take_control(InputReceiver::Character(character))?;
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// One fixed tick: input and intent, vehicle controls, physics (with the
    /// characters' pre/post steps), then state transitions.
    pub fn tick(&mut self) -> Result<(), SimulationError> {
        let dt = self.physics.fixed_dt();

        let pointer = std::mem::take(&mut self.pointer);
        self.camera.look(pointer.x, pointer.y);
        let view = self.camera.front();
        for character in &mut self.characters {
            if self.receiver == Some(InputReceiver::Character(character.id())) {
                character.set_view_vector(view);
            }
            character.resolve_intent();
        }
        for vehicle in &mut self.vehicles {
            vehicle.update_controls(dt);
        }

        self.physics.step(&mut self.characters)?;

        let mut handoffs = Vec::new();
        for character in &mut self.characters {
            if let Some(handoff) = character.update_state(dt, &mut self.physics, &mut self.vehicles)? {
                handoffs.push(handoff);
            }
        }
        for handoff in handoffs {
            self.apply_handoff(handoff)?;
        }

        for character in &mut self.characters {
            character.actions.end_tick();
        }
        for vehicle in &mut self.vehicles {
            vehicle.actions.end_tick();
        }
        Ok(())
    }

    /// Feed one render frame's elapsed time and run however many fixed ticks it
    /// covers. Returns the interpolation alpha for rendering.
    pub fn advance(&mut self, frame_dt: f32) -> Result<f32, SimulationError> {
        self.timestep.accumulate(frame_dt);
        while self.timestep.consume() {
            self.tick()?;
        }
        Ok(self.timestep.alpha())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    #[inline]
    pub fn receiver(&self) -> Option<InputReceiver> {
        self.receiver
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| c.id() == id)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id() == id)
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::components::{CharacterState, Collider};
    use crate::engine::input::Action;

    fn flat() -> Simulation {
        let mut sim = Simulation::new(PhysicsConfig::default()).unwrap();
        sim.add_static(
            BodyDesc::fixed(Collider::Plane { normal: Vec3::Y, offset: 0.0 }, Vec3::ZERO).with_material(0.0, 0.5),
        );
        sim
    }

    #[test]
    fn input_only_reaches_the_receiver() {
        let mut sim = flat();
        let a = sim
            .spawn_character(&SpawnPoint::new(Vec3::new(0.0, 0.57, 0.0), Vec3::Z).controlled(), None)
            .unwrap();
        let b = sim
            .spawn_character(&SpawnPoint::new(Vec3::new(3.0, 0.57, 0.0), Vec3::Z), None)
            .unwrap();

        sim.handle_input(InputEvent::Key { code: "KeyW".into(), pressed: true });
        sim.tick().unwrap();

        assert_eq!(sim.character(a).unwrap().state(), &CharacterState::Walk);
        assert_eq!(sim.character(b).unwrap().state(), &CharacterState::Idle);
    }

    #[test]
    fn switching_receiver_releases_held_keys() {
        let mut sim = flat();
        let a = sim
            .spawn_character(&SpawnPoint::new(Vec3::new(0.0, 0.57, 0.0), Vec3::Z).controlled(), None)
            .unwrap();
        let b = sim
            .spawn_character(&SpawnPoint::new(Vec3::new(3.0, 0.57, 0.0), Vec3::Z), None)
            .unwrap();
        sim.handle_input(InputEvent::Action { action: Action::Up, pressed: true });

        sim.take_control(InputReceiver::Character(b)).unwrap();

        assert!(!sim.character(a).unwrap().actions.is_pressed(Action::Up));
        assert_eq!(sim.receiver(), Some(InputReceiver::Character(b)));
        assert!(matches!(
            sim.take_control(InputReceiver::Vehicle(VehicleId(42))),
            Err(SimulationError::UnknownVehicle(42))
        ));
    }

    #[test]
    fn assembly_hint_sets_capsule_height() {
        use crate::scene::SceneNode;

        let mut sim = flat();
        let mut assembly = CharacterAssembly {
            root: SceneNode::group("hero", vec![SceneNode::mesh("body", "cloth")]),
            composite: false,
            capsule_height_hint: Some(0.45),
        };

        let id = sim
            .spawn_character(&SpawnPoint::new(Vec3::new(0.0, 2.0, 0.0), Vec3::Z), Some(&mut assembly))
            .unwrap();

        assert_eq!(sim.character(id).unwrap().config().capsule.height, 0.45);
        assert!(assembly.root.children[0].cast_shadow);
    }

    #[test]
    fn tall_hint_still_stands_and_walks() {
        use crate::scene::SceneNode;

        let mut sim = flat();
        let mut assembly = CharacterAssembly {
            root: SceneNode::group("giant", vec![SceneNode::mesh("body", "cloth")]),
            composite: false,
            capsule_height_hint: Some(1.0),
        };
        let id = sim
            .spawn_character(
                &SpawnPoint::new(Vec3::new(0.0, 0.82, 0.0), Vec3::Z).controlled(),
                Some(&mut assembly),
            )
            .unwrap();
        let config = *sim.character(id).unwrap().config();
        assert!(config.ground.ray_cast_length >= config.capsule.bottom_offset());

        for _ in 0..10 {
            sim.tick().unwrap();
        }
        let character = sim.character(id).unwrap();
        assert_eq!(character.state(), &CharacterState::Idle);
        assert!(character.ground().has_hit);

        sim.handle_input(InputEvent::Action { action: Action::Up, pressed: true });
        sim.tick().unwrap();
        assert_eq!(sim.character(id).unwrap().state(), &CharacterState::Walk);
    }

    #[test]
    fn remove_by_identity() {
        let mut sim = flat();
        let id = sim
            .spawn_character(&SpawnPoint::new(Vec3::new(0.0, 0.57, 0.0), Vec3::Z).controlled(), None)
            .unwrap();

        sim.remove(id).unwrap();

        assert!(sim.character(id).is_none());
        assert_eq!(sim.receiver(), None);
        assert!(matches!(sim.remove(id), Err(SimulationError::UnknownCharacter(_))));
    }

    #[test]
    fn advance_runs_whole_ticks() {
        let mut sim = flat();
        sim.spawn_character(&SpawnPoint::new(Vec3::new(0.0, 0.57, 0.0), Vec3::Z), None)
            .unwrap();

        let alpha = sim.advance(1.5 / 60.0).unwrap();

        assert!((alpha - 0.5).abs() < 1e-3);
    }
}
