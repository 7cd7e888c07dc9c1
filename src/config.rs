//! Tuning for characters and the physics world.
//!
//! Every value that shapes how a character moves lives here so it can be
//! tweaked from a RON file instead of being baked into the state logic.
//! Defaults follow a 1.0 m tall capsule walking on a 60 Hz simulation.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Capsule collider dimensions for the character body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleConfig {
    /// Hemisphere radius (meters).
    pub radius: f32,
    /// Length of the cylindrical segment between hemisphere centers (meters).
    pub height: f32,
    /// Body mass (kilograms).
    pub mass: f32,
}

impl Default for CapsuleConfig {
    fn default() -> Self {
        Self {
            radius: 0.25,
            height: 0.5,
            mass: 1.0,
        }
    }
}

impl CapsuleConfig {
    /// Distance from the capsule center to its lowest point.
    #[inline]
    pub fn bottom_offset(&self) -> f32 {
        self.height * 0.5 + self.radius
    }
}

/// Downward ground probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    /// Distance from the body center to the ground when standing.
    pub ray_cast_length: f32,
    /// Extra probe reach below the standing height.
    pub ray_safe_offset: f32,
    /// Whether triangle-mesh colliders count as ground.
    pub include_trimesh: bool,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            ray_cast_length: 0.57,
            ray_safe_offset: 0.03,
            include_trimesh: false,
        }
    }
}

/// Parameters for one spring simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringParams {
    /// Internal sub-step rate (Hz).
    pub frame_rate: f32,
    pub mass: f32,
    /// Velocity retained per sub-step, in (0, 1].
    pub damping: f32,
}

impl SpringParams {
    pub const fn new(frame_rate: f32, mass: f32, damping: f32) -> Self {
        Self {
            frame_rate,
            mass,
            damping,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(ConfigError::SpringFrameRate(self.frame_rate));
        }
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(ConfigError::SpringMass(self.mass));
        }
        if !(self.damping.is_finite() && self.damping > 0.0 && self.damping <= 1.0) {
            return Err(ConfigError::SpringDamping(self.damping));
        }
        Ok(())
    }
}

/// Mass and damping a state swaps into one spring. `None` keeps the base value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringOverride {
    pub mass: Option<f32>,
    pub damping: Option<f32>,
}

impl SpringOverride {
    pub const fn new(mass: Option<f32>, damping: Option<f32>) -> Self {
        Self { mass, damping }
    }

    pub fn apply(&self, base: SpringParams) -> SpringParams {
        SpringParams {
            mass: self.mass.unwrap_or(base.mass),
            damping: self.damping.unwrap_or(base.damping),
            ..base
        }
    }
}

/// Default simulators every state starts from, and the overrides individual
/// states apply on entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    pub velocity: SpringParams,
    pub rotation: SpringParams,
    /// Sprint reacts faster but turns slower and steadier.
    pub sprint_velocity: SpringOverride,
    pub sprint_rotation: SpringOverride,
    /// Facing while airborne.
    pub air_rotation: SpringOverride,
    /// Running jumps and falls keep their momentum.
    pub heavy_velocity: SpringOverride,
    pub roll_velocity: SpringOverride,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            velocity: SpringParams::new(60.0, 50.0, 0.8),
            rotation: SpringParams::new(60.0, 10.0, 0.5),
            sprint_velocity: SpringOverride::new(Some(10.0), None),
            sprint_rotation: SpringOverride::new(Some(50.0), Some(0.8)),
            air_rotation: SpringOverride::new(None, Some(0.3)),
            heavy_velocity: SpringOverride::new(Some(100.0), None),
            roll_velocity: SpringOverride::new(Some(1.0), Some(0.6)),
        }
    }
}

impl SpringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.velocity.validate()?;
        self.rotation.validate()?;
        for over in [self.sprint_velocity, self.heavy_velocity, self.roll_velocity] {
            over.apply(self.velocity).validate()?;
        }
        for over in [self.sprint_rotation, self.air_rotation] {
            over.apply(self.rotation).validate()?;
        }
        Ok(())
    }
}

/// Locomotion speeds, thresholds and timings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Base horizontal speed (m/s). State multipliers scale this.
    pub move_speed: f32,
    pub walk_multiplier: f32,
    pub run_multiplier: f32,
    pub sprint_multiplier: f32,
    /// Seconds `run` must stay held in Run before Sprint kicks in.
    pub sprint_delay: f32,
    /// Speed multiplier targeted while steering in the air.
    pub air_multiplier: f32,
    /// Per-axis arcade influence while airborne (additive mode).
    pub air_influence: Vec3,
    /// Impact speed (m/s, downward) above which a landing becomes a roll.
    pub drop_roll_threshold: f32,
    /// Horizontal speed above which a soft landing keeps walking.
    pub landing_walk_speed: f32,
    /// Seconds spent rolling before standing up.
    pub drop_roll_duration: f32,
    /// Forward speed multiplier while rolling.
    pub roll_multiplier: f32,
    /// Vertical launch speed (m/s).
    pub jump_speed: f32,
    /// Minimum forward launch speed for a running jump (m/s).
    pub run_jump_speed: f32,
    /// Wind-up before a standing jump leaves the ground.
    pub jump_idle_delay: f32,
    /// Wind-up before a running jump leaves the ground.
    pub jump_running_delay: f32,
    /// Time after launch before ground contact can end a jump.
    pub jump_min_air_time: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 4.0,
            walk_multiplier: 1.0,
            run_multiplier: 1.4,
            sprint_multiplier: 1.8,
            sprint_delay: 1.0,
            air_multiplier: 0.8,
            air_influence: Vec3::new(0.05, 0.0, 0.05),
            drop_roll_threshold: 6.0,
            landing_walk_speed: 0.1,
            drop_roll_duration: 0.6,
            roll_multiplier: 0.8,
            jump_speed: 4.0,
            run_jump_speed: 4.0,
            jump_idle_delay: 0.2,
            jump_running_delay: 0.03,
            jump_min_air_time: 0.1,
        }
    }
}

/// Vehicle entry and exit timings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Seconds to walk from the character position to the seat anchor.
    pub entry_duration: f32,
    /// Seconds to climb out from the seat to the exit point.
    pub exit_duration: f32,
    /// Furthest a seat entry point may be for `enter` to pick it.
    pub max_entry_distance: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            entry_duration: 0.8,
            exit_duration: 0.6,
            max_entry_distance: 2.5,
        }
    }
}

/// Full configuration for one character.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub capsule: CapsuleConfig,
    pub ground: GroundConfig,
    pub springs: SpringConfig,
    pub locomotion: LocomotionConfig,
    pub vehicle: VehicleConfig,
}

impl CharacterConfig {
    /// Parse a config from RON text and validate it.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a RON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Reject anything that would produce a half-working character.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capsule = &self.capsule;
        if !(capsule.radius.is_finite() && capsule.radius > 0.0) {
            return Err(ConfigError::Capsule { field: "radius", value: capsule.radius });
        }
        if !(capsule.height.is_finite() && capsule.height >= 0.0) {
            return Err(ConfigError::Capsule { field: "height", value: capsule.height });
        }
        if !(capsule.mass.is_finite() && capsule.mass > 0.0) {
            return Err(ConfigError::Capsule { field: "mass", value: capsule.mass });
        }

        let ground = &self.ground;
        if !(ground.ray_cast_length.is_finite() && ground.ray_cast_length > 0.0) {
            return Err(ConfigError::RayLength(ground.ray_cast_length));
        }
        if !(ground.ray_safe_offset.is_finite() && ground.ray_safe_offset >= 0.0) {
            return Err(ConfigError::RaySafeOffset(ground.ray_safe_offset));
        }
        // A capsule resting on its collider must still reach the ground with its ray.
        if capsule.bottom_offset() > ground.ray_cast_length {
            return Err(ConfigError::RayShorterThanCapsule {
                bottom: capsule.bottom_offset(),
                ray: ground.ray_cast_length,
            });
        }

        self.springs.validate()?;

        let loco = &self.locomotion;
        positive("locomotion.move_speed", loco.move_speed)?;
        non_negative("locomotion.walk_multiplier", loco.walk_multiplier)?;
        non_negative("locomotion.run_multiplier", loco.run_multiplier)?;
        non_negative("locomotion.sprint_multiplier", loco.sprint_multiplier)?;
        non_negative("locomotion.sprint_delay", loco.sprint_delay)?;
        non_negative("locomotion.air_multiplier", loco.air_multiplier)?;
        non_negative("locomotion.drop_roll_threshold", loco.drop_roll_threshold)?;
        non_negative("locomotion.landing_walk_speed", loco.landing_walk_speed)?;
        positive("locomotion.drop_roll_duration", loco.drop_roll_duration)?;
        non_negative("locomotion.roll_multiplier", loco.roll_multiplier)?;
        positive("locomotion.jump_speed", loco.jump_speed)?;
        non_negative("locomotion.run_jump_speed", loco.run_jump_speed)?;
        non_negative("locomotion.jump_idle_delay", loco.jump_idle_delay)?;
        non_negative("locomotion.jump_running_delay", loco.jump_running_delay)?;
        non_negative("locomotion.jump_min_air_time", loco.jump_min_air_time)?;

        positive("vehicle.entry_duration", self.vehicle.entry_duration)?;
        positive("vehicle.exit_duration", self.vehicle.exit_duration)?;
        non_negative("vehicle.max_entry_distance", self.vehicle.max_entry_distance)?;
        Ok(())
    }

    /// Builder: set the base move speed.
    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.locomotion.move_speed = speed;
        self
    }

    /// Builder: set the impact speed that turns a landing into a roll.
    pub fn with_drop_roll_threshold(mut self, threshold: f32) -> Self {
        self.locomotion.drop_roll_threshold = threshold;
        self
    }

    /// Builder: set both jump wind-up delays.
    pub fn with_jump_delays(mut self, idle: f32, running: f32) -> Self {
        self.locomotion.jump_idle_delay = idle;
        self.locomotion.jump_running_delay = running;
        self
    }

    /// Builder: set the ground probe.
    pub fn with_ground_ray(mut self, length: f32, safe_offset: f32) -> Self {
        self.ground.ray_cast_length = length;
        self.ground.ray_safe_offset = safe_offset;
        self
    }

    /// Builder: resize the capsule segment. The ground ray moves with the
    /// capsule bottom so the float gap under it stays the same.
    pub fn with_capsule_height(mut self, height: f32) -> Self {
        let gap = (self.ground.ray_cast_length - self.capsule.bottom_offset()).max(0.0);
        self.capsule.height = height;
        self.ground.ray_cast_length = self.capsule.bottom_offset() + gap;
        self
    }

    /// Builder: set vehicle entry/exit durations.
    pub fn with_vehicle_durations(mut self, entry: f32, exit: f32) -> Self {
        self.vehicle.entry_duration = entry;
        self.vehicle.exit_duration = exit;
        self
    }

    /// Builder: set the velocity simulator defaults.
    pub fn with_velocity_spring(mut self, params: SpringParams) -> Self {
        self.springs.velocity = params;
        self
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

/// World-wide physics settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    /// Fixed integration rate (Hz).
    pub frame_rate: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            frame_rate: 60.0,
        }
    }
}

impl PhysicsConfig {
    #[inline]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.frame_rate
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("physics.frame_rate", self.frame_rate)?;
        if !self.gravity.is_finite() {
            return Err(ConfigError::Gravity(self.gravity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CharacterConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_spring_mass_is_rejected() {
        let config = CharacterConfig::default().with_velocity_spring(SpringParams::new(60.0, 0.0, 0.8));
        assert!(matches!(config.validate(), Err(ConfigError::SpringMass(_))));
    }

    #[test]
    fn zero_damping_is_rejected() {
        let mut config = CharacterConfig::default();
        config.springs.rotation.damping = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::SpringDamping(_))));
    }

    #[test]
    fn zero_length_ray_is_rejected() {
        let config = CharacterConfig::default().with_ground_ray(0.0, 0.03);
        assert!(matches!(config.validate(), Err(ConfigError::RayLength(_))));
    }

    #[test]
    fn negative_capsule_radius_is_rejected() {
        let mut config = CharacterConfig::default();
        config.capsule.radius = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Capsule { field: "radius", .. })
        ));
    }

    #[test]
    fn partial_ron_file_fills_defaults() {
        let text = "(locomotion: (move_speed: 6.0, drop_roll_threshold: 8.0))";
        let config = CharacterConfig::from_ron_str(text).unwrap();
        assert_eq!(config.locomotion.move_speed, 6.0);
        assert_eq!(config.locomotion.drop_roll_threshold, 8.0);
        assert_eq!(config.ground, GroundConfig::default());
    }

    #[test]
    fn invalid_ron_value_fails_validation() {
        let text = "(vehicle: (entry_duration: 0.0))";
        assert!(matches!(
            CharacterConfig::from_ron_str(text),
            Err(ConfigError::NonPositive { field: "vehicle.entry_duration", .. })
        ));
    }

    #[test]
    fn ray_shorter_than_capsule_is_rejected() {
        let config = CharacterConfig::default().with_ground_ray(0.4, 0.03);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RayShorterThanCapsule { .. })
        ));
    }

    #[test]
    fn taller_capsule_carries_the_ray_along() {
        let config = CharacterConfig::default().with_capsule_height(1.0);

        assert!(config.validate().is_ok());
        assert!((config.capsule.bottom_offset() - 0.75).abs() < 1e-6);
        assert!((config.ground.ray_cast_length - 0.82).abs() < 1e-6);
    }

    #[test]
    fn state_spring_overrides_are_validated() {
        let mut config = CharacterConfig::default();
        config.springs.roll_velocity = SpringOverride::new(None, Some(1.5));
        assert!(matches!(config.validate(), Err(ConfigError::SpringDamping(_))));

        let parsed = CharacterConfig::from_ron_str("(springs: (heavy_velocity: (mass: Some(80.0))))").unwrap();
        assert_eq!(parsed.springs.heavy_velocity.mass, Some(80.0));
        assert_eq!(parsed.springs.heavy_velocity.damping, None);
        assert_eq!(parsed.springs.sprint_rotation, SpringConfig::default().sprint_rotation);
    }

    #[test]
    fn physics_rate_must_be_positive() {
        assert!(PhysicsConfig::default().validate().is_ok());
        let stalled = PhysicsConfig {
            frame_rate: 0.0,
            ..PhysicsConfig::default()
        };
        assert!(matches!(
            stalled.validate(),
            Err(ConfigError::NonPositive { field: "physics.frame_rate", .. })
        ));
        let broken = PhysicsConfig {
            gravity: Vec3::new(0.0, f32::NAN, 0.0),
            ..PhysicsConfig::default()
        };
        assert!(matches!(broken.validate(), Err(ConfigError::Gravity(_))));
    }

    #[test]
    fn capsule_bottom_offset() {
        let capsule = CapsuleConfig::default();
        assert!((capsule.bottom_offset() - 0.5).abs() < 1e-6);
    }
}
