use glam::Vec3;

use crate::components::{flat_unit, VelocityMode};
use crate::engine::input::{Action, ActionSet};

/// How a state wants the character steered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steering {
    /// Move and face where the input points, relative to the camera.
    CameraRelative,
    /// Keep going along the current facing regardless of input.
    Forward,
    /// No movement; facing stays where it is.
    Hold,
}

/// Movement parameters a state hands to the resolver each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProfile {
    /// Scales the base move speed.
    pub speed_multiplier: f32,
    pub steering: Steering,
}

impl MotionProfile {
    pub const STILL: MotionProfile = MotionProfile {
        speed_multiplier: 0.0,
        steering: Steering::Hold,
    };

    pub const fn camera_relative(speed_multiplier: f32) -> Self {
        Self {
            speed_multiplier,
            steering: Steering::CameraRelative,
        }
    }
}

/// What the character should be doing this tick, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionIntent {
    pub velocity_target: Vec3,
    pub orientation_target: Vec3,
}

/// Input direction in the character's local frame: +Z forward, +X left.
/// Unit length, or zero when nothing (or only opposing keys) is held.
pub fn local_movement_direction(actions: &ActionSet) -> Vec3 {
    let axis = |pos: Action, neg: Action| {
        (actions.is_pressed(pos) as i32 - actions.is_pressed(neg) as i32) as f32
    };
    Vec3::new(axis(Action::Left, Action::Right), 0.0, axis(Action::Up, Action::Down)).normalize_or_zero()
}

/// Rotate a local XZ direction into world space so that local +Z maps onto the
/// horizontal part of `view`.
pub fn camera_relative(view: Vec3, local: Vec3) -> Vec3 {
    let forward = flat_unit(view).unwrap_or(Vec3::Z);
    Vec3::new(
        forward.x * local.z + forward.z * local.x,
        local.y,
        forward.z * local.z - forward.x * local.x,
    )
}

/// Turn input and the active state's profile into velocity and facing targets.
///
/// With no input the previous `orientation_target` is kept, so a character
/// never tries to face a zero-length direction.
pub fn resolve(
    actions: &ActionSet,
    view: Vec3,
    orientation: Vec3,
    orientation_target: Vec3,
    profile: MotionProfile,
    move_speed: f32,
) -> MotionIntent {
    let speed = move_speed * profile.speed_multiplier;
    match profile.steering {
        Steering::CameraRelative => {
            let direction = camera_relative(view, local_movement_direction(actions));
            match flat_unit(direction) {
                Some(direction) => MotionIntent {
                    velocity_target: direction * speed,
                    orientation_target: direction,
                },
                None => MotionIntent {
                    velocity_target: Vec3::ZERO,
                    orientation_target,
                },
            }
        }
        Steering::Forward => MotionIntent {
            velocity_target: orientation * speed,
            orientation_target,
        },
        Steering::Hold => MotionIntent {
            velocity_target: Vec3::ZERO,
            orientation_target,
        },
    }
}

#[inline]
fn different_signs(a: f32, b: f32) -> bool {
    (a < 0.0) != (b < 0.0)
}

/// Combine the body's simulated velocity with the smoothed arcade velocity.
///
/// `target` is the arcade velocity the spring is heading for; in additive mode
/// an axis only receives a push while the body is slower than that target or
/// moving against the arcade velocity.
pub fn compose_velocity(simulated: Vec3, arcade: Vec3, target: Vec3, mode: VelocityMode, influence: Vec3) -> Vec3 {
    match mode {
        VelocityMode::Replace => simulated + (arcade - simulated) * influence,
        VelocityMode::Additive => {
            let push = arcade * influence;
            let mut out = simulated;
            for axis in 0..3 {
                if simulated[axis].abs() < target[axis].abs() || different_signs(simulated[axis], arcade[axis]) {
                    out[axis] += push[axis];
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressing(keys: &[Action]) -> ActionSet {
        let mut actions = ActionSet::new();
        for &k in keys {
            actions.trigger(k, true);
        }
        actions
    }

    #[test]
    fn local_direction_is_normalized() {
        let dir = local_movement_direction(&pressing(&[Action::Up, Action::Left]));
        assert!((dir.length() - 1.0).abs() < 1e-6);
        assert!(dir.x > 0.0 && dir.z > 0.0);

        assert_eq!(local_movement_direction(&pressing(&[Action::Up, Action::Down])), Vec3::ZERO);
    }

    #[test]
    fn forward_input_follows_the_camera() {
        let view = Vec3::new(1.0, -0.5, 0.0);
        let world = camera_relative(view, Vec3::Z);
        assert!((world - Vec3::X).length() < 1e-6);

        // Left of a camera looking down +X is -Z.
        let left = camera_relative(view, Vec3::X);
        assert!((left - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn no_input_keeps_previous_orientation_target() {
        let kept = Vec3::new(0.0, 0.0, -1.0);
        let intent = resolve(
            &ActionSet::new(),
            Vec3::Z,
            Vec3::Z,
            kept,
            MotionProfile::camera_relative(1.0),
            4.0,
        );
        assert_eq!(intent.velocity_target, Vec3::ZERO);
        assert_eq!(intent.orientation_target, kept);
    }

    #[test]
    fn speed_scales_with_profile() {
        let intent = resolve(
            &pressing(&[Action::Up]),
            Vec3::Z,
            Vec3::Z,
            Vec3::Z,
            MotionProfile::camera_relative(1.4),
            4.0,
        );
        assert!((intent.velocity_target - Vec3::new(0.0, 0.0, 5.6)).length() < 1e-5);
        assert_eq!(intent.orientation_target, Vec3::Z);
    }

    #[test]
    fn forward_steering_ignores_input() {
        let intent = resolve(
            &pressing(&[Action::Left]),
            Vec3::Z,
            Vec3::X,
            Vec3::X,
            MotionProfile {
                speed_multiplier: 0.5,
                steering: Steering::Forward,
            },
            4.0,
        );
        assert_eq!(intent.velocity_target, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn replace_lerps_per_axis() {
        let simulated = Vec3::new(0.0, -3.0, 2.0);
        let arcade = Vec3::new(4.0, 0.0, 0.0);
        let out = compose_velocity(simulated, arcade, arcade, VelocityMode::Replace, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(out, Vec3::new(4.0, -3.0, 0.0));
    }

    #[test]
    fn additive_stops_pushing_at_target_speed() {
        let influence = Vec3::new(0.05, 0.0, 0.05);
        let arcade = Vec3::new(3.0, 0.0, 0.0);
        let target = Vec3::new(3.2, 0.0, 0.0);

        let slow = compose_velocity(Vec3::new(1.0, -2.0, 0.0), arcade, target, VelocityMode::Additive, influence);
        assert!((slow.x - 1.15).abs() < 1e-6);
        assert_eq!(slow.y, -2.0);

        let fast = compose_velocity(Vec3::new(5.0, 0.0, 0.0), arcade, target, VelocityMode::Additive, influence);
        assert_eq!(fast.x, 5.0);

        // Moving against the input always gets pushed back.
        let against = compose_velocity(Vec3::new(-5.0, 0.0, 0.0), arcade, target, VelocityMode::Additive, influence);
        assert!((against.x + 4.85).abs() < 1e-6);
    }
}
