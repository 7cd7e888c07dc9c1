use glam::{Quat, Vec3};
use tracing::debug;

use crate::character::Character;
use crate::components::{direction_from_yaw, yaw_of};
use crate::error::PhysicsError;
use crate::physics::{BodyHandle, PhysicsStepParticipant, PhysicsWorld};
use crate::spring::Angle;
use crate::systems::intent::compose_velocity;

impl PhysicsStepParticipant for Character {
    fn body(&self) -> BodyHandle {
        self.body
    }

    /// Smooth the intent through the springs and write the result onto the body.
    fn on_pre_step(&mut self, world: &mut PhysicsWorld, dt: f32) -> Result<(), PhysicsError> {
        let previous = self.motion.velocity;
        self.velocity_spring.set_target(self.motion.velocity_target);
        let (arcade, _) = self.velocity_spring.simulate(dt);
        self.motion.velocity = arcade;
        self.motion.acceleration = (arcade - previous) / dt;

        // Facing is visual only; the body stays rotation-locked.
        self.rotation_spring.set_target(Angle(yaw_of(self.motion.orientation_target)));
        let (yaw, turn) = self.rotation_spring.simulate(dt);
        self.motion.orientation = direction_from_yaw(yaw.0);
        self.motion.angular_velocity = turn.0;

        let simulated = world.velocity(self.body)?;
        let mut velocity = compose_velocity(simulated, arcade, self.motion.velocity_target, self.mode, self.influence);

        let loco = &self.config.locomotion;
        match self.pending_jump.take() {
            Some(launch) => {
                if launch.running {
                    let speed = Vec3::new(arcade.x, 0.0, arcade.z).length().max(loco.run_jump_speed);
                    let forward = self.motion.orientation * speed;
                    velocity.x = forward.x;
                    velocity.z = forward.z;
                }
                velocity.y = loco.jump_speed;
                // Lift clear of the probe so the next post-step sees the takeoff.
                let position = world.position(self.body)?;
                world.set_position(self.body, position + Vec3::Y * (2.0 * self.config.ground.ray_safe_offset))?;
                self.jumped_this_step = true;
            }
            None if self.ground.has_hit => {
                // Walk along the surface instead of into or off it.
                velocity.y = 0.0;
                velocity = Quat::from_rotation_arc(Vec3::Y, self.ground.hit_normal) * velocity;
            }
            None => {}
        }

        world.set_velocity(self.body, velocity)
    }

    /// Probe the ground, track landing/takeoff edges and keep the body at standing height.
    fn on_post_step(&mut self, world: &mut PhysicsWorld, _dt: f32) -> Result<(), PhysicsError> {
        let was_grounded = self.ground.has_hit;
        let contact = self.sensor.probe(world, self.body)?;
        let position = world.position(self.body)?;
        let velocity = world.velocity(self.body)?;

        if !contact.has_hit {
            if was_grounded {
                debug!(character = %self.id, height = position.y, "left the ground");
                self.impact.peak_height = position.y;
            }
            self.impact.velocity = velocity;
            self.impact.peak_height = self.impact.peak_height.max(position.y);
        } else if !was_grounded {
            // Contact resolution has already absorbed the fall; read the speed from before it.
            self.impact.velocity = world.pre_contact_velocity(self.body)?;
            self.impact.fall_height = (self.impact.peak_height - position.y).max(0.0);
            debug!(
                character = %self.id,
                impact = ?self.impact.velocity,
                fall_height = self.impact.fall_height,
                "landed"
            );
        }

        if contact.has_hit && !self.jumped_this_step {
            let standing = self.sensor.standing_position(&contact, position, self.config.capsule.radius);
            world.set_position(self.body, standing)?;
            let into = velocity.dot(contact.hit_normal);
            if into < 0.0 {
                world.set_velocity(self.body, velocity - contact.hit_normal * into)?;
            }
        }

        self.ground = contact;
        self.jumped_this_step = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacterDesc;
    use crate::components::{CharacterId, CharacterState, Collider};
    use crate::config::{CharacterConfig, PhysicsConfig};
    use crate::engine::input::Action;
    use crate::physics::BodyDesc;

    fn flat_world() -> PhysicsWorld {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        physics.create_body(
            BodyDesc::fixed(Collider::Plane { normal: Vec3::Y, offset: 0.0 }, Vec3::ZERO).with_material(0.0, 0.5),
        );
        physics
    }

    fn spawn(physics: &mut PhysicsWorld, y: f32) -> Character {
        let desc = CharacterDesc {
            position: Vec3::new(0.0, y, 0.0),
            orientation: Vec3::Z,
        };
        Character::new(CharacterId(1), desc, CharacterConfig::default(), physics).unwrap()
    }

    #[test]
    fn standing_character_stays_at_standing_height() {
        let mut physics = flat_world();
        let mut characters = [spawn(&mut physics, 0.57)];

        for _ in 0..30 {
            physics.step(&mut characters).unwrap();
        }

        let y = physics.position(characters[0].body()).unwrap().y;
        assert!((y - 0.57).abs() < 1e-4, "y = {y}");
        assert!(characters[0].ground().has_hit);
    }

    #[test]
    fn falling_body_records_pre_contact_impact() {
        let mut physics = flat_world();
        let mut characters = [spawn(&mut physics, 0.85)];
        physics.set_velocity(characters[0].body(), Vec3::new(0.0, -12.0, 0.0)).unwrap();

        physics.step(&mut characters).unwrap();
        assert!(!characters[0].ground().has_hit);

        physics.step(&mut characters).unwrap();
        let character = &characters[0];
        assert!(character.ground().has_hit);
        assert!(character.impact().velocity.y < -12.0);
        assert!(character.impact().velocity.y > -12.6);
        // Snapped back to standing height, no longer moving down.
        let body = character.body();
        assert!((physics.position(body).unwrap().y - 0.57).abs() < 1e-4);
        assert!(physics.velocity(body).unwrap().y >= 0.0);
    }

    #[test]
    fn pending_jump_lifts_off() {
        let mut physics = flat_world();
        let mut characters = [spawn(&mut physics, 0.57)];
        characters[0].fsm.force_go(CharacterState::JumpIdle { timer: 0.2, air_time: Some(0.0) });
        characters[0].pending_jump = Some(crate::systems::JumpLaunch { running: false });

        physics.step(&mut characters).unwrap();

        let body = characters[0].body();
        assert!(!characters[0].ground().has_hit);
        assert!(physics.velocity(body).unwrap().y > 3.5);
        assert!(physics.position(body).unwrap().y > 0.6);
        assert!(characters[0].pending_jump.is_none());
    }

    #[test]
    fn facing_turns_toward_target_and_stays_unit() {
        let mut physics = flat_world();
        let mut characters = [spawn(&mut physics, 0.57)];
        characters[0].fsm.force_go(CharacterState::Walk);
        characters[0].set_view_vector(Vec3::X);
        characters[0].actions.trigger(Action::Up, true);

        for _ in 0..60 {
            characters[0].resolve_intent();
            physics.step(&mut characters).unwrap();
        }

        let facing = characters[0].motion().orientation;
        assert!((facing.length() - 1.0).abs() < 1e-5);
        assert!(facing.x > 0.95, "facing = {facing:?}");
        assert!(physics.is_rotation_locked(characters[0].body()).unwrap());
    }
}
