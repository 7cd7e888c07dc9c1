use glam::Vec3;

use crate::components::{CollisionGroup, GroundContact};
use crate::config::GroundConfig;
use crate::error::{ConfigError, PhysicsError};
use crate::physics::{BodyHandle, PhysicsWorld, RayFilter};

/// Downward ray probe deciding whether a character stands on something.
///
/// The ray starts at the body center and reaches `ray_cast_length` (standing
/// height) plus `safe_offset`. A body that sank slightly into the ground
/// after integration still has its origin above the surface, so the probe
/// keeps reporting contact.
#[derive(Debug, Clone, Copy)]
pub struct GroundSensor {
    ray_cast_length: f32,
    safe_offset: f32,
    mask: u32,
}

impl GroundSensor {
    pub fn new(config: &GroundConfig) -> Result<Self, ConfigError> {
        if !(config.ray_cast_length.is_finite() && config.ray_cast_length > 0.0) {
            return Err(ConfigError::RayLength(config.ray_cast_length));
        }
        if !(config.ray_safe_offset.is_finite() && config.ray_safe_offset >= 0.0) {
            return Err(ConfigError::RaySafeOffset(config.ray_safe_offset));
        }
        let mut groups = vec![CollisionGroup::Default];
        if config.include_trimesh {
            groups.push(CollisionGroup::TrimeshColliders);
        }
        Ok(Self {
            ray_cast_length: config.ray_cast_length,
            safe_offset: config.ray_safe_offset,
            mask: CollisionGroup::mask(&groups),
        })
    }

    #[inline]
    pub fn ray_cast_length(&self) -> f32 {
        self.ray_cast_length
    }

    #[inline]
    pub fn ray_length(&self) -> f32 {
        self.ray_cast_length + self.safe_offset
    }

    /// Cast from `body`'s current position. A miss is a normal airborne result.
    pub fn probe(&self, world: &PhysicsWorld, body: BodyHandle) -> Result<GroundContact, PhysicsError> {
        let origin = world.position(body)?;
        let filter = RayFilter {
            mask: self.mask,
            exclude: Some(body),
        };

        let contact = match world.ray_cast_closest(origin, Vec3::NEG_Y, self.ray_length(), filter) {
            Some(hit) => GroundContact {
                has_hit: true,
                hit_point: hit.point,
                hit_normal: hit.normal,
                distance: hit.distance,
                penetration_depth: (self.ray_cast_length - hit.distance).max(0.0),
                ray_length: self.ray_length(),
                safe_offset: self.safe_offset,
                ground_body: Some(hit.body),
            },
            None => GroundContact::airborne(self.ray_length(), self.safe_offset),
        };
        Ok(contact)
    }

    /// Where a body grounded on `contact` should stand: `ray_cast_length`
    /// above the hit, pushed out along the surface normal if that leaves less
    /// than `radius` of clearance.
    pub fn standing_position(&self, contact: &GroundContact, current: Vec3, radius: f32) -> Vec3 {
        let mut position = Vec3::new(current.x, contact.hit_point.y + self.ray_cast_length, current.z);
        let clearance = (position - contact.hit_point).dot(contact.hit_normal);
        if clearance < radius {
            position += contact.hit_normal * (radius - clearance);
        }
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Collider, CollisionFilter};
    use crate::config::PhysicsConfig;
    use crate::physics::BodyDesc;

    fn capsule_at(world: &mut PhysicsWorld, position: Vec3) -> BodyHandle {
        world.create_body(
            BodyDesc::dynamic(Collider::Capsule { radius: 0.25, height: 0.5 }, position).with_filter(
                CollisionFilter::new(CollisionGroup::Characters, CollisionGroup::Default.bit()),
            ),
        )
    }

    fn flat_world() -> PhysicsWorld {
        let mut world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        world.create_body(BodyDesc::fixed(Collider::Plane { normal: Vec3::Y, offset: 0.0 }, Vec3::ZERO));
        world
    }

    #[test]
    fn zero_length_ray_is_a_config_error() {
        let config = GroundConfig {
            ray_cast_length: 0.0,
            ..GroundConfig::default()
        };
        assert!(matches!(GroundSensor::new(&config), Err(ConfigError::RayLength(_))));
    }

    #[test]
    fn standing_body_hits_ground() {
        let mut world = flat_world();
        let body = capsule_at(&mut world, Vec3::new(0.0, 0.55, 0.0));
        let sensor = GroundSensor::new(&GroundConfig::default()).unwrap();

        let contact = sensor.probe(&world, body).unwrap();

        assert!(contact.has_hit);
        assert_eq!(contact.hit_normal, Vec3::Y);
        assert!((contact.distance - 0.55).abs() < 1e-5);
        assert!((contact.penetration_depth - 0.02).abs() < 1e-5);
    }

    #[test]
    fn high_body_is_airborne() {
        let mut world = flat_world();
        let body = capsule_at(&mut world, Vec3::new(0.0, 0.61, 0.0));
        let sensor = GroundSensor::new(&GroundConfig::default()).unwrap();

        let contact = sensor.probe(&world, body).unwrap();

        assert!(!contact.has_hit);
        assert_eq!(contact.penetration_depth, 0.0);
    }

    #[test]
    fn trimesh_ground_needs_opt_in() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        world.create_body(
            BodyDesc::fixed(Collider::Plane { normal: Vec3::Y, offset: 0.0 }, Vec3::ZERO)
                .with_filter(CollisionFilter::new(CollisionGroup::TrimeshColliders, u32::MAX)),
        );
        let body = capsule_at(&mut world, Vec3::new(0.0, 0.5, 0.0));

        let plain = GroundSensor::new(&GroundConfig::default()).unwrap();
        assert!(!plain.probe(&world, body).unwrap().has_hit);

        let with_trimesh = GroundSensor::new(&GroundConfig {
            include_trimesh: true,
            ..GroundConfig::default()
        })
        .unwrap();
        assert!(with_trimesh.probe(&world, body).unwrap().has_hit);
    }

    #[test]
    fn standing_position_keeps_radius_clearance_on_slopes() {
        let sensor = GroundSensor::new(&GroundConfig::default()).unwrap();
        let radius = 0.25;

        for degrees in [0.0_f32, 20.0, 45.0, 70.0, 85.0] {
            let normal = Vec3::new(degrees.to_radians().sin(), degrees.to_radians().cos(), 0.0);
            let contact = GroundContact {
                has_hit: true,
                hit_point: Vec3::new(1.0, 2.0, 0.0),
                hit_normal: normal,
                distance: 0.5,
                penetration_depth: 0.07,
                ray_length: 0.6,
                safe_offset: 0.03,
                ground_body: None,
            };

            let pos = sensor.standing_position(&contact, Vec3::new(1.0, 2.5, 0.0), radius);

            let clearance = (pos - contact.hit_point).dot(normal);
            assert!(clearance >= radius - 1e-5, "{degrees}°: clearance {clearance}");
        }
    }

    #[test]
    fn missing_body_fails_fast() {
        let mut world = flat_world();
        let body = capsule_at(&mut world, Vec3::Y);
        world.remove_body(body).unwrap();
        let sensor = GroundSensor::new(&GroundConfig::default()).unwrap();

        assert_eq!(sensor.probe(&world, body), Err(PhysicsError::MissingBody(body)));
    }
}
