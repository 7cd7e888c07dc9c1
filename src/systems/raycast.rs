use glam::Vec3;
use hecs::{Entity, World};

use crate::components::{Collider, CollisionFilter, Disabled, Transform};

use super::collision::closest_point_on_segment;

/// Nearest surface hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub entity: Entity,
    pub distance: f32,
    pub point: Vec3,
    /// Outward surface normal at `point`.
    pub normal: Vec3,
}

/// Cast a ray against every enabled collider whose group is in `mask`,
/// skipping `exclude`. Returns the nearest hit within `max_distance`.
pub fn raycast_closest(
    world: &World,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    mask: u32,
    exclude: Option<Entity>,
) -> Option<RaycastHit> {
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO || max_distance <= 0.0 {
        return None;
    }
    let mut best: Option<RaycastHit> = None;

    for (entity, (transform, collider, filter, disabled)) in world
        .query::<(&Transform, &Collider, Option<&CollisionFilter>, Option<&Disabled>)>()
        .iter()
    {
        if disabled.is_some() || Some(entity) == exclude {
            continue;
        }
        let group = filter.copied().unwrap_or_default().group;
        if mask & group.bit() == 0 {
            continue;
        }

        let center = transform.position;
        let hit = match *collider {
            Collider::Sphere { radius } => ray_sphere_intersection(origin, dir, center, radius),
            Collider::Capsule { radius, height } => {
                ray_capsule_intersection(origin, dir, center, radius, height)
            }
            Collider::Box { half_extents } => ray_aabb_intersection(origin, dir, center, half_extents),
            Collider::Plane { normal, offset } => ray_plane_intersection(origin, dir, normal, offset),
        };

        if let Some((t, normal)) = hit {
            if t >= 0.0 && t <= max_distance && best.map_or(true, |b| t < b.distance) {
                best = Some(RaycastHit {
                    entity,
                    distance: t,
                    point: origin + dir * t,
                    normal,
                });
            }
        }
    }

    best
}

fn ray_plane_intersection(origin: Vec3, dir: Vec3, normal: Vec3, offset: f32) -> Option<(f32, Vec3)> {
    let denom = dir.dot(normal);
    // Only the front face counts.
    if denom >= -1e-6 {
        return None;
    }
    let t = (offset - origin.dot(normal)) / denom;
    (t >= 0.0).then_some((t, normal))
}

fn ray_sphere_intersection(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<(f32, Vec3)> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.dot(oc) - radius * radius;
    let discriminant = b * b - c;

    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let t = if -b - sqrt_d >= 0.0 {
        -b - sqrt_d
    } else if -b + sqrt_d >= 0.0 {
        -b + sqrt_d
    } else {
        return None;
    };
    let normal = (origin + dir * t - center) / radius;
    Some((t, normal))
}

/// Capsule approximated by its two hemisphere spheres plus a center sphere.
/// The normal is taken from the closest point on the capsule's axis.
fn ray_capsule_intersection(
    origin: Vec3,
    dir: Vec3,
    center: Vec3,
    radius: f32,
    height: f32,
) -> Option<(f32, Vec3)> {
    let half_h = height * 0.5;
    let top = center + Vec3::Y * half_h;
    let bottom = center - Vec3::Y * half_h;

    let t = [top, bottom, center]
        .iter()
        .filter_map(|c| ray_sphere_intersection(origin, dir, *c, radius))
        .map(|(t, _)| t)
        .reduce(f32::min)?;

    let point = origin + dir * t;
    let axis_point = closest_point_on_segment(bottom, top, point);
    let normal = (point - axis_point).try_normalize().unwrap_or(-dir);
    Some((t, normal))
}

fn ray_aabb_intersection(origin: Vec3, dir: Vec3, center: Vec3, half: Vec3) -> Option<(f32, Vec3)> {
    let min = center - half;
    let max = center + half;
    let inv_dir = dir.recip();

    let t1 = (min - origin) * inv_dir;
    let t2 = (max - origin) * inv_dir;
    let near = t1.min(t2);
    let far = t1.max(t2);

    let tmin = near.max_element();
    let tmax = far.min_element();

    if tmax < 0.0 || tmin > tmax {
        return None;
    }

    if tmin >= 0.0 {
        // Entering face: the slab whose near plane was crossed last.
        let normal = if tmin == near.x {
            Vec3::new(-dir.x.signum(), 0.0, 0.0)
        } else if tmin == near.y {
            Vec3::new(0.0, -dir.y.signum(), 0.0)
        } else {
            Vec3::new(0.0, 0.0, -dir.z.signum())
        };
        Some((tmin, normal))
    } else {
        // Ray starts inside the box: report the exit face.
        let normal = if tmax == far.x {
            Vec3::new(dir.x.signum(), 0.0, 0.0)
        } else if tmax == far.y {
            Vec3::new(0.0, dir.y.signum(), 0.0)
        } else {
            Vec3::new(0.0, 0.0, dir.z.signum())
        };
        Some((tmax, normal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::CollisionGroup;

    fn spawn(world: &mut World, position: Vec3, collider: Collider, group: CollisionGroup) -> Entity {
        world.spawn((
            Transform::from_position(position),
            collider,
            CollisionFilter::new(group, u32::MAX),
        ))
    }

    #[test]
    fn downward_ray_hits_plane_with_up_normal() {
        let mut world = World::new();
        let ground = spawn(
            &mut world,
            Vec3::ZERO,
            Collider::Plane { normal: Vec3::Y, offset: 0.0 },
            CollisionGroup::Default,
        );

        let hit = raycast_closest(&world, Vec3::new(2.0, 0.5, 1.0), -Vec3::Y, 0.6, u32::MAX, None).unwrap();

        assert_eq!(hit.entity, ground);
        assert!((hit.distance - 0.5).abs() < 1e-6);
        assert!((hit.point - Vec3::new(2.0, 0.0, 1.0)).length() < 1e-6);
        assert_eq!(hit.normal, Vec3::Y);
    }

    #[test]
    fn ray_shorter_than_gap_misses() {
        let mut world = World::new();
        spawn(
            &mut world,
            Vec3::ZERO,
            Collider::Plane { normal: Vec3::Y, offset: 0.0 },
            CollisionGroup::Default,
        );

        assert!(raycast_closest(&world, Vec3::new(0.0, 1.0, 0.0), -Vec3::Y, 0.6, u32::MAX, None).is_none());
    }

    #[test]
    fn nearest_of_box_and_plane_wins() {
        let mut world = World::new();
        spawn(
            &mut world,
            Vec3::ZERO,
            Collider::Plane { normal: Vec3::Y, offset: 0.0 },
            CollisionGroup::Default,
        );
        let crate_box = spawn(
            &mut world,
            Vec3::new(0.0, 0.5, 0.0),
            Collider::Box { half_extents: Vec3::splat(0.5) },
            CollisionGroup::Default,
        );

        let hit = raycast_closest(&world, Vec3::new(0.2, 3.0, 0.0), -Vec3::Y, 10.0, u32::MAX, None).unwrap();

        assert_eq!(hit.entity, crate_box);
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert_eq!(hit.normal, Vec3::Y);
    }

    #[test]
    fn mask_and_exclusion_are_respected() {
        let mut world = World::new();
        let trimesh = spawn(
            &mut world,
            Vec3::ZERO,
            Collider::Plane { normal: Vec3::Y, offset: 0.0 },
            CollisionGroup::TrimeshColliders,
        );
        let me = spawn(
            &mut world,
            Vec3::new(0.0, 1.0, 0.0),
            Collider::Capsule { radius: 0.25, height: 0.5 },
            CollisionGroup::Characters,
        );
        let origin = Vec3::new(0.0, 1.0, 0.0);
        let default_only = CollisionGroup::mask(&[CollisionGroup::Default]);

        assert!(raycast_closest(&world, origin, -Vec3::Y, 2.0, default_only, Some(me)).is_none());

        let hit = raycast_closest(&world, origin, -Vec3::Y, 2.0, u32::MAX, Some(me)).unwrap();
        assert_eq!(hit.entity, trimesh);
    }

    #[test]
    fn sphere_hit_normal_faces_ray() {
        let mut world = World::new();
        spawn(
            &mut world,
            Vec3::new(0.0, 0.0, 5.0),
            Collider::Sphere { radius: 1.0 },
            CollisionGroup::Default,
        );

        let hit = raycast_closest(&world, Vec3::ZERO, Vec3::Z, 10.0, u32::MAX, None).unwrap();

        assert!((hit.distance - 4.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::NEG_Z).length() < 1e-5);
    }
}
