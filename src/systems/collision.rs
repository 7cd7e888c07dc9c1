use glam::Vec3;
use hecs::{Entity, World};

use crate::components::{
    BodyKind, Collider, CollisionEvent, CollisionFilter, Disabled, Friction, Mass, Restitution,
    Transform, Velocity,
};

struct ColliderEntry {
    entity: Entity,
    position: Vec3,
    immovable: bool,
    filter: CollisionFilter,
    shape: Shape,
}

enum Shape {
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
    Plane { normal: Vec3, offset: f32 },
    Aabb { half: Vec3 },
}

pub(crate) fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-12 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

fn closest_point_on_aabb(center: Vec3, half: Vec3, p: Vec3) -> Vec3 {
    p.clamp(center - half, center + half)
}

/// Closest pair between a vertical segment and a box, refined by alternating
/// projections. Exact for the common case of a capsule resting on or beside a box.
fn segment_aabb_closest(bottom: Vec3, top: Vec3, center: Vec3, half: Vec3) -> (Vec3, Vec3) {
    let mut on_segment = closest_point_on_segment(bottom, top, center);
    let mut on_box = closest_point_on_aabb(center, half, on_segment);
    for _ in 0..3 {
        on_segment = closest_point_on_segment(bottom, top, on_box);
        on_box = closest_point_on_aabb(center, half, on_segment);
    }
    (on_segment, on_box)
}

/// Contact between a sphere centered at `p` and a box. Normal points from the
/// sphere toward the box.
fn sphere_aabb(p: Vec3, radius: f32, center: Vec3, half: Vec3) -> Option<(Vec3, f32)> {
    let closest = closest_point_on_aabb(center, half, p);
    let diff = closest - p;
    let dist = diff.length();
    if dist > 1e-6 {
        let penetration = radius - dist;
        return (penetration > 0.0).then_some((diff / dist, penetration));
    }

    // Center inside the box: leave through the nearest face.
    let local = p - center;
    let gap = half - local.abs();
    let (axis, depth) = if gap.x <= gap.y && gap.x <= gap.z {
        (Vec3::X * local.x.signum(), gap.x)
    } else if gap.y <= gap.z {
        (Vec3::Y * local.y.signum(), gap.y)
    } else {
        (Vec3::Z * local.z.signum(), gap.z)
    };
    Some((-axis, depth + radius))
}

fn capsule_segment(position: Vec3, half_height: f32) -> (Vec3, Vec3) {
    (position - Vec3::Y * half_height, position + Vec3::Y * half_height)
}

fn plane_contact(lowest_distance: f32, radius: f32, normal: Vec3) -> Option<(Vec3, f32)> {
    let penetration = radius - lowest_distance;
    (penetration > 0.0).then_some((-normal, penetration))
}

/// Normal (pointing from `a` toward `b`) and depth of a contact, if any.
fn contact(a: &ColliderEntry, b: &ColliderEntry) -> Option<(Vec3, f32)> {
    match (&a.shape, &b.shape) {
        (Shape::Sphere { radius }, Shape::Plane { normal, offset }) => {
            plane_contact(a.position.dot(*normal) - offset, *radius, *normal)
        }
        (Shape::Capsule { radius, half_height }, Shape::Plane { normal, offset }) => {
            let (bottom, top) = capsule_segment(a.position, *half_height);
            let lowest = (bottom.dot(*normal) - offset).min(top.dot(*normal) - offset);
            plane_contact(lowest, *radius, *normal)
        }
        (Shape::Sphere { radius: r1 }, Shape::Sphere { radius: r2 }) => {
            let diff = b.position - a.position;
            let dist = diff.length();
            let penetration = (r1 + r2) - dist;
            let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };
            (penetration > 0.0).then_some((normal, penetration))
        }
        (Shape::Capsule { radius: cr, half_height }, Shape::Sphere { radius: sr }) => {
            let (bottom, top) = capsule_segment(a.position, *half_height);
            let closest = closest_point_on_segment(bottom, top, b.position);
            let diff = b.position - closest;
            let dist = diff.length();
            let penetration = (cr + sr) - dist;
            let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };
            (penetration > 0.0).then_some((normal, penetration))
        }
        (Shape::Capsule { radius: r1, half_height: h1 }, Shape::Capsule { radius: r2, half_height: h2 }) => {
            let (a0, a1) = capsule_segment(a.position, *h1);
            let (b0, b1) = capsule_segment(b.position, *h2);
            // Both segments are vertical: compare at the overlapping height.
            let on_a = closest_point_on_segment(a0, a1, b.position);
            let on_b = closest_point_on_segment(b0, b1, on_a);
            let diff = on_b - on_a;
            let dist = diff.length();
            let penetration = (r1 + r2) - dist;
            let normal = if dist > 1e-6 { diff / dist } else { Vec3::X };
            (penetration > 0.0).then_some((normal, penetration))
        }
        (Shape::Sphere { radius }, Shape::Aabb { half }) => {
            sphere_aabb(a.position, *radius, b.position, *half)
        }
        (Shape::Capsule { radius, half_height }, Shape::Aabb { half }) => {
            let (bottom, top) = capsule_segment(a.position, *half_height);
            let (on_segment, _) = segment_aabb_closest(bottom, top, b.position, *half);
            sphere_aabb(on_segment, *radius, b.position, *half)
        }
        (Shape::Aabb { half }, Shape::Plane { normal, offset }) => {
            let extent = half.dot(normal.abs());
            plane_contact(a.position.dot(*normal) - offset, extent, *normal)
        }
        (Shape::Aabb { half: ha }, Shape::Aabb { half: hb }) => {
            let diff = b.position - a.position;
            let overlap = (*ha + *hb) - diff.abs();
            if overlap.min_element() <= 0.0 {
                return None;
            }
            let normal = if overlap.x <= overlap.y && overlap.x <= overlap.z {
                Vec3::X * diff.x.signum()
            } else if overlap.y <= overlap.z {
                Vec3::Y * diff.y.signum()
            } else {
                Vec3::Z * diff.z.signum()
            };
            Some((normal, overlap.min_element()))
        }
        // Mirrored pairs: swap, test, flip the normal back.
        (Shape::Plane { .. }, _)
        | (Shape::Sphere { .. }, Shape::Capsule { .. })
        | (Shape::Aabb { .. }, Shape::Sphere { .. })
        | (Shape::Aabb { .. }, Shape::Capsule { .. }) => {
            if matches!(b.shape, Shape::Plane { .. }) {
                return None;
            }
            contact(b, a).map(|(n, depth)| (-n, depth))
        }
    }
}

const REST_VELOCITY_THRESHOLD: f32 = 0.5;
const DEFAULT_RESTITUTION: f32 = 0.3;
const DEFAULT_FRICTION: f32 = 0.5;

/// Coulomb friction: reduce tangential velocity proportional to the normal impulse,
/// never reversing the sliding direction.
fn apply_friction(vel: &mut Vec3, normal: Vec3, mu: f32, normal_impulse: f32, dt: f32) {
    let tangent_vel = *vel - vel.dot(normal) * normal;
    let tangent_speed = tangent_vel.length();
    if tangent_speed < 1e-6 {
        return;
    }
    let tangent_dir = tangent_vel / tangent_speed;
    let friction_impulse = (mu * normal_impulse * dt).min(tangent_speed);
    *vel -= tangent_dir * friction_impulse;
}

/// Remove the approaching component of `vel` along `n` (bounce above the rest threshold).
/// `approach` is the positive closing speed. Returns the applied normal impulse.
fn bounce(vel: &mut Vec3, n: Vec3, approach: f32, e: f32) -> f32 {
    if approach < REST_VELOCITY_THRESHOLD {
        *vel -= approach * n;
        approach
    } else {
        *vel -= (1.0 + e) * approach * n;
        (1.0 + e) * approach
    }
}

fn inverse_mass(world: &World, entity: Entity) -> f32 {
    world
        .get::<&Mass>(entity)
        .map(|m| 1.0 / m.0)
        .unwrap_or(1.0)
}

fn material(world: &World, entity: Entity) -> (f32, f32) {
    let restitution = world
        .get::<&Restitution>(entity)
        .map(|r| r.0)
        .unwrap_or(DEFAULT_RESTITUTION);
    let friction = world
        .get::<&Friction>(entity)
        .map(|f| f.0)
        .unwrap_or(DEFAULT_FRICTION);
    (restitution, friction)
}

/// Push one movable body out along `dir` and cancel its velocity into the contact.
fn resolve_against_immovable(world: &mut World, entity: Entity, dir: Vec3, depth: f32, e: f32, mu: f32, dt: f32) {
    if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
        transform.position += dir * depth;
    }
    if let Ok(mut vel) = world.get::<&mut Velocity>(entity) {
        let into = -vel.0.dot(dir);
        if into > 0.0 {
            let impulse = bounce(&mut vel.0, -dir, into, e);
            apply_friction(&mut vel.0, dir, mu, impulse, dt);
        }
    }
}

/// Detect contacts between enabled bodies whose filters accept each other and
/// apply impulse-based response.
///
/// `contact_normal` always points from `entity_a` toward `entity_b`:
/// A leaves along `-normal`, B leaves along `+normal`.
pub fn resolve_contacts(world: &mut World, dt: f32) -> Vec<CollisionEvent> {
    let entries: Vec<ColliderEntry> = world
        .query_mut::<(&Transform, &Collider, &BodyKind, Option<&CollisionFilter>, Option<&Disabled>)>()
        .into_iter()
        .filter(|(_entity, (_, _, _, _, disabled))| disabled.is_none())
        .map(|(entity, (transform, collider, kind, filter, _))| {
            let shape = match *collider {
                Collider::Sphere { radius } => Shape::Sphere { radius },
                Collider::Capsule { radius, height } => Shape::Capsule {
                    radius,
                    half_height: height * 0.5,
                },
                Collider::Plane { normal, offset } => Shape::Plane { normal, offset },
                Collider::Box { half_extents } => Shape::Aabb { half: half_extents },
            };
            ColliderEntry {
                entity,
                position: transform.position,
                immovable: *kind != BodyKind::Dynamic,
                filter: filter.copied().unwrap_or_default(),
                shape,
            }
        })
        .collect();

    // Broadphase: brute force O(n²)
    let mut events = Vec::new();
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            let (a, b) = (&entries[i], &entries[j]);
            if (a.immovable && b.immovable) || !a.filter.interacts(&b.filter) {
                continue;
            }
            if let Some((contact_normal, penetration_depth)) = contact(a, b) {
                events.push((
                    CollisionEvent {
                        entity_a: a.entity,
                        entity_b: b.entity,
                        contact_normal,
                        penetration_depth,
                    },
                    a.immovable,
                    b.immovable,
                ));
            }
        }
    }

    for (event, a_fixed, b_fixed) in &events {
        let (restitution_a, friction_a) = material(world, event.entity_a);
        let (restitution_b, friction_b) = material(world, event.entity_b);
        let e = (restitution_a + restitution_b) * 0.5;
        let mu = (friction_a + friction_b) * 0.5;

        let n = event.contact_normal;
        let depth = event.penetration_depth;

        if *a_fixed {
            resolve_against_immovable(world, event.entity_b, n, depth, e, mu, dt);
        } else if *b_fixed {
            resolve_against_immovable(world, event.entity_a, -n, depth, e, mu, dt);
        } else {
            // Both dynamic: split the push by inverse mass.
            let inv_a = inverse_mass(world, event.entity_a);
            let inv_b = inverse_mass(world, event.entity_b);
            let share_a = inv_a / (inv_a + inv_b);
            let share_b = 1.0 - share_a;

            if let Ok(mut transform) = world.get::<&mut Transform>(event.entity_a) {
                transform.position -= n * (depth * share_a);
            }
            if let Ok(mut transform) = world.get::<&mut Transform>(event.entity_b) {
                transform.position += n * (depth * share_b);
            }

            let vel_a = world.get::<&Velocity>(event.entity_a).map(|v| v.0).unwrap_or(Vec3::ZERO);
            let vel_b = world.get::<&Velocity>(event.entity_b).map(|v| v.0).unwrap_or(Vec3::ZERO);
            let vel_along_n = (vel_a - vel_b).dot(n);

            // Positive = A approaching B
            if vel_along_n > 0.0 {
                let impulse = if vel_along_n < REST_VELOCITY_THRESHOLD {
                    vel_along_n
                } else {
                    (1.0 + e) * vel_along_n
                };
                if let Ok(mut vel) = world.get::<&mut Velocity>(event.entity_a) {
                    vel.0 -= impulse * share_a * n;
                    apply_friction(&mut vel.0, n, mu, impulse * share_a, dt);
                }
                if let Ok(mut vel) = world.get::<&mut Velocity>(event.entity_b) {
                    vel.0 += impulse * share_b * n;
                    apply_friction(&mut vel.0, n, mu, impulse * share_b, dt);
                }
            }
        }
    }

    events.into_iter().map(|(event, _, _)| event).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn ground(world: &mut World) -> Entity {
        world.spawn((
            Transform::from_position(Vec3::ZERO),
            Collider::Plane { normal: Vec3::Y, offset: 0.0 },
            BodyKind::Static,
            Velocity(Vec3::ZERO),
            Restitution(0.0),
        ))
    }

    #[test]
    fn capsule_is_pushed_out_of_plane() {
        let mut world = World::new();
        ground(&mut world);
        let capsule = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.4, 0.0)),
            Collider::Capsule { radius: 0.25, height: 0.5 },
            BodyKind::Dynamic,
            Velocity(Vec3::new(0.0, -3.0, 0.0)),
            Restitution(0.0),
        ));

        let events = resolve_contacts(&mut world, DT);

        assert_eq!(events.len(), 1);
        let pos = world.get::<&Transform>(capsule).unwrap().position;
        assert!((pos.y - 0.5).abs() < 1e-5, "capsule bottom should rest on plane, got {}", pos.y);
        let vel = world.get::<&Velocity>(capsule).unwrap().0;
        assert!(vel.y.abs() < 0.2, "fall speed should be absorbed, got {}", vel.y);
    }

    #[test]
    fn sphere_lands_on_box_top() {
        let mut world = World::new();
        world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.5, 0.0)),
            Collider::Box { half_extents: Vec3::splat(0.5) },
            BodyKind::Static,
            Velocity(Vec3::ZERO),
        ));
        let ball = world.spawn((
            Transform::from_position(Vec3::new(0.1, 1.3, 0.0)),
            Collider::Sphere { radius: 0.4 },
            BodyKind::Dynamic,
            Velocity(Vec3::new(0.0, -1.0, 0.0)),
        ));

        let events = resolve_contacts(&mut world, DT);

        assert_eq!(events.len(), 1);
        let pos = world.get::<&Transform>(ball).unwrap().position;
        assert!((pos.y - 1.4).abs() < 1e-5);
    }

    #[test]
    fn capsule_beside_box_is_pushed_sideways() {
        let mut world = World::new();
        world.spawn((
            Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
            Collider::Box { half_extents: Vec3::splat(1.0) },
            BodyKind::Static,
            Velocity(Vec3::ZERO),
        ));
        let capsule = world.spawn((
            Transform::from_position(Vec3::new(1.2, 1.0, 0.0)),
            Collider::Capsule { radius: 0.25, height: 0.5 },
            BodyKind::Dynamic,
            Velocity(Vec3::ZERO),
        ));

        resolve_contacts(&mut world, DT);

        let pos = world.get::<&Transform>(capsule).unwrap().position;
        assert!((pos.x - 1.25).abs() < 1e-5, "got {}", pos.x);
        assert!((pos.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn filtered_pairs_do_not_collide() {
        use crate::components::CollisionGroup;

        let mut world = World::new();
        let only_default = CollisionGroup::mask(&[CollisionGroup::Default]);
        for x in [0.0, 0.3] {
            world.spawn((
                Transform::from_position(Vec3::new(x, 1.0, 0.0)),
                Collider::Capsule { radius: 0.25, height: 0.5 },
                BodyKind::Dynamic,
                Velocity(Vec3::ZERO),
                CollisionFilter::new(CollisionGroup::Characters, only_default),
            ));
        }

        assert!(resolve_contacts(&mut world, DT).is_empty());
    }

    #[test]
    fn disabled_bodies_are_ignored() {
        let mut world = World::new();
        ground(&mut world);
        let e = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.1, 0.0)),
            Collider::Sphere { radius: 0.5 },
            BodyKind::Dynamic,
            Velocity(Vec3::ZERO),
            Disabled,
        ));

        assert!(resolve_contacts(&mut world, DT).is_empty());
        assert_eq!(world.get::<&Transform>(e).unwrap().position.y, 0.1);
    }

    #[test]
    fn friction_slows_sliding_sphere() {
        let mut world = World::new();
        ground(&mut world);
        let ball = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.45, 0.0)),
            Collider::Sphere { radius: 0.5 },
            BodyKind::Dynamic,
            Velocity(Vec3::new(2.0, -2.0, 0.0)),
            Friction(1.0),
        ));

        resolve_contacts(&mut world, DT);

        let vel = world.get::<&Velocity>(ball).unwrap().0;
        assert!(vel.x < 2.0 && vel.x > 0.0);
    }
}
