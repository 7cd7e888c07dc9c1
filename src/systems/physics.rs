use glam::{Quat, Vec3};
use hecs::{Entity, World};

use crate::components::{
    AngularVelocity, BodyKind, Disabled, PreContactVelocity, PreviousPosition, RotationLocked,
    Transform, Velocity,
};

/// Record where every moving body starts this step so the renderer can
/// interpolate between the previous and current fixed-step positions.
pub fn snapshot_previous_positions(world: &mut World) {
    // Collect first (drops the borrow), then insert/update.
    let snapshots: Vec<(Entity, Vec3)> = world
        .query::<(&Transform, &BodyKind, Option<&Disabled>)>()
        .iter()
        .filter(|(_, (_, kind, disabled))| **kind != BodyKind::Static && disabled.is_none())
        .map(|(e, (t, _, _))| (e, t.position))
        .collect();

    for (entity, pos) in snapshots {
        let _ = world.insert_one(entity, PreviousPosition(pos));
    }
}

/// Semi-implicit Euler: gravity into velocity first, then velocity into position.
pub fn integrate_bodies(world: &mut World, gravity: Vec3, dt: f32) {
    for (_entity, (transform, vel, kind, angular, locked, disabled)) in world.query_mut::<(
        &mut Transform,
        &mut Velocity,
        &BodyKind,
        Option<&AngularVelocity>,
        Option<&RotationLocked>,
        Option<&Disabled>,
    )>() {
        if disabled.is_some() {
            continue;
        }
        match kind {
            BodyKind::Static => continue,
            BodyKind::Dynamic => vel.0 += gravity * dt,
        }
        transform.position += vel.0 * dt;

        if let (Some(angular), None) = (angular, locked) {
            let spin = angular.0 * dt;
            let angle = spin.length();
            if angle > 1e-9 {
                let delta = Quat::from_axis_angle(spin / angle, angle);
                transform.rotation = (delta * transform.rotation).normalize();
            }
        }
    }
}

/// Store each dynamic body's velocity before contacts rewrite it.
pub fn snapshot_pre_contact_velocities(world: &mut World) {
    let snapshots: Vec<(Entity, Vec3)> = world
        .query::<(&Velocity, &BodyKind, Option<&Disabled>)>()
        .iter()
        .filter(|(_, (_, kind, disabled))| **kind == BodyKind::Dynamic && disabled.is_none())
        .map(|(e, (v, _, _))| (e, v.0))
        .collect();

    for (entity, vel) in snapshots {
        let _ = world.insert_one(entity, PreContactVelocity(vel));
    }
}
