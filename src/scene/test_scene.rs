use glam::{Quat, Vec3};

use crate::app::Simulation;
use crate::components::{CharacterId, Collider};
use crate::error::SimulationError;
use crate::physics::BodyDesc;
use crate::scene::SpawnPoint;
use crate::vehicle::{SeatKind, VehicleDesc, VehicleId, VehicleSeat};

/// Two-seat car: driver on the right, passenger on the left. Entry points sit
/// at standing height beside the doors.
pub fn car(position: Vec3, rotation: Quat) -> VehicleDesc {
    VehicleDesc {
        position,
        rotation,
        half_extents: Vec3::new(1.0, 0.75, 2.0),
        seats: vec![
            VehicleSeat::new(SeatKind::Driver, Vec3::new(0.4, 0.2, 0.3), Vec3::new(1.6, -0.18, 0.3)).connected_to(1),
            VehicleSeat::new(SeatKind::Passenger, Vec3::new(-0.4, 0.2, 0.3), Vec3::new(-1.6, -0.18, 0.3))
                .connected_to(0),
        ],
    }
}

/// Build and populate the test scene.
/// Returns the controlled character and the car parked ahead of it.
pub fn load_test_scene(sim: &mut Simulation) -> Result<(CharacterId, VehicleId), SimulationError> {
    sim.add_static(
        BodyDesc::fixed(
            Collider::Plane {
                normal: Vec3::Y,
                offset: 0.0,
            },
            Vec3::ZERO,
        )
        .with_material(0.0, 0.5),
    );

    // Grey boxes scattered around spawn
    for &(x, z, h) in &[(6.0_f32, -4.0_f32, 2.0_f32), (-5.0, 3.0, 3.5), (3.0, 9.0, 1.5)] {
        sim.add_static(BodyDesc::fixed(
            Collider::Box {
                half_extents: Vec3::new(2.5, h / 2.0, 3.5),
            },
            Vec3::new(x, h / 2.0, z),
        ));
    }

    // Driver door lands on the x = 0 line a few meters ahead of spawn.
    let car = sim.add_vehicle(car(Vec3::new(-1.6, 0.75, 4.0), Quat::IDENTITY))?;

    let player = sim.spawn_character(&SpawnPoint::new(Vec3::new(0.0, 0.57, 0.0), Vec3::Z).controlled(), None)?;

    Ok((player, car))
}
