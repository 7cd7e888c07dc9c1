use glam::Vec3;

use crate::components::VehicleEntryInstance;
use crate::error::SeatError;
use crate::vehicle::{SeatKind, Vehicle, VehicleId};

impl VehicleEntryInstance {
    /// Walk from `from` to the seat's entry point, then into the seat.
    pub fn enter(
        vehicle: &Vehicle,
        seat: usize,
        from: Vec3,
        duration: f32,
        pre_entry_velocity: Vec3,
    ) -> Result<Self, SeatError> {
        let kind = vehicle.seat(seat)?.kind;
        Ok(Self {
            vehicle: vehicle.id(),
            seat,
            seat_kind: kind,
            path: vec![from, vehicle.entry_point(seat)?, vehicle.seat_anchor(seat)?],
            duration,
            elapsed: 0.0,
            pre_entry_velocity,
            holds_seat: false,
        })
    }

    /// Climb from the seat back out to its entry point.
    pub fn exit(vehicle: &Vehicle, seat: usize, duration: f32) -> Result<Self, SeatError> {
        let kind = vehicle.seat(seat)?.kind;
        Ok(Self {
            vehicle: vehicle.id(),
            seat,
            seat_kind: kind,
            path: vec![vehicle.seat_anchor(seat)?, vehicle.entry_point(seat)?],
            duration,
            elapsed: 0.0,
            pre_entry_velocity: Vec3::ZERO,
            holds_seat: true,
        })
    }

    /// 0 at the start of the path, 1 at the end.
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Whether the walk has gone beyond the last approach point and into the
    /// vehicle. Always false for a plain two-point path.
    pub fn is_past_door(&self) -> bool {
        if self.path.len() < 3 {
            return false;
        }
        let lengths: Vec<f32> = self.path.windows(2).map(|w| w[0].distance(w[1])).collect();
        let total: f32 = lengths.iter().sum();
        let to_door: f32 = lengths[..lengths.len() - 1].iter().sum();
        self.progress() * total > to_door
    }

    /// Back out of an interrupted entry: from where the character is now to
    /// the last approach point, at the speed the entry was moving.
    pub fn retreat(&self) -> Self {
        let here = self.position();
        let door = match self.path.len() {
            0 | 1 => here,
            n => self.path[n - 2],
        };
        let total: f32 = self.path.windows(2).map(|w| w[0].distance(w[1])).sum();
        let duration = if total > f32::EPSILON && self.duration > 0.0 {
            self.duration * here.distance(door) / total
        } else {
            0.0
        };
        Self {
            vehicle: self.vehicle,
            seat: self.seat,
            seat_kind: self.seat_kind,
            path: vec![here, door],
            duration,
            elapsed: 0.0,
            pre_entry_velocity: self.pre_entry_velocity,
            holds_seat: false,
        }
    }

    /// Move along the path by `dt` seconds and return the new position.
    pub fn advance(&mut self, dt: f32) -> Vec3 {
        if dt > 0.0 {
            self.elapsed = (self.elapsed + dt).min(self.duration);
        }
        self.position()
    }

    /// Point on the path at the current progress, at constant speed along its length.
    pub fn position(&self) -> Vec3 {
        let (Some(&first), Some(&last)) = (self.path.first(), self.path.last()) else {
            return Vec3::ZERO;
        };
        let total: f32 = self.path.windows(2).map(|w| w[0].distance(w[1])).sum();
        if total <= f32::EPSILON {
            return last;
        }

        let mut remaining = self.progress() * total;
        for w in self.path.windows(2) {
            let len = w[0].distance(w[1]);
            if remaining <= len {
                return if len > 0.0 { w[0].lerp(w[1], remaining / len) } else { w[0] };
            }
            remaining -= len;
        }
        if self.progress() <= 0.0 { first } else { last }
    }
}

/// Nearest free seat of `kind` over all vehicles, measured to the seat's entry point.
pub fn find_seat(vehicles: &[Vehicle], from: Vec3, kind: SeatKind, max_distance: f32) -> Option<(VehicleId, usize)> {
    vehicles
        .iter()
        .filter_map(|v| {
            v.nearest_free_seat(from, kind, max_distance)
                .map(|(seat, distance)| (v.id(), seat, distance))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(id, seat, _)| (id, seat))
}
