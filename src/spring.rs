//! Spring simulators used to smooth velocity and facing.
//!
//! A simulator advances a damped spring in fixed sub-steps (`1 / frame_rate`)
//! no matter how the caller slices time. Leftover time is carried to the next
//! call, and the exposed value is interpolated between the last two sub-steps,
//! so any sequence of deltas with the same total lands on the same result.
//!
//! Per sub-step:
//!
//! ```text
//! velocity += (target - position) / mass
//! velocity *= damping
//! position += velocity
//! ```

use std::f32::consts::{PI, TAU};
use std::ops::{Add, Mul, Sub};

use glam::Vec3;

use crate::config::SpringParams;
use crate::error::ConfigError;

/// A quantity a spring can drive.
pub trait SpringValue: Copy + Add<Output = Self> + Mul<f32, Output = Self> {
    const ZERO: Self;

    /// Signed offset that takes `from` to `to`.
    fn displacement(from: Self, to: Self) -> Self;

    /// Bring the value back into its canonical range.
    #[inline]
    fn canonical(self) -> Self {
        self
    }

    #[inline]
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        (a + Self::displacement(a, b) * t).canonical()
    }
}

impl SpringValue for f32 {
    const ZERO: Self = 0.0;

    #[inline]
    fn displacement(from: Self, to: Self) -> Self {
        to - from
    }
}

impl SpringValue for Vec3 {
    const ZERO: Self = Vec3::ZERO;

    #[inline]
    fn displacement(from: Self, to: Self) -> Self {
        to - from
    }
}

/// Angle in radians, kept in `(-π, π]`. Displacement is the signed shortest arc.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Angle(pub f32);

impl Angle {
    pub fn wrapped(radians: f32) -> Self {
        let mut a = (radians + PI).rem_euclid(TAU) - PI;
        if a <= -PI {
            a += TAU;
        }
        Self(a)
    }
}

impl Add for Angle {
    type Output = Angle;
    fn add(self, rhs: Angle) -> Angle {
        Angle(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Angle;
    fn sub(self, rhs: Angle) -> Angle {
        Angle(self.0 - rhs.0)
    }
}

impl Mul<f32> for Angle {
    type Output = Angle;
    fn mul(self, rhs: f32) -> Angle {
        Angle(self.0 * rhs)
    }
}

impl SpringValue for Angle {
    const ZERO: Self = Angle(0.0);

    fn displacement(from: Self, to: Self) -> Self {
        Angle::wrapped(to.0 - from.0)
    }

    fn canonical(self) -> Self {
        Angle::wrapped(self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame<V> {
    position: V,
    velocity: V,
}

#[derive(Debug, Clone)]
pub struct SpringSimulator<V: SpringValue> {
    frame_time: f32,
    mass: f32,
    damping: f32,
    target: V,
    position: V,
    velocity: V,
    /// Time carried over that did not make a whole sub-step.
    offset: f32,
    /// The last two sub-step results: `[older, newer]`.
    cache: [Frame<V>; 2],
}

/// Smooths a 3D vector, e.g. the arcade velocity.
pub type VectorSpringSimulator = SpringSimulator<Vec3>;
/// Smooths a plain scalar, e.g. steering input.
pub type ScalarSpringSimulator = SpringSimulator<f32>;
/// Smooths a heading toward a target along the shortest arc.
pub type AngleSpringSimulator = SpringSimulator<Angle>;

impl<V: SpringValue> SpringSimulator<V> {
    pub fn new(frame_rate: f32, mass: f32, damping: f32) -> Result<Self, ConfigError> {
        Self::from_params(SpringParams::new(frame_rate, mass, damping))
    }

    pub fn from_params(params: SpringParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let rest = Frame {
            position: V::ZERO,
            velocity: V::ZERO,
        };
        Ok(Self {
            frame_time: 1.0 / params.frame_rate,
            mass: params.mass,
            damping: params.damping,
            target: V::ZERO,
            position: V::ZERO,
            velocity: V::ZERO,
            offset: 0.0,
            cache: [rest; 2],
        })
    }

    #[inline]
    pub fn position(&self) -> V {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> V {
        self.velocity
    }

    #[inline]
    pub fn target(&self) -> V {
        self.target
    }

    pub fn set_target(&mut self, target: V) {
        self.target = target.canonical();
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// Retune mass and damping. Values are checked the same way as at construction.
    pub fn retune(&mut self, mass: f32, damping: f32) -> Result<(), ConfigError> {
        SpringParams::new(1.0 / self.frame_time, mass, damping).validate()?;
        self.mass = mass;
        self.damping = damping;
        Ok(())
    }

    /// Snap to a state with no history. The target is left untouched.
    pub fn reset(&mut self, position: V, velocity: V) {
        let position = position.canonical();
        self.position = position;
        self.velocity = velocity;
        self.offset = 0.0;
        self.cache = [Frame { position, velocity }; 2];
    }

    /// Advance by `dt` seconds and return the interpolated `(position, velocity)`.
    /// A non-positive `dt` changes nothing.
    pub fn simulate(&mut self, dt: f32) -> (V, V) {
        if !(dt > 0.0) {
            return (self.position, self.velocity);
        }

        let total = self.offset + dt;
        let frames = (total / self.frame_time).floor();
        self.offset = (total - frames * self.frame_time).max(0.0);

        for _ in 0..frames as u64 {
            let last = self.cache[1];
            let next = self.spring_frame(last);
            self.cache = [last, next];
        }

        let t = (self.offset / self.frame_time).clamp(0.0, 1.0);
        let [older, newer] = self.cache;
        self.position = V::interpolate(older.position, newer.position, t);
        self.velocity = V::interpolate(older.velocity, newer.velocity, t);
        (self.position, self.velocity)
    }

    fn spring_frame(&self, frame: Frame<V>) -> Frame<V> {
        let pull = V::displacement(frame.position, self.target) * (1.0 / self.mass);
        let velocity = (frame.velocity + pull) * self.damping;
        let position = (frame.position + velocity).canonical();
        Frame { position, velocity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walker() -> VectorSpringSimulator {
        let mut sim = VectorSpringSimulator::new(60.0, 50.0, 0.8).unwrap();
        sim.set_target(Vec3::new(0.0, 0.0, 4.0));
        sim
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(VectorSpringSimulator::new(60.0, 0.0, 0.8), Err(ConfigError::SpringMass(_))));
        assert!(matches!(ScalarSpringSimulator::new(60.0, 10.0, 0.0), Err(ConfigError::SpringDamping(_))));
        assert!(matches!(AngleSpringSimulator::new(0.0, 10.0, 0.5), Err(ConfigError::SpringFrameRate(_))));
    }

    #[test]
    fn same_total_time_same_result() {
        let mut coarse = walker();
        let mut fine = walker();
        let mut ragged = walker();

        coarse.simulate(0.5);
        for _ in 0..50 {
            fine.simulate(0.01);
        }
        for dt in [0.013, 0.2, 0.001, 0.087, 0.05, 0.149] {
            ragged.simulate(dt);
        }

        let (p0, v0) = (coarse.position(), coarse.velocity());
        for sim in [&fine, &ragged] {
            assert!((sim.position() - p0).length() < 1e-3, "{:?} vs {:?}", sim.position(), p0);
            assert!((sim.velocity() - v0).length() < 1e-3);
        }
    }

    #[test]
    fn repeated_set_target_is_idempotent() {
        let mut once = walker();
        let mut many = walker();
        for _ in 0..5 {
            many.set_target(Vec3::new(0.0, 0.0, 4.0));
        }

        for _ in 0..20 {
            once.simulate(1.0 / 60.0);
            many.set_target(Vec3::new(0.0, 0.0, 4.0));
            many.set_target(Vec3::new(0.0, 0.0, 4.0));
            many.simulate(1.0 / 60.0);
        }

        assert_eq!(once.position(), many.position());
        assert_eq!(once.velocity(), many.velocity());
    }

    #[test]
    fn non_positive_delta_is_a_no_op() {
        let mut sim = walker();
        sim.simulate(0.1);
        let before = (sim.position(), sim.velocity());

        assert_eq!(sim.simulate(0.0), before);
        assert_eq!(sim.simulate(-1.0), before);
        assert_eq!(sim.simulate(f32::NAN), before);

        // Carried offset is untouched too: the next real step matches a fresh run.
        let mut reference = walker();
        reference.simulate(0.1);
        reference.simulate(0.05);
        sim.simulate(0.05);
        assert_eq!(sim.position(), reference.position());
    }

    #[test]
    fn converges_on_target() {
        let mut sim = walker();
        for _ in 0..600 {
            sim.simulate(1.0 / 60.0);
        }
        assert!((sim.position() - Vec3::new(0.0, 0.0, 4.0)).length() < 1e-3);
    }

    #[test]
    fn sub_step_leftover_interpolates() {
        // Quarter-second sub-steps keep the arithmetic exact.
        let mut sim = ScalarSpringSimulator::new(4.0, 1.0, 0.5).unwrap();
        sim.set_target(1.0);

        // Half a sub-step: nothing generated yet.
        assert_eq!(sim.simulate(0.125), (0.0, 0.0));
        // One whole sub-step with no leftover exposes the older cached frame.
        assert_eq!(sim.simulate(0.125), (0.0, 0.0));
        // Halfway toward the first frame (v = 0.5, p = 0.5).
        let (p, v) = sim.simulate(0.125);
        assert!((p - 0.25).abs() < 1e-6, "got {p}");
        assert!((v - 0.25).abs() < 1e-6);
    }

    #[test]
    fn angle_takes_shortest_arc() {
        let mut sim = AngleSpringSimulator::new(60.0, 10.0, 0.5).unwrap();
        sim.reset(Angle(3.0), Angle::ZERO);
        sim.set_target(Angle(-3.0));

        let (p, _) = sim.simulate(1.5 / 60.0);

        // -3.0 is 0.28 rad away through π, so the heading grows past 3.0 and wraps.
        assert!(p.0 > 3.0 || p.0 < -3.0, "moved the long way: {}", p.0);
        assert!(p.0 > -PI && p.0 <= PI);
    }

    #[test]
    fn angle_wrapping() {
        assert!((Angle::wrapped(3.0 * PI).0 - PI).abs() < 1e-5);
        assert!((Angle::wrapped(-PI).0 - PI).abs() < 1e-5);
        assert!((Angle::wrapped(0.5).0 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn retune_validates() {
        let mut sim = walker();
        assert!(sim.retune(100.0, 0.3).is_ok());
        assert_eq!(sim.mass(), 100.0);
        assert!(sim.retune(-1.0, 0.3).is_err());
        assert_eq!(sim.mass(), 100.0);
    }
}
