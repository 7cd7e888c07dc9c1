/// Turns variable frame times into a whole number of fixed simulation ticks.
///
/// Leftover time stays in the accumulator; [`alpha`](Self::alpha) says how far
/// the next render frame sits between the previous and current tick.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: f32,
    accumulator: f32,
    max_frame: f32,
}

impl FixedTimestep {
    /// Frames longer than this are clamped so a stall does not trigger a burst of ticks.
    pub const DEFAULT_MAX_FRAME: f32 = 0.25;

    pub fn new(step: f32) -> Self {
        Self {
            step,
            accumulator: 0.0,
            max_frame: Self::DEFAULT_MAX_FRAME,
        }
    }

    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Add one frame's elapsed time. Non-positive or non-finite input is ignored.
    pub fn accumulate(&mut self, frame_dt: f32) {
        if frame_dt.is_finite() && frame_dt > 0.0 {
            self.accumulator += frame_dt.min(self.max_frame);
        }
    }

    /// Take one tick's worth of time if available.
    pub fn consume(&mut self) -> bool {
        if self.accumulator >= self.step {
            self.accumulator -= self.step;
            true
        } else {
            false
        }
    }

    /// Fraction of a tick left in the accumulator, in `[0, 1)`.
    #[inline]
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.step).clamp(0.0, 1.0)
    }
}
