/// Holder for a single active state value.
///
/// `S` is normally a data-carrying enum. The machine only remembers which
/// state is active and for how long it has run; deciding *when* to move is the
/// job of whoever drives it (see `systems::states::evaluate`).
///
/// Replacing the state is a single assignment, so a reader can never observe
/// zero or two active states.
#[derive(Debug, Clone)]
pub struct StateMachine<S> {
    state: S,
    /// Seconds spent in the current state. Reset on each transition.
    elapsed: f32,
}

impl<S> StateMachine<S> {
    pub fn new(initial: S) -> Self {
        Self {
            state: initial,
            elapsed: 0.0,
        }
    }

    #[inline]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutable access for per-variant timers. Swapping the variant through this
    /// skips the timer reset; use [`force_go`](Self::force_go) for that.
    #[inline]
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Switch to `next`, even if it is the same variant, e.g. to restart a
    /// state with new data. Returns the state left behind.
    pub fn force_go(&mut self, next: S) -> S {
        self.elapsed = 0.0;
        std::mem::replace(&mut self.state, next)
    }

    /// Advance the in-state timer. Call once per tick before evaluating transitions.
    pub fn tick(&mut self, dt: f32) {
        self.elapsed += dt;
    }
}
