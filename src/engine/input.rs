use std::collections::HashMap;

/// Logical actions a character or vehicle reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Jump,
    Run,
    Use,
    Enter,
    EnterPassenger,
    SeatSwitch,
    Primary,
    Secondary,
}

impl Action {
    pub const ALL: [Action; 12] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::Jump,
        Action::Run,
        Action::Use,
        Action::Enter,
        Action::EnterPassenger,
        Action::SeatSwitch,
        Action::Primary,
        Action::Secondary,
    ];

    /// Default input codes.
    pub fn default_codes(self) -> &'static [&'static str] {
        match self {
            Action::Up => &["KeyW"],
            Action::Down => &["KeyS"],
            Action::Left => &["KeyA"],
            Action::Right => &["KeyD"],
            Action::Jump => &["Space"],
            Action::Run => &["ShiftLeft"],
            Action::Use => &["KeyE"],
            Action::Enter => &["KeyF"],
            Action::EnterPassenger => &["KeyG"],
            Action::SeatSwitch => &["KeyX"],
            Action::Primary => &["Mouse0"],
            Action::Secondary => &["Mouse1"],
        }
    }

    pub fn is_movement(self) -> bool {
        matches!(self, Action::Up | Action::Down | Action::Left | Action::Right)
    }
}

/// Raw codes bound to one action plus its pressed / just-pressed / just-released state.
#[derive(Debug, Clone, Default)]
pub struct ActionBinding {
    pub codes: Vec<String>,
    pub is_pressed: bool,
    pub just_pressed: bool,
    pub just_released: bool,
}

impl ActionBinding {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            codes: codes.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Edges are only raised on an actual change; repeats of the same value are ignored.
    /// A raised edge stays up until `clear_edges`, so a press and release
    /// between two ticks still reads as a press.
    fn set(&mut self, pressed: bool) {
        if self.is_pressed == pressed {
            return;
        }
        self.is_pressed = pressed;
        if pressed {
            self.just_pressed = true;
        } else {
            self.just_released = true;
        }
    }

    fn clear_edges(&mut self) {
        self.just_pressed = false;
        self.just_released = false;
    }
}

/// Input delivered by the device layer.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A raw device code changed state.
    Key { code: String, pressed: bool },
    /// An already-resolved logical action changed state.
    Action { action: Action, pressed: bool },
    /// Relative pointer motion in pixels.
    PointerDelta { dx: f32, dy: f32 },
}

/// Every action binding of one input receiver.
#[derive(Debug, Clone)]
pub struct ActionSet {
    bindings: HashMap<Action, ActionBinding>,
}

impl Default for ActionSet {
    fn default() -> Self {
        Self {
            bindings: Action::ALL
                .iter()
                .map(|&a| (a, ActionBinding::new(a.default_codes())))
                .collect(),
        }
    }
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binding(&self, action: Action) -> Option<&ActionBinding> {
        self.bindings.get(&action)
    }

    /// Replace the codes bound to `action`, keeping its current state.
    pub fn rebind(&mut self, action: Action, codes: &[&str]) {
        let binding = self.bindings.entry(action).or_default();
        binding.codes = codes.iter().map(|c| c.to_string()).collect();
    }

    pub fn trigger(&mut self, action: Action, pressed: bool) {
        self.bindings.entry(action).or_default().set(pressed);
    }

    /// Feed a raw code to every action bound to it. Returns whether any matched.
    pub fn trigger_code(&mut self, code: &str, pressed: bool) -> bool {
        let mut matched = false;
        for binding in self.bindings.values_mut() {
            if binding.codes.iter().any(|c| c == code) {
                binding.set(pressed);
                matched = true;
            }
        }
        matched
    }

    #[inline]
    pub fn is_pressed(&self, action: Action) -> bool {
        self.bindings.get(&action).is_some_and(|b| b.is_pressed)
    }

    #[inline]
    pub fn just_pressed(&self, action: Action) -> bool {
        self.bindings.get(&action).is_some_and(|b| b.just_pressed)
    }

    #[inline]
    pub fn just_released(&self, action: Action) -> bool {
        self.bindings.get(&action).is_some_and(|b| b.just_released)
    }

    pub fn any_movement(&self) -> bool {
        Action::ALL.iter().any(|a| a.is_movement() && self.is_pressed(*a))
    }

    pub fn any_movement_just_pressed(&self) -> bool {
        Action::ALL.iter().any(|a| a.is_movement() && self.just_pressed(*a))
    }

    /// Clear one-tick edges. Call once at the end of every simulation tick.
    pub fn end_tick(&mut self) {
        for binding in self.bindings.values_mut() {
            binding.clear_edges();
        }
    }

    /// Release everything, e.g. when this set stops receiving input. Pending
    /// presses are dropped along with the held state.
    pub fn release_all(&mut self) {
        for binding in self.bindings.values_mut() {
            binding.set(false);
            binding.just_pressed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_raises_edge_for_one_tick() {
        let mut actions = ActionSet::new();
        actions.trigger(Action::Jump, true);

        assert!(actions.is_pressed(Action::Jump));
        assert!(actions.just_pressed(Action::Jump));

        actions.end_tick();
        assert!(actions.is_pressed(Action::Jump));
        assert!(!actions.just_pressed(Action::Jump));

        actions.trigger(Action::Jump, false);
        assert!(actions.just_released(Action::Jump));
    }

    #[test]
    fn repeated_press_is_not_a_new_edge() {
        let mut actions = ActionSet::new();
        actions.trigger(Action::Up, true);
        actions.end_tick();
        actions.trigger(Action::Up, true);
        assert!(!actions.just_pressed(Action::Up));
    }

    #[test]
    fn tap_between_ticks_still_reads_as_a_press() {
        let mut actions = ActionSet::new();
        actions.trigger_code("Space", true);
        actions.trigger_code("Space", false);

        assert!(!actions.is_pressed(Action::Jump));
        assert!(actions.just_pressed(Action::Jump));
        assert!(actions.just_released(Action::Jump));

        actions.end_tick();
        assert!(!actions.just_pressed(Action::Jump));
        assert!(!actions.just_released(Action::Jump));
    }

    #[test]
    fn codes_map_to_actions() {
        let mut actions = ActionSet::new();
        assert!(actions.trigger_code("KeyW", true));
        assert!(!actions.trigger_code("KeyQ", true));
        assert!(actions.is_pressed(Action::Up));
        assert!(actions.any_movement());

        actions.rebind(Action::Up, &["ArrowUp"]);
        actions.trigger_code("ArrowUp", false);
        assert!(!actions.is_pressed(Action::Up));
    }

    #[test]
    fn release_all_clears_held_actions() {
        let mut actions = ActionSet::new();
        actions.trigger(Action::Run, true);
        actions.trigger(Action::Left, true);

        actions.trigger(Action::Jump, true);

        actions.release_all();

        assert!(!actions.any_movement());
        assert!(actions.just_released(Action::Run));
        assert!(!actions.just_pressed(Action::Jump));
    }
}
