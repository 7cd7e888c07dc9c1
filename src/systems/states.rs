use glam::Vec3;

use crate::components::{CharacterState, GroundContact, GroundImpactData, VehicleEntryInstance, VelocityMode};
use crate::config::{CharacterConfig, LocomotionConfig, SpringParams};
use crate::engine::input::{Action, ActionSet};
use crate::systems::intent::{MotionProfile, Steering};
use crate::vehicle::{SeatKind, VehicleId};

// ---------------------------------------------------------------------------
// Transition inputs
// ---------------------------------------------------------------------------

/// Vehicle-related facts gathered by the character before evaluation.
///
/// Building these needs the vehicle list; keeping them as plain data lets the
/// transition rules stay pure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleSignals {
    /// Set when `enter`/`enter_passenger` was pressed near a free seat.
    pub entry_candidate: Option<VehicleEntryInstance>,
    /// The vehicle of the current entry/seat/exit no longer exists.
    pub vehicle_lost: bool,
    /// Someone else occupied the seat this character is walking to.
    pub seat_taken: bool,
    /// Entry cancelled from outside (`Character::cancel_vehicle_entry`).
    pub cancel_requested: bool,
    /// Exit path when the occupant asked to get out.
    pub exit: Option<VehicleEntryInstance>,
    /// Free connected seat to move to.
    pub switch_to: Option<(usize, SeatKind)>,
}

/// Everything transition predicates look at. Built once per tick, after the
/// physics post-step, so ground and impact data are fresh.
pub struct StateCtx<'a> {
    pub actions: &'a ActionSet,
    pub ground: &'a GroundContact,
    /// Body velocity after the last step.
    pub velocity: Vec3,
    pub impact: &'a GroundImpactData,
    pub config: &'a LocomotionConfig,
    pub signals: &'a VehicleSignals,
}

/// A jump wind-up just finished; the next pre-step applies the launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpLaunch {
    pub running: bool,
}

/// Spring and blending setup a state applies when it becomes active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateTuning {
    pub velocity: SpringParams,
    pub rotation: SpringParams,
    pub mode: VelocityMode,
    pub influence: Vec3,
}

const GROUND_INFLUENCE: Vec3 = Vec3::new(1.0, 0.0, 1.0);

// ---------------------------------------------------------------------------
// CharacterState transition logic
// ---------------------------------------------------------------------------

impl CharacterState {
    /// Advance timers stored inside state variants. Returns a launch when a
    /// jump wind-up completes this tick.
    pub fn tick_timers(&mut self, dt: f32, config: &LocomotionConfig) -> Option<JumpLaunch> {
        match self {
            Self::Run { timer } => *timer += dt,
            Self::DropRolling { timer, .. } => *timer += dt,
            Self::JumpIdle { timer, air_time } => {
                return advance_jump(timer, air_time, dt, config.jump_idle_delay, false);
            }
            Self::JumpRunning { timer, air_time } => {
                return advance_jump(timer, air_time, dt, config.jump_running_delay, true);
            }
            _ => {}
        }
        None
    }

    /// Vehicle-tier rules. Highest priority.
    fn vehicle_transition(&self, ctx: &StateCtx) -> Option<CharacterState> {
        let signals = ctx.signals;
        match self {
            Self::EnteringVehicle { entry } => {
                let interrupted = signals.vehicle_lost
                    || signals.seat_taken
                    || signals.cancel_requested
                    || ctx.actions.any_movement_just_pressed();
                if interrupted {
                    Some(Self::Idle)
                } else if entry.is_complete() {
                    Some(seated(entry.vehicle, entry.seat, entry.seat_kind))
                } else {
                    None
                }
            }

            Self::Driving { vehicle, .. } | Self::Seated { vehicle, .. } => {
                if signals.vehicle_lost {
                    Some(Self::Idle)
                } else if let Some(exit) = &signals.exit {
                    Some(Self::ExitingVehicle { exit: exit.clone() })
                } else {
                    signals.switch_to.map(|(seat, kind)| seated(*vehicle, seat, kind))
                }
            }

            Self::ExitingVehicle { exit } => {
                if signals.vehicle_lost || exit.is_complete() {
                    Some(Self::Idle)
                } else {
                    None
                }
            }

            _ if self.is_grounded_locomotion() && ctx.ground.has_hit => signals
                .entry_candidate
                .clone()
                .map(|entry| Self::EnteringVehicle { entry }),

            _ => None,
        }
    }

    /// Ground/air rules: losing the ground and landing.
    fn ground_transition(&self, ctx: &StateCtx) -> Option<CharacterState> {
        let grounded = ctx.ground.has_hit;
        match self {
            _ if self.is_grounded_locomotion() => (!grounded).then_some(Self::Falling),

            Self::JumpIdle { air_time, .. } | Self::JumpRunning { air_time, .. } => match air_time {
                // Still winding up: walking off an edge cancels the jump.
                None => (!grounded).then_some(Self::Falling),
                Some(t) => {
                    if grounded && *t >= ctx.config.jump_min_air_time.max(f32::EPSILON) {
                        Some(landing(ctx))
                    } else if !grounded && ctx.velocity.y <= 0.0 {
                        Some(Self::Falling)
                    } else {
                        None
                    }
                }
            },

            Self::Falling => grounded.then(|| landing(ctx)),

            _ => None,
        }
    }

    /// Locomotion-tier rules. Each arm covers all transitions out of one state.
    pub fn next(&self, ctx: &StateCtx) -> Option<CharacterState> {
        let cfg = ctx.config;
        let moving = ctx.actions.any_movement();
        let running = ctx.actions.is_pressed(Action::Run);
        let jump = ctx.actions.just_pressed(Action::Jump);

        match self {
            Self::Idle => {
                if jump        { Some(Self::JumpIdle { timer: 0.0, air_time: None }) }
                else if moving { Some(Self::Walk) }
                else           { None }
            }

            Self::Walk => {
                if jump         { Some(Self::JumpRunning { timer: 0.0, air_time: None }) }
                else if !moving { Some(Self::Idle) }
                else if running { Some(Self::Run { timer: 0.0 }) }
                else            { None }
            }

            Self::Run { timer } => {
                if jump                            { Some(Self::JumpRunning { timer: 0.0, air_time: None }) }
                else if !moving                    { Some(Self::Idle) }
                else if !running                   { Some(Self::Walk) }
                else if *timer >= cfg.sprint_delay { Some(Self::Sprint) }
                else                               { None }
            }

            Self::Sprint => {
                if jump          { Some(Self::JumpRunning { timer: 0.0, air_time: None }) }
                else if !moving  { Some(Self::Idle) }
                else if !running { Some(Self::Walk) }
                else             { None }
            }

            Self::DropRolling { timer, .. } => {
                if *timer < cfg.drop_roll_duration { None }
                else if ctx.ground.has_hit          { Some(Self::Idle) }
                else                                { Some(Self::Falling) }
            }

            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    /// States that stay valid while the ground probe misses.
    pub fn is_airborne_compatible(&self) -> bool {
        matches!(
            self,
            Self::Falling | Self::JumpIdle { .. } | Self::JumpRunning { .. } | Self::DropRolling { .. }
        )
    }

    pub fn is_grounded_locomotion(&self) -> bool {
        matches!(self, Self::Idle | Self::Walk | Self::Run { .. } | Self::Sprint)
    }

    /// The body is disabled and the character follows a vehicle.
    pub fn is_vehicle_state(&self) -> bool {
        matches!(
            self,
            Self::EnteringVehicle { .. } | Self::Driving { .. } | Self::Seated { .. } | Self::ExitingVehicle { .. }
        )
    }

    /// Vehicle this state is tied to, if any.
    pub fn vehicle(&self) -> Option<VehicleId> {
        match self {
            Self::EnteringVehicle { entry } => Some(entry.vehicle),
            Self::ExitingVehicle { exit } => Some(exit.vehicle),
            Self::Driving { vehicle, .. } | Self::Seated { vehicle, .. } => Some(*vehicle),
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walk => "walk",
            Self::Run { .. } => "run",
            Self::Sprint => "sprint",
            Self::JumpIdle { .. } => "jump_idle",
            Self::JumpRunning { .. } => "jump_running",
            Self::Falling => "falling",
            Self::DropRolling { .. } => "drop_rolling",
            Self::EnteringVehicle { .. } => "entering_vehicle",
            Self::Driving { .. } => "driving",
            Self::Seated { .. } => "seated",
            Self::ExitingVehicle { .. } => "exiting_vehicle",
        }
    }

    /// Clip the animation layer should play.
    pub fn animation(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walk | Self::Run { .. } => "run",
            Self::Sprint => "sprint",
            Self::JumpIdle { .. } => "jump_idle",
            Self::JumpRunning { .. } => "jump_running",
            Self::Falling => "falling",
            Self::DropRolling { .. } => "drop_running_roll",
            Self::EnteringVehicle { .. } => "sit_down",
            Self::Driving { .. } => "driving",
            Self::Seated { .. } => "sitting",
            Self::ExitingVehicle { .. } => "stand_up",
        }
    }

    // -----------------------------------------------------------------------
    // Per-state motion parameters
    // -----------------------------------------------------------------------

    /// How the intent resolver should steer this tick.
    pub fn motion_profile(&self, cfg: &LocomotionConfig) -> MotionProfile {
        match self {
            Self::Walk => MotionProfile::camera_relative(cfg.walk_multiplier),
            Self::Run { .. } => MotionProfile::camera_relative(cfg.run_multiplier),
            Self::Sprint => MotionProfile::camera_relative(cfg.sprint_multiplier),
            Self::JumpIdle { air_time: None, .. } => MotionProfile::STILL,
            Self::JumpIdle { .. } | Self::JumpRunning { .. } | Self::Falling => {
                MotionProfile::camera_relative(cfg.air_multiplier)
            }
            Self::DropRolling { .. } => MotionProfile {
                speed_multiplier: cfg.roll_multiplier,
                steering: Steering::Forward,
            },
            _ => MotionProfile::STILL,
        }
    }

    /// Springs and blending for this state. Re-applied on entry and at jump launch.
    pub fn tuning(&self, config: &CharacterConfig) -> StateTuning {
        let springs = &config.springs;
        let mut tuning = StateTuning {
            velocity: springs.velocity,
            rotation: springs.rotation,
            mode: VelocityMode::Replace,
            influence: GROUND_INFLUENCE,
        };
        let airborne = |t: &mut StateTuning| {
            t.mode = VelocityMode::Additive;
            t.influence = config.locomotion.air_influence;
            t.rotation = springs.air_rotation.apply(t.rotation);
        };

        match self {
            Self::Sprint => {
                tuning.velocity = springs.sprint_velocity.apply(tuning.velocity);
                tuning.rotation = springs.sprint_rotation.apply(tuning.rotation);
            }
            Self::JumpIdle { air_time: Some(_), .. } => airborne(&mut tuning),
            Self::JumpRunning { air_time, .. } => {
                tuning.velocity = springs.heavy_velocity.apply(tuning.velocity);
                if air_time.is_some() {
                    airborne(&mut tuning);
                }
            }
            Self::Falling => {
                tuning.velocity = springs.heavy_velocity.apply(tuning.velocity);
                airborne(&mut tuning);
            }
            Self::DropRolling { .. } => {
                tuning.velocity = springs.roll_velocity.apply(tuning.velocity);
            }
            _ => {}
        }
        tuning
    }
}

fn advance_jump(timer: &mut f32, air_time: &mut Option<f32>, dt: f32, delay: f32, running: bool) -> Option<JumpLaunch> {
    match air_time {
        Some(t) => {
            *t += dt;
            None
        }
        None => {
            *timer += dt;
            if *timer >= delay {
                *air_time = Some(0.0);
                Some(JumpLaunch { running })
            } else {
                None
            }
        }
    }
}

fn seated(vehicle: VehicleId, seat: usize, kind: SeatKind) -> CharacterState {
    match kind {
        SeatKind::Driver => CharacterState::Driving { vehicle, seat },
        SeatKind::Passenger => CharacterState::Seated { vehicle, seat },
    }
}

/// Pick the state a touchdown leads to.
fn landing(ctx: &StateCtx) -> CharacterState {
    let cfg = ctx.config;
    let impact_speed = -ctx.impact.velocity.y;
    let horizontal = Vec3::new(ctx.impact.velocity.x, 0.0, ctx.impact.velocity.z).length();

    if impact_speed > cfg.drop_roll_threshold {
        CharacterState::DropRolling { timer: 0.0, impact_speed }
    } else if horizontal > cfg.landing_walk_speed {
        // Holding run promotes Walk to Run on the following tick.
        CharacterState::Walk
    } else {
        CharacterState::Idle
    }
}

/// Evaluate one tick's transition. At most one fires; vehicle rules win over
/// ground/air rules, which win over plain locomotion.
pub fn evaluate(state: &CharacterState, ctx: &StateCtx) -> Option<CharacterState> {
    state
        .vehicle_transition(ctx)
        .or_else(|| state.ground_transition(ctx))
        .or_else(|| state.next(ctx))
}
