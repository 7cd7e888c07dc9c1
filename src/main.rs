use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stride::app::Simulation;
use stride::config::{CharacterConfig, PhysicsConfig};
use stride::engine::input::InputEvent;
use stride::error::SimulationError;
use stride::scene::test_scene::load_test_scene;

#[derive(Parser)]
#[command(name = "stride", about = "Headless character locomotion demo")]
struct Args {
    /// Character config in RON. Built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Simulated seconds to run
    #[arg(long, default_value_t = 6.0)]
    seconds: f32,
    /// Render frame rate feeding the fixed-step loop
    #[arg(long, default_value_t = 60.0)]
    frame_rate: f32,
    /// Log every state transition and landing
    #[arg(short, long)]
    verbose: bool,
}

fn key(at: f32, code: &str, pressed: bool) -> (f32, InputEvent) {
    (
        at,
        InputEvent::Key {
            code: code.to_string(),
            pressed,
        },
    )
}

/// Walk to the car, drive briefly, get out, jump, then sprint off to the side.
fn demo_script() -> Vec<(f32, InputEvent)> {
    vec![
        key(0.2, "KeyW", true),
        key(1.0, "KeyW", false),
        key(1.3, "KeyF", true),
        key(1.4, "KeyF", false),
        key(3.0, "KeyF", true),
        key(3.1, "KeyF", false),
        key(4.0, "Space", true),
        key(4.1, "Space", false),
        (4.5, InputEvent::PointerDelta { dx: 900.0, dy: 0.0 }),
        key(4.5, "KeyW", true),
        key(4.5, "ShiftLeft", true),
        key(5.5, "KeyW", false),
        key(5.5, "ShiftLeft", false),
    ]
}

fn main() -> Result<(), SimulationError> {
    let args = Args::parse();

    let default_level = if args.verbose { "stride=debug" } else { "stride=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = match &args.config {
        Some(path) => CharacterConfig::load(path)?,
        None => CharacterConfig::default(),
    };

    let mut sim = Simulation::new(PhysicsConfig::default())?.with_character_config(config);
    let (player, car) = load_test_scene(&mut sim)?;
    info!(%player, %car, seconds = args.seconds, "demo scene loaded");

    let script = demo_script();
    let mut next_event = 0;
    let frame_dt = 1.0 / args.frame_rate.max(1.0);
    let mut elapsed = 0.0_f32;
    let mut next_report = 0.0_f32;

    while elapsed < args.seconds {
        while let Some((at, event)) = script.get(next_event) {
            if *at > elapsed {
                break;
            }
            sim.handle_input(event.clone());
            next_event += 1;
        }

        let alpha = sim.advance(frame_dt)?;
        elapsed += frame_dt;

        if elapsed >= next_report {
            next_report += 1.0;
            if let Some(character) = sim.character(player) {
                let position = character.interpolated_position(sim.physics(), alpha)?;
                info!(
                    t = elapsed,
                    state = character.state().label(),
                    in_state = character.fsm().elapsed(),
                    animation = character.animation(),
                    x = position.x,
                    y = position.y,
                    z = position.z,
                    receiver = ?sim.receiver(),
                    "player"
                );
            }
        }
    }

    info!(seconds = elapsed, "demo finished");
    Ok(())
}
