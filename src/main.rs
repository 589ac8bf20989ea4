//! Paw Pong headless runner
//!
//! Plays one run with a simple autopilot against a simulated 60 FPS clock,
//! then prints the final HUD and saves the profile.
//!
//! Usage: `paw-pong [tuning.json] [profile.json]`. `PAW_PONG_SEED` picks
//! the run seed and `RUST_LOG` controls verbosity.

#[cfg(not(target_arch = "wasm32"))]
mod autopilot {
    use paw_pong::sim::{GameState, Steer};

    /// Paddle stops chasing once this close to the target
    const DEADBAND: f32 = 12.0;

    /// Chase the lowest falling ball, or the first ball if none is falling
    pub fn steer(state: &GameState) -> Steer {
        let target = state
            .balls
            .iter()
            .filter(|ball| ball.vel.y > 0.0)
            .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
            .or_else(|| state.balls.first());
        let Some(ball) = target else {
            return Steer::None;
        };

        let dx = ball.center().x - state.paddle.center_x();
        if dx < -DEADBAND {
            Steer::Left
        } else if dx > DEADBAND {
            Steer::Right
        } else {
            Steer::None
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> paw_pong::Result<()> {
    use glam::Vec2;
    use paw_pong::consts::{FRAME_TIME_MS, TARGET_FPS};
    use paw_pong::sim::{GamePhase, GameState, Notification, TickInput, tick};
    use paw_pong::{Profile, Tuning};

    /// Portrait phone-sized playfield
    const SCREEN: Vec2 = Vec2::new(1080.0, 1920.0);
    /// Give up after ten simulated minutes
    const MAX_FRAMES: u64 = TARGET_FPS as u64 * 60 * 10;

    env_logger::init();
    log::info!("Paw Pong (headless) starting...");

    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => Tuning::load(path)?,
        None => Tuning::default(),
    };
    let profile_path = args
        .next()
        .unwrap_or_else(|| "paw_pong_profile.json".to_string());
    let profile = Profile::load(&profile_path)?;
    let seed = std::env::var("PAW_PONG_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0x5EED);

    let mut state = GameState::new(seed, SCREEN, tuning, &profile, 0);
    // The autopilot answers level-ups itself
    state.attach_ui(true);

    let mut now = 0;
    for frame in 0..MAX_FRAMES {
        now += FRAME_TIME_MS;
        let input = TickInput {
            steer: autopilot::steer(&state),
            start_motion: frame == 0,
        };
        let out = tick(&mut state, &input, now);

        for note in out.notifications {
            match note {
                Notification::LevelUp { level, choices, .. } => match choices.first() {
                    Some(choice) => {
                        log::info!("Autopilot takes {} at level {}", choice.title(), level);
                        state.apply_upgrade(choice.key(), now);
                    }
                    None => state.skip_upgrade(),
                },
                Notification::GameOver {
                    final_score,
                    high_score,
                } => {
                    println!(
                        "Game over after {frame} frames: score {final_score}, best {high_score}"
                    );
                }
            }
        }

        if state.phase() == GamePhase::GameOver {
            break;
        }
    }

    let snapshot = state.snapshot(now);
    println!("{}", serde_json::to_string_pretty(&snapshot.hud)?);
    state.profile().save(&profile_path)?;
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is the product on wasm; there is no headless runner
}
