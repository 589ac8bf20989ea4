//! Upgrade catalog
//!
//! A fixed pool of named effects offered on level-up. Most are flags the
//! simulation consults; a few change live tuning or spawn balls.

use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use super::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    ScoreX2,
    ComboMaster,
    Multiball,
    BoxRewardUp,
    WellBoxDestroyer,
    MaxStressUp,
    StressReducer,
    WidePaddle,
    ExtraBall,
    PortalFrequency,
    Reflect,
    VerticalSpeed,
    HorizontalSpeed,
    WellPullUp,
    PortalDuration,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 15] = [
        UpgradeKind::ScoreX2,
        UpgradeKind::ComboMaster,
        UpgradeKind::Multiball,
        UpgradeKind::BoxRewardUp,
        UpgradeKind::WellBoxDestroyer,
        UpgradeKind::MaxStressUp,
        UpgradeKind::StressReducer,
        UpgradeKind::WidePaddle,
        UpgradeKind::ExtraBall,
        UpgradeKind::PortalFrequency,
        UpgradeKind::Reflect,
        UpgradeKind::VerticalSpeed,
        UpgradeKind::HorizontalSpeed,
        UpgradeKind::WellPullUp,
        UpgradeKind::PortalDuration,
    ];

    /// Stable key, also the persisted form
    pub fn key(self) -> &'static str {
        match self {
            UpgradeKind::ScoreX2 => "score_x2",
            UpgradeKind::ComboMaster => "combo_plus1",
            UpgradeKind::Multiball => "multi_full_burst",
            UpgradeKind::BoxRewardUp => "box_reward_up",
            UpgradeKind::WellBoxDestroyer => "blackhole_box_destroyer",
            UpgradeKind::MaxStressUp => "max_stress_plus20",
            UpgradeKind::StressReducer => "stress_reducer",
            UpgradeKind::WidePaddle => "cat_width_plus",
            UpgradeKind::ExtraBall => "extra_yarn",
            UpgradeKind::PortalFrequency => "portal_freq_plus",
            UpgradeKind::Reflect => "cat_reflect",
            UpgradeKind::VerticalSpeed => "vy_plus",
            UpgradeKind::HorizontalSpeed => "vx_plus",
            UpgradeKind::WellPullUp => "blackhole_pull_plus",
            UpgradeKind::PortalDuration => "portal_duration_up",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            UpgradeKind::ScoreX2 => "Score x2",
            UpgradeKind::ComboMaster => "Combo Master",
            UpgradeKind::Multiball => "Multiball",
            UpgradeKind::BoxRewardUp => "Riches",
            UpgradeKind::WellBoxDestroyer => "Singularity",
            UpgradeKind::MaxStressUp => "Zen Master",
            UpgradeKind::StressReducer => "Calm Cat",
            UpgradeKind::WidePaddle => "Wide Load",
            UpgradeKind::ExtraBall => "+1 Yarn",
            UpgradeKind::PortalFrequency => "Portal Network",
            UpgradeKind::Reflect => "Save",
            UpgradeKind::VerticalSpeed => "Vertical Velocity",
            UpgradeKind::HorizontalSpeed => "Horizontal Velocity",
            UpgradeKind::WellPullUp => "Event Horizon",
            UpgradeKind::PortalDuration => "Long Portals",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            UpgradeKind::ScoreX2 => "Doubles score per catch.",
            UpgradeKind::ComboMaster => "Adds 0.5 to any combo multiplier above 1.",
            UpgradeKind::Multiball => "Spawns 2 extra full-sized balls.",
            UpgradeKind::BoxRewardUp => "Boxes give 50% more XP and score on break.",
            UpgradeKind::WellBoxDestroyer => "Gravity wells destroy boxes they touch.",
            UpgradeKind::MaxStressUp => "Increases max stress by 20 (cap 200).",
            UpgradeKind::StressReducer => "Catching a ball relieves 5 extra stress.",
            UpgradeKind::WidePaddle => "Paddle is 12% wider (capped at half the screen).",
            UpgradeKind::ExtraBall => "Spawns a small, short-lived ball at the paddle.",
            UpgradeKind::PortalFrequency => "Portals appear 50% more often.",
            UpgradeKind::Reflect => "The next missed ball is bounced back into play.",
            UpgradeKind::VerticalSpeed => "Balls move 10% faster vertically.",
            UpgradeKind::HorizontalSpeed => "Balls move 10% faster horizontally.",
            UpgradeKind::WellPullUp => "Gravity wells pull 50% harder.",
            UpgradeKind::PortalDuration => "Portals stay open 2.5s longer.",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

/// Draw up to `n` distinct upgrades. The pool is rebuilt on every call, so
/// successive draws may repeat.
pub fn draw_choices(rng: &mut impl Rng, n: usize) -> Vec<UpgradeKind> {
    let pool = UpgradeKind::ALL;
    let amount = n.min(pool.len());
    index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|i| pool[i])
        .collect()
}

/// Unlock `kind` and run its immediate effect
pub fn apply(state: &mut GameState, kind: UpgradeKind, now_ms: u64) {
    state.progress.unlock_upgrade(kind.key());
    let step = state.tuning.speed_step;

    match kind {
        UpgradeKind::MaxStressUp => {
            state.progress.add_max_stress(state.tuning.max_stress_step);
        }
        UpgradeKind::WidePaddle => {
            let cap = state.screen.x * state.tuning.paddle_max_width_fraction;
            let width = (state.paddle.width * state.tuning.paddle_width_step).min(cap);
            state.paddle.resize(width, state.screen.x);
        }
        UpgradeKind::ExtraBall => {
            state.spawn_ball_at_paddle(true, now_ms);
        }
        UpgradeKind::Multiball => {
            state.spawn_ball_at_paddle(false, now_ms);
            state.spawn_ball_at_paddle(false, now_ms);
        }
        UpgradeKind::VerticalSpeed => {
            for ball in &mut state.balls {
                ball.vel.y *= step;
            }
            state.tuning.starting_vy *= step;
        }
        UpgradeKind::HorizontalSpeed => {
            for ball in &mut state.balls {
                ball.vel.x *= step;
            }
            state.tuning.min_vx *= step;
            state.tuning.max_vx *= step;
        }
        // Flags consulted during play
        UpgradeKind::ScoreX2
        | UpgradeKind::ComboMaster
        | UpgradeKind::BoxRewardUp
        | UpgradeKind::WellBoxDestroyer
        | UpgradeKind::StressReducer
        | UpgradeKind::PortalFrequency
        | UpgradeKind::Reflect
        | UpgradeKind::WellPullUp
        | UpgradeKind::PortalDuration => {}
    }

    log::info!("Upgrade applied: {} ({})", kind.title(), kind.key());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::Profile;
    use crate::tuning::Tuning;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashSet;

    fn state() -> GameState {
        GameState::new(3, Vec2::new(1080.0, 1920.0), Tuning::default(), &Profile::default(), 0)
    }

    #[test]
    fn test_keys_are_unique_and_round_trip() {
        let keys: HashSet<_> = UpgradeKind::ALL.iter().map(|k| k.key()).collect();
        assert_eq!(keys.len(), UpgradeKind::ALL.len());
        for kind in UpgradeKind::ALL {
            assert_eq!(UpgradeKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(UpgradeKind::from_key(""), None);
    }

    #[test]
    fn test_draw_is_distinct() {
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..50 {
            let choices = draw_choices(&mut rng, 3);
            assert_eq!(choices.len(), 3);
            let unique: HashSet<_> = choices.iter().collect();
            assert_eq!(unique.len(), 3);
        }
    }

    #[test]
    fn test_draw_more_than_pool() {
        let mut rng = Pcg32::seed_from_u64(11);
        assert_eq!(draw_choices(&mut rng, 40).len(), UpgradeKind::ALL.len());
        assert!(draw_choices(&mut rng, 0).is_empty());
    }

    #[test]
    fn test_wide_paddle_caps_and_recenters() {
        let mut state = state();
        for _ in 0..10 {
            apply(&mut state, UpgradeKind::WidePaddle, 0);
        }
        assert!((state.paddle.width - 540.0).abs() < 0.01);
        assert!((state.paddle.x - 270.0).abs() < 0.01);
    }

    #[test]
    fn test_ball_spawning_upgrades() {
        let mut state = state();
        apply(&mut state, UpgradeKind::ExtraBall, 100);
        assert_eq!(state.balls.len(), 2);
        assert!(state.balls[1].small);
        assert!(state.balls[1].vel.y < 0.0);

        apply(&mut state, UpgradeKind::Multiball, 100);
        assert_eq!(state.balls.len(), 4);
        assert!(state.balls[2..].iter().all(|b| !b.small));
    }

    #[test]
    fn test_speed_upgrades_scale_tuning() {
        let mut state = state();
        let before = state.balls[0].vel;
        apply(&mut state, UpgradeKind::VerticalSpeed, 0);
        apply(&mut state, UpgradeKind::HorizontalSpeed, 0);
        assert!((state.balls[0].vel.y - before.y * 1.1).abs() < 1e-4);
        assert!((state.balls[0].vel.x - before.x * 1.1).abs() < 1e-4);
        assert!((state.tuning.starting_vy - 22.0).abs() < 1e-4);
        assert!((state.tuning.max_vx - 22.0).abs() < 1e-4);
    }

    #[test]
    fn test_max_stress_up() {
        let mut state = state();
        apply(&mut state, UpgradeKind::MaxStressUp, 0);
        assert_eq!(state.progress.max_stress(), 120.0);
        assert!(state.progress.has(UpgradeKind::MaxStressUp));
    }
}
