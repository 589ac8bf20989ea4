//! Level-up and game-over arbiter
//!
//! Watches progress thresholds after each frame, pauses the simulation and
//! hands notifications back to the caller. Both transitions are idempotent:
//! game over is latched until an explicit reset, and level-ups consume the
//! XP that triggered them.

use rand::Rng;

use super::progress::Progress;
use super::tick::Notification;
use super::upgrades::draw_choices;
use crate::consts::{MAX_LEVEL_UPS_PER_CHECK, STRESS_EPSILON};
use crate::tuning::Tuning;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arbiter {
    game_over: bool,
    pending_choices: u32,
}

impl Arbiter {
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Level-ups still waiting for an upgrade pick
    pub fn pending_choices(&self) -> u32 {
        self.pending_choices
    }

    /// Consume one pending pick; true when that was the last one
    pub fn resolve_choice(&mut self) -> bool {
        if self.pending_choices == 0 {
            return false;
        }
        self.pending_choices -= 1;
        self.pending_choices == 0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Run every level-up the current XP pays for
    ///
    /// Each level emits its own notification with fresh choices. With a UI
    /// attached the simulation pauses until every choice is answered;
    /// without one it keeps running.
    pub fn check_level_up(
        &mut self,
        progress: &mut Progress,
        tuning: &Tuning,
        rng: &mut impl Rng,
        ui_attached: bool,
    ) -> Vec<Notification> {
        let mut notifications = Vec::new();
        if self.game_over {
            return notifications;
        }

        for _ in 0..MAX_LEVEL_UPS_PER_CHECK {
            let needed = tuning.xp_for_level(progress.level());
            if !progress.try_level_up(needed) {
                break;
            }
            let choices = draw_choices(rng, tuning.choices_per_level);
            log::info!("Level up! Now level {} ({} xp carried)", progress.level(), progress.xp());
            notifications.push(Notification::LevelUp {
                level: progress.level(),
                xp: progress.xp(),
                choices,
            });
        }

        if notifications.is_empty() {
            return notifications;
        }
        if ui_attached {
            self.pending_choices += notifications.len() as u32;
            progress.set_paused(true);
        } else {
            log::warn!("Level-up with no UI attached, continuing without an upgrade");
            progress.set_paused(false);
        }
        notifications
    }

    /// Latch game over once stress reaches its ceiling
    ///
    /// Returns the notification only on the transition.
    pub fn check_game_over(
        &mut self,
        progress: &mut Progress,
        ui_attached: bool,
    ) -> Option<Notification> {
        if self.game_over || progress.stress() < progress.max_stress() - STRESS_EPSILON {
            return None;
        }

        self.game_over = true;
        self.pending_choices = 0;
        progress.set_paused(true);
        if progress.maybe_update_high_score() {
            log::info!("New high score: {}", progress.high_score());
        }
        log::info!(
            "Game over: score {}, high score {}",
            progress.score(),
            progress.high_score()
        );
        if !ui_attached {
            log::warn!("Game over with no UI attached, holding in the paused state");
        }
        Some(Notification::GameOver {
            final_score: progress.score(),
            high_score: progress.high_score(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn setup() -> (Arbiter, Progress, Tuning, Pcg32) {
        let tuning = Tuning::default();
        (
            Arbiter::default(),
            Progress::new(&tuning, 0),
            tuning,
            Pcg32::seed_from_u64(1),
        )
    }

    #[test]
    fn test_game_over_threshold() {
        let (mut arbiter, mut progress, _, _) = setup();
        progress.add_stress(100.0 - 0.001);
        assert!(arbiter.check_game_over(&mut progress, true).is_none());
        assert!(!progress.is_paused());

        progress.add_stress(1.0);
        assert_eq!(progress.stress(), 100.0);
        let first = arbiter.check_game_over(&mut progress, true);
        let second = arbiter.check_game_over(&mut progress, true);
        assert!(matches!(first, Some(Notification::GameOver { .. })));
        assert!(second.is_none());
        assert!(progress.is_paused());
        assert!(arbiter.is_game_over());
    }

    #[test]
    fn test_game_over_records_high_score() {
        let (mut arbiter, mut progress, _, _) = setup();
        progress.add_score(77);
        progress.add_stress(500.0);
        let note = arbiter.check_game_over(&mut progress, false);
        assert_eq!(
            note,
            Some(Notification::GameOver {
                final_score: 77,
                high_score: 77
            })
        );
        // No UI: still a safe paused state
        assert!(progress.is_paused());
    }

    #[test]
    fn test_level_up_cascade() {
        let (mut arbiter, mut progress, tuning, mut rng) = setup();
        // 10 for level 1, 23 for level 2, then 5 left over
        progress.add_xp(38);
        let notes = arbiter.check_level_up(&mut progress, &tuning, &mut rng, true);
        assert_eq!(notes.len(), 2);
        assert_eq!(progress.level(), 3);
        assert_eq!(progress.xp(), 5);
        assert!(progress.xp() < tuning.xp_for_level(3));
        match &notes[0] {
            Notification::LevelUp { level, xp, choices } => {
                assert_eq!(*level, 2);
                assert_eq!(*xp, 28);
                assert_eq!(choices.len(), 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(arbiter.pending_choices(), 2);
        assert!(progress.is_paused());

        assert!(!arbiter.resolve_choice());
        assert!(arbiter.resolve_choice());
        assert!(!arbiter.resolve_choice());
    }

    #[test]
    fn test_level_up_without_ui_keeps_running() {
        let (mut arbiter, mut progress, tuning, mut rng) = setup();
        progress.add_xp(10);
        let notes = arbiter.check_level_up(&mut progress, &tuning, &mut rng, false);
        assert_eq!(notes.len(), 1);
        assert!(!progress.is_paused());
        assert_eq!(arbiter.pending_choices(), 0);
    }

    #[test]
    fn test_no_level_up_after_game_over() {
        let (mut arbiter, mut progress, tuning, mut rng) = setup();
        progress.add_stress(100.0);
        arbiter.check_game_over(&mut progress, true);
        progress.add_xp(100);
        assert!(arbiter.check_level_up(&mut progress, &tuning, &mut rng, true).is_empty());
        assert_eq!(progress.level(), 1);

        arbiter.reset();
        assert!(!arbiter.is_game_over());
    }
}
