//! Bumper subsystem
//!
//! Bumpers are short bars that kick balls back harder than they arrived.
//! They expire on their own; a new one is tried every spawn interval.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::rect::Rect;
use super::state::{Bumper, Expires};
use crate::tuning::Tuning;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BumperSystem {
    bumpers: Vec<Bumper>,
    last_spawn_ms: u64,
}

impl BumperSystem {
    pub fn bumpers(&self) -> &[Bumper] {
        &self.bumpers
    }

    pub fn clear(&mut self) {
        self.bumpers.clear();
        self.last_spawn_ms = 0;
    }

    /// Restart the spawn timer (end of the grace period)
    pub fn prime(&mut self, now_ms: u64) {
        self.last_spawn_ms = now_ms;
    }

    /// Replace everything with a single long-lived bumper outside `safe_zone`
    pub fn regenerate(
        &mut self,
        screen: Vec2,
        safe_zone: Rect,
        now_ms: u64,
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) {
        self.bumpers.clear();
        if tuning.max_bumpers == 0 {
            return;
        }
        let placed = self.try_place(
            screen,
            &[safe_zone],
            tuning.bumper_initial_life_ms,
            now_ms,
            tuning,
            rng,
        );
        if !placed {
            log::debug!("No room for the initial bumper");
        }
    }

    /// Drop expired bumpers, then spawn if the interval elapsed
    pub fn update(
        &mut self,
        now_ms: u64,
        screen: Vec2,
        avoid: &[Rect],
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) {
        let before = self.bumpers.len();
        self.bumpers.retain(|bumper| !bumper.is_expired(now_ms));
        if self.bumpers.len() != before {
            log::debug!("{} bumper(s) expired", before - self.bumpers.len());
        }

        if now_ms.saturating_sub(self.last_spawn_ms) < tuning.bumper_spawn_interval_ms {
            return;
        }
        // Timer restarts whether or not a spot is found
        self.last_spawn_ms = now_ms;
        if self.bumpers.len() >= tuning.max_bumpers {
            return;
        }

        let life = rng.random_range(tuning.bumper_min_life_ms..=tuning.bumper_max_life_ms);
        self.try_place(screen, avoid, life, now_ms, tuning, rng);
    }

    /// First bumper (in list order) the ball rect overlaps
    pub fn first_hit(&self, ball: &Rect) -> Option<&Bumper> {
        self.bumpers.iter().find(|bumper| bumper.rect.intersects(ball))
    }

    fn try_place(
        &mut self,
        screen: Vec2,
        avoid: &[Rect],
        life_ms: u64,
        now_ms: u64,
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) -> bool {
        for _ in 0..tuning.bumper_spawn_attempts {
            let fraction = rng.random_range(
                tuning.bumper_min_width_fraction..=tuning.bumper_max_width_fraction,
            );
            let width = screen.x * fraction;
            let x_range = screen.x - width;
            let y_min = tuning.ceiling_y + 40.0;
            let y_max = screen.y * 0.7;
            if x_range <= 0.0 || y_max <= y_min {
                return false;
            }

            let origin = Vec2::new(rng.random::<f32>() * x_range, rng.random_range(y_min..y_max));
            let rect = Rect::from_origin_size(origin, Vec2::new(width, tuning.bumper_height));
            let blocked = avoid.iter().any(|r| r.intersects(&rect))
                || self.bumpers.iter().any(|b| b.rect.intersects(&rect));
            if blocked {
                continue;
            }

            let rotates = rng.random::<f32>() < tuning.bumper_rotate_chance;
            self.bumpers.push(Bumper {
                rect,
                rotates,
                bounce: tuning.bumper_bounce,
                spawned_ms: now_ms,
                life_ms,
            });
            log::info!(
                "Bumper spawned at ({:.0}, {:.0}), width {:.0}, life {}ms",
                rect.left,
                rect.top,
                width,
                life_ms
            );
            return true;
        }
        false
    }

    #[cfg(test)]
    pub(crate) fn push(&mut self, bumper: Bumper) {
        self.bumpers.push(bumper);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const SCREEN: Vec2 = Vec2::new(1080.0, 1920.0);

    #[test]
    fn test_regenerate_places_one() {
        let mut system = BumperSystem::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let zone = Rect::new(300.0, 1500.0, 800.0, 1900.0);
        system.regenerate(SCREEN, zone, 0, &Tuning::default(), &mut rng);
        assert_eq!(system.bumpers().len(), 1);
        let bumper = &system.bumpers()[0];
        assert_eq!(bumper.life_ms, 30_000);
        assert!(!bumper.rect.intersects(&zone));
        assert!(bumper.rect.width() >= 108.0 && bumper.rect.width() <= 324.0);
    }

    #[test]
    fn test_expiry_and_interval() {
        let tuning = Tuning::default();
        let mut system = BumperSystem::default();
        let mut rng = Pcg32::seed_from_u64(2);
        system.regenerate(SCREEN, Rect::default(), 0, &tuning, &mut rng);
        system.prime(0);

        system.update(14_999, SCREEN, &[], &tuning, &mut rng);
        assert_eq!(system.bumpers().len(), 1);

        system.update(15_000, SCREEN, &[], &tuning, &mut rng);
        assert_eq!(system.bumpers().len(), 2);

        // The initial bumper dies at 30s; the second lives at least 20s
        system.update(30_000, SCREEN, &[], &tuning, &mut rng);
        assert!(system.bumpers().iter().all(|b| b.spawned_ms == 15_000 || b.spawned_ms == 30_000));
    }

    #[test]
    fn test_respects_max() {
        let tuning = Tuning {
            max_bumpers: 1,
            ..Default::default()
        };
        let mut system = BumperSystem::default();
        let mut rng = Pcg32::seed_from_u64(3);
        system.regenerate(SCREEN, Rect::default(), 0, &tuning, &mut rng);
        system.update(20_000, SCREEN, &[], &tuning, &mut rng);
        assert_eq!(system.bumpers().len(), 1);
    }

    #[test]
    fn test_no_room_is_a_noop() {
        let tuning = Tuning::default();
        let mut system = BumperSystem::default();
        let mut rng = Pcg32::seed_from_u64(4);
        let everything = Rect::new(-10.0, -10.0, 2000.0, 3000.0);
        system.update(20_000, SCREEN, &[everything], &tuning, &mut rng);
        assert!(system.bumpers().is_empty());
    }

    #[test]
    fn test_first_hit_in_list_order() {
        let mut system = BumperSystem::default();
        for left in [100.0, 110.0] {
            system.push(Bumper {
                rect: Rect::new(left, 100.0, left + 100.0, 120.0),
                rotates: false,
                bounce: 1.2,
                spawned_ms: 0,
                life_ms: 1_000,
            });
        }
        let ball = Rect::new(150.0, 90.0, 170.0, 110.0);
        assert_eq!(system.first_hit(&ball).map(|b| b.rect.left), Some(100.0));
        assert!(system.first_hit(&Rect::new(0.0, 0.0, 10.0, 10.0)).is_none());
    }
}
