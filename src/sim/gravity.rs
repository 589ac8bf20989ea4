//! Gravity-well subsystem
//!
//! One well at a time. It pulls balls in with a quadratic falloff and adds a
//! sideways swirl close to the core.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::rect::Rect;
use super::state::{Ball, Block, Expires, GravityWell, Occupies};
use crate::tuning::Tuning;
use crate::{direction_of, perpendicular};

/// Outer reach of the pull, in core radii
const RANGE_FACTOR: f32 = 8.0;
/// Inside this many core radii the orbital term kicks in
const ORBIT_FACTOR: f32 = 2.0;
/// Orbital impulse relative to the radial one
const ORBIT_STRENGTH: f32 = 0.3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GravityWellSystem {
    well: Option<GravityWell>,
    last_gone_ms: u64,
}

impl GravityWellSystem {
    pub fn well(&self) -> Option<&GravityWell> {
        self.well.as_ref()
    }

    pub fn clear(&mut self) {
        self.well = None;
        self.last_gone_ms = 0;
    }

    pub fn prime(&mut self, now_ms: u64) {
        self.last_gone_ms = now_ms;
    }

    /// Spin, expire, or spawn after the cooldown
    pub fn update(&mut self, now_ms: u64, screen: Vec2, tuning: &Tuning, rng: &mut impl Rng) {
        if let Some(well) = &mut self.well {
            well.rotation += tuning.well_rotation_speed;
            if well.is_expired(now_ms) {
                log::debug!(
                    "Gravity well at ({:.0}, {:.0}) collapsed",
                    well.center.x,
                    well.center.y
                );
                self.well = None;
                self.last_gone_ms = now_ms;
            }
            return;
        }

        if now_ms.saturating_sub(self.last_gone_ms) >= tuning.well_cooldown_ms {
            self.spawn(now_ms, screen, tuning, rng);
        }
    }

    fn spawn(&mut self, now_ms: u64, screen: Vec2, tuning: &Tuning, rng: &mut impl Rng) {
        let radius = rng.random_range(tuning.well_min_radius..=tuning.well_max_radius);
        let margin = radius * 2.0;
        let x_range = screen.x - 2.0 * margin;
        let y_range = screen.y * 0.7 - 2.0 * margin;
        if x_range <= 0.0 || y_range <= 0.0 {
            return;
        }

        let center = Vec2::new(
            margin + rng.random::<f32>() * x_range,
            margin + rng.random::<f32>() * y_range,
        );
        let well = GravityWell {
            center,
            radius,
            spawned_ms: now_ms,
            duration_ms: rng
                .random_range(tuning.well_min_duration_ms..=tuning.well_max_duration_ms),
            rotation: 0.0,
            pull_strength: rng.random_range(tuning.well_min_pull..=tuning.well_max_pull),
        };
        log::info!(
            "Gravity well spawned at ({:.0}, {:.0}), radius {:.0}, {}ms",
            center.x,
            center.y,
            radius,
            well.duration_ms
        );
        self.well = Some(well);
    }

    /// Pull a ball toward the active well, if any
    pub fn pull(&self, ball: &mut Ball, multiplier: f32) {
        if let Some(well) = &self.well {
            ball.vel += pull_from_well(ball.center(), well, multiplier);
        }
    }

    /// Remove and return every box the well touches
    pub fn consume_blocks(&self, blocks: &mut Vec<Block>) -> Vec<Block> {
        let Some(well) = &self.well else {
            return Vec::new();
        };
        let zone: Rect = well.rect();
        let (consumed, kept): (Vec<Block>, Vec<Block>) = blocks
            .drain(..)
            .partition(|block| block.rect.intersects(&zone));
        *blocks = kept;
        consumed
    }

    #[cfg(test)]
    pub(crate) fn set_well(&mut self, well: GravityWell) {
        self.well = Some(well);
    }
}

/// Velocity change a well imparts on a body at `position` this substep
///
/// Zero outside `8r` and inside the core `r`. In between the radial pull
/// falls off quadratically with distance; within `2r` a tangential term at
/// 30% of the radial magnitude makes captured balls swirl.
pub fn pull_from_well(position: Vec2, well: &GravityWell, multiplier: f32) -> Vec2 {
    let delta = well.center - position;
    let dist_sq = delta.length_squared();
    let inner = well.radius;
    let outer = well.radius * RANGE_FACTOR;
    if dist_sq > outer * outer || dist_sq < inner * inner {
        return Vec2::ZERO;
    }

    let dist = dist_sq.sqrt();
    let direction = direction_of(delta);
    let normalized = ((dist - inner) / (outer - inner).max(f32::EPSILON)).clamp(0.0, 1.0);
    let falloff = (1.0 - normalized) * (1.0 - normalized);
    let pull = well.pull_strength * falloff * multiplier;

    let mut impulse = direction * pull;
    if dist < inner * ORBIT_FACTOR {
        impulse += perpendicular(direction) * pull * ORBIT_STRENGTH;
    }
    impulse
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn well() -> GravityWell {
        GravityWell {
            center: Vec2::new(500.0, 500.0),
            radius: 40.0,
            spawned_ms: 0,
            duration_ms: 5_000,
            rotation: 0.0,
            pull_strength: 0.3,
        }
    }

    #[test]
    fn test_no_pull_outside_range_or_inside_core() {
        let well = well();
        assert_eq!(pull_from_well(Vec2::new(500.0, 900.0), &well, 1.0), Vec2::ZERO);
        assert_eq!(pull_from_well(Vec2::new(500.0, 520.0), &well, 1.0), Vec2::ZERO);
    }

    #[test]
    fn test_radial_pull_falloff() {
        let well = well();
        // 160 away: normalized (160-40)/280, no orbital term
        let impulse = pull_from_well(Vec2::new(340.0, 500.0), &well, 1.0);
        let normalized: f32 = 120.0 / 280.0;
        let expected = 0.3 * (1.0 - normalized).powi(2);
        assert!((impulse.x - expected).abs() < 1e-3);
        assert!(impulse.y.abs() < 1e-6);

        let boosted = pull_from_well(Vec2::new(340.0, 500.0), &well, 1.5);
        assert!((boosted.x - expected * 1.5).abs() < 1e-3);

        // Farther means weaker
        let far = pull_from_well(Vec2::new(200.0, 500.0), &well, 1.0);
        assert!(far.x < impulse.x);
    }

    #[test]
    fn test_orbital_term_near_core() {
        let well = well();
        let impulse = pull_from_well(Vec2::new(440.0, 500.0), &well, 1.0);
        assert!(impulse.x > 0.0);
        // Perpendicular of +x is +y
        assert!((impulse.y - impulse.x * 0.3).abs() < 1e-3);
    }

    #[test]
    fn test_lifecycle() {
        let tuning = Tuning::default();
        let mut rng = Pcg32::seed_from_u64(9);
        let mut system = GravityWellSystem::default();
        let screen = Vec2::new(1080.0, 1920.0);

        system.update(8_999, screen, &tuning, &mut rng);
        assert!(system.well().is_none());
        system.update(9_000, screen, &tuning, &mut rng);
        let well = system.well().cloned().expect("well should spawn");
        assert!(well.radius >= 28.0 && well.radius <= 64.0);
        assert!(well.center.y <= screen.y * 0.7);
        assert!(well.pull_strength >= 0.16 && well.pull_strength <= 0.32);

        system.update(9_016, screen, &tuning, &mut rng);
        assert!(system.well().is_some_and(|w| w.rotation > 0.0));

        system.update(9_000 + well.duration_ms, screen, &tuning, &mut rng);
        assert!(system.well().is_none());
    }

    #[test]
    fn test_consume_blocks() {
        let mut system = GravityWellSystem::default();
        system.set_well(well());
        let block = |id, left: f32| Block {
            id,
            rect: Rect::new(left, 480.0, left + 60.0, 580.0),
            hp: 2,
            xp_reward: 5,
            score_reward: 12,
        };
        let mut blocks = vec![block(1, 400.0), block(2, 800.0)];
        let consumed = system.consume_blocks(&mut blocks);
        assert_eq!(consumed.len(), 1);
        assert_eq!(consumed[0].id, 1);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].id, 2);
    }
}
