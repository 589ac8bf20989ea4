//! Portal-pair subsystem
//!
//! At most one pair is open at a time. A pair carries a single-use guard:
//! after the first teleport it stays open but inert until it despawns.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::progress::Progress;
use super::rect::Rect;
use super::state::{Ball, Expires, Occupies, PortalEnd, PortalPair};
use super::upgrades::UpgradeKind;
use crate::tuning::Tuning;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalSystem {
    pair: Option<PortalPair>,
    last_gone_ms: u64,
    next_pair_id: u32,
}

impl PortalSystem {
    pub fn pair(&self) -> Option<&PortalPair> {
        self.pair.as_ref()
    }

    pub fn clear(&mut self) {
        self.pair = None;
        self.last_gone_ms = 0;
    }

    pub fn prime(&mut self, now_ms: u64) {
        self.last_gone_ms = now_ms;
    }

    /// Cooldown between pairs, shortened by the frequency upgrade
    pub fn cooldown_ms(tuning: &Tuning, progress: &Progress) -> u64 {
        if progress.has(UpgradeKind::PortalFrequency) {
            let scaled = tuning.portal_cooldown_ms as f64 * tuning.portal_frequency_factor as f64;
            scaled.round() as u64
        } else {
            tuning.portal_cooldown_ms
        }
    }

    /// Retire an expired pair, or open a new one once the cooldown elapsed
    ///
    /// `avoid` lists every rect a portal must not cover.
    pub fn update(
        &mut self,
        now_ms: u64,
        screen: Vec2,
        avoid: &[Rect],
        tuning: &Tuning,
        progress: &Progress,
        rng: &mut impl Rng,
    ) {
        if let Some(pair) = &self.pair {
            if pair.is_expired(now_ms) {
                log::debug!("Portal pair {} closed", pair.id);
                self.pair = None;
                self.last_gone_ms = now_ms;
            }
            return;
        }

        if now_ms.saturating_sub(self.last_gone_ms) > Self::cooldown_ms(tuning, progress) {
            self.try_spawn(now_ms, screen, avoid, tuning, progress, rng);
        }
    }

    fn try_spawn(
        &mut self,
        now_ms: u64,
        screen: Vec2,
        avoid: &[Rect],
        tuning: &Tuning,
        progress: &Progress,
        rng: &mut impl Rng,
    ) {
        let size = Vec2::new(tuning.portal_width, tuning.portal_height);
        let x_range = screen.x - size.x - 160.0;
        let y_range = screen.y - size.y - 400.0;
        if x_range <= 0.0 || y_range <= 0.0 {
            return;
        }
        let playfield = Rect::new(0.0, 0.0, screen.x, screen.y).inflate(-tuning.portal_edge_margin);
        let fits = |r: &Rect| {
            r.left >= playfield.left
                && r.right <= playfield.right
                && r.top >= playfield.top
                && r.bottom <= playfield.bottom
                && !avoid.iter().any(|other| other.intersects(r))
        };

        for _ in 0..tuning.portal_spawn_attempts {
            let a = Rect::from_origin_size(random_origin(rng, x_range, y_range), size);
            let b = Rect::from_origin_size(random_origin(rng, x_range, y_range), size);
            if a.intersects(&b) || !fits(&a) || !fits(&b) {
                continue;
            }

            let mut duration_ms =
                rng.random_range(tuning.portal_min_duration_ms..=tuning.portal_max_duration_ms);
            if progress.has(UpgradeKind::PortalDuration) {
                duration_ms += tuning.portal_duration_bonus_ms;
            }
            self.next_pair_id += 1;
            self.pair = Some(PortalPair {
                id: self.next_pair_id,
                a,
                b,
                spawned_ms: now_ms,
                duration_ms,
                used: false,
            });
            log::info!("Portal pair {} opened for {}ms", self.next_pair_id, duration_ms);
            return;
        }
    }

    /// Teleport `ball` if it sits in an unused portal and is off cooldown
    ///
    /// Returns the portal end it entered.
    pub fn transit(&mut self, ball: &mut Ball, now_ms: u64, cooldown_ms: u64) -> Option<PortalEnd> {
        let pair = self.pair.as_mut()?;
        if pair.used {
            return None;
        }
        let cooling = ball
            .last_teleport_ms
            .is_some_and(|at| now_ms.saturating_sub(at) < cooldown_ms);
        if cooling {
            return None;
        }

        let rect = ball.rect();
        let entered = [PortalEnd::A, PortalEnd::B]
            .into_iter()
            .find(|&end| pair.end(end).intersects(&rect))?;

        pair.used = true;
        ball.set_center(pair.end(entered.linked()).center());
        ball.last_teleport_ms = Some(now_ms);
        log::debug!("Ball {} teleported through pair {} ({:?})", ball.id, pair.id, entered);
        Some(entered)
    }

    #[cfg(test)]
    pub(crate) fn set_pair(&mut self, pair: PortalPair) {
        self.pair = Some(pair);
    }
}

/// Portals keep clear of the HUD band and the paddle area
fn random_origin(rng: &mut impl Rng, x_range: f32, y_range: f32) -> Vec2 {
    Vec2::new(
        80.0 + rng.random::<f32>() * x_range,
        200.0 + rng.random::<f32>() * y_range,
    )
}
