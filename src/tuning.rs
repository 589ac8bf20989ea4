//! Data-driven game balance
//!
//! Every magic number the simulation uses lives here. The defaults are the
//! shipped balance; a JSON file can override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Static tuning table. Velocities are pixels per frame, durations are ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Paddle ===
    /// Paddle width as a fraction of screen width
    pub paddle_width_fraction: f32,
    /// Paddle width never grows past this fraction of the screen
    pub paddle_max_width_fraction: f32,
    pub paddle_height: f32,
    /// Horizontal pixels moved per frame while steering
    pub paddle_speed: f32,
    /// Gap between the paddle's bottom edge and the screen bottom
    pub paddle_bottom_offset: f32,

    // === Ball ===
    /// Ball size as a fraction of screen width
    pub ball_size_fraction: f32,
    pub ball_min_size: f32,
    pub starting_vy: f32,
    pub min_vx: f32,
    pub max_vx: f32,
    /// Small balls are this fraction of a normal ball
    pub small_ball_size_factor: f32,
    pub small_ball_lifetime_ms: u64,
    pub teleport_cooldown_ms: u64,
    /// Minimum gap between two bumper hits on the same ball
    pub collision_cooldown_ms: u64,

    // === Physics ===
    pub max_speed: f32,
    pub min_speed_after_collision: f32,
    /// No substep moves a ball farther than this
    pub substep_distance: f32,
    pub wall_bounce_damping: f32,
    pub bounce_damping: f32,
    /// Y coordinate of the ceiling (leaves room for the HUD)
    pub ceiling_y: f32,
    /// How far below the screen a ball center must be to count as a miss
    pub miss_margin: f32,
    /// Below this per-axis speed a ball counts as idle
    pub moving_threshold: f32,
    /// Horizontal impulse at the paddle's edge
    pub paddle_english: f32,
    /// Extra upward speed added on a catch
    pub paddle_lift: f32,
    /// Width of the random horizontal kick after a bumper hit
    pub bumper_kick: f32,
    /// Upward speed multiplier when a miss is reflected
    pub reflect_boost: f32,

    // === Boxes ===
    pub box_spawn_cooldown_ms: u64,
    pub box_min_cooldown_ms: u64,
    pub box_cooldown_per_level_ms: u64,
    pub max_boxes: usize,
    pub max_boxes_cap: usize,
    pub box_min_width: f32,
    pub box_max_width: f32,
    pub box_height: f32,
    pub box_min_hp: u32,
    pub box_max_hp: u32,
    pub box_xp_per_hp: u32,
    pub box_score_per_hp: u32,
    pub box_spawn_attempts: u32,

    // === Bumpers ===
    pub max_bumpers: usize,
    pub bumper_min_width_fraction: f32,
    pub bumper_max_width_fraction: f32,
    pub bumper_height: f32,
    pub bumper_spawn_interval_ms: u64,
    pub bumper_min_life_ms: u64,
    pub bumper_max_life_ms: u64,
    /// Lifetime of the bumper placed at session start
    pub bumper_initial_life_ms: u64,
    pub bumper_bounce: f32,
    pub bumper_rotate_chance: f32,
    pub bumper_spawn_attempts: u32,

    // === Portals ===
    pub portal_min_duration_ms: u64,
    pub portal_max_duration_ms: u64,
    pub portal_cooldown_ms: u64,
    pub portal_width: f32,
    pub portal_height: f32,
    pub portal_edge_margin: f32,
    pub portal_spawn_attempts: u32,

    // === Gravity wells ===
    pub well_min_duration_ms: u64,
    pub well_max_duration_ms: u64,
    pub well_cooldown_ms: u64,
    pub well_min_radius: f32,
    pub well_max_radius: f32,
    pub well_min_pull: f32,
    pub well_max_pull: f32,
    /// Radians per frame (visual only)
    pub well_rotation_speed: f32,
    pub well_pull_multiplier_upgrade: f32,

    // === Progress ===
    /// Obstacles stay dormant for this long after a run starts
    pub grace_period_ms: u64,
    pub stress_on_miss: f32,
    pub stress_on_catch: f32,
    /// Passive stress decay per frame
    pub stress_decay: f32,
    pub initial_max_stress: f32,
    pub absolute_max_stress: f32,
    pub base_xp_per_catch: u32,
    pub score_per_catch: u32,
    pub score_penalty_on_miss: u32,
    pub xp_base: u32,
    pub xp_growth: f32,
    pub combo_timeout_ms: u64,

    // === Upgrades ===
    pub paddle_width_step: f32,
    pub speed_step: f32,
    pub max_stress_step: f32,
    pub box_reward_multiplier: f32,
    pub portal_duration_bonus_ms: u64,
    /// Portal cooldown is multiplied by this with the frequency upgrade
    pub portal_frequency_factor: f32,
    pub stress_reducer_bonus: f32,
    pub combo_master_bonus: f32,
    pub choices_per_level: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            paddle_width_fraction: 0.30,
            paddle_max_width_fraction: 0.5,
            paddle_height: 96.0,
            paddle_speed: 20.0,
            paddle_bottom_offset: 120.0,

            ball_size_fraction: 0.07,
            ball_min_size: 10.0,
            starting_vy: 20.0,
            min_vx: 10.0,
            max_vx: 20.0,
            small_ball_size_factor: 0.6,
            small_ball_lifetime_ms: 10_000,
            teleport_cooldown_ms: 900,
            collision_cooldown_ms: 100,

            max_speed: 120.0,
            min_speed_after_collision: 16.0,
            substep_distance: 18.0,
            wall_bounce_damping: 0.98,
            bounce_damping: 0.98,
            ceiling_y: 80.0,
            miss_margin: 200.0,
            moving_threshold: 0.1,
            paddle_english: 4.0,
            paddle_lift: 1.2,
            bumper_kick: 2.0,
            reflect_boost: 1.5,

            box_spawn_cooldown_ms: 8_000,
            box_min_cooldown_ms: 2_000,
            box_cooldown_per_level_ms: 200,
            max_boxes: 5,
            max_boxes_cap: 8,
            box_min_width: 60.0,
            box_max_width: 140.0,
            box_height: 100.0,
            box_min_hp: 1,
            box_max_hp: 4,
            box_xp_per_hp: 2,
            box_score_per_hp: 5,
            box_spawn_attempts: 20,

            max_bumpers: 3,
            bumper_min_width_fraction: 0.10,
            bumper_max_width_fraction: 0.30,
            bumper_height: 20.0,
            bumper_spawn_interval_ms: 15_000,
            bumper_min_life_ms: 20_000,
            bumper_max_life_ms: 30_000,
            bumper_initial_life_ms: 30_000,
            bumper_bounce: 1.2,
            bumper_rotate_chance: 0.25,
            bumper_spawn_attempts: 50,

            portal_min_duration_ms: 6_000,
            portal_max_duration_ms: 11_000,
            portal_cooldown_ms: 7_000,
            portal_width: 120.0,
            portal_height: 140.0,
            portal_edge_margin: 50.0,
            portal_spawn_attempts: 50,

            well_min_duration_ms: 5_000,
            well_max_duration_ms: 9_000,
            well_cooldown_ms: 9_000,
            well_min_radius: 28.0,
            well_max_radius: 64.0,
            well_min_pull: 0.16,
            well_max_pull: 0.32,
            well_rotation_speed: 0.1,
            well_pull_multiplier_upgrade: 1.5,

            grace_period_ms: 8_000,
            stress_on_miss: 20.0,
            stress_on_catch: 5.0,
            stress_decay: 0.01,
            initial_max_stress: 100.0,
            absolute_max_stress: 200.0,
            base_xp_per_catch: 2,
            score_per_catch: 1,
            score_penalty_on_miss: 1,
            xp_base: 10,
            xp_growth: 1.15,
            combo_timeout_ms: 8_000,

            paddle_width_step: 1.12,
            speed_step: 1.10,
            max_stress_step: 20.0,
            box_reward_multiplier: 1.5,
            portal_duration_bonus_ms: 2_500,
            portal_frequency_factor: 0.667,
            stress_reducer_bonus: 5.0,
            combo_master_bonus: 0.5,
            choices_per_level: 3,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) JSON override on top of the defaults
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a tuning file from disk
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    /// XP required to leave `level` (geometric growth, never below 1)
    pub fn xp_for_level(&self, level: u32) -> u32 {
        let level = level.max(1);
        let xp = self.xp_base as f64
            * level as f64
            * (self.xp_growth as f64).powi(level.saturating_sub(1) as i32);
        (xp.round() as u32).max(1)
    }

    /// Box spawn cooldown shrinks with level down to a floor
    pub fn box_cooldown_for_level(&self, level: u32) -> u64 {
        let reduction = level as u64 * self.box_cooldown_per_level_ms;
        self.box_spawn_cooldown_ms
            .saturating_sub(reduction)
            .max(self.box_min_cooldown_ms)
    }

    /// One more box slot every five levels, capped
    pub fn max_boxes_for_level(&self, level: u32) -> usize {
        (self.max_boxes + (level / 5) as usize).min(self.max_boxes_cap)
    }

    /// Boxes get one extra hit point every three levels
    pub fn box_hp_for_level(&self, level: u32, base_hp: u32) -> u32 {
        base_hp + level / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_xp_for_level_values() {
        let tuning = Tuning::default();
        assert_eq!(tuning.xp_for_level(1), 10);
        // 10 * 2 * 1.15 = 23
        assert_eq!(tuning.xp_for_level(2), 23);
        // 10 * 3 * 1.3225 = 39.675
        assert_eq!(tuning.xp_for_level(3), 40);
    }

    #[test]
    fn test_xp_for_level_floor() {
        let tuning = Tuning {
            xp_base: 0,
            ..Default::default()
        };
        assert_eq!(tuning.xp_for_level(1), 1);
        assert_eq!(tuning.xp_for_level(7), 1);
    }

    #[test]
    fn test_level_curves() {
        let tuning = Tuning::default();
        assert_eq!(tuning.box_cooldown_for_level(1), 7_800);
        assert_eq!(tuning.box_cooldown_for_level(100), 2_000);
        assert_eq!(tuning.max_boxes_for_level(1), 5);
        assert_eq!(tuning.max_boxes_for_level(10), 7);
        assert_eq!(tuning.max_boxes_for_level(50), 8);
        assert_eq!(tuning.box_hp_for_level(6, 2), 4);
    }

    #[test]
    fn test_partial_json_override() {
        let tuning = Tuning::from_json(r#"{ "max_speed": 90.0, "max_bumpers": 1 }"#).unwrap();
        assert_eq!(tuning.max_speed, 90.0);
        assert_eq!(tuning.max_bumpers, 1);
        assert_eq!(tuning.substep_distance, Tuning::default().substep_distance);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            Tuning::from_json("{ not json"),
            Err(crate::Error::Json(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_xp_for_level_is_increasing(level in 1u32..60) {
            let tuning = Tuning::default();
            prop_assert!(tuning.xp_for_level(level) >= 1);
            prop_assert!(tuning.xp_for_level(level + 1) > tuning.xp_for_level(level));
        }
    }
}
