//! Run progress: score, stress, XP, level, combo and unlocked upgrades
//!
//! A single owner holds all of it; every mutation clamps to the legal range
//! so readers never observe an out-of-bounds value.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::upgrades::UpgradeKind;
use crate::persistence::Profile;
use crate::tuning::Tuning;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    score: u32,
    high_score: u32,
    stress: f32,
    max_stress: f32,
    absolute_max_stress: f32,
    level: u32,
    /// XP accumulated toward the next level
    xp: u32,
    combo: u32,
    max_combo: u32,
    last_catch_ms: Option<u64>,
    combo_timeout_ms: u64,
    upgrades: BTreeSet<String>,
    paused: bool,
    game_start_ms: u64,
}

impl Progress {
    pub fn new(tuning: &Tuning, now_ms: u64) -> Self {
        Self {
            score: 0,
            high_score: 0,
            stress: 0.0,
            max_stress: tuning.initial_max_stress,
            absolute_max_stress: tuning.absolute_max_stress,
            level: 1,
            xp: 0,
            combo: 0,
            max_combo: 0,
            last_catch_ms: None,
            combo_timeout_ms: tuning.combo_timeout_ms,
            upgrades: BTreeSet::new(),
            paused: false,
            game_start_ms: now_ms,
        }
    }

    /// Fresh run carrying a saved profile's persisted fields
    pub fn from_profile(profile: &Profile, tuning: &Tuning, now_ms: u64) -> Self {
        Self {
            high_score: profile.high_score,
            max_combo: profile.max_combo,
            upgrades: profile
                .upgrades
                .iter()
                .filter(|key| !key.is_empty())
                .cloned()
                .collect(),
            ..Self::new(tuning, now_ms)
        }
    }

    /// Persisted fields
    pub fn profile(&self) -> Profile {
        Profile {
            high_score: self.high_score,
            max_combo: self.max_combo,
            upgrades: self.upgrades.clone(),
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn stress(&self) -> f32 {
        self.stress
    }

    pub fn max_stress(&self) -> f32 {
        self.max_stress
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn xp(&self) -> u32 {
        self.xp
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn game_start_ms(&self) -> u64 {
        self.game_start_ms
    }

    /// Add (or with a negative delta, remove) points; never below zero
    pub fn add_score(&mut self, delta: i64) {
        self.score = (self.score as i64 + delta).clamp(0, u32::MAX as i64) as u32;
    }

    pub fn add_xp(&mut self, amount: u32) {
        self.xp = self.xp.saturating_add(amount);
    }

    /// Consume one level's worth of XP if available, keeping the remainder
    pub fn try_level_up(&mut self, needed: u32) -> bool {
        if self.xp < needed {
            return false;
        }
        self.xp -= needed;
        self.level += 1;
        true
    }

    /// Shift stress by `delta`, clamped to `[0, max_stress]`
    pub fn add_stress(&mut self, delta: f32) {
        self.stress = (self.stress + delta).clamp(0.0, self.max_stress);
    }

    /// Passive per-frame relief
    pub fn decay_stress(&mut self, amount: f32) {
        self.add_stress(-amount);
    }

    /// Raise the stress ceiling, capped at the absolute maximum
    pub fn add_max_stress(&mut self, amount: f32) {
        self.max_stress = (self.max_stress + amount).min(self.absolute_max_stress);
        self.stress = self.stress.min(self.max_stress);
    }

    /// Count a catch. A catch after the combo timeout starts a new chain.
    ///
    /// Returns the combo after this catch.
    pub fn register_catch(&mut self, now_ms: u64) -> u32 {
        let timed_out = self
            .last_catch_ms
            .is_some_and(|last| now_ms.saturating_sub(last) > self.combo_timeout_ms);
        if timed_out {
            self.combo = 0;
        }
        self.combo += 1;
        self.last_catch_ms = Some(now_ms);
        self.max_combo = self.max_combo.max(self.combo);
        self.combo
    }

    /// Break the combo; returns the chain that was lost
    pub fn register_miss(&mut self) -> u32 {
        let lost = self.combo;
        self.combo = 0;
        lost
    }

    pub fn combo_multiplier(&self) -> f32 {
        match self.combo {
            c if c >= 20 => 3.0,
            c if c >= 10 => 2.0,
            c if c >= 5 => 1.5,
            _ => 1.0,
        }
    }

    /// True once more than 70% of the combo window has elapsed
    pub fn is_combo_expiring(&self, now_ms: u64) -> bool {
        match self.last_catch_ms {
            Some(last) if self.combo > 0 => {
                now_ms.saturating_sub(last) as f64 > self.combo_timeout_ms as f64 * 0.7
            }
            _ => false,
        }
    }

    pub fn has_upgrade(&self, key: &str) -> bool {
        self.upgrades.contains(key)
    }

    pub fn has(&self, kind: UpgradeKind) -> bool {
        self.has_upgrade(kind.key())
    }

    /// Record an upgrade key; empty keys are ignored
    pub fn unlock_upgrade(&mut self, key: &str) {
        if key.is_empty() {
            log::debug!("Ignoring empty upgrade key");
            return;
        }
        self.upgrades.insert(key.to_string());
    }

    pub fn remove_upgrade(&mut self, key: &str) -> bool {
        self.upgrades.remove(key)
    }

    pub fn upgrade_count(&self) -> usize {
        self.upgrades.len()
    }

    pub fn upgrades(&self) -> impl Iterator<Item = &str> {
        self.upgrades.iter().map(String::as_str)
    }

    /// Returns true if the current score set a new high score
    pub fn maybe_update_high_score(&mut self) -> bool {
        if self.score > self.high_score {
            self.high_score = self.score;
            true
        } else {
            false
        }
    }

    /// New run: per-run counters reset, persisted fields and the stress
    /// ceiling survive
    pub fn reset_run(&mut self, now_ms: u64) {
        self.score = 0;
        self.stress = 0.0;
        self.level = 1;
        self.xp = 0;
        self.combo = 0;
        self.last_catch_ms = None;
        self.paused = false;
        self.game_start_ms = now_ms;
    }

    /// Wipe everything, persisted fields included
    pub fn reset_all(&mut self, tuning: &Tuning, now_ms: u64) {
        *self = Self::new(tuning, now_ms);
    }
}
