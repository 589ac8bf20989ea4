//! Paw Pong - arcade-physics simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (bodies, collisions, obstacles, progress)
//! - `tuning`: Data-driven game balance
//! - `persistence`: Profile save/load (high score, max combo, upgrades)
//!
//! Rendering, audio and menus live outside this crate. They read
//! [`sim::Snapshot`] values and react to [`sim::Notification`]s.

pub mod error;
pub mod persistence;
pub mod sim;
pub mod tuning;

pub use error::{Error, Result};
pub use persistence::Profile;
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Wall-clock length of one frame when driven at 60 FPS
    pub const FRAME_TIME_MS: u64 = 16;
    /// Target frame rate
    pub const TARGET_FPS: u32 = 60;

    /// Added to denominators when normalizing vectors that may be zero-length
    pub const NORMALIZE_EPSILON: f32 = 0.001;
    /// Tolerance used when comparing stress against max stress
    pub const STRESS_EPSILON: f32 = 1e-4;

    /// Upper bound on level-ups resolved from a single XP grant
    pub const MAX_LEVEL_UPS_PER_CHECK: u32 = 100;

    /// Combo counts that produce a milestone event
    pub const COMBO_MILESTONES: [u32; 3] = [5, 10, 20];
    /// A lost combo at or above this count is reported on miss
    pub const COMBO_LOSS_REPORT: u32 = 5;
}

/// Unit vector from `v`, guarded against zero length
#[inline]
pub fn direction_of(v: Vec2) -> Vec2 {
    v / (v.length() + consts::NORMALIZE_EPSILON)
}

/// Perpendicular of `v` (rotated 90° counter-clockwise in screen space)
#[inline]
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
