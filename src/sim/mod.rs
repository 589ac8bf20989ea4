//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One frame per `tick`, with the caller's timestamp threaded through
//! - Seeded RNG only
//! - Stable iteration order (list order for every body kind)
//! - No rendering or platform dependencies

pub mod arbiter;
pub mod blocks;
pub mod bumpers;
pub mod collision;
pub mod gravity;
pub mod portals;
pub mod progress;
pub mod rect;
pub mod state;
pub mod tick;
pub mod upgrades;

pub use arbiter::Arbiter;
pub use blocks::BlockSpawner;
pub use bumpers::BumperSystem;
pub use collision::{CollisionResult, ball_rect_collision};
pub use gravity::{GravityWellSystem, pull_from_well};
pub use portals::PortalSystem;
pub use progress::Progress;
pub use rect::{Overlap, Rect, Side};
pub use state::{
    Ball, Block, Bumper, Expires, GamePhase, GameState, GravityWell, Hud, Occupies, Paddle,
    PortalEnd, PortalPair, Snapshot, Steer,
};
pub use tick::{GameEvent, Notification, TickInput, TickOutput, tick};
pub use upgrades::UpgradeKind;
