//! Game state and core simulation types
//!
//! `GameState` owns every body and subsystem. Nothing here is global: the
//! caller creates one state per session and threads it through [`tick`].
//!
//! [`tick`]: super::tick::tick

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::arbiter::Arbiter;
use super::blocks::BlockSpawner;
use super::bumpers::BumperSystem;
use super::gravity::GravityWellSystem;
use super::portals::PortalSystem;
use super::progress::Progress;
use super::rect::Rect;
use super::upgrades::{self, UpgradeKind};
use crate::persistence::Profile;
use crate::tuning::Tuning;

/// Anything that takes up space on the playfield
pub trait Occupies {
    fn rect(&self) -> Rect;
}

/// Anything with a limited lifetime
pub trait Expires {
    /// Timestamp (ms) at which the body goes away, `None` if it never does
    fn expires_at(&self) -> Option<u64>;

    fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at().is_some_and(|at| now_ms >= at)
    }
}

/// Current phase of gameplay, derived from progress and arbiter flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Paused by the caller
    Paused,
    /// Paused until the player picks an upgrade
    ChoosingUpgrade,
    /// Run ended; only a reset leaves this phase
    GameOver,
}

/// A ball entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    /// Top-left corner of the bounding square
    pub pos: Vec2,
    /// Side length of the bounding square
    pub size: f32,
    /// Pixels per frame
    pub vel: Vec2,
    /// Last bumper hit (gates the per-ball collision cooldown)
    pub last_collision_ms: Option<u64>,
    pub last_teleport_ms: Option<u64>,
    /// Small balls vanish after `lifetime_ms`
    pub small: bool,
    pub spawned_ms: u64,
    pub lifetime_ms: u64,
}

impl Ball {
    pub fn new(id: u32, pos: Vec2, size: f32, vel: Vec2, now_ms: u64) -> Self {
        Self {
            id,
            pos,
            size,
            vel,
            last_collision_ms: None,
            last_teleport_ms: None,
            small: false,
            spawned_ms: now_ms,
            lifetime_ms: 0,
        }
    }

    /// A short-lived ball
    pub fn small(id: u32, pos: Vec2, size: f32, vel: Vec2, now_ms: u64, lifetime_ms: u64) -> Self {
        Self {
            small: true,
            lifetime_ms,
            ..Self::new(id, pos, size, vel, now_ms)
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(self.size * 0.5)
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.pos = center - Vec2::splat(self.size * 0.5);
    }

    /// Idle balls have neither axis above `threshold`
    pub fn is_moving(&self, threshold: f32) -> bool {
        self.vel.x.abs() > threshold || self.vel.y.abs() > threshold
    }
}

impl Occupies for Ball {
    fn rect(&self) -> Rect {
        Rect::from_origin_size(self.pos, Vec2::splat(self.size))
    }
}

impl Expires for Ball {
    fn expires_at(&self) -> Option<u64> {
        self.small.then(|| self.spawned_ms + self.lifetime_ms)
    }
}

/// Horizontal steering intent for the paddle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Steer {
    Left,
    Right,
    #[default]
    None,
}

impl Steer {
    /// Classify a pointer against the screen midpoint
    pub fn from_pointer(x: f32, screen_width: f32) -> Self {
        if x < screen_width / 2.0 {
            Steer::Left
        } else {
            Steer::Right
        }
    }
}

/// The player's paddle. Moves horizontally only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Paddle {
    /// Centered horizontally, lifted off the bottom by the tuned offset
    pub fn for_screen(screen: Vec2, tuning: &Tuning) -> Self {
        let width = (screen.x * tuning.paddle_width_fraction)
            .min(screen.x * tuning.paddle_max_width_fraction);
        let height = tuning.paddle_height;
        Self {
            x: (screen.x - width) / 2.0,
            y: screen.y - height - tuning.paddle_bottom_offset,
            width,
            height,
        }
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Move by `speed` in the steered direction, clamped to the screen
    pub fn steer(&mut self, steer: Steer, speed: f32, screen_width: f32) {
        match steer {
            Steer::Left => self.x -= speed,
            Steer::Right => self.x += speed,
            Steer::None => {}
        }
        self.x = self.x.min(screen_width - self.width).max(0.0);
    }

    /// Change width and re-center on the screen
    pub fn resize(&mut self, width: f32, screen_width: f32) {
        self.width = width;
        self.x = (screen_width - width) / 2.0;
    }

    /// Zone kept free of spawned obstacles
    pub fn safe_zone(&self, margin: f32) -> Rect {
        self.rect().inflate(margin)
    }
}

impl Occupies for Paddle {
    fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// A destructible box
///
/// Rewards are fixed when the box spawns so later level changes do not
/// alter what it pays out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: u32,
    pub rect: Rect,
    pub hp: u32,
    pub xp_reward: u32,
    pub score_reward: u32,
}

impl Occupies for Block {
    fn rect(&self) -> Rect {
        self.rect
    }
}

/// A temporary bouncy bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bumper {
    pub rect: Rect,
    /// Visual only
    pub rotates: bool,
    /// Velocity multiplier on the reflected axis
    pub bounce: f32,
    pub spawned_ms: u64,
    pub life_ms: u64,
}

impl Occupies for Bumper {
    fn rect(&self) -> Rect {
        self.rect
    }
}

impl Expires for Bumper {
    fn expires_at(&self) -> Option<u64> {
        Some(self.spawned_ms + self.life_ms)
    }
}

/// Which end of a portal pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortalEnd {
    A,
    B,
}

impl PortalEnd {
    pub fn linked(self) -> Self {
        match self {
            PortalEnd::A => PortalEnd::B,
            PortalEnd::B => PortalEnd::A,
        }
    }
}

/// Two linked portals that live and die together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalPair {
    pub id: u32,
    pub a: Rect,
    pub b: Rect,
    pub spawned_ms: u64,
    pub duration_ms: u64,
    /// Set by the first teleport; the pair then stays inert until it despawns
    pub used: bool,
}

impl PortalPair {
    pub fn end(&self, end: PortalEnd) -> Rect {
        match end {
            PortalEnd::A => self.a,
            PortalEnd::B => self.b,
        }
    }
}

impl Expires for PortalPair {
    fn expires_at(&self) -> Option<u64> {
        Some(self.spawned_ms + self.duration_ms)
    }
}

/// A gravity well pulling balls toward its center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityWell {
    pub center: Vec2,
    /// Core radius; balls inside it feel no pull
    pub radius: f32,
    pub spawned_ms: u64,
    pub duration_ms: u64,
    /// Visual only
    pub rotation: f32,
    pub pull_strength: f32,
}

impl Occupies for GravityWell {
    fn rect(&self) -> Rect {
        Rect::around(self.center, self.radius)
    }
}

impl Expires for GravityWell {
    fn expires_at(&self) -> Option<u64> {
        Some(self.spawned_ms + self.duration_ms)
    }
}

/// Monotonic id source for balls and boxes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityIds {
    next: u32,
}

impl Default for EntityIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl EntityIds {
    pub fn next(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Random horizontal speed within the tuned range, random sign
pub fn random_vx(rng: &mut impl Rng, tuning: &Tuning) -> f32 {
    let v = tuning.min_vx + rng.random::<f32>() * (tuning.max_vx - tuning.min_vx);
    if rng.random_bool(0.5) { v } else { -v }
}

/// Complete simulation state for one session
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Tuning as loaded; `reset_run` restores `tuning` from this
    pub base_tuning: Tuning,
    /// Live tuning (speed and paddle upgrades mutate it)
    pub tuning: Tuning,
    /// Playfield size in pixels
    pub screen: Vec2,
    pub paddle: Paddle,
    pub balls: Vec<Ball>,
    pub blocks: Vec<Block>,
    pub bumpers: BumperSystem,
    pub portals: PortalSystem,
    pub wells: GravityWellSystem,
    pub block_spawner: BlockSpawner,
    pub progress: Progress,
    pub arbiter: Arbiter,
    pub rng: Pcg32,
    pub ids: EntityIds,
    /// Frames stepped this run
    pub frame: u64,
    /// Subsystem timers have been primed for the end of the grace period
    pub grace_over: bool,
    /// Whether a consumer handles level-up/game-over notifications
    pub ui_attached: bool,
}

impl GameState {
    /// Create a new session seeded from a saved profile
    pub fn new(seed: u64, screen: Vec2, tuning: Tuning, profile: &Profile, now_ms: u64) -> Self {
        let mut state = Self {
            seed,
            base_tuning: tuning.clone(),
            paddle: Paddle::for_screen(screen, &tuning),
            progress: Progress::from_profile(profile, &tuning, now_ms),
            tuning,
            screen,
            balls: Vec::new(),
            blocks: Vec::new(),
            bumpers: BumperSystem::default(),
            portals: PortalSystem::default(),
            wells: GravityWellSystem::default(),
            block_spawner: BlockSpawner::default(),
            arbiter: Arbiter::default(),
            rng: Pcg32::seed_from_u64(seed),
            ids: EntityIds::default(),
            frame: 0,
            grace_over: false,
            ui_attached: false,
        };

        state.place_initial_bodies(now_ms);
        state
    }

    fn place_initial_bodies(&mut self, now_ms: u64) {
        let safe_zone = self.paddle.safe_zone(120.0);
        self.bumpers
            .regenerate(self.screen, safe_zone, now_ms, &self.tuning, &mut self.rng);
        self.spawn_initial_ball(now_ms);
    }

    /// Normal ball size for this screen
    pub fn ball_size(&self) -> f32 {
        (self.screen.x * self.tuning.ball_size_fraction).max(self.tuning.ball_min_size)
    }

    /// Replace all balls with one at screen center
    pub fn spawn_initial_ball(&mut self, now_ms: u64) {
        self.balls.clear();
        let size = self.ball_size();
        let pos = (self.screen - Vec2::splat(size)) / 2.0;
        let vel = Vec2::new(random_vx(&mut self.rng, &self.tuning), self.tuning.starting_vy);
        let id = self.ids.next();
        self.balls.push(Ball::new(id, pos, size, vel, now_ms));
    }

    /// Spawn a ball just above the paddle, heading up
    pub fn spawn_ball_at_paddle(&mut self, small: bool, now_ms: u64) -> u32 {
        let size = if small {
            self.ball_size() * self.tuning.small_ball_size_factor
        } else {
            self.ball_size()
        };
        let pos = Vec2::new(self.paddle.center_x() - size / 2.0, self.paddle.y - size - 4.0);
        let vel = Vec2::new(
            random_vx(&mut self.rng, &self.tuning),
            -self.tuning.starting_vy.abs(),
        );
        let id = self.ids.next();
        let ball = if small {
            Ball::small(id, pos, size, vel, now_ms, self.tuning.small_ball_lifetime_ms)
        } else {
            Ball::new(id, pos, size, vel, now_ms)
        };
        self.balls.push(ball);
        id
    }

    /// First interaction: every idle ball gets a launch velocity
    pub fn start_motion(&mut self) {
        for ball in &mut self.balls {
            if !ball.is_moving(self.tuning.moving_threshold) {
                ball.vel = Vec2::new(
                    random_vx(&mut self.rng, &self.tuning),
                    self.tuning.starting_vy.abs(),
                );
            }
        }
    }

    /// Declare whether level-up/game-over notifications have a consumer
    pub fn attach_ui(&mut self, attached: bool) {
        self.ui_attached = attached;
    }

    pub fn phase(&self) -> GamePhase {
        if self.arbiter.is_game_over() {
            GamePhase::GameOver
        } else if !self.progress.is_paused() {
            GamePhase::Playing
        } else if self.arbiter.pending_choices() > 0 {
            GamePhase::ChoosingUpgrade
        } else {
            GamePhase::Paused
        }
    }

    /// Caller-driven pause (ignored once the run is over)
    pub fn pause(&mut self) {
        self.progress.set_paused(true);
    }

    /// Resume unless the run is over or an upgrade choice is outstanding
    pub fn resume(&mut self) {
        if self.arbiter.is_game_over() || self.arbiter.pending_choices() > 0 {
            return;
        }
        self.progress.set_paused(false);
    }

    /// Apply an upgrade by key. Unknown or empty keys are ignored.
    ///
    /// When the choice answers a pending level-up, the simulation resumes
    /// once no choices remain. Returns whether anything was applied.
    pub fn apply_upgrade(&mut self, key: &str, now_ms: u64) -> bool {
        let Some(kind) = UpgradeKind::from_key(key) else {
            log::debug!("Ignoring unknown upgrade key {key:?}");
            return false;
        };
        upgrades::apply(self, kind, now_ms);
        self.skip_upgrade();
        true
    }

    /// Answer a pending level-up without taking an upgrade
    pub fn skip_upgrade(&mut self) {
        if self.arbiter.resolve_choice() && !self.arbiter.is_game_over() {
            self.progress.set_paused(false);
        }
    }

    /// Start a new run; persisted progress survives
    pub fn reset_run(&mut self, now_ms: u64) {
        self.progress.reset_run(now_ms);
        self.reset_world(now_ms);
        log::info!("Run reset (high score {})", self.progress.high_score());
    }

    /// Start over from nothing, clearing persisted progress too
    pub fn reset_all(&mut self, now_ms: u64) {
        self.progress.reset_all(&self.base_tuning, now_ms);
        self.reset_world(now_ms);
        log::info!("Full reset");
    }

    fn reset_world(&mut self, now_ms: u64) {
        self.arbiter.reset();
        self.tuning = self.base_tuning.clone();
        self.paddle = Paddle::for_screen(self.screen, &self.tuning);
        self.blocks.clear();
        self.bumpers.clear();
        self.portals.clear();
        self.wells.clear();
        self.block_spawner.reset();
        self.frame = 0;
        self.grace_over = false;
        self.place_initial_bodies(now_ms);
    }

    /// Persisted fields for the profile collaborator
    pub fn profile(&self) -> Profile {
        self.progress.profile()
    }

    /// Owned copy of everything the renderer and HUD draw
    pub fn snapshot(&self, now_ms: u64) -> Snapshot {
        let progress = &self.progress;
        Snapshot {
            frame: self.frame,
            phase: self.phase(),
            screen: self.screen,
            paddle: self.paddle.rect(),
            balls: self.balls.clone(),
            blocks: self.blocks.clone(),
            bumpers: self.bumpers.bumpers().to_vec(),
            portals: self.portals.pair().cloned(),
            well: self.wells.well().cloned(),
            hud: Hud {
                score: progress.score(),
                high_score: progress.high_score(),
                stress: progress.stress(),
                max_stress: progress.max_stress(),
                level: progress.level(),
                xp: progress.xp(),
                xp_to_next: self.tuning.xp_for_level(progress.level()),
                combo: progress.combo(),
                combo_multiplier: progress.combo_multiplier(),
                combo_expiring: progress.is_combo_expiring(now_ms),
                max_combo: progress.max_combo(),
                upgrades: progress.upgrades().map(str::to_string).collect(),
            },
        }
    }
}

/// Progress fields shown on the HUD
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hud {
    pub score: u32,
    pub high_score: u32,
    pub stress: f32,
    pub max_stress: f32,
    pub level: u32,
    pub xp: u32,
    pub xp_to_next: u32,
    pub combo: u32,
    pub combo_multiplier: f32,
    pub combo_expiring: bool,
    pub max_combo: u32,
    pub upgrades: Vec<String>,
}

/// Read-only view of one frame, taken at the frame boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub frame: u64,
    pub phase: GamePhase,
    pub screen: Vec2,
    pub paddle: Rect,
    pub balls: Vec<Ball>,
    pub blocks: Vec<Block>,
    pub bumpers: Vec<Bumper>,
    pub portals: Option<PortalPair>,
    pub well: Option<GravityWell>,
    pub hud: Hud,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        GameState::new(7, Vec2::new(1080.0, 1920.0), Tuning::default(), &Profile::default(), 0)
    }

    #[test]
    fn test_new_state_layout() {
        let state = state();
        assert_eq!(state.balls.len(), 1);
        assert_eq!(state.bumpers.bumpers().len(), 1);
        assert_eq!(state.phase(), GamePhase::Playing);

        let paddle = state.paddle.rect();
        assert!((paddle.width() - 324.0).abs() < 0.01);
        assert!((paddle.bottom - (1920.0 - 120.0)).abs() < 0.01);

        // The initial bumper stays clear of the paddle
        let zone = state.paddle.safe_zone(120.0);
        assert!(!state.bumpers.bumpers()[0].rect.intersects(&zone));
    }

    #[test]
    fn test_ball_geometry() {
        let mut ball = Ball::new(1, Vec2::new(10.0, 20.0), 40.0, Vec2::ZERO, 0);
        assert_eq!(ball.center(), Vec2::new(30.0, 40.0));
        ball.set_center(Vec2::new(100.0, 100.0));
        assert_eq!(ball.pos, Vec2::new(80.0, 80.0));
        assert_eq!(ball.rect(), Rect::new(80.0, 80.0, 120.0, 120.0));
        assert!(!ball.is_moving(0.1));
        assert_eq!(ball.expires_at(), None);
    }

    #[test]
    fn test_small_ball_expires() {
        let ball = Ball::small(1, Vec2::ZERO, 20.0, Vec2::ONE, 1_000, 10_000);
        assert!(!ball.is_expired(10_999));
        assert!(ball.is_expired(11_000));
    }

    #[test]
    fn test_paddle_clamped_to_screen() {
        let mut paddle = Paddle {
            x: 5.0,
            y: 500.0,
            width: 100.0,
            height: 20.0,
        };
        paddle.steer(Steer::Left, 20.0, 400.0);
        assert_eq!(paddle.x, 0.0);
        paddle.x = 290.0;
        paddle.steer(Steer::Right, 20.0, 400.0);
        assert_eq!(paddle.x, 300.0);
        paddle.steer(Steer::None, 20.0, 400.0);
        assert_eq!(paddle.x, 300.0);
    }

    #[test]
    fn test_steer_from_pointer() {
        assert_eq!(Steer::from_pointer(100.0, 1080.0), Steer::Left);
        assert_eq!(Steer::from_pointer(900.0, 1080.0), Steer::Right);
    }

    #[test]
    fn test_start_motion_launches_idle_balls() {
        let mut state = state();
        state.balls[0].vel = Vec2::ZERO;
        state.start_motion();
        let vel = state.balls[0].vel;
        assert!(vel.x.abs() >= 10.0 && vel.x.abs() <= 20.0);
        assert_eq!(vel.y, 20.0);
    }

    #[test]
    fn test_resume_blocked_while_choosing() {
        let mut state = state();
        state.attach_ui(true);
        state.progress.add_xp(10);
        let notes = state.arbiter.check_level_up(
            &mut state.progress,
            &state.tuning,
            &mut state.rng,
            state.ui_attached,
        );
        assert_eq!(notes.len(), 1);
        assert_eq!(state.phase(), GamePhase::ChoosingUpgrade);

        state.resume();
        assert_eq!(state.phase(), GamePhase::ChoosingUpgrade);

        assert!(state.apply_upgrade("score_x2", 0));
        assert_eq!(state.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_snapshot_hud() {
        let mut state = state();
        state.progress.register_catch(0);
        state.progress.add_score(3);
        let snap = state.snapshot(6_000);
        assert_eq!(snap.balls.len(), 1);
        assert_eq!(snap.hud.score, 3);
        assert_eq!(snap.hud.xp_to_next, 10);
        assert!(snap.hud.combo_expiring);
        assert!(!state.snapshot(1_000).hud.combo_expiring);

        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"combo_expiring\":true"));
    }

    #[test]
    fn test_unknown_upgrade_is_ignored() {
        let mut state = state();
        assert!(!state.apply_upgrade("", 0));
        assert!(!state.apply_upgrade("laser_eyes", 0));
        assert_eq!(state.progress.upgrade_count(), 0);
    }

    #[test]
    fn test_reset_run_restores_world() {
        let mut state = state();
        state.apply_upgrade("cat_width_plus", 0);
        state.apply_upgrade("extra_yarn", 0);
        state.progress.add_score(50);
        state.progress.maybe_update_high_score();
        assert_eq!(state.balls.len(), 2);

        state.reset_run(5_000);
        assert_eq!(state.balls.len(), 1);
        assert_eq!(state.progress.score(), 0);
        assert_eq!(state.progress.high_score(), 50);
        assert_eq!(state.progress.game_start_ms(), 5_000);
        assert_eq!(state.tuning, state.base_tuning);
        assert!((state.paddle.width - 324.0).abs() < 0.01);
        // Flags survive a run reset
        assert!(state.progress.has(UpgradeKind::WidePaddle));

        state.reset_all(6_000);
        assert_eq!(state.progress.high_score(), 0);
        assert_eq!(state.progress.upgrade_count(), 0);
    }
}
