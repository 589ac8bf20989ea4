//! Per-frame simulation step
//!
//! Core game loop that advances the simulation by one frame. The caller
//! samples the clock once and passes it in; nothing in here reads time on
//! its own.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::arbiter::Arbiter;
use super::bumpers::BumperSystem;
use super::collision::{
    bounce_off_block, bounce_off_bumper, bounce_off_paddle, clamp_speed, contact_top,
    enforce_min_speed, substep_count, wall_collision,
};
use super::gravity::GravityWellSystem;
use super::portals::PortalSystem;
use super::progress::Progress;
use super::rect::Rect;
use super::state::{
    Ball, Block, Expires, GameState, Occupies, Paddle, PortalEnd, Steer, random_vx,
};
use super::upgrades::UpgradeKind;
use crate::consts::{COMBO_LOSS_REPORT, COMBO_MILESTONES};
use crate::tuning::Tuning;

/// Bumpers keep this far from the paddle
const PADDLE_CLEARANCE: f32 = 120.0;

/// Input commands for a single frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickInput {
    pub steer: Steer,
    /// First interaction: launch any idle balls
    pub start_motion: bool,
}

/// Something that happened during a frame, for audio/VFX/HUD consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    Catch { ball: u32, combo: u32, xp: u32, score: u32 },
    /// `lost_combo` is set when a chain worth mentioning was broken
    Miss { ball: u32, lost_combo: Option<u32> },
    /// A miss absorbed by the one-shot reflect upgrade
    Saved { ball: u32 },
    BumperHit { ball: u32 },
    BlockDamaged { block: u32, hp: u32 },
    BlockDestroyed { block: u32, xp: u32, score: u32 },
    Teleported { ball: u32, from: PortalEnd },
    ComboMilestone { combo: u32, multiplier: f32 },
    SmallBallExpired { ball: u32 },
    WellConsumedBlock { block: u32, xp: u32, score: u32 },
}

/// Transitions the caller must act on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Notification {
    /// The simulation waits for `apply_upgrade` when a UI is attached
    LevelUp {
        level: u32,
        xp: u32,
        choices: Vec<UpgradeKind>,
    },
    GameOver { final_score: u32, high_score: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickOutput {
    pub events: Vec<GameEvent>,
    pub notifications: Vec<Notification>,
}

/// Advance the game state by one frame
pub fn tick(state: &mut GameState, input: &TickInput, now_ms: u64) -> TickOutput {
    let mut out = TickOutput::default();

    // Pausing is cooperative: a paused state simply isn't stepped
    if state.progress.is_paused() {
        return out;
    }
    state.frame += 1;

    let grace_elapsed = now_ms.saturating_sub(state.progress.game_start_ms())
        >= state.tuning.grace_period_ms;
    if grace_elapsed {
        if !state.grace_over {
            prime_obstacles(state, now_ms);
        }
        advance_obstacles(state, now_ms, &mut out);
    }

    state
        .paddle
        .steer(input.steer, state.tuning.paddle_speed, state.screen.x);
    if input.start_motion {
        state.start_motion();
    }

    move_balls(state, now_ms, grace_elapsed, &mut out);
    expire_small_balls(state, now_ms, &mut out);

    state.progress.decay_stress(state.tuning.stress_decay);

    if let Some(note) = state
        .arbiter
        .check_game_over(&mut state.progress, state.ui_attached)
    {
        out.notifications.push(note);
    }
    let level_ups = state.arbiter.check_level_up(
        &mut state.progress,
        &state.tuning,
        &mut state.rng,
        state.ui_attached,
    );
    out.notifications.extend(level_ups);

    out
}

/// Start every spawn timer from the end of the grace period
fn prime_obstacles(state: &mut GameState, now_ms: u64) {
    state.grace_over = true;
    state.portals.prime(now_ms);
    state.wells.prime(now_ms);
    state.bumpers.prime(now_ms);
    state.block_spawner.prime(now_ms);
    log::info!("Grace period over, obstacles active");
}

/// Portals, then the well, then bumpers, then boxes
fn advance_obstacles(state: &mut GameState, now_ms: u64, out: &mut TickOutput) {
    let paddle = state.paddle.rect();

    let portal_avoid: Vec<Rect> = state
        .blocks
        .iter()
        .map(Occupies::rect)
        .chain(state.bumpers.bumpers().iter().map(Occupies::rect))
        .chain(state.wells.well().map(Occupies::rect))
        .chain(std::iter::once(paddle))
        .collect();
    state.portals.update(
        now_ms,
        state.screen,
        &portal_avoid,
        &state.tuning,
        &state.progress,
        &mut state.rng,
    );

    state
        .wells
        .update(now_ms, state.screen, &state.tuning, &mut state.rng);
    if state.progress.has(UpgradeKind::WellBoxDestroyer) {
        for block in state.wells.consume_blocks(&mut state.blocks) {
            let (xp, score) = grant_block_rewards(&mut state.progress, &block, &state.tuning);
            log::debug!("Box {} swallowed by the gravity well", block.id);
            out.events.push(GameEvent::WellConsumedBlock {
                block: block.id,
                xp,
                score,
            });
        }
    }

    let bumper_avoid: Vec<Rect> = std::iter::once(state.paddle.safe_zone(PADDLE_CLEARANCE))
        .chain(state.blocks.iter().map(Occupies::rect))
        .collect();
    state.bumpers.update(
        now_ms,
        state.screen,
        &bumper_avoid,
        &state.tuning,
        &mut state.rng,
    );

    let paddle_zone = Rect::new(
        paddle.left - 60.0,
        paddle.top - 100.0,
        paddle.right + 60.0,
        paddle.bottom + 60.0,
    );
    let block_avoid: Vec<Rect> = std::iter::once(paddle_zone)
        .chain(state.bumpers.bumpers().iter().map(Occupies::rect))
        .chain(state.balls.iter().map(Occupies::rect))
        .collect();
    state.block_spawner.update(
        now_ms,
        state.progress.level(),
        state.screen,
        &mut state.blocks,
        &block_avoid,
        &state.tuning,
        &mut state.ids,
        &mut state.rng,
    );
}

fn move_balls(state: &mut GameState, now_ms: u64, grace_elapsed: bool, out: &mut TickOutput) {
    let GameState {
        tuning,
        screen,
        paddle,
        balls,
        blocks,
        bumpers,
        portals,
        wells,
        progress,
        arbiter,
        rng,
        ui_attached,
        ..
    } = state;

    let pull_multiplier = grace_elapsed.then(|| {
        if progress.has(UpgradeKind::WellPullUp) {
            tuning.well_pull_multiplier_upgrade
        } else {
            1.0
        }
    });

    let mut pass = BallPass {
        now_ms,
        tuning,
        screen: *screen,
        paddle,
        blocks,
        bumpers,
        wells,
        portals,
        progress,
        arbiter,
        rng,
        ui_attached: *ui_attached,
        pull_multiplier,
        out,
    };
    for ball in balls.iter_mut() {
        pass.step(ball);
    }
}

fn expire_small_balls(state: &mut GameState, now_ms: u64, out: &mut TickOutput) {
    let mut expired = Vec::new();
    state.balls.retain(|ball| {
        let gone = ball.is_expired(now_ms);
        if gone {
            expired.push(ball.id);
        }
        !gone
    });
    for id in expired {
        log::debug!("Small ball {id} expired");
        out.events.push(GameEvent::SmallBallExpired { ball: id });
    }
}

/// Pay out a destroyed box's rewards; returns what was granted
fn grant_block_rewards(progress: &mut Progress, block: &Block, tuning: &Tuning) -> (u32, u32) {
    let (mut xp, mut score) = (block.xp_reward, block.score_reward);
    if progress.has(UpgradeKind::BoxRewardUp) {
        xp = (xp as f32 * tuning.box_reward_multiplier) as u32;
        score = (score as f32 * tuning.box_reward_multiplier) as u32;
    }
    progress.add_xp(xp);
    progress.add_score(score as i64);
    (xp, score)
}

/// Everything one ball can touch during a frame
struct BallPass<'a> {
    now_ms: u64,
    tuning: &'a Tuning,
    screen: Vec2,
    paddle: &'a Paddle,
    blocks: &'a mut Vec<Block>,
    bumpers: &'a BumperSystem,
    wells: &'a GravityWellSystem,
    portals: &'a mut PortalSystem,
    progress: &'a mut Progress,
    arbiter: &'a mut Arbiter,
    rng: &'a mut Pcg32,
    ui_attached: bool,
    /// `None` while the well is dormant
    pull_multiplier: Option<f32>,
    out: &'a mut TickOutput,
}

impl BallPass<'_> {
    fn step(&mut self, ball: &mut Ball) {
        // The frame's displacement is fixed up front; bounces only change
        // the velocity carried into the next frame
        let steps = substep_count(ball.vel, self.tuning.substep_distance);
        let step = ball.vel / steps as f32;
        for _ in 0..steps {
            ball.pos += step;

            wall_collision(
                ball,
                self.screen.x,
                self.tuning.ceiling_y,
                self.tuning.wall_bounce_damping,
            );
            // One obstacle per substep; anything else overlapping is
            // re-tested on the next one
            if !self.hit_bumper(ball) && !self.hit_block(ball) {
                self.catch(ball);
            }
            self.check_miss(ball);

            if let Some(multiplier) = self.pull_multiplier {
                self.wells.pull(ball, multiplier);
            }
        }

        if let Some(from) = self
            .portals
            .transit(ball, self.now_ms, self.tuning.teleport_cooldown_ms)
        {
            self.out.events.push(GameEvent::Teleported { ball: ball.id, from });
        }

        self.settle(ball);
    }

    fn hit_bumper(&mut self, ball: &mut Ball) -> bool {
        let cooling = ball
            .last_collision_ms
            .is_some_and(|at| self.now_ms.saturating_sub(at) < self.tuning.collision_cooldown_ms);
        if cooling {
            return false;
        }
        let Some((rect, bounce)) = self
            .bumpers
            .first_hit(&ball.rect())
            .map(|bumper| (bumper.rect, bumper.bounce))
        else {
            return false;
        };

        ball.last_collision_ms = Some(self.now_ms);
        bounce_off_bumper(ball, &rect, bounce);
        // Small horizontal jitter breaks up stable bounce loops
        ball.vel.x += (self.rng.random::<f32>() - 0.5) * self.tuning.bumper_kick;
        ball.vel = clamp_speed(
            enforce_min_speed(ball.vel, self.tuning.min_speed_after_collision),
            self.tuning.max_speed,
        );

        self.progress.add_score(1);
        self.out.events.push(GameEvent::BumperHit { ball: ball.id });
        true
    }

    fn hit_block(&mut self, ball: &mut Ball) -> bool {
        let ball_rect = ball.rect();
        let Some(index) = self
            .blocks
            .iter()
            .position(|block| block.rect.intersects(&ball_rect))
        else {
            return false;
        };

        bounce_off_block(ball, &self.blocks[index].rect, self.tuning.bounce_damping);
        ball.vel = clamp_speed(ball.vel, self.tuning.max_speed);

        let block = &mut self.blocks[index];
        block.hp = block.hp.saturating_sub(1);
        if block.hp > 0 {
            let event = GameEvent::BlockDamaged {
                block: block.id,
                hp: block.hp,
            };
            self.out.events.push(event);
            return true;
        }

        let block = self.blocks.remove(index);
        let (xp, score) = grant_block_rewards(self.progress, &block, self.tuning);
        log::debug!("Box {} destroyed (+{xp} xp, +{score} score)", block.id);
        self.out.events.push(GameEvent::BlockDestroyed {
            block: block.id,
            xp,
            score,
        });
        true
    }

    fn catch(&mut self, ball: &mut Ball) {
        if ball.vel.y <= 0.0 || !contact_top(&ball.rect(), &self.paddle.rect()) {
            return;
        }

        bounce_off_paddle(
            ball,
            self.paddle,
            self.tuning.paddle_english,
            self.tuning.paddle_lift,
        );
        ball.vel = clamp_speed(ball.vel, self.tuning.max_speed);

        let combo = self.progress.register_catch(self.now_ms);
        let mut multiplier = self.progress.combo_multiplier();
        if multiplier > 1.0 && self.progress.has(UpgradeKind::ComboMaster) {
            multiplier += self.tuning.combo_master_bonus;
        }
        let mut base_score = self.tuning.score_per_catch;
        if self.progress.has(UpgradeKind::ScoreX2) {
            base_score *= 2;
        }
        let xp = (self.tuning.base_xp_per_catch as f32 * multiplier) as u32;
        let score = (base_score as f32 * multiplier) as u32;
        self.progress.add_xp(xp);
        self.progress.add_score(score as i64);

        let mut relief = self.tuning.stress_on_catch;
        if self.progress.has(UpgradeKind::StressReducer) {
            relief += self.tuning.stress_reducer_bonus;
        }
        self.progress.add_stress(-relief);

        self.out.events.push(GameEvent::Catch {
            ball: ball.id,
            combo,
            xp,
            score,
        });
        if COMBO_MILESTONES.contains(&combo) {
            log::info!("Combo x{combo}!");
            self.out.events.push(GameEvent::ComboMilestone {
                combo,
                multiplier: self.progress.combo_multiplier(),
            });
        }
    }

    fn check_miss(&mut self, ball: &mut Ball) {
        if ball.center().y <= self.screen.y + self.tuning.miss_margin {
            return;
        }

        if self.progress.remove_upgrade(UpgradeKind::Reflect.key()) {
            ball.pos.y = self.screen.y - ball.size;
            ball.vel.y = -self.tuning.starting_vy.abs() * self.tuning.reflect_boost;
            log::debug!("Ball {} reflected back into play", ball.id);
            self.out.events.push(GameEvent::Saved { ball: ball.id });
            return;
        }

        let lost = self.progress.register_miss();
        self.progress.add_stress(self.tuning.stress_on_miss);
        self.progress
            .add_score(-(self.tuning.score_penalty_on_miss as i64));
        self.out.events.push(GameEvent::Miss {
            ball: ball.id,
            lost_combo: (lost >= COMBO_LOSS_REPORT).then_some(lost),
        });
        if let Some(note) = self.arbiter.check_game_over(self.progress, self.ui_attached) {
            self.out.notifications.push(note);
        }

        // Back above the paddle, heading up
        ball.pos = Vec2::new(
            self.paddle.center_x() - ball.size / 2.0,
            self.paddle.y - ball.size - 8.0,
        );
        ball.vel = Vec2::new(
            random_vx(self.rng, self.tuning),
            -self.tuning.starting_vy.abs(),
        );
    }

    /// Relaunch idle balls, then hold speed inside the legal band
    fn settle(&mut self, ball: &mut Ball) {
        if !ball.is_moving(self.tuning.moving_threshold) {
            ball.vel = Vec2::new(
                random_vx(self.rng, self.tuning),
                self.tuning.starting_vy.abs(),
            );
        }
        ball.vel = clamp_speed(
            enforce_min_speed(ball.vel, self.tuning.min_speed_after_collision),
            self.tuning.max_speed,
        );
    }
}
