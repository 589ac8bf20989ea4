//! Collision detection and response for axis-aligned bodies
//!
//! Balls are treated as their bounding squares. Every response pushes the
//! ball fully outside the obstacle before changing its velocity, so a
//! resolved substep never ends overlapping the body it hit.

use glam::Vec2;

use super::rect::{Rect, Side};
use super::state::{Ball, Occupies, Paddle};

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Side of the obstacle the ball leaves through
    pub side: Side,
    /// Penetration depth along that side
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            side: Side::Top,
            penetration: 0.0,
        }
    }
}

/// Check a ball against a rectangular obstacle
///
/// The exit side is the one with the smallest overlap.
pub fn ball_rect_collision(ball: &Rect, obstacle: &Rect) -> CollisionResult {
    if !ball.intersects(obstacle) {
        return CollisionResult::miss();
    }
    let (side, penetration) = obstacle.overlap_of(ball).min_side();
    CollisionResult {
        hit: true,
        side,
        penetration,
    }
}

/// Bounce off the side walls and the ceiling
///
/// Position is clamped back inside and the velocity component pointed away
/// from the wall, damped. Returns whether any wall was touched.
pub fn wall_collision(ball: &mut Ball, screen_width: f32, ceiling_y: f32, damping: f32) -> bool {
    let mut touched = false;

    if ball.pos.x <= 0.0 {
        ball.pos.x = 0.0;
        ball.vel.x = ball.vel.x.abs() * damping;
        touched = true;
    } else if ball.pos.x + ball.size >= screen_width {
        ball.pos.x = screen_width - ball.size;
        ball.vel.x = -ball.vel.x.abs() * damping;
        touched = true;
    }

    if ball.pos.y <= ceiling_y {
        ball.pos.y = ceiling_y;
        ball.vel.y = ball.vel.y.abs() * damping;
        touched = true;
    }

    touched
}

/// Bumper response: snap to the exit edge with a 1px gap and reflect the
/// velocity on that axis, amplified by `bounce`
pub fn bounce_off_bumper(ball: &mut Ball, bumper: &Rect, bounce: f32) -> CollisionResult {
    let result = ball_rect_collision(&ball.rect(), bumper);
    if !result.hit {
        return result;
    }

    match result.side {
        Side::Left => {
            ball.pos.x = bumper.left - ball.size - 1.0;
            ball.vel.x = -ball.vel.x.abs() * bounce;
        }
        Side::Right => {
            ball.pos.x = bumper.right + 1.0;
            ball.vel.x = ball.vel.x.abs() * bounce;
        }
        Side::Top => {
            ball.pos.y = bumper.top - ball.size - 1.0;
            ball.vel.y = -ball.vel.y.abs() * bounce;
        }
        Side::Bottom => {
            ball.pos.y = bumper.bottom + 1.0;
            ball.vel.y = ball.vel.y.abs() * bounce;
        }
    }
    result
}

/// Box response: push out along the axis of least overlap, then flip and
/// damp the vertical velocity
pub fn bounce_off_block(ball: &mut Ball, block: &Rect, damping: f32) -> CollisionResult {
    let ball_rect = ball.rect();
    if !ball_rect.intersects(block) {
        return CollisionResult::miss();
    }

    let overlap = block.overlap_of(&ball_rect);
    let (min_x, min_y) = (overlap.min_x(), overlap.min_y());
    let result = if min_x < min_y {
        if overlap.left < overlap.right {
            ball.pos.x -= min_x + 1.0;
            CollisionResult {
                hit: true,
                side: Side::Left,
                penetration: min_x,
            }
        } else {
            ball.pos.x += min_x + 1.0;
            CollisionResult {
                hit: true,
                side: Side::Right,
                penetration: min_x,
            }
        }
    } else if overlap.top < overlap.bottom {
        ball.pos.y -= min_y + 1.0;
        CollisionResult {
            hit: true,
            side: Side::Top,
            penetration: min_y,
        }
    } else {
        ball.pos.y += min_y + 1.0;
        CollisionResult {
            hit: true,
            side: Side::Bottom,
            penetration: min_y,
        }
    };

    ball.vel.y = -ball.vel.y * damping;
    result
}

/// Whether the ball's bottom edge rests on the paddle's top band
///
/// Requires horizontal overlap and the ball bottom within the upper half of
/// the paddle.
pub fn contact_top(ball: &Rect, paddle: &Rect) -> bool {
    let horizontal = ball.right > paddle.left && ball.left < paddle.right;
    let band = ball.bottom >= paddle.top && ball.bottom <= paddle.top + paddle.height() / 2.0;
    horizontal && band
}

/// Paddle catch response
///
/// Horizontal "english" scales with how far off-center the ball lands; the
/// ball always leaves upward, slightly faster than it arrived.
pub fn bounce_off_paddle(ball: &mut Ball, paddle: &Paddle, english: f32, lift: f32) {
    let half_width = (paddle.width / 2.0).max(f32::EPSILON);
    let offset = ((ball.center().x - paddle.center_x()) / half_width).clamp(-1.0, 1.0);
    ball.vel.x += offset * english;
    ball.vel.y = -ball.vel.y.abs() - lift;
}

/// Scale down to `max_speed` if faster
#[inline]
pub fn clamp_speed(vel: Vec2, max_speed: f32) -> Vec2 {
    vel.clamp_length_max(max_speed)
}

/// Scale up to `min_speed` if slower
///
/// A (near) zero velocity has no direction to scale along and is returned
/// unchanged; idle balls get relaunched at the end of the frame instead.
pub fn enforce_min_speed(vel: Vec2, min_speed: f32) -> Vec2 {
    let speed = vel.length();
    if speed >= min_speed || speed <= crate::consts::NORMALIZE_EPSILON {
        return vel;
    }
    vel * (min_speed / speed)
}

/// Substeps needed so no single step covers more than `max_step`
pub fn substep_count(vel: Vec2, max_step: f32) -> u32 {
    let steps = (vel.length() / max_step.max(1.0)).ceil();
    (steps as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ball_at(x: f32, y: f32, vel: Vec2) -> Ball {
        Ball::new(1, Vec2::new(x, y), 20.0, vel, 0)
    }

    #[test]
    fn test_rect_collision_picks_min_side() {
        let obstacle = Rect::new(100.0, 100.0, 300.0, 120.0);
        let ball = Rect::new(150.0, 85.0, 170.0, 105.0);
        let result = ball_rect_collision(&ball, &obstacle);
        assert!(result.hit);
        assert_eq!(result.side, Side::Top);
        assert_eq!(result.penetration, 5.0);

        let apart = Rect::new(0.0, 0.0, 20.0, 20.0);
        assert!(!ball_rect_collision(&apart, &obstacle).hit);
    }

    #[test]
    fn test_wall_collision_left_and_ceiling() {
        let mut ball = ball_at(-3.0, 70.0, Vec2::new(-10.0, -8.0));
        assert!(wall_collision(&mut ball, 1080.0, 80.0, 0.98));
        assert_eq!(ball.pos, Vec2::new(0.0, 80.0));
        assert!((ball.vel.x - 9.8).abs() < 1e-4);
        assert!((ball.vel.y - 7.84).abs() < 1e-4);
    }

    #[test]
    fn test_wall_collision_right() {
        let mut ball = ball_at(1070.0, 500.0, Vec2::new(10.0, 5.0));
        assert!(wall_collision(&mut ball, 1080.0, 80.0, 0.98));
        assert_eq!(ball.pos.x, 1060.0);
        assert!(ball.vel.x < 0.0);
        assert_eq!(ball.vel.y, 5.0);

        let mut inside = ball_at(500.0, 500.0, Vec2::new(10.0, 5.0));
        assert!(!wall_collision(&mut inside, 1080.0, 80.0, 0.98));
    }

    #[test]
    fn test_bumper_top_hit() {
        let bumper = Rect::new(100.0, 300.0, 400.0, 320.0);
        let mut ball = ball_at(200.0, 285.0, Vec2::new(3.0, 10.0));
        let result = bounce_off_bumper(&mut ball, &bumper, 1.2);
        assert!(result.hit);
        assert_eq!(result.side, Side::Top);
        assert_eq!(ball.pos.y, 300.0 - 20.0 - 1.0);
        assert!((ball.vel.y + 12.0).abs() < 1e-4);
        assert!(!ball.rect().intersects(&bumper));
    }

    #[test]
    fn test_bumper_side_hit() {
        let bumper = Rect::new(100.0, 300.0, 400.0, 400.0);
        let mut ball = ball_at(395.0, 340.0, Vec2::new(-6.0, 1.0));
        let result = bounce_off_bumper(&mut ball, &bumper, 1.2);
        assert_eq!(result.side, Side::Right);
        assert_eq!(ball.pos.x, 401.0);
        assert!((ball.vel.x - 7.2).abs() < 1e-4);
    }

    #[test]
    fn test_block_vertical_push_out() {
        let block = Rect::new(100.0, 100.0, 200.0, 200.0);
        let mut ball = ball_at(140.0, 190.0, Vec2::new(2.0, -10.0));
        let result = bounce_off_block(&mut ball, &block, 0.98);
        assert_eq!(result.side, Side::Bottom);
        assert_eq!(ball.pos.y, 201.0);
        assert!((ball.vel.y - 9.8).abs() < 1e-4);
        assert!(!ball.rect().intersects(&block));
    }

    #[test]
    fn test_block_horizontal_push_out() {
        let block = Rect::new(100.0, 100.0, 200.0, 200.0);
        let mut ball = ball_at(85.0, 140.0, Vec2::new(10.0, 4.0));
        let result = bounce_off_block(&mut ball, &block, 0.98);
        assert_eq!(result.side, Side::Left);
        assert_eq!(ball.pos.x, 79.0);
        // Only the vertical component flips
        assert_eq!(ball.vel.x, 10.0);
        assert!((ball.vel.y + 3.92).abs() < 1e-4);
    }

    #[test]
    fn test_contact_top_band() {
        let paddle = Rect::new(400.0, 1700.0, 700.0, 1796.0);
        assert!(contact_top(&Rect::new(500.0, 1685.0, 520.0, 1705.0), &paddle));
        // Below the upper half
        assert!(!contact_top(&Rect::new(500.0, 1740.0, 520.0, 1760.0), &paddle));
        // Off to the side
        assert!(!contact_top(&Rect::new(700.0, 1685.0, 720.0, 1705.0), &paddle));
    }

    #[test]
    fn test_paddle_english() {
        let paddle = Paddle {
            x: 400.0,
            y: 1700.0,
            width: 300.0,
            height: 96.0,
        };
        // Landing on the right edge
        let mut ball = ball_at(690.0, 1685.0, Vec2::new(0.0, 20.0));
        bounce_off_paddle(&mut ball, &paddle, 4.0, 1.2);
        assert!((ball.vel.x - 4.0).abs() < 1e-4);
        assert!((ball.vel.y + 21.2).abs() < 1e-4);

        // Dead center
        let mut ball = ball_at(540.0, 1685.0, Vec2::new(-5.0, 20.0));
        bounce_off_paddle(&mut ball, &paddle, 4.0, 1.2);
        assert!((ball.vel.x + 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_speed_limits() {
        assert_eq!(clamp_speed(Vec2::new(300.0, 400.0), 120.0).length().round(), 120.0);
        assert_eq!(clamp_speed(Vec2::new(3.0, 4.0), 120.0), Vec2::new(3.0, 4.0));
        assert!((enforce_min_speed(Vec2::new(3.0, 4.0), 16.0).length() - 16.0).abs() < 1e-4);
        assert_eq!(enforce_min_speed(Vec2::ZERO, 16.0), Vec2::ZERO);
    }

    #[test]
    fn test_substep_count() {
        assert_eq!(substep_count(Vec2::ZERO, 18.0), 1);
        assert_eq!(substep_count(Vec2::new(18.0, 0.0), 18.0), 1);
        assert_eq!(substep_count(Vec2::new(0.0, 19.0), 18.0), 2);
        assert_eq!(substep_count(Vec2::new(120.0, 0.0), 18.0), 7);
    }

    proptest! {
        #[test]
        fn prop_block_push_out_clears_overlap(
            x in 60.0f32..230.0,
            y in 60.0f32..230.0,
            vx in -50.0f32..50.0,
            vy in -50.0f32..50.0,
        ) {
            let block = Rect::new(100.0, 100.0, 200.0, 200.0);
            let mut ball = ball_at(x, y, Vec2::new(vx, vy));
            let hit = bounce_off_block(&mut ball, &block, 0.98).hit;
            prop_assert!(!ball.rect().intersects(&block));
            if !hit {
                prop_assert_eq!(ball.pos, Vec2::new(x, y));
            }
        }

        #[test]
        fn prop_enforce_min_speed_never_slows(vx in -200.0f32..200.0, vy in -200.0f32..200.0) {
            let vel = Vec2::new(vx, vy);
            let out = enforce_min_speed(vel, 16.0);
            prop_assert!(out.length() + 1e-3 >= vel.length());
            if vel.length() > 0.01 {
                prop_assert!(out.length() + 1e-3 >= 16.0);
            }
        }
    }
}
