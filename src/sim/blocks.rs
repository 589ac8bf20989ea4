//! Box spawner
//!
//! Boxes appear faster, more often and tougher as the level climbs. Their
//! rewards are fixed at spawn time.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::rect::Rect;
use super::state::{Block, EntityIds};
use crate::tuning::Tuning;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockSpawner {
    last_spawn_ms: u64,
}

impl BlockSpawner {
    pub fn prime(&mut self, now_ms: u64) {
        self.last_spawn_ms = now_ms;
    }

    pub fn reset(&mut self) {
        self.last_spawn_ms = 0;
    }

    /// Spawn at most one box if the level's cooldown elapsed and there is room
    ///
    /// The cooldown restarts only when a box is placed. Returns the id of
    /// the new box.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        now_ms: u64,
        level: u32,
        screen: Vec2,
        blocks: &mut Vec<Block>,
        avoid: &[Rect],
        tuning: &Tuning,
        ids: &mut EntityIds,
        rng: &mut impl Rng,
    ) -> Option<u32> {
        if now_ms.saturating_sub(self.last_spawn_ms) < tuning.box_cooldown_for_level(level) {
            return None;
        }
        // A full field or a failed placement retries next frame
        if blocks.len() >= tuning.max_boxes_for_level(level) {
            return None;
        }

        let block = place_block(level, screen, blocks, avoid, tuning, ids, rng)?;
        self.last_spawn_ms = now_ms;
        let id = block.id;
        log::info!(
            "Box {} spawned with {} hp ({} xp, {} score)",
            id,
            block.hp,
            block.xp_reward,
            block.score_reward
        );
        blocks.push(block);
        Some(id)
    }
}

/// Rewards for a box of `hp` at `level`
pub fn block_rewards(hp: u32, level: u32, tuning: &Tuning) -> (u32, u32) {
    let xp = hp * tuning.box_xp_per_hp + level;
    let score = hp * tuning.box_score_per_hp + level * 2;
    (xp, score)
}

fn place_block(
    level: u32,
    screen: Vec2,
    blocks: &[Block],
    avoid: &[Rect],
    tuning: &Tuning,
    ids: &mut EntityIds,
    rng: &mut impl Rng,
) -> Option<Block> {
    for _ in 0..tuning.box_spawn_attempts {
        let width = rng.random_range(tuning.box_min_width..=tuning.box_max_width);
        let x_range = screen.x - width - 80.0;
        if x_range <= 0.0 {
            return None;
        }
        let origin = Vec2::new(
            40.0 + rng.random::<f32>() * x_range,
            screen.y * 0.15 + rng.random::<f32>() * screen.y * 0.40,
        );
        let rect = Rect::from_origin_size(origin, Vec2::new(width, tuning.box_height));

        let blocked = blocks.iter().any(|b| b.rect.intersects(&rect))
            || avoid.iter().any(|r| r.intersects(&rect));
        if blocked {
            continue;
        }

        let base_hp = rng.random_range(tuning.box_min_hp..=tuning.box_max_hp);
        let hp = tuning.box_hp_for_level(level, base_hp);
        let (xp_reward, score_reward) = block_rewards(hp, level, tuning);
        return Some(Block {
            id: ids.next(),
            rect,
            hp,
            xp_reward,
            score_reward,
        });
    }
    None
}
