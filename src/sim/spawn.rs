//! Obstacle batch generation
//!
//! A batch is 1-3 groups of 1-3 obstacles. Groups are scored as a unit, so
//! every group gets its own id.

use rand::Rng;

use super::state::{Obstacle, ObstacleSprite};
use crate::consts::*;

/// Generate a batch starting `offset` px beyond the spawn line.
///
/// Group ids are `first_group_id`, `first_group_id + 1`, ... in group order.
/// The caller merges the result into the live obstacle list.
pub fn generate_obstacles<R: Rng + ?Sized>(
    rng: &mut R,
    first_group_id: u64,
    offset: f32,
) -> Vec<Obstacle> {
    let num_groups = rng.random_range(1..=MAX_GROUPS_PER_BATCH);
    let mut obstacles = Vec::with_capacity((num_groups * MAX_GROUP_SIZE) as usize);
    let mut group_x = SPAWN_X + offset;

    for group in 0..num_groups {
        let group_id = first_group_id + group as u64;
        let group_size = rng.random_range(1..=MAX_GROUP_SIZE);

        for i in 0..group_size {
            obstacles.push(Obstacle {
                left: group_x + i as f32 * OBSTACLE_GAP,
                height: rng.random_range(OBSTACLE_MIN_HEIGHT..=OBSTACLE_MAX_HEIGHT) as f32,
                sprite: ObstacleSprite::ALL[rng.random_range(0..ObstacleSprite::ALL.len())],
                group_id,
                passed: false,
            });
        }
        group_x += GROUP_SPACING;
    }

    obstacles
}
