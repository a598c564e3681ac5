//! Character vs obstacle collision
//!
//! The character never moves horizontally, so a hit is a band test on the
//! obstacle's leading edge plus a height check.

use super::state::GameState;
use crate::consts::*;

/// True if an obstacle at `left` with `height` hits the character
#[inline]
pub fn hits_character(left: f32, height: f32, character_bottom: f32) -> bool {
    left < HIT_BAND_MAX && left > HIT_BAND_MIN && character_bottom < height + HIT_MARGIN
}

/// Index of the first obstacle hitting the character, if any
pub fn find_collision(state: &GameState) -> Option<usize> {
    state
        .obstacles
        .iter()
        .position(|o| hits_character(o.left, o.height, state.character_bottom))
}
