//! Jump physics
//!
//! One `step` per rendered frame. Gravity follows the current obstacle
//! speed, and holding the jump key softens it below the hold cap.

use serde::{Deserialize, Serialize};

use crate::consts::GROUND_LEVEL;
use crate::tuning::Tuning;

/// Result of advancing a jump by one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JumpStep {
    /// Still in the air at this height
    Airborne(f32),
    /// Touched down, the arc is finished
    Landed,
}

/// An in-flight jump
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpArc {
    pub position: f32,
    pub velocity: f32,
}

impl JumpArc {
    /// Leave the ground from `position` with the configured take-off velocity
    pub fn launch(position: f32, tuning: &Tuning) -> Self {
        Self {
            position,
            velocity: tuning.jump_velocity,
        }
    }

    /// Advance one frame at the given obstacle speed
    pub fn step(&mut self, speed: f32, holding: bool, tuning: &Tuning) -> JumpStep {
        let gravity = tuning.gravity_at(speed);

        if holding && self.position < tuning.hold_height_cap {
            self.velocity -= gravity * tuning.hold_gravity_factor;
        } else {
            self.velocity -= gravity;
        }
        self.position += self.velocity;

        if self.position <= GROUND_LEVEL {
            self.position = GROUND_LEVEL;
            JumpStep::Landed
        } else {
            JumpStep::Airborne(self.position)
        }
    }
}
