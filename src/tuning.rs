//! Data-driven game balance
//!
//! Everything that shapes difficulty lives here so it can be tweaked from
//! JSON without touching the simulation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a tuning file
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Balance values for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Obstacle speed at the start of a run (px per tick)
    pub base_speed: f32,
    /// Obstacle speed never exceeds this
    pub max_speed: f32,
    /// Points for clearing a whole group
    pub group_points: u64,
    /// Speed added per cleared group
    pub group_speed_step: f32,
    /// Score interval between milestone speed-ups
    pub milestone_interval: u64,
    /// Speed added per milestone
    pub milestone_speed_step: f32,
    /// Gravity at base speed (px per frame²)
    pub base_gravity: f32,
    /// Initial upward velocity of a jump (px per frame)
    pub jump_velocity: f32,
    /// Fraction of gravity applied while the jump key is held
    pub hold_gravity_factor: f32,
    /// Holding stops helping above this height
    pub hold_height_cap: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            base_speed: 11.0,
            max_speed: 20.0,
            group_points: 2,
            group_speed_step: 0.05,
            milestone_interval: 20,
            milestone_speed_step: 2.0,
            base_gravity: 0.2,
            jump_velocity: 9.0,
            hold_gravity_factor: 0.4,
            hold_height_cap: 250.0,
        }
    }
}

impl Tuning {
    /// Parse and validate a (possibly partial) JSON tuning document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        if !(self.base_speed > 0.0) {
            return Err(TuningError::Invalid {
                field: "base_speed",
                reason: "must be positive",
            });
        }
        if self.max_speed < self.base_speed {
            return Err(TuningError::Invalid {
                field: "max_speed",
                reason: "must not be below base_speed",
            });
        }
        if self.milestone_interval == 0 {
            return Err(TuningError::Invalid {
                field: "milestone_interval",
                reason: "must be non-zero",
            });
        }
        if self.group_speed_step < 0.0 || self.milestone_speed_step < 0.0 {
            return Err(TuningError::Invalid {
                field: "speed_step",
                reason: "speed-ups must not be negative",
            });
        }
        if !(self.base_gravity > 0.0) || !(self.jump_velocity > 0.0) {
            return Err(TuningError::Invalid {
                field: "base_gravity",
                reason: "gravity and jump velocity must be positive",
            });
        }
        if !(0.0..=1.0).contains(&self.hold_gravity_factor) {
            return Err(TuningError::Invalid {
                field: "hold_gravity_factor",
                reason: "must be within 0..=1",
            });
        }
        Ok(())
    }

    /// Gravity at the given obstacle speed.
    ///
    /// Scales with speed so jump arcs compress as the run gets faster.
    pub fn gravity_at(&self, speed: f32) -> f32 {
        self.base_gravity * (speed / self.base_speed)
    }
}
