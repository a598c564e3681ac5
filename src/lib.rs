//! Espresso Escape - an endless-runner arcade game
//!
//! Core modules:
//! - `sim`: Simulation (jump physics, obstacle stream, collisions, scoring)
//! - `session`: Start/play/game-over state machine and its scheduled tasks
//! - `platform`: Host scheduling and input mapping
//! - `highscores`: Persistent best score
//! - `tuning`: Data-driven game balance
//! - `autopilot`: Jump planner for the headless demo

pub mod audio;
pub mod autopilot;
pub mod highscores;
pub mod platform;
pub mod session;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use audio::{AudioSink, SilentAudio, SoundEffect};
pub use highscores::{MemoryScoreStore, ScoreStore};
pub use session::{RenderView, Session};
pub use settings::Settings;
pub use tuning::{Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// World tick period in milliseconds
    pub const WORLD_TICK_MS: u32 = 30;
    /// Display refresh period used by headless hosts (60 Hz)
    pub const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Play field dimensions (px)
    pub const FIELD_WIDTH: f32 = 1100.0;
    pub const FIELD_HEIGHT: f32 = 600.0;

    /// World x of the first obstacle in a fresh batch
    pub const SPAWN_X: f32 = 1100.0;
    /// Horizontal distance between obstacles of one group
    pub const OBSTACLE_GAP: f32 = 60.0;
    /// Distance between the first obstacles of consecutive groups
    pub const GROUP_SPACING: f32 = 500.0;
    pub const MAX_GROUPS_PER_BATCH: u32 = 3;
    pub const MAX_GROUP_SIZE: u32 = 3;

    /// Obstacle footprint
    pub const OBSTACLE_WIDTH: f32 = 60.0;
    pub const OBSTACLE_MIN_HEIGHT: u32 = 70;
    pub const OBSTACLE_MAX_HEIGHT: u32 = 129;

    /// Character sprite, fixed on screen
    pub const CHARACTER_X: f32 = 50.0;
    pub const CHARACTER_WIDTH: f32 = 60.0;
    pub const CHARACTER_HEIGHT: f32 = 70.0;
    pub const GROUND_LEVEL: f32 = 0.0;

    /// An obstacle is passed once its trailing edge is left of this line
    pub const PASS_LINE: f32 = 50.0;
    /// Obstacles at or left of this x are dropped
    pub const DESPAWN_X: f32 = -60.0;
    /// A new batch is requested when the rightmost obstacle is left of this
    pub const REFILL_X: f32 = 400.0;

    /// Hit-box band (exclusive) around the character's screen position
    pub const HIT_BAND_MIN: f32 = 20.0;
    pub const HIT_BAND_MAX: f32 = 80.0;
    /// Clearance the character needs above an obstacle's height
    pub const HIT_MARGIN: f32 = 50.0;
}
