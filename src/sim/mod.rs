//! Simulation module
//!
//! All gameplay logic lives here:
//! - Seeded RNG only
//! - State is only changed through the transforms below
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod jump;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{find_collision, hits_character};
pub use jump::{JumpArc, JumpStep};
pub use spawn::generate_obstacles;
pub use state::{GameEvent, GamePhase, GameState, Obstacle, ObstacleSprite};
pub use tick::{advance_world, apply_milestones};
