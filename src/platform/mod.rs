//! Platform abstraction layer
//!
//! Handles what the host provides to the session:
//! - Task scheduling (timers, display frames)
//! - Input events

pub mod input;
pub mod tasks;

pub use input::{InputSignal, KeyPhase, map_key};
pub use tasks::{Cadence, ManualClock, TaskCommand, TaskHandle, TaskKind, TaskSet};
