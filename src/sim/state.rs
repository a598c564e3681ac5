//! Game state and core simulation types
//!
//! The session owns one `GameState`; the spawn, tick, jump and collision
//! modules only ever transform it in place.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::jump::{JumpArc, JumpStep};
use super::spawn::generate_obstacles;
use crate::consts::*;
use crate::tuning::Tuning;

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, waiting for the start key
    NotStarted,
    /// Active gameplay
    Playing,
    /// Run ended, waiting for the restart key
    GameOver,
}

/// Obstacle artwork
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleSprite {
    CoffeeMaker,
    Grinder,
    Kettle,
    MilkJug,
    BeanSack,
}

impl ObstacleSprite {
    pub const ALL: [ObstacleSprite; 5] = [
        ObstacleSprite::CoffeeMaker,
        ObstacleSprite::Grinder,
        ObstacleSprite::Kettle,
        ObstacleSprite::MilkJug,
        ObstacleSprite::BeanSack,
    ];
}

/// An obstacle scrolling toward the character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// World x of the leading edge (px, decreases every tick)
    pub left: f32,
    /// Vertical size (px)
    pub height: f32,
    pub sprite: ObstacleSprite,
    /// Scoring group this obstacle was spawned in
    pub group_id: u64,
    /// Trailing edge has crossed the pass line
    pub passed: bool,
}

/// Things that happened during a step, for logging and audio
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    Started,
    Restarted,
    Jumped,
    Landed,
    BatchSpawned { obstacles: usize },
    GroupCleared { group_id: u64, score: u64 },
    Milestone { score: u64, speed: f32 },
    Collided { obstacle: usize },
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub phase: GamePhase,
    /// Character height above the ground (px)
    pub character_bottom: f32,
    /// In-flight jump, `None` while grounded
    pub jump: Option<JumpArc>,
    /// Jump key is held down
    pub holding_jump: bool,
    /// Live obstacles, in spawn order
    pub obstacles: Vec<Obstacle>,
    pub score: u64,
    /// Best score, mirrored from the persistent store
    pub high_score: u64,
    /// Set at game over when the run beat the stored best
    pub is_new_high_score: bool,
    /// Obstacle speed (px per tick)
    pub obstacle_speed: f32,
    /// Milestones already rewarded this run
    pub milestones_reached: u64,
    /// World ticks simulated this run
    pub time_ticks: u64,
    /// Next unused scoring group id
    next_group_id: u64,
    rng: Pcg32,
}

impl GameState {
    /// Create a fresh, not-yet-started state
    pub fn new(seed: u64, high_score: u64, tuning: &Tuning) -> Self {
        Self {
            seed,
            phase: GamePhase::NotStarted,
            character_bottom: GROUND_LEVEL,
            jump: None,
            holding_jump: false,
            obstacles: Vec::new(),
            score: 0,
            high_score,
            is_new_high_score: false,
            obstacle_speed: tuning.base_speed,
            milestones_reached: 0,
            time_ticks: 0,
            next_group_id: 1,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn has_started(&self) -> bool {
        self.phase != GamePhase::NotStarted
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn is_playing(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    /// Airborne, i.e. a jump arc is in flight
    pub fn is_jumping(&self) -> bool {
        self.jump.is_some()
    }

    /// Append a freshly generated batch and return its size
    pub fn spawn_batch(&mut self, offset: f32) -> usize {
        let batch = generate_obstacles(&mut self.rng, self.next_group_id, offset);
        if let Some(last) = batch.iter().map(|o| o.group_id).max() {
            self.next_group_id = last + 1;
        }
        let count = batch.len();
        self.obstacles.extend(batch);
        count
    }

    /// NotStarted -> Playing
    pub fn begin_run(&mut self) -> bool {
        if self.phase != GamePhase::NotStarted {
            return false;
        }
        self.obstacles.clear();
        self.spawn_batch(0.0);
        self.phase = GamePhase::Playing;
        true
    }

    /// GameOver -> Playing, with a clean field
    pub fn reset_run(&mut self, tuning: &Tuning) -> bool {
        if self.phase != GamePhase::GameOver {
            return false;
        }
        self.character_bottom = GROUND_LEVEL;
        self.jump = None;
        self.score = 0;
        self.obstacle_speed = tuning.base_speed;
        self.milestones_reached = 0;
        self.time_ticks = 0;
        self.obstacles.clear();
        self.spawn_batch(0.0);
        self.phase = GamePhase::Playing;
        true
    }

    /// Start a jump if grounded and playing. Returns whether one started.
    pub fn begin_jump(&mut self, tuning: &Tuning) -> bool {
        if !self.is_playing() || self.is_jumping() || self.character_bottom != GROUND_LEVEL {
            return false;
        }
        self.jump = Some(JumpArc::launch(self.character_bottom, tuning));
        true
    }

    /// Advance the jump by one display frame.
    ///
    /// Reads the live obstacle speed every frame so the arc tightens as the
    /// run speeds up mid-jump.
    pub fn step_jump(&mut self, tuning: &Tuning) -> Option<GameEvent> {
        let arc = self.jump.as_mut()?;
        match arc.step(self.obstacle_speed, self.holding_jump, tuning) {
            JumpStep::Airborne(position) => {
                self.character_bottom = position;
                None
            }
            JumpStep::Landed => {
                self.character_bottom = GROUND_LEVEL;
                self.jump = None;
                Some(GameEvent::Landed)
            }
        }
    }

    /// Playing -> GameOver, folding the score into the best.
    /// Returns true if this run set a new best.
    pub fn end_run(&mut self) -> bool {
        self.phase = GamePhase::GameOver;
        self.is_new_high_score = self.score > self.high_score;
        if self.is_new_high_score {
            self.high_score = self.score;
        }
        self.is_new_high_score
    }
}
