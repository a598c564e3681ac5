//! Jump planner for the headless demo
//!
//! On every world tick while grounded, the pilot looks at the next few
//! obstacle groups and lists every jump (ticks to wait, height to let go of
//! the key) that clears each one. Plans are chained by landing time, and
//! the pilot presses when the plan that clears the most groups in a row
//! starts now.
//!
//! Heights come from replaying `JumpArc` itself, so gravity follows the
//! current speed exactly. The frame phase relative to the world tick isn't
//! known, so every check assumes the worst frame on either side.

use crate::audio::AudioSink;
use crate::consts::*;
use crate::highscores::ScoreStore;
use crate::session::Session;
use crate::sim::{JumpArc, JumpStep, Obstacle};
use crate::tuning::Tuning;

/// Groups looked at per plan
const LOOKAHEAD: usize = 3;
/// Release heights tried: 0, 10, ... 250 (0 is a tap)
const RELEASE_STEP: f32 = 10.0;
const RELEASE_STEPS: u32 = 25;
/// Extra clearance over each obstacle
const HEIGHT_SLACK: f32 = 0.5;
/// Hit band widening for accumulated scroll rounding
const BAND_SLACK: f32 = 0.5;

const TICK_MS: f64 = WORLD_TICK_MS as f64;

/// One candidate jump
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpPlan {
    /// World ticks to wait before pressing
    pub wait_ticks: u32,
    /// Let go of the key once this high; 0 taps
    pub release_at: f32,
    /// Latest the character can be back on the ground, ms from now
    pub land_ms: f64,
}

impl JumpPlan {
    fn press_ms(&self) -> f64 {
        self.wait_ticks as f64 * TICK_MS
    }
}

/// Heights after each frame of a jump released at `release_at`
fn arc_heights(release_at: f32, speed: f32, tuning: &Tuning) -> Vec<f32> {
    let mut arc = JumpArc::launch(GROUND_LEVEL, tuning);
    let mut holding = release_at > GROUND_LEVEL;
    let mut heights = Vec::new();
    loop {
        if holding && arc.position >= release_at {
            holding = false;
        }
        match arc.step(speed, holding, tuning) {
            JumpStep::Airborne(height) => heights.push(height),
            JumpStep::Landed => return heights,
        }
    }
}

/// Lowest the character can be during `[from_ms, to_ms)` for a jump pressed
/// at `press_ms`, for any frame phase
fn lowest_height(heights: &[f32], press_ms: f64, from_ms: f64, to_ms: f64) -> f32 {
    const EPS: f64 = 1e-6;
    let first = ((from_ms - press_ms) / FRAME_MS - EPS).floor() as i64;
    let last = ((to_ms - press_ms) / FRAME_MS + EPS).floor() as i64 + 1;

    let mut lowest = f32::INFINITY;
    for frame in first..=last {
        let height = usize::try_from(frame - 1)
            .ok()
            .and_then(|i| heights.get(i).copied())
            .unwrap_or(GROUND_LEVEL);
        lowest = lowest.min(height);
        if lowest <= GROUND_LEVEL {
            break;
        }
    }
    lowest
}

/// Whether the jump stays clear of every obstacle in `group`
fn clears_group(group: &[&Obstacle], speed: f32, heights: &[f32], press_ms: f64) -> bool {
    group.iter().all(|obstacle| {
        // Ticks are counted from now; tick 0 is the current position
        let mut tick = (((obstacle.left - HIT_BAND_MAX) / speed).ceil() as i64 - 1).max(0);
        loop {
            let left = obstacle.left - speed * tick as f32;
            if left <= HIT_BAND_MIN - BAND_SLACK {
                return true;
            }
            if left < HIT_BAND_MAX + BAND_SLACK {
                let from_ms = tick as f64 * TICK_MS;
                let lowest = lowest_height(heights, press_ms, from_ms, from_ms + TICK_MS);
                if lowest < obstacle.height + HIT_MARGIN + HEIGHT_SLACK {
                    return false;
                }
            }
            tick += 1;
        }
    })
}

/// Unscored obstacles still able to hit, grouped, nearest group first
fn groups_ahead(obstacles: &[Obstacle]) -> Vec<Vec<&Obstacle>> {
    let mut live: Vec<&Obstacle> = obstacles
        .iter()
        .filter(|o| !o.passed && o.left > HIT_BAND_MIN)
        .collect();
    live.sort_by(|a, b| a.left.total_cmp(&b.left));

    let mut groups: Vec<Vec<&Obstacle>> = Vec::new();
    for obstacle in live {
        match groups.iter().position(|g| g[0].group_id == obstacle.group_id) {
            Some(i) => groups[i].push(obstacle),
            None if groups.len() < LOOKAHEAD => groups.push(vec![obstacle]),
            None => {}
        }
    }
    groups
}

/// Pick the next jump for the field as it is right after a world tick.
/// `None` when nothing is ahead or no jump can clear the nearest group.
pub fn plan_jump(obstacles: &[Obstacle], speed: f32, tuning: &Tuning) -> Option<JumpPlan> {
    let groups = groups_ahead(obstacles);
    if groups.is_empty() {
        return None;
    }

    let arcs: Vec<(f32, Vec<f32>)> = (0..=RELEASE_STEPS)
        .map(|i| {
            let release_at = i as f32 * RELEASE_STEP;
            (release_at, arc_heights(release_at, speed, tuning))
        })
        .collect();

    let stages: Vec<Vec<JumpPlan>> = groups
        .iter()
        .map(|group| {
            let rightmost = group.iter().map(|o| o.left).fold(f32::MIN, f32::max);
            let last_tick = ((rightmost - HIT_BAND_MIN) / speed).ceil().max(0.0) as u32 + 1;
            let mut plans = Vec::new();
            for wait_ticks in 0..=last_tick {
                let press_ms = wait_ticks as f64 * TICK_MS;
                for (release_at, heights) in &arcs {
                    if clears_group(group, speed, heights, press_ms) {
                        plans.push(JumpPlan {
                            wait_ticks,
                            release_at: *release_at,
                            land_ms: press_ms + (heights.len() + 1) as f64 * FRAME_MS,
                        });
                    }
                }
            }
            plans
        })
        .collect();

    // Groups cleared in a row starting with each plan, last stage first
    let mut depth = vec![1usize; stages[stages.len() - 1].len()];
    for k in (0..stages.len() - 1).rev() {
        let next = &stages[k + 1];
        depth = stages[k]
            .iter()
            .map(|plan| {
                1 + next
                    .iter()
                    .zip(&depth)
                    .filter(|(after, _)| after.press_ms() >= plan.land_ms)
                    .map(|(_, d)| *d)
                    .max()
                    .unwrap_or(0)
            })
            .collect();
    }

    stages[0]
        .iter()
        .zip(&depth)
        .max_by(|(a, da), (b, db)| {
            da.cmp(db)
                .then(b.land_ms.total_cmp(&a.land_ms))
                .then(b.release_at.total_cmp(&a.release_at))
        })
        .map(|(plan, _)| *plan)
}

/// Drives the jump key of a session
#[derive(Debug, Default)]
pub struct Autopilot {
    /// Height to let go at during the current jump
    release_at: Option<f32>,
    jumps: u32,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jumps taken so far
    pub fn jumps(&self) -> u32 {
        self.jumps
    }

    /// React to a clock step. Jumps are only planned on world ticks.
    pub fn act<S: ScoreStore, A: AudioSink>(
        &mut self,
        session: &mut Session<S, A>,
        world_ticked: bool,
    ) {
        if let Some(height) = self.release_at {
            let state = session.state();
            if !state.is_jumping() || state.character_bottom >= height {
                session.release_jump();
                self.release_at = None;
            }
        }

        let state = session.state();
        if !world_ticked || !state.is_playing() || state.is_jumping() {
            return;
        }
        let Some(plan) = plan_jump(&state.obstacles, state.obstacle_speed, session.tuning()) else {
            return;
        };
        if plan.wait_ticks > 0 {
            return;
        }

        log::debug!("Jump, releasing at {}", plan.release_at);
        session.press_jump();
        self.jumps += 1;
        if plan.release_at > GROUND_LEVEL {
            self.release_at = Some(plan.release_at);
        } else {
            session.release_jump();
        }
    }
}
