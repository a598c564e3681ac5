//! Fixed-period world tick
//!
//! Scrolls the field, scores cleared groups, drops off-screen obstacles and
//! keeps the obstacle stream topped up.

use super::state::{GameEvent, GameState};
use crate::consts::*;
use crate::tuning::Tuning;

/// Advance the world by one tick. Does nothing unless playing.
pub fn advance_world(state: &mut GameState, tuning: &Tuning) -> Vec<GameEvent> {
    let mut events = Vec::new();
    if !state.is_playing() {
        return events;
    }

    state.time_ticks += 1;
    let speed = state.obstacle_speed;

    // Scroll
    for obstacle in &mut state.obstacles {
        obstacle.left -= speed;
    }

    // Pass line. A group scores once, when its last member crosses.
    for i in 0..state.obstacles.len() {
        let group_id = {
            let obstacle = &mut state.obstacles[i];
            if obstacle.passed || obstacle.left + OBSTACLE_WIDTH >= PASS_LINE {
                continue;
            }
            obstacle.passed = true;
            obstacle.group_id
        };

        let group_cleared = state
            .obstacles
            .iter()
            .filter(|o| o.group_id == group_id)
            .all(|o| o.passed);
        if group_cleared {
            state.score += tuning.group_points;
            state.obstacle_speed = (state.obstacle_speed + tuning.group_speed_step).min(tuning.max_speed);
            events.push(GameEvent::GroupCleared {
                group_id,
                score: state.score,
            });
        }
    }

    state.obstacles.retain(|o| o.left > DESPAWN_X);

    // Refill once the field thins out; an empty field counts as position 0
    let rightmost = state
        .obstacles
        .iter()
        .map(|o| o.left)
        .fold(0.0_f32, f32::max);
    if rightmost < REFILL_X {
        let obstacles = state.spawn_batch(0.0);
        events.push(GameEvent::BatchSpawned { obstacles });
    }

    events
}

/// Reward each score milestone reached since the last call, once.
pub fn apply_milestones(state: &mut GameState, tuning: &Tuning) -> Option<GameEvent> {
    let reached = state.score / tuning.milestone_interval;
    if reached <= state.milestones_reached {
        return None;
    }

    let newly_reached = reached - state.milestones_reached;
    state.milestones_reached = reached;
    state.obstacle_speed = (state.obstacle_speed
        + tuning.milestone_speed_step * newly_reached as f32)
        .min(tuning.max_speed);

    Some(GameEvent::Milestone {
        score: state.score,
        speed: state.obstacle_speed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{GamePhase, Obstacle, ObstacleSprite};
    use proptest::prelude::*;

    fn obstacle(left: f32, group_id: u64) -> Obstacle {
        Obstacle {
            left,
            height: 100.0,
            sprite: ObstacleSprite::Grinder,
            group_id,
            passed: false,
        }
    }

    fn playing_state(tuning: &Tuning) -> GameState {
        let mut state = GameState::new(12345, 0, tuning);
        state.begin_run();
        state
    }

    #[test]
    fn test_tick_scrolls_by_speed() {
        let tuning = Tuning::default();
        let mut state = playing_state(&tuning);
        let before: Vec<f32> = state.obstacles.iter().map(|o| o.left).collect();

        let events = advance_world(&mut state, &tuning);

        let after: Vec<f32> = state.obstacles.iter().map(|o| o.left).collect();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b - a, 11.0);
        }
        assert_eq!(state.score, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_tick_ignored_unless_playing() {
        let tuning = Tuning::default();
        let mut state = GameState::new(1, 0, &tuning);
        state.obstacles.push(obstacle(500.0, 1));
        advance_world(&mut state, &tuning);
        assert_eq!(state.obstacles[0].left, 500.0);

        state.phase = GamePhase::GameOver;
        advance_world(&mut state, &tuning);
        assert_eq!(state.obstacles[0].left, 500.0);
    }

    #[test]
    fn test_group_scores_when_all_members_pass_same_tick() {
        let tuning = Tuning::default();
        let mut state = playing_state(&tuning);
        state.obstacles = vec![obstacle(-30.0, 7), obstacle(30.0, 7), obstacle(900.0, 8)];

        // Trailing edges land at 19 and 79: only the first member has passed
        let events = advance_world(&mut state, &tuning);
        assert_eq!(state.score, 0);
        assert!(events.is_empty());
        assert!(state.obstacles[0].passed);
        assert!(!state.obstacles[1].passed);

        state.obstacles = vec![obstacle(-60.0, 9), obstacle(0.0, 9), obstacle(900.0, 10)];
        let events = advance_world(&mut state, &tuning);
        assert_eq!(state.score, 2);
        assert!((state.obstacle_speed - 11.05).abs() < 1e-5);
        assert_eq!(
            events,
            vec![GameEvent::GroupCleared {
                group_id: 9,
                score: 2
            }]
        );
        // The -71 member is despawned after scoring, its partner stays
        assert_eq!(state.obstacles.len(), 2);
    }

    #[test]
    fn test_group_scores_exactly_once_across_ticks() {
        let tuning = Tuning::default();
        let mut state = playing_state(&tuning);
        state.obstacles = vec![obstacle(0.0, 3), obstacle(60.0, 3), obstacle(1000.0, 4)];

        let mut clears = 0;
        for _ in 0..20 {
            let events = advance_world(&mut state, &tuning);
            clears += events
                .iter()
                .filter(|e| matches!(e, GameEvent::GroupCleared { group_id: 3, .. }))
                .count();
        }
        assert_eq!(clears, 1);
        assert_eq!(state.score, 2);
    }

    #[test]
    fn test_offscreen_obstacles_dropped() {
        let tuning = Tuning::default();
        let mut state = playing_state(&tuning);
        state.obstacles = vec![obstacle(-49.0, 1), obstacle(-48.0, 2), obstacle(900.0, 3)];
        state.obstacles[0].passed = true;
        state.obstacles[1].passed = true;

        advance_world(&mut state, &tuning);
        // -60 is dropped, -59 survives
        let lefts: Vec<f32> = state.obstacles.iter().map(|o| o.left).collect();
        assert_eq!(lefts, vec![-59.0, 889.0]);
    }

    #[test]
    fn test_refill_when_field_thins() {
        let tuning = Tuning::default();
        let mut state = playing_state(&tuning);
        state.obstacles = vec![obstacle(405.0, 1)];

        let events = advance_world(&mut state, &tuning);
        assert!(matches!(events.as_slice(), [GameEvent::BatchSpawned { .. }]));
        assert_eq!(state.obstacles[0].left, 394.0);
        assert_eq!(state.obstacles[1].left, 1100.0);
        assert!(state.obstacles[1].group_id != 1);
    }

    #[test]
    fn test_refill_on_empty_field() {
        let tuning = Tuning::default();
        let mut state = playing_state(&tuning);
        state.obstacles.clear();
        advance_world(&mut state, &tuning);
        assert!(!state.obstacles.is_empty());
        assert_eq!(state.obstacles[0].left, 1100.0);
    }

    #[test]
    fn test_speed_capped_by_group_clears() {
        let tuning = Tuning::default();
        let mut state = playing_state(&tuning);
        state.obstacle_speed = 19.98;
        state.obstacles = vec![obstacle(-20.0, 5), obstacle(900.0, 6)];
        advance_world(&mut state, &tuning);
        assert_eq!(state.obstacle_speed, 20.0);
    }

    #[test]
    fn test_milestone_applies_once() {
        let tuning = Tuning::default();
        let mut state = playing_state(&tuning);
        state.score = 18;
        assert_eq!(apply_milestones(&mut state, &tuning), None);

        state.score = 20;
        let event = apply_milestones(&mut state, &tuning);
        assert!(matches!(event, Some(GameEvent::Milestone { score: 20, .. })));
        assert_eq!(state.obstacle_speed, 13.0);

        // Score still 20 on later ticks: no second bump
        assert_eq!(apply_milestones(&mut state, &tuning), None);
        assert_eq!(apply_milestones(&mut state, &tuning), None);
        assert_eq!(state.obstacle_speed, 13.0);

        state.score = 40;
        apply_milestones(&mut state, &tuning);
        assert_eq!(state.obstacle_speed, 15.0);
    }

    #[test]
    fn test_milestone_respects_cap() {
        let tuning = Tuning::default();
        let mut state = playing_state(&tuning);
        state.obstacle_speed = 19.5;
        state.score = 20;
        apply_milestones(&mut state, &tuning);
        assert_eq!(state.obstacle_speed, 20.0);
    }

    proptest! {
        #[test]
        fn prop_speed_monotonic_and_capped(seed in any::<u64>(), ticks in 1usize..400) {
            let tuning = Tuning::default();
            let mut state = GameState::new(seed, 0, &tuning);
            state.begin_run();
            let mut last_speed = state.obstacle_speed;
            for _ in 0..ticks {
                advance_world(&mut state, &tuning);
                apply_milestones(&mut state, &tuning);
                prop_assert!(state.obstacle_speed >= last_speed);
                prop_assert!(state.obstacle_speed <= tuning.max_speed);
                prop_assert_eq!(state.score % 2, 0);
                last_speed = state.obstacle_speed;
            }
        }
    }
}
