//! Session state machine
//!
//! `NotStarted -> Playing -> GameOver -> Playing -> ...`
//!
//! The session owns the game state, the collaborators (best-score store and
//! audio), the player's sound preferences and the two recurring tasks.
//! Hosts feed it input signals and task callbacks, apply the task commands
//! it queues, and read `view()` to draw.
//! Everything runs on one thread, each call to completion.

use serde::Serialize;

use crate::audio::{AudioSink, SoundEffect};
use crate::highscores::ScoreStore;
use crate::platform::input::InputSignal;
use crate::platform::tasks::{TaskCommand, TaskHandle, TaskKind, TaskSet};
use crate::settings::Settings;
use crate::sim::{
    GameEvent, GamePhase, GameState, Obstacle, advance_world, apply_milestones, find_collision,
};
use crate::tuning::Tuning;

/// Read-only snapshot for the renderer
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RenderView<'a> {
    pub character_bottom: f32,
    pub obstacles: &'a [Obstacle],
    pub score: u64,
    pub high_score: u64,
    pub obstacle_speed: f32,
    pub has_started: bool,
    pub is_game_over: bool,
    pub is_new_high_score: bool,
}

/// One player's game, from title screen through any number of runs
pub struct Session<S: ScoreStore, A: AudioSink> {
    state: GameState,
    tuning: Tuning,
    store: S,
    audio: A,
    settings: Settings,
    tasks: TaskSet,
    events: Vec<GameEvent>,
}

impl<S: ScoreStore, A: AudioSink> Session<S, A> {
    /// Create a session on the title screen. Reads the stored best once.
    pub fn new(store: S, audio: A, tuning: Tuning, seed: u64) -> Self {
        let high_score = store.get();
        log::info!("Session created (seed {}, best {})", seed, high_score);
        Self {
            state: GameState::new(seed, high_score, &tuning),
            tuning,
            store,
            audio,
            settings: Settings::default(),
            tasks: TaskSet::new(),
            events: Vec::new(),
        }
    }

    /// Use stored sound preferences and push them to the audio sink
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self.audio.set_volume(self.settings.effective_sfx_volume());
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Running world tick task, if any
    pub fn world_task(&self) -> Option<TaskHandle> {
        self.tasks.current(TaskKind::WorldTick)
    }

    /// Running jump frame task, if any
    pub fn jump_task(&self) -> Option<TaskHandle> {
        self.tasks.current(TaskKind::JumpFrame)
    }

    /// Task start/cancel commands for the host scheduler
    pub fn drain_task_commands(&mut self) -> Vec<TaskCommand> {
        self.tasks.drain()
    }

    /// Events since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn view(&self) -> RenderView<'_> {
        RenderView {
            character_bottom: self.state.character_bottom,
            obstacles: &self.state.obstacles,
            score: self.state.score,
            high_score: self.state.high_score,
            obstacle_speed: self.state.obstacle_speed,
            has_started: self.state.has_started(),
            is_game_over: self.state.is_game_over(),
            is_new_high_score: self.state.is_new_high_score,
        }
    }

    pub fn handle_input(&mut self, signal: InputSignal) {
        match signal {
            InputSignal::JumpPressed => self.press_jump(),
            InputSignal::JumpReleased => self.release_jump(),
            InputSignal::Confirm => self.confirm(),
            InputSignal::ToggleMute => self.toggle_mute(),
        }
    }

    /// Flip mute, persist it, and apply it to the audio sink
    pub fn toggle_mute(&mut self) {
        self.settings.muted = !self.settings.muted;
        self.settings.save();
        self.audio.set_volume(self.settings.effective_sfx_volume());
        log::info!("Sound {}", if self.settings.muted { "off" } else { "on" });
    }

    /// Start from the title screen or restart after game over
    pub fn confirm(&mut self) {
        match self.state.phase {
            GamePhase::NotStarted => {
                if self.state.begin_run() {
                    log::info!("Run started with {} obstacles", self.state.obstacles.len());
                    self.record(GameEvent::Started);
                    self.tasks.start(TaskKind::WorldTick);
                    self.check_collision();
                }
            }
            GamePhase::GameOver => {
                self.tasks.cancel(TaskKind::JumpFrame);
                if self.state.reset_run(&self.tuning) {
                    log::info!("Run restarted");
                    self.record(GameEvent::Restarted);
                    self.tasks.start(TaskKind::WorldTick);
                    self.check_collision();
                }
            }
            GamePhase::Playing => {}
        }
    }

    /// Jump key down: hold, and jump if grounded
    pub fn press_jump(&mut self) {
        self.state.holding_jump = true;
        if self.state.begin_jump(&self.tuning) {
            self.audio.play(SoundEffect::Jump);
            self.record(GameEvent::Jumped);
            self.tasks.start(TaskKind::JumpFrame);
        }
    }

    /// Jump key up
    pub fn release_jump(&mut self) {
        self.state.holding_jump = false;
    }

    /// Route a host callback to its task. Returns whether the task is still
    /// scheduled afterwards.
    pub fn run_task(&mut self, handle: TaskHandle) -> bool {
        match handle.kind {
            TaskKind::WorldTick => self.on_world_tick(handle),
            TaskKind::JumpFrame => self.on_frame(handle),
        }
    }

    /// World tick callback. Stale handles are ignored.
    /// Returns whether the tick task is still scheduled.
    pub fn on_world_tick(&mut self, handle: TaskHandle) -> bool {
        if !self.tasks.is_current(handle) || !self.state.is_playing() {
            return false;
        }

        for event in advance_world(&mut self.state, &self.tuning) {
            self.record(event);
        }
        if let Some(event) = apply_milestones(&mut self.state, &self.tuning) {
            self.record(event);
        }
        self.check_collision();

        self.tasks.is_current(handle)
    }

    /// Display frame callback for the jump loop. Stale handles are ignored.
    /// Returns whether the loop continues.
    pub fn on_frame(&mut self, handle: TaskHandle) -> bool {
        if !self.tasks.is_current(handle) || !self.state.is_playing() {
            return false;
        }

        if let Some(event) = self.state.step_jump(&self.tuning) {
            self.record(event);
        }
        if !self.state.is_jumping() {
            self.tasks.cancel(TaskKind::JumpFrame);
        }
        self.check_collision();

        self.tasks.is_current(handle)
    }

    /// Unmount: stop both tasks
    pub fn shutdown(&mut self) {
        self.tasks.cancel_all();
        log::info!("Session shut down");
    }

    fn check_collision(&mut self) {
        if !self.state.is_playing() {
            return;
        }
        if let Some(obstacle) = find_collision(&self.state) {
            self.record(GameEvent::Collided { obstacle });
            self.game_over();
        }
    }

    /// Playing -> GameOver
    fn game_over(&mut self) {
        self.tasks.cancel_all();
        let new_best = self.state.end_run();
        self.audio.play(SoundEffect::GameOver);

        if new_best {
            self.store.set(self.state.high_score);
            self.audio.play(SoundEffect::HighScore);
            log::info!("Game over: new best {}", self.state.high_score);
        } else {
            log::info!(
                "Game over: score {} (best {})",
                self.state.score,
                self.state.high_score
            );
        }
    }

    fn record(&mut self, event: GameEvent) {
        match event {
            GameEvent::GroupCleared { group_id, score } => {
                log::debug!("Group {} cleared, score {}", group_id, score)
            }
            GameEvent::Milestone { score, speed } => {
                log::info!("Milestone {}: speed now {:.2}", score, speed)
            }
            GameEvent::BatchSpawned { obstacles } => log::debug!("Spawned {} obstacles", obstacles),
            other => log::debug!("{:?}", other),
        }
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highscores::MemoryScoreStore;
    use crate::platform::tasks::ManualClock;
    use crate::sim::ObstacleSprite;

    #[derive(Debug, Default)]
    struct RecordingAudio {
        played: Vec<SoundEffect>,
        volume: Option<f32>,
    }

    impl AudioSink for RecordingAudio {
        fn play(&mut self, effect: SoundEffect) {
            self.played.push(effect);
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = Some(volume);
        }
    }

    type TestSession = Session<MemoryScoreStore, RecordingAudio>;

    fn session_with_best(best: u64) -> TestSession {
        Session::new(
            MemoryScoreStore::with_value(best),
            RecordingAudio::default(),
            Tuning::default(),
            12345,
        )
    }

    fn obstacle(left: f32, group_id: u64) -> Obstacle {
        Obstacle {
            left,
            height: 100.0,
            sprite: ObstacleSprite::MilkJug,
            group_id,
            passed: false,
        }
    }

    fn tick(session: &mut TestSession) -> bool {
        let handle = session.world_task().expect("world tick running");
        session.on_world_tick(handle)
    }

    /// Force a game over with the given score
    fn crash_with_score(session: &mut TestSession, score: u64) {
        session.state.score = score;
        session.state.obstacles = vec![obstacle(91.0, 900)];
        for _ in 0..5 {
            if session.state.is_game_over() {
                break;
            }
            tick(session);
        }
        assert!(session.state.is_game_over());
    }

    #[test]
    fn test_start_spawns_and_ticks() {
        let mut session = session_with_best(0);
        assert_eq!(session.phase(), GamePhase::NotStarted);
        assert!(session.world_task().is_none());

        session.confirm();
        assert_eq!(session.phase(), GamePhase::Playing);
        assert!(!session.state.obstacles.is_empty());
        assert_eq!(session.state.score, 0);
        assert_eq!(session.state.obstacle_speed, 11.0);
        assert!(session.world_task().is_some());

        let before: Vec<f32> = session.state.obstacles.iter().map(|o| o.left).collect();
        assert!(tick(&mut session));
        let after: Vec<f32> = session.state.obstacles.iter().map(|o| o.left).collect();
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b - a, 11.0);
        }
        assert_eq!(session.state.score, 0);
    }

    #[test]
    fn test_confirm_while_playing_is_ignored() {
        let mut session = session_with_best(0);
        session.confirm();
        let world = session.world_task();
        let obstacles = session.state.obstacles.clone();

        session.confirm();
        assert_eq!(session.world_task(), world);
        assert_eq!(session.state.obstacles, obstacles);
    }

    #[test]
    fn test_jump_needs_started_game() {
        let mut session = session_with_best(0);
        session.press_jump();
        assert!(session.jump_task().is_none());
        assert!(session.audio.played.is_empty());
    }

    #[test]
    fn test_jump_runs_until_landing() {
        let mut session = session_with_best(0);
        session.confirm();
        session.handle_input(InputSignal::JumpPressed);
        session.handle_input(InputSignal::JumpReleased);

        let frame = session.jump_task().expect("jump loop running");
        assert_eq!(session.audio.played, vec![SoundEffect::Jump]);

        // Re-pressing mid-air does nothing
        session.press_jump();
        session.release_jump();
        assert_eq!(session.jump_task(), Some(frame));
        assert_eq!(session.audio.played.len(), 1);

        let mut frames = 0;
        while session.on_frame(frame) {
            frames += 1;
            assert!(session.state.character_bottom > 0.0);
        }
        assert!((87..=89).contains(&frames));
        assert_eq!(session.state.character_bottom, 0.0);
        assert!(!session.state.is_jumping());
        assert!(session.jump_task().is_none());
        assert!(session.drain_events().contains(&GameEvent::Landed));

        // Late frame for the finished loop is ignored
        assert!(!session.on_frame(frame));
    }

    #[test]
    fn test_jump_reads_live_speed() {
        let mut session = session_with_best(0);
        session.confirm();
        session.press_jump();
        session.release_jump();
        let frame = session.jump_task().unwrap();

        session.state.obstacle_speed = 22.0;
        session.on_frame(frame);
        // Gravity doubled to 0.4 at twice the base speed
        assert!((session.state.character_bottom - 8.6).abs() < 1e-5);
    }

    #[test]
    fn test_hold_floats_higher() {
        let mut held = session_with_best(0);
        held.confirm();
        held.press_jump();
        let frame = held.jump_task().unwrap();
        held.on_frame(frame);
        assert!((held.state.character_bottom - 8.92).abs() < 1e-5);
    }

    #[test]
    fn test_collision_ends_game_and_cancels_tasks() {
        let mut session = session_with_best(0);
        session.confirm();
        session.state.obstacles = vec![obstacle(91.0, 50)];
        session.press_jump();
        session.release_jump();
        let world = session.world_task().unwrap();
        let frame = session.jump_task().unwrap();
        session.state.jump = None;
        session.state.character_bottom = 0.0;
        session.drain_task_commands();

        // 91 -> 80: boundary, no hit yet
        assert!(session.on_world_tick(world));
        assert!(!session.state.is_game_over());

        // 80 -> 69: hit
        assert!(!session.on_world_tick(world));
        assert!(session.state.is_game_over());
        assert_eq!(
            session.audio.played,
            vec![SoundEffect::Jump, SoundEffect::GameOver]
        );
        assert!(session.world_task().is_none());
        assert!(session.jump_task().is_none());
        let commands = session.drain_task_commands();
        assert!(commands.contains(&TaskCommand::Cancel(world)));
        assert!(commands.contains(&TaskCommand::Cancel(frame)));

        // Stale callbacks don't touch the finished run
        let lefts: Vec<f32> = session.state.obstacles.iter().map(|o| o.left).collect();
        assert!(!session.on_world_tick(world));
        assert!(!session.on_frame(frame));
        let after: Vec<f32> = session.state.obstacles.iter().map(|o| o.left).collect();
        assert_eq!(lefts, after);
    }

    #[test]
    fn test_jumping_clears_obstacle() {
        let mut session = session_with_best(0);
        session.confirm();
        session.state.character_bottom = 160.0;
        session.state.obstacles = vec![obstacle(60.0, 1), obstacle(900.0, 2)];
        tick(&mut session);
        assert!(session.state.is_playing());
    }

    #[test]
    fn test_group_clear_scores_two() {
        let mut session = session_with_best(0);
        session.confirm();
        session.state.obstacles = vec![obstacle(-60.0, 4), obstacle(0.0, 4), obstacle(900.0, 5)];

        tick(&mut session);
        assert_eq!(session.state.score, 2);
        assert!((session.state.obstacle_speed - 11.05).abs() < 1e-5);
    }

    #[test]
    fn test_milestone_bumps_speed_once() {
        let mut session = session_with_best(0);
        session.confirm();
        session.state.score = 18;
        session.state.obstacles = vec![obstacle(-20.0, 1), obstacle(900.0, 2)];

        tick(&mut session);
        assert_eq!(session.state.score, 20);
        assert!((session.state.obstacle_speed - 13.05).abs() < 1e-4);

        tick(&mut session);
        tick(&mut session);
        assert_eq!(session.state.score, 20);
        assert!((session.state.obstacle_speed - 13.05).abs() < 1e-4);

        let milestones = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::Milestone { .. }))
            .count();
        assert_eq!(milestones, 1);
    }

    #[test]
    fn test_lower_score_keeps_best() {
        let mut session = session_with_best(150);
        session.confirm();
        crash_with_score(&mut session, 40);

        assert_eq!(session.store.get(), 150);
        assert_eq!(session.store.writes(), 0);
        assert_eq!(session.state.high_score, 150);
        assert!(!session.view().is_new_high_score);
        assert!(!session.audio.played.contains(&SoundEffect::HighScore));
    }

    #[test]
    fn test_higher_score_persists_once() {
        let mut session = session_with_best(150);
        session.confirm();
        crash_with_score(&mut session, 200);

        assert_eq!(session.store.get(), 200);
        assert_eq!(session.store.writes(), 1);
        assert_eq!(session.view().high_score, 200);
        assert!(session.view().is_new_high_score);
        assert_eq!(
            session
                .audio
                .played
                .iter()
                .filter(|e| **e == SoundEffect::HighScore)
                .count(),
            1
        );

        // The next run falling short clears the flag and leaves the store alone
        session.confirm();
        crash_with_score(&mut session, 10);
        assert_eq!(session.store.get(), 200);
        assert_eq!(session.store.writes(), 1);
        assert!(!session.view().is_new_high_score);
    }

    #[test]
    fn test_restart_resets_run() {
        let mut session = session_with_best(0);
        session.confirm();
        session.state.obstacle_speed = 15.0;
        session.state.milestones_reached = 2;
        crash_with_score(&mut session, 44);
        session.drain_task_commands();

        session.handle_input(InputSignal::Confirm);
        assert_eq!(session.phase(), GamePhase::Playing);
        assert_eq!(session.state.score, 0);
        assert_eq!(session.state.obstacle_speed, 11.0);
        assert_eq!(session.state.milestones_reached, 0);
        assert_eq!(session.state.character_bottom, 0.0);
        assert!(session.state.obstacles.iter().all(|o| o.left >= 1100.0));
        assert_eq!(session.state.high_score, 44);

        let commands = session.drain_task_commands();
        assert!(matches!(
            commands.as_slice(),
            [TaskCommand::Start { handle, .. }] if handle.kind == TaskKind::WorldTick
        ));
    }

    #[test]
    fn test_restarted_run_earns_milestone_again() {
        let mut session = session_with_best(0);
        session.confirm();
        session.state.score = 18;
        session.state.obstacles = vec![obstacle(-20.0, 1), obstacle(900.0, 2)];
        tick(&mut session);
        assert_eq!(session.state.milestones_reached, 1);
        crash_with_score(&mut session, 20);

        session.confirm();
        session.drain_events();
        session.state.score = 18;
        session.state.obstacles = vec![obstacle(-20.0, 3), obstacle(900.0, 4)];
        tick(&mut session);
        assert_eq!(session.state.score, 20);
        assert!((session.state.obstacle_speed - 13.05).abs() < 1e-4);
        assert!(
            session
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::Milestone { score: 20, .. }))
        );
    }

    #[test]
    fn test_shutdown_cancels_everything() {
        let mut session = session_with_best(0);
        session.confirm();
        session.press_jump();
        let world = session.world_task().unwrap();
        let frame = session.jump_task().unwrap();

        session.shutdown();
        assert!(!session.on_world_tick(world));
        assert!(!session.on_frame(frame));
        assert!(session.state.is_playing());
    }

    #[test]
    fn test_idle_runner_crashes_on_first_obstacle() {
        let mut session = session_with_best(0);
        let mut clock = ManualClock::default();
        session.confirm();
        clock.apply(session.drain_task_commands());

        let mut steps = 0;
        while !session.state.is_game_over() && steps < 10_000 {
            for handle in clock.advance() {
                session.run_task(handle);
                clock.apply(session.drain_task_commands());
            }
            steps += 1;
        }

        assert!(session.state.is_game_over());
        assert_eq!(session.state.score, 0);
        assert!(clock.is_idle());
        // First obstacle needs about 93 ticks of 30 ms to reach the character
        assert!(clock.now_ms() >= 90.0 * 30.0 && clock.now_ms() <= 100.0 * 30.0);
    }

    #[test]
    fn test_mute_toggle_reaches_audio() {
        let mut session = session_with_best(0).with_settings(Settings {
            master_volume: 0.5,
            ..Default::default()
        });
        assert_eq!(session.audio.volume, Some(0.5));

        session.handle_input(InputSignal::ToggleMute);
        assert!(session.settings().muted);
        assert_eq!(session.audio.volume, Some(0.0));

        session.handle_input(InputSignal::ToggleMute);
        assert!(!session.settings().muted);
        assert_eq!(session.audio.volume, Some(0.5));
        assert_eq!(session.phase(), GamePhase::NotStarted);
    }

    #[test]
    fn test_view_serializes() {
        let mut session = session_with_best(7);
        session.confirm();
        let json = serde_json::to_value(session.view()).unwrap();
        assert_eq!(json["has_started"], true);
        assert_eq!(json["high_score"], 7);
        assert!(json["obstacles"].as_array().unwrap().len() >= 1);
        assert_eq!(json["obstacles"][0]["passed"], false);
    }
}
