//! Espresso Escape entry point
//!
//! On the web this is the host: it owns the real timers, forwards keyboard
//! events and draws the session's view on a canvas. Natively it runs a
//! headless autopilot game on a virtual clock.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent};

    use espresso_escape::audio::WebAudio;
    use espresso_escape::consts::*;
    use espresso_escape::highscores::LocalStorageScore;
    use espresso_escape::platform::{Cadence, KeyPhase, TaskCommand, TaskHandle, map_key};
    use espresso_escape::sim::ObstacleSprite;
    use espresso_escape::{RenderView, Session, Settings, Tuning};

    /// Game instance holding the session and the timers driving it
    struct Game {
        session: Session<LocalStorageScore, WebAudio>,
        ctx: Option<CanvasRenderingContext2d>,
        /// Live `setInterval` timers per task
        intervals: HashMap<TaskHandle, (i32, Closure<dyn FnMut()>)>,
        /// Tasks stepped once per animation frame
        frame_tasks: Vec<TaskHandle>,
        /// Cancelled timer callbacks, dropped on the next frame since one of
        /// them may be the callback currently running
        retired: Vec<Closure<dyn FnMut()>>,
    }

    impl Game {
        fn render(&self) {
            if let Some(ctx) = &self.ctx {
                draw(ctx, &self.session.view());
            }
        }
    }

    /// Apply the session's queued task commands to real timers
    fn pump_tasks(game: &Rc<RefCell<Game>>) {
        let commands = game.borrow_mut().session.drain_task_commands();
        let Some(window) = web_sys::window() else { return };

        for command in commands {
            match command {
                TaskCommand::Start {
                    handle,
                    cadence: Cadence::EveryMs(period),
                } => {
                    let game_cb = game.clone();
                    let closure = Closure::<dyn FnMut()>::new(move || {
                        game_cb.borrow_mut().session.run_task(handle);
                        pump_tasks(&game_cb);
                    });
                    match window.set_interval_with_callback_and_timeout_and_arguments_0(
                        closure.as_ref().unchecked_ref(),
                        period as i32,
                    ) {
                        Ok(id) => {
                            game.borrow_mut().intervals.insert(handle, (id, closure));
                        }
                        Err(e) => log::warn!("Failed to start timer: {:?}", e),
                    }
                }
                TaskCommand::Start {
                    handle,
                    cadence: Cadence::EveryFrame,
                } => game.borrow_mut().frame_tasks.push(handle),
                TaskCommand::Cancel(handle) => {
                    let mut g = game.borrow_mut();
                    if let Some((id, closure)) = g.intervals.remove(&handle) {
                        window.clear_interval_with_handle(id);
                        g.retired.push(closure);
                    }
                    g.frame_tasks.retain(|h| *h != handle);
                }
            }
        }
    }

    fn canvas_context() -> Option<CanvasRenderingContext2d> {
        let document = web_sys::window()?.document()?;
        let canvas: HtmlCanvasElement = document.get_element_by_id("canvas")?.dyn_into().ok()?;
        canvas.set_width(FIELD_WIDTH as u32);
        canvas.set_height(FIELD_HEIGHT as u32);
        canvas.get_context("2d").ok()??.dyn_into().ok()
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Espresso Escape starting...");

        let settings = Settings::load();
        let seed = js_sys::Date::now() as u64;
        let session = Session::new(LocalStorageScore, WebAudio::new(), Tuning::default(), seed)
            .with_settings(settings);

        let ctx = canvas_context();
        if ctx.is_none() {
            log::warn!("No #canvas found - running without display");
        }

        let game = Rc::new(RefCell::new(Game {
            session,
            ctx,
            intervals: HashMap::new(),
            frame_tasks: Vec::new(),
            retired: Vec::new(),
        }));

        setup_input_handlers(game.clone());
        setup_unload(game.clone());
        request_animation_frame(game);

        log::info!("Espresso Escape running!");
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };

        for (event_name, phase) in [("keydown", KeyPhase::Down), ("keyup", KeyPhase::Up)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let Some(signal) = map_key(&event.code(), phase) else { return };
                event.prevent_default();
                game.borrow_mut().session.handle_input(signal);
                pump_tasks(&game);
            });
            let _ = window.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Stop both tasks when the page goes away
    fn setup_unload(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            game.borrow_mut().session.shutdown();
            pump_tasks(&game);
        });
        let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |_time: f64| {
            game_loop(game);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>) {
        {
            let mut g = game.borrow_mut();
            g.retired.clear();
            let frame_tasks = g.frame_tasks.clone();
            for handle in frame_tasks {
                g.session.run_task(handle);
            }
        }
        pump_tasks(&game);
        game.borrow().render();

        request_animation_frame(game);
    }

    fn sprite_color(sprite: ObstacleSprite) -> &'static str {
        match sprite {
            ObstacleSprite::CoffeeMaker => "#8d5b3e",
            ObstacleSprite::Grinder => "#6f4e37",
            ObstacleSprite::Kettle => "#a3a3a3",
            ObstacleSprite::MilkJug => "#e8e1d9",
            ObstacleSprite::BeanSack => "#b67237",
        }
    }

    fn draw(ctx: &CanvasRenderingContext2d, view: &RenderView<'_>) {
        let w = FIELD_WIDTH as f64;
        let h = FIELD_HEIGHT as f64;

        ctx.set_fill_style_str("#451f17");
        ctx.fill_rect(0.0, 0.0, w, h);

        // Heights are measured up from the ground line
        for obstacle in view.obstacles {
            ctx.set_fill_style_str(sprite_color(obstacle.sprite));
            ctx.fill_rect(
                obstacle.left as f64,
                h - obstacle.height as f64,
                OBSTACLE_WIDTH as f64,
                obstacle.height as f64,
            );
        }

        ctx.set_fill_style_str("#de9e67");
        ctx.fill_rect(
            CHARACTER_X as f64,
            h - (view.character_bottom + CHARACTER_HEIGHT) as f64,
            CHARACTER_WIDTH as f64,
            CHARACTER_HEIGHT as f64,
        );

        ctx.set_text_align("left");
        ctx.set_font("18px Helvetica, sans-serif");
        ctx.set_fill_style_str("#ffffff");
        ctx.fill_text(&format!("Highest Score: {}", view.high_score), 12.0, 30.0)
            .ok();
        ctx.fill_text(&format!("Score: {}", view.score), 12.0, 56.0).ok();

        let cx = w / 2.0;
        let cy = h / 2.0;
        ctx.set_text_align("center");
        if !view.has_started {
            ctx.set_fill_style_str("#b67237");
            ctx.set_font("bold 40px Helvetica, sans-serif");
            ctx.fill_text("Espresso Escape", cx, cy - 20.0).ok();
            ctx.set_font("18px Helvetica, sans-serif");
            ctx.fill_text("Press [ Enter ] to Start", cx, cy + 20.0).ok();
            ctx.fill_text("Hold [ Space ] to jump higher", cx, cy + 48.0).ok();
            ctx.fill_text("[ M ] toggles sound", cx, cy + 76.0).ok();
        } else if view.is_game_over {
            ctx.set_fill_style_str("#b67237");
            ctx.set_font("bold 40px Helvetica, sans-serif");
            ctx.fill_text("GAME OVER", cx, cy - 20.0).ok();
            ctx.set_font("18px Helvetica, sans-serif");
            ctx.fill_text("Press [ Enter ] to Retry", cx, cy + 20.0).ok();
            if view.is_new_high_score {
                ctx.set_fill_style_str("#ffffff");
                ctx.fill_text("New Highest Score!", cx, cy + 48.0).ok();
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use espresso_escape::autopilot::Autopilot;
    use espresso_escape::platform::{ManualClock, TaskKind};
    use espresso_escape::{MemoryScoreStore, ScoreStore, Session, SilentAudio, Tuning};

    /// Give up after five minutes of game time
    const MAX_RUN_MS: f64 = 5.0 * 60.0 * 1000.0;

    pub fn run(seed: u64, tuning: Tuning) {
        let mut session = Session::new(MemoryScoreStore::default(), SilentAudio, tuning, seed);
        let mut pilot = Autopilot::new();
        let mut clock = ManualClock::default();

        session.confirm();
        clock.apply(session.drain_task_commands());

        while !session.state().is_game_over() && clock.now_ms() < MAX_RUN_MS {
            let due = clock.advance();
            if due.is_empty() {
                break;
            }
            for handle in &due {
                session.run_task(*handle);
                clock.apply(session.drain_task_commands());
            }

            let world_ticked = due.iter().any(|h| h.kind == TaskKind::WorldTick);
            pilot.act(&mut session, world_ticked);
            clock.apply(session.drain_task_commands());
        }

        session.shutdown();
        let state = session.state();
        log::info!(
            "Run over after {:.1}s: score {} (best {}), speed {:.2}, {} ticks, {} jumps",
            clock.now_ms() / 1000.0,
            state.score,
            session.store().get(),
            state.obstacle_speed,
            state.time_ticks,
            pilot.jumps()
        );
        println!("seed {} -> score {}", state.seed, state.score);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn load_tuning(path: &str) -> Result<espresso_escape::Tuning, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    Ok(espresso_escape::Tuning::from_json(&json)?)
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Espresso Escape (native) starting...");
    log::info!("Native mode runs a headless autopilot - run with `trunk serve` for the web version");

    // Usage: espresso-escape [seed] [tuning.json]
    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|a| a.parse().ok()).unwrap_or(42);
    let tuning = match args.next() {
        Some(path) => match load_tuning(&path) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::error!("Could not load tuning from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => espresso_escape::Tuning::default(),
    };

    headless::run(seed, tuning);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
