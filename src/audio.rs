//! Sound effects
//!
//! The session fires effects through `AudioSink` and never waits on them.
//! In the browser they're synthesized with the Web Audio API, no external
//! files needed.

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Character leaves the ground
    Jump,
    /// Run ended
    GameOver,
    /// Run beat the stored best
    HighScore,
}

/// Fire-and-forget sound output. Failures are the sink's problem.
pub trait AudioSink {
    fn play(&mut self, effect: SoundEffect);

    /// Effective effects volume (0.0 - 1.0), 0 when muted
    fn set_volume(&mut self, _volume: f32) {}
}

/// Plays nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&mut self, _effect: SoundEffect) {}
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudio;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{AudioSink, SoundEffect};

    /// Web Audio backed sink
    pub struct WebAudio {
        ctx: Option<AudioContext>,
        volume: f32,
    }

    impl Default for WebAudio {
        fn default() -> Self {
            Self::new()
        }
    }

    impl WebAudio {
        pub fn new() -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self { ctx, volume: 1.0 }
        }

        /// Create an oscillator routed through a gain node
        fn create_osc(
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// Short upward chirp
        fn play_jump(ctx: &AudioContext, vol: f32) {
            let Some((osc, gain)) = Self::create_osc(ctx, 280.0, OscillatorType::Square) else {
                return;
            };
            let t = ctx.current_time();
            gain.gain().set_value_at_time(vol * 0.15, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.18)
                .ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(720.0, t + 0.12)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.2).ok();
        }

        /// Descending notes, `step` seconds apart
        fn play_sequence(ctx: &AudioContext, vol: f32, notes: &[f32], step: f64, osc_type: OscillatorType) {
            for (i, freq) in notes.iter().enumerate() {
                let delay = i as f64 * step;
                if let Some((osc, gain)) = Self::create_osc(ctx, *freq, osc_type) {
                    let t = ctx.current_time() + delay;
                    gain.gain().set_value_at_time(vol * 0.3, t).ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.01, t + step + 0.1)
                        .ok();
                    osc.start_with_when(t).ok();
                    osc.stop_with_when(t + step + 0.2).ok();
                }
            }
        }
    }

    impl AudioSink for WebAudio {
        fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
        }

        fn play(&mut self, effect: SoundEffect) {
            let vol = self.volume;
            if vol <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };

            // Browsers keep the context suspended until a user gesture
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            match effect {
                SoundEffect::Jump => Self::play_jump(ctx, vol),
                SoundEffect::GameOver => Self::play_sequence(
                    ctx,
                    vol,
                    &[400.0, 350.0, 300.0, 200.0],
                    0.2,
                    OscillatorType::Sine,
                ),
                SoundEffect::HighScore => Self::play_sequence(
                    ctx,
                    vol * 0.8,
                    &[500.0, 600.0, 700.0, 800.0, 1000.0],
                    0.08,
                    OscillatorType::Triangle,
                ),
            }
        }
    }
}
