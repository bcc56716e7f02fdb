//! A single sounding note: oscillator plus its own gain

use std::time::Duration;

use crate::graph::{AudioContext, AudioNode, GainNode, OscillatorNode};

/// Length of the release ramp, and the delay before a released voice is torn down
pub const RELEASE_TIME: Duration = Duration::from_millis(30);

/// Level the release ramp fades to; exponential ramps cannot reach zero
pub const RELEASE_FLOOR: f32 = 0.0001;

/// Oscillator and the gain node shaping it, wired oscillator -> gain -> output
#[derive(Debug, Clone)]
pub struct Voice {
    pub oscillator: OscillatorNode,
    pub gain: GainNode,
}

impl Voice {
    /// Create a voice at `frequency`, connect it to `output` and start it
    pub fn start(context: &AudioContext, frequency: f64, output: &dyn AudioNode) -> Self {
        let oscillator = context.create_oscillator();
        let gain = context.create_gain();

        oscillator.frequency().set_value(frequency as f32);
        gain.gain().set_value(1.0);

        oscillator.connect(&gain);
        gain.connect(output);
        oscillator.start();

        Self { oscillator, gain }
    }

    /// Fade out from the current level, then tear the voice down.
    ///
    /// The ramp is scheduled on the context clock. Teardown runs on a wall-clock
    /// timer in a detached task and cannot be cancelled.
    pub fn release(self) {
        let now = self.gain.context().current_time();
        let gain = self.gain.gain();
        let level = gain.value_at(now);

        gain.set_value_at_time(level, now);
        gain.exponential_ramp_to_value_at_time(RELEASE_FLOOR, now + RELEASE_TIME.as_secs_f64());

        self.spawn_teardown();
    }

    fn spawn_teardown(self) {
        let teardown = move || {
            self.oscillator.stop();
            self.oscillator.disconnect();
            self.gain.disconnect();
            log::debug!("voice {:?} torn down", self.oscillator.id());
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(RELEASE_TIME).await;
                    teardown();
                });
            }
            Err(_) => {
                std::thread::spawn(move || {
                    std::thread::sleep(RELEASE_TIME);
                    teardown();
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_wiring() {
        let ctx = AudioContext::new(44100);
        let voice = Voice::start(&ctx, 440.0, &ctx.destination());

        assert_eq!(ctx.node_count(), 3);
        assert_eq!(voice.oscillator.frequency().value(), 440.0);
        assert_eq!(voice.gain.gain().value(), 1.0);
        assert!(!voice.oscillator.is_stopped());
    }

    #[test]
    fn test_release_schedules_ramp() {
        let ctx = AudioContext::new(44100);
        let voice = Voice::start(&ctx, 440.0, &ctx.destination());
        let gain = voice.gain.clone();

        let mut buffer = vec![0.0f32; 441];
        ctx.render(&mut buffer);
        let t0 = ctx.current_time();

        voice.release();

        assert_eq!(gain.gain().value_at(t0), 1.0);
        let end = gain.gain().value_at(t0 + RELEASE_TIME.as_secs_f64());
        assert!((end - RELEASE_FLOOR).abs() < 1e-7);
    }

    #[tokio::test]
    async fn test_release_tears_down_on_runtime() {
        let ctx = AudioContext::new(44100);
        let voice = Voice::start(&ctx, 440.0, &ctx.destination());
        let (osc, gain) = (voice.oscillator.id(), voice.gain.id());

        voice.release();
        assert!(ctx.contains(osc));

        tokio::time::sleep(RELEASE_TIME * 4).await;
        assert!(!ctx.contains(osc));
        assert!(!ctx.contains(gain));
    }

    #[test]
    fn test_release_tears_down_without_runtime() {
        let ctx = AudioContext::new(44100);
        let voice = Voice::start(&ctx, 440.0, &ctx.destination());

        voice.release();
        std::thread::sleep(RELEASE_TIME * 10);

        assert_eq!(ctx.node_count(), 1);
    }
}
