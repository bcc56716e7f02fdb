//! Audio context gate
//!
//! Audio output may only start after the user has interacted with the
//! application. The gate checks that the platform can play audio at all,
//! waits for the first pointer or key gesture, and then creates the shared
//! [`AudioContext`].
//!
//! Arm the gate exactly once per process. Each armed gate creates its own
//! context.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::{Result, SynthError};
use crate::graph::AudioContext;
use crate::input::{Interaction, InteractionBus};

/// Something that can host an audio context
pub trait AudioPlatform {
    /// Output sample rate, or `None` if the platform has no audio output
    fn output_sample_rate(&self) -> Option<u32>;
}

/// Platform that renders without a device (files, tests)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflinePlatform {
    pub sample_rate: u32,
}

impl OfflinePlatform {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl AudioPlatform for OfflinePlatform {
    fn output_sample_rate(&self) -> Option<u32> {
        Some(self.sample_rate)
    }
}

/// One listener per interaction kind, waiting for the first gesture
#[derive(Debug)]
pub struct AudioContextGate {
    sample_rate: u32,
    pointer_down: broadcast::Receiver<Interaction>,
    pointer_up: broadcast::Receiver<Interaction>,
    key_down: broadcast::Receiver<Interaction>,
    key_up: broadcast::Receiver<Interaction>,
}

impl AudioContextGate {
    /// Check platform support and attach listeners.
    ///
    /// Fails immediately with [`SynthError::UnsupportedPlatform`] when the
    /// platform has no audio output. Interactions emitted after this returns
    /// are seen by [`ready`](Self::ready).
    pub fn arm(platform: &dyn AudioPlatform, interactions: &InteractionBus) -> Result<Self> {
        let sample_rate = platform
            .output_sample_rate()
            .ok_or(SynthError::UnsupportedPlatform)?;

        Ok(Self {
            sample_rate,
            pointer_down: interactions.subscribe(),
            pointer_up: interactions.subscribe(),
            key_down: interactions.subscribe(),
            key_up: interactions.subscribe(),
        })
    }

    /// Sample rate the context will be created with
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Wait for the first interaction, then create the context.
    ///
    /// The first listener to fire wins; the others are dropped with the gate.
    pub async fn ready(mut self) -> Result<AudioContext> {
        let trigger = tokio::select! {
            r = wait_for(&mut self.pointer_down, Interaction::PointerDown) => r?,
            r = wait_for(&mut self.pointer_up, Interaction::PointerUp) => r?,
            r = wait_for(&mut self.key_down, Interaction::KeyDown) => r?,
            r = wait_for(&mut self.key_up, Interaction::KeyUp) => r?,
        };

        let context = AudioContext::new(self.sample_rate);
        log::info!("setup audio context ({:?}, {} Hz)", trigger, self.sample_rate);
        Ok(context)
    }
}

async fn wait_for(
    listener: &mut broadcast::Receiver<Interaction>,
    kind: Interaction,
) -> Result<Interaction> {
    loop {
        match listener.recv().await {
            Ok(seen) if seen == kind => return Ok(seen),
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return Err(SynthError::InteractionClosed),
        }
    }
}

/// Create the shared audio context once the user has interacted.
///
/// Shorthand for [`AudioContextGate::arm`] followed by
/// [`AudioContextGate::ready`].
pub async fn ensure_ready(
    platform: &dyn AudioPlatform,
    interactions: &InteractionBus,
) -> Result<AudioContext> {
    AudioContextGate::arm(platform, interactions)?.ready().await
}
