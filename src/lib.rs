//! chime - minimal polyphonic synthesizer
//!
//! Note events become voices on a small audio graph: each note gets a sine
//! oscillator and its own gain, released with a short exponential fade.
//! Audio output is unlocked by the first user interaction.

pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod graph;
pub mod input;
pub mod synth;
pub mod util;

pub use config::ChimeConfig;
pub use error::SynthError;
pub use gate::{ensure_ready, AudioContextGate, AudioPlatform};
pub use graph::AudioContext;
pub use synth::{Note, VoiceManager};
