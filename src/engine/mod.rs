//! Audio output for chime
//!
//! Renders an audio context either to a sound card in real time or to a
//! WAV file offline.

mod player;
mod recorder;

pub use player::{default_device_name, list_output_devices, CpalPlatform, Player};
pub use recorder::Recorder;
