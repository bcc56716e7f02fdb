//! Synthesis: notes, voices and the voice manager
//!
//! Each sounding note gets a sine oscillator feeding its own gain, routed
//! through a shared master gain. Releasing a note fades it out over a fixed
//! window before the nodes are torn down.

mod manager;
mod note;
mod voice;

pub use manager::VoiceManager;
pub use note::{note_frequency, Accidental, Note};
pub use voice::{Voice, RELEASE_FLOOR, RELEASE_TIME};
