//! Error types for the synth library

use thiserror::Error;

/// Errors raised by the synth core
#[derive(Debug, Error)]
pub enum SynthError {
    /// The host cannot produce audio output
    #[error("platform does not support audio output")]
    UnsupportedPlatform,

    /// The interaction source closed before any user gesture arrived
    #[error("interaction source closed before any user interaction")]
    InteractionClosed,

    /// Text that does not name a note
    #[error("invalid note: {0:?}")]
    InvalidNote(String),
}

/// Result alias for synth operations
pub type Result<T> = std::result::Result<T, SynthError>;
