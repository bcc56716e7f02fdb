//! CLI interface for chime

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Minimal polyphonic synthesizer
#[derive(Parser)]
#[command(name = "chime")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play notes from the computer keyboard
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "chime.yaml")]
        config: PathBuf,
    },

    /// Render a sequence of notes to a WAV file
    Record {
        /// Configuration file path
        #[arg(short, long, default_value = "chime.yaml")]
        config: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Notes to play in order, e.g. "C4 E4 G4 C5"
        #[arg(short, long, default_value = "C4 E4 G4 C5")]
        notes: String,

        /// Seconds each note is held
        #[arg(short, long, default_value = "0.5")]
        length: f64,
    },

    /// List available audio output devices
    Devices,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "chime.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
