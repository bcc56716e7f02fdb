//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Main configuration for chime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChimeConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Master settings
    #[serde(default)]
    pub master: MasterConfig,

    /// Computer keyboard settings
    #[serde(default)]
    pub keyboard: KeyboardConfig,
}

impl ChimeConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate audio settings
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }
        if self.audio.buffer_size < 64 || self.audio.buffer_size > 8192 {
            bail!("Buffer size must be between 64 and 8192");
        }

        if !(0.0..=1.0).contains(&self.master.volume) {
            bail!("Master volume must be between 0.0 and 1.0");
        }

        if !(0..=8).contains(&self.keyboard.octave) {
            bail!("Keyboard octave must be between 0 and 8");
        }

        Ok(())
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz for offline rendering (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames rendered per chunk (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Output device name substring (None = default device)
    #[serde(default)]
    pub device: Option<String>,
}

fn default_sample_rate() -> u32 { 44100 }
fn default_buffer_size() -> usize { 512 }

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            device: None,
        }
    }
}

/// Master settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Master volume 0.0-1.0 (default: 0.8)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_volume() -> f32 { 0.8 }

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
        }
    }
}

/// Computer keyboard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardConfig {
    /// Octave of the lowest key, 0-8 (default: 4)
    #[serde(default = "default_octave")]
    pub octave: i8,
}

fn default_octave() -> i8 { 4 }

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            octave: default_octave(),
        }
    }
}
