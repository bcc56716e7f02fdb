//! Real-time audio playback using cpal

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::gate::AudioPlatform;
use crate::graph::AudioContext;

/// Find an output device by name substring, or the default one
fn find_output_device(name: Option<&str>) -> Option<Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => host.output_devices().ok()?.find(|device| {
            device
                .name()
                .map(|n| n.contains(name))
                .unwrap_or(false)
        }),
        None => host.default_output_device(),
    }
}

/// Audio platform backed by a cpal output device
#[derive(Debug, Clone, Default)]
pub struct CpalPlatform {
    device: Option<String>,
}

impl CpalPlatform {
    /// Use the output device whose name contains `device`, or the default
    pub fn new(device: Option<String>) -> Self {
        Self { device }
    }
}

impl AudioPlatform for CpalPlatform {
    fn output_sample_rate(&self) -> Option<u32> {
        let device = find_output_device(self.device.as_deref())?;
        let config = device.default_output_config().ok()?;
        Some(config.sample_rate().0)
    }
}

/// Real-time audio player
pub struct Player {
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl Player {
    /// Create an idle player
    pub fn new() -> Self {
        Self {
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start rendering `context` to the named (or default) output device
    pub fn start(&mut self, context: AudioContext, device_name: Option<&str>) -> Result<()> {
        let device = find_output_device(device_name)
            .ok_or_else(|| anyhow!("No output device available"))?;

        let config = device.default_output_config()?;
        let sample_format = config.sample_format();
        let mut stream_config: StreamConfig = config.into();

        if stream_config.sample_rate.0 != context.sample_rate() {
            log::warn!(
                "device runs at {} Hz, context at {} Hz; requesting the context rate",
                stream_config.sample_rate.0,
                context.sample_rate()
            );
            stream_config.sample_rate = SampleRate(context.sample_rate());
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let stream = match sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(&device, &stream_config, context, running)?,
            SampleFormat::I16 => self.build_stream::<i16>(&device, &stream_config, context, running)?,
            SampleFormat::U16 => self.build_stream::<u16>(&device, &stream_config, context, running)?,
            _ => return Err(anyhow!("Unsupported sample format")),
        };

        stream.play()?;
        self.stream = Some(stream);

        log::info!(
            "playing on {} ({} Hz, {} ch)",
            device.name().unwrap_or_else(|_| "unknown device".to_string()),
            stream_config.sample_rate.0,
            stream_config.channels
        );
        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stream = None;
    }

    fn build_stream<T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>>(
        &self,
        device: &Device,
        config: &StreamConfig,
        context: AudioContext,
        running: Arc<AtomicBool>,
    ) -> Result<Stream> {
        let channels = (config.channels as usize).max(1);
        let mut mono: Vec<f32> = Vec::new();

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                if mono.len() < frames {
                    mono.resize(frames, 0.0);
                }

                // Silence when stopped or when the control thread holds the graph
                if !running.load(Ordering::SeqCst) || !context.try_render(&mut mono[..frames]) {
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0f32);
                    }
                    return;
                }

                for (frame, &sample) in data.chunks_mut(channels).zip(mono.iter()) {
                    for channel_sample in frame.iter_mut() {
                        *channel_sample = T::from_sample(sample);
                    }
                }
            },
            |err| {
                log::warn!("Audio stream error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device()
        .and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_stop_when_idle() {
        let mut player = Player::default();
        player.stop();
        assert!(player.stream.is_none());
        assert!(!player.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_unknown_device_is_unsupported() {
        let platform = CpalPlatform::new(Some("no device is called this \u{1F3B9}".to_string()));
        assert_eq!(platform.output_sample_rate(), None);
    }
}
