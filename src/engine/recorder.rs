//! WAV file recorder
//!
//! Renders an audio context offline into a WAV file.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::graph::AudioContext;

/// WAV file recorder
pub struct Recorder {
    writer: WavWriter<BufWriter<File>>,
    sample_rate: u32,
    samples_written: u64,
    buffer: Vec<f32>,
}

impl Recorder {
    /// Create a new recorder
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `sample_rate` - Sample rate in Hz
    /// * `buffer_size` - Frames rendered per chunk
    pub fn new(path: &Path, sample_rate: u32, buffer_size: usize) -> Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("failed to create WAV file: {:?}", path))?;

        Ok(Self {
            writer,
            sample_rate,
            samples_written: 0,
            buffer: vec![0.0; buffer_size.max(1)],
        })
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of samples written
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Get the duration recorded in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples_written as f64 / self.sample_rate as f64
    }

    /// Render `seconds` of `context` into the file, one chunk at a time
    pub fn render(&mut self, context: &AudioContext, seconds: f64) -> Result<()> {
        let mut remaining = (seconds.max(0.0) * self.sample_rate as f64).round() as usize;

        while remaining > 0 {
            let frames = remaining.min(self.buffer.len());
            context.render(&mut self.buffer[..frames]);
            for &sample in &self.buffer[..frames] {
                self.writer
                    .write_sample(sample)
                    .context("failed to write sample")?;
            }
            self.samples_written += frames as u64;
            remaining -= frames;
        }

        Ok(())
    }

    /// Finalize the WAV file
    ///
    /// This must be called to properly close the file and write the header.
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize().context("failed to finalize WAV file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AudioNode;
    use tempfile::NamedTempFile;

    #[test]
    fn test_recorder_creation() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::new(file.path(), 44100, 512).unwrap();

        assert_eq!(recorder.sample_rate(), 44100);
        assert_eq!(recorder.samples_written(), 0);
        assert_eq!(recorder.duration_secs(), 0.0);
    }

    #[test]
    fn test_render_duration_and_clock() {
        let file = NamedTempFile::new().unwrap();
        let ctx = AudioContext::new(8000);
        let mut recorder = Recorder::new(file.path(), 8000, 300).unwrap();

        recorder.render(&ctx, 0.5).unwrap();

        assert_eq!(recorder.samples_written(), 4000);
        assert!((recorder.duration_secs() - 0.5).abs() < 1e-9);
        assert!((ctx.current_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_recorder_produces_valid_wav() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let ctx = AudioContext::new(44100);
        let osc = ctx.create_oscillator();
        osc.connect(&ctx.destination());
        osc.start();

        {
            let mut recorder = Recorder::new(&path, 44100, 512).unwrap();
            recorder.render(&ctx, 0.1).unwrap();
            recorder.finalize().unwrap();
        }

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();

        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, SampleFormat::Float);

        let samples: Vec<f32> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 4410);
        assert!(samples.iter().any(|s| s.abs() > 0.9));
    }

    #[test]
    fn test_render_zero_seconds() {
        let file = NamedTempFile::new().unwrap();
        let ctx = AudioContext::new(44100);
        let mut recorder = Recorder::new(file.path(), 44100, 512).unwrap();

        recorder.render(&ctx, -1.0).unwrap();
        assert_eq!(recorder.samples_written(), 0);
    }
}
