//! Node kinds held by the audio graph

use std::f64::consts::PI;

use super::AudioParam;

/// Identifier of a node inside one [`AudioContext`](super::AudioContext)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

/// Sine oscillator with a start/stop window
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub(crate) frequency: AudioParam,
    phase: f64,
    start_time: Option<f64>,
    stop_time: Option<f64>,
}

impl Oscillator {
    pub(crate) fn new(frequency: f32) -> Self {
        Self {
            frequency: AudioParam::new(frequency),
            phase: 0.0,
            start_time: None,
            stop_time: None,
        }
    }

    pub(crate) fn start(&mut self, time: f64) {
        // An oscillator can only be started once
        if self.start_time.is_none() {
            self.start_time = Some(time);
        }
    }

    pub(crate) fn stop(&mut self, time: f64) {
        if self.stop_time.is_none() {
            self.stop_time = Some(time);
        }
    }

    /// Whether the oscillator produces sound at time `t`
    pub(crate) fn is_sounding(&self, t: f64) -> bool {
        match (self.start_time, self.stop_time) {
            (Some(start), Some(stop)) => start <= t && t < stop,
            (Some(start), None) => start <= t,
            _ => false,
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stop_time.is_some()
    }

    /// Generate the sample for time `t` and advance the phase
    pub(crate) fn generate(&mut self, t: f64, sample_rate: f64) -> f64 {
        if !self.is_sounding(t) {
            return 0.0;
        }

        let sample = (self.phase * 2.0 * PI).sin();

        self.phase += self.frequency.value_at(t) as f64 / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample
    }
}

/// What a node does with its inputs
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Final output; sums its inputs
    Destination,
    /// Sums its inputs and scales by `gain`
    Gain { gain: AudioParam },
    /// Source node; ignores inputs
    Oscillator(Oscillator),
}

/// A node plus its edges and per-frame cache
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) outputs: Vec<NodeId>,
    pub(crate) frame: u64,
    pub(crate) cached: f64,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            frame: u64::MAX,
            cached: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oscillator_silent_until_started() {
        let mut osc = Oscillator::new(440.0);
        assert_eq!(osc.generate(0.0, 44100.0), 0.0);
        assert!(!osc.is_sounding(1.0));
    }

    #[test]
    fn test_oscillator_window() {
        let mut osc = Oscillator::new(1.0);
        osc.start(1.0);
        osc.stop(2.0);

        assert!(!osc.is_sounding(0.5));
        assert!(osc.is_sounding(1.0));
        assert!(osc.is_sounding(1.5));
        assert!(!osc.is_sounding(2.0));
        assert!(osc.is_stopped());
    }

    #[test]
    fn test_oscillator_sine_shape() {
        // 1 Hz at 4 Hz sample rate: quarter-cycle steps
        let mut osc = Oscillator::new(1.0);
        osc.start(0.0);

        let samples: Vec<f64> = (0..4).map(|i| osc.generate(i as f64 * 0.25, 4.0)).collect();
        assert!(samples[0].abs() < 1e-9);
        assert!((samples[1] - 1.0).abs() < 1e-9);
        assert!(samples[2].abs() < 1e-9);
        assert!((samples[3] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_oscillator_start_once() {
        let mut osc = Oscillator::new(440.0);
        osc.start(1.0);
        osc.start(5.0);
        assert!(osc.is_sounding(2.0));
    }
}
