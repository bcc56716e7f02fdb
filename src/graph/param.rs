//! Automatable parameter values
//!
//! A parameter has an intrinsic value plus a timeline of scheduled events.
//! Evaluation follows the usual automation rules: the latest event at or
//! before the query time holds, and a ramp interpolates from the event that
//! precedes it.

/// A scheduled change to a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamEvent {
    /// Jump to `value` at `time`
    SetValue { time: f64, value: f32 },
    /// Reach `value` at `end_time`, exponentially from the previous event
    ExponentialRamp { end_time: f64, value: f32 },
}

impl ParamEvent {
    fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { time, .. } => time,
            ParamEvent::ExponentialRamp { end_time, .. } => end_time,
        }
    }

    fn value(&self) -> f32 {
        match *self {
            ParamEvent::SetValue { value, .. } | ParamEvent::ExponentialRamp { value, .. } => value,
        }
    }
}

/// Automatable parameter state
#[derive(Debug, Clone)]
pub struct AudioParam {
    value: f32,
    events: Vec<ParamEvent>,
}

impl AudioParam {
    /// Create a parameter with the given intrinsic value
    pub fn new(value: f32) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    /// Set the intrinsic value (used before the first scheduled event)
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }

    /// Schedule a jump to `value` at `time`
    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(ParamEvent::SetValue { time, value });
    }

    /// Schedule an exponential ramp ending at `value` at `end_time`
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.insert(ParamEvent::ExponentialRamp { end_time, value });
    }

    // Events at equal times keep insertion order.
    fn insert(&mut self, event: ParamEvent) {
        let idx = self
            .events
            .iter()
            .position(|e| e.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(idx, event);
    }

    /// Evaluate the parameter at time `t` (seconds)
    pub fn value_at(&self, t: f64) -> f32 {
        let mut prev_time = 0.0;
        let mut prev_value = self.value;

        for event in &self.events {
            match *event {
                ParamEvent::SetValue { time, value } => {
                    if time > t {
                        return prev_value;
                    }
                    prev_time = time;
                    prev_value = value;
                }
                ParamEvent::ExponentialRamp { end_time, value } => {
                    if end_time > t {
                        return exponential(prev_value, value, prev_time, end_time, t);
                    }
                    prev_time = end_time;
                    prev_value = value;
                }
            }
        }

        prev_value
    }

    /// Drop events that can no longer influence values at or after `t`
    pub(crate) fn prune_before(&mut self, t: f64) {
        // Keep the last finished event: it defines the held value and the
        // start point of any ramp that follows.
        let finished = self.events.iter().take_while(|e| e.time() <= t).count();
        if finished > 1 {
            let last = self.events[finished - 1];
            self.value = last.value();
            self.events.drain(..finished - 1);
        }
    }
}

fn exponential(v0: f32, v1: f32, t0: f64, t1: f64, t: f64) -> f32 {
    if v0 * v1 <= 0.0 || t1 <= t0 {
        return v0;
    }
    let progress = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);
    (v0 as f64 * (v1 as f64 / v0 as f64).powf(progress)) as f32
}
