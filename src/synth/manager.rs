//! Voice manager: turns note on/off events into voices

use std::collections::HashMap;

use super::{Note, Voice};
use crate::graph::{AudioContext, AudioNode, GainNode};
use crate::util::clamp;

/// Graph state created by [`VoiceManager::prepare`]
#[derive(Debug)]
struct Routing {
    master: GainNode,
    voices: HashMap<String, Voice>,
}

/// Polyphonic synth: one voice per sounding note identifier.
///
/// Note events are accepted only after [`prepare`](Self::prepare); before
/// that `start` and `stop` do nothing.
#[derive(Debug)]
pub struct VoiceManager {
    context: AudioContext,
    routing: Option<Routing>,
}

impl VoiceManager {
    /// Create a manager playing into `context`
    pub fn new(context: AudioContext) -> Self {
        Self {
            context,
            routing: None,
        }
    }

    /// The shared context
    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    /// Create the master gain and start accepting notes
    pub fn prepare(&mut self) {
        if self.routing.is_some() {
            log::debug!("voice manager already prepared");
            return;
        }

        let master = self.context.create_gain();
        master.connect(&self.context.destination());

        self.routing = Some(Routing {
            master,
            voices: HashMap::new(),
        });
        log::info!("voice manager ready at {} Hz", self.context.sample_rate());
    }

    /// Whether `prepare` has run
    pub fn is_prepared(&self) -> bool {
        self.routing.is_some()
    }

    /// Set the master volume, clamped to 0.0-1.0. Non-finite values are ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            log::warn!("ignoring master volume {}", volume);
            return;
        }
        if let Some(routing) = &self.routing {
            routing.master.gain().set_value(clamp(volume, 0.0, 1.0));
        }
    }

    /// Current master volume, if prepared
    pub fn volume(&self) -> Option<f32> {
        self.routing.as_ref().map(|r| r.master.gain().value())
    }

    /// Start a voice for `note`.
    ///
    /// A voice already sounding under the same identifier is replaced in the
    /// mapping but not stopped.
    pub fn start(&mut self, note: &Note) {
        let Some(routing) = &mut self.routing else {
            return;
        };

        let voice = Voice::start(&self.context, note.frequency(), &routing.master);
        let id = note.identifier();
        log::debug!("start {} ({:.2} Hz)", id, note.frequency());

        if routing.voices.insert(id, voice).is_some() {
            log::debug!("replaced sounding voice for {}", note.identifier());
        }
    }

    /// Release the voice for `note`, if one is sounding.
    ///
    /// The mapping entry is removed before the fade starts, so a following
    /// `start` of the same note gets a fresh voice that this release cannot touch.
    pub fn stop(&mut self, note: &Note) {
        let Some(routing) = &mut self.routing else {
            return;
        };
        let Some(voice) = routing.voices.remove(&note.identifier()) else {
            return;
        };

        log::debug!("stop {}", note.identifier());
        voice.release();
    }

    /// Whether a voice is mapped for `note`
    pub fn is_active(&self, note: &Note) -> bool {
        self.routing
            .as_ref()
            .map(|r| r.voices.contains_key(&note.identifier()))
            .unwrap_or(false)
    }

    /// Number of mapped voices
    pub fn active_count(&self) -> usize {
        self.routing.as_ref().map(|r| r.voices.len()).unwrap_or(0)
    }

    /// Identifiers of mapped voices, sorted
    pub fn active_notes(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .routing
            .as_ref()
            .map(|r| r.voices.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{RELEASE_FLOOR, RELEASE_TIME};

    fn note(text: &str) -> Note {
        text.parse().unwrap()
    }

    fn prepared() -> VoiceManager {
        let mut synth = VoiceManager::new(AudioContext::new(44100));
        synth.prepare();
        synth
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_start_before_prepare_is_ignored() {
        let mut synth = VoiceManager::new(AudioContext::new(44100));
        synth.start(&note("A4"));

        assert!(!synth.is_prepared());
        assert_eq!(synth.active_count(), 0);
        assert_eq!(synth.context().node_count(), 1);
    }

    #[test]
    fn test_stop_before_prepare_is_ignored() {
        let mut synth = VoiceManager::new(AudioContext::new(44100));
        synth.stop(&note("A4"));
        assert_eq!(synth.context().node_count(), 1);
    }

    #[test]
    fn test_prepare_creates_master() {
        let synth = prepared();
        assert!(synth.is_prepared());
        assert_eq!(synth.context().node_count(), 2);
        assert_eq!(synth.volume(), Some(1.0));
    }

    #[test]
    fn test_prepare_twice_keeps_routing() {
        let mut synth = prepared();
        synth.start(&note("C4"));
        synth.prepare();

        assert_eq!(synth.active_count(), 1);
        assert_eq!(synth.context().node_count(), 4);
    }

    #[test]
    fn test_start_creates_voice() {
        let mut synth = prepared();
        synth.start(&note("A4"));

        assert!(synth.is_active(&note("A4")));
        assert_eq!(synth.active_notes(), vec!["A4".to_string()]);
        assert_eq!(synth.context().node_count(), 4);
    }

    #[test]
    fn test_stop_unknown_note_changes_nothing() {
        let mut synth = prepared();
        synth.start(&note("C4"));

        synth.stop(&note("D4"));

        assert_eq!(synth.active_notes(), vec!["C4".to_string()]);
        assert_eq!(synth.context().node_count(), 4);
    }

    #[test]
    fn test_stop_removes_mapping_immediately() {
        let mut synth = prepared();
        let a4 = note("A4");

        synth.start(&a4);
        synth.stop(&a4);

        assert!(!synth.is_active(&a4));
        assert_eq!(synth.active_count(), 0);
    }

    #[test]
    fn test_stop_twice_is_noop() {
        let mut synth = prepared();
        let a4 = note("A4");

        synth.start(&a4);
        synth.stop(&a4);
        synth.stop(&a4);

        assert_eq!(synth.active_count(), 0);
    }

    #[test]
    fn test_restart_after_stop_gets_fresh_voice() {
        let mut synth = prepared();
        let a4 = note("A4");

        synth.start(&a4);
        synth.stop(&a4);
        synth.start(&a4);

        assert!(synth.is_active(&a4));
        assert_eq!(synth.active_count(), 1);
    }

    #[test]
    fn test_enharmonic_spellings_are_separate_voices() {
        let mut synth = prepared();
        synth.start(&note("C#4"));
        synth.start(&note("Db4"));

        assert_eq!(synth.active_count(), 2);
    }

    #[test]
    fn test_duplicate_start_replaces_mapping() {
        let mut synth = prepared();
        let a4 = note("A4");

        synth.start(&a4);
        synth.start(&a4);

        // The first voice stays in the graph, unmapped
        assert_eq!(synth.active_count(), 1);
        assert_eq!(synth.context().node_count(), 6);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut synth = prepared();

        synth.set_volume(0.5);
        assert_eq!(synth.volume(), Some(0.5));

        synth.set_volume(3.0);
        assert_eq!(synth.volume(), Some(1.0));

        synth.set_volume(-1.0);
        assert_eq!(synth.volume(), Some(0.0));
    }

    #[test]
    fn test_non_finite_volume_is_ignored() {
        let mut synth = prepared();
        synth.set_volume(0.25);

        synth.set_volume(f32::NAN);
        synth.set_volume(f32::INFINITY);
        assert_eq!(synth.volume(), Some(0.25));

        synth.start(&note("A4"));
        let mut buffer = vec![0.0; 256];
        synth.context().render(&mut buffer);
        assert!(buffer.iter().all(|s| s.is_finite()));
        assert!(buffer.iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn test_volume_before_prepare() {
        let mut synth = VoiceManager::new(AudioContext::new(44100));
        synth.set_volume(0.5);
        assert_eq!(synth.volume(), None);
    }

    #[test]
    fn test_note_plays_and_fades() {
        let mut synth = prepared();
        let ctx = synth.context().clone();
        let a4 = note("A4");

        synth.start(&a4);
        let mut held = vec![0.0f32; 4410];
        ctx.render(&mut held);
        assert!(peak(&held) > 0.99);

        synth.stop(&a4);
        let mut tail = vec![0.0f32; 2205];
        ctx.render(&mut tail);

        // Past the 30 ms ramp (1323 frames) the voice sits at the floor
        assert!(peak(&tail[1400..]) <= RELEASE_FLOOR + 1e-6);
        assert!(peak(&tail[..100]) > 0.5);
    }

    #[test]
    fn test_master_volume_scales_output() {
        let mut synth = prepared();
        let ctx = synth.context().clone();

        synth.set_volume(0.25);
        synth.start(&note("A4"));

        let mut buffer = vec![0.0f32; 4410];
        ctx.render(&mut buffer);
        let level = peak(&buffer);
        assert!(level > 0.24 && level <= 0.25 + 1e-6, "peak was {}", level);
    }

    #[tokio::test]
    async fn test_teardown_releases_nodes() {
        let mut synth = prepared();
        let a4 = note("A4");

        synth.start(&a4);
        synth.stop(&a4);
        assert_eq!(synth.context().node_count(), 4);

        tokio::time::sleep(RELEASE_TIME * 4).await;
        assert_eq!(synth.context().node_count(), 2);
    }

    #[tokio::test]
    async fn test_teardown_outlives_manager() {
        let ctx = AudioContext::new(44100);
        {
            let mut synth = VoiceManager::new(ctx.clone());
            synth.prepare();
            synth.start(&note("E4"));
            synth.stop(&note("E4"));
        }

        tokio::time::sleep(RELEASE_TIME * 4).await;
        // Only the destination and the abandoned master gain remain
        assert_eq!(ctx.node_count(), 2);
    }

    #[test]
    fn test_managers_are_independent() {
        let mut first = prepared();
        let second = prepared();

        first.start(&note("G3"));

        assert_eq!(first.active_count(), 1);
        assert_eq!(second.active_count(), 0);
        assert_eq!(second.context().node_count(), 2);
    }
}
