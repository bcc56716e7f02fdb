//! Live keyboard session
//!
//! Turns key input into voices on a [`VoiceManager`]. Notes are remembered
//! per key so an octave change cannot strand them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::terminal::KeyInput;
use super::{KeyAction, KeyboardLayout};
use crate::synth::{Note, VoiceManager};

/// Presses of one key closer together than this count as auto-repeat
/// when the terminal cannot report releases
pub const REPEAT_WINDOW: Duration = Duration::from_millis(700);

/// What the caller should do after a key input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Continue,
    OctaveChanged(i8),
    Quit,
}

/// Key-to-voice state for one playing session.
///
/// With release reporting a note sounds while its key is held. Without it
/// a press toggles the note, and presses that follow within
/// [`REPEAT_WINDOW`] are treated as auto-repeat and ignored.
#[derive(Debug)]
pub struct KeySession {
    layout: KeyboardLayout,
    toggle: bool,
    held: HashMap<char, Note>,
    last_press: HashMap<char, Instant>,
}

impl KeySession {
    pub fn new(layout: KeyboardLayout, reports_releases: bool) -> Self {
        Self {
            layout,
            toggle: !reports_releases,
            held: HashMap::new(),
            last_press: HashMap::new(),
        }
    }

    pub fn layout(&self) -> &KeyboardLayout {
        &self.layout
    }

    /// Number of keys currently holding a note
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Drop key input queued before audio was ready.
    ///
    /// Returns `true` if a quit was among the dropped input.
    pub fn discard_pending(keys: &mut mpsc::UnboundedReceiver<KeyInput>) -> bool {
        let mut quit = false;
        let mut dropped = 0;
        while let Ok(input) = keys.try_recv() {
            quit |= input == KeyInput::Quit;
            dropped += 1;
        }
        if dropped > 0 {
            log::debug!("dropped {} key inputs received before audio was ready", dropped);
        }
        quit
    }

    /// Apply one key input to `synth`
    pub fn handle(&mut self, synth: &mut VoiceManager, input: KeyInput) -> SessionEvent {
        self.handle_at(synth, input, Instant::now())
    }

    fn handle_at(&mut self, synth: &mut VoiceManager, input: KeyInput, now: Instant) -> SessionEvent {
        match input {
            KeyInput::Quit => SessionEvent::Quit,
            KeyInput::Press(key) => {
                if self.toggle && self.is_repeat(key, now) {
                    return SessionEvent::Continue;
                }
                if let Some(note) = self.held.remove(&key) {
                    synth.stop(&note);
                    return SessionEvent::Continue;
                }
                match self.layout.press(key) {
                    Some(KeyAction::Play(note)) => {
                        synth.start(&note);
                        self.held.insert(key, note);
                        SessionEvent::Continue
                    }
                    Some(KeyAction::OctaveDown) | Some(KeyAction::OctaveUp) => {
                        SessionEvent::OctaveChanged(self.layout.octave())
                    }
                    None => SessionEvent::Continue,
                }
            }
            KeyInput::Release(key) => {
                if let Some(note) = self.held.remove(&key) {
                    synth.stop(&note);
                }
                SessionEvent::Continue
            }
        }
    }

    fn is_repeat(&mut self, key: char, now: Instant) -> bool {
        match self.last_press.insert(key, now) {
            Some(previous) => now.saturating_duration_since(previous) < REPEAT_WINDOW,
            None => false,
        }
    }

    /// Stop every held note
    pub fn release_all(&mut self, synth: &mut VoiceManager) {
        for (_, note) in self.held.drain() {
            synth.stop(&note);
        }
    }
}
