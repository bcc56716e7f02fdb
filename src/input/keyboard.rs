//! Computer keyboard as a note source
//!
//! Tracker-style layout: the home row plays white keys, the row above plays
//! black keys.

use crate::synth::Note;
use crate::util::clamp;

/// Keys in chromatic order from C of the base octave
const KEYS: [char; 17] = [
    'a', 'w', 's', 'e', 'd', 'f', 't', 'g', 'y', 'h', 'u', 'j', 'k', 'o', 'l', 'p', ';',
];

const MIN_OCTAVE: i8 = 0;
const MAX_OCTAVE: i8 = 8;

/// What a key press means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Play(Note),
    OctaveDown,
    OctaveUp,
}

/// Maps keys to notes relative to a base octave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardLayout {
    octave: i8,
}

impl KeyboardLayout {
    /// Create a layout whose lowest key plays C in `octave` (clamped to 0-8)
    pub fn new(octave: i8) -> Self {
        Self {
            octave: clamp(octave, MIN_OCTAVE, MAX_OCTAVE),
        }
    }

    /// Current base octave
    pub fn octave(&self) -> i8 {
        self.octave
    }

    /// Note played by `key` at the current octave
    pub fn note_for(&self, key: char) -> Option<Note> {
        let key = key.to_ascii_lowercase();
        let offset = KEYS.iter().position(|&k| k == key)? as i32;
        let number = (self.octave as i32 + 1) * 12 + offset;
        if number > 127 {
            return None;
        }
        Some(Note::from_number(number as u8))
    }

    /// Interpret a key press; octave keys shift the layout
    pub fn press(&mut self, key: char) -> Option<KeyAction> {
        match key.to_ascii_lowercase() {
            'z' => {
                self.octave = clamp(self.octave - 1, MIN_OCTAVE, MAX_OCTAVE);
                Some(KeyAction::OctaveDown)
            }
            'x' => {
                self.octave = clamp(self.octave + 1, MIN_OCTAVE, MAX_OCTAVE);
                Some(KeyAction::OctaveUp)
            }
            other => self.note_for(other).map(KeyAction::Play),
        }
    }
}

impl Default for KeyboardLayout {
    fn default() -> Self {
        Self::new(4)
    }
}
