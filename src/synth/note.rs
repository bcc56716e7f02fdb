//! Note values and equal-tempered tuning

use std::fmt;
use std::str::FromStr;

use crate::error::SynthError;

/// Reference pitch divided down five octaves: 440 / 32 = 13.75 Hz (A-1)
const TUNING_BASE_HZ: f64 = 440.0 / 32.0;

/// MIDI number of the tuning base
const TUNING_BASE_NOTE: f64 = 9.0;

/// Frequency in Hz of a MIDI note number (A4 = 69 = 440 Hz)
pub fn note_frequency(number: u8) -> f64 {
    TUNING_BASE_HZ * 2.0_f64.powf((number as f64 - TUNING_BASE_NOTE) / 12.0)
}

/// Pitch alteration applied to a note name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
    DoubleSharp,
    DoubleFlat,
}

impl Accidental {
    /// Symbol used in note identifiers ("" for natural)
    pub fn symbol(&self) -> &'static str {
        match self {
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
            Accidental::DoubleSharp => "##",
            Accidental::DoubleFlat => "bb",
        }
    }

    fn semitones(&self) -> i32 {
        match self {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
            Accidental::DoubleSharp => 2,
            Accidental::DoubleFlat => -2,
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "" => Some(Accidental::Natural),
            "#" => Some(Accidental::Sharp),
            "b" => Some(Accidental::Flat),
            "##" => Some(Accidental::DoubleSharp),
            "bb" => Some(Accidental::DoubleFlat),
            _ => None,
        }
    }
}

/// Sharp spelling of the twelve pitch classes, starting at C
const SHARP_NAMES: [(char, Accidental); 12] = [
    ('C', Accidental::Natural),
    ('C', Accidental::Sharp),
    ('D', Accidental::Natural),
    ('D', Accidental::Sharp),
    ('E', Accidental::Natural),
    ('F', Accidental::Natural),
    ('F', Accidental::Sharp),
    ('G', Accidental::Natural),
    ('G', Accidental::Sharp),
    ('A', Accidental::Natural),
    ('A', Accidental::Sharp),
    ('B', Accidental::Natural),
];

fn pitch_class(name: char) -> Option<i32> {
    match name {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// A note as delivered by an input layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Note {
    /// MIDI note number (0-127)
    pub number: u8,
    /// Letter name, 'A' to 'G'
    pub name: char,
    pub accidental: Accidental,
    /// Octave in scientific pitch notation (middle C is C4)
    pub octave: i8,
}

impl Note {
    /// Build a note from a MIDI number, spelled with sharps
    pub fn from_number(number: u8) -> Self {
        let number = number.min(127);
        let (name, accidental) = SHARP_NAMES[(number % 12) as usize];
        Self {
            number,
            name,
            accidental,
            octave: (number / 12) as i8 - 1,
        }
    }

    /// Key addressing this pitch: name, accidental and octave (e.g. "C#4")
    pub fn identifier(&self) -> String {
        format!("{}{}{}", self.name, self.accidental.symbol(), self.octave)
    }

    /// Frequency in Hz
    pub fn frequency(&self) -> f64 {
        note_frequency(self.number)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, self.accidental.symbol(), self.octave)
    }
}

impl FromStr for Note {
    type Err = SynthError;

    /// Parse text like "C4", "f#3" or "Bb-1"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SynthError::InvalidNote(s.to_string());
        let text = s.trim();

        let mut chars = text.chars();
        let name = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
        let pitch = pitch_class(name).ok_or_else(invalid)?;

        let rest = chars.as_str();
        let split = rest
            .find(|c: char| c == '-' || c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (symbol, octave) = rest.split_at(split);

        let accidental = Accidental::from_symbol(symbol).ok_or_else(invalid)?;
        let octave: i8 = octave.parse().map_err(|_| invalid())?;

        let number = (octave as i32 + 1) * 12 + pitch + accidental.semitones();
        if !(0..=127).contains(&number) {
            return Err(invalid());
        }

        Ok(Self {
            number: number as u8,
            name,
            accidental,
            octave,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_is_440() {
        assert!((note_frequency(69) - 440.0).abs() < 1e-9);
    }

    #[test]
    fn test_tuning_base() {
        assert_eq!(note_frequency(9), 13.75);
    }

    #[test]
    fn test_middle_c() {
        assert!((note_frequency(60) - 261.6256).abs() < 0.001);
    }

    #[test]
    fn test_frequency_monotonic_and_octaves() {
        for n in 0..127u8 {
            assert!(note_frequency(n + 1) > note_frequency(n));
        }
        for n in 0..=115u8 {
            let ratio = note_frequency(n + 12) / note_frequency(n);
            assert!((ratio - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_from_number_spelling() {
        let note = Note::from_number(61);
        assert_eq!(note.name, 'C');
        assert_eq!(note.accidental, Accidental::Sharp);
        assert_eq!(note.octave, 4);
        assert_eq!(note.identifier(), "C#4");

        assert_eq!(Note::from_number(0).identifier(), "C-1");
        assert_eq!(Note::from_number(127).identifier(), "G9");
    }

    #[test]
    fn test_from_number_clamps() {
        assert_eq!(Note::from_number(200).number, 127);
    }

    #[test]
    fn test_parse_notes() {
        let note: Note = "C4".parse().unwrap();
        assert_eq!(note.number, 60);
        assert_eq!(note.identifier(), "C4");

        let note: Note = "bb3".parse().unwrap();
        assert_eq!(note.name, 'B');
        assert_eq!(note.accidental, Accidental::Flat);
        assert_eq!(note.number, 58);

        let note: Note = "A-1".parse().unwrap();
        assert_eq!(note.number, 9);
        assert_eq!(note.frequency(), 13.75);

        let note: Note = " F##2 ".parse().unwrap();
        assert_eq!(note.number, 43);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for text in ["", "H4", "C", "C#", "Cx4", "C99", "G#9", "Cb-1"] {
            assert!(text.parse::<Note>().is_err(), "accepted {:?}", text);
        }
    }

    #[test]
    fn test_display_matches_identifier() {
        let note: Note = "Eb5".parse().unwrap();
        assert_eq!(note.to_string(), note.identifier());
    }
}
