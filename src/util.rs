//! Small helpers shared across the crate

use rand::seq::IndexedRandom;

use crate::synth::Note;

/// Keep `value` between `min` and `max`.
///
/// Unlike `f32::clamp` this never panics; when `min > max` the result is `max`.
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    let raised = if value < min { min } else { value };
    if raised > max {
        max
    } else {
        raised
    }
}

/// Pick a random element, or `None` for an empty slice
pub fn pick_random<T>(items: &[T]) -> Option<&T> {
    items.choose(&mut rand::rng())
}

/// Whether two notes share name and accidental, and octave unless ignored
pub fn notes_equal(a: &Note, b: &Note, ignore_octave: bool) -> bool {
    a.name == b.name && a.accidental == b.accidental && (ignore_octave || a.octave == b.octave)
}
