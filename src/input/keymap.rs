/// Convert a MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Scientific pitch name, e.g. `E0` for MIDI 16.
pub fn note_name(note: u8) -> String {
    let octave = note as i32 / 12 - 1;
    format!("{}{}", NOTE_NAMES[note as usize % 12], octave)
}

/// Letter keys from lowest to highest pitch: bottom row, home row, top row.
pub const KEY_ORDER: [char; 26] = [
    'z', 'x', 'c', 'v', 'b', 'n', 'm', // E0 .. A#0
    'a', 's', 'd', 'f', 'g', 'h', 'j', 'k', 'l', // B0 .. G1
    'q', 'w', 'e', 'r', 't', 'y', 'u', 'i', 'o', 'p', // G#1 .. F2
];

/// MIDI note of the lowest key (E0, 20.6 Hz).
pub const FIRST_NOTE: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyBinding {
    pub key: char,
    pub note: u8,
    pub frequency: f32,
}

/// Fixed mapping from letter keys to pitches, one semitone apart.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: Vec<KeyBinding>,
}

impl Keymap {
    pub fn new() -> Self {
        let bindings = KEY_ORDER
            .iter()
            .zip(FIRST_NOTE..)
            .map(|(&key, note)| KeyBinding {
                key,
                note,
                frequency: midi_note_to_freq(note),
            })
            .collect();
        Self { bindings }
    }

    /// Bindings from lowest to highest pitch.
    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    pub fn binding(&self, key: char) -> Option<&KeyBinding> {
        let key = key.to_ascii_lowercase();
        self.bindings.iter().find(|b| b.key == key)
    }

    pub fn frequency(&self, key: char) -> Option<f32> {
        self.binding(key).map(|b| b.frequency)
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new()
    }
}
