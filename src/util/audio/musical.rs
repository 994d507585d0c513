use serde::{Serialize, Serializer};
use std::fmt;

pub const DEFAULT_CONCERT_PITCH_HZ: f32 = 440.0;
const A4_OCTAVE: i32 = 4;
const SEMITONES_PER_OCTAVE: i32 = 12;
// Semitones from C up to A; octave numbers change at C.
const C_TO_A_SEMITONES: i32 = 9;

pub const NOTE_NAMES: [&str; 12] = [
    "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// Nearest equal-tempered note, indexed by its semitone offset from concert pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MusicalNote {
    pub semitone: i32,
    pub name: &'static str,
    pub octave: i32,
    pub reference_hz: f32,
}

impl MusicalNote {
    pub fn from_frequency(freq_hz: f32, concert_pitch: f32) -> Option<Self> {
        if freq_hz <= 0.0 || !freq_hz.is_finite() {
            return None;
        }
        if concert_pitch <= 0.0 || !concert_pitch.is_finite() {
            return None;
        }

        let semitone =
            (SEMITONES_PER_OCTAVE as f64 * (freq_hz as f64 / concert_pitch as f64).log2()).round();
        Some(Self::from_semitone(semitone as i32, concert_pitch))
    }

    pub fn from_semitone(semitone: i32, concert_pitch: f32) -> Self {
        let note_index = semitone.rem_euclid(SEMITONES_PER_OCTAVE) as usize;
        let octave = A4_OCTAVE + (semitone + C_TO_A_SEMITONES).div_euclid(SEMITONES_PER_OCTAVE);
        let reference_hz =
            (concert_pitch as f64 * 2f64.powf(semitone as f64 / SEMITONES_PER_OCTAVE as f64)) as f32;

        Self {
            semitone,
            name: NOTE_NAMES[note_index],
            octave,
            reference_hz,
        }
    }

    /// Signed distance of `freq_hz` from the reference pitch, in cents.
    pub fn cents_offset(self, freq_hz: f32) -> f32 {
        if freq_hz <= 0.0 || self.reference_hz <= 0.0 {
            return 0.0;
        }
        1200.0 * (freq_hz / self.reference_hz).log2()
    }

    pub fn label(self, with_octave: bool) -> NoteLabel {
        NoteLabel {
            name: self.name,
            octave: with_octave.then_some(self.octave),
        }
    }
}

/// Note name as reported to consumers, optionally octave-qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteLabel {
    pub name: &'static str,
    pub octave: Option<i32>,
}

impl fmt::Display for NoteLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.octave {
            Some(octave) => write!(f, "{}{}", self.name, octave),
            None => f.write_str(self.name),
        }
    }
}

impl Serialize for NoteLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
