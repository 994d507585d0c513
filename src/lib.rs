//! Monophonic pitch detection with a harmonic product spectrum.
//!
//! [`dsp::pitch::PitchProcessor`] is the entry point: feed it blocks of
//! samples in arrival order and it answers each one with a
//! [`dsp::pitch::PitchReading`].

pub mod audio;
pub mod dsp;
pub mod error;
pub mod settings;
pub mod util;

pub use dsp::pitch::{PitchConfig, PitchEstimate, PitchProcessor, PitchReading, SilencePolicy};
pub use error::PitchError;
