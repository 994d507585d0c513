//! Block-by-block pitch detection session.
//!
//! Each block is pushed into a sliding window. Windows with enough energy
//! are tapered and transformed, the spectrum is denoised, a fundamental is
//! picked with the harmonic product spectrum and mapped to the nearest
//! tempered note. A short decision ring debounces the reported note.

use super::denoise::{
    DEFAULT_HUM_CUTOFF_HZ, DEFAULT_OCTAVE_BANDS, DEFAULT_WHITE_NOISE_THRESHOLD, SpectralDenoiser,
};
use super::hps::{DEFAULT_HARMONIC_COUNT, HarmonicProductSpectrum};
use super::spectrum::{SpectrumAnalyzer, WindowKind};
use super::stabilizer::{DEFAULT_STABILITY_DEPTH, NoteStabilizer};
use super::window::SlidingWindow;
use super::{AudioBlock, AudioProcessor, ProcessorUpdate, Reconfigurable};
use crate::error::{PitchError, Result};
use crate::util::audio::musical::{DEFAULT_CONCERT_PITCH_HZ, MusicalNote, NoteLabel};
use crate::util::audio::{DEFAULT_SAMPLE_RATE, argmax, mixdown_into, round_tenth};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, trace, warn};

pub const DEFAULT_WINDOW_SIZE: usize = 48_000;
pub const DEFAULT_HOP_SIZE: usize = 12_000;
pub const DEFAULT_POWER_THRESHOLD: f32 = 1e-6;

/// What a below-threshold block does to the decision ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilencePolicy {
    /// Keep earlier decisions; a note interrupted by a short gap is confirmed
    /// again as soon as it returns.
    #[default]
    Hold,
    /// Forget earlier decisions; after a gap the note needs a full ring of
    /// agreeing blocks again.
    Reset,
}

/// Parameters fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub sample_rate: f32,
    /// Samples per analysis window (`N`).
    pub window_size: usize,
    /// Nominal samples per incoming block (`B`); used by block sources.
    pub hop_size: usize,
    /// Number of harmonic product stages, also the interpolation factor.
    pub harmonic_count: usize,
    /// Minimum mean squared amplitude for a window to be analyzed.
    pub power_threshold: f32,
    /// Fraction of the octave-band RMS a bin must exceed to survive.
    pub white_noise_threshold: f32,
    pub hum_cutoff_hz: f32,
    pub octave_bands: Vec<f32>,
    pub concert_pitch: f32,
    /// Decisions that must agree before a note is reported (`M`).
    pub stability_depth: usize,
    pub window: WindowKind,
    pub denoise: bool,
    pub harmonic_product: bool,
    pub octave_numbers: bool,
    pub silence_policy: SilencePolicy,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            window_size: DEFAULT_WINDOW_SIZE,
            hop_size: DEFAULT_HOP_SIZE,
            harmonic_count: DEFAULT_HARMONIC_COUNT,
            power_threshold: DEFAULT_POWER_THRESHOLD,
            white_noise_threshold: DEFAULT_WHITE_NOISE_THRESHOLD,
            hum_cutoff_hz: DEFAULT_HUM_CUTOFF_HZ,
            octave_bands: DEFAULT_OCTAVE_BANDS.to_vec(),
            concert_pitch: DEFAULT_CONCERT_PITCH_HZ,
            stability_depth: DEFAULT_STABILITY_DEPTH,
            window: WindowKind::Hann,
            denoise: true,
            harmonic_product: true,
            octave_numbers: false,
            silence_policy: SilencePolicy::Hold,
        }
    }
}

impl PitchConfig {
    /// Width of one spectrum bin in Hz.
    pub fn bin_hz(&self) -> f32 {
        self.sample_rate / self.window_size as f32
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PitchError::InvalidConfiguration(msg));

        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return invalid(format!("sample rate must be positive, got {}", self.sample_rate));
        }
        if self.window_size < 2 {
            return invalid(format!(
                "window size must be at least 2 samples, got {}",
                self.window_size
            ));
        }
        if self.hop_size == 0 || self.hop_size > self.window_size {
            return invalid(format!(
                "hop size must be within 1..={}, got {}",
                self.window_size, self.hop_size
            ));
        }
        if self.harmonic_count == 0 {
            return invalid("harmonic count must be positive".into());
        }
        if self.stability_depth == 0 {
            return invalid("stability depth must be positive".into());
        }
        if !self.power_threshold.is_finite() || self.power_threshold < 0.0 {
            return invalid(format!(
                "power threshold must be non-negative, got {}",
                self.power_threshold
            ));
        }
        if !self.white_noise_threshold.is_finite() || self.white_noise_threshold < 0.0 {
            return invalid(format!(
                "white noise threshold must be non-negative, got {}",
                self.white_noise_threshold
            ));
        }
        if !self.hum_cutoff_hz.is_finite() || self.hum_cutoff_hz < 0.0 {
            return invalid(format!(
                "hum cutoff must be non-negative, got {}",
                self.hum_cutoff_hz
            ));
        }
        if !self.concert_pitch.is_finite() || self.concert_pitch <= 0.0 {
            return invalid(format!(
                "concert pitch must be positive, got {}",
                self.concert_pitch
            ));
        }
        if self.octave_bands.len() < 2 {
            return invalid("octave bands need at least two edges".into());
        }
        let ascending = self.octave_bands.windows(2).all(|pair| {
            pair[0].is_finite() && pair[1].is_finite() && pair[0] >= 0.0 && pair[0] < pair[1]
        });
        if !ascending {
            return invalid(format!(
                "octave band edges must be finite and strictly increasing: {:?}",
                self.octave_bands
            ));
        }
        Ok(())
    }
}

/// Session lifecycle as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No block received yet.
    Idle,
    /// The window still contains part of its zero initialization; audible
    /// blocks report [`PitchReading::Transitional`] without reaching the
    /// decision ring.
    Warmup,
    Steady,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PitchEstimate {
    pub note: NoteLabel,
    pub estimated_freq_hz: f32,
    pub reference_pitch_hz: f32,
    /// Offset of the unrounded estimate from the reference pitch.
    pub cents: f32,
}

/// Result of one processed block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PitchReading {
    NoSignal,
    Transitional,
    Stable(PitchEstimate),
}

impl PitchReading {
    pub fn estimate(&self) -> Option<&PitchEstimate> {
        match self {
            PitchReading::Stable(estimate) => Some(estimate),
            _ => None,
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, PitchReading::Stable(_))
    }
}

impl fmt::Display for PitchReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PitchReading::NoSignal => f.write_str("-"),
            PitchReading::Transitional => f.write_str("..."),
            PitchReading::Stable(estimate) => write!(
                f,
                "{}  {:.1}/{:.1}",
                estimate.note, estimate.estimated_freq_hz, estimate.reference_pitch_hz
            ),
        }
    }
}

/// One detection session. Owns the sliding window and the decision ring;
/// independent sessions share nothing.
#[derive(Debug)]
pub struct PitchProcessor {
    config: PitchConfig,
    window: SlidingWindow,
    analyzer: SpectrumAnalyzer,
    denoiser: SpectralDenoiser,
    hps: HarmonicProductSpectrum,
    stabilizer: NoteStabilizer<NoteLabel>,
    magnitudes: Vec<f32>,
    mono: Vec<f32>,
    blocks_processed: u64,
}

impl PitchProcessor {
    pub fn new(config: PitchConfig) -> Result<Self> {
        config.validate()?;

        let analyzer = SpectrumAnalyzer::new(config.window_size, config.window);
        let denoiser = SpectralDenoiser::new(
            config.bin_hz(),
            config.hum_cutoff_hz,
            config.white_noise_threshold,
            config.octave_bands.clone(),
        );
        info!(
            "[pitch] session: {} Hz, window {} ({:.3} s), hop {}, {} harmonics, {} taper",
            config.sample_rate,
            config.window_size,
            config.window_size as f32 / config.sample_rate,
            config.hop_size,
            config.harmonic_count,
            config.window
        );

        Ok(Self {
            window: SlidingWindow::new(config.window_size),
            magnitudes: vec![0.0; analyzer.bin_count()],
            analyzer,
            denoiser,
            hps: HarmonicProductSpectrum::new(config.harmonic_count),
            stabilizer: NoteStabilizer::new(config.stability_depth),
            mono: Vec::with_capacity(config.hop_size),
            blocks_processed: 0,
            config,
        })
    }

    pub fn config(&self) -> &PitchConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        if self.blocks_processed == 0 {
            SessionState::Idle
        } else if self.window.is_full() {
            SessionState::Steady
        } else {
            SessionState::Warmup
        }
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn pending_decisions(&self) -> usize {
        self.stabilizer.len()
    }

    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed
    }

    /// Processes one mono block.
    ///
    /// Malformed blocks are rejected before anything is mutated.
    pub fn process(&mut self, samples: &[f32]) -> Result<PitchReading> {
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(PitchError::MalformedBlock(format!(
                "non-finite sample at index {index}"
            )));
        }
        self.window.push(samples)?;
        self.blocks_processed += 1;

        let power = self.window.power();
        if power < self.config.power_threshold {
            trace!("[pitch] power {power:.3e} below threshold");
            return Ok(self.silence());
        }
        // The edge between the zero fill and the first samples smears energy
        // across the spectrum, so partial windows are not analyzed.
        if self.state() == SessionState::Warmup {
            trace!(
                "[pitch] warming up: {}/{} samples",
                self.window.received(),
                self.window.capacity()
            );
            return Ok(PitchReading::Transitional);
        }

        let Some(frequency_hz) = self.estimate_frequency() else {
            debug!("[pitch] spectrum empty after denoising");
            return Ok(self.silence());
        };
        let Some(note) = MusicalNote::from_frequency(frequency_hz, self.config.concert_pitch)
        else {
            debug!("[pitch] no note for peak at {frequency_hz} Hz");
            return Ok(self.silence());
        };

        let label = note.label(self.config.octave_numbers);
        let estimate = PitchEstimate {
            note: label,
            estimated_freq_hz: round_tenth(frequency_hz),
            reference_pitch_hz: round_tenth(note.reference_hz),
            cents: note.cents_offset(frequency_hz),
        };
        debug!(
            "[pitch] block {}: {label} at {frequency_hz:.2} Hz (power {power:.3e})",
            self.blocks_processed
        );

        Ok(match self.stabilizer.push(label) {
            Some(_) => PitchReading::Stable(estimate),
            None => PitchReading::Transitional,
        })
    }

    fn estimate_frequency(&mut self) -> Option<f32> {
        self.window.copy_to(self.analyzer.input_mut());
        self.analyzer.analyze(&mut self.magnitudes);
        if self.config.denoise {
            self.denoiser.apply(&mut self.magnitudes);
        }

        let bin_hz = self.config.bin_hz();
        if self.config.harmonic_product {
            return self
                .hps
                .estimate(&self.magnitudes, bin_hz)
                .map(|peak| peak.frequency_hz);
        }

        if self.magnitudes.iter().all(|&m| m == 0.0) {
            return None;
        }
        argmax(&self.magnitudes).map(|index| index as f32 * bin_hz)
    }

    fn silence(&mut self) -> PitchReading {
        if self.config.silence_policy == SilencePolicy::Reset {
            self.stabilizer.clear();
        }
        PitchReading::NoSignal
    }
}

impl AudioProcessor for PitchProcessor {
    type Output = PitchReading;

    fn process_block(&mut self, block: &AudioBlock<'_>) -> ProcessorUpdate<Self::Output> {
        if block.channels == 0 || block.frame_count() == 0 {
            return ProcessorUpdate::None;
        }
        if (block.sample_rate - self.config.sample_rate).abs() > f32::EPSILON {
            let err = PitchError::MalformedBlock(format!(
                "block at {} Hz, session runs at {} Hz",
                block.sample_rate, self.config.sample_rate
            ));
            warn!("[pitch] {err}");
            return ProcessorUpdate::None;
        }

        let mut mono = std::mem::take(&mut self.mono);
        mixdown_into(&mut mono, block.samples, block.channels);
        let result = self.process(&mono);
        self.mono = mono;

        match result {
            Ok(reading) => ProcessorUpdate::Snapshot(reading),
            Err(err) => {
                warn!("[pitch] {err}");
                ProcessorUpdate::None
            }
        }
    }

    fn reset(&mut self) {
        self.window.clear();
        self.stabilizer.clear();
        self.blocks_processed = 0;
    }
}

impl Reconfigurable<PitchConfig> for PitchProcessor {
    fn update_config(&mut self, config: PitchConfig) {
        if config == self.config {
            return;
        }
        match Self::new(config) {
            Ok(fresh) => *self = fresh,
            Err(err) => error!("[pitch] keeping previous configuration: {err}"),
        }
    }
}
