//! Harmonic product spectrum fundamental estimation.
//!
//! The magnitude spectrum is resampled onto a grid `harmonics` times finer,
//! normalized, then multiplied with copies of itself decimated by 1, 2, ...
//! `harmonics`. A true fundamental at index `i` lines up with energy at
//! every `h * i`, while a lone harmonic peak does not, so the product
//! favours the fundamental over its louder overtones.

use crate::util::audio::{argmax, lerp};

pub const DEFAULT_HARMONIC_COUNT: usize = 5;

#[derive(Debug, Clone)]
pub struct HarmonicProductSpectrum {
    harmonics: usize,
    interpolated: Vec<f32>,
    product: Vec<f64>,
    scratch: Vec<f64>,
}

/// Peak of the final product, in both grid and frequency units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HpsPeak {
    /// Index on the interpolated grid.
    pub index: usize,
    pub frequency_hz: f32,
    /// Number of decimation stages that contributed before the product collapsed.
    pub stages: usize,
}

impl HarmonicProductSpectrum {
    pub fn new(harmonics: usize) -> Self {
        assert!(harmonics > 0, "harmonic count must be positive");
        Self {
            harmonics,
            interpolated: Vec::new(),
            product: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn harmonics(&self) -> usize {
        self.harmonics
    }

    /// The product left by the last successful `estimate` call.
    pub fn product(&self) -> &[f64] {
        &self.product
    }

    /// Returns `None` when the spectrum carries no energy at all.
    pub fn estimate(&mut self, magnitudes: &[f32], bin_hz: f32) -> Option<HpsPeak> {
        self.interpolate(magnitudes);
        if !self.normalize() {
            return None;
        }

        self.product.clear();
        self.product
            .extend(self.interpolated.iter().map(|&m| m as f64));

        let mut stages = 0;
        for stride in 1..=self.harmonics {
            let len = self.interpolated.len().div_ceil(stride);
            self.scratch.clear();
            self.scratch.extend(
                self.product[..len]
                    .iter()
                    .zip(self.interpolated.iter().step_by(stride))
                    .map(|(&acc, &m)| acc * m as f64),
            );

            if self.scratch.iter().all(|&v| v == 0.0) {
                break;
            }
            std::mem::swap(&mut self.product, &mut self.scratch);
            stages = stride;
        }

        let index = argmax(&self.product)?;
        Some(HpsPeak {
            index,
            frequency_hz: index as f32 * bin_hz / self.harmonics as f32,
            stages,
        })
    }

    // Piecewise-linear resampling at x = j / harmonics; points past the last
    // bin hold its value.
    fn interpolate(&mut self, magnitudes: &[f32]) {
        let step = self.harmonics;
        self.interpolated.clear();
        self.interpolated.reserve(magnitudes.len() * step);
        for (bin, &current) in magnitudes.iter().enumerate() {
            let next = magnitudes.get(bin + 1).copied().unwrap_or(current);
            for sub in 0..step {
                let t = sub as f32 / step as f32;
                self.interpolated.push(lerp(current, next, t));
            }
        }
    }

    fn normalize(&mut self) -> bool {
        let norm = self
            .interpolated
            .iter()
            .map(|&m| (m as f64) * (m as f64))
            .sum::<f64>()
            .sqrt();
        if norm <= 0.0 || !norm.is_finite() {
            return false;
        }
        let inv = (1.0 / norm) as f32;
        for value in &mut self.interpolated {
            *value *= inv;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harmonic_series(len: usize, fundamental: usize, amplitudes: &[f32]) -> Vec<f32> {
        let mut spectrum = vec![0.0; len];
        for (h, &amp) in amplitudes.iter().enumerate() {
            let bin = fundamental * (h + 1);
            if bin < len {
                spectrum[bin] = amp;
            }
        }
        spectrum
    }

    #[test]
    fn picks_fundamental_over_louder_harmonic() {
        let spectrum = harmonic_series(512, 20, &[0.6, 1.0, 0.5, 0.4, 0.3]);
        let raw_peak = argmax(&spectrum).unwrap();
        assert_eq!(raw_peak, 40, "second harmonic dominates the raw spectrum");

        let mut hps = HarmonicProductSpectrum::new(DEFAULT_HARMONIC_COUNT);
        let peak = hps.estimate(&spectrum, 1.0).expect("non-silent spectrum");
        assert_eq!(peak.index, 20 * DEFAULT_HARMONIC_COUNT);
        assert!((peak.frequency_hz - 20.0).abs() < 1e-4);
        assert_eq!(peak.stages, DEFAULT_HARMONIC_COUNT);
    }

    #[test]
    fn frequency_scales_with_bin_width() {
        let spectrum = harmonic_series(1_024, 110, &[0.5, 0.9, 0.7, 0.3, 0.2]);
        let mut hps = HarmonicProductSpectrum::new(5);
        let peak = hps.estimate(&spectrum, 4.0).unwrap();
        assert!((peak.frequency_hz - 440.0).abs() < 1e-3);
    }

    #[test]
    fn keeps_last_product_when_high_harmonics_are_missing() {
        // Only two harmonics exist; the third stride wipes the product out.
        let spectrum = harmonic_series(64, 10, &[0.8, 1.0]);
        let mut hps = HarmonicProductSpectrum::new(5);
        let peak = hps.estimate(&spectrum, 1.0).unwrap();
        assert_eq!(peak.stages, 2);
        assert_eq!(peak.index, 10 * 5);
        assert!(hps.product().iter().any(|&v| v > 0.0));
    }

    #[test]
    fn silent_spectrum_has_no_estimate() {
        let mut hps = HarmonicProductSpectrum::new(5);
        assert!(hps.estimate(&[0.0; 128], 1.0).is_none());
        assert!(hps.estimate(&[], 1.0).is_none());
    }

    #[test]
    fn interpolation_holds_last_bin() {
        let mut hps = HarmonicProductSpectrum::new(2);
        hps.interpolate(&[0.0, 2.0, 4.0]);
        assert_eq!(hps.interpolated, vec![0.0, 1.0, 2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn single_stage_is_plain_peak_pick() {
        let spectrum = harmonic_series(256, 30, &[0.2, 1.0]);
        let mut hps = HarmonicProductSpectrum::new(1);
        let peak = hps.estimate(&spectrum, 2.0).unwrap();
        assert_eq!(peak.index, 60);
        assert!((peak.frequency_hz - 120.0).abs() < 1e-4);
    }
}
