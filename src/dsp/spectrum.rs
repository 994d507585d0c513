//! Tapered FFT magnitude spectrum of a sample window.

use crate::util::audio::apply_window;
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex32;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Rectangular,
    #[default]
    Hann,
    Hamming,
    Blackman,
}

impl WindowKind {
    /// Symmetric taper of `len` points; both end points are part of the curve.
    pub fn coefficients(self, len: usize) -> Vec<f32> {
        if len <= 1 {
            return vec![1.0; len];
        }
        let span = (len - 1) as f64;
        let phase = |n: usize| n as f64 * core::f64::consts::TAU / span;
        match self {
            WindowKind::Rectangular => vec![1.0; len],
            WindowKind::Hann => (0..len)
                .map(|n| (0.5 - 0.5 * phase(n).cos()) as f32)
                .collect(),
            WindowKind::Hamming => (0..len)
                .map(|n| (0.54 - 0.46 * phase(n).cos()) as f32)
                .collect(),
            WindowKind::Blackman => {
                let a0 = 0.42;
                let a1 = 0.5;
                let a2 = 0.08;
                (0..len)
                    .map(|n| (a0 - a1 * phase(n).cos() + a2 * (2.0 * phase(n)).cos()) as f32)
                    .collect()
            }
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WindowKind::Rectangular => "rectangular",
            WindowKind::Hann => "hann",
            WindowKind::Hamming => "hamming",
            WindowKind::Blackman => "blackman",
        })
    }
}

/// Computes the lower half of the magnitude spectrum for a fixed window size.
///
/// Taper and FFT plan are built once; `analyze` only reuses buffers.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    taper: Vec<f32>,
    input: Vec<f32>,
    output: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl SpectrumAnalyzer {
    pub fn new(window_size: usize, kind: WindowKind) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window_size);
        Self {
            taper: kind.coefficients(window_size),
            input: fft.make_input_vec(),
            output: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            fft,
        }
    }

    pub fn window_size(&self) -> usize {
        self.input.len()
    }

    /// Number of magnitude bins produced, `N / 2`.
    pub fn bin_count(&self) -> usize {
        self.input.len() / 2
    }

    /// Mutable access to the time-domain input, to be filled oldest sample first.
    pub fn input_mut(&mut self) -> &mut [f32] {
        &mut self.input
    }

    /// Tapers the current input, transforms it and writes `N / 2` magnitudes.
    pub fn analyze(&mut self, magnitudes: &mut [f32]) {
        debug_assert_eq!(magnitudes.len(), self.bin_count());
        apply_window(&mut self.input, &self.taper);

        if let Err(err) =
            self.fft
                .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
        {
            error!("[pitch] forward FFT failed: {err}");
            magnitudes.fill(0.0);
            return;
        }

        for (magnitude, bin) in magnitudes.iter_mut().zip(self.output.iter()) {
            *magnitude = bin.norm();
        }
    }
}

impl fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("window_size", &self.window_size())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::audio::argmax;

    #[test]
    fn hann_is_symmetric_with_zero_ends() {
        let coeffs = WindowKind::Hann.coefficients(5);
        let expected = [0.0, 0.5, 1.0, 0.5, 0.0];
        for (c, e) in coeffs.iter().zip(expected) {
            assert!((c - e).abs() < 1e-6);
        }

        let even = WindowKind::Hann.coefficients(6);
        assert!(even[0].abs() < 1e-7);
        assert!((even[2] - even[3]).abs() < 1e-6);
    }

    #[test]
    fn rectangular_is_flat() {
        assert_eq!(WindowKind::Rectangular.coefficients(4), vec![1.0; 4]);
        assert_eq!(WindowKind::Hann.coefficients(1), vec![1.0]);
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let sample_rate = 8_000.0f32;
        let window_size = 1_000;
        let freq = 440.0f32;
        let mut analyzer = SpectrumAnalyzer::new(window_size, WindowKind::Hann);
        for (n, sample) in analyzer.input_mut().iter_mut().enumerate() {
            let t = n as f32 / sample_rate;
            *sample = (core::f32::consts::TAU * freq * t).sin();
        }

        let mut magnitudes = vec![0.0; analyzer.bin_count()];
        analyzer.analyze(&mut magnitudes);

        let bin_hz = sample_rate / window_size as f32;
        let peak = argmax(&magnitudes).unwrap();
        assert!((peak as f32 * bin_hz - freq).abs() <= bin_hz);
        assert!(magnitudes.iter().all(|m| *m >= 0.0));
    }
}
