//! Mains-hum and per-octave noise-floor suppression on magnitude spectra.

pub const DEFAULT_HUM_CUTOFF_HZ: f32 = 62.0;
pub const DEFAULT_WHITE_NOISE_THRESHOLD: f32 = 0.2;
pub const DEFAULT_OCTAVE_BANDS: [f32; 10] = [
    50.0, 100.0, 200.0, 400.0, 800.0, 1_600.0, 3_200.0, 6_400.0, 12_800.0, 25_600.0,
];

/// Spectral gate applied to each analysis frame.
///
/// Both passes only ever zero bins, so the output is pointwise no larger
/// than the input. Hum removal runs first because it changes the energy of
/// the lowest band.
#[derive(Debug, Clone)]
pub struct SpectralDenoiser {
    bin_hz: f32,
    hum_cutoff_hz: f32,
    white_noise_threshold: f32,
    band_edges_hz: Vec<f32>,
}

impl SpectralDenoiser {
    pub fn new(
        bin_hz: f32,
        hum_cutoff_hz: f32,
        white_noise_threshold: f32,
        band_edges_hz: Vec<f32>,
    ) -> Self {
        Self {
            bin_hz,
            hum_cutoff_hz,
            white_noise_threshold,
            band_edges_hz,
        }
    }

    pub fn apply(&self, magnitudes: &mut [f32]) {
        self.suppress_hum(magnitudes);
        self.suppress_band_noise(magnitudes);
    }

    /// Zeroes every bin whose centre lies below the hum cutoff.
    pub fn suppress_hum(&self, magnitudes: &mut [f32]) {
        let end = self.first_bin_at_or_above(self.hum_cutoff_hz).min(magnitudes.len());
        magnitudes[..end].fill(0.0);
    }

    /// Zeroes bins that do not rise above a fraction of their octave band's RMS.
    pub fn suppress_band_noise(&self, magnitudes: &mut [f32]) {
        let len = magnitudes.len();
        for edges in self.band_edges_hz.windows(2) {
            let start = self.bin_index(edges[0]);
            let end = self.bin_index(edges[1]).min(len);
            if start >= end {
                continue;
            }

            let band = &mut magnitudes[start..end];
            let energy: f64 = band.iter().map(|&m| (m as f64) * (m as f64)).sum();
            let rms = (energy / band.len() as f64).sqrt() as f32;
            let floor = self.white_noise_threshold * rms;
            for magnitude in band.iter_mut() {
                if *magnitude <= floor {
                    *magnitude = 0.0;
                }
            }
        }
    }

    fn bin_index(&self, freq_hz: f32) -> usize {
        if self.bin_hz <= 0.0 || freq_hz <= 0.0 {
            return 0;
        }
        (freq_hz / self.bin_hz) as usize
    }

    // Smallest k with k * bin_hz >= freq_hz.
    fn first_bin_at_or_above(&self, freq_hz: f32) -> usize {
        if self.bin_hz <= 0.0 || freq_hz <= 0.0 {
            return 0;
        }
        let mut k = (freq_hz / self.bin_hz).ceil() as usize;
        while k > 0 && (k - 1) as f32 * self.bin_hz >= freq_hz {
            k -= 1;
        }
        while (k as f32) * self.bin_hz < freq_hz {
            k += 1;
        }
        k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denoiser(bin_hz: f32) -> SpectralDenoiser {
        SpectralDenoiser::new(
            bin_hz,
            DEFAULT_HUM_CUTOFF_HZ,
            DEFAULT_WHITE_NOISE_THRESHOLD,
            DEFAULT_OCTAVE_BANDS.to_vec(),
        )
    }

    // Deterministic pseudo-random magnitudes without pulling in an RNG crate.
    fn noisy_spectrum(len: usize, seed: u32) -> Vec<f32> {
        let mut state = seed.max(1);
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state % 10_000) as f32 / 1_000.0
            })
            .collect()
    }

    #[test]
    fn hum_bins_are_zero() {
        for bin_hz in [1.0f32, 2.0, 3.7, 10.0, 44_100.0 / 4_096.0, 48_000.0 / 1_024.0] {
            let denoiser = denoiser(bin_hz);
            let mut spectrum = noisy_spectrum(2_048, 7);
            denoiser.apply(&mut spectrum);
            for (k, &m) in spectrum.iter().enumerate() {
                if (k as f32) * bin_hz < DEFAULT_HUM_CUTOFF_HZ {
                    assert_eq!(m, 0.0, "bin {k} at {} Hz", k as f32 * bin_hz);
                }
            }
        }
    }

    #[test]
    fn hum_cutoff_covers_partial_bins() {
        // 10.77 Hz bins: bin 5 sits at 53.8 Hz, bin 6 at 64.6 Hz.
        let bin_hz = 44_100.0 / 4_096.0;
        let mut spectrum = vec![1.0f32; 16];
        denoiser(bin_hz).suppress_hum(&mut spectrum);
        assert!(spectrum[..6].iter().all(|&m| m == 0.0));
        assert!(spectrum[6..].iter().all(|&m| m == 1.0));

        // A bin centred exactly on the cutoff is kept.
        let mut spectrum = vec![1.0f32; 4];
        denoiser(31.0).suppress_hum(&mut spectrum);
        assert_eq!(spectrum, vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn never_increases_any_bin() {
        for seed in 1..20 {
            let original = noisy_spectrum(4_000, seed);
            let mut spectrum = original.clone();
            denoiser(1.5).apply(&mut spectrum);
            for (after, before) in spectrum.iter().zip(&original) {
                assert!(after <= before);
            }
        }
    }

    #[test]
    fn keeps_peaks_above_band_floor() {
        let mut spectrum = vec![0.01f32; 1_000];
        spectrum[440] = 5.0;
        spectrum[120] = 3.0;
        denoiser(1.0).apply(&mut spectrum);

        assert_eq!(spectrum[440], 5.0);
        assert_eq!(spectrum[120], 3.0);
        // The flat floor inside the 400-800 Hz band sits far below 0.2 * RMS.
        assert_eq!(spectrum[500], 0.0);
        assert_eq!(spectrum[10], 0.0);
    }

    #[test]
    fn flat_band_survives() {
        // Every bin equals the band RMS, which clears the 0.2 threshold.
        let mut spectrum = vec![1.0f32; 300];
        denoiser(1.0).suppress_band_noise(&mut spectrum);
        assert!(spectrum[50..300].iter().all(|&m| m == 1.0));
    }

    #[test]
    fn short_spectrum_skips_empty_bands() {
        let mut spectrum = vec![1.0f32; 3];
        denoiser(40.0).apply(&mut spectrum);
        assert_eq!(spectrum, vec![0.0, 0.0, 1.0]);

        let mut empty: Vec<f32> = Vec::new();
        denoiser(1.0).apply(&mut empty);
        assert!(empty.is_empty());
    }
}
