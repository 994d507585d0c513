pub mod musical;

// Default sample rate (Hz) for a pitch session. File sources override it
// with the rate stored in the file header.
pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;

#[inline(always)]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Mean squared amplitude, `‖x‖² / len`.
pub fn mean_square(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64) as f32
}

pub fn mixdown_into(buffer: &mut Vec<f32>, samples: &[f32], channels: usize) {
    buffer.clear();
    if channels == 0 || samples.is_empty() {
        return;
    }

    if channels == 1 {
        buffer.extend_from_slice(samples);
        return;
    }

    let frame_count = samples.len() / channels;
    buffer.reserve(frame_count);

    let inv = 1.0 / channels as f32;
    for frame in samples.chunks_exact(channels) {
        let sum: f32 = frame.iter().sum();
        buffer.push(sum * inv);
    }
}

#[inline]
pub fn apply_window(buffer: &mut [f32], window: &[f32]) {
    debug_assert_eq!(buffer.len(), window.len());
    for (sample, coeff) in buffer.iter_mut().zip(window.iter()) {
        *sample *= *coeff;
    }
}

/// Index of the largest value; the first one wins on ties.
pub fn argmax<T: PartialOrd + Copy>(values: &[T]) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if best.is_none_or(|(_, current)| value > current) {
            best = Some((idx, value));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Rounds to one decimal place, the precision readings are reported at.
#[inline]
pub fn round_tenth(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixdown_averages_frames() {
        let mut out = Vec::new();
        mixdown_into(&mut out, &[1.0, 3.0, -1.0, 1.0, 0.5], 2);
        assert_eq!(out, vec![2.0, 0.0]);

        mixdown_into(&mut out, &[0.25, 0.5], 1);
        assert_eq!(out, vec![0.25, 0.5]);
    }

    #[test]
    fn mean_square_of_constant() {
        assert_eq!(mean_square(&[]), 0.0);
        assert!((mean_square(&[0.5; 64]) - 0.25).abs() < 1e-7);
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax::<f32>(&[]), None);
        assert_eq!(argmax(&[0.0f32, 2.0, 1.0, 2.0]), Some(1));
        assert_eq!(argmax(&[0.0f64; 4]), Some(0));
    }

    #[test]
    fn rounds_to_tenths() {
        assert_eq!(round_tenth(440.04), 440.0);
        assert_eq!(round_tenth(439.96), 440.0);
        assert_eq!(round_tenth(261.63), 261.6);
    }
}
