//! WAV file source feeding fixed-size blocks to a pitch session.

use crate::util::audio::mixdown_into;
use anyhow::{Context, Result, anyhow};
use hound::{SampleFormat, WavReader};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// A decoded recording, already mixed down to mono.
#[derive(Debug, Clone)]
pub struct WavAudio {
    samples: Vec<f32>,
    sample_rate: u32,
    source_channels: u16,
}

pub fn load_wav(path: &Path) -> Result<WavAudio> {
    let reader =
        WavReader::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    WavAudio::from_reader(reader).with_context(|| format!("failed to decode {}", path.display()))
}

impl WavAudio {
    pub fn from_reader<R: Read>(reader: WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(anyhow!("WAV header reports 0 channels"));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
            SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(anyhow!(
                        "unsupported integer sample width {}",
                        spec.bits_per_sample
                    ));
                }
                let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|s| s as f32 * scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let mut samples = Vec::new();
        mixdown_into(&mut samples, &interleaved, spec.channels as usize);
        debug!(
            "[wav] decoded {} frames, {} channel(s) at {} Hz",
            samples.len(),
            spec.channels,
            spec.sample_rate
        );

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            source_channels: spec.channels,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn source_channels(&self) -> u16 {
        self.source_channels
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Consecutive blocks of `hop` samples; the last one may be shorter.
    pub fn blocks(&self, hop: usize) -> impl Iterator<Item = &[f32]> {
        self.samples.chunks(hop.max(1))
    }
}
