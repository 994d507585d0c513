pub mod denoise;
pub mod hps;
pub mod pitch;
pub mod spectrum;
pub mod stabilizer;
pub mod window;

/// One block of interleaved samples as delivered by a source.
#[derive(Debug, Clone, Copy)]
pub struct AudioBlock<'a> {
    pub samples: &'a [f32],
    pub channels: usize,
    pub sample_rate: f32,
}

impl<'a> AudioBlock<'a> {
    pub fn new(samples: &'a [f32], channels: usize, sample_rate: f32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    pub fn mono(samples: &'a [f32], sample_rate: f32) -> Self {
        Self::new(samples, 1, sample_rate)
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorUpdate<T> {
    None,
    Snapshot(T),
}

impl<T> From<ProcessorUpdate<T>> for Option<T> {
    fn from(update: ProcessorUpdate<T>) -> Self {
        match update {
            ProcessorUpdate::Snapshot(s) => Some(s),
            ProcessorUpdate::None => None,
        }
    }
}

/// A stateful per-block transform. Blocks of one session must arrive in order.
pub trait AudioProcessor {
    type Output;

    fn process_block(&mut self, block: &AudioBlock<'_>) -> ProcessorUpdate<Self::Output>;
    fn reset(&mut self);
}

pub trait Reconfigurable<Cfg> {
    fn update_config(&mut self, config: Cfg);
}
