//! Fixed-length sliding window over the most recent samples.

use crate::error::{PitchError, Result};
use crate::util::audio::mean_square;

/// Circular buffer that always holds exactly `capacity` samples.
///
/// Starts zero-filled. Each push overwrites the oldest samples in place, so
/// block arrival never reallocates.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    data: Vec<f32>,
    // Index of the oldest sample, which is also the next write position.
    head: usize,
    received: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sliding window capacity must be positive");
        Self {
            data: vec![0.0; capacity],
            head: 0,
            received: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Total number of real samples pushed since creation or the last clear,
    /// saturating at the capacity.
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_full(&self) -> bool {
        self.received == self.data.len()
    }

    pub fn push(&mut self, block: &[f32]) -> Result<()> {
        let capacity = self.data.len();
        if block.is_empty() {
            return Err(PitchError::MalformedBlock("block is empty".into()));
        }
        if block.len() > capacity {
            return Err(PitchError::MalformedBlock(format!(
                "block of {} samples exceeds window of {capacity}",
                block.len()
            )));
        }

        let first = (capacity - self.head).min(block.len());
        self.data[self.head..self.head + first].copy_from_slice(&block[..first]);
        let rest = block.len() - first;
        self.data[..rest].copy_from_slice(&block[first..]);

        self.head = (self.head + block.len()) % capacity;
        self.received = (self.received + block.len()).min(capacity);
        Ok(())
    }

    /// Writes the window into `dst`, oldest sample first.
    pub fn copy_to(&self, dst: &mut [f32]) {
        debug_assert_eq!(dst.len(), self.data.len());
        let (newer, older) = self.data.split_at(self.head);
        dst[..older.len()].copy_from_slice(older);
        dst[older.len()..].copy_from_slice(newer);
    }

    pub fn to_vec(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.data.len()];
        self.copy_to(&mut out);
        out
    }

    /// Mean squared amplitude over the whole window, zero padding included.
    pub fn power(&self) -> f32 {
        mean_square(&self.data)
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.head = 0;
        self.received = 0;
    }
}
