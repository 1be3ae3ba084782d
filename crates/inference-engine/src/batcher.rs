//! Mini-batch Scheduling

use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::Range;
use tracing::debug;

/// Splits row indices into mini-batches
#[derive(Debug, Clone, Copy)]
pub struct Batcher {
    batch_size: usize,
}

impl Batcher {
    /// Create a batcher; a zero batch size is treated as one row
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Contiguous row ranges covering `0..n`, for inference
    pub fn ranges(&self, n: usize) -> impl Iterator<Item = Range<usize>> {
        let size = self.batch_size;
        (0..n).step_by(size).map(move |start| start..(start + size).min(n))
    }

    /// Shuffled row indices chunked into batches, for one training epoch
    pub fn shuffled<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        let batches: Vec<Vec<usize>> = indices.chunks(self.batch_size).map(<[usize]>::to_vec).collect();
        debug!("Epoch schedule: {} batches of up to {} rows", batches.len(), self.batch_size);
        batches
    }
}
