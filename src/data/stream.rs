// ============================================================
// Layer 4 — Streaming Dataset
// ============================================================
// When a model supplies its own data (the load_data hook), the
// harness stops sampling index permutations and instead pulls
// mini-batches from an endless stream:
//
//   rows 0..N ──repeat──► shuffle buffer ──batch──► Batch
//                          (optional)
//
//   repeat         — 0,1,..,N-1,0,1,.. forever, so a batch can
//                    straddle an epoch boundary
//   shuffle buffer — keeps `capacity` upcoming indices and
//                    emits a random one each time; a buffer of
//                    N or more gives a full shuffle, smaller
//                    buffers only mix nearby rows
//   batch          — groups `batch_size` indices and gathers
//                    the rows (always full, the stream never
//                    ends)
//
// Reference: rand crate documentation (Rng::gen_range)

use anyhow::{ensure, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::batcher::{Batch, RowBatcher};
use crate::data::dataset::{Split, TrainingData};
use crate::domain::config::ModelConfig;

/// Seeded RNG when a seed is configured, entropy otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None       => StdRng::from_entropy(),
    }
}

// ─── ShuffleBuffer ────────────────────────────────────────────────────────────
/// Iterator adapter that emits a random element from a bounded
/// look-ahead buffer.
pub struct ShuffleBuffer<I: Iterator, R: Rng> {
    upstream: I,
    buffer:   Vec<I::Item>,
    capacity: usize,
    rng:      R,
}

impl<I: Iterator, R: Rng> ShuffleBuffer<I, R> {
    pub fn new(upstream: I, capacity: usize, rng: R) -> Self {
        Self {
            upstream,
            buffer: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
            rng,
        }
    }
}

impl<I: Iterator, R: Rng> Iterator for ShuffleBuffer<I, R> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        while self.buffer.len() < self.capacity {
            match self.upstream.next() {
                Some(item) => self.buffer.push(item),
                None       => break,
            }
        }
        if self.buffer.is_empty() {
            return None;
        }
        let pick = self.rng.gen_range(0..self.buffer.len());
        Some(self.buffer.swap_remove(pick))
    }
}

// ─── BatchStream ──────────────────────────────────────────────────────────────
/// Endless source of mini-batches over one split.
pub struct BatchStream<B: Backend> {
    batcher:    RowBatcher<B>,
    device:     B::Device,
    indices:    Box<dyn Iterator<Item = usize>>,
    batch_size: usize,
}

impl<B: Backend> BatchStream<B> {
    pub fn new(
        split:          Split<B>,
        batch_size:     usize,
        shuffle_buffer: Option<usize>,
        seed:           Option<u64>,
    ) -> Result<Self> {
        ensure!(!split.is_empty(), "cannot stream an empty split");
        ensure!(batch_size > 0, "batch_size must be positive");

        let repeated = (0..split.len()).cycle();
        let indices: Box<dyn Iterator<Item = usize>> = match shuffle_buffer {
            Some(capacity) => Box::new(ShuffleBuffer::new(repeated, capacity, make_rng(seed))),
            None           => Box::new(repeated),
        };
        let device = split.inputs.device();
        Ok(Self { batcher: RowBatcher::new(split), device, indices, batch_size })
    }

    /// Number of rows in the underlying split
    pub fn len(&self) -> usize {
        self.batcher.split().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batcher.split().is_empty()
    }

    /// Full mini-batches that fit in one pass over the split.
    pub fn batches_per_epoch(&self) -> usize {
        self.len() / self.batch_size
    }

    pub fn next_indices(&mut self) -> Vec<usize> {
        self.indices.by_ref().take(self.batch_size).collect()
    }

    pub fn next_batch(&mut self) -> Batch<B> {
        let indices = self.next_indices();
        self.batcher.batch(indices, &self.device)
    }
}

// ─── DataStreams ──────────────────────────────────────────────────────────────
/// Training stream plus an optional validation stream, built
/// from the data a model returns from its load_data hook.
pub struct DataStreams<B: Backend> {
    pub train:      BatchStream<B>,
    pub validation: Option<BatchStream<B>>,
}

impl<B: Backend> DataStreams<B> {
    pub fn new(data: TrainingData<B>, config: &ModelConfig) -> Result<Self> {
        if config.prefetch.is_some() {
            tracing::debug!("prefetch is ignored: batches are produced synchronously");
        }

        // Validation gets its own seed so the two orders differ
        let valid_seed = config.seed.map(|s| s.wrapping_add(1));
        let train = BatchStream::new(data.train, config.batch_size, config.shuffle_buffer, config.seed)?;
        let validation = data
            .validation
            .map(|split| BatchStream::new(split, config.batch_size, config.shuffle_buffer, valid_seed))
            .transpose()?;

        tracing::debug!(
            "Streaming {} training rows ({} batches of {})",
            train.len(),
            train.batches_per_epoch(),
            config.batch_size,
        );
        Ok(Self { train, validation })
    }

    pub fn batches_per_epoch(&self) -> usize {
        self.train.batches_per_epoch()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_shuffle_buffer_is_a_permutation() {
        let out: Vec<usize> = ShuffleBuffer::new(0..50, 8, make_rng(Some(3))).collect();
        let mut sorted = out.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_buffer_of_one_keeps_order() {
        let out: Vec<usize> = ShuffleBuffer::new(0..10, 1, make_rng(Some(0))).collect();
        assert_eq!(out, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_buffer_bounds_displacement() {
        // An element can be emitted at most capacity-1 positions early
        let capacity = 4;
        let out: Vec<usize> = ShuffleBuffer::new(0..100, capacity, make_rng(Some(9))).collect();
        for (pos, &value) in out.iter().enumerate() {
            assert!(value < pos + capacity);
        }
    }

    #[test]
    fn test_stream_repeats_without_shuffle() {
        let device = Default::default();
        let split  = Split::autoencoding(Tensor::<TestBackend, 2>::zeros([5, 2], &device));
        let mut stream = BatchStream::new(split, 3, None, None).unwrap();

        assert_eq!(stream.batches_per_epoch(), 1);
        assert_eq!(stream.next_indices(), vec![0, 1, 2]);
        assert_eq!(stream.next_indices(), vec![3, 4, 0]);
        assert_eq!(stream.next_batch().len(), 3);
    }

    #[test]
    fn test_empty_split_is_rejected() {
        let device = Default::default();
        let split  = Split::autoencoding(Tensor::<TestBackend, 2>::zeros([0, 2], &device));
        assert!(BatchStream::new(split, 3, None, None).is_err());
    }
}
