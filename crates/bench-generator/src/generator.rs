//! Batch production with a reused buffer.

use crate::generators::generate_value;
use bench_core::{Batch, DatasetSpec};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed of the RNG for one batch.
///
/// Each batch gets an independent stream so batch `n` can be regenerated
/// without replaying batches `0..n`.
pub fn seed_for_batch(seed: u64, index: u64) -> u64 {
    seed.wrapping_add(index.wrapping_mul(0x9E3779B97F4A7C15))
}

/// Generate one batch of `batch_size` rows. Deterministic for a given RNG
/// state.
pub fn next_batch<R: Rng>(
    dataset: &DatasetSpec,
    batch_size: usize,
    index: u64,
    rng: &mut R,
) -> Batch {
    let mut batch = Batch::default();
    fill_batch(dataset, batch_size, index, rng, &mut batch);
    batch
}

/// Refill `batch` in place, reusing its row allocations.
pub fn fill_batch<R: Rng>(
    dataset: &DatasetSpec,
    batch_size: usize,
    index: u64,
    rng: &mut R,
    batch: &mut Batch,
) {
    batch.index = index;
    batch.rows.truncate(batch_size);
    while batch.rows.len() < batch_size {
        batch.rows.push(Vec::with_capacity(dataset.columns.len()));
    }
    for row in &mut batch.rows {
        row.clear();
        for column in &dataset.columns {
            row.push(generate_value(&column.rule, rng));
        }
    }
}

/// Produces the batches of one scenario in order, holding at most one batch
/// in memory.
pub struct BatchGenerator {
    dataset: DatasetSpec,
    seed: u64,
    row_count: u64,
    batch_size: usize,
    next_index: u64,
    produced: u64,
    buffer: Batch,
}

impl BatchGenerator {
    pub fn new(dataset: DatasetSpec, seed: u64, row_count: u64, batch_size: usize) -> Self {
        Self {
            dataset,
            seed,
            row_count,
            batch_size,
            next_index: 0,
            produced: 0,
            buffer: Batch::default(),
        }
    }

    /// Generate the next batch into the shared buffer. The previous batch is
    /// overwritten. Returns `None` once `row_count` rows have been produced.
    pub fn next_batch(&mut self) -> Option<&Batch> {
        if self.batch_size == 0 || self.produced >= self.row_count {
            return None;
        }
        let remaining = self.row_count - self.produced;
        let size = remaining.min(self.batch_size as u64) as usize;

        let mut rng = StdRng::seed_from_u64(seed_for_batch(self.seed, self.next_index));
        fill_batch(
            &self.dataset,
            size,
            self.next_index,
            &mut rng,
            &mut self.buffer,
        );

        self.next_index += 1;
        self.produced += size as u64;
        Some(&self.buffer)
    }

    /// Rows produced so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    pub fn dataset(&self) -> &DatasetSpec {
        &self.dataset
    }
}
