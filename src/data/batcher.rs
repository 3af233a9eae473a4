// ============================================================
// Layer 4 — Batcher and Batch Sources
// ============================================================
// QaBatcher implements Burn's Batcher trait to stack encoded
// examples into tensors:
//
//   Input:  Vec of N EncodedExamples, each of length S
//   Output: SquadBatch with [N, S] id/type/mask tensors and
//           [N] start/end position tensors
//
// BatchSource wraps a Burn DataLoader built over either
//   - the full dataset  (batch size 8 by default), or
//   - a half-size pool  (first floor(len/2) indices, batch 16)
// Both reshuffle every epoch. The shuffle seed comes from OS
// entropy, so runs are not reproducible.
//
// Reference: Burn Book §4 (Batcher, DataLoader)

use std::sync::Arc;

use burn::{
    data::{
        dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder, DataLoaderIterator},
        dataset::{transform::PartialDataset, Dataset},
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::data::dataset::{EncodedExample, SquadDataset};

// ─── SquadBatch ───────────────────────────────────────────────────────────────
/// A batch of encoded examples ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct SquadBatch<B: Backend> {
    /// Token ID sequences — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// Segment ids — 0 for context, 1 for question
    pub token_type_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,

    /// Gold start token index per sample — shape: [batch_size]
    pub start_positions: Tensor<B, 1, Int>,

    /// Gold end token index per sample — shape: [batch_size]
    pub end_positions: Tensor<B, 1, Int>,
}

impl<B: Backend> SquadBatch<B> {
    #[cfg(test)]
    pub fn batch_size(&self) -> usize {
        self.input_ids.dims()[0]
    }
}

// ─── QaBatcher ────────────────────────────────────────────────────────────────
/// Holds the target device so tensors land on the right adapter.
#[derive(Clone, Debug)]
pub struct QaBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> QaBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn matrix(&self, rows: Vec<i32>, batch_size: usize, seq_len: usize) -> Tensor<B, 2, Int> {
        Tensor::<B, 1, Int>::from_ints(rows.as_slice(), &self.device).reshape([batch_size, seq_len])
    }
}

impl<B: Backend> Batcher<EncodedExample, SquadBatch<B>> for QaBatcher<B> {
    fn batch(&self, items: Vec<EncodedExample>) -> SquadBatch<B> {
        let batch_size = items.len();
        // All sequences share one length (corpus-wide padding)
        let seq_len = items[0].input_ids.len();

        let input_ids      = flatten(&items, |s| s.input_ids.as_slice());
        let token_type_ids = flatten(&items, |s| s.token_type_ids.as_slice());
        let attention_mask = flatten(&items, |s| s.attention_mask.as_slice());

        let starts: Vec<i32> = items.iter().map(|s| s.start_position as i32).collect();
        let ends:   Vec<i32> = items.iter().map(|s| s.end_position as i32).collect();

        SquadBatch {
            input_ids:       self.matrix(input_ids, batch_size, seq_len),
            token_type_ids:  self.matrix(token_type_ids, batch_size, seq_len),
            attention_mask:  self.matrix(attention_mask, batch_size, seq_len),
            start_positions: Tensor::<B, 1, Int>::from_ints(starts.as_slice(), &self.device),
            end_positions:   Tensor::<B, 1, Int>::from_ints(ends.as_slice(), &self.device),
        }
    }
}

/// Concatenate one per-token field of every item, row after row.
fn flatten(items: &[EncodedExample], field: impl Fn(&EncodedExample) -> &[u32]) -> Vec<i32> {
    items
        .iter()
        .flat_map(|s| field(s).iter().map(|&x| x as i32))
        .collect()
}

// ─── Pools ────────────────────────────────────────────────────────────────────
/// Which slice of a dataset a batch source draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pool {
    /// Every example, reshuffled each epoch
    Full,
    /// A random permutation of the first half of the index range
    Half,
}

// ─── BatchSource ──────────────────────────────────────────────────────────────
/// A shuffled, fixed-size batch stream over a dataset.
pub struct BatchSource<B: Backend> {
    loader:     Arc<dyn DataLoader<SquadBatch<B>>>,
    num_items:  usize,
    batch_size: usize,
}

impl<B: Backend> BatchSource<B> {
    /// Build a reshuffling loader over `pool` of `dataset`.
    /// `num_workers == 0` keeps batching on the calling thread.
    pub fn new(
        dataset:     &SquadDataset,
        pool:        Pool,
        batch_size:  usize,
        num_workers: usize,
        device:      B::Device,
    ) -> Self {
        let seed: u64 = rand::random();

        let mut builder = DataLoaderBuilder::new(QaBatcher::<B>::new(device))
            .batch_size(batch_size)
            .shuffle(seed);
        if num_workers > 0 {
            builder = builder.num_workers(num_workers);
        }

        let (loader, num_items) = match pool {
            Pool::Full => (builder.build(dataset.clone()), dataset.len()),
            Pool::Half => {
                let half = dataset.len() / 2;
                let subset = PartialDataset::new(dataset.clone(), 0, half);
                (builder.build(subset), half)
            }
        };

        tracing::debug!(
            "Batch source: pool={:?} items={} batch_size={} seed={}",
            pool, num_items, batch_size, seed
        );

        Self { loader, num_items, batch_size }
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Nominal batches per epoch; the last one may be partial. With
    /// worker threads each worker's partition can end in its own partial
    /// batch, so an epoch may yield more.
    pub fn num_batches(&self) -> usize {
        self.num_items.div_ceil(self.batch_size)
    }

    /// Iterate one epoch in a fresh random order.
    pub fn iter(&self) -> Box<dyn DataLoaderIterator<SquadBatch<B>> + '_> {
        self.loader.iter()
    }
}
