// ============================================================
// Layer 4 — Batchers
// ============================================================
// Implements Burn's Batcher trait to turn host-side token
// sequences into tensors on the training device.
//
//   SequenceBatcher       Vec<TokenSequence>    → [N, L] Int
//   DiscriminatorBatcher  Vec<LabelledSequence> → [N, L] Int + [N] labels
//
// All sequences are pre-padded to MAX_LENGTH, so a batch is a
// flat row-major Vec reshaped to [N, L].
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::LabelledSequence;
use crate::domain::sequence::{flatten_ids, TokenSequence};

/// Stack equal-length sequences into an `[N, L]` Int tensor.
pub fn sequences_to_tensor<B: Backend>(
    batch:  &[TokenSequence],
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let rows = batch.len();
    let cols = batch.first().map(|s| s.len()).unwrap_or(0);
    Tensor::<B, 1, Int>::from_ints(flatten_ids(batch).as_slice(), device)
        .reshape([rows, cols])
}

// ─── SequenceBatch ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Token ids — shape: [batch_size, max_length]
    pub sequences: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TokenSequence, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<TokenSequence>) -> SequenceBatch<B> {
        SequenceBatch { sequences: sequences_to_tensor(&items, &self.device) }
    }
}

// ─── DiscriminatorBatch ───────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct DiscriminatorBatch<B: Backend> {
    /// Token ids — shape: [batch_size, max_length]
    pub sequences: Tensor<B, 2, Int>,

    /// Class indices — shape: [batch_size]; 1 = real, 0 = generated
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct DiscriminatorBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> DiscriminatorBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<LabelledSequence, DiscriminatorBatch<B>> for DiscriminatorBatcher<B> {
    fn batch(&self, items: Vec<LabelledSequence>) -> DiscriminatorBatch<B> {
        let labels: Vec<i32> = items.iter().map(|s| s.label.class_index() as i32).collect();
        let tokens: Vec<TokenSequence> = items.into_iter().map(|s| s.tokens).collect();

        DiscriminatorBatch {
            sequences: sequences_to_tensor(&tokens, &self.device),
            labels:    Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Label;
    use burn::backend::NdArray;

    #[test]
    fn test_sequence_batch_shape() {
        let batcher = SequenceBatcher::<NdArray>::new(Default::default());
        let batch = batcher.batch(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(batch.sequences.dims(), [2, 3]);
    }

    #[test]
    fn test_discriminator_batch_labels() {
        let batcher = DiscriminatorBatcher::<NdArray>::new(Default::default());
        let batch = batcher.batch(vec![
            LabelledSequence { tokens: vec![1, 2], label: Label::Real },
            LabelledSequence { tokens: vec![3, 4], label: Label::Generated },
        ]);
        assert_eq!(batch.sequences.dims(), [2, 2]);
        let labels: Vec<i64> = batch.labels.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(labels, vec![1, 0]);
    }
}
