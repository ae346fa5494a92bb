use burn::data::dataset::Dataset;

use crate::domain::sequence::TokenSequence;

/// A token sequence paired with its discriminator label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledSequence {
    pub tokens: TokenSequence,
    pub label:  Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Generated = 0,
    Real      = 1,
}

impl Label {
    pub fn class_index(self) -> usize {
        self as usize
    }
}

/// Fixed-length sequences for maximum-likelihood pretraining.
pub struct SequenceDataset {
    sequences: Vec<TokenSequence>,
}

impl SequenceDataset {
    pub fn new(sequences: Vec<TokenSequence>) -> Self { Self { sequences } }
}

impl Dataset<TokenSequence> for SequenceDataset {
    fn get(&self, index: usize) -> Option<TokenSequence> {
        self.sequences.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.sequences.len()
    }
}
