// ============================================================
// Layer 4 — Discriminator Training Set
// ============================================================
// Builds the labelled set for one discriminator training call
// and splits it into shuffled minibatches.
//
//   positives (real corpus, subset)  ─┐
//                                     ├─► labelled set ─► epochs × minibatches
//   negatives (fresh generator output)┘
//
// Positives are sub-sampled to the number of negatives so both
// classes are balanced. Each epoch reshuffles the whole set; the
// last minibatch of an epoch may be short.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom with the
// caller's seeded RNG.
//
// Reference: rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom};

use crate::data::dataset::{Label, LabelledSequence};
use crate::domain::sequence::TokenSequence;

/// Combine `positives` and `negatives` into one shuffled labelled set
/// with equal class counts.
pub fn build_labelled_set(
    positives: &[TokenSequence],
    negatives: Vec<TokenSequence>,
    rng:       &mut StdRng,
) -> Vec<LabelledSequence> {
    let count = positives.len().min(negatives.len());

    let mut set: Vec<LabelledSequence> = positives
        .choose_multiple(rng, count)
        .map(|tokens| LabelledSequence { tokens: tokens.clone(), label: Label::Real })
        .chain(
            negatives
                .into_iter()
                .take(count)
                .map(|tokens| LabelledSequence { tokens, label: Label::Generated }),
        )
        .collect();

    set.shuffle(rng);
    set
}

/// Minibatches for `epochs` passes over `set`, reshuffled per pass.
pub fn epoch_batches<T: Clone>(
    set:        &[T],
    batch_size: usize,
    epochs:     usize,
    rng:        &mut StdRng,
) -> Vec<Vec<T>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::new();
    let mut order: Vec<T> = set.to_vec();

    for _ in 0..epochs {
        order.shuffle(rng);
        batches.extend(order.chunks(batch_size).map(|c| c.to_vec()));
    }

    tracing::debug!(
        "Discriminator set: {} items → {} minibatches over {} epochs",
        set.len(),
        batches.len(),
        epochs
    );
    batches
}
