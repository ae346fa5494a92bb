// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The collaborators of the rollout estimator and the training
// loop, expressed without any Burn types:
//
//   SequenceSampler  → generator (live policy or frozen snapshot)
//   RealismScorer    → discriminator
//   BatchObjective   → task objective with diversity penalty
//   LikelihoodOracle → reference policy used for monitoring
//
// Every stochastic call takes an explicit RNG handle so a run is
// reproducible from its seed.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use rand::rngs::StdRng;

use crate::domain::sequence::TokenSequence;

// ─── SequenceSampler ──────────────────────────────────────────────────────────
/// An autoregressive model that can sample fixed-length sequences.
pub trait SequenceSampler {
    /// MAX_LENGTH of every sequence this sampler produces.
    fn max_length(&self) -> usize;

    /// Keep the first `given` tokens of every prefix and sample the
    /// remaining `max_length - given` tokens.
    fn complete(
        &self,
        prefixes: &[TokenSequence],
        given:    usize,
        rng:      &mut StdRng,
    ) -> Result<Vec<TokenSequence>>;

    /// Sample `batch_size` sequences from the start token.
    fn generate(&self, batch_size: usize, rng: &mut StdRng) -> Result<Vec<TokenSequence>> {
        let empty = vec![Vec::new(); batch_size];
        self.complete(&empty, 0, rng)
    }
}

// ─── RealismScorer ────────────────────────────────────────────────────────────
/// A classifier that rates how "real" each sequence looks.
/// Scores are probabilities of the real class, in [0, 1].
pub trait RealismScorer {
    fn score(&self, batch: &[TokenSequence]) -> Result<Vec<f64>>;
}

// ─── BatchObjective ───────────────────────────────────────────────────────────
/// Task-specific reward over a batch. Never fails: sequences that
/// cannot be decoded get a sentinel score.
pub trait BatchObjective {
    fn batch_objective(&self, batch: &[TokenSequence]) -> Vec<f64>;
}

// ─── LikelihoodOracle ─────────────────────────────────────────────────────────
/// A fixed model that measures how natural a batch of sequences is.
pub trait LikelihoodOracle {
    /// Mean per-token negative log-likelihood of `batch`.
    fn average_negative_log_likelihood(&self, batch: &[TokenSequence]) -> Result<f64>;
}
