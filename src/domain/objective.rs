// ============================================================
// Layer 3 — Novelty Objective
// ============================================================
// Scores generated sequences by novelty against the training
// corpus, then applies the within-batch diversity penalty:
//
//   uniqueness_ratio = distinct decoded forms / batch size
//   weight_i         = uniqueness_ratio / count(d_i in batch)
//   score_i          = raw_objective(d_i) × weight_i
//
// count(d_i) is at least 1 because d_i always matches itself,
// so the division is safe by construction.
//
// Sequences that fail to decode, or decode to something that is
// not well-formed, receive INVALID_SCORE instead of an error.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::domain::sequence::TokenSequence;
use crate::domain::traits::BatchObjective;
use crate::domain::vocabulary::Vocabulary;

/// Sentinel score for undecodable or malformed sequences.
pub const INVALID_SCORE: f64 = 0.0;

/// Per-sequence diversity weights for a batch of decoded forms.
pub fn diversity_weights<T: Eq + Hash>(decoded: &[T]) -> Vec<f64> {
    if decoded.is_empty() {
        return Vec::new();
    }
    let mut counts: HashMap<&T, usize> = HashMap::new();
    for d in decoded {
        *counts.entry(d).or_insert(0) += 1;
    }
    let uniqueness = counts.len() as f64 / decoded.len() as f64;
    decoded
        .iter()
        .map(|d| {
            let count = counts[d];
            debug_assert!(count >= 1);
            uniqueness / count as f64
        })
        .collect()
}

// ─── ObjectiveSummary ─────────────────────────────────────────────────────────
/// Batch-level statistics recorded once per outer iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectiveSummary {
    pub valid_fraction:  f64,
    pub unique_fraction: f64,
    pub novel_fraction:  f64,
    pub objective_mean:  f64,
    pub objective_std:   f64,
    pub objective_min:   f64,
    pub objective_max:   f64,
}

// ─── NoveltyObjective ─────────────────────────────────────────────────────────
pub struct NoveltyObjective {
    vocab:    Vocabulary,
    training: HashSet<String>,
}

impl NoveltyObjective {
    pub fn new<S: AsRef<str>>(vocab: Vocabulary, training: &[S]) -> Self {
        let training = training.iter().map(|s| s.as_ref().to_string()).collect();
        Self { vocab, training }
    }

    /// Decode a sequence into a well-formed string, or None.
    pub fn decode_valid(&self, seq: &TokenSequence) -> Option<String> {
        self.vocab
            .decode(seq)
            .ok()
            .filter(|s| self.vocab.is_well_formed(s))
    }

    /// 1.0 for a well-formed sequence absent from the corpus,
    /// 0.0 for one already in it.
    pub fn raw_objective(&self, decoded: Option<&str>) -> f64 {
        match decoded {
            Some(s) if !self.training.contains(s) => 1.0,
            Some(_) => 0.0,
            None => INVALID_SCORE,
        }
    }

    pub fn summarize(&self, batch: &[TokenSequence]) -> ObjectiveSummary {
        if batch.is_empty() {
            return ObjectiveSummary::default();
        }
        let total = batch.len() as f64;
        let valid: Vec<String> = batch.iter().filter_map(|s| self.decode_valid(s)).collect();
        let unique: HashSet<&String> = valid.iter().collect();
        let scores: Vec<f64> = valid.iter().map(|s| self.raw_objective(Some(s.as_str()))).collect();
        let novel = scores.iter().filter(|&&v| v > 0.0).count();

        let mut summary = ObjectiveSummary {
            valid_fraction:  valid.len() as f64 / total,
            unique_fraction: unique.len() as f64 / total,
            novel_fraction:  novel as f64 / total,
            ..ObjectiveSummary::default()
        };
        if !scores.is_empty() {
            let n = scores.len() as f64;
            let mean = scores.iter().sum::<f64>() / n;
            let var = scores.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            summary.objective_mean = mean;
            summary.objective_std = var.sqrt();
            summary.objective_min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
            summary.objective_max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        }
        summary
    }
}

impl BatchObjective for NoveltyObjective {
    fn batch_objective(&self, batch: &[TokenSequence]) -> Vec<f64> {
        // Undecodable rows still take part in the duplicate count,
        // keyed by their raw ids.
        let decoded: Vec<Result<String, &TokenSequence>> = batch
            .iter()
            .map(|seq| self.vocab.decode(seq).map_err(|_| seq))
            .collect();
        let weights = diversity_weights(&decoded);

        decoded
            .iter()
            .zip(weights)
            .map(|(d, w)| {
                let valid = d.as_ref().ok().filter(|s| self.vocab.is_well_formed(s));
                self.raw_objective(valid.map(|s| s.as_str())) * w
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objective() -> (NoveltyObjective, Vocabulary) {
        let corpus = ["CCO", "CCN", "C(C)O"];
        let vocab = Vocabulary::build(&corpus);
        (NoveltyObjective::new(vocab.clone(), &corpus), vocab)
    }

    #[test]
    fn test_identical_batch_weights_are_one_over_batch_squared() {
        // ratio 1/4, each copy counted 4 times → (1/4) / 4
        let w = diversity_weights(&["a", "a", "a", "a"]);
        assert_eq!(w.len(), 4);
        assert!(w.iter().all(|&x| (x - 1.0 / 16.0).abs() < 1e-12));
    }

    #[test]
    fn test_distinct_batch_weights_are_one() {
        let w = diversity_weights(&["a", "b", "c", "d"]);
        assert!(w.iter().all(|&x| (x - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_mixed_batch_downweights_duplicates() {
        // 2 distinct out of 3 → ratio 2/3; "a" appears twice
        let w = diversity_weights(&["a", "a", "b"]);
        assert!((w[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((w[2] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_novel_sequences_score_one_and_known_score_zero() {
        let (obj, vocab) = objective();
        let batch = vec![vocab.encode("CCC", 6).unwrap(), vocab.encode("CCO", 6).unwrap()];
        assert_eq!(obj.batch_objective(&batch), vec![1.0, 0.0]);
    }

    #[test]
    fn test_repeated_novel_sequence_is_penalised() {
        let (obj, vocab) = objective();
        let s = vocab.encode("CCC", 6).unwrap();
        let batch = vec![s.clone(), s.clone(), s.clone(), s];
        assert!(obj.batch_objective(&batch).iter().all(|&x| (x - 1.0 / 16.0).abs() < 1e-12));
    }

    #[test]
    fn test_decode_failure_yields_sentinel() {
        let (obj, vocab) = objective();
        let batch = vec![vec![99, 1, 1], vocab.encode("CC", 3).unwrap()];
        let scores = obj.batch_objective(&batch);
        assert_eq!(scores[0], INVALID_SCORE);
        assert_eq!(scores[1], 1.0);
    }

    #[test]
    fn test_malformed_sequence_yields_sentinel() {
        let (obj, vocab) = objective();
        let batch = vec![vocab.encode("C(C", 6).unwrap()];
        assert_eq!(obj.batch_objective(&batch), vec![INVALID_SCORE]);
    }

    #[test]
    fn test_summary_fractions() {
        let (obj, vocab) = objective();
        let batch = vec![
            vocab.encode("CCC", 6).unwrap(),
            vocab.encode("CCC", 6).unwrap(),
            vocab.encode("CCO", 6).unwrap(),
            vocab.encode("C(", 6).unwrap(),
        ];
        let s = obj.summarize(&batch);
        assert_eq!(s.valid_fraction, 0.75);
        assert_eq!(s.unique_fraction, 0.5);
        assert_eq!(s.novel_fraction, 0.5);
        assert_eq!(s.objective_max, 1.0);
        assert_eq!(s.objective_min, 0.0);
    }
}
