// ============================================================
// Layer 5 — Rollout Reward Estimator
// ============================================================
// Scores partially generated sequences by finishing them many
// times with a frozen copy of the generator:
//
//   for t in 1..L:
//       prefixes   = first t tokens of every sequence, × R replicas
//       completed  = snapshot.complete(prefixes, t)        (sampling)
//       R[i, t-1]  = mean over replicas of blended(completed_i)
//   R[i, L-1]      = blended(sequence_i)                   (no rollout)
//
//   blended = classifier_score + objective_weight × objective_score
//
// All R replicas of a prefix length go through the snapshot and
// the classifier as one batch of B × R rows. The objective (and
// its diversity weighting) is applied per replica, i.e. on
// batches of B rows, so duplicate counting matches a single
// generator batch.
//
// The snapshot is an immutable value behind an Arc. update_params
// swaps in a new one; an estimate that already holds the old Arc
// keeps reading the old parameters to the end.

use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

use crate::domain::reward::{RewardBlend, RewardMatrix};
use crate::domain::sequence::{ensure_batch_shape, TokenSequence};
use crate::domain::traits::{BatchObjective, RealismScorer, SequenceSampler};

// ─── PolicySnapshot ───────────────────────────────────────────────────────────
/// Immutable copy of the generator's parameters used for rollouts.
pub struct PolicySnapshot<P> {
    policy:  Arc<P>,
    version: u64,
}

impl<P> PolicySnapshot<P> {
    pub fn new(policy: P) -> Self {
        Self { policy: Arc::new(policy), version: 0 }
    }

    /// Copy-on-update: readers holding the previous Arc are unaffected.
    pub fn replace(&mut self, policy: P) {
        self.policy = Arc::new(policy);
        self.version += 1;
    }

    pub fn share(&self) -> Arc<P> {
        Arc::clone(&self.policy)
    }

    /// Number of updates since construction.
    pub fn version(&self) -> u64 {
        self.version
    }
}

// ─── RolloutEstimator ─────────────────────────────────────────────────────────
pub struct RolloutEstimator<P: SequenceSampler> {
    snapshot: PolicySnapshot<P>,
}

impl<P: SequenceSampler> RolloutEstimator<P> {
    pub fn new(initial: P) -> Self {
        Self { snapshot: PolicySnapshot::new(initial) }
    }

    /// Install a fresh copy of the live generator's parameters.
    pub fn update_params(&mut self, policy: P) {
        self.snapshot.replace(policy);
        tracing::debug!("Rollout snapshot updated (version {})", self.snapshot.version());
    }

    pub fn snapshot(&self) -> Arc<P> {
        self.snapshot.share()
    }

    pub fn snapshot_version(&self) -> u64 {
        self.snapshot.version()
    }

    /// Monte-Carlo reward matrix for a batch of full sequences.
    ///
    /// `classifier` is None when the discriminator is disabled; its
    /// term then contributes nothing. Rollout sampling is seeded once
    /// per call from `rng`.
    pub fn estimate_rewards<C, O>(
        &self,
        sequences:        &[TokenSequence],
        rollout_count:    usize,
        classifier:       Option<&C>,
        objective:        &O,
        objective_weight: f64,
        rng:              &mut StdRng,
    ) -> Result<RewardMatrix>
    where
        C: RealismScorer,
        O: BatchObjective,
    {
        ensure!(rollout_count >= 1, "rollout_count must be at least 1, got {}", rollout_count);
        ensure!(
            objective_weight >= 0.0 && objective_weight.is_finite(),
            "objective_weight must be a finite value >= 0, got {}",
            objective_weight
        );

        let policy = self.snapshot.share();
        let max_length = policy.max_length();
        ensure_batch_shape(sequences, max_length)?;

        let blend = RewardBlend { use_classifier: classifier.is_some(), objective_weight };
        let batch = sequences.len();
        let mut rewards = RewardMatrix::zeros(batch, max_length);
        let mut rollout_rng = StdRng::seed_from_u64(rng.gen());

        // Row r * batch + i is replica r of sequence i.
        let replicated: Vec<TokenSequence> = (0..rollout_count)
            .flat_map(|_| sequences.iter().cloned())
            .collect();
        let scale = 1.0 / rollout_count as f64;

        for given in 1..max_length {
            let completed = policy.complete(&replicated, given, &mut rollout_rng)?;
            let scores = blended_scores(&completed, batch, classifier, objective, &blend)?;
            for (row, score) in scores.into_iter().enumerate() {
                rewards.add(row % batch, given - 1, score * scale);
            }
        }

        let direct = blended_scores(sequences, batch, classifier, objective, &blend)?;
        for (i, score) in direct.into_iter().enumerate() {
            rewards.set(i, max_length - 1, score);
        }

        tracing::debug!(
            "Rewards for {} sequences × {} steps ({} rollouts): mean {:.4}",
            batch,
            max_length,
            rollout_count,
            rewards.mean()
        );
        Ok(rewards)
    }
}

/// Blend classifier and objective scores for `rows`, where the
/// objective sees one `group`-sized chunk at a time.
fn blended_scores<C, O>(
    rows:       &[TokenSequence],
    group:      usize,
    classifier: Option<&C>,
    objective:  &O,
    blend:      &RewardBlend,
) -> Result<Vec<f64>>
where
    C: RealismScorer,
    O: BatchObjective,
{
    let realism = match classifier {
        Some(c) => c.score(rows)?,
        None => vec![0.0; rows.len()],
    };
    ensure!(realism.len() == rows.len(), "classifier returned {} scores for {} rows", realism.len(), rows.len());

    let task: Vec<f64> = if blend.objective_weight == 0.0 {
        vec![0.0; rows.len()]
    } else {
        rows.chunks(group).flat_map(|chunk| objective.batch_objective(chunk)).collect()
    };

    Ok(realism
        .into_iter()
        .zip(task)
        .map(|(r, o)| blend.combine(r, o))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::sequences_to_tensor;
    use crate::ml::generator::{GeneratorConfig, SequencePolicy};
    use burn::backend::{Autodiff, NdArray};

    struct ConstantClassifier(f64);

    impl RealismScorer for ConstantClassifier {
        fn score(&self, batch: &[TokenSequence]) -> Result<Vec<f64>> {
            Ok(vec![self.0; batch.len()])
        }
    }

    /// Fraction of tokens equal to 1: varies with the sampled suffix.
    struct OnesClassifier;

    impl RealismScorer for OnesClassifier {
        fn score(&self, batch: &[TokenSequence]) -> Result<Vec<f64>> {
            Ok(batch
                .iter()
                .map(|s| s.iter().filter(|&&t| t == 1).count() as f64 / s.len() as f64)
                .collect())
        }
    }

    struct ConstantObjective(f64);

    impl BatchObjective for ConstantObjective {
        fn batch_objective(&self, batch: &[TokenSequence]) -> Vec<f64> {
            vec![self.0; batch.len()]
        }
    }

    /// Counts how large each objective batch is.
    struct GroupSizeObjective;

    impl BatchObjective for GroupSizeObjective {
        fn batch_objective(&self, batch: &[TokenSequence]) -> Vec<f64> {
            vec![batch.len() as f64; batch.len()]
        }
    }

    fn generator(max_length: usize) -> crate::ml::generator::Generator<NdArray> {
        GeneratorConfig::new(4, max_length)
            .with_emb_dim(4)
            .with_hidden_dim(6)
            .init(&Default::default())
    }

    fn batch(estimator: &RolloutEstimator<crate::ml::generator::Generator<NdArray>>, n: usize, seed: u64) -> Vec<TokenSequence> {
        estimator.snapshot().generate(n, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_constant_classifier_gives_constant_matrix() {
        let estimator = RolloutEstimator::new(generator(10));
        let seqs = batch(&estimator, 4, 0);
        let rewards = estimator
            .estimate_rewards(
                &seqs,
                2,
                Some(&ConstantClassifier(0.5)),
                &ConstantObjective(1.0),
                0.0,
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap();

        assert_eq!(rewards.dims(), [4, 10]);
        assert!(rewards.values().iter().all(|&r| (r - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_same_seed_same_rewards() {
        let estimator = RolloutEstimator::new(generator(6));
        let seqs = batch(&estimator, 3, 2);
        let run = |seed| {
            estimator
                .estimate_rewards(
                    &seqs,
                    3,
                    Some(&OnesClassifier),
                    &ConstantObjective(0.0),
                    0.0,
                    &mut StdRng::seed_from_u64(seed),
                )
                .unwrap()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_last_column_is_direct_blended_score() {
        let estimator = RolloutEstimator::new(generator(6));
        let seqs = batch(&estimator, 3, 4);
        let rewards = estimator
            .estimate_rewards(
                &seqs,
                4,
                Some(&OnesClassifier),
                &ConstantObjective(0.2),
                0.5,
                &mut StdRng::seed_from_u64(5),
            )
            .unwrap();

        let direct = OnesClassifier.score(&seqs).unwrap();
        for (i, d) in direct.iter().enumerate() {
            assert!((rewards.get(i, 5) - (d + 0.5 * 0.2)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_without_classifier_only_objective_counts() {
        let estimator = RolloutEstimator::new(generator(5));
        let seqs = batch(&estimator, 2, 6);
        let rewards = estimator
            .estimate_rewards::<ConstantClassifier, _>(
                &seqs,
                2,
                None,
                &ConstantObjective(0.3),
                1.0,
                &mut StdRng::seed_from_u64(7),
            )
            .unwrap();
        assert!(rewards.values().iter().all(|&r| (r - 0.3).abs() < 1e-12));
    }

    #[test]
    fn test_objective_sees_one_batch_per_replica() {
        let estimator = RolloutEstimator::new(generator(4));
        let seqs = batch(&estimator, 3, 8);
        let rewards = estimator
            .estimate_rewards::<ConstantClassifier, _>(
                &seqs,
                5,
                None,
                &GroupSizeObjective,
                1.0,
                &mut StdRng::seed_from_u64(9),
            )
            .unwrap();
        assert!(rewards.values().iter().all(|&r| (r - 3.0).abs() < 1e-9));
    }

    #[test]
    fn test_zero_rollouts_is_rejected() {
        let estimator = RolloutEstimator::new(generator(4));
        let seqs = batch(&estimator, 2, 10);
        let result = estimator.estimate_rewards(
            &seqs,
            0,
            Some(&ConstantClassifier(0.5)),
            &ConstantObjective(0.0),
            0.0,
            &mut StdRng::seed_from_u64(11),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_sequence_length_is_rejected() {
        let estimator = RolloutEstimator::new(generator(4));
        let result = estimator.estimate_rewards(
            &[vec![1, 2, 3]],
            1,
            Some(&ConstantClassifier(0.5)),
            &ConstantObjective(0.0),
            0.0,
            &mut StdRng::seed_from_u64(12),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_update_params_installs_live_parameters() {
        let device = Default::default();
        let model = GeneratorConfig::new(4, 5)
            .with_emb_dim(4)
            .with_hidden_dim(6)
            .init::<Autodiff<NdArray>>(&device);
        let mut policy = SequencePolicy::new(model, 0.05, 5.0);
        let mut estimator = RolloutEstimator::new(policy.snapshot());

        let data = vec![vec![1, 2, 3, 3, 3], vec![2, 1, 3, 3, 3]];
        for _ in 0..3 {
            policy.pretrain_step(sequences_to_tensor(&data, &device));
        }
        let stale: Vec<f32> = estimator
            .snapshot()
            .token_log_probs(sequences_to_tensor(&data, &device))
            .into_data()
            .to_vec()
            .unwrap();

        estimator.update_params(policy.snapshot());
        assert_eq!(estimator.snapshot_version(), 1);

        let fresh: Vec<f32> = estimator
            .snapshot()
            .token_log_probs(sequences_to_tensor(&data, &device))
            .into_data()
            .to_vec()
            .unwrap();
        let live: Vec<f32> = policy
            .snapshot()
            .token_log_probs(sequences_to_tensor(&data, &device))
            .into_data()
            .to_vec()
            .unwrap();

        assert_eq!(fresh, live);
        assert_ne!(stale, live);
    }

    #[test]
    fn test_old_snapshot_survives_replacement() {
        let mut snapshot = PolicySnapshot::new(1u32);
        let held = snapshot.share();
        snapshot.replace(2);
        assert_eq!(*held, 1);
        assert_eq!(*snapshot.share(), 2);
    }
}
