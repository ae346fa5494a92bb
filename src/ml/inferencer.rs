// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Loads a trained generator from the final checkpoint and
// samples decoded sequences from it. Runs on a plain (non-
// autodiff) backend.
use anyhow::Result;
use burn::prelude::*;
use rand::rngs::StdRng;

use crate::application::config::ExperimentConfig;
use crate::domain::traits::SequenceSampler;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::{CheckpointKind, CheckpointManager, ModelRole};
use crate::ml::generator::{Generator, GeneratorConfig};

pub struct Inferencer<B: Backend> {
    model:      Generator<B>,
    vocab:      Vocabulary,
    batch_size: usize,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        cfg:          &ExperimentConfig,
        vocab:        Vocabulary,
        device:       &B::Device,
    ) -> Result<Self> {
        let model: Generator<B> = GeneratorConfig::new(vocab.len(), cfg.max_length)
            .with_emb_dim(cfg.emb_dim)
            .with_hidden_dim(cfg.hidden_dim)
            .with_start_token(vocab.start_token() as usize)
            .init(device);
        let model =
            ckpt_manager.load_module(model, CheckpointKind::Final, ModelRole::Generator, device)?;
        tracing::info!("Generator loaded from final checkpoint");
        Ok(Self { model, vocab, batch_size: cfg.batch_size })
    }

    /// Generate `count` sequences; returns the decoded well-formed ones
    /// and how many were rejected.
    pub fn sample(&self, count: usize, rng: &mut StdRng) -> Result<(Vec<String>, usize)> {
        let mut kept = Vec::with_capacity(count);
        let mut rejected = 0usize;
        let mut remaining = count;

        while remaining > 0 {
            let batch = self.model.generate(self.batch_size.min(remaining), rng)?;
            remaining -= batch.len();
            for seq in &batch {
                match self.vocab.decode(seq) {
                    Ok(s) if self.vocab.is_well_formed(&s) => kept.push(s),
                    _ => rejected += 1,
                }
            }
        }

        tracing::debug!("Sampled {} sequences, {} rejected", count, rejected);
        Ok((kept, rejected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::tests::tiny_config;
    use burn::backend::NdArray;
    use rand::SeedableRng;

    #[test]
    fn test_sample_from_saved_generator() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        let vocab = Vocabulary::build(&["CCO", "C(N)C"]);
        let device = Default::default();

        let trained: Generator<NdArray> = GeneratorConfig::new(vocab.len(), cfg.max_length)
            .with_emb_dim(cfg.emb_dim)
            .with_hidden_dim(cfg.hidden_dim)
            .init(&device);
        let manager = CheckpointManager::new(&cfg.checkpoint_dir, &cfg.experiment_name).unwrap();
        manager
            .save_module(&trained, CheckpointKind::Final, ModelRole::Generator)
            .unwrap();

        let inferencer =
            Inferencer::<NdArray>::from_checkpoint(&manager, &cfg, vocab, &device).unwrap();
        let (kept, rejected) = inferencer.sample(10, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(kept.len() + rejected, 10);
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        let manager = CheckpointManager::new(&cfg.checkpoint_dir, &cfg.experiment_name).unwrap();
        let vocab = Vocabulary::build(&["CCO"]);
        let result =
            Inferencer::<NdArray>::from_checkpoint(&manager, &cfg, vocab, &Default::default());
        assert!(result.is_err());
    }
}
