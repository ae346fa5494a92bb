// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the corpus file        (Layer 4 - data)
//   Step 2: Build / load vocabulary     (Layer 6 - infra)
//   Step 3: Filter + encode positives   (Layer 4 - data)
//   Step 4: Build the novelty objective (Layer 3 - domain)
//   Step 5: Run the GAN phases          (Layer 5 - ml)
//
// The compute backend is picked here; everything below is
// generic over it.
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    tensor::backend::AutodiffBackend,
};

use crate::application::config::ExperimentConfig;
use crate::data::loader::{Corpus, CorpusLoader};
use crate::domain::objective::NoveltyObjective;
use crate::infra::vocab_store::VocabStore;
use crate::ml::trainer::{GanTrainer, TrainingOutcome};

type NdArrayTrain = Autodiff<NdArray>;
type WgpuTrain    = Autodiff<Wgpu>;

/// Which Burn backend runs the tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputeBackend {
    #[default]
    NdArray,
    Wgpu,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: ExperimentConfig,
}

impl TrainUseCase {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, backend: ComputeBackend) -> Result<TrainingOutcome> {
        match backend {
            ComputeBackend::NdArray => {
                tracing::info!("Using NdArray (CPU) backend");
                self.execute_on::<NdArrayTrain>(NdArrayDevice::Cpu)
            }
            ComputeBackend::Wgpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                self.execute_on::<WgpuTrain>(device)
            }
        }
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainingOutcome> {
        let cfg = &self.config;

        // ── Step 1: Load the corpus ───────────────────────────────────────────
        let raw = CorpusLoader::new(&cfg.train_file).load_raw()?;

        // ── Step 2: Vocabulary over every raw entry ───────────────────────────
        // Entries dropped in step 3 still contribute their symbols.
        let vocab = VocabStore::new(&cfg.checkpoint_dir, &cfg.experiment_name)
            .load_or_build(&raw)?;

        // ── Step 3: Positive set ──────────────────────────────────────────────
        let corpus = Corpus::prepare(raw, &vocab, cfg.max_length)?;
        tracing::info!(
            "Positives: {} of {} entries (longest entry {} symbols, MAX_LENGTH {})",
            corpus.positives.len(),
            corpus.raw.len(),
            corpus.data_length(),
            cfg.max_length
        );

        // ── Step 4: Objective ─────────────────────────────────────────────────
        let objective = NoveltyObjective::new(vocab.clone(), &corpus.raw);
        let blend = cfg.reward_blend();
        tracing::info!(
            "Reward = {}{:.3} × novelty",
            if blend.use_classifier { "D + " } else { "" },
            blend.objective_weight
        );

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let trainer = GanTrainer::<B>::new(cfg.clone(), corpus, objective, &vocab, device)?;
        let outcome = trainer.run()?;

        tracing::info!("Training complete!");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::tests::tiny_config;
    use std::fs;

    #[test]
    fn test_execute_on_ndarray() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        fs::write(&cfg.train_file, "CCO\nCC(C)O\nC1CC1\n# comment\nCN\nCCCCCCCCCCCC\n").unwrap();

        let outcome = TrainUseCase::new(cfg.clone()).execute(ComputeBackend::NdArray).unwrap();
        assert_eq!(outcome.records.len(), cfg.total_batch);
        assert!(dir.path().join("checkpoints").join("tiny_vocab.json").exists());
    }

    #[test]
    fn test_missing_corpus_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        assert!(TrainUseCase::new(cfg).execute(ComputeBackend::NdArray).is_err());
    }
}
