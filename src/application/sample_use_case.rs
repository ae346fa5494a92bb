// ============================================================
// Layer 2 — SampleUseCase
// ============================================================
// Loads the final generator of a finished run together with
// its saved vocabulary and draws decoded samples from it.
//
// Model shapes come from the config saved next to the
// checkpoint, so a later edit of the experiment file cannot
// break loading. Only the seed is taken from the caller.

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::config::ExperimentConfig;
use crate::application::train_use_case::ComputeBackend;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::inferencer::Inferencer;

#[derive(Debug, Clone)]
pub struct SampleReport {
    /// Decoded, well-formed sequences
    pub sequences: Vec<String>,
    pub rejected:  usize,
}

pub struct SampleUseCase {
    config: ExperimentConfig,
}

impl SampleUseCase {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, count: usize, backend: ComputeBackend) -> Result<SampleReport> {
        match backend {
            ComputeBackend::NdArray => self.execute_on::<NdArray>(count, &NdArrayDevice::Cpu),
            ComputeBackend::Wgpu => self.execute_on::<Wgpu>(count, &WgpuDevice::default()),
        }
    }

    pub fn execute_on<B: Backend>(&self, count: usize, device: &B::Device) -> Result<SampleReport> {
        let cfg = &self.config;
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir, &cfg.experiment_name)?;
        let trained = ckpt_manager.load_config()?;
        if (trained.max_length, trained.emb_dim, trained.hidden_dim)
            != (cfg.max_length, cfg.emb_dim, cfg.hidden_dim)
        {
            tracing::warn!(
                "Experiment file differs from the trained run; using the saved model shape \
                 (max_length={}, emb={}, hidden={})",
                trained.max_length,
                trained.emb_dim,
                trained.hidden_dim
            );
        }
        let vocab = VocabStore::new(&cfg.checkpoint_dir, &cfg.experiment_name).load()?;

        let inferencer = Inferencer::<B>::from_checkpoint(&ckpt_manager, &trained, vocab, device)?;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let (sequences, rejected) = inferencer.sample(count, &mut rng)?;

        tracing::info!("{} of {} samples are well-formed", sequences.len(), count);
        Ok(SampleReport { sequences, rejected })
    }
}
