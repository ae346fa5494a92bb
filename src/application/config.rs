// ============================================================
// Layer 2 — Experiment Configuration
// ============================================================
// All hyperparameters for one adversarial training run.
// Read once from a JSON file at startup, validated, and then
// passed by reference to every component that needs it.
//
// The legacy upper-case keys (EXP_NAME, G_STEPS, D_WEIGHT, ...)
// are accepted as aliases so existing experiment files load
// unchanged.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::domain::reward::RewardBlend;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    // ── Run identity and corpus ─────────────────────────────────────────────
    #[serde(alias = "EXP_NAME")]
    pub experiment_name: String,

    #[serde(alias = "TRAIN_FILE")]
    pub train_file: String,

    #[serde(alias = "SEED")]
    pub seed: u64,

    #[serde(alias = "MAX_LENGTH")]
    pub max_length: usize,

    #[serde(alias = "BATCH_SIZE")]
    pub batch_size: usize,

    // ── Schedule ────────────────────────────────────────────────────────────
    /// Maximum-likelihood pretraining epochs for the generator
    #[serde(alias = "G_PRETRAIN_STEPS")]
    pub g_pretrain_epochs: usize,

    /// Policy-gradient steps per outer iteration
    #[serde(alias = "G_STEPS")]
    pub g_steps: usize,

    /// Outer adversarial iterations
    #[serde(alias = "TOTAL_BATCH")]
    pub total_batch: usize,

    /// Discriminator training rounds during pretraining
    #[serde(alias = "D_PRETRAIN_STEPS")]
    pub d_pretrain_epochs: usize,

    /// Adversarial pressure; 0 disables the discriminator entirely
    #[serde(alias = "D_WEIGHT")]
    pub discriminator_weight: f64,

    // ── Generator ───────────────────────────────────────────────────────────
    #[serde(default = "default_emb_dim")]
    pub emb_dim: usize,
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,
    #[serde(default = "default_generator_lr")]
    pub generator_lr: f64,
    #[serde(default = "default_grad_clip")]
    pub grad_clip: f32,

    // ── Rewards and evaluation ──────────────────────────────────────────────
    #[serde(default = "default_rollout_num")]
    pub rollout_num: usize,
    /// Explicit λ in `classifier + λ·objective`; derived from the
    /// discriminator weight when absent
    #[serde(default)]
    pub objective_weight: Option<f64>,
    #[serde(default = "default_sample_num")]
    pub sample_num: usize,
    #[serde(default = "default_big_sample_factor")]
    pub big_sample_factor: usize,
    #[serde(default = "default_one")]
    pub eval_every: usize,
    #[serde(default = "default_big_eval_every")]
    pub big_eval_every: usize,

    // ── Discriminator ───────────────────────────────────────────────────────
    #[serde(default = "default_dis_batch_size")]
    pub dis_batch_size: usize,
    #[serde(default = "default_dis_num_epochs")]
    pub dis_num_epochs: usize,
    #[serde(default = "default_dis_embedding_dim")]
    pub dis_embedding_dim: usize,
    #[serde(default = "default_dis_filter_sizes")]
    pub dis_filter_sizes: Vec<usize>,
    #[serde(default = "default_dis_num_filters")]
    pub dis_num_filters: Vec<usize>,
    #[serde(default = "default_dis_dropout")]
    pub dis_dropout: f64,
    #[serde(default = "default_dis_l2_reg_lambda")]
    pub dis_l2_reg_lambda: f64,
    #[serde(default = "default_dis_lr")]
    pub dis_lr: f64,

    // ── Persistence ─────────────────────────────────────────────────────────
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: String,
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    #[serde(default = "default_results_flush_every")]
    pub results_flush_every: usize,
}

fn default_emb_dim() -> usize { 32 }
fn default_hidden_dim() -> usize { 32 }
fn default_generator_lr() -> f64 { 0.002 }
fn default_grad_clip() -> f32 { 5.0 }
fn default_rollout_num() -> usize { 16 }
fn default_sample_num() -> usize { 6400 }
fn default_big_sample_factor() -> usize { 10 }
fn default_one() -> usize { 1 }
fn default_big_eval_every() -> usize { 10 }
fn default_dis_batch_size() -> usize { 64 }
fn default_dis_num_epochs() -> usize { 3 }
fn default_dis_embedding_dim() -> usize { 64 }
fn default_dis_filter_sizes() -> Vec<usize> { vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 15, 20] }
fn default_dis_num_filters() -> Vec<usize> {
    vec![100, 200, 200, 200, 200, 100, 100, 100, 100, 100, 160, 160]
}
fn default_dis_dropout() -> f64 { 0.25 }
fn default_dis_l2_reg_lambda() -> f64 { 0.2 }
fn default_dis_lr() -> f64 { 1e-4 }
fn default_checkpoint_dir() -> String { "checkpoints".to_string() }
fn default_results_dir() -> String { ".".to_string() }
fn default_results_flush_every() -> usize { 20 }

impl ExperimentConfig {
    /// Read and validate a JSON experiment file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.experiment_name.trim().is_empty(), "experiment_name is empty");
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(self.max_length >= 2, "max_length must be at least 2");
        ensure!(self.rollout_num >= 1, "rollout_num must be at least 1");
        ensure!(self.sample_num > 0, "sample_num must be at least 1");
        ensure!(self.big_sample_factor > 0, "big_sample_factor must be at least 1");
        ensure!(
            self.discriminator_weight >= 0.0 && self.discriminator_weight.is_finite(),
            "discriminator_weight must be a finite value >= 0"
        );
        if let Some(w) = self.objective_weight {
            ensure!(w >= 0.0 && w.is_finite(), "objective_weight must be a finite value >= 0");
        }
        ensure!(
            self.dis_filter_sizes.len() == self.dis_num_filters.len(),
            "dis_filter_sizes and dis_num_filters have different lengths ({} vs {})",
            self.dis_filter_sizes.len(),
            self.dis_num_filters.len()
        );
        ensure!(
            self.dis_filter_sizes.iter().any(|&k| k >= 1 && k <= self.max_length),
            "no discriminator filter fits sequences of length {}",
            self.max_length
        );
        ensure!(self.dis_batch_size > 0, "dis_batch_size must be at least 1");
        ensure!(self.dis_num_epochs > 0, "dis_num_epochs must be at least 1");
        ensure!(self.eval_every > 0 && self.big_eval_every > 0, "evaluation periods must be >= 1");
        ensure!(self.results_flush_every > 0, "results_flush_every must be >= 1");
        Ok(())
    }

    /// D = max(5 × discriminator_weight, 1) discriminator rounds per
    /// outer iteration. Callers skip the rounds entirely when the
    /// discriminator is disabled.
    pub fn discriminator_steps(&self) -> usize {
        ((5.0 * self.discriminator_weight) as usize).max(1)
    }

    pub fn discriminator_enabled(&self) -> bool {
        self.discriminator_weight != 0.0
    }

    pub fn reward_blend(&self) -> RewardBlend {
        RewardBlend::from_discriminator_weight(self.discriminator_weight, self.objective_weight)
    }

    pub fn big_sample_num(&self) -> usize {
        self.sample_num * self.big_sample_factor
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn tiny_config(dir: &Path) -> ExperimentConfig {
        ExperimentConfig {
            experiment_name: "tiny".to_string(),
            train_file: dir.join("train.txt").display().to_string(),
            seed: 7,
            max_length: 8,
            batch_size: 4,
            g_pretrain_epochs: 2,
            g_steps: 1,
            total_batch: 2,
            d_pretrain_epochs: 1,
            discriminator_weight: 0.5,
            emb_dim: 8,
            hidden_dim: 8,
            generator_lr: default_generator_lr(),
            grad_clip: default_grad_clip(),
            rollout_num: 2,
            objective_weight: None,
            sample_num: 8,
            big_sample_factor: 2,
            eval_every: 1,
            big_eval_every: 10,
            dis_batch_size: 4,
            dis_num_epochs: 1,
            dis_embedding_dim: 8,
            dis_filter_sizes: vec![1, 2, 3],
            dis_num_filters: vec![4, 4, 4],
            dis_dropout: 0.25,
            dis_l2_reg_lambda: 0.2,
            dis_lr: 1e-3,
            checkpoint_dir: dir.join("checkpoints").display().to_string(),
            results_dir: dir.display().to_string(),
            results_flush_every: 1,
        }
    }

    #[test]
    fn test_legacy_keys_are_accepted() {
        let json = r#"{
            "EXP_NAME": "novelty", "TRAIN_FILE": "train.smi", "SEED": 42,
            "MAX_LENGTH": 60, "BATCH_SIZE": 64, "G_PRETRAIN_STEPS": 100,
            "G_STEPS": 1, "TOTAL_BATCH": 200, "D_PRETRAIN_STEPS": 50,
            "D_WEIGHT": 0.5
        }"#;
        let cfg: ExperimentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.experiment_name, "novelty");
        assert_eq!(cfg.rollout_num, 16);
        assert_eq!(cfg.dis_filter_sizes.len(), cfg.dis_num_filters.len());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_discriminator_steps_formula() {
        let dir = Path::new(".");
        let mut cfg = tiny_config(dir);
        cfg.discriminator_weight = 0.0;
        assert_eq!(cfg.discriminator_steps(), 1);
        assert!(!cfg.discriminator_enabled());
        cfg.discriminator_weight = 0.5;
        assert_eq!(cfg.discriminator_steps(), 2);
        cfg.discriminator_weight = 1.0;
        assert_eq!(cfg.discriminator_steps(), 5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let dir = Path::new(".");
        let mut cfg = tiny_config(dir);
        cfg.rollout_num = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = tiny_config(dir);
        cfg.dis_num_filters.pop();
        assert!(cfg.validate().is_err());

        let mut cfg = tiny_config(dir);
        cfg.discriminator_weight = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = tiny_config(dir);
        cfg.dis_filter_sizes = vec![20, 30, 40];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_evaluation_samples() {
        let dir = Path::new(".");
        let mut cfg = tiny_config(dir);
        cfg.sample_num = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = tiny_config(dir);
        cfg.big_sample_factor = 0;
        assert!(cfg.validate().is_err());
    }
}
