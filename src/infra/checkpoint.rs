// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder,
// keyed by experiment name.
//
// Two checkpoint kinds:
//   pretrain — written once pretraining finishes; its presence
//              makes the next run skip both pretraining phases
//   final    — written when the adversarial loop finishes
//
// File naming convention:
//   checkpoints/
//     novelty_pretrain_generator.mpk
//     novelty_pretrain_discriminator.mpk   ← only when D_WEIGHT > 0
//     novelty_pretrain_reference.mpk
//     novelty_final_generator.mpk
//     novelty_final_discriminator.mpk
//     novelty_config.json                  ← experiment config
//
// CompactRecorder serialises to half-precision MessagePack.
// Loading fails if the architecture doesn't match. A pretrain
// set that is unreadable or only partly present is an error,
// never a reason to retrain.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{anyhow, bail, Context, Result};
use burn::{prelude::*, record::CompactRecorder};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::config::ExperimentConfig;

/// Extension CompactRecorder appends to every record path.
const RECORD_EXTENSION: &str = "mpk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    Pretrain,
    Final,
}

impl CheckpointKind {
    fn as_str(self) -> &'static str {
        match self {
            CheckpointKind::Pretrain => "pretrain",
            CheckpointKind::Final => "final",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Generator,
    Discriminator,
    Reference,
}

impl ModelRole {
    fn as_str(self) -> &'static str {
        match self {
            ModelRole::Generator => "generator",
            ModelRole::Discriminator => "discriminator",
            ModelRole::Reference => "reference",
        }
    }
}

pub struct CheckpointManager {
    dir:      PathBuf,
    exp_name: String,
}

impl CheckpointManager {
    pub fn new(dir: impl AsRef<Path>, exp_name: impl Into<String>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir, exp_name: exp_name.into() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path without extension; the recorder appends `.mpk`.
    fn stem(&self, kind: CheckpointKind, role: ModelRole) -> PathBuf {
        self.dir
            .join(format!("{}_{}_{}", self.exp_name, kind.as_str(), role.as_str()))
    }

    pub fn exists(&self, kind: CheckpointKind, role: ModelRole) -> bool {
        self.stem(kind, role).with_extension(RECORD_EXTENSION).exists()
    }

    /// Whether the run should resume from a pretrain checkpoint.
    ///
    /// Ok(false) when no pretrain record exists for the experiment,
    /// Ok(true) when every role the run needs is present. Any other
    /// mix is an error naming the missing roles.
    pub fn has_pretrain(&self, with_discriminator: bool) -> Result<bool> {
        let kind = CheckpointKind::Pretrain;
        let all = [ModelRole::Generator, ModelRole::Reference, ModelRole::Discriminator];
        if !all.iter().any(|&role| self.exists(kind, role)) {
            return Ok(false);
        }

        let missing: Vec<&str> = all
            .iter()
            .filter(|&&role| with_discriminator || role != ModelRole::Discriminator)
            .filter(|&&role| !self.exists(kind, role))
            .map(|role| role.as_str())
            .collect();
        if !missing.is_empty() {
            bail!(
                "Pretrain checkpoint for '{}' in '{}' is incomplete (missing: {}). \
                 Restore the files or remove the pretrain set to pretrain again.",
                self.exp_name,
                self.dir.display(),
                missing.join(", ")
            );
        }
        Ok(true)
    }

    pub fn save_module<B: Backend, M: Module<B>>(
        &self,
        module: &M,
        kind:   CheckpointKind,
        role:   ModelRole,
    ) -> Result<()> {
        let path = self.stem(kind, role);
        module
            .clone()
            .save_file(path.clone(), &CompactRecorder::new())
            .map_err(|e| anyhow!("Failed to save checkpoint to '{}': {e:?}", path.display()))?;
        tracing::debug!("Saved {} {} checkpoint", kind.as_str(), role.as_str());
        Ok(())
    }

    /// Restore weights into `module`, which must have the saved architecture.
    pub fn load_module<B: Backend, M: Module<B>>(
        &self,
        module: M,
        kind:   CheckpointKind,
        role:   ModelRole,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.stem(kind, role);
        let module = module
            .load_file(path.clone(), &CompactRecorder::new(), device)
            .map_err(|e| {
                anyhow!(
                    "Cannot load checkpoint '{}.{RECORD_EXTENSION}': {e:?}",
                    path.display()
                )
            })?;
        tracing::info!("Loaded {} {} checkpoint", kind.as_str(), role.as_str());
        Ok(module)
    }

    pub fn save_config(&self, cfg: &ExperimentConfig) -> Result<()> {
        let path = self.dir.join(format!("{}_config.json", self.exp_name));
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved experiment config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<ExperimentConfig> {
        let path = self.dir.join(format!("{}_config.json", self.exp_name));
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Has '{}' been trained?",
                path.display(),
                self.exp_name
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}
