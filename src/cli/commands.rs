// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `sample`.
// Hyperparameters live in the experiment JSON file; the flags
// here only pick the file and override a few run-level values.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::ComputeBackend;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pretrain (or resume) and run the adversarial loop
    Train(TrainArgs),

    /// Sample sequences from a finished run's final generator
    Sample(SampleArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum BackendArg {
    /// CPU
    #[default]
    Ndarray,
    /// GPU through WebGPU
    Wgpu,
}

impl From<BackendArg> for ComputeBackend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Ndarray => ComputeBackend::NdArray,
            BackendArg::Wgpu => ComputeBackend::Wgpu,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Experiment JSON file (EXP_NAME, MAX_LENGTH, D_WEIGHT, ...)
    #[arg(long)]
    pub config: String,

    /// Override the experiment's random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override where checkpoints and the vocabulary are stored
    #[arg(long)]
    pub checkpoint_dir: Option<String>,

    #[arg(long, value_enum, default_value_t = BackendArg::Ndarray)]
    pub backend: BackendArg,
}

/// All arguments for the `sample` command
#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Experiment JSON file used for training
    #[arg(long)]
    pub config: String,

    /// Number of sequences to generate
    #[arg(long, default_value_t = 100)]
    pub count: usize,

    /// Override where checkpoints were saved during training
    #[arg(long)]
    pub checkpoint_dir: Option<String>,

    #[arg(long, value_enum, default_value_t = BackendArg::Ndarray)]
    pub backend: BackendArg,
}
