// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`  — pretrains and runs the adversarial loop for
//                 the experiment described in a JSON file
//   2. `sample` — prints sequences from a finished run
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, SampleArgs, TrainArgs};

use crate::application::config::ExperimentConfig;

#[derive(Parser, Debug)]
#[command(
    name = "objective-gan",
    version = "0.1.0",
    about = "Train a SeqGAN-style generator with rollout rewards, then sample from it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Sample(args) => run_sample(args),
        }
    }
}

/// Load the experiment file and apply the CLI overrides.
fn load_config(path: &str, seed: Option<u64>, checkpoint_dir: Option<String>) -> Result<ExperimentConfig> {
    let mut cfg = ExperimentConfig::load(path)?;
    if let Some(seed) = seed {
        cfg.seed = seed;
    }
    if let Some(dir) = checkpoint_dir {
        cfg.checkpoint_dir = dir;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let cfg = load_config(&args.config, args.seed, args.checkpoint_dir)?;
    tracing::info!("Starting experiment '{}' (seed {})", cfg.experiment_name, cfg.seed);

    let outcome = TrainUseCase::new(cfg).execute(args.backend.into())?;

    let best = outcome
        .best_test_loss
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "** FINISHED ** {} iterations{}, best test_loss {}. Results: {}",
        outcome.records.len(),
        if outcome.resumed { " (pretraining resumed from checkpoint)" } else { "" },
        best,
        outcome.results_path.display()
    );
    Ok(())
}

fn run_sample(args: SampleArgs) -> Result<()> {
    use crate::application::sample_use_case::SampleUseCase;

    let cfg = load_config(&args.config, None, args.checkpoint_dir)?;
    let report = SampleUseCase::new(cfg).execute(args.count, args.backend.into())?;

    for s in &report.sequences {
        println!("{s}");
    }
    eprintln!(
        "{} well-formed, {} rejected",
        report.sequences.len(),
        report.rejected
    );
    Ok(())
}
