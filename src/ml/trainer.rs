// ============================================================
// Layer 5 — Adversarial Training Loop
// ============================================================
// GanTrainer drives one experiment through its phases:
//
//   Uninitialized
//     │  pretrain checkpoint present? ───────────────┐
//     ▼                                              │
//   PretrainingGenerator      (MLE epochs, eval /5)  │
//     ▼                                              │
//   EvaluatingPretrain        (reference NLL)        │
//     ▼                                              │
//   PretrainingDiscriminator  (→ pretrain ckpt)      │
//     ▼                                              │
//   AdversarialLoop  ◄───────────────────────────────┘
//     ▼
//   Finished                  (results + final ckpt)
//
// One outer iteration of the adversarial loop:
//   (a) evaluate against the reference (bigger sample every
//       big_eval_every iterations and on the last one)
//   (b) g_steps × { sample → rollout rewards → REINFORCE step }
//   (c) rollout.update_params(generator snapshot)
//   (d) D discriminator rounds, D = max(5 × D_WEIGHT, 1);
//       skipped entirely when D_WEIGHT = 0
//   (e) summary statistics on the last policy-gradient batch
//   (f) flush the results CSV every results_flush_every iterations
//
// Key Burn insight (as in the pretraining loop):
//   - training runs on B (an AutodiffBackend)
//   - rollouts, scoring and evaluation run on B::InnerBackend
//     copies obtained with .valid(), so no graph is recorded
//
// Reference: Burn Book §5, Yu et al. (2017) SeqGAN

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;

use crate::application::config::ExperimentConfig;
use crate::data::{
    batcher::SequenceBatcher,
    dataset::SequenceDataset,
    loader::Corpus,
};
use crate::domain::{
    objective::NoveltyObjective,
    record::{DiscriminatorStep, ResultRecord},
    reward::RewardBlend,
    sequence::TokenSequence,
    vocabulary::Vocabulary,
};
use crate::infra::{
    checkpoint::{CheckpointKind, CheckpointManager, ModelRole},
    metrics::ResultsWriter,
};
use crate::ml::{
    discriminator::{Discriminator, TextCnn, TextCnnConfig},
    generator::{Generator, GeneratorConfig, SequencePolicy},
    reference::ReferencePolicy,
    rollout::RolloutEstimator,
};

/// Generator pretraining evaluates every this many epochs.
const PRETRAIN_EVAL_EVERY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    PretrainingGenerator,
    EvaluatingPretrain,
    PretrainingDiscriminator,
    AdversarialLoop,
    Finished,
}

/// What a finished run hands back to the application layer.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub records:        Vec<ResultRecord>,
    pub best_test_loss: Option<f64>,
    pub resumed:        bool,
    /// Reference evaluations run, pretraining included
    pub evaluations:    usize,
    pub results_path:   PathBuf,
}

pub struct GanTrainer<B: AutodiffBackend> {
    cfg:            ExperimentConfig,
    device:         B::Device,
    positives:      Vec<TokenSequence>,
    objective:      NoveltyObjective,
    blend:          RewardBlend,
    generator:      SequencePolicy<B>,
    discriminator:  Option<Discriminator<B>>,
    reference:      ReferencePolicy<B::InnerBackend>,
    rollout:        RolloutEstimator<Generator<B::InnerBackend>>,
    checkpoints:    CheckpointManager,
    results:        ResultsWriter,
    rng:            StdRng,
    phase:          Phase,
    best_test_loss: Option<f64>,
    evaluations:    usize,
    records:        Vec<ResultRecord>,
}

impl<B: AutodiffBackend> GanTrainer<B> {
    /// Build every model from `cfg`. Weights are drawn from the
    /// backend RNG seeded with `cfg.seed`; nothing is trained yet.
    pub fn new(
        cfg:       ExperimentConfig,
        corpus:    Corpus,
        objective: NoveltyObjective,
        vocab:     &Vocabulary,
        device:    B::Device,
    ) -> Result<Self> {
        cfg.validate()?;
        B::seed(cfg.seed);

        let vocab_len = vocab.len();
        let gen_cfg = GeneratorConfig::new(vocab_len, cfg.max_length)
            .with_emb_dim(cfg.emb_dim)
            .with_hidden_dim(cfg.hidden_dim)
            .with_start_token(vocab.start_token() as usize);
        let generator = SequencePolicy::new(
            gen_cfg.init::<B>(&device),
            cfg.generator_lr,
            cfg.grad_clip,
        );
        let reference = ReferencePolicy::new(gen_cfg.init::<B::InnerBackend>(&device));

        let discriminator = if cfg.discriminator_enabled() {
            let cnn: TextCnn<B> = discriminator_config(&cfg, vocab_len).init(&device);
            Some(Discriminator::new(cnn, cfg.dis_lr, cfg.dis_l2_reg_lambda, cfg.max_length))
        } else {
            None
        };

        let rollout = RolloutEstimator::new(generator.snapshot());
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir, &cfg.experiment_name)?;
        let results = ResultsWriter::new(&cfg.results_dir, &cfg.experiment_name)?;

        tracing::info!(
            "Models ready: vocab={}, max_length={}, emb={}, hidden={}, discriminator={}",
            vocab_len,
            cfg.max_length,
            cfg.emb_dim,
            cfg.hidden_dim,
            if discriminator.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            blend: cfg.reward_blend(),
            rng: StdRng::seed_from_u64(cfg.seed),
            positives: corpus.positives,
            cfg,
            device,
            objective,
            generator,
            discriminator,
            reference,
            rollout,
            checkpoints,
            results,
            phase: Phase::Uninitialized,
            best_test_loss: None,
            evaluations: 0,
            records: Vec::new(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generator(&self) -> &SequencePolicy<B> {
        &self.generator
    }

    fn transition(&mut self, next: Phase) {
        tracing::info!("Phase {:?} → {:?}", self.phase, next);
        self.phase = next;
    }

    /// Run the experiment to completion.
    pub fn run(mut self) -> Result<TrainingOutcome> {
        let resumed = self
            .checkpoints
            .has_pretrain(self.discriminator.is_some())?;

        if resumed {
            self.restore_pretrain()?;
        } else {
            self.pretrain_generator()?;
            self.evaluate_pretrain()?;
            self.pretrain_discriminator()?;
            self.save_pretrain()?;
        }

        self.adversarial_loop()?;
        self.finish()?;

        Ok(TrainingOutcome {
            records:        self.records,
            best_test_loss: self.best_test_loss,
            resumed,
            evaluations:    self.evaluations,
            results_path:   self.results.csv_path().to_path_buf(),
        })
    }

    // ── Pretraining ───────────────────────────────────────────────────────────

    fn pretrain_generator(&mut self) -> Result<()> {
        self.transition(Phase::PretrainingGenerator);

        let batcher = SequenceBatcher::<B>::new(self.device.clone());
        let loader = DataLoaderBuilder::new(batcher)
            .batch_size(self.cfg.batch_size)
            .shuffle(self.cfg.seed)
            .num_workers(1)
            .build(SequenceDataset::new(self.positives.clone()));

        for epoch in 0..self.cfg.g_pretrain_epochs {
            let mut loss_sum = 0.0f64;
            let mut batches = 0usize;
            for batch in loader.iter() {
                loss_sum += self.generator.pretrain_step(batch.sequences);
                batches += 1;
            }
            let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };

            if is_due(epoch, PRETRAIN_EVAL_EVERY) {
                let test_loss = self.evaluate(self.cfg.sample_num)?;
                tracing::info!(
                    "Pretrain epoch {:>3}/{} | train_loss={:.4} | test_loss={:.4}",
                    epoch + 1,
                    self.cfg.g_pretrain_epochs,
                    train_loss,
                    test_loss
                );
            } else {
                tracing::info!(
                    "Pretrain epoch {:>3}/{} | train_loss={:.4}",
                    epoch + 1,
                    self.cfg.g_pretrain_epochs,
                    train_loss
                );
            }
        }
        Ok(())
    }

    fn evaluate_pretrain(&mut self) -> Result<()> {
        self.transition(Phase::EvaluatingPretrain);
        let test_loss = self.evaluate(self.cfg.sample_num)?;
        tracing::info!("Pretrained generator test_loss={:.4}", test_loss);
        Ok(())
    }

    fn pretrain_discriminator(&mut self) -> Result<()> {
        self.transition(Phase::PretrainingDiscriminator);
        if self.discriminator.is_none() {
            tracing::info!("Discriminator disabled (D_WEIGHT = 0); skipping");
            return Ok(());
        }
        for round in 0..self.cfg.d_pretrain_epochs {
            if let Some(step) = self.train_discriminator()? {
                tracing::info!(
                    "D pretrain {:>3}/{} | loss={:.4} | accuracy={:.3}",
                    round + 1,
                    self.cfg.d_pretrain_epochs,
                    step.loss,
                    step.accuracy
                );
            }
        }
        Ok(())
    }

    fn save_pretrain(&self) -> Result<()> {
        let kind = CheckpointKind::Pretrain;
        self.checkpoints
            .save_module(self.generator.model(), kind, ModelRole::Generator)?;
        self.checkpoints
            .save_module(self.reference.model(), kind, ModelRole::Reference)?;
        if let Some(d) = &self.discriminator {
            self.checkpoints.save_module(d.model(), kind, ModelRole::Discriminator)?;
        }
        self.checkpoints.save_config(&self.cfg)?;
        tracing::info!("Pretrain finished and saved in '{}'", self.checkpoints.dir().display());
        Ok(())
    }

    /// A checkpoint that exists but cannot be read stops the run.
    fn restore_pretrain(&mut self) -> Result<()> {
        let kind = CheckpointKind::Pretrain;
        let device = self.device.clone();

        let generator = self.checkpoints.load_module(
            self.generator.model().clone(),
            kind,
            ModelRole::Generator,
            &device,
        )?;
        self.generator.set_model(generator);

        let reference = self.checkpoints.load_module(
            self.reference.model().clone(),
            kind,
            ModelRole::Reference,
            &device,
        )?;
        self.reference = ReferencePolicy::new(reference);

        if let Some(d) = self.discriminator.as_mut() {
            let cnn = self
                .checkpoints
                .load_module(d.model().clone(), kind, ModelRole::Discriminator, &device)?;
            d.set_model(cnn);
        }

        tracing::info!("Pretrain loaded from previous checkpoint; skipping pretraining");
        Ok(())
    }

    // ── Adversarial loop ──────────────────────────────────────────────────────

    fn adversarial_loop(&mut self) -> Result<()> {
        self.transition(Phase::AdversarialLoop);
        self.rollout.update_params(self.generator.snapshot());

        let total = self.cfg.total_batch;
        let d_steps = self.cfg.discriminator_steps();

        for nbatch in 0..total {
            let mut record = ResultRecord::new(&self.cfg.experiment_name, nbatch);
            let last_iteration = nbatch + 1 == total;

            // (a) evaluation
            if is_due(nbatch, self.cfg.eval_every) || last_iteration {
                let n = if is_due(nbatch, self.cfg.big_eval_every) || last_iteration {
                    self.cfg.big_sample_num()
                } else {
                    self.cfg.sample_num
                };
                let test_loss = self.evaluate(n)?;
                record.test_loss = Some(test_loss);
                if self.best_test_loss.map_or(true, |best| test_loss < best) {
                    self.best_test_loss = Some(test_loss);
                    tracing::info!("New best test_loss {:.4}", test_loss);
                }
            }
            record.best_test_loss = self.best_test_loss;

            // (b) policy-gradient steps
            let mut last_batch = Vec::new();
            for _ in 0..self.cfg.g_steps {
                let samples = self.generator.generate(self.cfg.batch_size, &mut self.rng)?;
                let scorer = if self.blend.use_classifier {
                    self.discriminator.as_ref().map(|d| d.scorer())
                } else {
                    None
                };
                let rewards = self.rollout.estimate_rewards(
                    &samples,
                    self.cfg.rollout_num,
                    scorer.as_ref(),
                    &self.objective,
                    self.blend.objective_weight,
                    &mut self.rng,
                )?;
                let g_loss = self.generator.policy_gradient_update(&samples, &rewards)?;
                tracing::debug!("G step: loss={:.4}, mean reward={:.4}", g_loss, rewards.mean());
                record.g_loss = Some(g_loss);
                last_batch = samples;
            }

            // (c) fresh snapshot for the next iteration's rollouts
            self.rollout.update_params(self.generator.snapshot());

            // (d) discriminator rounds
            if self.discriminator.is_some() {
                for _ in 0..d_steps {
                    if let Some(step) = self.train_discriminator()? {
                        record.discriminator.push(step);
                    }
                }
            }

            // (e) summary
            record.summary = self.objective.summarize(&last_batch);
            tracing::info!(
                "Batch {:>4}/{} | test_loss={} | g_loss={} | valid={:.3} | unique={:.3} | novel={:.3}",
                nbatch + 1,
                total,
                fmt_opt(record.test_loss),
                fmt_opt(record.g_loss),
                record.summary.valid_fraction,
                record.summary.unique_fraction,
                record.summary.novel_fraction
            );
            self.records.push(record);

            // (f) periodic flush
            if is_due(nbatch, self.cfg.results_flush_every) {
                self.results.flush(&self.records)?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.transition(Phase::Finished);
        self.results.flush(&self.records)?;

        let kind = CheckpointKind::Final;
        self.checkpoints
            .save_module(self.generator.model(), kind, ModelRole::Generator)?;
        if let Some(d) = &self.discriminator {
            self.checkpoints.save_module(d.model(), kind, ModelRole::Discriminator)?;
        }
        self.checkpoints.save_config(&self.cfg)?;
        tracing::info!("Final models saved in '{}'", self.checkpoints.dir().display());
        Ok(())
    }

    // ── Shared steps ──────────────────────────────────────────────────────────

    /// Mean NLL of `n` fresh generator samples under the reference.
    fn evaluate(&mut self, n: usize) -> Result<f64> {
        let samples = self
            .generator
            .generate_many(n, self.cfg.batch_size, &mut self.rng)?;
        self.evaluations += 1;
        self.reference.evaluate(&samples, self.cfg.batch_size)
    }

    /// One discriminator training call on the positives plus an equal
    /// number of fresh negatives. None when the discriminator is off.
    fn train_discriminator(&mut self) -> Result<Option<DiscriminatorStep>> {
        let Some(disc) = self.discriminator.as_mut() else {
            return Ok(None);
        };
        let negatives = self.generator.generate_many(
            self.positives.len(),
            self.cfg.batch_size,
            &mut self.rng,
        )?;
        let step = disc.train_epochs(
            &self.positives,
            negatives,
            self.cfg.dis_batch_size,
            self.cfg.dis_num_epochs,
            &mut self.rng,
        )?;
        Ok(Some(step))
    }
}

pub fn discriminator_config(cfg: &ExperimentConfig, vocab_len: usize) -> TextCnnConfig {
    TextCnnConfig::new(
        vocab_len,
        cfg.max_length,
        cfg.dis_filter_sizes.clone(),
        cfg.dis_num_filters.clone(),
    )
    .with_embedding_dim(cfg.dis_embedding_dim)
    .with_dropout(cfg.dis_dropout)
}

/// Periodic schedules fire on index 0, `every`, `2 × every`, ...
fn is_due(index: usize, every: usize) -> bool {
    index % every == 0
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::tests::tiny_config;
    use burn::backend::{Autodiff, NdArray};
    use std::{fs, path::Path};

    type TestBackend = Autodiff<NdArray>;

    const CORPUS: [&str; 8] = ["CCO", "CC(C)O", "C1CC1", "CN", "OCC", "NC(O)C", "CCCC", "C[N]C"];

    fn trainer(cfg: ExperimentConfig) -> GanTrainer<TestBackend> {
        let raw: Vec<String> = CORPUS.iter().map(|s| s.to_string()).collect();
        let vocab = Vocabulary::build(&raw);
        let corpus = Corpus::prepare(raw.clone(), &vocab, cfg.max_length).unwrap();
        let objective = NoveltyObjective::new(vocab.clone(), &raw);
        GanTrainer::new(cfg, corpus, objective, &vocab, Default::default()).unwrap()
    }

    fn run(cfg: ExperimentConfig) -> TrainingOutcome {
        trainer(cfg).run().unwrap()
    }

    fn final_generator_exists(dir: &Path, name: &str) -> bool {
        dir.join("checkpoints").join(format!("{name}_final_generator.mpk")).exists()
    }

    #[test]
    fn test_full_run_writes_results_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        let outcome = run(cfg.clone());

        assert!(!outcome.resumed);
        assert_eq!(outcome.records.len(), cfg.total_batch);
        assert!(outcome.best_test_loss.is_some());
        // D = max(5 × 0.5, 1) = 2 rounds per iteration
        assert!(outcome.records.iter().all(|r| r.discriminator.len() == 2));
        assert!(outcome.records.iter().all(|r| r.g_loss.is_some()));

        let csv = fs::read_to_string(&outcome.results_path).unwrap();
        assert_eq!(csv.lines().count(), cfg.total_batch + 1);
        assert!(final_generator_exists(dir.path(), "tiny"));
    }

    #[test]
    fn test_second_run_skips_pretraining() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        run(cfg.clone());

        let outcome = run(cfg.clone());
        assert!(outcome.resumed);
        assert_eq!(outcome.records.len(), cfg.total_batch);
    }

    #[test]
    fn test_zero_weight_disables_discriminator() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = tiny_config(dir.path());
        cfg.discriminator_weight = 0.0;
        let outcome = run(cfg);

        assert!(outcome.records.iter().all(|r| r.discriminator.is_empty()));
        assert!(dir
            .path()
            .join("checkpoints")
            .join("tiny_pretrain_generator.mpk")
            .exists());
        assert!(!dir
            .path()
            .join("checkpoints")
            .join("tiny_pretrain_discriminator.mpk")
            .exists());
    }

    #[test]
    fn test_corrupt_pretrain_checkpoint_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        let ckpt = dir.path().join("checkpoints");
        fs::create_dir_all(&ckpt).unwrap();
        for role in ["generator", "reference", "discriminator"] {
            fs::write(ckpt.join(format!("tiny_pretrain_{role}.mpk")), b"garbage").unwrap();
        }
        let err = trainer(cfg).run().unwrap_err().to_string();
        assert!(err.contains("Cannot load checkpoint"));
    }

    #[test]
    fn test_partial_pretrain_checkpoint_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        run(cfg.clone());
        fs::remove_file(
            dir.path().join("checkpoints").join("tiny_pretrain_reference.mpk"),
        )
        .unwrap();

        let err = trainer(cfg).run().unwrap_err().to_string();
        assert!(err.contains("missing: reference"));
        // the surviving records are left untouched
        assert!(dir
            .path()
            .join("checkpoints")
            .join("tiny_pretrain_generator.mpk")
            .exists());
    }

    #[test]
    fn test_enabling_discriminator_after_zero_weight_run_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = tiny_config(dir.path());
        cfg.discriminator_weight = 0.0;
        run(cfg.clone());

        cfg.discriminator_weight = 0.5;
        let err = trainer(cfg).run().unwrap_err().to_string();
        assert!(err.contains("missing: discriminator"));
    }

    #[test]
    fn test_schedules_fire_on_multiples() {
        let due: Vec<usize> = (0..12).filter(|&i| is_due(i, PRETRAIN_EVAL_EVERY)).collect();
        assert_eq!(due, vec![0, 5, 10]);
        assert!((0..4).all(|i| is_due(i, 1)));
    }

    #[test]
    fn test_pretraining_evaluates_every_fifth_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = tiny_config(dir.path());
        cfg.g_pretrain_epochs = 6;
        cfg.eval_every = 2;
        cfg.total_batch = 3;
        let outcome = run(cfg);

        // epochs 0 and 5, the post-pretrain check, then
        // iterations 0 and 2 (the last) of the adversarial loop
        assert_eq!(outcome.evaluations, 5);
        assert!(outcome.records[1].test_loss.is_none());
        assert!(outcome.records[2].test_loss.is_some());
    }

    #[test]
    fn test_sparse_flush_still_writes_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = tiny_config(dir.path());
        cfg.total_batch = 3;
        cfg.results_flush_every = 2;
        let outcome = run(cfg);

        let csv = fs::read_to_string(&outcome.results_path).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_best_score_never_increases() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = tiny_config(dir.path());
        cfg.total_batch = 3;
        let outcome = run(cfg);

        let bests: Vec<f64> = outcome
            .records
            .iter()
            .filter_map(|r| r.best_test_loss)
            .collect();
        assert_eq!(bests.len(), 3);
        assert!(bests.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_new_trainer_starts_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let t = trainer(tiny_config(dir.path()));
        assert_eq!(t.phase(), Phase::Uninitialized);
        assert_eq!(t.generator().max_length(), 8);
    }
}
