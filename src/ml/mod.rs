// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn model and training code.
// Only data::batcher (tensor construction) and infra::checkpoint
// (records) touch burn outside of it.
//
// What's in this layer:
//
//   generator.rs     — LSTM token sampler (SequencePolicy):
//                      sampling, teacher-forced loss, REINFORCE
//
//   discriminator.rs — TextCNN real/generated classifier:
//                      conv banks, highway, L2-regularised loss
//
//   reference.rs     — frozen LSTM used only to report test_loss
//
//   rollout.rs       — PolicySnapshot + Monte-Carlo reward
//                      estimation for partial sequences
//
//   trainer.rs       — the phase state machine: pretraining,
//                      adversarial loop, checkpoints, results
//
//   inferencer.rs    — loads the final generator and samples
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Yu et al. (2017) SeqGAN
//            Guimaraes et al. (2017) Objective-Reinforced GANs

/// Autoregressive LSTM generator and its optimiser
pub mod generator;

/// TextCNN discriminator and its optimiser
pub mod discriminator;

/// Frozen reference model for test_loss
pub mod reference;

/// Policy snapshot and Monte-Carlo rollout rewards
pub mod rollout;

/// Pretraining + adversarial training loop
pub mod trainer;

/// Inference engine — loads the final checkpoint and samples
pub mod inferencer;
