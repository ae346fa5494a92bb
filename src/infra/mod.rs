// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence concerns shared by the training and sampling
// workflows:
//
//   checkpoint.rs  — model weights (Burn CompactRecorder), keyed
//                    by experiment name and checkpoint kind, plus
//                    the experiment config as JSON
//
//   vocab_store.rs — the symbol vocabulary as JSON, so every run
//                    of an experiment uses the same ids
//
//   metrics.rs     — the per-iteration results CSV
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary building, saving, and loading
pub mod vocab_store;

/// Results CSV writer
pub mod metrics;
