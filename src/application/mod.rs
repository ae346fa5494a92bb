// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal (training a run, or sampling from a trained run).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Rust Book §7 (Module System)

// The immutable experiment configuration
pub mod config;

// The adversarial training workflow
pub mod train_use_case;

// Sampling sequences from a finished run
pub mod sample_use_case;
