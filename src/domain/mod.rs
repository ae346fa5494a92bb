// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of adversarial sequence generation.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// The ML layer implements the traits declared here
// (generator → SequenceSampler, discriminator → RealismScorer,
// reference model → LikelihoodOracle) so the rollout estimator
// can be exercised with plain stubs in tests.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Token ids, sequences and batch shape checks
pub mod sequence;

// Symbol ↔ id mapping plus the well-formedness rules
pub mod vocabulary;

// Reward matrix and the classifier/objective blend
pub mod reward;

// Novelty objective with within-batch diversity weighting
pub mod objective;

// Core abstractions (traits) that other layers implement
pub mod traits;

// One row of the per-iteration results log
pub mod record;
