// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw corpus file to device-ready batches.
//
//   train file
//       │
//       ▼
//   CorpusLoader      → reads lines, cleans them (Preprocessor)
//       │
//       ▼
//   Corpus            → vocabulary filter + encoding → positives
//       │
//       ├──► SequenceDataset + SequenceBatcher      (generator MLE)
//       │
//       └──► build_labelled_set + epoch_batches
//                + DiscriminatorBatcher             (discriminator)
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the corpus file and builds the positive set
pub mod loader;

/// Cleans individual corpus lines
pub mod preprocessor;

/// Burn Dataset over token sequences, plus labelled items
pub mod dataset;

/// Burn Batchers for generator and discriminator batches
pub mod batcher;

/// Balanced, shuffled discriminator minibatches
pub mod splitter;
