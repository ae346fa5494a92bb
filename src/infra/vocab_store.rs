// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Builds the symbol vocabulary from the raw corpus on the first
// run and saves it next to the checkpoints, so resumed runs and
// the `sample` command decode with exactly the same ids.
//
//   checkpoints/{exp_name}_vocab.json  →  { "symbols": ["^", "C", ..., "_"] }

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::vocabulary::{Vocabulary, VocabularyFile};

pub struct VocabStore {
    path: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl AsRef<Path>, exp_name: &str) -> Self {
        Self { path: dir.as_ref().join(format!("{exp_name}_vocab.json")) }
    }

    /// Load the saved vocabulary, or build one from `corpus` and save it.
    pub fn load_or_build<S: AsRef<str>>(&self, corpus: &[S]) -> Result<Vocabulary> {
        if self.path.exists() {
            tracing::info!("Loading existing vocabulary from '{}'", self.path.display());
            return self.load();
        }

        let vocab = Vocabulary::build(corpus);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&vocab.to_file())?;
        fs::write(&self.path, json)
            .with_context(|| format!("Cannot write vocabulary to '{}'", self.path.display()))?;
        tracing::info!("Vocabulary built with {} symbols", vocab.len());
        Ok(vocab)
    }

    pub fn load(&self) -> Result<Vocabulary> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read vocabulary '{}'", self.path.display()))?;
        let file: VocabularyFile = serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse vocabulary '{}'", self.path.display()))?;
        Vocabulary::from_file(file)
    }
}
