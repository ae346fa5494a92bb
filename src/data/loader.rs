// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the newline-delimited training corpus once and turns it
// into the positive set for both networks.
//
//   train file ──► Preprocessor ──► raw entries
//                                      │
//                   Vocabulary::build ◄┤ (every raw entry)
//                                      │
//      verified_and_below(max_length) ─┴─► positive samples
//
// Entries that are malformed or not strictly shorter than
// MAX_LENGTH are dropped from the positive set without failing
// the run. They still contribute their symbols to the
// vocabulary, which keeps NUM_EMB independent of MAX_LENGTH.

use anyhow::{ensure, Context, Result};
use std::{fs, path::Path};

use crate::data::preprocessor::Preprocessor;
use crate::domain::sequence::TokenSequence;
use crate::domain::vocabulary::Vocabulary;

/// Loads raw corpus entries from a text file.
pub struct CorpusLoader {
    path: String,
}

impl CorpusLoader {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn load_raw(&self) -> Result<Vec<String>> {
        let path = Path::new(&self.path);
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read training corpus '{}'", path.display()))?;

        let prep = Preprocessor::new();
        let entries: Vec<String> = text.lines().filter_map(|l| prep.clean_line(l)).collect();
        tracing::info!("Loaded {} corpus entries from '{}'", entries.len(), self.path);
        Ok(entries)
    }
}

/// The prepared training corpus.
#[derive(Debug, Clone)]
pub struct Corpus {
    /// Every entry of the train file, used for novelty checks
    pub raw:        Vec<String>,
    /// Encoded, padded entries that passed the filter
    pub positives:  Vec<TokenSequence>,
    pub dropped:    usize,
    pub max_length: usize,
}

impl Corpus {
    /// Filter and encode `raw` against `vocab`.
    pub fn prepare(raw: Vec<String>, vocab: &Vocabulary, max_length: usize) -> Result<Self> {
        let mut positives = Vec::with_capacity(raw.len());
        let mut dropped = 0usize;

        for entry in &raw {
            if !vocab.verified_and_below(entry, max_length) {
                tracing::debug!("Dropping corpus entry '{}'", entry);
                dropped += 1;
                continue;
            }
            match vocab.encode(entry, max_length) {
                Ok(ids) => positives.push(ids),
                Err(e) => {
                    tracing::debug!("Dropping corpus entry '{}': {}", entry, e);
                    dropped += 1;
                }
            }
        }

        ensure!(
            !positives.is_empty(),
            "No valid corpus entries shorter than {} symbols",
            max_length
        );
        if dropped > 0 {
            tracing::warn!("Dropped {} malformed or over-length corpus entries", dropped);
        }

        Ok(Self { raw, positives, dropped, max_length })
    }

    /// Longest raw entry, in symbols.
    pub fn data_length(&self) -> usize {
        self.raw.iter().map(|s| s.chars().count()).max().unwrap_or(0)
    }
}
