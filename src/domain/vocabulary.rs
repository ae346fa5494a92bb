// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Bidirectional symbol ↔ id mapping, built once from the raw
// training corpus and immutable for the rest of the run.
//
// Id layout:
//   0            → START_SYMBOL '^' (the generator's start token)
//   1 .. n-2     → corpus symbols in first-appearance order
//   n-1          → PAD_SYMBOL '_'
//
// Encoding right-pads with '_' up to MAX_LENGTH; decoding maps
// ids back to symbols and strips the trailing padding.

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::sequence::{Token, TokenSequence};

pub const START_SYMBOL: char = '^';
pub const PAD_SYMBOL: char = '_';

/// Serialisable form of the vocabulary: just the ordered symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyFile {
    pub symbols: Vec<char>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    symbols: Vec<char>,
    ids:     HashMap<char, Token>,
}

impl Vocabulary {
    /// Build from every symbol that appears in `corpus`, including
    /// entries that are later filtered out for length or validity.
    pub fn build<S: AsRef<str>>(corpus: &[S]) -> Self {
        let mut symbols = vec![START_SYMBOL];
        for entry in corpus {
            for c in entry.as_ref().chars() {
                if c != START_SYMBOL && c != PAD_SYMBOL && !symbols.contains(&c) {
                    symbols.push(c);
                }
            }
        }
        symbols.push(PAD_SYMBOL);
        Self::from_symbols(symbols)
    }

    /// Rebuild from an ordered symbol list (e.g. read back from disk).
    pub fn from_symbols(symbols: Vec<char>) -> Self {
        let ids = symbols
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i as Token))
            .collect();
        Self { symbols, ids }
    }

    pub fn from_file(file: VocabularyFile) -> Result<Self> {
        ensure!(
            file.symbols.first() == Some(&START_SYMBOL)
                && file.symbols.last() == Some(&PAD_SYMBOL),
            "vocabulary must start with '{}' and end with '{}'",
            START_SYMBOL,
            PAD_SYMBOL
        );
        Ok(Self::from_symbols(file.symbols))
    }

    pub fn to_file(&self) -> VocabularyFile {
        VocabularyFile { symbols: self.symbols.clone() }
    }

    /// NUM_EMB — the number of distinct ids the models must embed.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn start_token(&self) -> Token {
        0
    }

    pub fn pad_token(&self) -> Token {
        (self.symbols.len() - 1) as Token
    }

    pub fn contains(&self, c: char) -> bool {
        self.ids.contains_key(&c)
    }

    /// Encode `text` padded to exactly `max_length` ids.
    pub fn encode(&self, text: &str, max_length: usize) -> Result<TokenSequence> {
        let mut ids = Vec::with_capacity(max_length);
        for c in text.chars() {
            match self.ids.get(&c) {
                Some(&id) => ids.push(id),
                None => bail!("symbol '{}' is not in the vocabulary", c),
            }
        }
        ensure!(
            ids.len() <= max_length,
            "sequence of length {} exceeds max length {}",
            ids.len(),
            max_length
        );
        ids.resize(max_length, self.pad_token());
        Ok(ids)
    }

    /// Decode ids back to a string with trailing padding removed.
    pub fn decode(&self, ids: &[Token]) -> Result<String> {
        let mut out = String::with_capacity(ids.len());
        for &id in ids {
            match self.symbols.get(id as usize) {
                Some(&c) => out.push(c),
                None => bail!("token id {} is out of range", id),
            }
        }
        Ok(out.trim_end_matches(PAD_SYMBOL).to_string())
    }

    /// Non-empty, alphabet-only, free of start/pad symbols, with
    /// balanced `()` and `[]` nesting.
    pub fn is_well_formed(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let mut stack = Vec::new();
        for c in text.chars() {
            if c == START_SYMBOL || c == PAD_SYMBOL || !self.contains(c) {
                return false;
            }
            match c {
                '(' | '[' => stack.push(c),
                ')' => {
                    if stack.pop() != Some('(') {
                        return false;
                    }
                }
                ']' => {
                    if stack.pop() != Some('[') {
                        return false;
                    }
                }
                _ => {}
            }
        }
        stack.is_empty()
    }

    /// Corpus admission rule: well-formed and strictly shorter than
    /// `max_length`.
    pub fn verified_and_below(&self, text: &str, max_length: usize) -> bool {
        text.chars().count() < max_length && self.is_well_formed(text)
    }
}
