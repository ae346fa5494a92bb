// ============================================================
// Layer 4 — Corpus Line Preprocessor
// ============================================================
// Cleans one raw line of the training corpus before it reaches
// the vocabulary and the validity filter.
//
// Cleaning steps (applied in order):
//   1. Strip byte order marks and carriage returns
//   2. Trim surrounding whitespace
//   3. Skip blank lines and '#' comment lines
//   4. Keep only the first whitespace-separated field, so
//      "CCO ethanol" and "CCO\t123" both yield "CCO"
//
// Reference: Rust Book §8 (Strings in Rust)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Return the sequence carried by `line`, or None for lines that
    /// hold no sequence at all.
    pub fn clean_line(&self, line: &str) -> Option<String> {
        let line: String = line
            .chars()
            .filter(|&c| c != '\u{FEFF}' && c != '\r')
            .collect();
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        line.split_whitespace().next().map(str::to_string)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
