// ============================================================
// Layer 3 — Token Sequences
// ============================================================
// A token sequence is a fixed-length row of integer ids.
// Every sequence in a batch shares the same MAX_LENGTH; the
// helpers below enforce that invariant at component boundaries.

use anyhow::{ensure, Result};

/// One vocabulary id.
pub type Token = u32;

/// A fixed-length, padded sequence of token ids.
pub type TokenSequence = Vec<Token>;

/// Check that a batch is non-empty and every row has `max_length` tokens.
pub fn ensure_batch_shape(batch: &[TokenSequence], max_length: usize) -> Result<()> {
    ensure!(!batch.is_empty(), "batch is empty");
    for (i, seq) in batch.iter().enumerate() {
        ensure!(
            seq.len() == max_length,
            "sequence {} has length {}, expected {}",
            i,
            seq.len(),
            max_length
        );
    }
    Ok(())
}

/// Flatten a batch row-major into i32 ids, the layout Burn's
/// `Tensor::from_ints` expects.
pub fn flatten_ids(batch: &[TokenSequence]) -> Vec<i32> {
    batch
        .iter()
        .flat_map(|s| s.iter().map(|&t| t as i32))
        .collect()
}
