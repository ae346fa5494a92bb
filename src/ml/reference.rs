// ============================================================
// Layer 5 — Reference Policy (evaluation oracle)
// ============================================================
// A frozen LSTM with the generator's architecture. It never
// receives gradient updates; it only measures how natural the
// generator's output looks:
//
//   test_loss = mean per-token NLL of generated samples under
//               the reference model
//
// The reference is initialised from the run seed and saved with
// the pretrain checkpoint, so resumed runs report comparable
// numbers.

use anyhow::{ensure, Result};
use burn::prelude::*;

use crate::data::batcher::sequences_to_tensor;
use crate::domain::sequence::{ensure_batch_shape, TokenSequence};
use crate::domain::traits::LikelihoodOracle;
use crate::ml::generator::Generator;

pub struct ReferencePolicy<B: Backend> {
    model: Generator<B>,
}

impl<B: Backend> ReferencePolicy<B> {
    pub fn new(model: Generator<B>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Generator<B> {
        &self.model
    }

    /// Mean NLL over `samples`, evaluated `batch_size` rows at a time.
    pub fn evaluate(&self, samples: &[TokenSequence], batch_size: usize) -> Result<f64> {
        ensure!(!samples.is_empty(), "no samples to evaluate");
        let losses = samples
            .chunks(batch_size.max(1))
            .map(|chunk| self.average_negative_log_likelihood(chunk))
            .collect::<Result<Vec<f64>>>()?;
        Ok(losses.iter().sum::<f64>() / losses.len() as f64)
    }
}

impl<B: Backend> LikelihoodOracle for ReferencePolicy<B> {
    fn average_negative_log_likelihood(&self, batch: &[TokenSequence]) -> Result<f64> {
        ensure_batch_shape(batch, self.model.max_length)?;
        let tokens = sequences_to_tensor::<B>(batch, &self.model.device());
        Ok(self.model.teacher_forced_loss(tokens).into_scalar().elem::<f64>())
    }
}
