// ============================================================
// Layer 5 — Discriminator (TextCNN)
// ============================================================
// Binary classifier over fixed-length token sequences:
//
//   ids [B, L]
//     └► Embedding                    [B, L, E]
//          └► swap to channels-first  [B, E, L]
//               └► Conv1d(k) + ReLU + max-over-time, one bank per width
//                    └► concat         [B, Σ filters]
//                         └► Highway └► Dropout └► Linear(2)
//
// Filter widths longer than MAX_LENGTH are skipped.
// Class 1 = real, class 0 = generated; the realism score is the
// softmax probability of class 1.
//
// Loss = cross-entropy + λ · ½‖W_out‖² (+ ½‖b_out‖²)
//
// Reference: Kim (2014) Convolutional Neural Networks for
//            Sentence Classification; Srivastava et al. (2015)
//            Highway Networks

use anyhow::{anyhow, ensure, Result};
use burn::{
    module::AutodiffModule,
    nn::{
        conv::{Conv1d, Conv1dConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    data::dataloader::batcher::Batcher,
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{
        activation::{relu, sigmoid, softmax},
        backend::AutodiffBackend,
    },
};

use rand::rngs::StdRng;

use crate::data::batcher::{sequences_to_tensor, DiscriminatorBatch, DiscriminatorBatcher};
use crate::data::dataset::LabelledSequence;
use crate::data::splitter::{build_labelled_set, epoch_batches};
use crate::domain::record::DiscriminatorStep;
use crate::domain::sequence::{ensure_batch_shape, TokenSequence};
use crate::domain::traits::RealismScorer;

const NUM_CLASSES: usize = 2;
const REAL_CLASS: usize = 1;

#[derive(Config, Debug)]
pub struct TextCnnConfig {
    pub vocab_size:      usize,
    pub sequence_length: usize,
    pub filter_sizes:    Vec<usize>,
    pub num_filters:     Vec<usize>,
    #[config(default = 64)]
    pub embedding_dim:   usize,
    #[config(default = 0.25)]
    pub dropout:         f64,
}

impl TextCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TextCnn<B> {
        let banks: Vec<(usize, usize)> = self
            .filter_sizes
            .iter()
            .copied()
            .zip(self.num_filters.iter().copied())
            .filter(|&(k, _)| k >= 1 && k <= self.sequence_length)
            .collect();
        let convs: Vec<Conv1d<B>> = banks
            .iter()
            .map(|&(k, n)| Conv1dConfig::new(self.embedding_dim, n, k).init(device))
            .collect();
        let total_filters: usize = banks.iter().map(|&(_, n)| n).sum();

        TextCnn {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            convs,
            highway_transform: LinearConfig::new(total_filters, total_filters).init(device),
            highway_gate:      LinearConfig::new(total_filters, total_filters).init(device),
            dropout:           DropoutConfig::new(self.dropout).init(),
            output:            LinearConfig::new(total_filters, NUM_CLASSES).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct TextCnn<B: Backend> {
    pub embedding:         Embedding<B>,
    pub convs:             Vec<Conv1d<B>>,
    pub highway_transform: Linear<B>,
    pub highway_gate:      Linear<B>,
    pub dropout:           Dropout,
    pub output:            Linear<B>,
}

impl<B: Backend> TextCnn<B> {
    pub fn device(&self) -> B::Device {
        self.output.weight.val().device()
    }

    /// [batch, L] → class logits [batch, 2]
    pub fn forward(&self, sequences: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let embedded = self.embedding.forward(sequences).swap_dims(1, 2);

        let pooled: Vec<Tensor<B, 2>> = self
            .convs
            .iter()
            .map(|conv| {
                let features = relu(conv.forward(embedded.clone()));
                let [batch, channels, _] = features.dims();
                features.max_dim(2).reshape([batch, channels])
            })
            .collect();
        let h = Tensor::cat(pooled, 1);

        // Highway: t·relu(W_h h) + (1 - t)·h
        let gate = sigmoid(self.highway_gate.forward(h.clone()));
        let transformed = relu(self.highway_transform.forward(h.clone()));
        let carry = gate.clone().neg().add_scalar(1.0);
        let h = gate * transformed + carry * h;

        self.output.forward(self.dropout.forward(h))
    }

    /// Cross-entropy plus L2 on the output layer; also returns logits.
    pub fn forward_loss(
        &self,
        sequences: Tensor<B, 2, Int>,
        labels:    Tensor<B, 1, Int>,
        l2_lambda: f64,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(sequences);
        let ce = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);

        let mut l2 = self.output.weight.val().powf_scalar(2.0).sum();
        if let Some(bias) = &self.output.bias {
            l2 = l2 + bias.val().powf_scalar(2.0).sum();
        }
        (ce + l2.mul_scalar(0.5 * l2_lambda), logits)
    }
}

impl<B: Backend> RealismScorer for TextCnn<B> {
    fn score(&self, batch: &[TokenSequence]) -> Result<Vec<f64>> {
        ensure!(!batch.is_empty(), "nothing to score");
        let rows = batch.len();
        let probs = softmax(self.forward(sequences_to_tensor(batch, &self.device())), 1)
            .slice([0..rows, REAL_CLASS..REAL_CLASS + 1])
            .reshape([rows]);
        let probs: Vec<f32> = probs
            .into_data()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read discriminator scores: {e:?}"))?;
        Ok(probs.into_iter().map(f64::from).collect())
    }
}

// ─── Discriminator ────────────────────────────────────────────────────────────
/// The trainable classifier: live parameters plus their optimiser.
pub struct Discriminator<B: AutodiffBackend> {
    model:      TextCnn<B>,
    optim:      OptimizerAdaptor<Adam, TextCnn<B>, B>,
    lr:         f64,
    l2_lambda:  f64,
    max_length: usize,
}

impl<B: AutodiffBackend> Discriminator<B> {
    pub fn new(model: TextCnn<B>, lr: f64, l2_lambda: f64, max_length: usize) -> Self {
        // Plain Adam; only the generator clips gradients.
        let optim = AdamConfig::new().init();
        Self { model, optim, lr, l2_lambda, max_length }
    }

    pub fn model(&self) -> &TextCnn<B> {
        &self.model
    }

    pub fn set_model(&mut self, model: TextCnn<B>) {
        self.model = model;
    }

    /// Inference copy: no autodiff, dropout disabled.
    pub fn scorer(&self) -> TextCnn<B::InnerBackend> {
        self.model.valid()
    }

    pub fn score(&self, batch: &[TokenSequence]) -> Result<Vec<f64>> {
        ensure_batch_shape(batch, self.max_length)?;
        self.scorer().score(batch)
    }

    /// One supervised step; returns (loss, accuracy) on the batch.
    pub fn train_step(&mut self, batch: DiscriminatorBatch<B>) -> (f64, f64) {
        let [rows, _] = batch.sequences.dims();
        let (loss, logits) =
            self.model
                .forward_loss(batch.sequences, batch.labels.clone(), self.l2_lambda);

        let correct: i64 = logits
            .argmax(1)
            .reshape([rows])
            .equal(batch.labels)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();
        let accuracy = correct as f64 / rows.max(1) as f64;

        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.lr, self.model.clone(), grads);

        (loss_val, accuracy)
    }

    /// One training call: balance `positives` against `negatives`,
    /// then run `epochs` shuffled passes of `batch_size` minibatches.
    /// Reports the loss and accuracy of the last minibatch.
    pub fn train_epochs(
        &mut self,
        positives:  &[TokenSequence],
        negatives:  Vec<TokenSequence>,
        batch_size: usize,
        epochs:     usize,
        rng:        &mut StdRng,
    ) -> Result<DiscriminatorStep> {
        ensure_batch_shape(positives, self.max_length)?;
        ensure_batch_shape(&negatives, self.max_length)?;

        let set = build_labelled_set(positives, negatives, rng);
        let batches: Vec<Vec<LabelledSequence>> = epoch_batches(&set, batch_size, epochs, rng);
        ensure!(!batches.is_empty(), "no discriminator minibatches to train on");

        let batcher = DiscriminatorBatcher::<B>::new(self.model.device());
        let mut last = (0.0, 0.0);
        for items in batches {
            last = self.train_step(batcher.batch(items));
        }
        tracing::debug!("D loss {:.4}, accuracy {:.4}", last.0, last.1);
        Ok(DiscriminatorStep { loss: last.0, accuracy: last.1 })
    }
}
