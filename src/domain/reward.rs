// ============================================================
// Layer 3 — Rewards
// ============================================================
// RewardMatrix: BATCH_SIZE × MAX_LENGTH. Cell (i, t-1) holds the
// estimated reward for sequence i having generated its first t
// tokens. Built once per generator update and then discarded.
//
// RewardBlend: how a completed sequence is scored,
//   blended = classifier_score + objective_weight × objective_score
// with the classifier term dropped when the discriminator is
// disabled (discriminator weight 0).

/// Row-major reward matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardMatrix {
    rows:   usize,
    cols:   usize,
    values: Vec<f64>,
}

impl RewardMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, values: vec![0.0; rows * cols] }
    }

    /// [batch_size, max_length]
    pub fn dims(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.cols + col] = value;
    }

    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.cols + col] += value;
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

/// Weights used when blending the classifier's realism score with the
/// task objective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardBlend {
    pub use_classifier:   bool,
    pub objective_weight: f64,
}

impl RewardBlend {
    /// Derive the blend from the run-level discriminator weight `w`.
    ///
    /// `w = 0` disables the classifier and rewards the objective alone.
    /// Otherwise the `w·D + (1-w)·objective` mix is rescaled by `1/w`
    /// into the `D + λ·objective` form, unless `objective_override`
    /// pins λ explicitly.
    pub fn from_discriminator_weight(w: f64, objective_override: Option<f64>) -> Self {
        if w == 0.0 {
            return Self {
                use_classifier:   false,
                objective_weight: objective_override.unwrap_or(1.0),
            };
        }
        let objective_weight = objective_override.unwrap_or_else(|| (1.0 - w).max(0.0) / w);
        Self { use_classifier: true, objective_weight }
    }

    pub fn combine(&self, classifier_score: f64, objective_score: f64) -> f64 {
        let realism = if self.use_classifier { classifier_score } else { 0.0 };
        realism + self.objective_weight * objective_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_indexing_is_row_major() {
        let mut m = RewardMatrix::zeros(2, 3);
        m.set(1, 2, 4.0);
        m.add(1, 2, 1.0);
        assert_eq!(m.get(1, 2), 5.0);
        assert_eq!(m.values(), &[0.0, 0.0, 0.0, 0.0, 0.0, 5.0]);
        assert_eq!(m.dims(), [2, 3]);
    }

    #[test]
    fn test_zero_weight_disables_classifier() {
        let blend = RewardBlend::from_discriminator_weight(0.0, None);
        assert!(!blend.use_classifier);
        assert_eq!(blend.combine(0.9, 0.5), 0.5);
    }

    #[test]
    fn test_full_weight_is_classifier_only() {
        let blend = RewardBlend::from_discriminator_weight(1.0, None);
        assert!(blend.use_classifier);
        assert_eq!(blend.objective_weight, 0.0);
        assert_eq!(blend.combine(0.7, 1.0), 0.7);
    }

    #[test]
    fn test_half_weight_mixes_equally() {
        let blend = RewardBlend::from_discriminator_weight(0.5, None);
        assert!((blend.objective_weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_override_wins() {
        let blend = RewardBlend::from_discriminator_weight(0.5, Some(3.0));
        assert_eq!(blend.objective_weight, 3.0);
    }
}
