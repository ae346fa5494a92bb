use serde::{Deserialize, Serialize};

use crate::domain::objective::ObjectiveSummary;

/// Loss and accuracy of one discriminator round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscriminatorStep {
    pub loss:     f64,
    pub accuracy: f64,
}

/// One row of the results log, written once per outer iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub exp_name:       String,
    pub batch:          usize,
    /// NLL of generated samples under the reference policy
    pub test_loss:      Option<f64>,
    /// Lowest test loss seen so far in the run
    pub best_test_loss: Option<f64>,
    /// Policy-gradient loss of the last generator step
    pub g_loss:         Option<f64>,
    /// Empty when the discriminator is disabled
    pub discriminator:  Vec<DiscriminatorStep>,
    pub summary:        ObjectiveSummary,
}

impl ResultRecord {
    pub fn new(exp_name: impl Into<String>, batch: usize) -> Self {
        Self {
            exp_name:       exp_name.into(),
            batch,
            test_loss:      None,
            best_test_loss: None,
            g_loss:         None,
            discriminator:  Vec::new(),
            summary:        ObjectiveSummary::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_empty() {
        let r = ResultRecord::new("run", 3);
        assert_eq!(r.batch, 3);
        assert!(r.test_loss.is_none() && r.g_loss.is_none());
        assert!(r.discriminator.is_empty());
    }
}
