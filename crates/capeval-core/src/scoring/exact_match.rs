//! Exact-match baseline scorer.

use super::{MetricNames, Scorer, ScorerOutput, ScoringBatch};
use crate::config::EXACT_MATCH;
use crate::error::ScorerError;

/// Scores 1.0 when the normalized candidate equals any normalized
/// reference, 0.0 otherwise. The corpus score is the mean.
///
/// Useful as a sanity check and as a default when no external metric
/// scorers are configured.
#[derive(Debug, Clone, Default)]
pub struct ExactMatchScorer;

impl ExactMatchScorer {
    /// Creates the scorer.
    pub fn new() -> Self {
        Self
    }
}

impl Scorer for ExactMatchScorer {
    fn method(&self) -> &str {
        EXACT_MATCH
    }

    fn metric_names(&self) -> MetricNames {
        MetricNames::from(EXACT_MATCH)
    }

    fn compute_score(&mut self, batch: &ScoringBatch<'_>) -> Result<ScorerOutput, ScorerError> {
        let per_item: Vec<f64> = batch
            .items()
            .iter()
            .map(|item| {
                let hit = item.references.iter().any(|r| r == item.candidate);
                if hit {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        let corpus = if per_item.is_empty() {
            0.0
        } else {
            per_item.iter().sum::<f64>() / per_item.len() as f64
        };

        Ok(ScorerOutput::Scalar { corpus, per_item })
    }
}
