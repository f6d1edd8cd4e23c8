//! Merging per-metric results into corpus and per-item tables.
//!
//! Input is the flat list of [`MetricScore`]s produced by the scorer
//! pipeline plus the id order used when scoring. Output is
//!
//! - a corpus mapping `metric -> score`
//! - one [`ItemScores`] row per id, `{"image_id": id, metric: score, ...}`
//!
//! Aggregation is a pure function of its inputs.

use crate::error::ScorerError;
use crate::scoring::MetricScore;
use crate::types::ImageId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scores of one item across all metrics.
///
/// Serializes as a flat record:
///
/// ```
/// use capeval_core::aggregate::ItemScores;
/// use capeval_core::ImageId;
///
/// let mut row = ItemScores::new(ImageId::Num(1));
/// row.scores.insert("CIDEr".to_string(), 0.5);
/// let json = serde_json::to_string(&row).unwrap();
/// assert_eq!(json, r#"{"image_id":1,"CIDEr":0.5}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemScores {
    /// Item id
    pub image_id: ImageId,
    /// Metric name to score
    #[serde(flatten)]
    pub scores: BTreeMap<String, f64>,
}

impl ItemScores {
    /// Creates an empty row for an item.
    pub fn new(image_id: ImageId) -> Self {
        Self {
            image_id,
            scores: BTreeMap::new(),
        }
    }

    /// Score of one metric.
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.scores.get(metric).copied()
    }
}

/// Output of [`aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedScores {
    /// Metric name to corpus-level score
    pub corpus: BTreeMap<String, f64>,
    /// Item id to its row
    pub per_item: BTreeMap<ImageId, ItemScores>,
    order: Vec<ImageId>,
}

impl AggregatedScores {
    /// Ids in scoring order.
    pub fn order(&self) -> &[ImageId] {
        &self.order
    }

    /// Flattens the per-item rows into scoring order.
    pub fn into_rows(mut self) -> Vec<ItemScores> {
        self.order
            .iter()
            .filter_map(|id| self.per_item.remove(id))
            .collect()
    }
}

/// Merges per-metric results.
///
/// `order` is the id sequence the per-item lists are aligned to. For each
/// metric, `per_item[i]` is recorded on the row of `order[i]`; rows are
/// created on the first metric that mentions their id. A metric name seen
/// twice keeps the last value.
///
/// # Errors
///
/// Returns `ScorerError::LengthMismatch` if a metric's per-item list is
/// not exactly as long as `order`. Nothing is aggregated in that case.
pub fn aggregate(
    results: &[MetricScore],
    order: &[ImageId],
) -> Result<AggregatedScores, ScorerError> {
    if let Some(result) = results.iter().find(|r| r.per_item.len() != order.len()) {
        return Err(ScorerError::LengthMismatch {
            metric: result.name.clone(),
            expected: order.len(),
            actual: result.per_item.len(),
        });
    }

    let mut corpus = BTreeMap::new();
    let mut per_item: BTreeMap<ImageId, ItemScores> = BTreeMap::new();

    for result in results {
        corpus.insert(result.name.clone(), result.corpus);

        for (id, score) in order.iter().zip(&result.per_item) {
            per_item
                .entry(id.clone())
                .or_insert_with(|| ItemScores::new(id.clone()))
                .scores
                .insert(result.name.clone(), *score);
        }
    }

    Ok(AggregatedScores {
        corpus,
        per_item,
        order: order.to_vec(),
    })
}
