//! Scorer plugins and the pipeline that drives them.
//!
//! A scorer compares each candidate caption with its references and
//! reports a corpus-level score plus one score per item. Scorers come in
//! two shapes:
//!
//! | Shape | Declares | Returns |
//! |-------|----------|---------|
//! | Scalar | one metric name (`CIDEr`) | `corpus: f64`, `per_item: [f64]` |
//! | Vector | several names (`Bleu_1..4`) | `corpus: [f64]`, `per_item: [[f64]]` (one list per name) |
//!
//! [`ScorerPipeline`] runs scorers in configured order and flattens both
//! shapes into [`MetricScore`]s, one per metric name, so aggregation never
//! needs to know which shape a scorer had.
//!
//! # Item Order
//!
//! Per-item scores are positional. [`ScoringBatch`] fixes the item order
//! once; scorers must return per-item scores in exactly that order.
//!
//! # Implementations
//!
//! - [`ExactMatchScorer`] - baseline, 1.0 when the candidate equals a reference
//! - [`CommandScorer`] - scorer running as an external process (JSON over stdio)

mod command;
mod exact_match;
mod pipeline;

pub use command::CommandScorer;
pub use exact_match::ExactMatchScorer;
pub use pipeline::{ScorerBinding, ScorerPipeline};

use crate::error::{EvalError, ScorerError};
use crate::types::{ImageId, TokenizedAnnotations};

// ============================================================================
// Scorer Trait
// ============================================================================

/// A caption metric.
///
/// Scorers may hold internal state or drive external processes, so they
/// are called through `&mut self` and never concurrently.
pub trait Scorer: Send {
    /// Human-readable method name used in logs (e.g. "Bleu", "CIDEr").
    fn method(&self) -> &str;

    /// Metric names this scorer reports, matching the shape of its output.
    fn metric_names(&self) -> MetricNames;

    /// Scores every item of the batch.
    ///
    /// Per-item scores must follow `batch.ids()` order.
    fn compute_score(&mut self, batch: &ScoringBatch<'_>) -> Result<ScorerOutput, ScorerError>;
}

// ============================================================================
// Metric Names and Outputs
// ============================================================================

/// Metric name(s) a scorer reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricNames {
    /// Scalar scorer
    Single(String),
    /// Vector scorer, one name per sub-metric
    Multiple(Vec<String>),
}

impl MetricNames {
    /// Names in reporting order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            MetricNames::Single(name) => vec![name.as_str()],
            MetricNames::Multiple(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Number of metrics.
    pub fn len(&self) -> usize {
        match self {
            MetricNames::Single(_) => 1,
            MetricNames::Multiple(names) => names.len(),
        }
    }

    /// Returns true if no metric is named.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for MetricNames {
    fn from(name: &str) -> Self {
        MetricNames::Single(name.to_string())
    }
}

impl From<String> for MetricNames {
    fn from(name: String) -> Self {
        MetricNames::Single(name)
    }
}

impl From<Vec<String>> for MetricNames {
    fn from(names: Vec<String>) -> Self {
        MetricNames::Multiple(names)
    }
}

impl<const N: usize> From<[&str; N]> for MetricNames {
    fn from(names: [&str; N]) -> Self {
        MetricNames::Multiple(names.iter().map(|n| n.to_string()).collect())
    }
}

/// Raw output of one scorer call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScorerOutput {
    /// One metric
    Scalar {
        /// Corpus-level score
        corpus: f64,
        /// One score per item, in batch order
        per_item: Vec<f64>,
    },
    /// Several metrics, position-aligned with the declared names
    Vector {
        /// Corpus-level score per metric
        corpus: Vec<f64>,
        /// Per metric, one score per item in batch order
        per_item: Vec<Vec<f64>>,
    },
}

/// Scores of one named metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricScore {
    /// Metric name
    pub name: String,
    /// Corpus-level score
    pub corpus: f64,
    /// One score per item, in batch order
    pub per_item: Vec<f64>,
}

impl ScorerOutput {
    /// Splits the output into one [`MetricScore`] per declared name.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` if a single name got a vector output, several names
    ///   got a scalar output, or the vector length differs from the name count
    /// - `LengthMismatch` if a metric's per-item list is not `item_count` long
    /// - `NonFinite` if any score is NaN or infinite
    pub fn into_metric_scores(
        self,
        method: &str,
        names: &MetricNames,
        item_count: usize,
    ) -> Result<Vec<MetricScore>, ScorerError> {
        let scores = match (names, self) {
            (MetricNames::Single(name), ScorerOutput::Scalar { corpus, per_item }) => {
                vec![MetricScore {
                    name: name.clone(),
                    corpus,
                    per_item,
                }]
            }
            (MetricNames::Multiple(names), ScorerOutput::Vector { corpus, per_item })
                if corpus.len() == names.len() && per_item.len() == names.len() =>
            {
                names
                    .iter()
                    .zip(corpus)
                    .zip(per_item)
                    .map(|((name, corpus), per_item)| MetricScore {
                        name: name.clone(),
                        corpus,
                        per_item,
                    })
                    .collect()
            }
            (names, output) => {
                return Err(ScorerError::ShapeMismatch {
                    method: method.to_string(),
                    expected: names.len(),
                    actual: output.metric_count(),
                })
            }
        };

        for score in &scores {
            score.validate(item_count)?;
        }
        Ok(scores)
    }

    /// Number of metrics carried by this output.
    ///
    /// For a malformed vector output this is the larger of the two lengths.
    pub fn metric_count(&self) -> usize {
        match self {
            ScorerOutput::Scalar { .. } => 1,
            ScorerOutput::Vector { corpus, per_item } => corpus.len().max(per_item.len()),
        }
    }
}

impl MetricScore {
    /// Checks per-item alignment and finiteness.
    fn validate(&self, item_count: usize) -> Result<(), ScorerError> {
        if self.per_item.len() != item_count {
            return Err(ScorerError::LengthMismatch {
                metric: self.name.clone(),
                expected: item_count,
                actual: self.per_item.len(),
            });
        }
        if !self.corpus.is_finite() {
            return Err(ScorerError::NonFinite {
                metric: self.name.clone(),
                item: "corpus".to_string(),
            });
        }
        if let Some(position) = self.per_item.iter().position(|s| !s.is_finite()) {
            return Err(ScorerError::NonFinite {
                metric: self.name.clone(),
                item: format!("item #{}", position),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Scoring Batch
// ============================================================================

/// One item as seen by a scorer.
#[derive(Debug, Clone, Copy)]
pub struct BatchItem<'a> {
    /// Item id
    pub id: &'a ImageId,
    /// Normalized reference captions
    pub references: &'a [String],
    /// Normalized candidate caption
    pub candidate: &'a str,
}

/// Items to score, in a fixed order.
///
/// Built from an explicit id sequence so the order used to align per-item
/// scores is the same value the aggregator later receives.
#[derive(Debug, Clone)]
pub struct ScoringBatch<'a> {
    ids: &'a [ImageId],
    items: Vec<BatchItem<'a>>,
}

impl<'a> ScoringBatch<'a> {
    /// Resolves references and the single candidate of every id.
    ///
    /// # Errors
    ///
    /// - `EvalError::MissingReference` if an id has no reference captions
    /// - `EvalError::InvalidCandidates` if an id has no candidate, or more
    ///   than one candidate caption
    pub fn new(
        ids: &'a [ImageId],
        references: &'a TokenizedAnnotations,
        candidates: &'a TokenizedAnnotations,
    ) -> Result<Self, EvalError> {
        let items = ids
            .iter()
            .map(|id| {
                let refs = references
                    .get(id)
                    .filter(|refs| !refs.is_empty())
                    .ok_or_else(|| EvalError::MissingReference(id.clone()))?;
                let candidate = match candidates.get(id).map(Vec::as_slice) {
                    Some([single]) => single.as_str(),
                    Some(other) => {
                        return Err(EvalError::InvalidCandidates(format!(
                            "image {} has {} candidate captions, expected 1",
                            id,
                            other.len()
                        )))
                    }
                    None => {
                        return Err(EvalError::InvalidCandidates(format!(
                            "image {} has no candidate caption",
                            id
                        )))
                    }
                };
                Ok(BatchItem {
                    id,
                    references: refs.as_slice(),
                    candidate,
                })
            })
            .collect::<Result<Vec<_>, EvalError>>()?;

        Ok(Self { ids, items })
    }

    /// Item ids in scoring order.
    pub fn ids(&self) -> &'a [ImageId] {
        self.ids
    }

    /// Items in scoring order.
    pub fn items(&self) -> &[BatchItem<'a>] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
