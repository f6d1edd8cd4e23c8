//! Text-path evaluation: references + candidate captions → aggregated scores.

use crate::aggregate::{aggregate, ItemScores};
use crate::error::EvalError;
use crate::normalize::CaptionNormalizer;
use crate::progress::ScorerProgress;
use crate::references::{AnnotationSource, ReferenceSet};
use crate::scoring::{ScorerPipeline, ScoringBatch};
use crate::types::{ImageId, RawAnnotations};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Result of one evaluation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalReport {
    /// Metric names in configured order
    pub metric_names: Vec<String>,
    /// Metric name to corpus-level score
    pub corpus: BTreeMap<String, f64>,
    /// One row per candidate item, in scoring order
    pub per_item: Vec<ItemScores>,
}

impl EvalReport {
    /// Corpus-level score of one metric.
    pub fn corpus_score(&self, metric: &str) -> Option<f64> {
        self.corpus.get(metric).copied()
    }

    /// Row of one item.
    pub fn item(&self, id: &ImageId) -> Option<&ItemScores> {
        self.per_item.iter().find(|row| &row.image_id == id)
    }

    /// Number of scored items.
    pub fn len(&self) -> usize {
        self.per_item.len()
    }

    /// Returns true if no item was scored.
    pub fn is_empty(&self) -> bool {
        self.per_item.is_empty()
    }
}

/// Multi-metric caption evaluator.
///
/// References are normalized once, at construction. Each evaluation call
/// normalizes only its candidates, runs every configured scorer and
/// aggregates the results.
///
/// Scorers are stateful, so evaluation takes `&mut self`. To evaluate
/// concurrently, build one evaluator per thread sharing the same
/// `Arc<ReferenceSet>` via [`with_references`](Self::with_references).
///
/// # Example
///
/// ```
/// use capeval_core::references::InMemoryAnnotations;
/// use capeval_core::scoring::{ExactMatchScorer, ScorerBinding, ScorerPipeline};
/// use capeval_core::{single_captions, CaptionEvaluator, CaptionNormalizer};
///
/// let mut refs = InMemoryAnnotations::new();
/// refs.add(1u64, "A cat sits.");
///
/// let pipeline = ScorerPipeline::new(vec![
///     ScorerBinding::new(Box::new(ExactMatchScorer::new())),
/// ]).unwrap();
/// let mut evaluator =
///     CaptionEvaluator::new(&refs, CaptionNormalizer::default(), pipeline).unwrap();
///
/// let report = evaluator.evaluate(&single_captions([(1u64, "a cat sits")])).unwrap();
/// assert_eq!(report.corpus_score("ExactMatch"), Some(1.0));
/// ```
#[derive(Debug)]
pub struct CaptionEvaluator {
    references: Arc<ReferenceSet>,
    normalizer: CaptionNormalizer,
    pipeline: ScorerPipeline,
}

impl CaptionEvaluator {
    /// Loads and normalizes every reference of `source`.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::Tokenize` if reference normalization fails.
    pub fn new<S>(
        source: &S,
        normalizer: CaptionNormalizer,
        pipeline: ScorerPipeline,
    ) -> Result<Self, EvalError>
    where
        S: AnnotationSource + ?Sized,
    {
        let references = ReferenceSet::from_source(source, &normalizer)?;
        Ok(Self::with_references(
            Arc::new(references),
            normalizer,
            pipeline,
        ))
    }

    /// Creates an evaluator over an already-normalized reference set.
    pub fn with_references(
        references: Arc<ReferenceSet>,
        normalizer: CaptionNormalizer,
        pipeline: ScorerPipeline,
    ) -> Self {
        Self {
            references,
            normalizer,
            pipeline,
        }
    }

    /// Shared normalized references.
    pub fn references(&self) -> &Arc<ReferenceSet> {
        &self.references
    }

    /// Configured pipeline.
    pub fn pipeline(&self) -> &ScorerPipeline {
        &self.pipeline
    }

    /// Scores one candidate caption per item.
    ///
    /// See [`evaluate_with_progress`](Self::evaluate_with_progress).
    pub fn evaluate(&mut self, candidates: &RawAnnotations) -> Result<EvalReport, EvalError> {
        self.evaluate_with_progress(candidates, |_| {})
    }

    /// Scores one candidate caption per item, reporting scorer progress.
    ///
    /// Only items present in `candidates` are scored; references without a
    /// candidate are ignored.
    ///
    /// # Errors
    ///
    /// - `InvalidCandidates` if `candidates` is empty or an item does not
    ///   carry exactly one caption
    /// - `MissingReference` if a candidate item has no references
    /// - any tokenizer or scorer failure
    ///
    /// On error no scores are returned.
    #[instrument(skip_all, fields(items = candidates.len()))]
    pub fn evaluate_with_progress<F>(
        &mut self,
        candidates: &RawAnnotations,
        on_progress: F,
    ) -> Result<EvalReport, EvalError>
    where
        F: FnMut(ScorerProgress),
    {
        if candidates.is_empty() {
            return Err(EvalError::InvalidCandidates(
                "no candidate captions given".to_string(),
            ));
        }
        if let Some((id, records)) = candidates.iter().find(|(_, records)| records.len() != 1) {
            return Err(EvalError::InvalidCandidates(format!(
                "image {} has {} candidate captions, expected 1",
                id,
                records.len()
            )));
        }

        // Materialized once; scorer input and aggregation share this order
        let ids: Vec<ImageId> = candidates.keys().cloned().collect();
        self.references.require_all(&ids)?;

        let tokenized = self.normalizer.normalize(candidates)?;
        debug!("Tokenized {} candidate captions", tokenized.len());

        let batch = ScoringBatch::new(&ids, self.references.tokenized(), &tokenized)?;
        let results = self.pipeline.run_with_progress(&batch, on_progress)?;
        let aggregated = aggregate(&results, &ids)?;

        info!(
            "Evaluated {} items on {} metrics",
            ids.len(),
            aggregated.corpus.len()
        );

        Ok(EvalReport {
            metric_names: self
                .pipeline
                .metric_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            corpus: aggregated.corpus.clone(),
            per_item: aggregated.into_rows(),
        })
    }
}
