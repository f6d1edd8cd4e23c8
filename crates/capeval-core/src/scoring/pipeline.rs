//! Ordered scorer pipeline.
//!
//! The `ScorerPipeline` runs each configured scorer over the same batch,
//! one after another, and flattens their outputs into per-metric scores.

use super::{MetricNames, MetricScore, Scorer, ScoringBatch};
use crate::config::IMAGE_ID_KEY;
use crate::error::{PipelineError, ScorerError};
use crate::progress::{ProgressTimer, ScorerProgress};
use std::collections::HashSet;
use tracing::{debug, info};

/// A scorer and the metric name(s) its output is reported under.
pub struct ScorerBinding {
    scorer: Box<dyn Scorer>,
    names: MetricNames,
}

impl ScorerBinding {
    /// Binds a scorer under its own declared metric names.
    pub fn new(scorer: Box<dyn Scorer>) -> Self {
        let names = scorer.metric_names();
        Self { scorer, names }
    }

    /// Binds a scorer under explicit metric names.
    ///
    /// The names must have the same shape as the scorer's output; a
    /// mismatch is reported when the scorer first runs.
    pub fn with_names(scorer: Box<dyn Scorer>, names: impl Into<MetricNames>) -> Self {
        Self {
            scorer,
            names: names.into(),
        }
    }

    /// Returns the scorer's method name.
    pub fn method(&self) -> &str {
        self.scorer.method()
    }

    /// Returns the bound metric names.
    pub fn names(&self) -> &MetricNames {
        &self.names
    }

    fn run(&mut self, batch: &ScoringBatch<'_>) -> Result<Vec<MetricScore>, ScorerError> {
        let output = self.scorer.compute_score(batch)?;
        output.into_metric_scores(self.scorer.method(), &self.names, batch.len())
    }
}

impl std::fmt::Debug for ScorerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorerBinding")
            .field("method", &self.method())
            .field("names", &self.names)
            .finish()
    }
}

/// Ordered set of scorer bindings.
///
/// # Configuration Rules
///
/// Checked once, at construction:
/// - at least one binding
/// - every binding names at least one metric, and no name is empty
/// - no metric name is produced by two bindings
/// - no metric is named `image_id`
///
/// # Example
///
/// ```
/// use capeval_core::scoring::{ExactMatchScorer, ScorerBinding, ScorerPipeline};
///
/// let pipeline = ScorerPipeline::new(vec![
///     ScorerBinding::new(Box::new(ExactMatchScorer::new())),
/// ])
/// .unwrap();
/// assert_eq!(pipeline.metric_names(), vec!["ExactMatch"]);
/// ```
#[derive(Debug)]
pub struct ScorerPipeline {
    bindings: Vec<ScorerBinding>,
}

impl ScorerPipeline {
    /// Creates a pipeline, validating its metric names.
    ///
    /// # Errors
    ///
    /// Returns a `PipelineError` describing the first rule violated.
    pub fn new(bindings: Vec<ScorerBinding>) -> Result<Self, PipelineError> {
        if bindings.is_empty() {
            return Err(PipelineError::Empty);
        }

        let mut seen = HashSet::new();
        for binding in &bindings {
            if binding.names.is_empty() {
                return Err(PipelineError::NoMetricNames(binding.method().to_string()));
            }
            for name in binding.names.names() {
                if name.is_empty() {
                    return Err(PipelineError::EmptyMetricName(binding.method().to_string()));
                }
                if name == IMAGE_ID_KEY {
                    return Err(PipelineError::ReservedMetricName(name.to_string()));
                }
                if !seen.insert(name.to_string()) {
                    return Err(PipelineError::DuplicateMetric(name.to_string()));
                }
            }
        }

        Ok(Self { bindings })
    }

    /// Creates a pipeline binding each scorer under its declared names.
    pub fn from_scorers(scorers: Vec<Box<dyn Scorer>>) -> Result<Self, PipelineError> {
        Self::new(scorers.into_iter().map(ScorerBinding::new).collect())
    }

    /// All metric names in configured order.
    pub fn metric_names(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .flat_map(|binding| binding.names.names())
            .collect()
    }

    /// Returns the bindings in run order.
    pub fn bindings(&self) -> &[ScorerBinding] {
        &self.bindings
    }

    /// Number of scorers.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if the pipeline has no scorers.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Runs every scorer over the batch.
    ///
    /// See [`run_with_progress`](Self::run_with_progress).
    pub fn run(&mut self, batch: &ScoringBatch<'_>) -> Result<Vec<MetricScore>, ScorerError> {
        self.run_with_progress(batch, |_| {})
    }

    /// Runs every scorer over the batch, reporting progress.
    ///
    /// Scorers run sequentially in configured order. The callback fires
    /// before each scorer and once after the last.
    ///
    /// # Returns
    ///
    /// One [`MetricScore`] per configured metric name, in configured order.
    ///
    /// # Errors
    ///
    /// The first scorer failure aborts the run; no scores are returned.
    pub fn run_with_progress<F>(
        &mut self,
        batch: &ScoringBatch<'_>,
        mut on_progress: F,
    ) -> Result<Vec<MetricScore>, ScorerError>
    where
        F: FnMut(ScorerProgress),
    {
        let timer = ProgressTimer::new();
        let total = self.bindings.len();
        let mut results = Vec::with_capacity(total);

        for (completed, binding) in self.bindings.iter_mut().enumerate() {
            on_progress(ScorerProgress::new(
                completed,
                total,
                Some(binding.method().to_string()),
                timer.elapsed_ms(),
            ));

            info!("computing {} score...", binding.method());
            let scores = binding.run(batch)?;
            for score in &scores {
                info!("{}: {:.3}", score.name, score.corpus);
            }
            results.extend(scores);
        }

        on_progress(ScorerProgress::new(total, total, None, timer.elapsed_ms()));
        debug!(
            "Scored {} items with {} metrics in {}ms",
            batch.len(),
            results.len(),
            timer.elapsed_ms()
        );

        Ok(results)
    }
}
