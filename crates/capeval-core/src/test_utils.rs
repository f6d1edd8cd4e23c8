//! Test utilities for capeval-core.
//!
//! Shared fixtures for unit tests: a small reference set, a matching
//! vocabulary and scripted scorers. Only compiled when running tests.

use crate::error::ScorerError;
use crate::references::InMemoryAnnotations;
use crate::scoring::{MetricNames, Scorer, ScorerOutput, ScoringBatch};
use crate::vocab::Vocab;

/// References `{1: ["a cat sits"], 2: ["a dog runs"]}`.
pub fn cat_dog_references() -> InMemoryAnnotations {
    let mut refs = InMemoryAnnotations::new();
    refs.add(1u64, "a cat sits");
    refs.add(2u64, "a dog runs");
    refs
}

/// Vocabulary `<start> <end> a cat sits dog runs` (indices 0..=6).
pub fn sample_vocab() -> Vocab {
    Vocab::from_words(["<start>", "<end>", "a", "cat", "sits", "dog", "runs"])
}

/// Scorer returning a fixed output regardless of input.
///
/// Scalar outputs are named `Fixed`, vector outputs `Fixed_1..n`.
pub struct FixedScorer {
    output: ScorerOutput,
}

impl FixedScorer {
    pub fn scalar(corpus: f64, per_item: Vec<f64>) -> Self {
        Self {
            output: ScorerOutput::Scalar { corpus, per_item },
        }
    }

    pub fn vector(corpus: Vec<f64>, per_item: Vec<Vec<f64>>) -> Self {
        Self {
            output: ScorerOutput::Vector { corpus, per_item },
        }
    }
}

impl Scorer for FixedScorer {
    fn method(&self) -> &str {
        "Fixed"
    }

    fn metric_names(&self) -> MetricNames {
        match &self.output {
            ScorerOutput::Scalar { .. } => MetricNames::from("Fixed"),
            ScorerOutput::Vector { corpus, .. } => MetricNames::Multiple(
                (1..=corpus.len()).map(|i| format!("Fixed_{}", i)).collect(),
            ),
        }
    }

    fn compute_score(&mut self, _batch: &ScoringBatch<'_>) -> Result<ScorerOutput, ScorerError> {
        Ok(self.output.clone())
    }
}

/// Scorer that always fails.
pub struct FailingScorer;

impl Scorer for FailingScorer {
    fn method(&self) -> &str {
        "Failing"
    }

    fn metric_names(&self) -> MetricNames {
        MetricNames::from("Failing")
    }

    fn compute_score(&mut self, _batch: &ScoringBatch<'_>) -> Result<ScorerOutput, ScorerError> {
        Err(ScorerError::failed("Failing", "scorer crashed"))
    }
}
