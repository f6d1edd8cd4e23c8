//! Error types for capeval-core.
//!
//! This module defines error types that are used across the core library,
//! including tokenization, scoring, pipeline configuration, vocabulary,
//! dataset loading, and the top-level evaluation error.

use crate::types::ImageId;
use thiserror::Error;

/// Errors that can occur while tokenizing caption mappings.
#[derive(Debug, Clone, Error)]
pub enum TokenizeError {
    /// The underlying tokenizer failed on some caption
    #[error("Tokenization failed: {0}")]
    Failed(String),
    /// The tokenizer did not preserve the input key set
    #[error("Tokenizer changed the item set: {0}")]
    KeyMismatch(String),
}

/// Errors that can occur while running a scorer.
#[derive(Debug, Clone, Error)]
pub enum ScorerError {
    /// The scorer itself reported a failure
    #[error("{method} failed: {message}")]
    Failed {
        /// Scorer method name
        method: String,
        /// Failure description
        message: String,
    },
    /// The scorer returned a shape that does not match its declared metric names
    #[error("{method} declared {expected} metric(s) but returned {actual}")]
    ShapeMismatch {
        /// Scorer method name
        method: String,
        /// Number of declared metric names
        expected: usize,
        /// Number of metrics actually returned
        actual: usize,
    },
    /// Per-item scores are not aligned with the scored items
    #[error("{metric} returned {actual} per-item scores for {expected} items")]
    LengthMismatch {
        /// Metric name
        metric: String,
        /// Number of items scored
        expected: usize,
        /// Number of per-item scores returned
        actual: usize,
    },
    /// A corpus or per-item score was NaN or infinite
    #[error("{metric} produced a non-finite score for {item}")]
    NonFinite {
        /// Metric name
        metric: String,
        /// Item id, or "corpus" for the corpus-level score
        item: String,
    },
    /// An external scorer process could not be run
    #[error("Scorer process error: {0}")]
    Process(String),
    /// An external scorer process answered with a malformed response
    #[error("Malformed scorer response: {0}")]
    Protocol(String),
}

/// Errors detected while configuring a scorer pipeline.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The pipeline has no scorers
    #[error("No scorers configured")]
    Empty,
    /// A binding declared no metric names
    #[error("Scorer {0} has no metric names")]
    NoMetricNames(String),
    /// A metric name was empty
    #[error("Scorer {0} has an empty metric name")]
    EmptyMetricName(String),
    /// A metric name collides with the per-item id key
    #[error("Metric name {0} is reserved")]
    ReservedMetricName(String),
    /// A single-metric path was given a multi-metric scorer
    #[error("Scorer {method} reports {count} metrics, expected exactly one")]
    NotSingleMetric {
        /// Scorer method name
        method: String,
        /// Number of metrics the scorer reports
        count: usize,
    },
    /// Two bindings produce the same metric name
    #[error("Metric {0} is produced by more than one scorer")]
    DuplicateMetric(String),
}

/// Errors related to the caption vocabulary.
#[derive(Debug, Clone, Error)]
pub enum VocabError {
    /// A required special token is not in the vocabulary
    #[error("Special token missing from vocabulary: {0}")]
    MissingSpecialToken(String),
    /// Vocabulary data could not be parsed
    #[error("Invalid vocabulary: {0}")]
    Invalid(String),
}

/// Errors that can occur while loading caption files.
#[derive(Debug, Clone, Error)]
pub enum DatasetError {
    /// Failed to read the file
    #[error("Failed to read {path}: {message}")]
    Read {
        /// File path
        path: String,
        /// I/O error description
        message: String,
    },
    /// The file contents are not valid for the expected format
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// File path
        path: String,
        /// Parse error description
        message: String,
    },
}

/// Errors returned by an evaluation call.
///
/// An evaluation that returns an error produced no corpus-level or
/// per-item scores at all.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// A candidate item has no reference captions
    #[error("No reference captions for image {0}")]
    MissingReference(ImageId),
    /// Candidate captions are malformed
    #[error("Invalid candidates: {0}")]
    InvalidCandidates(String),
    /// Tokenization failed
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    /// A scorer failed
    #[error(transparent)]
    Scorer(#[from] ScorerError),
    /// The scorer configuration is invalid
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Vocabulary lookup failed
    #[error(transparent)]
    Vocab(#[from] VocabError),
    /// Caption data could not be loaded
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

impl From<EvalError> for String {
    fn from(err: EvalError) -> String {
        err.to_string()
    }
}

impl ScorerError {
    /// Creates a scorer failure for the given method.
    pub fn failed(method: impl Into<String>, message: impl Into<String>) -> Self {
        ScorerError::Failed {
            method: method.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_reference_message_names_item() {
        let err = EvalError::MissingReference(ImageId::Num(42));
        assert_eq!(err.to_string(), "No reference captions for image 42");
    }

    #[test]
    fn test_scorer_error_is_transparent() {
        let err: EvalError = ScorerError::failed("Bleu", "boom").into();
        assert_eq!(err.to_string(), "Bleu failed: boom");
    }
}
