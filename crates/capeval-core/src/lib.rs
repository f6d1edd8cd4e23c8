//! # CapEval Core
//!
//! Platform-independent library for scoring generated image captions
//! against human reference captions.
//!
//! This crate orchestrates caption metrics: it normalizes references and
//! candidates into a common tokenized form, decodes model output given as
//! vocabulary indices, drives any number of scorer plugins and merges
//! their results into corpus-level and per-item tables. The metric
//! algorithms themselves are pluggable and live behind the
//! [`scoring::Scorer`] trait.
//!
//! ## Modules
//!
//! - [`evaluator`] - Multi-metric evaluation of text candidates
//! - [`inline`] - Single-metric evaluation of index-sequence candidates
//! - [`scoring`] - Scorer trait, scorer pipeline, built-in scorers
//! - [`aggregate`] - Merging per-metric results into per-item rows
//! - [`normalize`] - Caption tokenizer trait and default tokenizer
//! - [`vocab`] - Vocabulary lookup and index decoding
//! - [`references`] - Reference sources and the cached reference set
//! - [`dataset`] - COCO-format file loading
//! - [`config`] - Special tokens and metric names
//! - [`error`] - Error types
//! - [`progress`] - Scorer progress reporting

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod inline;
pub mod normalize;
pub mod progress;
pub mod references;
pub mod scoring;
pub mod types;
pub mod vocab;

#[cfg(test)]
mod test_utils;

pub use aggregate::{aggregate, AggregatedScores, ItemScores};
pub use error::EvalError;
pub use evaluator::{CaptionEvaluator, EvalReport};
pub use inline::InlineScorer;
pub use normalize::CaptionNormalizer;
pub use types::{single_captions, CaptionRecord, ImageId, IndexBatch, RawAnnotations};
