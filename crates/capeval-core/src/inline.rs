//! Single-metric scoring of vocabulary-index captions.
//!
//! During training, a caption model emits index sequences rather than
//! text. [`InlineScorer`] decodes them, normalizes them and hands them to
//! one scorer, returning its corpus score and per-item scores directly.
//! No pipeline or aggregation is involved, which keeps repeated inline
//! evaluation (once per checkpoint) cheap.

use crate::error::{EvalError, PipelineError, ScorerError};
use crate::normalize::CaptionNormalizer;
use crate::references::{AnnotationSource, ReferenceSet};
use crate::scoring::{MetricNames, Scorer, ScoringBatch};
use crate::types::{ImageId, IndexBatch};
use crate::vocab::{Vocab, VocabDecoder, Vocabulary};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Index-sequence evaluator bound to one single-metric scorer.
///
/// # Example
///
/// ```
/// use capeval_core::references::InMemoryAnnotations;
/// use capeval_core::scoring::ExactMatchScorer;
/// use capeval_core::vocab::Vocab;
/// use capeval_core::{CaptionNormalizer, ImageId, IndexBatch, InlineScorer};
/// use std::sync::Arc;
///
/// let mut refs = InMemoryAnnotations::new();
/// refs.add(1u64, "a cat sits");
/// let vocab = Arc::new(Vocab::from_words(["<start>", "<end>", "a", "cat", "sits"]));
///
/// let mut scorer = InlineScorer::new(
///     &refs,
///     vocab,
///     CaptionNormalizer::default(),
///     Box::new(ExactMatchScorer::new()),
/// )
/// .unwrap();
///
/// let mut batch = IndexBatch::new();
/// batch.insert(ImageId::Num(1), vec![0, 2, 3, 4, 1]);
/// let (average, per_item) = scorer.score_batch(&batch).unwrap();
/// assert_eq!(average, 1.0);
/// assert_eq!(per_item, vec![1.0]);
/// ```
pub struct InlineScorer<V: Vocabulary = Vocab> {
    references: Arc<ReferenceSet>,
    vocab: Arc<V>,
    decoder: VocabDecoder,
    normalizer: CaptionNormalizer,
    scorer: Box<dyn Scorer>,
}

impl<V: Vocabulary> InlineScorer<V> {
    /// Loads references and binds the scorer.
    ///
    /// The decoder drops the vocabulary's start/end markers.
    ///
    /// # Errors
    ///
    /// - `Pipeline(NotSingleMetric)` if the scorer reports several metrics
    /// - `Vocab(MissingSpecialToken)` if a boundary marker is absent
    /// - `Tokenize` if reference normalization fails
    pub fn new<S>(
        source: &S,
        vocab: Arc<V>,
        normalizer: CaptionNormalizer,
        scorer: Box<dyn Scorer>,
    ) -> Result<Self, EvalError>
    where
        S: AnnotationSource + ?Sized,
    {
        let decoder = VocabDecoder::for_vocab(vocab.as_ref())?;
        let references = ReferenceSet::from_source(source, &normalizer)?;
        Self::with_references(Arc::new(references), vocab, decoder, normalizer, scorer)
    }

    /// Creates a scorer over an already-normalized reference set.
    ///
    /// # Errors
    ///
    /// Returns `Pipeline(NotSingleMetric)` if the scorer reports several
    /// metrics.
    pub fn with_references(
        references: Arc<ReferenceSet>,
        vocab: Arc<V>,
        decoder: VocabDecoder,
        normalizer: CaptionNormalizer,
        scorer: Box<dyn Scorer>,
    ) -> Result<Self, EvalError> {
        if let MetricNames::Multiple(names) = scorer.metric_names() {
            return Err(PipelineError::NotSingleMetric {
                method: scorer.method().to_string(),
                count: names.len(),
            }
            .into());
        }
        Ok(Self {
            references,
            vocab,
            decoder,
            normalizer,
            scorer,
        })
    }

    /// Replaces the set of indices dropped before decoding.
    pub fn with_filtered_indices(mut self, filtered: impl IntoIterator<Item = u32>) -> Self {
        self.decoder = VocabDecoder::new(filtered, self.decoder.unk_token().to_string());
        self
    }

    /// Decoder in use.
    pub fn decoder(&self) -> &VocabDecoder {
        &self.decoder
    }

    /// Shared normalized references.
    pub fn references(&self) -> &Arc<ReferenceSet> {
        &self.references
    }

    /// Scores a batch of index sequences.
    ///
    /// # Returns
    ///
    /// The scorer's corpus score and per-item scores, unchanged. Per-item
    /// scores follow the batch's key order.
    ///
    /// # Errors
    ///
    /// - `InvalidCandidates` if the batch is empty
    /// - `MissingReference` if a batch id has no references (checked before
    ///   any decoding)
    /// - any tokenizer or scorer failure
    #[instrument(skip_all, fields(items = batch.len()))]
    pub fn score_batch(&mut self, batch: &IndexBatch) -> Result<(f64, Vec<f64>), EvalError> {
        if batch.is_empty() {
            return Err(EvalError::InvalidCandidates(
                "no index sequences given".to_string(),
            ));
        }

        let ids: Vec<ImageId> = batch.keys().cloned().collect();
        self.references.require_all(&ids)?;

        let decoded = self.decoder.decode_batch(self.vocab.as_ref(), batch);
        debug!("Decoded {} index sequences", decoded.len());
        let candidates = self.normalizer.normalize(&decoded)?;

        let scoring = ScoringBatch::new(&ids, self.references.tokenized(), &candidates)?;
        info!("computing {} score...", self.scorer.method());
        let output = self.scorer.compute_score(&scoring)?;

        let names = self.scorer.metric_names();
        let score = output
            .into_metric_scores(self.scorer.method(), &names, ids.len())?
            .into_iter()
            .next()
            .ok_or_else(|| ScorerError::ShapeMismatch {
                method: self.scorer.method().to_string(),
                expected: 1,
                actual: 0,
            })?;
        info!("{}: {:.3}", score.name, score.corpus);

        Ok((score.corpus, score.per_item))
    }
}

impl<V: Vocabulary> std::fmt::Debug for InlineScorer<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineScorer")
            .field("references", &self.references.len())
            .field("decoder", &self.decoder)
            .field("scorer", &self.scorer.method())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VocabError;
    use crate::scoring::ExactMatchScorer;
    use crate::test_utils::{cat_dog_references, sample_vocab, FixedScorer};

    fn inline_scorer() -> InlineScorer {
        InlineScorer::new(
            &cat_dog_references(),
            Arc::new(sample_vocab()),
            CaptionNormalizer::default(),
            Box::new(ExactMatchScorer::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_decodes_and_scores() {
        let mut scorer = inline_scorer();
        let mut batch = IndexBatch::new();
        // <start> a cat sits <end>
        batch.insert(ImageId::Num(1), vec![0, 2, 3, 4, 1]);
        // <start> a cat runs <end>
        batch.insert(ImageId::Num(2), vec![0, 2, 3, 6, 1]);

        let (average, per_item) = scorer.score_batch(&batch).unwrap();
        assert_eq!(per_item, vec![1.0, 0.0]);
        assert!((average - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_reference_is_lookup_error() {
        let mut scorer = inline_scorer();
        let mut batch = IndexBatch::new();
        batch.insert(ImageId::Num(1), vec![0, 2, 3, 4, 1]);
        batch.insert(ImageId::Num(77), vec![0, 2, 1]);

        let err = scorer.score_batch(&batch).unwrap_err();
        assert!(matches!(err, EvalError::MissingReference(ImageId::Num(77))));
    }

    #[test]
    fn test_rejects_empty_batch() {
        let mut scorer = inline_scorer();
        let result = scorer.score_batch(&IndexBatch::new());
        assert!(matches!(result, Err(EvalError::InvalidCandidates(_))));
    }

    #[test]
    fn test_rejects_multi_metric_scorer() {
        let result: Result<InlineScorer, _> = InlineScorer::new(
            &cat_dog_references(),
            Arc::new(sample_vocab()),
            CaptionNormalizer::default(),
            Box::new(FixedScorer::vector(vec![0.1, 0.2], vec![vec![], vec![]])),
        );
        assert!(matches!(
            result,
            Err(EvalError::Pipeline(PipelineError::NotSingleMetric { count: 2, .. }))
        ));
    }

    #[test]
    fn test_requires_boundary_tokens() {
        let result: Result<InlineScorer, _> = InlineScorer::new(
            &cat_dog_references(),
            Arc::new(Vocab::from_words(["a", "cat"])),
            CaptionNormalizer::default(),
            Box::new(ExactMatchScorer::new()),
        );
        assert!(matches!(
            result,
            Err(EvalError::Vocab(VocabError::MissingSpecialToken(_)))
        ));
    }

    #[test]
    fn test_custom_filter_keeps_markers() {
        let mut scorer = inline_scorer().with_filtered_indices(Vec::new());
        assert!(scorer.decoder().filtered().is_empty());

        let mut batch = IndexBatch::new();
        batch.insert(ImageId::Num(1), vec![0, 2, 3, 4, 1]);
        // "<start> a cat sits <end>" no longer matches the reference
        let (_, per_item) = scorer.score_batch(&batch).unwrap();
        assert_eq!(per_item, vec![0.0]);
    }

    #[test]
    fn test_scorer_output_returned_unchanged() {
        let mut scorer = InlineScorer::new(
            &cat_dog_references(),
            Arc::new(sample_vocab()),
            CaptionNormalizer::default(),
            Box::new(FixedScorer::scalar(0.42, vec![0.3, 0.54])),
        )
        .unwrap();

        let mut batch = IndexBatch::new();
        batch.insert(ImageId::Num(1), vec![2, 3]);
        batch.insert(ImageId::Num(2), vec![2, 5]);
        let (average, per_item) = scorer.score_batch(&batch).unwrap();
        assert!((average - 0.42).abs() < 1e-12);
        assert_eq!(per_item, vec![0.3, 0.54]);
    }
}
