//! Caption normalization.
//!
//! Every metric compares captions in one canonical token form. This module
//! wraps an external [`CaptionTokenizer`] in a [`CaptionNormalizer`] that
//! enforces the tokenizer contract: the output has exactly the input's item
//! set, and one normalized string per input caption, in order.
//!
//! References and candidates go through the same normalizer, whether the
//! candidates were free text or decoded from vocabulary indices.
//!
//! # Implementations
//!
//! - [`BertCaptionTokenizer`] - lowercasing + punctuation split built on the
//!   `tokenizers` crate, dropping PTB punctuation tokens

mod bert;

pub use bert::BertCaptionTokenizer;

use crate::error::TokenizeError;
use crate::types::{RawAnnotations, TokenizedAnnotations};
use std::sync::Arc;
use tracing::debug;

/// Tokenizer over whole caption mappings.
///
/// Implementations must be `Send + Sync` so a normalizer (and the reference
/// set it produced) can be shared across threads.
pub trait CaptionTokenizer: Send + Sync {
    /// Tokenizes every caption of every item.
    ///
    /// Must return one string per input caption, in input order, for every
    /// input item.
    fn tokenize(&self, captions: &RawAnnotations) -> Result<TokenizedAnnotations, TokenizeError>;
}

/// Contract-checking wrapper around a [`CaptionTokenizer`].
#[derive(Clone)]
pub struct CaptionNormalizer {
    tokenizer: Arc<dyn CaptionTokenizer>,
}

impl CaptionNormalizer {
    /// Creates a normalizer around a tokenizer.
    pub fn new(tokenizer: Arc<dyn CaptionTokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Returns the wrapped tokenizer.
    pub fn tokenizer(&self) -> &dyn CaptionTokenizer {
        self.tokenizer.as_ref()
    }

    /// Normalizes a raw caption mapping.
    ///
    /// # Errors
    ///
    /// Propagates tokenizer failures, and returns `TokenizeError::KeyMismatch`
    /// if the tokenizer added or dropped an item, or changed an item's
    /// caption count.
    pub fn normalize(&self, raw: &RawAnnotations) -> Result<TokenizedAnnotations, TokenizeError> {
        let caption_count: usize = raw.values().map(Vec::len).sum();
        debug!(
            "Normalizing {} captions across {} items",
            caption_count,
            raw.len()
        );

        let tokenized = self.tokenizer.tokenize(raw)?;

        if tokenized.len() != raw.len() {
            return Err(TokenizeError::KeyMismatch(format!(
                "expected {} items, tokenizer returned {}",
                raw.len(),
                tokenized.len()
            )));
        }

        for (id, records) in raw {
            match tokenized.get(id) {
                None => {
                    return Err(TokenizeError::KeyMismatch(format!(
                        "image {} missing from tokenizer output",
                        id
                    )))
                }
                Some(tokens) if tokens.len() != records.len() => {
                    return Err(TokenizeError::KeyMismatch(format!(
                        "image {} has {} captions but {} tokenized",
                        id,
                        records.len(),
                        tokens.len()
                    )))
                }
                Some(_) => {}
            }
        }

        Ok(tokenized)
    }
}

impl Default for CaptionNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(BertCaptionTokenizer::new()))
    }
}

impl std::fmt::Debug for CaptionNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionNormalizer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaptionRecord, ImageId};

    /// Tokenizer that forgets the last item.
    struct DroppingTokenizer;

    impl CaptionTokenizer for DroppingTokenizer {
        fn tokenize(
            &self,
            captions: &RawAnnotations,
        ) -> Result<TokenizedAnnotations, TokenizeError> {
            let keep = captions.len().saturating_sub(1);
            Ok(captions
                .iter()
                .take(keep)
                .map(|(id, recs)| (id.clone(), recs.iter().map(|r| r.caption.clone()).collect()))
                .collect())
        }
    }

    /// Tokenizer that merges all captions of an item into one.
    struct MergingTokenizer;

    impl CaptionTokenizer for MergingTokenizer {
        fn tokenize(
            &self,
            captions: &RawAnnotations,
        ) -> Result<TokenizedAnnotations, TokenizeError> {
            Ok(captions
                .iter()
                .map(|(id, recs)| {
                    let merged: Vec<&str> = recs.iter().map(|r| r.caption.as_str()).collect();
                    (id.clone(), vec![merged.join(" ")])
                })
                .collect())
        }
    }

    fn two_items() -> RawAnnotations {
        let mut raw = RawAnnotations::new();
        raw.insert(
            ImageId::Num(1),
            vec![CaptionRecord::new("A cat."), CaptionRecord::new("A kitten!")],
        );
        raw.insert(ImageId::Num(2), vec![CaptionRecord::new("")]);
        raw
    }

    #[test]
    fn test_default_normalizer_preserves_keys_and_order() {
        let normalizer = CaptionNormalizer::default();
        let tokenized = normalizer.normalize(&two_items()).unwrap();

        assert_eq!(tokenized.len(), 2);
        assert_eq!(tokenized[&ImageId::Num(1)], vec!["a cat", "a kitten"]);
        // Empty captions survive as empty strings
        assert_eq!(tokenized[&ImageId::Num(2)], vec![""]);
    }

    #[test]
    fn test_dropped_item_is_rejected() {
        let normalizer = CaptionNormalizer::new(Arc::new(DroppingTokenizer));
        let result = normalizer.normalize(&two_items());
        assert!(matches!(result, Err(TokenizeError::KeyMismatch(_))));
    }

    #[test]
    fn test_changed_caption_count_is_rejected() {
        let normalizer = CaptionNormalizer::new(Arc::new(MergingTokenizer));
        let result = normalizer.normalize(&two_items());
        assert!(matches!(result, Err(TokenizeError::KeyMismatch(_))));
    }

    #[test]
    fn test_empty_mapping() {
        let normalizer = CaptionNormalizer::default();
        assert!(normalizer.normalize(&RawAnnotations::new()).unwrap().is_empty());
    }
}
