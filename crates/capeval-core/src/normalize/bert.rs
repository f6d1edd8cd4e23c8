//! Caption tokenizer built on the HuggingFace `tokenizers` building blocks.
//!
//! Uses `BertNormalizer` (text cleanup, lowercasing, accent stripping) and
//! `BertPreTokenizer` (split on whitespace and punctuation), then drops the
//! PTB punctuation tokens. Contractions split at the apostrophe, so
//! "don't" becomes "don t" rather than the PTB "do n't".

use super::CaptionTokenizer;
use crate::config::PTB_PUNCTUATION;
use crate::error::TokenizeError;
use crate::types::{RawAnnotations, TokenizedAnnotations};
use std::collections::HashSet;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::{
    NormalizedString, Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer,
};

/// Default caption tokenizer.
///
/// # Examples
///
/// ```
/// use capeval_core::normalize::BertCaptionTokenizer;
///
/// let tokenizer = BertCaptionTokenizer::new();
/// let tokens = tokenizer.tokenize_caption("A man, riding a Horse.").unwrap();
/// assert_eq!(tokens, "a man riding a horse");
/// ```
#[derive(Debug, Clone)]
pub struct BertCaptionTokenizer {
    normalizer: BertNormalizer,
    pre_tokenizer: BertPreTokenizer,
    dropped: HashSet<String>,
}

impl BertCaptionTokenizer {
    /// Creates a tokenizer dropping the standard PTB punctuation.
    pub fn new() -> Self {
        Self::with_dropped_tokens(PTB_PUNCTUATION.iter().copied())
    }

    /// Creates a tokenizer dropping a custom token set.
    pub fn with_dropped_tokens<I, S>(dropped: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            // clean_text, handle_chinese_chars, strip_accents (follows lowercase), lowercase
            normalizer: BertNormalizer::new(true, true, None, true),
            pre_tokenizer: BertPreTokenizer,
            dropped: dropped.into_iter().map(Into::into).collect(),
        }
    }

    /// Tokenizes one caption into space-joined tokens.
    ///
    /// # Errors
    ///
    /// Returns `TokenizeError::Failed` if normalization or splitting fails.
    pub fn tokenize_caption(&self, caption: &str) -> Result<String, TokenizeError> {
        let mut normalized = NormalizedString::from(caption);
        self.normalizer
            .normalize(&mut normalized)
            .map_err(|e| TokenizeError::Failed(format!("Normalization failed: {}", e)))?;

        let mut pretokenized = PreTokenizedString::from(normalized);
        self.pre_tokenizer
            .pre_tokenize(&mut pretokenized)
            .map_err(|e| TokenizeError::Failed(format!("Splitting failed: {}", e)))?;

        let tokens: Vec<&str> = pretokenized
            .get_splits(OffsetReferential::Normalized, OffsetType::Byte)
            .into_iter()
            .map(|(token, _, _)| token)
            .filter(|token| !self.dropped.contains(*token))
            .collect();

        Ok(tokens.join(" "))
    }
}

impl Default for BertCaptionTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionTokenizer for BertCaptionTokenizer {
    fn tokenize(&self, captions: &RawAnnotations) -> Result<TokenizedAnnotations, TokenizeError> {
        captions
            .iter()
            .map(|(id, records)| {
                let tokens = records
                    .iter()
                    .map(|record| self.tokenize_caption(&record.caption))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((id.clone(), tokens))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        let tokenizer = BertCaptionTokenizer::new();
        assert_eq!(
            tokenizer.tokenize_caption("Two DOGS play; one runs!").unwrap(),
            "two dogs play one runs"
        );
    }

    #[test]
    fn test_collapses_whitespace() {
        let tokenizer = BertCaptionTokenizer::new();
        assert_eq!(
            tokenizer.tokenize_caption("  a   cat \t sits\n").unwrap(),
            "a cat sits"
        );
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        let tokenizer = BertCaptionTokenizer::new();
        assert_eq!(tokenizer.tokenize_caption("").unwrap(), "");
        assert_eq!(tokenizer.tokenize_caption(" . , !").unwrap(), "");
    }

    #[test]
    fn test_custom_dropped_tokens() {
        let tokenizer = BertCaptionTokenizer::with_dropped_tokens(["a"]);
        // Punctuation is kept when not in the dropped set
        assert_eq!(tokenizer.tokenize_caption("a cat.").unwrap(), "cat .");
    }

    #[test]
    fn test_strips_accents() {
        let tokenizer = BertCaptionTokenizer::new();
        assert_eq!(tokenizer.tokenize_caption("Café").unwrap(), "cafe");
    }
}
