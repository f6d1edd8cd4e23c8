//! Decoding of vocabulary-index captions into caption text.

use super::Vocabulary;
use crate::config::UNK_TOKEN;
use crate::error::VocabError;
use crate::types::{CaptionRecord, IndexBatch, RawAnnotations};
use std::collections::HashSet;

/// Decodes one index sequence into a caption string.
///
/// Indices in `filtered` are dropped silently. Every remaining index maps to
/// its word, or to `unk_token` when the vocabulary has no word for it; no
/// index is dropped for being unknown. Words are joined with single spaces
/// and the result is trimmed, so a sequence that filters down to nothing
/// decodes to the empty string.
pub fn decode_indices<V>(
    indices: &[u32],
    vocab: &V,
    filtered: &HashSet<u32>,
    unk_token: &str,
) -> String
where
    V: Vocabulary + ?Sized,
{
    let words: Vec<&str> = indices
        .iter()
        .filter(|index| !filtered.contains(index))
        .map(|&index| vocab.word(index).unwrap_or(unk_token))
        .collect();

    words.join(" ").trim().to_string()
}

/// Reusable decoder holding the filter set and unknown-word placeholder.
///
/// # Examples
///
/// ```
/// use capeval_core::vocab::{Vocab, VocabDecoder};
///
/// let vocab = Vocab::from_words(["<start>", "<end>", "a", "cat"]);
/// let decoder = VocabDecoder::for_vocab(&vocab).unwrap();
///
/// // 17 has no word and becomes the placeholder
/// assert_eq!(decoder.decode(&vocab, &[0, 2, 17, 1]), "a <unk>");
/// ```
#[derive(Debug, Clone)]
pub struct VocabDecoder {
    filtered: HashSet<u32>,
    unk_token: String,
}

impl VocabDecoder {
    /// Creates a decoder with an explicit filter set.
    pub fn new(filtered: impl IntoIterator<Item = u32>, unk_token: impl Into<String>) -> Self {
        Self {
            filtered: filtered.into_iter().collect(),
            unk_token: unk_token.into(),
        }
    }

    /// Creates a decoder that drops the vocabulary's start/end markers.
    ///
    /// # Errors
    ///
    /// Returns `VocabError::MissingSpecialToken` if a marker is absent.
    pub fn for_vocab<V>(vocab: &V) -> Result<Self, VocabError>
    where
        V: Vocabulary + ?Sized,
    {
        Ok(Self::new(vocab.boundary_indices()?, UNK_TOKEN))
    }

    /// Returns the indices dropped before decoding.
    pub fn filtered(&self) -> &HashSet<u32> {
        &self.filtered
    }

    /// Returns the placeholder used for unmapped indices.
    pub fn unk_token(&self) -> &str {
        &self.unk_token
    }

    /// Decodes one index sequence.
    pub fn decode<V>(&self, vocab: &V, indices: &[u32]) -> String
    where
        V: Vocabulary + ?Sized,
    {
        decode_indices(indices, vocab, &self.filtered, &self.unk_token)
    }

    /// Decodes every sequence of a batch into a one-candidate raw mapping.
    pub fn decode_batch<V>(&self, vocab: &V, batch: &IndexBatch) -> RawAnnotations
    where
        V: Vocabulary + ?Sized,
    {
        batch
            .iter()
            .map(|(id, indices)| {
                (
                    id.clone(),
                    vec![CaptionRecord::new(self.decode(vocab, indices))],
                )
            })
            .collect()
    }
}
