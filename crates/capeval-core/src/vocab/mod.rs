//! Caption vocabulary and index-sequence decoding.
//!
//! Caption models emit captions as sequences of vocabulary indices. Before
//! any text metric can run, those sequences are decoded back into caption
//! text with [`VocabDecoder`], which needs index→word lookup and the
//! indices of the sequence boundary markers.
//!
//! # Example
//!
//! ```
//! use capeval_core::vocab::{Vocab, VocabDecoder};
//!
//! let vocab = Vocab::from_words(["<start>", "<end>", "a", "cat", "sits"]);
//! let decoder = VocabDecoder::for_vocab(&vocab).unwrap();
//!
//! assert_eq!(decoder.decode(&vocab, &[0, 2, 3, 4, 1]), "a cat sits");
//! ```

mod decoder;

pub use decoder::{decode_indices, VocabDecoder};

use crate::config::{END_TOKEN, START_TOKEN, UNK_TOKEN};
use crate::error::VocabError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Index↔word lookup used to decode model output.
///
/// Implementations must be pure lookups: decoding the same sequence twice
/// yields the same caption.
pub trait Vocabulary {
    /// Word for an index, or `None` when the index has no mapping.
    fn word(&self, index: u32) -> Option<&str>;

    /// Index of a word, or `None` when the word is not in the vocabulary.
    fn index(&self, word: &str) -> Option<u32>;

    /// Indices of the sequence start/end markers.
    ///
    /// Used as the default set of indices dropped before decoding.
    ///
    /// # Errors
    ///
    /// Returns `VocabError::MissingSpecialToken` if either marker is absent.
    fn boundary_indices(&self) -> Result<Vec<u32>, VocabError> {
        [START_TOKEN, END_TOKEN]
            .iter()
            .map(|token| {
                self.index(token)
                    .ok_or_else(|| VocabError::MissingSpecialToken(token.to_string()))
            })
            .collect()
    }
}

/// In-memory word vocabulary.
///
/// Indices are assigned in insertion order, starting at zero.
#[derive(Debug, Clone, Default)]
pub struct Vocab {
    word_to_index: HashMap<String, u32>,
    index_to_word: HashMap<u32, String>,
    next_index: u32,
}

/// Accepted JSON layouts for a vocabulary file.
#[derive(Deserialize)]
#[serde(untagged)]
enum VocabFile {
    /// `{"idx2word": {"0": "<start>", ...}}`
    ///
    /// Keys stay strings here: untagged enums cannot parse numeric map keys.
    Indexed { idx2word: BTreeMap<String, String> },
    /// `["<start>", "<end>", ...]`, index = position
    Words(Vec<String>),
}

impl Vocab {
    /// Creates an empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vocabulary from words, indexed by position.
    ///
    /// Repeated words keep their first index.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self::new();
        for word in words {
            vocab.add_word(word);
        }
        vocab
    }

    /// Parses a vocabulary from JSON.
    ///
    /// Accepts either an `idx2word` object or a plain word list.
    ///
    /// # Errors
    ///
    /// Returns `VocabError::Invalid` on malformed JSON or when two indices
    /// map to the same word.
    pub fn from_json(json: &str) -> Result<Self, VocabError> {
        let file: VocabFile =
            serde_json::from_str(json).map_err(|e| VocabError::Invalid(e.to_string()))?;

        match file {
            VocabFile::Words(words) => Ok(Self::from_words(words)),
            VocabFile::Indexed { idx2word } => {
                let mut vocab = Self::new();
                for (key, word) in idx2word {
                    let index: u32 = key.parse().map_err(|_| {
                        VocabError::Invalid(format!("index {:?} is not a non-negative integer", key))
                    })?;
                    if let Some(existing) = vocab.word_to_index.get(&word) {
                        return Err(VocabError::Invalid(format!(
                            "word {:?} mapped by both {} and {}",
                            word, existing, index
                        )));
                    }
                    vocab.word_to_index.insert(word.clone(), index);
                    vocab.index_to_word.insert(index, word);
                    vocab.next_index = vocab.next_index.max(index.saturating_add(1));
                }
                Ok(vocab)
            }
        }
    }

    /// Adds a word if absent and returns its index.
    pub fn add_word(&mut self, word: impl Into<String>) -> u32 {
        let word = word.into();
        if let Some(&index) = self.word_to_index.get(&word) {
            return index;
        }
        let index = self.next_index;
        self.word_to_index.insert(word.clone(), index);
        self.index_to_word.insert(index, word);
        self.next_index += 1;
        index
    }

    /// Index of a word, falling back to the `<unk>` index.
    ///
    /// Returns `None` only if neither the word nor `<unk>` is present.
    pub fn lookup(&self, word: &str) -> Option<u32> {
        self.index(word).or_else(|| self.index(UNK_TOKEN))
    }

    /// Number of words in the vocabulary.
    pub fn len(&self) -> usize {
        self.index_to_word.len()
    }

    /// Returns true if the vocabulary has no words.
    pub fn is_empty(&self) -> bool {
        self.index_to_word.is_empty()
    }
}

impl Vocabulary for Vocab {
    fn word(&self, index: u32) -> Option<&str> {
        self.index_to_word.get(&index).map(String::as_str)
    }

    fn index(&self, word: &str) -> Option<u32> {
        self.word_to_index.get(word).copied()
    }
}
