//! Reference caption sources and the cached, normalized reference set.
//!
//! Reference captions are static for the lifetime of an evaluator, and
//! the reference corpus is usually far larger than a single candidate
//! batch. [`ReferenceSet`] therefore normalizes the references exactly once
//! at construction and is immutable afterwards. Wrap it in an `Arc` to
//! share it read-only between evaluators.

use crate::error::{EvalError, TokenizeError};
use crate::normalize::CaptionNormalizer;
use crate::types::{CaptionRecord, ImageId, RawAnnotations, TokenizedAnnotations};
use std::collections::BTreeMap;
use tracing::info;

/// Supplier of reference captions.
///
/// Mirrors the image-id list + id-to-annotations lookup of a COCO-style
/// annotation store.
pub trait AnnotationSource {
    /// All item ids with references, in a stable order.
    fn image_ids(&self) -> Vec<ImageId>;

    /// Reference captions of one item, or `None` for an unknown id.
    fn annotations(&self, id: &ImageId) -> Option<&[CaptionRecord]>;

    /// Collects every item's references into a raw mapping.
    ///
    /// Ids listed by `image_ids` without annotations map to an empty list.
    fn to_raw(&self) -> RawAnnotations {
        self.image_ids()
            .into_iter()
            .map(|id| {
                let records = self.annotations(&id).map(<[_]>::to_vec).unwrap_or_default();
                (id, records)
            })
            .collect()
    }
}

/// In-memory annotation source.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAnnotations {
    annotations: BTreeMap<ImageId, Vec<CaptionRecord>>,
}

impl InMemoryAnnotations {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reference caption to an item.
    pub fn add(&mut self, id: impl Into<ImageId>, caption: impl Into<String>) {
        self.annotations
            .entry(id.into())
            .or_default()
            .push(CaptionRecord::new(caption));
    }

    /// Registers an item with no references.
    pub fn add_image(&mut self, id: impl Into<ImageId>) {
        self.annotations.entry(id.into()).or_default();
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// Returns true if there are no items.
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

impl From<RawAnnotations> for InMemoryAnnotations {
    fn from(annotations: RawAnnotations) -> Self {
        Self { annotations }
    }
}

impl AnnotationSource for InMemoryAnnotations {
    fn image_ids(&self) -> Vec<ImageId> {
        self.annotations.keys().cloned().collect()
    }

    fn annotations(&self, id: &ImageId) -> Option<&[CaptionRecord]> {
        self.annotations.get(id).map(Vec::as_slice)
    }
}

/// Normalized reference captions, computed once.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    tokenized: TokenizedAnnotations,
}

impl ReferenceSet {
    /// Loads and normalizes every reference of a source.
    ///
    /// # Errors
    ///
    /// Propagates tokenizer failures.
    pub fn from_source<S>(source: &S, normalizer: &CaptionNormalizer) -> Result<Self, TokenizeError>
    where
        S: AnnotationSource + ?Sized,
    {
        let raw = source.to_raw();
        let tokenized = normalizer.normalize(&raw)?;
        info!(
            "Tokenized {} reference captions for {} images",
            tokenized.values().map(Vec::len).sum::<usize>(),
            tokenized.len()
        );
        Ok(Self { tokenized })
    }

    /// Wraps an already-normalized mapping.
    pub fn from_tokenized(tokenized: TokenizedAnnotations) -> Self {
        Self { tokenized }
    }

    /// Returns the full normalized mapping.
    pub fn tokenized(&self) -> &TokenizedAnnotations {
        &self.tokenized
    }

    /// Normalized references of one item.
    pub fn get(&self, id: &ImageId) -> Option<&[String]> {
        self.tokenized.get(id).map(Vec::as_slice)
    }

    /// Returns true if the item has a reference entry.
    pub fn contains(&self, id: &ImageId) -> bool {
        self.tokenized.contains_key(id)
    }

    /// Checks that every id has at least one reference caption.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::MissingReference` for the first id (in iteration
    /// order) with no entry or an empty reference list.
    pub fn require_all<'a, I>(&self, ids: I) -> Result<(), EvalError>
    where
        I: IntoIterator<Item = &'a ImageId>,
    {
        match ids
            .into_iter()
            .find(|id| self.get(id).map_or(true, <[String]>::is_empty))
        {
            Some(missing) => Err(EvalError::MissingReference(missing.clone())),
            None => Ok(()),
        }
    }

    /// Number of items with references.
    pub fn len(&self) -> usize {
        self.tokenized.len()
    }

    /// Returns true if there are no references.
    pub fn is_empty(&self) -> bool {
        self.tokenized.is_empty()
    }
}
