//! Core data types shared by every stage of an evaluation.
//!
//! Caption mappings are `BTreeMap`s keyed by [`ImageId`], so iterating any
//! mapping yields items in one deterministic order. Stages that produce
//! positional per-item scores never rely on that implicitly: the evaluator
//! materializes the order once as a `Vec<ImageId>` and threads it through
//! scoring and aggregation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identifier of one evaluation unit (an image).
///
/// COCO-style datasets use integer ids; other datasets use strings. Both
/// serialize untagged, so `"image_id": 42` and `"image_id": "img_42"` both
/// round-trip through JSON unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageId {
    /// Numeric id
    Num(u64),
    /// String id
    Text(String),
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageId::Num(n) => write!(f, "{}", n),
            ImageId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ImageId {
    fn from(id: u64) -> Self {
        ImageId::Num(id)
    }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self {
        ImageId::Text(id.to_string())
    }
}

impl From<String> for ImageId {
    fn from(id: String) -> Self {
        ImageId::Text(id)
    }
}

/// A single reference or candidate caption annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionRecord {
    /// Raw caption text, possibly empty
    pub caption: String,
}

impl CaptionRecord {
    /// Creates a caption record.
    pub fn new(caption: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
        }
    }
}

/// Raw captions per item: one or more references, or exactly one candidate.
pub type RawAnnotations = BTreeMap<ImageId, Vec<CaptionRecord>>;

/// Tokenized captions per item, in the same order as the raw records.
///
/// Candidate mappings hold exactly one string per item.
pub type TokenizedAnnotations = BTreeMap<ImageId, Vec<String>>;

/// Vocabulary-index captions per item, as produced by a caption model.
pub type IndexBatch = BTreeMap<ImageId, Vec<u32>>;

/// Builds a candidate mapping holding one caption per item.
pub fn single_captions<I, K, S>(captions: I) -> RawAnnotations
where
    I: IntoIterator<Item = (K, S)>,
    K: Into<ImageId>,
    S: Into<String>,
{
    captions
        .into_iter()
        .map(|(id, caption)| (id.into(), vec![CaptionRecord::new(caption)]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_id_json_untagged() {
        let num: ImageId = serde_json::from_str("42").unwrap();
        let text: ImageId = serde_json::from_str("\"img_42\"").unwrap();

        assert_eq!(num, ImageId::Num(42));
        assert_eq!(text, ImageId::Text("img_42".to_string()));
        assert_eq!(serde_json::to_string(&num).unwrap(), "42");
    }

    #[test]
    fn test_image_id_order_is_total() {
        let mut ids = vec![
            ImageId::Text("b".into()),
            ImageId::Num(10),
            ImageId::Text("a".into()),
            ImageId::Num(2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                ImageId::Num(2),
                ImageId::Num(10),
                ImageId::Text("a".into()),
                ImageId::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_single_captions() {
        let captions = single_captions([(1u64, "a cat"), (2u64, "a dog")]);
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[&ImageId::Num(1)], vec![CaptionRecord::new("a cat")]);
    }
}
