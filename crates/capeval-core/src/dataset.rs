//! Loading of COCO-format caption files.
//!
//! - Captions file: `{"images": [{"id": 1}, ...], "annotations": [{"image_id": 1, "caption": "..."}]}`
//! - Results file: `[{"image_id": 1, "caption": "..."}]`
//! - Index file: `[{"image_id": 1, "indices": [0, 4, 2, 1]}]`
//!
//! Extra fields (`id`, `file_name`, `width`, ...) are ignored.

use crate::error::{DatasetError, EvalError};
use crate::references::AnnotationSource;
use crate::types::{CaptionRecord, ImageId, IndexBatch, RawAnnotations};
use crate::vocab::Vocab;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Deserialize)]
struct ImageEntry {
    id: ImageId,
}

#[derive(Deserialize)]
struct CaptionEntry {
    image_id: ImageId,
    caption: String,
}

#[derive(Deserialize)]
struct IndexEntry {
    image_id: ImageId,
    indices: Vec<u32>,
}

#[derive(Deserialize)]
struct CaptionsFile {
    #[serde(default)]
    images: Vec<ImageEntry>,
    annotations: Vec<CaptionEntry>,
}

/// Reference captions in the COCO captions layout.
///
/// Images listed without annotations have an empty reference list.
#[derive(Debug, Clone, Default)]
pub struct CocoCaptions {
    annotations: BTreeMap<ImageId, Vec<CaptionRecord>>,
}

impl CocoCaptions {
    /// Parses a captions file from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let file: CaptionsFile = parse("<memory>", json)?;
        Ok(Self::from_file(file))
    }

    /// Reads and parses a captions file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file: CaptionsFile = read_json(path)?;
        let captions = Self::from_file(file);
        info!(
            "Loaded {} reference captions for {} images from {}",
            captions.annotations.values().map(Vec::len).sum::<usize>(),
            captions.annotations.len(),
            path.display()
        );
        Ok(captions)
    }

    fn from_file(file: CaptionsFile) -> Self {
        let mut annotations: BTreeMap<ImageId, Vec<CaptionRecord>> = BTreeMap::new();
        for image in file.images {
            annotations.entry(image.id).or_default();
        }
        for entry in file.annotations {
            annotations
                .entry(entry.image_id)
                .or_default()
                .push(CaptionRecord::new(entry.caption));
        }
        Self { annotations }
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// Returns true if there are no images.
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

impl AnnotationSource for CocoCaptions {
    fn image_ids(&self) -> Vec<ImageId> {
        self.annotations.keys().cloned().collect()
    }

    fn annotations(&self, id: &ImageId) -> Option<&[CaptionRecord]> {
        self.annotations.get(id).map(Vec::as_slice)
    }
}

/// Loads candidate captions from a COCO results file.
///
/// Every entry becomes one caption record; an image listed twice yields
/// two records, which evaluation rejects.
pub fn load_results(path: impl AsRef<Path>) -> Result<RawAnnotations, DatasetError> {
    let entries: Vec<CaptionEntry> = read_json(path.as_ref())?;
    Ok(group_captions(entries))
}

/// Parses candidate captions from a COCO results JSON string.
pub fn parse_results(json: &str) -> Result<RawAnnotations, DatasetError> {
    let entries: Vec<CaptionEntry> = parse("<memory>", json)?;
    Ok(group_captions(entries))
}

fn group_captions(entries: Vec<CaptionEntry>) -> RawAnnotations {
    let mut results = RawAnnotations::new();
    for entry in entries {
        results
            .entry(entry.image_id)
            .or_default()
            .push(CaptionRecord::new(entry.caption));
    }
    results
}

/// Loads index-sequence captions.
///
/// # Errors
///
/// Returns `DatasetError::Parse` if an image id appears twice.
pub fn load_index_batch(path: impl AsRef<Path>) -> Result<IndexBatch, DatasetError> {
    let path = path.as_ref();
    let entries: Vec<IndexEntry> = read_json(path)?;
    let mut batch = IndexBatch::new();
    for entry in entries {
        let id = entry.image_id.clone();
        if batch.insert(entry.image_id, entry.indices).is_some() {
            return Err(DatasetError::Parse {
                path: path.display().to_string(),
                message: format!("image {} listed more than once", id),
            });
        }
    }
    Ok(batch)
}

/// Loads a vocabulary file.
///
/// Accepts either `{"idx2word": {"0": "<start>", ...}}` or a plain word list.
pub fn load_vocab(path: impl AsRef<Path>) -> Result<Vocab, EvalError> {
    let path = path.as_ref();
    let json = read_to_string(path)?;
    let vocab = Vocab::from_json(&json)?;
    info!("Loaded {} vocabulary words from {}", vocab.len(), path.display());
    Ok(vocab)
}

fn read_to_string(path: &Path) -> Result<String, DatasetError> {
    std::fs::read_to_string(path).map_err(|e| DatasetError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DatasetError> {
    let json = read_to_string(path)?;
    parse(&path.display().to_string(), &json)
}

fn parse<T: DeserializeOwned>(path: &str, json: &str) -> Result<T, DatasetError> {
    serde_json::from_str(json).map_err(|e| DatasetError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })
}
