//! Production configuration constants.
//!
//! Special vocabulary tokens, tokenizer punctuation, and the standard COCO
//! caption metric names. These values are shared by the library, the CLI,
//! and the benchmarks so that every entry point names metrics identically.
//!
//! # Usage
//!
//! ```
//! use capeval_core::config::{BLEU_METRICS, CIDER, START_TOKEN};
//!
//! assert_eq!(BLEU_METRICS.len(), 4);
//! assert_eq!(CIDER, "CIDEr");
//! assert_eq!(START_TOKEN, "<start>");
//! ```

// =============================================================================
// Vocabulary Special Tokens
// =============================================================================

/// Sequence start marker emitted by caption models.
///
/// Filtered out before decoding by default.
pub const START_TOKEN: &str = "<start>";

/// Sequence end marker emitted by caption models.
///
/// Filtered out before decoding by default.
pub const END_TOKEN: &str = "<end>";

/// Placeholder for indices and words missing from the vocabulary.
pub const UNK_TOKEN: &str = "<unk>";

/// Padding marker used when batching index sequences.
pub const PAD_TOKEN: &str = "<pad>";

// =============================================================================
// Caption Tokenization
// =============================================================================

/// Tokens dropped from tokenized captions.
///
/// Matches the punctuation set removed by the Stanford PTB tokenizer
/// pipeline used by the COCO caption evaluation tools, including the
/// bracket escapes it emits.
pub const PTB_PUNCTUATION: &[&str] = &[
    "''", "'", "``", "`", "-LRB-", "-RRB-", "-LCB-", "-RCB-", ".", "?", "!", ",", ":", "-", "--",
    "...", ";",
];

// =============================================================================
// Metric Names
// =============================================================================

/// BLEU-1 through BLEU-4, reported together by one scorer.
pub const BLEU_METRICS: [&str; 4] = ["Bleu_1", "Bleu_2", "Bleu_3", "Bleu_4"];

/// ROUGE-L metric name.
pub const ROUGE_L: &str = "ROUGE_L";

/// CIDEr metric name.
pub const CIDER: &str = "CIDEr";

/// SPICE metric name.
pub const SPICE: &str = "SPICE";

/// METEOR metric name.
pub const METEOR: &str = "METEOR";

/// Exact-match baseline metric name.
pub const EXACT_MATCH: &str = "ExactMatch";

/// Key holding the item id in every per-item result row.
pub const IMAGE_ID_KEY: &str = "image_id";
