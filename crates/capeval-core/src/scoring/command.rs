//! Scorer backed by an external process.
//!
//! Metric implementations (BLEU, METEOR, ROUGE-L, CIDEr, SPICE) live in
//! separate programs. Each call spawns the program once, writes one JSON
//! request to its stdin and reads one JSON response from its stdout:
//!
//! ```text
//! request:  {"method": "Bleu", "items": [{"image_id": 1, "references": ["..."], "candidate": "..."}]}
//! scalar:   {"score": 0.71, "scores": [0.9, 0.52]}
//! vector:   {"score": [0.8, 0.6], "scores": [[0.9, 0.7], [0.5, 0.7]]}
//! ```
//!
//! Per-item scores follow request order. A vector response carries one
//! per-item list per declared metric name.

use super::{MetricNames, Scorer, ScorerOutput, ScoringBatch};
use crate::error::ScorerError;
use crate::types::ImageId;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

#[derive(Serialize)]
struct Request<'a> {
    method: &'a str,
    items: Vec<RequestItem<'a>>,
}

#[derive(Serialize)]
struct RequestItem<'a> {
    image_id: &'a ImageId,
    references: &'a [String],
    candidate: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CorpusScore {
    One(f64),
    Many(Vec<f64>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PerItemScores {
    Flat(Vec<f64>),
    Nested(Vec<Vec<f64>>),
}

#[derive(Deserialize)]
struct Response {
    score: CorpusScore,
    scores: PerItemScores,
}

/// Scorer that delegates to an external program.
#[derive(Debug, Clone)]
pub struct CommandScorer {
    method: String,
    names: MetricNames,
    program: String,
    args: Vec<String>,
}

impl CommandScorer {
    /// Creates a scorer running `program` with no arguments.
    pub fn new(
        method: impl Into<String>,
        names: impl Into<MetricNames>,
        program: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            names: names.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Sets the program arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Program path or name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Program arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn encode_request(&self, batch: &ScoringBatch<'_>) -> Result<Vec<u8>, ScorerError> {
        let request = Request {
            method: &self.method,
            items: batch
                .items()
                .iter()
                .map(|item| RequestItem {
                    image_id: item.id,
                    references: item.references,
                    candidate: item.candidate,
                })
                .collect(),
        };
        serde_json::to_vec(&request)
            .map_err(|e| ScorerError::Protocol(format!("Failed to encode request: {}", e)))
    }

    fn exchange(&self, request: Vec<u8>) -> Result<Vec<u8>, ScorerError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ScorerError::Process(format!("Failed to start {}: {}", self.program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScorerError::Process("Child stdin unavailable".to_string()))?;

        // Written from a separate thread so a child that streams output
        // before draining stdin cannot deadlock us
        let writer = thread::spawn(move || stdin.write_all(&request));

        let output = child
            .wait_with_output()
            .map_err(|e| ScorerError::Process(format!("Failed to wait for {}: {}", self.program, e)))?;

        let write_result = writer
            .join()
            .map_err(|_| ScorerError::Process("Request writer panicked".to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScorerError::Process(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        // A child may exit successfully without reading its whole input
        if let Err(e) = write_result {
            debug!("{} closed stdin early: {}", self.program, e);
        }

        Ok(output.stdout)
    }
}

/// Converts a parsed response into a scorer output.
fn decode_response(bytes: &[u8]) -> Result<ScorerOutput, ScorerError> {
    let response: Response = serde_json::from_slice(bytes)
        .map_err(|e| ScorerError::Protocol(format!("Invalid JSON response: {}", e)))?;

    match (response.score, response.scores) {
        (CorpusScore::One(corpus), PerItemScores::Flat(per_item)) => {
            Ok(ScorerOutput::Scalar { corpus, per_item })
        }
        (CorpusScore::Many(corpus), PerItemScores::Nested(per_item)) => {
            Ok(ScorerOutput::Vector { corpus, per_item })
        }
        // An empty batch decodes as Flat; pair it with a vector corpus score
        (CorpusScore::Many(corpus), PerItemScores::Flat(flat)) if flat.is_empty() => {
            let per_item = vec![Vec::new(); corpus.len()];
            Ok(ScorerOutput::Vector { corpus, per_item })
        }
        _ => Err(ScorerError::Protocol(
            "score and scores must both be scalar-shaped or both vector-shaped".to_string(),
        )),
    }
}

impl Scorer for CommandScorer {
    fn method(&self) -> &str {
        &self.method
    }

    fn metric_names(&self) -> MetricNames {
        self.names.clone()
    }

    fn compute_score(&mut self, batch: &ScoringBatch<'_>) -> Result<ScorerOutput, ScorerError> {
        let request = self.encode_request(batch)?;
        debug!(
            "Sending {} items ({} bytes) to {}",
            batch.len(),
            request.len(),
            self.program
        );
        let stdout = self.exchange(request)?;
        decode_response(&stdout)
    }
}
