//! Output formatting for evaluation reports.
//!
//! Supports human-readable terminal output, JSON for scripting and
//! JSON lines (one per-item row per line) for tabular tooling.

use anyhow::{Context, Result};
use capeval_core::progress::ScorerProgress;
use capeval_core::{EvalReport, ImageId};
use serde::Serialize;
use std::io::Write;

/// JSON output for the inline (index-sequence) path
#[derive(Serialize)]
pub struct InlineOutput {
    pub average: f64,
    pub per_item: Vec<InlineItem>,
}

#[derive(Serialize)]
pub struct InlineItem {
    pub image_id: ImageId,
    pub score: f64,
}

/// Formats a report as pretty JSON.
pub fn format_json(report: &EvalReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

/// Formats corpus scores for the terminal, in configured metric order.
pub fn format_human(report: &EvalReport) -> String {
    if report.is_empty() {
        return "No items evaluated".to_string();
    }

    let width = report
        .metric_names
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0);

    let mut output = format!(
        "Evaluated {} image{}:\n\n",
        report.len(),
        if report.len() == 1 { "" } else { "s" }
    );
    for name in &report.metric_names {
        if let Some(score) = report.corpus_score(name) {
            output.push_str(&format!("  {:<width$}  {:.3}\n", name, score, width = width));
        }
    }

    output.trim_end().to_string()
}

/// Writes per-item rows as JSON lines.
pub fn write_jsonl<W: Write>(report: &EvalReport, mut writer: W) -> Result<()> {
    for row in &report.per_item {
        serde_json::to_writer(&mut writer, row).context("Failed to serialize row")?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Formats inline scores for the terminal.
pub fn format_inline_human(output: &InlineOutput) -> String {
    let mut text = format!("Average: {:.3}\n", output.average);
    for item in &output.per_item {
        text.push_str(&format!("  {}: {:.3}\n", item.image_id, item.score));
    }
    text.trim_end().to_string()
}

/// Formats inline scores as pretty JSON.
pub fn format_inline_json(output: &InlineOutput) -> String {
    serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
}

/// Progress bar message: current scorer, percent done and, once a scorer
/// has finished, the estimated time left.
pub fn format_progress(progress: &ScorerProgress) -> String {
    let Some(current) = &progress.current else {
        return "Done".to_string();
    };
    let mut message = format!("{} {:.0}%", current, progress.percent_complete());
    if let Some(remaining) = progress.estimated_remaining_ms() {
        message.push_str(&format!(" (~{:.1}s left)", remaining as f64 / 1000.0));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use capeval_core::ItemScores;
    use std::collections::BTreeMap;

    fn make_report() -> EvalReport {
        let mut corpus = BTreeMap::new();
        corpus.insert("CIDEr".to_string(), 0.9);
        corpus.insert("Bleu_1".to_string(), 0.71234);

        let mut row = ItemScores::new(ImageId::Num(7));
        row.scores.insert("CIDEr".to_string(), 0.9);
        row.scores.insert("Bleu_1".to_string(), 0.71234);

        EvalReport {
            metric_names: vec!["Bleu_1".to_string(), "CIDEr".to_string()],
            corpus,
            per_item: vec![row],
        }
    }

    #[test]
    fn test_format_human_uses_configured_order() {
        let output = format_human(&make_report());
        assert!(output.contains("1 image:"));
        let bleu = output.find("Bleu_1").unwrap();
        let cider = output.find("CIDEr").unwrap();
        assert!(bleu < cider);
        assert!(output.contains("0.712"));
    }

    #[test]
    fn test_format_human_empty() {
        let report = EvalReport {
            metric_names: vec![],
            corpus: BTreeMap::new(),
            per_item: vec![],
        };
        assert_eq!(format_human(&report), "No items evaluated");
    }

    #[test]
    fn test_format_json() {
        let output = format_json(&make_report());
        assert!(output.contains("\"metric_names\""));
        assert!(output.contains("\"image_id\": 7"));
    }

    #[test]
    fn test_write_jsonl() {
        let mut buffer = Vec::new();
        write_jsonl(&make_report(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["image_id"], 7);
        assert_eq!(value["CIDEr"], 0.9);
    }

    #[test]
    fn test_format_inline() {
        let output = InlineOutput {
            average: 0.5,
            per_item: vec![InlineItem {
                image_id: ImageId::Text("a".into()),
                score: 0.5,
            }],
        };
        assert!(format_inline_human(&output).contains("a: 0.500"));
        assert!(format_inline_json(&output).contains("\"average\": 0.5"));
    }

    #[test]
    fn test_format_progress() {
        let first = ScorerProgress::new(0, 4, Some("Bleu".into()), 0);
        assert_eq!(format_progress(&first), "Bleu 0%");

        let midway = ScorerProgress::new(2, 4, Some("Cider".into()), 3000);
        assert_eq!(format_progress(&midway), "Cider 50% (~3.0s left)");

        let done = ScorerProgress::new(4, 4, None, 6000);
        assert_eq!(format_progress(&done), "Done");
    }
}
