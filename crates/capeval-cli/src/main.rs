//! CapEval CLI - Command-line interface for caption evaluation.
//!
//! # Usage
//!
//! ```bash
//! # Score a COCO results file with the configured scorers
//! capeval evaluate --annotations captions_val.json --results results.json
//! capeval evaluate --annotations captions_val.json --results results.json --json
//! capeval evaluate ... --per-item rows.jsonl
//!
//! # Score model output given as vocabulary indices
//! capeval inline --annotations captions_val.json --vocab vocab.json --indices batch.json
//!
//! # Print decoded captions
//! capeval decode --vocab vocab.json --indices batch.json
//! ```

mod config;
mod output;

use anyhow::{Context, Result};
use capeval_core::dataset::{load_index_batch, load_results, load_vocab, CocoCaptions};
use capeval_core::progress::ScorerProgress;
use capeval_core::vocab::VocabDecoder;
use capeval_core::{CaptionEvaluator, CaptionNormalizer, InlineScorer};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Caption evaluation CLI.
///
/// Scores generated captions against COCO-format reference captions with
/// a configurable set of metric scorers.
#[derive(Parser)]
#[command(name = "capeval", version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score candidate captions with every configured scorer
    Evaluate {
        /// COCO captions file with reference captions
        #[arg(long)]
        annotations: PathBuf,

        /// COCO results file with one candidate caption per image
        #[arg(long)]
        results: PathBuf,

        /// Scorer config file (default: $CAPEVAL_CONFIG, then platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,

        /// Write per-image scores as JSON lines to this file
        #[arg(long)]
        per_item: Option<PathBuf>,
    },

    /// Score vocabulary-index captions with a single scorer
    Inline {
        /// COCO captions file with reference captions
        #[arg(long)]
        annotations: PathBuf,

        /// Vocabulary file
        #[arg(long)]
        vocab: PathBuf,

        /// Index-sequence file (`[{"image_id": .., "indices": [..]}]`)
        #[arg(long)]
        indices: PathBuf,

        /// Scorer config file; the first single-metric scorer is used
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output scores as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print decoded index-sequence captions
    Decode {
        /// Vocabulary file
        #[arg(long)]
        vocab: PathBuf,

        /// Index-sequence file
        #[arg(long)]
        indices: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Evaluate {
            annotations,
            results,
            config,
            json,
            per_item,
        } => run_evaluate(annotations, results, config, json, per_item),
        Command::Inline {
            annotations,
            vocab,
            indices,
            config,
            json,
        } => run_inline(annotations, vocab, indices, config, json),
        Command::Decode { vocab, indices } => run_decode(vocab, indices),
    }
}

fn run_evaluate(
    annotations: PathBuf,
    results: PathBuf,
    config: Option<PathBuf>,
    json: bool,
    per_item: Option<PathBuf>,
) -> Result<()> {
    let pipeline = config::load_config(config.as_deref())?.build_pipeline()?;
    let references = CocoCaptions::from_path(&annotations)?;
    let candidates = load_results(&results)?;

    let mut evaluator = CaptionEvaluator::new(&references, CaptionNormalizer::default(), pipeline)
        .context("Failed to prepare reference captions")?;

    let pb = ProgressBar::new(evaluator.pipeline().len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")
            .context("Invalid progress template")?,
    );
    let report = evaluator
        .evaluate_with_progress(&candidates, |progress: ScorerProgress| {
            pb.set_position(progress.completed as u64);
            pb.set_message(output::format_progress(&progress));
        })
        .context("Evaluation failed")?;
    pb.finish_and_clear();

    if let Some(path) = per_item {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        output::write_jsonl(&report, BufWriter::new(file))?;
    }

    let text = if json {
        output::format_json(&report)
    } else {
        output::format_human(&report)
    };
    println!("{}", text);

    Ok(())
}

fn run_inline(
    annotations: PathBuf,
    vocab: PathBuf,
    indices: PathBuf,
    config: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let scorer = config::load_config(config.as_deref())?.first_single_metric()?;
    let references = CocoCaptions::from_path(&annotations)?;
    let vocab = Arc::new(load_vocab(&vocab)?);
    let batch = load_index_batch(&indices)?;

    let mut inline = InlineScorer::new(&references, vocab, CaptionNormalizer::default(), scorer)
        .context("Failed to prepare inline scorer")?;
    let (average, scores) = inline.score_batch(&batch).context("Inline scoring failed")?;

    let result = output::InlineOutput {
        average,
        per_item: batch
            .keys()
            .cloned()
            .zip(scores)
            .map(|(image_id, score)| output::InlineItem { image_id, score })
            .collect(),
    };

    let text = if json {
        output::format_inline_json(&result)
    } else {
        output::format_inline_human(&result)
    };
    println!("{}", text);

    Ok(())
}

fn run_decode(vocab: PathBuf, indices: PathBuf) -> Result<()> {
    let vocab = load_vocab(&vocab)?;
    let batch = load_index_batch(&indices)?;
    let decoder = VocabDecoder::for_vocab(&vocab).context("Vocabulary lacks boundary tokens")?;

    for (id, sequence) in &batch {
        println!("{}\t{}", id, decoder.decode(&vocab, sequence));
    }

    Ok(())
}
