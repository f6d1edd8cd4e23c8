//! Scorer configuration and path resolution for the CLI.
//!
//! The scorer set is read from a JSON file:
//!
//! ```json
//! {
//!   "scorers": [
//!     {"kind": "exact_match"},
//!     {"kind": "command", "method": "Bleu", "program": "bleu-scorer",
//!      "metrics": ["Bleu_1", "Bleu_2", "Bleu_3", "Bleu_4"]},
//!     {"kind": "command", "method": "Cider", "program": "cider-scorer", "metrics": "CIDEr"}
//!   ]
//! }
//! ```
//!
//! Search order:
//! 1. `--config` flag
//! 2. `$CAPEVAL_CONFIG` environment variable
//! 3. `scorers.json` in the platform config directory
//! 4. Built-in default (exact match only)

use anyhow::{anyhow, Context, Result};
use capeval_core::scoring::{
    CommandScorer, ExactMatchScorer, MetricNames, Scorer, ScorerBinding, ScorerPipeline,
};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Config file name inside the platform config directory
const CONFIG_FILENAME: &str = "scorers.json";

/// Environment variable for a custom config file
const CONFIG_ENV: &str = "CAPEVAL_CONFIG";

/// Metric name(s) as written in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MetricsSpec {
    One(String),
    Many(Vec<String>),
}

impl From<MetricsSpec> for MetricNames {
    fn from(spec: MetricsSpec) -> Self {
        match spec {
            MetricsSpec::One(name) => MetricNames::Single(name),
            MetricsSpec::Many(names) => MetricNames::Multiple(names),
        }
    }
}

/// One scorer entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScorerSpec {
    ExactMatch,
    Command {
        method: String,
        program: String,
        #[serde(default)]
        args: Vec<String>,
        metrics: MetricsSpec,
    },
}

impl ScorerSpec {
    fn build(self) -> Box<dyn Scorer> {
        match self {
            ScorerSpec::ExactMatch => Box::new(ExactMatchScorer::new()),
            ScorerSpec::Command {
                method,
                program,
                args,
                metrics,
            } => Box::new(CommandScorer::new(method, metrics, program).with_args(args)),
        }
    }
}

/// Parsed scorer configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScorerConfig {
    pub scorers: Vec<ScorerSpec>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            scorers: vec![ScorerSpec::ExactMatch],
        }
    }
}

impl ScorerConfig {
    /// Parses a config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid scorer config: {}", path.display()))
    }

    /// Builds one scorer per entry, in file order.
    pub fn build_scorers(self) -> Vec<Box<dyn Scorer>> {
        self.scorers.into_iter().map(ScorerSpec::build).collect()
    }

    /// Builds the scorer pipeline.
    pub fn build_pipeline(self) -> Result<ScorerPipeline> {
        let bindings = self
            .build_scorers()
            .into_iter()
            .map(ScorerBinding::new)
            .collect();
        ScorerPipeline::new(bindings).context("Invalid scorer configuration")
    }

    /// Builds the first single-metric scorer, for the index-sequence path.
    pub fn first_single_metric(self) -> Result<Box<dyn Scorer>> {
        self.build_scorers()
            .into_iter()
            .find(|scorer| matches!(scorer.metric_names(), MetricNames::Single(_)))
            .ok_or_else(|| anyhow!("No single-metric scorer configured"))
    }
}

/// Returns the platform config directory.
///
/// - macOS: `~/Library/Application Support/dev.capeval.CapEval/`
/// - Linux: `~/.config/capeval/`
/// - Windows: `%APPDATA%\capeval\CapEval\config\`
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "capeval", "CapEval").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Finds the scorer config file, if any.
fn find_config(custom: Option<&Path>, env_value: Option<String>) -> Result<Option<PathBuf>> {
    // 1. Explicit flag: must exist
    if let Some(path) = custom {
        if !path.exists() {
            return Err(anyhow!("Config file not found: {}", path.display()));
        }
        return Ok(Some(path.to_path_buf()));
    }

    // 2. Environment variable: must exist
    if let Some(value) = env_value {
        let path = PathBuf::from(value);
        if !path.exists() {
            return Err(anyhow!(
                "Config file from ${} not found: {}",
                CONFIG_ENV,
                path.display()
            ));
        }
        return Ok(Some(path));
    }

    // 3. Platform config directory: optional
    Ok(config_dir()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .filter(|path| path.exists()))
}

/// Loads the scorer configuration.
pub fn load_config(custom: Option<&Path>) -> Result<ScorerConfig> {
    match find_config(custom, std::env::var(CONFIG_ENV).ok())? {
        Some(path) => {
            info!("Using scorer config {}", path.display());
            ScorerConfig::from_path(&path)
        }
        None => {
            info!("No scorer config found, using exact match");
            Ok(ScorerConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_config() {
        let file = write_config(
            r#"{"scorers": [
                {"kind": "exact_match"},
                {"kind": "command", "method": "Bleu", "program": "bleu",
                 "args": ["--n", "4"], "metrics": ["Bleu_1", "Bleu_2"]},
                {"kind": "command", "method": "Cider", "program": "cider", "metrics": "CIDEr"}
            ]}"#,
        );
        let config = ScorerConfig::from_path(file.path()).unwrap();
        assert_eq!(config.scorers.len(), 3);
        assert_eq!(config.scorers[0], ScorerSpec::ExactMatch);
        match &config.scorers[1] {
            ScorerSpec::Command { args, metrics, .. } => {
                assert_eq!(args, &vec!["--n".to_string(), "4".to_string()]);
                assert_eq!(
                    metrics,
                    &MetricsSpec::Many(vec!["Bleu_1".into(), "Bleu_2".into()])
                );
            }
            other => panic!("expected command scorer, got {:?}", other),
        }

        let pipeline = config.build_pipeline().unwrap();
        assert_eq!(
            pipeline.metric_names(),
            vec!["ExactMatch", "Bleu_1", "Bleu_2", "CIDEr"]
        );
    }

    #[test]
    fn test_duplicate_metrics_rejected() {
        let config: ScorerConfig = serde_json::from_str(
            r#"{"scorers": [{"kind": "exact_match"}, {"kind": "exact_match"}]}"#,
        )
        .unwrap();
        assert!(config.build_pipeline().is_err());
    }

    #[test]
    fn test_first_single_metric_skips_vector_scorers() {
        let config: ScorerConfig = serde_json::from_str(
            r#"{"scorers": [
                {"kind": "command", "method": "Bleu", "program": "bleu", "metrics": ["Bleu_1", "Bleu_2"]},
                {"kind": "command", "method": "Spice", "program": "spice", "metrics": "SPICE"}
            ]}"#,
        )
        .unwrap();
        let scorer = config.first_single_metric().unwrap();
        assert_eq!(scorer.method(), "Spice");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let file = write_config(r#"{"scorers": [{"kind": "bleurt"}]}"#);
        assert!(ScorerConfig::from_path(file.path()).is_err());
    }

    #[test]
    fn test_find_config_order() {
        let flag = write_config("{}");
        let env = write_config("{}");
        let env_value = Some(env.path().display().to_string());

        let found = find_config(Some(flag.path()), env_value.clone()).unwrap();
        assert_eq!(found.as_deref(), Some(flag.path()));

        let found = find_config(None, env_value).unwrap();
        assert_eq!(found.as_deref(), Some(env.path()));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        assert!(find_config(Some(Path::new("/nonexistent/scorers.json")), None).is_err());
        assert!(find_config(None, Some("/nonexistent/scorers.json".into())).is_err());
    }

    #[test]
    fn test_default_config_is_exact_match() {
        let pipeline = ScorerConfig::default().build_pipeline().unwrap();
        assert_eq!(pipeline.metric_names(), vec!["ExactMatch"]);
    }
}
