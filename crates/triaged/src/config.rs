//! Configuration for triaged.
//!
//! Loads settings from a TOML file or uses defaults. Every field has a
//! default so a partial config file is fine; a missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Input/output log locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Append-only patient intake log (one JSON record per line)
    #[serde(default = "default_patients_file")]
    pub patients_file: PathBuf,

    /// Append-only resource snapshot log
    #[serde(default = "default_resources_file")]
    pub resources_file: PathBuf,

    /// Static triage-policy document, hot-updatable
    #[serde(default = "default_guidelines_file")]
    pub guidelines_file: PathBuf,

    /// Append-only decision log written by the sink
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
}

fn default_patients_file() -> PathBuf {
    PathBuf::from("./data/patients.jsonl")
}

fn default_resources_file() -> PathBuf {
    PathBuf::from("./data/resources.jsonl")
}

fn default_guidelines_file() -> PathBuf {
    PathBuf::from("./data/guidelines.md")
}

fn default_output_file() -> PathBuf {
    PathBuf::from("./output/triage_decisions.jsonl")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            patients_file: default_patients_file(),
            resources_file: default_resources_file(),
            guidelines_file: default_guidelines_file(),
            output_file: default_output_file(),
        }
    }
}

impl PathsConfig {
    /// Re-root the input files under a different data directory, keeping
    /// the file names.
    pub fn rebase_data(&mut self, dir: &Path) {
        for path in [
            &mut self.patients_file,
            &mut self.resources_file,
            &mut self.guidelines_file,
        ] {
            if let Some(name) = path.file_name().map(|n| n.to_owned()) {
                *path = dir.join(name);
            }
        }
    }

    /// Re-root the output file under a different directory.
    pub fn rebase_output(&mut self, dir: &Path) {
        if let Some(name) = self.output_file.file_name().map(|n| n.to_owned()) {
            self.output_file = dir.join(name);
        }
    }
}

/// Reasoning service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// When false the daemon never calls the service and every decision
    /// takes the fallback path.
    #[serde(default = "default_reasoning_enabled")]
    pub enabled: bool,

    /// OpenAI-compatible endpoint base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key. The key itself never
    /// appears in the config file.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-call timeout; expiry is treated as a request failure and routes
    /// to fallback.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Permit startup with reasoning enabled but no credential. When false,
    /// a missing key is an unrecoverable startup failure.
    #[serde(default)]
    pub allow_fallback_only: bool,
}

fn default_reasoning_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: default_reasoning_enabled(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            allow_fallback_only: false,
        }
    }
}

/// Pipeline loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Wakeup interval while waiting for input growth. The file watcher
    /// usually wakes the loop sooner; this bounds the wait.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Process the existing backlog before tailing new records.
    #[serde(default = "default_from_start")]
    pub from_start: bool,

    /// Maximum append retries before persistence is declared unavailable.
    #[serde(default = "default_persist_retry_max")]
    pub persist_retry_max: u32,

    /// Base delay for the append retry backoff (doubles each attempt).
    #[serde(default = "default_persist_retry_base_ms")]
    pub persist_retry_base_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_from_start() -> bool {
    true
}

fn default_persist_retry_max() -> u32 {
    10
}

fn default_persist_retry_base_ms() -> u64 {
    200
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            from_start: default_from_start(),
            persist_retry_max: default_persist_retry_max(),
            persist_retry_base_ms: default_persist_retry_base_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load from a TOML file; a missing file yields defaults, an unreadable
    /// or malformed file is a startup error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.pipeline.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.reasoning.enabled);
        assert!(!config.reasoning.allow_fallback_only);
        assert_eq!(config.reasoning.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.pipeline.poll_interval_ms, 500);
        assert!(config.pipeline.from_start);
        assert_eq!(
            config.paths.output_file,
            PathBuf::from("./output/triage_decisions.jsonl")
        );
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [reasoning]
            enabled = false

            [pipeline]
            poll_interval_ms = 50
            "#,
        )
        .unwrap();
        assert!(!config.reasoning.enabled);
        assert_eq!(config.pipeline.poll_interval_ms, 50);
        // Untouched sections keep defaults.
        assert_eq!(config.reasoning.timeout_secs, 30);
        assert_eq!(
            config.paths.patients_file,
            PathBuf::from("./data/patients.jsonl")
        );
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let config = Config::load(Path::new("/nonexistent/triaged.toml")).unwrap();
        assert!(config.pipeline.from_start);
    }

    #[test]
    fn test_rebase_data_keeps_file_names() {
        let mut paths = PathsConfig::default();
        paths.rebase_data(Path::new("/srv/triage"));
        assert_eq!(
            paths.patients_file,
            PathBuf::from("/srv/triage/patients.jsonl")
        );
        assert_eq!(
            paths.guidelines_file,
            PathBuf::from("/srv/triage/guidelines.md")
        );
        // Output is rebased separately.
        assert_eq!(
            paths.output_file,
            PathBuf::from("./output/triage_decisions.jsonl")
        );
    }
}
