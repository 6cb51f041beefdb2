use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause before every request. Zero disables it.
    #[serde(default)]
    pub request_delay_ms: u64,

    #[serde(default)]
    pub jitter_ms: u64,

    /// Extra attempts after a failed fetch. Zero means fail on first error.
    #[serde(default)]
    pub max_retries: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Export configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Races fetched and parsed at once. Output order never depends on it.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

/// What a category run does when one race fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the category on the first failing race.
    #[default]
    FailFast,
    /// Skip failing races and report them alongside the dataset.
    BestEffort,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://www.formula1.com".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "f1-results-etl/0.1 (season results export)".to_string()
}
fn default_out_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_concurrency() -> usize {
    1
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: 0,
            jitter_ms: 0,
            max_retries: 0,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("F1").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(app_cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_strict_and_sequential() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scraper.max_retries, 0);
        assert_eq!(cfg.pipeline.concurrency, 1);
        assert_eq!(cfg.pipeline.failure_policy, FailurePolicy::FailFast);
        assert_eq!(cfg.export.out_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[pipeline]\nfailure_policy = \"best-effort\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.pipeline.failure_policy, FailurePolicy::BestEffort);
        assert_eq!(cfg.pipeline.concurrency, 1);
        assert_eq!(cfg.scraper.base_url, "https://www.formula1.com");
    }
}
