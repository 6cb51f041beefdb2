//! Pipeline orchestrator: ties site scraping → season assembly → CSV export.
//!
//! ## Run modes
//!
//! `run_category()` — one season+category: resolve race pages, extract and
//!   assemble the tables, write `{short}{season}.csv`.
//!
//! `run_season()` — every category in export order. Categories are
//!   independent: a failed category is logged and counted, the rest still run.

pub mod assembler;

use crate::config::AppConfig;
use crate::export::export_dataset;
use crate::models::{Category, SkippedRace};
use crate::scraper::ResultsSite;
use crate::scraper::http_client::HttpClient;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info};

pub use self::assembler::SeasonAssembler;

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn assembler(&self) -> Result<SeasonAssembler<HttpClient>> {
        let client = HttpClient::new(&self.config.scraper).context("Failed to build HTTP client")?;
        let site = ResultsSite::new(client, &self.config.scraper.base_url)
            .context("Failed to set up results site")?;
        Ok(SeasonAssembler::new(
            site,
            self.config.pipeline.concurrency,
            self.config.pipeline.failure_policy,
        ))
    }

    /// Assemble and export one category.
    pub async fn run_category(&self, season: &str, category: Category) -> Result<CategoryReport> {
        let run = self
            .assembler()?
            .assemble(season, category)
            .await
            .with_context(|| format!("{} {} run failed", season, category))?;

        let path = export_dataset(&run.dataset, category, &self.config.export.out_dir)
            .with_context(|| format!("Export of {} {} failed", season, category))?;

        Ok(CategoryReport {
            category,
            path,
            races: run.races,
            rows: run.dataset.row_count(),
            skipped: run.skipped,
        })
    }

    /// Every category of a season, in export order.
    pub async fn run_season(&self, season: &str) -> PipelineStats {
        let mut stats = PipelineStats::default();

        for category in Category::ALL {
            info!("=== {} {} ===", season, category);
            match self.run_category(season, category).await {
                Ok(report) => stats.reports.push(report),
                Err(e) => {
                    error!("{}: {:#}", category, e);
                    stats.failed.push(category);
                }
            }
        }

        info!(
            "=== Done: {} exported | {} failed ===",
            stats.reports.len(),
            stats.failed.len()
        );
        stats
    }
}

#[derive(Debug)]
pub struct CategoryReport {
    pub category: Category,
    pub path: PathBuf,
    pub races: usize,
    pub rows: usize,
    pub skipped: Vec<SkippedRace>,
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub reports: Vec<CategoryReport>,
    pub failed: Vec<Category>,
}

impl PipelineStats {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
