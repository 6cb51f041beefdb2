mod config;
mod error;
mod export;
mod models;
mod pipeline;
mod schema;
mod scraper;
mod utils;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{AppConfig, FailurePolicy};
use crate::models::Category;
use crate::pipeline::{CategoryReport, Pipeline};
use crate::schema::{ColumnRule, schema_for};
use crate::scraper::ResultsSite;
use crate::scraper::http_client::HttpClient;

#[derive(Parser)]
#[command(name = "f1-results-etl", about = "Formula 1 season results to CSV", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Season to scrape
    #[arg(short, long, default_value = "2021", global = true)]
    season: String,

    /// Output directory (overrides export.out_dir)
    #[arg(short, long, global = true)]
    out_dir: Option<PathBuf>,

    /// Races fetched in parallel (overrides pipeline.concurrency)
    #[arg(short = 'j', long, global = true)]
    concurrency: Option<usize>,

    /// Behaviour when a single race fails (overrides pipeline.failure_policy)
    #[arg(long, value_enum, global = true)]
    on_error: Option<FailurePolicy>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Export all five categories of a season
    Season,

    /// Export a single category
    Category {
        #[arg(value_enum)]
        category: Category,
    },

    /// Print the resolved race pages of a category without extracting tables
    Urls {
        #[arg(value_enum)]
        category: Category,
    },

    /// Show the per-category extraction rules
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "f1_results_etl=info,warn",
        1 => "f1_results_etl=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;
    if let Some(dir) = cli.out_dir {
        config.export.out_dir = dir;
    }
    if let Some(n) = cli.concurrency {
        config.pipeline.concurrency = n;
    }
    if let Some(policy) = cli.on_error {
        config.pipeline.failure_policy = policy;
    }

    let season = cli.season;

    match cli.command {
        Command::Season => {
            let _t = utils::Timer::start(format!("Season {} export", season));
            let stats = Pipeline::new(config).run_season(&season).await;
            for report in &stats.reports {
                print_report(report);
            }
            if !stats.is_success() {
                let failed: Vec<&str> = stats.failed.iter().map(|c| c.slug()).collect();
                bail!("{} categories failed: {}", failed.len(), failed.join(", "));
            }
        }

        Command::Category { category } => {
            let _t = utils::Timer::start(format!("{} {} export", season, category));
            let report = Pipeline::new(config).run_category(&season, category).await?;
            print_report(&report);
        }

        Command::Urls { category } => {
            let client = HttpClient::new(&config.scraper)?;
            let site = ResultsSite::new(client, &config.scraper.base_url)?;
            let urls = site.category_urls(&season, category).await?;
            if urls.is_empty() {
                println!("No {} pages for {}.", category, season);
            } else {
                println!("{} {} pages:", urls.len(), category);
                for url in urls.iter() {
                    println!("  {}", url);
                }
            }
        }

        Command::Categories => {
            for category in Category::ALL {
                let schema = schema_for(category);
                let columns = match schema.columns {
                    ColumnRule::Drop(cols) => format!("drop {}", cols.join(", ")),
                    ColumnRule::Keep(cols) => format!("keep {} + race metadata", cols.join(", ")),
                };
                println!(
                    "  {:<15} {:<16} match {:<15} columns: {}",
                    category.slug(),
                    crate::export::file_name(category, &season),
                    schema.url_marker,
                    columns
                );
            }
        }
    }

    info!("Done.");
    Ok(())
}

fn print_report(report: &CategoryReport) {
    println!(
        "  {:<15} {:>3} races  {:>6} rows  → {}",
        report.category.slug(),
        report.races,
        utils::fmt_number(report.rows),
        report.path.display()
    );
    for skipped in &report.skipped {
        warn!("    skipped {}: {}", skipped.url, skipped.reason);
    }
}
