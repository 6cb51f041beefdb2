//! Season assembly: resolve a category's race pages, extract each race's
//! table, concatenate once and prune columns.

use crate::config::FailurePolicy;
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{Category, Cell, RaceTable, SeasonDataset, SkippedRace};
use crate::schema::{CategorySchema, ColumnRule, schema_for};
use crate::scraper::{PageFetcher, ResultsSite};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Dataset of one season+category plus the races a best-effort run left out.
#[derive(Debug)]
pub struct SeasonRun {
    pub dataset: SeasonDataset,
    pub races: usize,
    pub skipped: Vec<SkippedRace>,
}

pub struct SeasonAssembler<F> {
    site: Arc<ResultsSite<F>>,
    concurrency: usize,
    policy: FailurePolicy,
}

impl<F: PageFetcher + 'static> SeasonAssembler<F> {
    pub fn new(site: ResultsSite<F>, concurrency: usize, policy: FailurePolicy) -> Self {
        Self {
            site: Arc::new(site),
            concurrency: concurrency.max(1),
            policy,
        }
    }

    pub async fn assemble(&self, season: &str, category: Category) -> ScrapeResult<SeasonRun> {
        let schema = schema_for(category);
        let urls = self.site.category_urls(season, category).await?.into_vec();
        info!("{} {}: extracting {} race tables", season, category, urls.len());

        let outcomes = if self.concurrency == 1 {
            self.extract_sequential(&urls, &schema).await
        } else {
            self.extract_concurrent(&urls, schema).await
        };

        let mut tables = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for (url, outcome) in outcomes {
            match outcome {
                Ok(table) => tables.push(table),
                Err(e) if self.policy == FailurePolicy::BestEffort => {
                    let stage = if e.is_fetch() { "unreachable" } else { "unreadable" };
                    warn!("{} {}: skipping {} race {}: {}", season, category, stage, url, e);
                    skipped.push(SkippedRace {
                        url,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let races = tables.len();
        let mut dataset = concat_tables(season, tables);
        prune_columns(&mut dataset, &schema.columns);
        info!(
            "{} {}: {} rows × {} columns from {} races ({} skipped)",
            season,
            category,
            dataset.row_count(),
            dataset.columns.len(),
            races,
            skipped.len()
        );

        Ok(SeasonRun {
            dataset,
            races,
            skipped,
        })
    }

    /// One race at a time, in URL order. Fail-fast stops at the first error.
    async fn extract_sequential(
        &self,
        urls: &[String],
        schema: &CategorySchema,
    ) -> Vec<(String, ScrapeResult<RaceTable>)> {
        let mut outcomes = Vec::with_capacity(urls.len());
        for url in urls {
            let outcome = self.site.race_table(url, schema).await;
            let failed = outcome.is_err();
            outcomes.push((url.clone(), outcome));
            if failed && self.policy == FailurePolicy::FailFast {
                break;
            }
        }
        outcomes
    }

    /// Bounded parallel fetch+parse; outcomes come back in URL order.
    async fn extract_concurrent(
        &self,
        urls: &[String],
        schema: CategorySchema,
    ) -> Vec<(String, ScrapeResult<RaceTable>)> {
        let sem = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            let task_url = url.clone();
            let site = Arc::clone(&self.site);
            let sem = Arc::clone(&sem);

            let handle = tokio::spawn(async move {
                let url = task_url;
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|e| ScrapeError::Task {
                        url: url.clone(),
                        reason: e.to_string(),
                    })?;
                site.race_table(&url, &schema).await
            });
            handles.push((url.clone(), handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter();
        while let Some((url, handle)) = pending.next() {
            let outcome = match handle.await {
                Ok(res) => res,
                Err(e) => Err(ScrapeError::Task {
                    url: url.clone(),
                    reason: e.to_string(),
                }),
            };
            let failed = outcome.is_err();
            outcomes.push((url, outcome));

            if failed && self.policy == FailurePolicy::FailFast {
                for (_, rest) in pending.by_ref() {
                    rest.abort();
                }
                break;
            }
        }
        outcomes
    }
}

/// Row-wise concatenation. Columns are unioned in first-seen order; rows of a
/// race lacking a column get [`Cell::Absent`].
pub fn concat_tables(season: &str, tables: Vec<RaceTable>) -> SeasonDataset {
    let total_rows: usize = tables.iter().map(RaceTable::row_count).sum();
    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for table in &tables {
        for col in &table.columns {
            if !positions.contains_key(col) {
                positions.insert(col.clone(), columns.len());
                columns.push(col.clone());
            }
        }
    }

    let width = columns.len();
    let mut rows = Vec::with_capacity(total_rows);
    for table in tables {
        let targets: Vec<usize> = table.columns.iter().map(|c| positions[c]).collect();
        for row in table.rows {
            let mut out = vec![Cell::Absent; width];
            for (cell, &idx) in row.into_iter().zip(&targets) {
                out[idx] = cell;
            }
            rows.push(out);
        }
    }

    SeasonDataset {
        season: season.to_string(),
        columns,
        rows,
    }
}

/// Apply a category's column rule in place. Columns named by a drop rule but
/// absent from the data are ignored.
pub fn prune_columns(dataset: &mut SeasonDataset, rule: &ColumnRule) {
    if let ColumnRule::Drop(names) = rule {
        for name in names.iter().filter(|n| dataset.column_index(n).is_none()) {
            debug!("Column {:?} not present, nothing to drop", name);
        }
    }

    let keep: Vec<usize> = dataset
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| rule.retains(c))
        .map(|(i, _)| i)
        .collect();

    if keep.len() == dataset.columns.len() {
        return;
    }

    dataset.columns = keep.iter().map(|&i| dataset.columns[i].clone()).collect();
    for row in &mut dataset.rows {
        let mut cells = std::mem::take(row);
        *row = keep
            .iter()
            .map(|&i| std::mem::replace(&mut cells[i], Cell::Absent))
            .collect();
    }
}
