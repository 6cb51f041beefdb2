//! CSV export of season datasets.

use crate::error::ScrapeResult;
use crate::models::{Category, SeasonDataset};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// `{short-name}{season}.csv`, e.g. `qualis2021.csv`.
pub fn file_name(category: Category, season: &str) -> String {
    format!("{}{}.csv", category.short_name(), season)
}

/// Write the dataset with a leading, unlabeled row-index column.
pub fn write_dataset<W: Write>(dataset: &SeasonDataset, out: W) -> ScrapeResult<()> {
    let mut writer = csv::WriterBuilder::new().flexible(false).from_writer(out);

    let mut header = Vec::with_capacity(dataset.columns.len() + 1);
    header.push(String::new());
    header.extend(dataset.columns.iter().cloned());
    writer.write_record(&header)?;

    for (idx, row) in dataset.rows.iter().enumerate() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(idx.to_string());
        record.extend(row.iter().map(|c| c.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Export into `dir`, creating it if needed. Returns the written path.
pub fn export_dataset(dataset: &SeasonDataset, category: Category, dir: &Path) -> ScrapeResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name(category, &dataset.season));
    let file = std::fs::File::create(&path)?;
    write_dataset(dataset, file)?;
    info!("Wrote {} rows to {:?}", dataset.row_count(), path);
    Ok(path)
}
