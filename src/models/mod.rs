use serde::{Deserialize, Serialize};
use std::fmt;

// ── Category ──────────────────────────────────────────────────────────────────

/// The five result tables the site publishes per race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    RaceResults,
    StartingGrid,
    SprintResults,
    FastestLaps,
    Qualifying,
}

impl Category {
    /// Whole-season export order.
    pub const ALL: [Category; 5] = [
        Category::RaceResults,
        Category::StartingGrid,
        Category::SprintResults,
        Category::FastestLaps,
        Category::Qualifying,
    ];

    /// Slug as it appears in the site's URLs.
    pub fn slug(self) -> &'static str {
        match self {
            Category::RaceResults => "race-results",
            Category::StartingGrid => "starting-grid",
            Category::SprintResults => "sprint-results",
            Category::FastestLaps => "fastest-laps",
            Category::Qualifying => "qualifying",
        }
    }

    /// Prefix of the exported file name, e.g. `flaps` → `flaps2021.csv`.
    pub fn short_name(self) -> &'static str {
        match self {
            Category::RaceResults => "results",
            Category::StartingGrid => "starts",
            Category::SprintResults => "sprints",
            Category::FastestLaps => "flaps",
            Category::Qualifying => "qualis",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

// ── Cells ─────────────────────────────────────────────────────────────────────

/// One grid value. Numeric-looking text is stored as a number; it is always
/// written back exactly as it appeared on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    /// Column missing for this row (races disagreeing on schema).
    Absent,
}

impl Cell {
    /// "1" → Int, "1.234" → Float, "" → Absent, anything else → Text.
    ///
    /// A number is only taken when it prints back to the same text, so "+1",
    /// "007" and "12.0" stay text and export unchanged.
    pub fn infer(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return Cell::Absent;
        }
        if let Ok(n) = s.parse::<i64>() {
            if n.to_string() == s {
                return Cell::Int(n);
            }
        } else if let Ok(x) = s.parse::<f64>() {
            // f64 also accepts "inf", "nan" and "1e3"; none of those print back as-is
            if x.is_finite() && x.to_string() == s {
                return Cell::Float(x);
            }
        }
        Cell::Text(s.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Int(n) => write!(f, "{}", n),
            Cell::Float(x) => write!(f, "{}", x),
            Cell::Absent => Ok(()),
        }
    }
}

// ── Race metadata ─────────────────────────────────────────────────────────────

pub const RACE_NAME: &str = "race_name";
pub const RACE_YEAR: &str = "race_year";
pub const RACE_NUM: &str = "race_num";

/// The three synthetic columns every race table carries, in order.
pub const META_COLUMNS: [&str; 3] = [RACE_NAME, RACE_YEAR, RACE_NUM];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceMeta {
    pub name: String,
    pub year: String,
    pub num: String,
}

// ── Race table ────────────────────────────────────────────────────────────────

/// One race's results table plus its metadata columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceTable {
    pub url: String,
    pub meta: RaceMeta,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RaceTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

// ── Season dataset ────────────────────────────────────────────────────────────

/// All races of one season+category, concatenated and pruned.
/// The row index is implicit: row `i` has index `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonDataset {
    pub season: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SeasonDataset {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }
}

/// A race that was left out of a best-effort run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRace {
    pub url: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_infer() {
        assert_eq!(Cell::infer("12"), Cell::Int(12));
        assert_eq!(Cell::infer(" 1:32.090 "), Cell::Text("1:32.090".into()));
        assert_eq!(Cell::infer("25.5"), Cell::Float(25.5));
        assert_eq!(Cell::infer("+1"), Cell::Text("+1".into()));
        assert_eq!(Cell::infer("007"), Cell::Text("007".into()));
        assert_eq!(Cell::infer("-3"), Cell::Int(-3));
        assert_eq!(Cell::infer("12.0"), Cell::Text("12.0".into()));
        assert_eq!(Cell::infer("1e3"), Cell::Text("1e3".into()));
        assert_eq!(Cell::infer("NC"), Cell::Text("NC".into()));
        assert_eq!(Cell::infer("nan"), Cell::Text("nan".into()));
        assert_eq!(Cell::infer("   "), Cell::Absent);
    }

    #[test]
    fn test_numbers_written_as_scraped() {
        assert_eq!(Cell::infer("12.0").to_string(), "12.0");
        assert_eq!(Cell::infer("0.50").to_string(), "0.50");
        assert_eq!(Cell::infer("+1").to_string(), "+1");
        assert_eq!(Cell::infer(" 7 ").to_string(), "7");
    }

    #[test]
    fn test_category_names() {
        assert_eq!(Category::FastestLaps.short_name(), "flaps");
        assert_eq!(Category::StartingGrid.to_string(), "starting-grid");
        assert_eq!(Category::ALL.len(), 5);
    }
}
