//! Site-specific layout rules, one descriptor per result category.
//!
//! Everything positional about the results site lives here as data: which
//! table to read, which URL segments carry race metadata, which columns to
//! prune, and the link quirks of individual categories.

use crate::models::{Category, META_COLUMNS};

/// Marker in a link target that identifies a per-race result page.
pub const RACE_RESULT_MARKER: &str = "race-result";

/// Positions of race metadata in a race URL's path, split on `/`.
///
/// `/en/results.html/2021/races/1064/bahrain/race-result.html` splits into
/// `["", "en", "results.html", "2021", "races", "1064", "bahrain", ...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRoles {
    pub name: usize,
    pub year: usize,
    pub num: usize,
}

impl SegmentRoles {
    /// Minimum number of path segments a race URL must have.
    pub fn required_len(&self) -> usize {
        self.name.max(self.year).max(self.num) + 1
    }
}

pub const DEFAULT_SEGMENTS: SegmentRoles = SegmentRoles {
    name: 6,
    year: 3,
    num: 5,
};

/// Column pruning applied once to the assembled season dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRule {
    /// Drop the listed columns, keep everything else.
    Drop(&'static [&'static str]),
    /// Keep only the listed columns plus the race metadata columns.
    Keep(&'static [&'static str]),
}

impl ColumnRule {
    /// Whether `column` survives pruning.
    pub fn retains(&self, column: &str) -> bool {
        match self {
            ColumnRule::Drop(cols) => !cols.contains(&column),
            ColumnRule::Keep(cols) => cols.contains(&column) || META_COLUMNS.contains(&column),
        }
    }
}

/// Known oddities of the listing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkQuirk {
    /// The race pages of this category link back to the season-wide category
    /// index (`/en/results.html/{season}/{slug}.html`), which also matches the
    /// link filter, usually as the first link. Drop it wherever it appears.
    DropIndexLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySchema {
    pub category: Category,
    /// Substring a link target must contain to belong to this category.
    pub url_marker: &'static str,
    /// CSS selector whose first match is the results table.
    pub table_selector: &'static str,
    pub segments: SegmentRoles,
    pub columns: ColumnRule,
    pub quirks: &'static [LinkQuirk],
}

impl CategorySchema {
    pub fn has_quirk(&self, quirk: LinkQuirk) -> bool {
        self.quirks.contains(&quirk)
    }

    /// Whether `link` is this category's season index page rather than a race page.
    pub fn is_index_link(&self, link: &str, season: &str) -> bool {
        let path = link.split(['?', '#']).next().unwrap_or(link);
        path.trim_end_matches('/')
            .ends_with(&format!("/{}/{}.html", season, self.category.slug()))
    }
}

const RESULT_PLACEHOLDERS: &[&str] = &["Unnamed: 0", "Unnamed: 8"];
const TIMING_PLACEHOLDERS: &[&str] = &["Unnamed: 0", "Unnamed: 9"];
const GRID_COLUMNS: &[&str] = &["Pos", "Driver", "Car"];

pub fn schema_for(category: Category) -> CategorySchema {
    let (url_marker, columns, quirks): (&'static str, ColumnRule, &'static [LinkQuirk]) =
        match category {
            Category::RaceResults => (RACE_RESULT_MARKER, ColumnRule::Drop(RESULT_PLACEHOLDERS), &[]),
            Category::SprintResults => (category.slug(), ColumnRule::Drop(RESULT_PLACEHOLDERS), &[]),
            Category::StartingGrid => (category.slug(), ColumnRule::Keep(GRID_COLUMNS), &[]),
            Category::FastestLaps => (
                category.slug(),
                ColumnRule::Drop(TIMING_PLACEHOLDERS),
                &[LinkQuirk::DropIndexLink],
            ),
            Category::Qualifying => (category.slug(), ColumnRule::Drop(TIMING_PLACEHOLDERS), &[]),
        };

    CategorySchema {
        category,
        url_marker,
        table_selector: "table",
        segments: DEFAULT_SEGMENTS,
        columns,
        quirks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fastest_laps_has_index_quirk() {
        for c in Category::ALL {
            let quirky = schema_for(c).has_quirk(LinkQuirk::DropIndexLink);
            assert_eq!(quirky, c == Category::FastestLaps, "{}", c);
        }
    }

    #[test]
    fn test_keep_rule_retains_meta() {
        let rule = schema_for(Category::StartingGrid).columns;
        assert!(rule.retains("Pos"));
        assert!(rule.retains("race_num"));
        assert!(!rule.retains("Unnamed: 4"));
        assert!(!rule.retains("Time"));
    }

    #[test]
    fn test_drop_rule() {
        let rule = schema_for(Category::Qualifying).columns;
        assert!(!rule.retains("Unnamed: 9"));
        assert!(rule.retains("Unnamed: 8"));
        assert!(rule.retains("Q1"));
    }

    #[test]
    fn test_index_link() {
        let s = schema_for(Category::FastestLaps);
        assert!(s.is_index_link("/en/results.html/2021/fastest-laps.html", "2021"));
        assert!(!s.is_index_link(
            "/en/results.html/2021/races/1064/bahrain/fastest-laps.html",
            "2021"
        ));
    }

    #[test]
    fn test_required_len() {
        assert_eq!(DEFAULT_SEGMENTS.required_len(), 7);
    }
}
