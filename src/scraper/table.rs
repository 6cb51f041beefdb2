//! Results-table extraction: first `<table>` → header + cell grid, plus race
//! metadata read from the page URL.

use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{Cell, META_COLUMNS, RaceMeta, RaceTable};
use crate::schema::{CategorySchema, SegmentRoles};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

/// Raw grid of one HTML table, spans expanded, header not yet split off.
type TextGrid = Vec<Vec<Option<String>>>;

/// Parse one race page into a [`RaceTable`].
pub fn extract_race_table(url: &str, html: &str, schema: &CategorySchema) -> ScrapeResult<RaceTable> {
    let (columns, rows) = parse_first_table(html, schema.table_selector)
        .map_err(|e| match e {
            ScrapeError::Parse(msg) => ScrapeError::Parse(format!("{}: {}", url, msg)),
            other => other,
        })?;
    let meta = race_meta(url, &schema.segments)?;

    let mut table = RaceTable {
        url: url.to_string(),
        meta,
        columns,
        rows,
    };
    append_meta_columns(&mut table);
    Ok(table)
}

/// Header labels and typed rows of the first table matching `selector`.
pub fn parse_first_table(html: &str, selector: &str) -> ScrapeResult<(Vec<String>, Vec<Vec<Cell>>)> {
    let doc = Html::parse_document(html);
    let table_sel = Selector::parse(selector)
        .map_err(|e| ScrapeError::Parse(format!("table selector {:?}: {:?}", selector, e)))?;

    let table = doc
        .select(&table_sel)
        .next()
        .ok_or_else(|| ScrapeError::Parse("no table found".to_string()))?;

    let mut grid = expand_spans(table);
    if grid.is_empty() {
        return Err(ScrapeError::Parse("table has no rows".to_string()));
    }

    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    let header = grid.remove(0);
    let columns = column_labels(&header, width);

    let rows = grid
        .into_iter()
        .map(|row| {
            let mut cells: Vec<Cell> = row
                .into_iter()
                .map(|c| c.map(|s| Cell::infer(&s)).unwrap_or(Cell::Absent))
                .collect();
            cells.resize(width, Cell::Absent);
            cells
        })
        .collect();

    Ok((columns, rows))
}

/// Lay the table's cells out on a rectangular-ish grid honouring
/// `rowspan` and `colspan`.
fn expand_spans(table: ElementRef) -> TextGrid {
    let Ok(tr_sel) = Selector::parse("tr") else {
        return Vec::new();
    };

    let mut grid: TextGrid = Vec::new();
    // Per column: value still owed to following rows, and how many rows.
    let mut carried: Vec<Option<(String, usize)>> = Vec::new();

    for tr in table.select(&tr_sel) {
        let mut row: Vec<Option<String>> = Vec::new();
        let mut col = 0usize;

        let cells = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| matches!(el.value().name(), "td" | "th"));

        for cell in cells {
            let text = cell_text(cell);
            let colspan = span_attr(cell, "colspan");
            let rowspan = span_attr(cell, "rowspan");

            for _ in 0..colspan {
                // A spanned cell never covers a slot still owed to a rowspan above.
                fill_carried(&mut carried, &mut row, &mut col, false);
                if carried.len() <= col {
                    carried.resize(col + 1, None);
                }
                if rowspan > 1 {
                    carried[col] = Some((text.clone(), rowspan - 1));
                }
                row.push(Some(text.clone()));
                col += 1;
            }
        }
        fill_carried(&mut carried, &mut row, &mut col, true);

        grid.push(row);
    }

    grid
}

/// Emit carried-down values at `col`. With `to_end` every remaining carried
/// column is emitted, padding gaps with `None`.
fn fill_carried(
    carried: &mut [Option<(String, usize)>],
    row: &mut Vec<Option<String>>,
    col: &mut usize,
    to_end: bool,
) {
    while *col < carried.len() {
        match carried[*col].take() {
            Some((text, left)) => {
                if left > 1 {
                    carried[*col] = Some((text.clone(), left - 1));
                }
                row.push(Some(text));
            }
            None if to_end && carried[*col..].iter().any(Option::is_some) => row.push(None),
            None => break,
        }
        *col += 1;
    }
}

fn span_attr(cell: ElementRef, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// Whitespace-joined text nodes: `<span>Lewis</span> <span>Hamilton</span>` → "Lewis Hamilton".
fn cell_text(cell: ElementRef) -> String {
    cell.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Blank labels become `Unnamed: {i}`, repeats become `X.1`, `X.2`, ...
fn column_labels(header: &[Option<String>], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    (0..width)
        .map(|i| {
            let label = match header.get(i).cloned().flatten() {
                Some(s) if !s.is_empty() => s,
                _ => format!("Unnamed: {}", i),
            };
            let count = seen.entry(label.clone()).or_insert(0);
            let out = if *count == 0 {
                label
            } else {
                format!("{}.{}", label, count)
            };
            *count += 1;
            out
        })
        .collect()
}

/// Race name, season and round from fixed positions of the URL path.
pub fn race_meta(url: &str, roles: &SegmentRoles) -> ScrapeResult<RaceMeta> {
    let base = Url::parse("https://results.invalid/")
        .map_err(|e| ScrapeError::Parse(e.to_string()))?;
    let parsed = base
        .join(url)
        .map_err(|e| ScrapeError::Parse(format!("bad race URL {:?}: {}", url, e)))?;

    let segments: Vec<&str> = parsed.path().split('/').collect();
    let needed = roles.required_len();
    if segments.len() < needed {
        return Err(ScrapeError::Schema {
            url: url.to_string(),
            needed,
            found: segments.len(),
        });
    }

    Ok(RaceMeta {
        name: segments[roles.name].to_string(),
        year: segments[roles.year].to_string(),
        num: segments[roles.num].to_string(),
    })
}

fn append_meta_columns(table: &mut RaceTable) {
    let meta = &table.meta;
    table.columns.extend(META_COLUMNS.iter().map(|c| c.to_string()));
    let values = [
        Cell::Text(meta.name.clone()),
        Cell::Text(meta.year.clone()),
        Cell::Text(meta.num.clone()),
    ];
    for row in &mut table.rows {
        row.extend(values.iter().cloned());
    }
}
