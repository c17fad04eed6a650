//! Date reconstruction.
//!
//! Two passes run in order:
//!
//! 1. [`merge_date_parts`] folds separate `day`/`month`/`year` columns into a
//!    single `Date_combined` text column (`DD-MM[-YYYY]`).
//! 2. [`parse_date_columns`] tries each entry of [`date_candidates`] against
//!    every text column. The first candidate whose pattern finds a date-shaped
//!    substring in every non-missing cell, and whose format parses all of those
//!    substrings, wins; the column is replaced by `<name>_datetime`.
//!
//! Candidate order resolves ambiguous inputs such as `01/02/03`: the more
//! specific four-digit-year layouts are always tried first.

use std::{collections::HashSet, sync::LazyLock};

use chrono::NaiveDate;
use log::{debug, info, warn};
use regex::Regex;

use crate::{
    data::Cell,
    dataset::{Column, Dataset},
};

pub const COMBINED_DATE_COLUMN: &str = "Date_combined";
pub const DATETIME_SUFFIX: &str = "_datetime";

#[derive(Debug)]
pub struct DateCandidate {
    label: &'static str,
    pattern: Regex,
    formats: &'static [&'static str],
}

impl DateCandidate {
    fn new(label: &'static str, pattern: &str, formats: &'static [&'static str]) -> Self {
        Self {
            label,
            pattern: Regex::new(pattern).expect("date candidate pattern is valid"),
            formats,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn extract<'a>(&self, value: &'a str) -> Option<&'a str> {
        self.pattern.find(value).map(|m| m.as_str())
    }

    pub fn parse_cells(&self, cells: &[Cell]) -> Option<Vec<Cell>> {
        let mut extracted = Vec::with_capacity(cells.len());
        for cell in cells {
            match cell {
                Cell::Missing => extracted.push(None),
                Cell::String(value) => extracted.push(Some(self.extract(value)?)),
                _ => return None,
            }
        }
        self.formats
            .iter()
            .find_map(|format| parse_all(&extracted, format))
    }
}

fn parse_all(values: &[Option<&str>], format: &str) -> Option<Vec<Cell>> {
    values
        .iter()
        .map(|value| match value {
            Some(text) => NaiveDate::parse_from_str(text, format)
                .ok()
                .map(Cell::Date),
            None => Some(Cell::Missing),
        })
        .collect()
}

static DATE_CANDIDATES: LazyLock<Vec<DateCandidate>> = LazyLock::new(|| {
    vec![
        DateCandidate::new("DD/MM/YYYY", r"\d{2}/\d{2}/\d{4}", &["%d/%m/%Y"]),
        DateCandidate::new("DD-MM-YYYY", r"\d{2}-\d{2}-\d{4}", &["%d-%m-%Y"]),
        DateCandidate::new("YYYY-MM-DD", r"\d{4}-\d{2}-\d{2}", &["%Y-%m-%d"]),
        DateCandidate::new("YYYY/MM/DD", r"\d{4}/\d{2}/\d{2}", &["%Y/%m/%d"]),
        DateCandidate::new("DD/MM/YY", r"\d{2}/\d{2}/\d{2}", &["%m/%d/%y", "%d/%m/%y"]),
        DateCandidate::new("DD-MM-YY", r"\d{2}-\d{2}-\d{2}", &["%m-%d-%y", "%d-%m-%y"]),
    ]
});

pub fn date_candidates() -> &'static [DateCandidate] {
    &DATE_CANDIDATES
}

/// First candidate that parses every non-missing cell of a text column.
pub fn detect_date_column(column: &Column) -> Option<(&'static DateCandidate, Vec<Cell>)> {
    let mut values = column.non_missing().peekable();
    values.peek()?;
    if !values.all(|cell| matches!(cell, Cell::String(_))) {
        return None;
    }
    date_candidates()
        .iter()
        .find_map(|candidate| {
            candidate
                .parse_cells(column.cells())
                .map(|cells| (candidate, cells))
        })
}

pub fn reconstruct_dates(dataset: Dataset) -> Dataset {
    parse_date_columns(merge_date_parts(dataset))
}

/// Folds `day`, `month` and `year` columns (case-insensitive, first match
/// wins) into [`COMBINED_DATE_COLUMN`]; a lone `day` is only zero-padded.
pub fn merge_date_parts(dataset: Dataset) -> Dataset {
    let find = |label: &str| {
        dataset
            .columns()
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(label))
    };
    let (day_idx, month_idx, year_idx) = (find("day"), find("month"), find("year"));
    let Some(day_idx) = day_idx else {
        return dataset;
    };

    let rows = dataset.row_count();
    let mut columns = dataset.into_columns();
    let day = padded_parts(columns[day_idx].cells());

    let Some(month_idx) = month_idx else {
        debug!("Found a day column without a month column; zero-padding only");
        let key = columns[day_idx].key().clone();
        let cells = day
            .into_iter()
            .map(|part| part.map_or(Cell::Missing, Cell::String))
            .collect();
        columns[day_idx] = Column::with_key(key, cells);
        return Dataset::from_parts(rows, columns);
    };
    let month = padded_parts(columns[month_idx].cells());
    let year = year_idx.map(|idx| {
        columns[idx]
            .cells()
            .iter()
            .map(|cell| (!cell.is_missing()).then(|| cell.as_display()))
            .collect::<Vec<_>>()
    });

    let combined = (0..rows)
        .map(|row| {
            let (Some(d), Some(m)) = (&day[row], &month[row]) else {
                return Cell::Missing;
            };
            match &year {
                Some(years) => years[row]
                    .as_ref()
                    .map_or(Cell::Missing, |y| Cell::String(format!("{d}-{m}-{y}"))),
                None => Cell::String(format!("{d}-{m}")),
            }
        })
        .collect::<Vec<_>>();

    let consumed = [Some(day_idx), Some(month_idx), year_idx];
    let mut remaining: Vec<Column> = columns
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !consumed.contains(&Some(*idx)))
        .map(|(_, column)| column)
        .collect();
    if let Some(existing) = remaining
        .iter()
        .position(|c| c.name() == COMBINED_DATE_COLUMN)
    {
        warn!("Replacing existing '{COMBINED_DATE_COLUMN}' column with merged day/month/year values");
        remaining.remove(existing);
    }
    debug!(
        "Merged day/month{} columns into '{COMBINED_DATE_COLUMN}'",
        if year.is_some() { "/year" } else { "" }
    );
    remaining.push(Column::new(COMBINED_DATE_COLUMN, combined));
    Dataset::from_parts(rows, remaining)
}

fn padded_parts(cells: &[Cell]) -> Vec<Option<String>> {
    cells
        .iter()
        .map(|cell| {
            if cell.is_missing() {
                return None;
            }
            let text = cell.as_display();
            if text.chars().count() < 2 {
                Some(format!("0{text}"))
            } else {
                Some(text)
            }
        })
        .collect()
}

pub fn parse_date_columns(dataset: Dataset) -> Dataset {
    let rows = dataset.row_count();
    let columns = dataset.into_columns();
    let mut names: HashSet<String> = columns.iter().map(Column::name).collect();
    let mut kept = Vec::with_capacity(columns.len());
    let mut parsed = Vec::new();

    for column in columns {
        let Some((candidate, cells)) = detect_date_column(&column) else {
            kept.push(column);
            continue;
        };
        let source = column.name();
        let target = format!("{source}{DATETIME_SUFFIX}");
        if names.contains(&target) {
            warn!(
                "Column '{source}' holds {} dates but '{target}' already exists",
                candidate.label()
            );
            kept.push(column);
            continue;
        }
        debug!(
            "Parsed column '{source}' as {} dates into '{target}'",
            candidate.label()
        );
        names.remove(&source);
        names.insert(target.clone());
        parsed.push(Column::new(target, cells));
    }

    info!("Recognised {} date column(s)", parsed.len());
    kept.extend(parsed);
    Dataset::from_parts(rows, kept)
}
