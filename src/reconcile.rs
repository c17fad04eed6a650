//! Mixed-type reconciliation.
//!
//! A column whose non-missing cells disagree on their type is split into a
//! `<name>_numbers` fragment (leading digit run) and a `<name>_text` fragment
//! (the non-digit run that follows). Once every column has been visited, all
//! fully missing columns are dropped, and a fragment whose sibling was dropped
//! takes back the name of the column it was split from.

use std::{collections::HashSet, sync::LazyLock};

use log::{debug, info, warn};
use regex::Regex;

use crate::{
    data::Cell,
    dataset::{Column, ColumnKey, Dataset, FragmentKind},
    schema::{ColumnType, infer_column_type},
};

static FRAGMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<numbers>\d+)?(?P<text>\D+)?").expect("fragment pattern is valid")
});

/// Splits text into its leading digit run and the non-digit run after it.
///
/// The match is anchored where the search first succeeds, which is always the
/// start of the string because both groups are optional.
pub fn split_fragments(value: &str) -> (Option<&str>, Option<&str>) {
    match FRAGMENT_PATTERN.captures(value) {
        Some(caps) => (
            caps.name("numbers").map(|m| m.as_str()),
            caps.name("text").map(|m| m.as_str()),
        ),
        None => (None, None),
    }
}

pub fn is_mixed(column: &Column) -> bool {
    column.datatype() == ColumnType::Mixed
}

pub fn reconcile(dataset: Dataset) -> Dataset {
    let rows = dataset.row_count();
    let columns = dataset.into_columns();
    let mut names: HashSet<String> = columns.iter().map(Column::name).collect();
    let mut kept = Vec::with_capacity(columns.len());
    let mut fragments = Vec::new();

    for column in columns {
        if !is_mixed(&column) {
            kept.push(column);
            continue;
        }
        let base = column.name();
        let numbers_key = ColumnKey::fragment(base.clone(), FragmentKind::Numbers);
        let text_key = ColumnKey::fragment(base.clone(), FragmentKind::Text);
        if names.contains(&numbers_key.name()) || names.contains(&text_key.name()) {
            warn!(
                "Leaving mixed column '{base}' unsplit: fragment names '{numbers_key}' or '{text_key}' are already taken"
            );
            kept.push(column);
            continue;
        }
        let (numbers, text) = split_column(column.cells());
        names.remove(&base);
        names.insert(numbers_key.name());
        names.insert(text_key.name());
        debug!("Split mixed column '{base}' into '{numbers_key}' and '{text_key}'");
        fragments.push(Column::with_key(numbers_key, numbers));
        fragments.push(Column::with_key(text_key, text));
    }
    kept.extend(fragments);

    let (mut survivors, dropped): (Vec<Column>, Vec<Column>) =
        kept.into_iter().partition(|column| !column.is_all_missing());
    for column in &dropped {
        debug!("Dropped fully missing column '{}'", column.name());
    }

    let mut reclaimed = 0usize;
    for key in dropped.iter().map(Column::key) {
        let Some(sibling) = key.sibling() else {
            continue;
        };
        let target = key.unsplit();
        let Some(position) = survivors.iter().position(|c| c.key() == &sibling) else {
            continue;
        };
        if survivors.iter().any(|c| c.name() == target.name()) {
            warn!("Cannot rename '{sibling}' back to '{target}': name already in use");
            continue;
        }
        let column = survivors.remove(position);
        debug!("Reclaimed '{target}' from fragment '{sibling}'");
        survivors.insert(position, column.renamed(target));
        reclaimed += 1;
    }

    info!(
        "Reconciled mixed columns: {} dropped as empty, {} fragment(s) renamed",
        dropped.len(),
        reclaimed
    );
    Dataset::from_parts(rows, survivors)
}

fn split_column(cells: &[Cell]) -> (Vec<Cell>, Vec<Cell>) {
    let mut numbers = Vec::with_capacity(cells.len());
    let mut text = Vec::with_capacity(cells.len());
    for cell in cells {
        let (digits, rest) = match cell {
            Cell::String(value) => split_fragments(value),
            _ => (None, None),
        };
        numbers.push(digits.map_or(Cell::Missing, Cell::string));
        text.push(rest.map_or(Cell::Missing, Cell::string));
    }
    (type_numbers(numbers), text)
}

/// Digit runs become integers when every one of them fits and none carries a
/// leading zero.
fn type_numbers(cells: Vec<Cell>) -> Vec<Cell> {
    let mut digits = cells.iter().filter_map(Cell::as_str);
    if digits.any(|run| run.len() > 1 && run.starts_with('0')) {
        return cells;
    }
    let ty = infer_column_type(cells.iter().filter_map(Cell::as_str));
    if ty != ColumnType::Integer {
        return cells;
    }
    cells
        .into_iter()
        .map(|cell| match cell {
            Cell::String(digits) => digits.parse::<i64>().map_or(Cell::String(digits), Cell::Integer),
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_fragments_anchors_at_start() {
        assert_eq!(split_fragments("12abc"), (Some("12"), Some("abc")));
        assert_eq!(split_fragments("abc12"), (None, Some("abc")));
        assert_eq!(split_fragments("42"), (Some("42"), None));
        assert_eq!(split_fragments(""), (None, None));
        assert_eq!(split_fragments("-5"), (None, Some("-")));
    }

    #[test]
    fn homogeneous_columns_are_untouched() {
        let dataset = Dataset::from_named([
            ("a", vec![Cell::string("x1"), Cell::Missing, Cell::string("y2")]),
            ("b", vec![Cell::Integer(1), Cell::Integer(2), Cell::Integer(3)]),
        ])
        .unwrap();
        let reconciled = reconcile(dataset.clone());
        assert_eq!(reconciled, dataset);
    }

    #[test]
    fn numbers_fragment_is_typed_as_integer() {
        let (numbers, text) = split_column(&[
            Cell::string("12abc"),
            Cell::Integer(34),
            Cell::string("56xyz"),
        ]);
        assert_eq!(numbers, vec![Cell::Integer(12), Cell::Missing, Cell::Integer(56)]);
        assert_eq!(
            text,
            vec![Cell::string("abc"), Cell::Missing, Cell::string("xyz")]
        );
    }

    #[test]
    fn fragment_names_that_collide_leave_the_column_unsplit() {
        let dataset = Dataset::from_named([
            ("m", vec![Cell::string("1a"), Cell::Integer(2)]),
            ("m_text", vec![Cell::string("p"), Cell::string("q")]),
        ])
        .unwrap();
        let reconciled = reconcile(dataset);
        assert_eq!(reconciled.names(), vec!["m", "m_text"]);
    }
}
