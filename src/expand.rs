//! Composite expansion: flattens columns of list/dict/tuple cells into
//! sibling columns named `<column>_<index>` or `<column>_<key>`.

use std::collections::HashSet;

use log::{debug, warn};
use thiserror::Error;

use crate::{
    data::{Cell, CompositeKind},
    dataset::{Column, Dataset},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("Column '{column}' row {row}: composite holds {found} value(s) but earlier rows hold {expected}")]
    RaggedComposite {
        column: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Column '{column}' row {row}: keys {found:?} do not match earlier keys {expected:?}")]
    KeyMismatch {
        column: String,
        row: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Column '{column}' row {row}: a {found} cannot be expanded alongside {expected} cells")]
    ShapeMismatch {
        column: String,
        row: usize,
        expected: CompositeKind,
        found: CompositeKind,
    },
}

/// Replaces every fully flat composite column with its expanded sub-columns.
///
/// Sub-columns are appended after the surviving columns in source order. A
/// column with no non-missing cells is never expanded, and neither is one whose
/// sub-column names are already taken.
pub fn expand_mixed(dataset: Dataset, kinds: &[CompositeKind]) -> Result<Dataset, ExpandError> {
    let rows = dataset.row_count();
    let columns = dataset.into_columns();
    let mut taken: HashSet<String> = columns.iter().map(Column::name).collect();
    let mut kept = Vec::with_capacity(columns.len());
    let mut expanded = Vec::new();

    for column in columns {
        if !is_expandable(&column, kinds) {
            kept.push(column);
            continue;
        }
        let source = column.name();
        let sub_columns = build_sub_columns(&source, column.cells())?;
        let sub_table = expand_mixed(Dataset::from_parts(rows, sub_columns), kinds)?;
        let names = sub_table.names();
        if let Some(clash) = names.iter().find(|name| taken.contains(*name)) {
            warn!("Leaving composite column '{source}' unexpanded: '{clash}' already exists");
            kept.push(column);
            continue;
        }
        debug!(
            "Expanded composite column '{}' into {} column(s)",
            source,
            names.len()
        );
        taken.remove(&source);
        taken.extend(names);
        expanded.extend(sub_table.into_columns());
    }

    kept.extend(expanded);
    Ok(Dataset::from_parts(rows, kept))
}

/// A column qualifies when it has at least one non-missing cell and every
/// non-missing cell is a flat composite of an eligible kind.
pub fn is_expandable(column: &Column, kinds: &[CompositeKind]) -> bool {
    let mut values = column.non_missing().peekable();
    if values.peek().is_none() {
        return false;
    }
    values.all(|cell| cell.is_flat_composite(kinds))
}

enum Shape {
    Sequence(CompositeKind, usize),
    Keyed(Vec<String>),
}

fn build_sub_columns(source: &str, cells: &[Cell]) -> Result<Vec<Column>, ExpandError> {
    let Some(first) = cells.iter().find(|cell| !cell.is_missing()) else {
        return Ok(Vec::new());
    };
    let shape = match first {
        Cell::List(items) => Shape::Sequence(CompositeKind::List, items.len()),
        Cell::Tuple(items) => Shape::Sequence(CompositeKind::Tuple, items.len()),
        Cell::Map(entries) => Shape::Keyed(entries.iter().map(|(key, _)| key.clone()).collect()),
        _ => return Ok(Vec::new()),
    };

    let width = match &shape {
        Shape::Sequence(_, len) => *len,
        Shape::Keyed(keys) => keys.len(),
    };
    let mut buffers: Vec<Vec<Cell>> = vec![Vec::with_capacity(cells.len()); width];

    for (row, cell) in cells.iter().enumerate() {
        match (cell, &shape) {
            (Cell::Missing, _) => {
                for buffer in &mut buffers {
                    buffer.push(Cell::Missing);
                }
            }
            (Cell::List(items) | Cell::Tuple(items), Shape::Sequence(_, len)) => {
                if items.len() != *len {
                    return Err(ExpandError::RaggedComposite {
                        column: source.to_string(),
                        row,
                        expected: *len,
                        found: items.len(),
                    });
                }
                for (buffer, item) in buffers.iter_mut().zip(items) {
                    buffer.push(item.clone());
                }
            }
            (Cell::Map(entries), Shape::Keyed(keys)) => {
                let same_keys = entries.len() == keys.len()
                    && keys
                        .iter()
                        .all(|key| entries.iter().any(|(other, _)| other == key));
                if !same_keys {
                    return Err(ExpandError::KeyMismatch {
                        column: source.to_string(),
                        row,
                        expected: keys.clone(),
                        found: entries.iter().map(|(key, _)| key.clone()).collect(),
                    });
                }
                for (buffer, key) in buffers.iter_mut().zip(keys) {
                    let value = entries
                        .iter()
                        .find(|(other, _)| other == key)
                        .map_or(Cell::Missing, |(_, value)| value.clone());
                    buffer.push(value);
                }
            }
            (other, shape) => {
                let expected = match shape {
                    Shape::Sequence(kind, _) => *kind,
                    Shape::Keyed(_) => CompositeKind::Dict,
                };
                let found = other.composite_kind().unwrap_or(CompositeKind::List);
                return Err(ExpandError::ShapeMismatch {
                    column: source.to_string(),
                    row,
                    expected,
                    found,
                });
            }
        }
    }

    let names: Vec<String> = match shape {
        Shape::Sequence(_, len) => (0..len).map(|idx| format!("{source}_{idx}")).collect(),
        Shape::Keyed(keys) => keys.iter().map(|key| format!("{source}_{key}")).collect(),
    };
    Ok(names
        .into_iter()
        .zip(buffers)
        .map(|(name, cells)| Column::new(name, cells))
        .collect())
}
