//! Duplicate column elimination: a column whose cells equal an earlier
//! column's, missing cells included, is dropped.

use std::collections::HashSet;

use itertools::Itertools;
use log::{debug, info};

use crate::dataset::{Column, Dataset};

/// Indices of columns whose cells equal those of some earlier column.
pub fn duplicate_column_indices(columns: &[Column]) -> Vec<usize> {
    let mut duplicates = HashSet::new();
    for (left, right) in (0..columns.len()).tuple_combinations() {
        if duplicates.contains(&left) || duplicates.contains(&right) {
            continue;
        }
        if columns[left].cells() == columns[right].cells() {
            debug!(
                "Column '{}' duplicates '{}'",
                columns[right].name(),
                columns[left].name()
            );
            duplicates.insert(right);
        }
    }
    duplicates.into_iter().sorted_unstable().collect()
}

/// Drops every column that repeats an earlier one, keeping first occurrences
/// in their original order.
pub fn drop_duplicate_columns(dataset: Dataset) -> Dataset {
    let rows = dataset.row_count();
    let duplicates: HashSet<usize> = duplicate_column_indices(dataset.columns())
        .into_iter()
        .collect();
    if duplicates.is_empty() {
        return dataset;
    }
    info!("Dropping {} duplicate column(s)", duplicates.len());
    let survivors = dataset
        .into_columns()
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !duplicates.contains(idx))
        .map(|(_, column)| column)
        .collect();
    Dataset::from_parts(rows, survivors)
}
