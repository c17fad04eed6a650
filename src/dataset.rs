//! In-memory tabular dataset: ordered, uniquely named, equal-length columns.

use std::{collections::HashSet, fmt};

use thiserror::Error;

use crate::{data::Cell, schema::ColumnType};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error("Column '{column}' has {found} row(s) but the dataset has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Column name '{0}' appears more than once")]
    DuplicateName(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Numbers,
    Text,
}

impl FragmentKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            FragmentKind::Numbers => "numbers",
            FragmentKind::Text => "text",
        }
    }

    pub fn sibling(&self) -> FragmentKind {
        match self {
            FragmentKind::Numbers => FragmentKind::Text,
            FragmentKind::Text => FragmentKind::Numbers,
        }
    }
}

/// Column identity: a base name plus the fragment it holds, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    base: String,
    fragment: Option<FragmentKind>,
}

impl ColumnKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: name.into(),
            fragment: None,
        }
    }

    pub fn fragment(base: impl Into<String>, kind: FragmentKind) -> Self {
        Self {
            base: base.into(),
            fragment: Some(kind),
        }
    }

    pub fn sibling(&self) -> Option<ColumnKey> {
        self.fragment
            .map(|kind| ColumnKey::fragment(self.base.clone(), kind.sibling()))
    }

    pub fn unsplit(&self) -> ColumnKey {
        ColumnKey::new(self.base.clone())
    }

    pub fn name(&self) -> String {
        match self.fragment {
            Some(kind) => format!("{}_{}", self.base, kind.suffix()),
            None => self.base.clone(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    key: ColumnKey,
    cells: Vec<Cell>,
    datatype: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self::with_key(ColumnKey::new(name), cells)
    }

    pub fn with_key(key: ColumnKey, cells: Vec<Cell>) -> Self {
        let datatype = infer_tag(&cells);
        Self {
            key,
            cells,
            datatype,
        }
    }

    pub fn key(&self) -> &ColumnKey {
        &self.key
    }

    pub fn name(&self) -> String {
        self.key.name()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn datatype(&self) -> ColumnType {
        self.datatype
    }

    pub fn null_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_missing()).count()
    }

    /// True only for a column with at least one row where every cell is missing.
    pub fn is_all_missing(&self) -> bool {
        !self.cells.is_empty() && self.cells.iter().all(Cell::is_missing)
    }

    pub fn non_missing(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|cell| !cell.is_missing())
    }

    pub fn renamed(self, key: ColumnKey) -> Self {
        Self { key, ..self }
    }
}

fn infer_tag(cells: &[Cell]) -> ColumnType {
    let mut tag: Option<ColumnType> = None;
    for cell in cells.iter().filter(|cell| !cell.is_missing()) {
        let current = cell.column_type();
        match tag {
            None => tag = Some(current),
            Some(existing) if existing != current => return ColumnType::Mixed,
            Some(_) => {}
        }
    }
    tag.unwrap_or(ColumnType::Null)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    rows: usize,
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let rows = columns.first().map_or(0, Column::len);
        Self::with_rows(rows, columns)
    }

    pub fn with_rows(rows: usize, columns: Vec<Column>) -> Result<Self, DatasetError> {
        let dataset = Self { rows, columns };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Every column holds `row_count()` cells and no two columns share a name.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if column.len() != self.rows {
                return Err(DatasetError::LengthMismatch {
                    column: column.name(),
                    expected: self.rows,
                    found: column.len(),
                });
            }
            let name = column.name();
            if !seen.insert(name.clone()) {
                return Err(DatasetError::DuplicateName(name));
            }
        }
        Ok(())
    }

    pub fn from_named<N, I>(columns: I) -> Result<Self, DatasetError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Vec<Cell>)>,
    {
        Self::new(
            columns
                .into_iter()
                .map(|(name, cells)| Column::new(name, cells))
                .collect(),
        )
    }

    pub(crate) fn from_parts(rows: usize, columns: Vec<Column>) -> Self {
        let dataset = Self { rows, columns };
        debug_assert_eq!(dataset.validate(), Ok(()));
        dataset
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }
}
