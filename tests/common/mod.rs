#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_normalize::data::Cell;
use csv_normalize::dataset::Dataset;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

pub fn s(value: &str) -> Cell {
    Cell::string(value)
}

pub fn i(value: i64) -> Cell {
    Cell::Integer(value)
}

pub fn map(entries: &[(&str, Cell)]) -> Cell {
    Cell::Map(
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect(),
    )
}

pub fn dataset(columns: Vec<(&str, Vec<Cell>)>) -> Dataset {
    Dataset::from_named(columns).expect("valid dataset")
}

pub fn cells<'a>(dataset: &'a Dataset, name: &str) -> &'a [Cell] {
    dataset
        .column(name)
        .unwrap_or_else(|| panic!("column '{name}' missing from {:?}", dataset.names()))
        .cells()
}

pub fn assert_valid(dataset: &Dataset) {
    if let Err(err) = dataset.validate() {
        panic!("inconsistent dataset {:?}: {err}", dataset.names());
    }
}
