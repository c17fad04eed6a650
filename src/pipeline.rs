//! Pipeline entry points and configuration.
//!
//! The full normalization order is fixed: composite expansion, numeric
//! widening ([`infer_objects`]), mixed-type reconciliation, date
//! reconstruction, and duplicate column elimination. Every stage consumes the
//! dataset and returns a new one with the same row count.

use std::{fmt, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    data::{Cell, CompositeKind},
    dataset::{Column, Dataset},
    dates::reconstruct_dates,
    dedupe::drop_duplicate_columns,
    expand::{self, ExpandError},
    reconcile::reconcile,
    schema::ColumnType,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StageToggles {
    pub expand: bool,
    pub infer_objects: bool,
    pub reconcile: bool,
    pub dates: bool,
    pub dedupe: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            expand: true,
            infer_objects: true,
            reconcile: true,
            dates: true,
            dedupe: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Composite shapes eligible for expansion.
    pub composite_kinds: Vec<CompositeKind>,
    /// Read CSV fields that look like JSON arrays/objects as composite cells.
    pub parse_json_cells: bool,
    pub stages: StageToggles,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            composite_kinds: CompositeKind::ALL.to_vec(),
            parse_json_cells: true,
            stages: StageToggles::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Opening pipeline config {path:?}"))?;
        let config: PipelineConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing pipeline config {path:?}"))?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Expand,
    InferObjects,
    Reconcile,
    Dates,
    Dedupe,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Expand => "expand",
            Stage::InferObjects => "infer_objects",
            Stage::Reconcile => "reconcile",
            Stage::Dates => "dates",
            Stage::Dedupe => "dedupe",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub columns_before: usize,
    pub columns_after: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    pub dataset: Dataset,
    pub stages: Vec<StageReport>,
}

/// Flattens non-nested list/dict/tuple columns into prefixed sibling columns.
pub fn expand_mixed(dataset: Dataset, kinds: &[CompositeKind]) -> Result<Dataset, ExpandError> {
    expand::expand_mixed(dataset, kinds)
}

/// Runs the type-oriented stages: numeric widening, mixed-type
/// reconciliation, date reconstruction, and duplicate elimination.
pub fn dtype_inference(dataset: Dataset) -> Dataset {
    let dataset = infer_objects(dataset);
    let dataset = reconcile(dataset);
    let dataset = reconstruct_dates(dataset);
    drop_duplicate_columns(dataset)
}

/// Widens integer cells to floats in columns that mix the two, so numeric
/// widening is never mistaken for a type disagreement.
pub fn infer_objects(dataset: Dataset) -> Dataset {
    let rows = dataset.row_count();
    let columns = dataset
        .into_columns()
        .into_iter()
        .map(|column| {
            if !is_mixed_numeric(&column) {
                return column;
            }
            debug!("Widening integers to floats in column '{}'", column.name());
            let key = column.key().clone();
            let cells = column
                .into_cells()
                .into_iter()
                .map(|cell| match cell {
                    Cell::Integer(i) => Cell::Float(i as f64),
                    other => other,
                })
                .collect();
            Column::with_key(key, cells)
        })
        .collect();
    Dataset::from_parts(rows, columns)
}

fn is_mixed_numeric(column: &Column) -> bool {
    if column.datatype() != ColumnType::Mixed {
        return false;
    }
    let mut saw_integer = false;
    let mut saw_float = false;
    for cell in column.non_missing() {
        match cell {
            Cell::Integer(_) => saw_integer = true,
            Cell::Float(_) => saw_float = true,
            _ => return false,
        }
    }
    saw_integer && saw_float
}

/// Runs every enabled stage in order, recording column counts per stage.
pub fn normalize(dataset: Dataset, config: &PipelineConfig) -> Result<NormalizeOutcome, ExpandError> {
    let rows = dataset.row_count();
    let mut stages = Vec::new();
    let mut dataset = dataset;

    if config.stages.expand {
        let before = dataset.column_count();
        dataset = expand_mixed(dataset, &config.composite_kinds)?;
        stages.push(report(Stage::Expand, before, &dataset));
    }

    let steps: [(Stage, bool, fn(Dataset) -> Dataset); 4] = [
        (Stage::InferObjects, config.stages.infer_objects, infer_objects),
        (Stage::Reconcile, config.stages.reconcile, reconcile),
        (Stage::Dates, config.stages.dates, reconstruct_dates),
        (Stage::Dedupe, config.stages.dedupe, drop_duplicate_columns),
    ];
    for (stage, enabled, run) in steps {
        if !enabled {
            debug!("Skipping disabled stage '{stage}'");
            continue;
        }
        let before = dataset.column_count();
        dataset = run(dataset);
        stages.push(report(stage, before, &dataset));
    }

    debug_assert_eq!(dataset.row_count(), rows);
    info!(
        "Normalized {} row(s) into {} column(s)",
        dataset.row_count(),
        dataset.column_count()
    );
    Ok(NormalizeOutcome { dataset, stages })
}

fn report(stage: Stage, columns_before: usize, dataset: &Dataset) -> StageReport {
    debug!(
        "Stage '{stage}': {columns_before} -> {} column(s)",
        dataset.column_count()
    );
    StageReport {
        stage,
        columns_before,
        columns_after: dataset.column_count(),
    }
}
