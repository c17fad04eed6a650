//! Column type tags, raw-text type inference, and dataset schema summaries.
//!
//! [`ColumnType`] is the nominal tag every [`crate::dataset::Column`] carries
//! after each pipeline stage. [`infer_column_type`] decides the tag for a column
//! of raw CSV text by candidate elimination, and [`Schema`] captures the final
//! shape of a normalized dataset for persistence as YAML or JSON.

use std::{fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{
    data::{CompositeKind, is_placeholder_token, parse_boolean},
    dataset::Dataset,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Every cell is missing.
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Date,
    Composite(CompositeKind),
    /// Non-missing cells disagree on their type.
    Mixed,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Null => "null",
            ColumnType::Boolean => "boolean",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Date => "date",
            ColumnType::Composite(CompositeKind::List) => "list",
            ColumnType::Composite(CompositeKind::Dict) => "dict",
            ColumnType::Composite(CompositeKind::Tuple) => "tuple",
            ColumnType::Mixed => "mixed",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "null", "boolean", "integer", "float", "string", "date", "list", "dict", "tuple",
            "mixed",
        ]
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "null" | "empty" => Ok(ColumnType::Null),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "integer" | "int" => Ok(ColumnType::Integer),
            "float" | "double" => Ok(ColumnType::Float),
            "string" => Ok(ColumnType::String),
            "date" => Ok(ColumnType::Date),
            "mixed" => Ok(ColumnType::Mixed),
            other => other
                .parse::<CompositeKind>()
                .map(ColumnType::Composite)
                .map_err(|_| {
                    anyhow!(
                        "Unknown column type '{value}'. Supported types: {}",
                        ColumnType::variants().join(", ")
                    )
                }),
        }
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        ColumnType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

#[derive(Debug, Clone)]
struct TypeCandidate {
    non_empty: usize,
    possible_boolean: bool,
    possible_integer: bool,
    possible_float: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            non_empty: 0,
            possible_boolean: true,
            possible_integer: true,
            possible_float: true,
        }
    }

    fn update(&mut self, value: &str) {
        if is_placeholder_token(value) {
            return;
        }
        let trimmed = value.trim();
        self.non_empty += 1;
        if self.possible_boolean && parse_boolean(trimmed).is_none() {
            self.possible_boolean = false;
        }
        if self.possible_integer && trimmed.parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_float && trimmed.parse::<f64>().is_err() {
            self.possible_float = false;
        }
    }

    fn decide(&self) -> ColumnType {
        if self.non_empty == 0 {
            ColumnType::Null
        } else if self.possible_boolean {
            ColumnType::Boolean
        } else if self.possible_integer {
            ColumnType::Integer
        } else if self.possible_float {
            ColumnType::Float
        } else {
            ColumnType::String
        }
    }
}

/// Picks the narrowest scalar type every non-placeholder value parses as.
///
/// Dates are deliberately left as strings; the date reconstruction stage owns
/// date recognition.
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidate = TypeCandidate::new();
    for value in values {
        candidate.update(value);
    }
    candidate.decide()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub datatype: ColumnType,
    #[serde(default)]
    pub null_count: usize,
}

/// Shape of a dataset: row count and per-column type tags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    pub rows: usize,
    pub columns: Vec<ColumnMeta>,
}

impl Schema {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let columns = dataset
            .columns()
            .iter()
            .map(|column| ColumnMeta {
                name: column.name(),
                datatype: column.datatype(),
                null_count: column.null_count(),
            })
            .collect();
        Schema {
            rows: dataset.row_count(),
            columns,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        if is_yaml_path(path) {
            serde_yaml::to_writer(file, self).context("Writing schema YAML")
        } else {
            serde_json::to_writer_pretty(file, self).context("Writing schema JSON")
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        if is_yaml_path(path) {
            serde_yaml::from_reader(reader).context("Parsing schema YAML")
        } else {
            serde_json::from_reader(reader).context("Parsing schema JSON")
        }
    }
}

fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
}
