//! Cell values held by a [`crate::dataset::Dataset`].
//!
//! A cell is a closed set of variants: missing, a scalar (boolean, integer,
//! float, string, date) or a composite (list, tuple, keyed map). Every stage
//! pattern-matches over [`Cell`] instead of inspecting runtime types.

use std::{fmt, str::FromStr};

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

use crate::schema::ColumnType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeKind {
    List,
    Dict,
    Tuple,
}

impl CompositeKind {
    pub const ALL: [CompositeKind; 3] = [CompositeKind::List, CompositeKind::Dict, CompositeKind::Tuple];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeKind::List => "list",
            CompositeKind::Dict => "dict",
            CompositeKind::Tuple => "tuple",
        }
    }
}

impl fmt::Display for CompositeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompositeKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "list" | "array" => Ok(CompositeKind::List),
            "dict" | "map" | "object" => Ok(CompositeKind::Dict),
            "tuple" => Ok(CompositeKind::Tuple),
            other => Err(anyhow!(
                "Unknown composite kind '{other}'. Supported kinds: list, dict, tuple"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Cell {
    Missing,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    List(Vec<Cell>),
    Tuple(Vec<Cell>),
    Map(Vec<(String, Cell)>),
}

impl Cell {
    /// Builds a float cell, folding NaN into [`Cell::Missing`].
    pub fn float(value: f64) -> Self {
        if value.is_nan() {
            Cell::Missing
        } else {
            Cell::Float(value)
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Cell::String(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn composite_kind(&self) -> Option<CompositeKind> {
        match self {
            Cell::List(_) => Some(CompositeKind::List),
            Cell::Tuple(_) => Some(CompositeKind::Tuple),
            Cell::Map(_) => Some(CompositeKind::Dict),
            _ => None,
        }
    }

    pub fn is_composite_of(&self, kinds: &[CompositeKind]) -> bool {
        self.composite_kind().is_some_and(|kind| kinds.contains(&kind))
    }

    /// True when the cell is an eligible composite none of whose sub-values is
    /// itself an eligible composite.
    pub fn is_flat_composite(&self, kinds: &[CompositeKind]) -> bool {
        if !self.is_composite_of(kinds) {
            return false;
        }
        match self {
            Cell::List(items) | Cell::Tuple(items) => {
                !items.iter().any(|item| item.is_composite_of(kinds))
            }
            Cell::Map(entries) => !entries.iter().any(|(_, item)| item.is_composite_of(kinds)),
            _ => false,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Cell::Missing => ColumnType::Null,
            Cell::Boolean(_) => ColumnType::Boolean,
            Cell::Integer(_) => ColumnType::Integer,
            Cell::Float(_) => ColumnType::Float,
            Cell::String(_) => ColumnType::String,
            Cell::Date(_) => ColumnType::Date,
            Cell::List(_) => ColumnType::Composite(CompositeKind::List),
            Cell::Tuple(_) => ColumnType::Composite(CompositeKind::Tuple),
            Cell::Map(_) => ColumnType::Composite(CompositeKind::Dict),
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Missing => String::new(),
            Cell::Boolean(b) => b.to_string(),
            Cell::Integer(i) => i.to_string(),
            Cell::Float(f) => {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Cell::String(s) => s.clone(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::List(_) | Cell::Tuple(_) | Cell::Map(_) => self.to_json().to_string(),
        }
    }

    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Cell::Missing,
            JsonValue::Bool(b) => Cell::Boolean(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Cell::Integer(i),
                None => n.as_f64().map_or(Cell::Missing, Cell::float),
            },
            JsonValue::String(s) => Cell::String(s),
            JsonValue::Array(items) => Cell::List(items.into_iter().map(Cell::from_json).collect()),
            JsonValue::Object(map) => Cell::Map(
                map.into_iter()
                    .map(|(key, item)| (key, Cell::from_json(item)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Cell::Missing => JsonValue::Null,
            Cell::Boolean(b) => JsonValue::Bool(*b),
            Cell::Integer(i) => JsonValue::from(*i),
            Cell::Float(f) => JsonNumber::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
            Cell::String(s) => JsonValue::String(s.clone()),
            Cell::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            Cell::List(items) | Cell::Tuple(items) => {
                JsonValue::Array(items.iter().map(Cell::to_json).collect())
            }
            Cell::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(key, item)| (key.clone(), item.to_json()))
                    .collect::<JsonMap<_, _>>(),
            ),
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Missing, Cell::Missing) => true,
            (Cell::Boolean(a), Cell::Boolean(b)) => a == b,
            (Cell::Integer(a), Cell::Integer(b)) => a == b,
            (Cell::Float(a), Cell::Float(b)) => a.to_bits() == b.to_bits() || a == b,
            (Cell::String(a), Cell::String(b)) => a == b,
            (Cell::Date(a), Cell::Date(b)) => a == b,
            (Cell::List(a), Cell::List(b)) | (Cell::Tuple(a), Cell::Tuple(b)) => a == b,
            (Cell::Map(a), Cell::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn is_placeholder_token(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    matches!(
        lowered.as_str(),
        "" | "na" | "n/a" | "nan" | "null" | "none" | "missing"
    )
}

pub fn parse_boolean(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" => Some(true),
        "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

pub fn parse_json_composite(value: &str) -> Option<Cell> {
    let trimmed = value.trim();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return None;
    }
    serde_json::from_str::<JsonValue>(trimmed)
        .ok()
        .map(Cell::from_json)
}

pub fn parse_typed_cell(value: &str, ty: &ColumnType) -> Result<Cell> {
    if is_placeholder_token(value) {
        return Ok(Cell::Missing);
    }
    let trimmed = value.trim();
    let parsed = match ty {
        ColumnType::Boolean => match parse_boolean(trimmed) {
            Some(b) => Cell::Boolean(b),
            None => bail!("Failed to parse '{value}' as boolean"),
        },
        ColumnType::Integer => {
            let parsed: i64 = trimmed
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as integer"))?;
            Cell::Integer(parsed)
        }
        ColumnType::Float => {
            let parsed: f64 = trimmed
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as float"))?;
            Cell::float(parsed)
        }
        ColumnType::Date => {
            let parsed = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .with_context(|| format!("Failed to parse '{value}' as date"))?;
            Cell::Date(parsed)
        }
        ColumnType::Null => Cell::Missing,
        ColumnType::String | ColumnType::Mixed => Cell::String(value.to_string()),
        ColumnType::Composite(_) => parse_json_composite(value)
            .ok_or_else(|| anyhow!("Failed to parse '{value}' as a JSON composite"))?,
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_composite_rejects_nested_eligible_values() {
        let kinds = CompositeKind::ALL;
        let flat = Cell::List(vec![Cell::Integer(1), Cell::string("a")]);
        let nested = Cell::List(vec![Cell::Integer(1), Cell::List(vec![Cell::Integer(2)])]);
        assert!(flat.is_flat_composite(&kinds));
        assert!(!nested.is_flat_composite(&kinds));
        assert!(!Cell::Integer(3).is_flat_composite(&kinds));
    }

    #[test]
    fn flat_composite_respects_restricted_kinds() {
        let only_dicts = [CompositeKind::Dict];
        let dict_of_lists = Cell::Map(vec![(
            "a".to_string(),
            Cell::List(vec![Cell::Integer(1)]),
        )]);
        assert!(dict_of_lists.is_flat_composite(&only_dicts));
        assert!(!Cell::List(vec![]).is_flat_composite(&only_dicts));
    }

    #[test]
    fn from_json_keeps_key_order_and_native_types() {
        let cell = Cell::from_json(json!({"b": 1, "a": 2.5, "c": null}));
        assert_eq!(
            cell,
            Cell::Map(vec![
                ("b".to_string(), Cell::Integer(1)),
                ("a".to_string(), Cell::Float(2.5)),
                ("c".to_string(), Cell::Missing),
            ])
        );
    }

    #[test]
    fn integer_and_float_cells_are_not_equal() {
        assert_ne!(Cell::Integer(1), Cell::Float(1.0));
        assert_eq!(Cell::Missing, Cell::Missing);
        assert_eq!(Cell::float(f64::NAN), Cell::Missing);
    }

    #[test]
    fn display_renders_whole_floats_without_fraction() {
        assert_eq!(Cell::Float(2020.0).as_display(), "2020");
        assert_eq!(Cell::Float(1.5).as_display(), "1.5");
        assert_eq!(
            Cell::List(vec![Cell::Integer(1), Cell::string("x")]).as_display(),
            "[1,\"x\"]"
        );
    }

    #[test]
    fn parse_typed_cell_handles_placeholders_and_booleans() {
        assert_eq!(
            parse_typed_cell("N/A", &ColumnType::Integer).unwrap(),
            Cell::Missing
        );
        assert_eq!(
            parse_typed_cell("Yes", &ColumnType::Boolean).unwrap(),
            Cell::Boolean(true)
        );
        assert!(parse_typed_cell("maybe", &ColumnType::Boolean).is_err());
        assert_eq!(
            parse_typed_cell(" 42 ", &ColumnType::Integer).unwrap(),
            Cell::Integer(42)
        );
    }

    #[test]
    fn parse_json_composite_ignores_plain_text() {
        assert!(parse_json_composite("hello").is_none());
        assert!(parse_json_composite("[1, 2").is_none());
        assert_eq!(
            parse_json_composite("[1, 2]"),
            Some(Cell::List(vec![Cell::Integer(1), Cell::Integer(2)]))
        );
    }

    #[test]
    fn composite_kind_parses_aliases() {
        assert_eq!("Array".parse::<CompositeKind>().unwrap(), CompositeKind::List);
        assert_eq!("object".parse::<CompositeKind>().unwrap(), CompositeKind::Dict);
        assert!("set".parse::<CompositeKind>().is_err());
    }
}
