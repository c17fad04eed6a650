use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::data::CompositeKind;

#[derive(Debug, Parser)]
#[command(author, version, about = "Normalize messy tabular datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Expand composite cells, reconcile mixed types, rebuild dates, and drop duplicate columns
    Normalize(NormalizeArgs),
    /// Run the normalization pipeline and print the resulting column types
    Probe(ProbeArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum InputFormat {
    Csv,
    Json,
    JsonLines,
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Input format (defaults from the file extension, CSV otherwise)
    #[arg(long, value_enum)]
    pub format: Option<InputFormat>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML pipeline configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Composite kinds eligible for expansion (comma-separated: list,dict,tuple)
    #[arg(long = "composite-kinds", value_delimiter = ',', value_parser = parse_composite_kind)]
    pub composite_kinds: Vec<CompositeKind>,
    /// Keep CSV fields that look like JSON arrays/objects as plain text
    #[arg(long = "no-json-cells")]
    pub no_json_cells: bool,
    /// Skip composite expansion
    #[arg(long = "skip-expand")]
    pub skip_expand: bool,
    /// Skip mixed-type reconciliation
    #[arg(long = "skip-reconcile")]
    pub skip_reconcile: bool,
    /// Skip day/month/year merging and date parsing
    #[arg(long = "skip-dates")]
    pub skip_dates: bool,
    /// Skip duplicate column elimination
    #[arg(long = "skip-dedupe")]
    pub skip_dedupe: bool,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Write a summary of the output columns (YAML for .yml/.yaml, JSON otherwise)
    #[arg(long = "schema")]
    pub schema: Option<PathBuf>,
    /// Render output as a table to stdout instead of CSV
    #[arg(long = "table")]
    pub table: bool,
    /// Limit rows shown with --table
    #[arg(long, default_value_t = 20)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_composite_kind(value: &str) -> Result<CompositeKind, String> {
    value.parse().map_err(|err: anyhow::Error| err.to_string())
}
