//! Dataset loading and writing.
//!
//! - **Delimiters**: `.tsv` files default to tab, everything else to comma,
//!   unless overridden.
//! - **Encoding**: CSV input is decoded through `encoding_rs` (UTF-8 default).
//! - **Formats**: CSV, a JSON array of objects, or JSON Lines. The `-` path
//!   reads stdin / writes stdout.
//! - **Typing**: CSV columns are typed by candidate elimination; JSON values
//!   keep their native types, with arrays and objects becoming composite cells.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use serde_json::Value as JsonValue;

use crate::{
    cli::InputFormat,
    data::{Cell, is_placeholder_token, parse_json_composite, parse_typed_cell},
    dataset::{Column, Dataset},
    schema::infer_column_type,
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    if let Some(path) = path {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => return DEFAULT_TSV_DELIMITER,
            Some(ext) if ext.eq_ignore_ascii_case("csv") => return DEFAULT_CSV_DELIMITER,
            _ => {}
        }
    }
    fallback
}

pub fn resolve_input_format(path: &Path, provided: Option<InputFormat>) -> InputFormat {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::Json,
        Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
            InputFormat::JsonLines
        }
        _ => InputFormat::Csv,
    })
}

#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub format: InputFormat,
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub parse_json_cells: bool,
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        )))
    }
}

pub fn read_dataset(path: &Path, options: &ReadOptions) -> Result<Dataset> {
    match options.format {
        InputFormat::Csv => {
            let reader = open_input(path)?;
            read_csv_dataset(reader, options)
                .with_context(|| format!("Reading CSV input {path:?}"))
        }
        InputFormat::Json | InputFormat::JsonLines => {
            let mut text = String::new();
            open_input(path)?
                .read_to_string(&mut text)
                .with_context(|| format!("Reading JSON input {path:?}"))?;
            let records = if options.format == InputFormat::Json {
                parse_json_array(&text)?
            } else {
                parse_json_lines(&text)?
            };
            dataset_from_records(records).with_context(|| format!("Loading records from {path:?}"))
        }
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn read_csv_dataset<R: Read>(reader: R, options: &ReadOptions) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(reader);
    let headers = decode_record(reader.byte_headers()?, options.encoding)?;
    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = decode_record(&record, options.encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        for (column, value) in raw.iter_mut().zip(decoded) {
            column.push(value);
        }
    }

    let rows = raw.first().map_or(0, Vec::len);
    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, values)| {
            let cells = type_raw_column(&values, options.parse_json_cells)
                .with_context(|| format!("Typing column '{name}'"))?;
            Ok(Column::new(name, cells))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Dataset::with_rows(rows, columns)?)
}

fn type_raw_column(values: &[String], parse_json_cells: bool) -> Result<Vec<Cell>> {
    if parse_json_cells
        && let Some(cells) = json_composite_column(values)
    {
        return Ok(cells);
    }
    let ty = infer_column_type(values.iter().map(String::as_str));
    values
        .iter()
        .map(|value| parse_typed_cell(value, &ty))
        .collect()
}

/// Reads a column as composites only when every non-placeholder field is a
/// JSON array or object.
fn json_composite_column(values: &[String]) -> Option<Vec<Cell>> {
    let mut any = false;
    let mut cells = Vec::with_capacity(values.len());
    for value in values {
        if is_placeholder_token(value) {
            cells.push(Cell::Missing);
            continue;
        }
        cells.push(parse_json_composite(value)?);
        any = true;
    }
    any.then_some(cells)
}

fn parse_json_array(text: &str) -> Result<Vec<JsonValue>> {
    match serde_json::from_str::<JsonValue>(text).context("Parsing JSON document")? {
        JsonValue::Array(records) => Ok(records),
        _ => bail!("Expected a JSON array of objects"),
    }
}

fn parse_json_lines(text: &str) -> Result<Vec<JsonValue>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("Parsing JSON line {}", idx + 1))
        })
        .collect()
}

/// Builds a dataset from JSON objects. Columns follow first-seen key order and
/// absent keys become missing cells.
pub fn dataset_from_records(records: Vec<JsonValue>) -> Result<Dataset> {
    let rows = records.len();
    let mut names: Vec<String> = Vec::new();
    let mut buffers: Vec<Vec<Cell>> = Vec::new();

    for (row, record) in records.into_iter().enumerate() {
        let JsonValue::Object(map) = record else {
            bail!("Record {} is not a JSON object", row + 1);
        };
        for (key, value) in map {
            let idx = match names.iter().position(|name| name == &key) {
                Some(idx) => idx,
                None => {
                    names.push(key);
                    buffers.push(vec![Cell::Missing; row]);
                    names.len() - 1
                }
            };
            buffers[idx].push(Cell::from_json(value));
        }
        for buffer in &mut buffers {
            if buffer.len() == row {
                buffer.push(Cell::Missing);
            }
        }
    }

    let columns = names
        .into_iter()
        .zip(buffers)
        .map(|(name, cells)| Column::new(name, cells))
        .collect();
    Ok(Dataset::with_rows(rows, columns)?)
}

pub fn write_csv_dataset<W: Write>(dataset: &Dataset, writer: W, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(writer);
    writer
        .write_record(dataset.names())
        .context("Writing header row")?;
    for row in 0..dataset.row_count() {
        let record = dataset
            .columns()
            .iter()
            .map(|column| column.cells()[row].as_display());
        writer
            .write_record(record)
            .with_context(|| format!("Writing row {}", row + 2))?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) if !is_dash(p) => Ok(Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        ))),
        _ => Ok(Box::new(io::stdout())),
    }
}
