pub mod cli;
pub mod data;
pub mod dataset;
pub mod dates;
pub mod dedupe;
pub mod expand;
pub mod io_utils;
pub mod pipeline;
pub mod reconcile;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, NormalizeArgs, ProbeArgs, SourceArgs},
    dataset::Dataset,
    io_utils::ReadOptions,
    pipeline::NormalizeOutcome,
    schema::Schema,
};

pub use crate::pipeline::{PipelineConfig, dtype_inference, expand_mixed, normalize};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_normalize", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Normalize(args) => handle_normalize(&args),
        Commands::Probe(args) => handle_probe(&args),
    }
}

/// Merges the optional YAML config with command-line overrides.
pub fn build_config(args: &SourceArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if !args.composite_kinds.is_empty() {
        config.composite_kinds = args.composite_kinds.clone();
    }
    if args.no_json_cells {
        config.parse_json_cells = false;
    }
    config.stages.expand &= !args.skip_expand;
    config.stages.reconcile &= !args.skip_reconcile;
    config.stages.dates &= !args.skip_dates;
    config.stages.dedupe &= !args.skip_dedupe;
    debug!("Pipeline configuration: {config:?}");
    Ok(config)
}

fn load_and_normalize(args: &SourceArgs) -> Result<(NormalizeOutcome, u8)> {
    let config = build_config(args)?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let options = ReadOptions {
        format: io_utils::resolve_input_format(&args.input, args.format),
        delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        parse_json_cells: config.parse_json_cells,
    };
    info!(
        "Reading '{}' as {:?} (delimiter '{}')",
        args.input.display(),
        options.format,
        printable_delimiter(delimiter)
    );
    let dataset: Dataset = io_utils::read_dataset(&args.input, &options)?;
    info!(
        "Loaded {} row(s) across {} column(s)",
        dataset.row_count(),
        dataset.column_count()
    );
    let outcome = normalize(dataset, &config)
        .with_context(|| format!("Normalizing {:?}", args.input))?;
    Ok((outcome, delimiter))
}

fn handle_normalize(args: &NormalizeArgs) -> Result<()> {
    let (outcome, input_delimiter) = load_and_normalize(&args.source)?;
    let dataset = outcome.dataset;

    if let Some(path) = &args.schema {
        Schema::from_dataset(&dataset)
            .save(path)
            .with_context(|| format!("Writing schema summary to {path:?}"))?;
        info!("Schema summary written to {path:?}");
    }

    if args.table {
        print!("{}", table::render_dataset(&dataset, args.rows));
        return Ok(());
    }

    let output_path = args.output.as_deref();
    let delimiter =
        io_utils::resolve_output_delimiter(output_path, args.output_delimiter, input_delimiter);
    let writer = io_utils::open_output(output_path)?;
    io_utils::write_csv_dataset(&dataset, writer, delimiter)?;
    info!(
        "Wrote {} row(s) and {} column(s) to {}",
        dataset.row_count(),
        dataset.column_count(),
        output_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into())
    );
    Ok(())
}

fn handle_probe(args: &ProbeArgs) -> Result<()> {
    let (outcome, _) = load_and_normalize(&args.source)?;
    for report in &outcome.stages {
        info!(
            "{:<14} {} -> {} column(s)",
            report.stage.as_str(),
            report.columns_before,
            report.columns_after
        );
    }
    let schema = Schema::from_dataset(&outcome.dataset);
    print!("{}", table::render_schema(&schema));
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
