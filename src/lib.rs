pub mod analysis;
pub mod canonical;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod io_utils;
pub mod metrics;
pub mod normalize;
pub mod report;
pub mod source;
pub mod stats;
pub mod table;

use std::{env, path::PathBuf, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use encoding_rs::Encoding;
use log::{LevelFilter, debug, info};

use crate::{
    analysis::Analyzer,
    canonical::CanonicalTable,
    cli::{AnalyzeArgs, Cli, Commands, InitConfigArgs, InputArgs, NormalizeArgs},
    config::Settings,
    error::PipelineError,
    normalize::Normalizer,
    report::AnalysisReport,
    source::SourceSummary,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("ad_insights", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => handle_analyze(&args),
        Commands::Normalize(args) => handle_normalize(&args),
        Commands::InitConfig(args) => handle_init_config(&args),
    }
}

/// Reads every source, skipping unreadable ones, and normalises the union.
pub fn load_canonical(
    paths: &[PathBuf],
    settings: &Settings,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<(CanonicalTable, Vec<SourceSummary>), PipelineError> {
    let raw = source::ingest(source::read_sources(paths, delimiter, encoding))?;
    let table = Normalizer::new(settings).normalize(&raw);
    if table.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok((table, raw.sources))
}

fn load_settings(input: &InputArgs) -> Result<Settings> {
    match &input.config {
        Some(path) => {
            Settings::load(path).with_context(|| format!("Loading settings from {path:?}"))
        }
        None => Ok(Settings::default()),
    }
}

fn load_input(input: &InputArgs, settings: &Settings) -> Result<(CanonicalTable, Vec<SourceSummary>)> {
    let encoding = io_utils::resolve_encoding(input.input_encoding.as_deref())?;
    info!(
        "Reading {} source(s) with delimiter '{}' and encoding {}",
        input.inputs.len(),
        input
            .delimiter
            .map(printable_delimiter)
            .unwrap_or_else(|| "auto".to_string()),
        encoding.name()
    );
    load_canonical(&input.inputs, settings, input.delimiter, encoding)
        .context("Building canonical table")
}

fn handle_analyze(args: &AnalyzeArgs) -> Result<()> {
    let mut settings = load_settings(&args.input)?;
    let options = &mut settings.analysis;
    if let Some(window) = args.window {
        options.anomaly_window = window;
    }
    if let Some(min_clicks) = args.min_clicks {
        options.min_segment_clicks = min_clicks;
    }
    if let Some(horizon) = args.horizon {
        options.forecast_horizon = horizon;
    }
    if let Some(top) = args.top {
        options.keyword_top = top;
    }
    debug!("Analysis options: {:?}", settings.analysis);

    let (canonical, sources) = load_input(&args.input, &settings)?;
    let analyzer = Analyzer::new(&canonical, &settings.analysis)?;
    let report = AnalysisReport::build(&analyzer, sources);
    info!(
        "Analysed {} row(s); {} CPC anomaly day(s) flagged",
        report.rows,
        report.anomaly_count()
    );

    if args.table {
        table::print_views(&report.views());
    } else {
        report
            .write_json(args.output.as_deref())
            .with_context(|| match &args.output {
                Some(path) => format!("Writing report to {path:?}"),
                None => "Writing report to stdout".to_string(),
            })?;
        if let Some(path) = &args.output {
            info!("Report written to {path:?}");
        }
    }
    Ok(())
}

fn handle_normalize(args: &NormalizeArgs) -> Result<()> {
    let settings = load_settings(&args.input)?;
    let (canonical, _) = load_input(&args.input, &settings)?;
    if args.table {
        table::print_views(&[table::ViewTable {
            title: "Canonical table".to_string(),
            headers: canonical.columns(),
            rows: canonical.render_rows(args.limit),
        }]);
        return Ok(());
    }
    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), b',')?;
    let written = canonical.write_csv(&mut writer, args.limit)?;
    info!(
        "Wrote {written} canonical row(s) with {} column(s)",
        canonical.columns().len()
    );
    Ok(())
}

fn handle_init_config(args: &InitConfigArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "{:?} already exists; pass --force to overwrite it",
            args.output
        );
    }
    Settings::default()
        .save(&args.output)
        .with_context(|| format!("Writing settings to {:?}", args.output))?;
    info!("Default settings written to {:?}", args.output);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
