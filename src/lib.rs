pub mod categories;
pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod inspect;
pub mod io_utils;
pub mod mapping;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod scanner;
pub mod sheet;
pub mod sql;
pub mod table;

use std::{env, io::Write, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, ConfigArgs, SourceArgs},
    config::ExtractionConfig,
    io_utils::SourceKind,
    sheet::{SourceOptions, SourceSheet},
    sql::{ScriptOptions, SourceInfo},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("pathway_extract", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => handle_extract(&args),
        Commands::Inspect(args) => inspect::execute(&args),
        Commands::Categories(args) => categories::execute(&args),
        Commands::Profile(args) => handle_profile(&args),
    }
}

fn handle_extract(args: &cli::ExtractArgs) -> Result<()> {
    let config = resolve_config(&args.config)?;
    let input = &args.source.input;
    let sheet = load_source(&args.source)?;
    let extraction = pipeline::extract(&sheet, &config)
        .with_context(|| format!("Extracting pathways from {input:?}"))?;
    extraction.summary.log_report();
    if args.fail_on_empty && extraction.records.is_empty() {
        bail!("No records extracted from {input:?}");
    }

    let file_name = if io_utils::is_dash(input) {
        "stdin".to_string()
    } else {
        input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string())
    };
    let fingerprint = io_utils::source_fingerprint(input)?;
    let options = ScriptOptions {
        table: config.table.clone(),
        provenance: config.provenance.clone(),
        batch_size: usize::try_from(args.batch_size).unwrap_or(usize::MAX),
        progress_every: args.progress_every,
        transaction: args.transaction,
        replace_existing: args.replace_existing,
        source: Some(SourceInfo {
            file_name,
            sheet: sheet.name().to_string(),
            fingerprint,
        }),
    };
    let out = io_utils::open_output(args.output.as_deref())?;
    output::write_extraction(out, &extraction, args.format, &options)
        .context("Writing extraction output")?;
    match &args.output {
        Some(path) if !io_utils::is_dash(path) => info!(
            "Wrote {} record(s) as {:?} to {path:?}",
            extraction.records.len(),
            args.format
        ),
        _ => debug!("Wrote {} record(s) to stdout", extraction.records.len()),
    }
    Ok(())
}

fn handle_profile(args: &cli::ProfileArgs) -> Result<()> {
    let config = ExtractionConfig::profile(args.profile);
    match &args.output {
        Some(path) if !io_utils::is_dash(path) => {
            config
                .save(path)
                .with_context(|| format!("Writing profile to {path:?}"))?;
            info!("Profile {:?} written to {path:?}", args.profile);
        }
        _ => {
            let yaml = config.to_yaml_string()?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(yaml.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Starts from `--config` (or the selected profile) and layers the
/// command-line overrides on top.
pub fn resolve_config(args: &ConfigArgs) -> Result<ExtractionConfig> {
    let mut config = match &args.config {
        Some(path) => ExtractionConfig::load(path)
            .with_context(|| format!("Loading configuration from {path:?}"))?,
        None => ExtractionConfig::profile(args.profile),
    };
    if let Some(min) = args.min_year {
        config.year_range.min = min;
    }
    if let Some(max) = args.max_year {
        config.year_range.max = max;
    }
    if args.all_metrics {
        config.metric_allowlist = None;
    } else {
        let metrics = args
            .metrics
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(|m| m.to_string())
            .collect::<std::collections::BTreeSet<_>>();
        if !metrics.is_empty() {
            config.metric_allowlist = Some(metrics);
        }
    }
    if let Some(matching) = args.label_matching {
        config.label_matching = matching;
    }
    if let Some(policy) = args.unknown_metric {
        config.unknown_metric = policy;
    }
    if let Some(region) = &args.fallback_region {
        config.fallback_region = region.clone();
    }
    if let Some(provenance) = &args.provenance {
        config.provenance = provenance.clone();
    }
    if let Some(table) = &args.table {
        config.table = table.clone();
    }
    config.validate()?;
    debug!(
        "Resolved configuration: years {}, values from column {}, matching {:?}",
        config.year_range, config.columns.values_from, config.label_matching
    );
    Ok(config)
}

pub fn load_source(args: &SourceArgs) -> Result<SourceSheet> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let options = SourceOptions {
        sheet: &args.sheet,
        delimiter: args.delimiter,
        encoding,
    };
    match SourceKind::from_path(&args.input) {
        SourceKind::Workbook => info!(
            "Reading sheet '{}' from '{}'",
            args.sheet,
            args.input.display()
        ),
        SourceKind::Delimited => info!(
            "Reading '{}' with delimiter '{}'",
            args.input.display(),
            printable_delimiter(io_utils::resolve_input_delimiter(
                &args.input,
                args.delimiter
            ))
        ),
    }
    let sheet = SourceSheet::load(&args.input, &options)
        .with_context(|| format!("Loading source {:?}", args.input))?;
    info!(
        "Loaded {} row(s) x {} column(s) from sheet '{}'",
        sheet.row_count(),
        sheet.column_count(),
        sheet.name()
    );
    Ok(sheet)
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
