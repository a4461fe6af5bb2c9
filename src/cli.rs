use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    config::Profile,
    mapping::{LabelMatching, UnknownMetricPolicy},
    output::OutputFormat,
    sheet::DEFAULT_SHEET_NAME,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Extract scenario pathway time series from spreadsheets into idempotent SQL upserts",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract pathway records and render them as SQL, CSV or JSON
    Extract(ExtractArgs),
    /// Show header cells and sample rows of the source sheet
    Inspect(InspectArgs),
    /// List raw sector and scenario labels and what they map to
    Categories(CategoriesArgs),
    /// Write a built-in configuration profile as YAML
    Profile(ProfileArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Workbook (.xlsx, .xlsm, .xlsb, .xls, .ods) or delimited export (.csv, .tsv, `-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Sheet holding the pathway table (workbooks only)
    #[arg(long, default_value = DEFAULT_SHEET_NAME)]
    pub sheet: String,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of a delimited input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// YAML configuration file; replaces the built-in profile
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Built-in profile used when no --config is given
    #[arg(long, value_enum, default_value_t = Profile::V2)]
    pub profile: Profile,
    /// Lowest header year treated as a value column
    #[arg(long = "min-year")]
    pub min_year: Option<i32>,
    /// Highest header year treated as a value column
    #[arg(long = "max-year")]
    pub max_year: Option<i32>,
    /// Keep only these metric types (repeatable or comma-separated)
    #[arg(long = "metric", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub metrics: Vec<String>,
    /// Keep every metric type regardless of the configured allowlist
    #[arg(long = "all-metrics", conflicts_with = "metrics")]
    pub all_metrics: bool,
    /// How raw sector/scenario labels are compared with mapping keys
    #[arg(long = "label-matching", value_enum)]
    pub label_matching: Option<LabelMatching>,
    /// Treatment of metric labels outside the known vocabulary
    #[arg(long = "unknown-metric", value_enum)]
    pub unknown_metric: Option<UnknownMetricPolicy>,
    /// Region used when the region cell is empty
    #[arg(long = "fallback-region")]
    pub fallback_region: Option<String>,
    /// Value written to the data_source column
    #[arg(long)]
    pub provenance: Option<String>,
    /// Target table, optionally schema-qualified
    #[arg(long)]
    pub table: Option<String>,
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Output file (stdout if omitted or `-`)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Sql)]
    pub format: OutputFormat,
    /// Records per INSERT statement
    #[arg(long = "batch-size", default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: u64,
    /// Add a progress comment every N records (0 disables)
    #[arg(long = "progress-every", default_value_t = 50)]
    pub progress_every: usize,
    /// Wrap the statements in BEGIN/COMMIT
    #[arg(long)]
    pub transaction: bool,
    /// Delete rows carrying the same provenance tag before inserting
    #[arg(long = "replace-existing")]
    pub replace_existing: bool,
    /// Exit with an error when no records are extracted
    #[arg(long = "fail-on-empty")]
    pub fail_on_empty: bool,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Number of leading columns to display
    #[arg(long, default_value_t = 20)]
    pub columns: usize,
    /// Number of data rows to display
    #[arg(long, default_value_t = 3)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct CategoriesArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Only list labels missing from the mappings
    #[arg(long = "unmapped-only")]
    pub unmapped_only: bool,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Profile to write
    #[arg(long, value_enum, default_value_t = Profile::V2)]
    pub profile: Profile,
    /// Destination YAML file (stdout if omitted or `-`)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "pipe" | "|" => Ok(b'|'),
        "semicolon" | ";" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (None, _) => Err("Delimiter cannot be empty".to_string()),
                (Some(_), Some(_)) => Err("Delimiter must be a single character".to_string()),
                (Some(first), None) if first.is_ascii() => Ok(first as u8),
                (Some(_), None) => Err("Delimiter must be ASCII".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("#"), Ok(b'#'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn extract_defaults_follow_v2_profile() {
        let cli = Cli::try_parse_from(["pathway-extract", "extract", "-i", "tool.xlsx"])
            .expect("parse args");
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract command");
        };
        assert_eq!(args.source.sheet, "Database");
        assert_eq!(args.config.profile, Profile::V2);
        assert_eq!(args.format, OutputFormat::Sql);
        assert_eq!(args.batch_size, 1);
        assert_eq!(args.progress_every, 50);
        assert!(args.config.metrics.is_empty());
    }

    #[test]
    fn metric_and_all_metrics_conflict() {
        let result = Cli::try_parse_from([
            "pathway-extract",
            "extract",
            "-i",
            "tool.xlsx",
            "--metric",
            "Emissions",
            "--all-metrics",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let result = Cli::try_parse_from([
            "pathway-extract",
            "extract",
            "-i",
            "tool.xlsx",
            "--batch-size",
            "0",
        ]);
        assert!(result.is_err());
    }
}
