use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::{
    pipeline::Extraction,
    sql::{self, ScriptOptions},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Idempotent upsert script
    #[default]
    Sql,
    /// Normalized records with a header row
    Csv,
    /// Normalized records as a JSON array
    Json,
}

pub fn write_extraction<W: Write>(
    out: W,
    extraction: &Extraction,
    format: OutputFormat,
    options: &ScriptOptions,
) -> Result<()> {
    match format {
        OutputFormat::Sql => {
            let mut out = out;
            sql::write_script(&mut out, extraction, options)
        }
        OutputFormat::Csv => write_csv(out, extraction),
        OutputFormat::Json => write_json(out, extraction),
    }
}

fn write_csv<W: Write>(out: W, extraction: &Extraction) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(out);
    for (idx, record) in extraction.records.iter().enumerate() {
        writer
            .serialize(record)
            .with_context(|| format!("Writing record {}", idx + 1))?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}

fn write_json<W: Write>(mut out: W, extraction: &Extraction) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, &extraction.records)
        .context("Writing JSON records")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
