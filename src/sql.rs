//! SQL script rendering.
//!
//! Every statement is an `INSERT ... ON CONFLICT (<key>) DO NOTHING`, so a
//! script can be applied any number of times, or over an overlapping earlier
//! import, and the table ends up in the same state as after the first run.

use std::io::Write;

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::{
    config::validate_table_name,
    emit::{CONFLICT_COLUMNS, NormalizedRecord, RECORD_COLUMNS},
    pipeline::Extraction,
};

const RULE: &str =
    "-- ============================================================================";

#[derive(Debug, Clone, Default)]
pub struct SourceInfo {
    pub file_name: String,
    pub sheet: String,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScriptOptions {
    pub table: String,
    pub provenance: String,
    /// Records per `INSERT`; 1 renders one statement per record.
    pub batch_size: usize,
    /// Emit a progress comment every N records; 0 disables.
    pub progress_every: usize,
    pub transaction: bool,
    pub replace_existing: bool,
    pub source: Option<SourceInfo>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            table: crate::config::DEFAULT_TABLE.to_string(),
            provenance: String::new(),
            batch_size: 1,
            progress_every: 50,
            transaction: false,
            replace_existing: false,
            source: None,
        }
    }
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Shortest decimal form that round-trips; never uses exponent notation.
pub fn format_number(value: f64) -> String {
    value.to_string()
}

pub fn render_values(record: &NormalizedRecord) -> String {
    format!(
        "({}, {}, {}, {}, {}, {}, {}, {})",
        quote_literal(record.scenario.as_str()),
        quote_literal(record.sector.as_str()),
        quote_literal(&record.region),
        quote_literal(record.metric_type.as_str()),
        quote_literal(&record.unit),
        record.year,
        format_number(record.value),
        quote_literal(&record.data_source),
    )
}

fn insert_prefix(table: &str) -> String {
    format!("INSERT INTO {table} ({})", RECORD_COLUMNS.join(", "))
}

fn conflict_clause() -> String {
    format!("ON CONFLICT ({}) DO NOTHING;", CONFLICT_COLUMNS.join(", "))
}

pub fn render_statement(table: &str, record: &NormalizedRecord) -> String {
    format!(
        "{} VALUES {} {}",
        insert_prefix(table),
        render_values(record),
        conflict_clause()
    )
}

pub fn render_batch(table: &str, records: &[NormalizedRecord]) -> String {
    match records {
        [] => String::new(),
        [single] => render_statement(table, single),
        many => {
            let values = many
                .iter()
                .map(|record| format!("  {}", render_values(record)))
                .join(",\n");
            format!(
                "{} VALUES\n{values}\n{}",
                insert_prefix(table),
                conflict_clause()
            )
        }
    }
}

pub fn write_script<W: Write>(
    out: &mut W,
    extraction: &Extraction,
    options: &ScriptOptions,
) -> Result<()> {
    validate_table_name(&options.table)?;
    write_banner(out, extraction, options).context("Writing script banner")?;

    if options.transaction {
        writeln!(out, "BEGIN;\n")?;
    }
    if options.replace_existing {
        writeln!(out, "-- Remove rows from earlier imports of the same source")?;
        writeln!(
            out,
            "DELETE FROM {} WHERE data_source = {};\n",
            options.table,
            quote_literal(&options.provenance)
        )?;
    }

    let total = extraction.records.len();
    let batch_size = options.batch_size.max(1);
    let mut written = 0usize;
    for batch in extraction.records.chunks(batch_size) {
        writeln!(out, "{}", render_batch(&options.table, batch))?;
        let before = written;
        written += batch.len();
        if options.progress_every > 0
            && written < total
            && written / options.progress_every > before / options.progress_every
        {
            writeln!(out, "\n-- Progress: {written}/{total} records\n")?;
        }
    }

    if options.transaction {
        writeln!(out, "\nCOMMIT;")?;
    }
    write_footer(out, extraction, options).context("Writing verification footer")?;
    out.flush()?;
    Ok(())
}

fn write_banner<W: Write>(
    out: &mut W,
    extraction: &Extraction,
    options: &ScriptOptions,
) -> std::io::Result<()> {
    let groups = &extraction.summary.records_by_group;
    let scenarios = groups.keys().map(|(scenario, _)| scenario.as_str()).unique().join(", ");
    let sectors = groups
        .keys()
        .map(|(_, sector)| *sector)
        .sorted()
        .dedup()
        .map(|sector| sector.as_str())
        .join(", ");
    let years = extraction
        .column_map
        .span()
        .map(|(first, last)| format!("{first}-{last}"))
        .unwrap_or_else(|| "none".to_string());

    writeln!(out, "{RULE}")?;
    writeln!(out, "-- SBTI PATHWAYS DATA")?;
    writeln!(out, "{RULE}")?;
    if let Some(source) = &options.source {
        writeln!(out, "-- Source: {} (sheet '{}')", source.file_name, source.sheet)?;
        if let Some(fingerprint) = &source.fingerprint {
            writeln!(out, "-- SHA-256: {fingerprint}")?;
        }
    }
    writeln!(out, "-- Provenance: {}", options.provenance)?;
    writeln!(out, "-- Scenarios: {}", or_none(&scenarios))?;
    writeln!(out, "-- Sectors: {}", or_none(&sectors))?;
    writeln!(out, "-- Years: {years}")?;
    writeln!(out, "-- Records: {}", extraction.records.len())?;
    writeln!(
        out,
        "-- Conflicts on ({}) are ignored",
        CONFLICT_COLUMNS.join(", ")
    )?;
    writeln!(out, "{RULE}\n")
}

fn write_footer<W: Write>(
    out: &mut W,
    extraction: &Extraction,
    options: &ScriptOptions,
) -> std::io::Result<()> {
    let table = &options.table;
    writeln!(out, "\n{RULE}")?;
    writeln!(out, "-- VERIFICATION QUERIES")?;
    writeln!(out, "{RULE}\n")?;
    writeln!(out, "-- Records in this script by scenario and sector")?;
    for ((scenario, sector), count) in &extraction.summary.records_by_group {
        writeln!(out, "--   {scenario} / {sector}: {count}")?;
    }
    writeln!(out, "SELECT scenario, sector, COUNT(*) AS row_count")?;
    writeln!(out, "FROM {table}")?;
    writeln!(out, "GROUP BY scenario, sector")?;
    writeln!(out, "ORDER BY scenario, sector;")?;

    if let Some((scenario, sector)) = extraction.summary.records_by_group.keys().next() {
        writeln!(out, "\n-- Sample data for verification")?;
        writeln!(out, "SELECT * FROM {table}")?;
        writeln!(
            out,
            "WHERE scenario = {} AND sector = {}",
            quote_literal(scenario.as_str()),
            quote_literal(sector.as_str())
        )?;
        writeln!(out, "ORDER BY year")?;
        writeln!(out, "LIMIT 10;")?;
    }
    Ok(())
}

fn or_none(value: &str) -> &str {
    if value.is_empty() { "none" } else { value }
}
