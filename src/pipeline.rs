//! Single-pass extraction: scan the header, normalize each data row, emit
//! records. Rejections never abort the run; they are tallied in the
//! [`ExtractionSummary`] returned alongside the records.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::{
    config::ExtractionConfig,
    emit::{Emitter, NormalizedRecord},
    error::ExtractError,
    mapping::{Scenario, Sector},
    normalize::{CategoryField, RejectReason, RowOutcome, normalize_row},
    scanner::{ColumnMap, scan_year_columns},
    sheet::{Cell, SourceSheet},
};

pub const EMPTY_LABEL: &str = "<empty>";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Non-blank data rows inspected.
    pub rows_processed: usize,
    /// Rows rejected for an unmapped sector/scenario or a missing metric.
    pub rows_skipped: usize,
    /// Rows rejected by the metric allowlist.
    pub rows_filtered: usize,
    /// Accepted rows without a single usable year cell.
    pub rows_without_values: usize,
    pub records_emitted: usize,
    pub cells_dropped: usize,
    pub duplicates_dropped: usize,
    pub year_columns: usize,
    pub unmapped_labels: BTreeMap<(CategoryField, String), usize>,
    pub records_by_group: BTreeMap<(Scenario, Sector), usize>,
}

impl ExtractionSummary {
    pub fn rows_accepted(&self) -> usize {
        self.rows_processed - self.rows_skipped - self.rows_filtered
    }

    pub fn no_year_columns(&self) -> bool {
        self.year_columns == 0
    }

    pub fn record_emitted(&mut self, record: &NormalizedRecord) {
        self.records_emitted += 1;
        *self
            .records_by_group
            .entry((record.scenario, record.sector))
            .or_insert(0) += 1;
    }

    pub fn record_rejection(&mut self, reason: &RejectReason) {
        match reason {
            RejectReason::UnmappedCategory(labels) => {
                self.rows_skipped += 1;
                for unmapped in labels {
                    let label = unmapped
                        .label
                        .clone()
                        .unwrap_or_else(|| EMPTY_LABEL.to_string());
                    *self
                        .unmapped_labels
                        .entry((unmapped.field, label))
                        .or_insert(0) += 1;
                }
            }
            RejectReason::MissingMetricType => self.rows_skipped += 1,
            RejectReason::MetricNotAllowed(_) => self.rows_filtered += 1,
        }
    }

    pub fn log_report(&self) {
        info!(
            "Processed {} row(s): {} accepted, {} skipped (unrecognized), {} filtered (metric)",
            self.rows_processed,
            self.rows_accepted(),
            self.rows_skipped,
            self.rows_filtered
        );
        info!(
            "Emitted {} record(s) from {} year column(s); dropped {} empty/zero cell(s) and {} duplicate(s)",
            self.records_emitted, self.year_columns, self.cells_dropped, self.duplicates_dropped
        );
        if self.rows_without_values > 0 {
            info!(
                "{} accepted row(s) had no usable values",
                self.rows_without_values
            );
        }
        for ((field, label), count) in &self.unmapped_labels {
            info!("Unmapped {field} '{label}' in {count} row(s)");
        }
        if self.no_year_columns() {
            warn!("No year columns found; check the year range and value column offset");
        } else if self.records_emitted == 0 {
            warn!("No records emitted; check the category mappings and metric allowlist");
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub column_map: ColumnMap,
    pub records: Vec<NormalizedRecord>,
    pub summary: ExtractionSummary,
}

pub fn extract(sheet: &SourceSheet, config: &ExtractionConfig) -> Result<Extraction, ExtractError> {
    config.validate()?;
    let header = sheet.header().ok_or(ExtractError::MissingHeader)?;
    let column_map = scan_year_columns(header, config.year_range, config.columns.values_from);
    match column_map.span() {
        Some((first, last)) => info!(
            "Found {} year column(s) in sheet '{}': {first} to {last}",
            column_map.len(),
            sheet.name()
        ),
        None => warn!(
            "No header cells in sheet '{}' resolve to a year in {}",
            sheet.name(),
            config.year_range
        ),
    }

    let mut summary = ExtractionSummary {
        year_columns: column_map.len(),
        ..ExtractionSummary::default()
    };
    let mut records = Vec::new();
    {
        let mut emitter = Emitter::new(&column_map, &config.provenance);
        for (row_number, row) in sheet.data_rows() {
            if row.iter().all(Cell::is_blank) {
                continue;
            }
            summary.rows_processed += 1;
            match normalize_row(row, config) {
                RowOutcome::Accepted(normalized) => {
                    let emitted = emitter.emit(&normalized, row, &mut summary);
                    if emitted.is_empty() {
                        summary.rows_without_values += 1;
                    }
                    records.extend(emitted);
                }
                RowOutcome::Rejected(reason) => {
                    debug!("Row {row_number} rejected: {}", reason.code());
                    summary.record_rejection(&reason);
                }
            }
        }
    }

    Ok(Extraction {
        column_map,
        records,
        summary,
    })
}
