//! Record emission: one [`NormalizedRecord`] per accepted row and usable
//! year cell, deduplicated on the persistence conflict key.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    mapping::{MetricType, Scenario, Sector},
    normalize::NormalizedRow,
    pipeline::ExtractionSummary,
    scanner::ColumnMap,
    sheet::{Cell, cell_at},
};

/// Column order of the target table.
pub const RECORD_COLUMNS: [&str; 8] = [
    "scenario",
    "sector",
    "region",
    "metric_type",
    "unit",
    "year",
    "value",
    "data_source",
];

/// Columns of the unique constraint the upserts conflict on.
pub const CONFLICT_COLUMNS: [&str; 6] = [
    "scenario",
    "sector",
    "region",
    "metric_type",
    "unit",
    "year",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub scenario: Scenario,
    pub sector: Sector,
    pub region: String,
    pub metric_type: MetricType,
    pub unit: String,
    pub year: i32,
    pub value: f64,
    pub data_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConflictKey {
    pub scenario: Scenario,
    pub sector: Sector,
    pub region: String,
    pub metric_type: MetricType,
    pub unit: String,
    pub year: i32,
}

impl NormalizedRecord {
    pub fn conflict_key(&self) -> ConflictKey {
        ConflictKey {
            scenario: self.scenario,
            sector: self.sector,
            region: self.region.clone(),
            metric_type: self.metric_type.clone(),
            unit: self.unit.clone(),
            year: self.year,
        }
    }
}

/// A year cell carries data only when it is a finite, non-zero number.
/// Zero is read as "no data", not as a measured zero.
pub fn usable_value(cell: &Cell) -> Option<f64> {
    cell.as_number()
        .filter(|value| value.is_finite() && *value != 0.0)
}

pub struct Emitter<'a> {
    columns: &'a ColumnMap,
    data_source: &'a str,
    seen: HashSet<ConflictKey>,
}

impl<'a> Emitter<'a> {
    pub fn new(columns: &'a ColumnMap, data_source: &'a str) -> Self {
        Self {
            columns,
            data_source,
            seen: HashSet::new(),
        }
    }

    /// Walks the year columns of one accepted row. A record whose conflict
    /// key was already emitted in this run is dropped, which is what the
    /// store would do with it anyway.
    pub fn emit(
        &mut self,
        row: &NormalizedRow,
        cells: &[Cell],
        summary: &mut ExtractionSummary,
    ) -> Vec<NormalizedRecord> {
        let mut records = Vec::new();
        for column in self.columns.iter() {
            let Some(value) = usable_value(cell_at(cells, column.index)) else {
                summary.cells_dropped += 1;
                continue;
            };
            let record = NormalizedRecord {
                scenario: row.scenario,
                sector: row.sector,
                region: row.region.clone(),
                metric_type: row.metric_type.clone(),
                unit: row.unit.clone(),
                year: column.year,
                value,
                data_source: self.data_source.to_string(),
            };
            if !self.seen.insert(record.conflict_key()) {
                summary.duplicates_dropped += 1;
                continue;
            }
            summary.record_emitted(&record);
            records.push(record);
        }
        records
    }
}
