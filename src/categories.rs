//! Distinct sector and scenario labels found in a sheet, with the canonical
//! value each one maps to under the active configuration.

use std::collections::BTreeMap;

use anyhow::Result;
use log::{info, warn};

use crate::{
    cli::CategoriesArgs,
    config::ExtractionConfig,
    normalize::{CategoryField, text_field},
    pipeline::EMPTY_LABEL,
    sheet::{Cell, SourceSheet},
    table,
};

pub const UNMAPPED_LABEL: &str = "<unmapped>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTally {
    pub field: CategoryField,
    pub label: String,
    pub rows: usize,
    /// Canonical value, or `None` when the label has no mapping.
    pub canonical: Option<String>,
}

impl LabelTally {
    pub fn is_mapped(&self) -> bool {
        self.canonical.is_some()
    }
}

pub fn execute(args: &CategoriesArgs) -> Result<()> {
    let config = crate::resolve_config(&args.config)?;
    let sheet = crate::load_source(&args.source)?;
    let tallies = tally_labels(&sheet, &config);

    let headers = ["field", "label", "rows", "maps_to"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = tallies
        .iter()
        .filter(|tally| !args.unmapped_only || !tally.is_mapped())
        .map(|tally| {
            vec![
                tally.field.to_string(),
                tally.label.clone(),
                tally.rows.to_string(),
                tally
                    .canonical
                    .clone()
                    .unwrap_or_else(|| UNMAPPED_LABEL.to_string()),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);

    for field in [CategoryField::Sector, CategoryField::Scenario] {
        let distinct = tallies.iter().filter(|t| t.field == field).count();
        let unmapped = tallies
            .iter()
            .filter(|t| t.field == field && !t.is_mapped())
            .collect::<Vec<_>>();
        if unmapped.is_empty() {
            info!("{distinct} distinct {field} label(s), all mapped");
        } else {
            let skipped: usize = unmapped.iter().map(|t| t.rows).sum();
            warn!(
                "{distinct} distinct {field} label(s), {} unmapped covering {skipped} row(s)",
                unmapped.len()
            );
        }
    }
    Ok(())
}

/// Counts the rows carrying each distinct raw label, sectors first, labels in
/// lexical order. Blank label cells are reported as `<empty>`.
pub fn tally_labels(sheet: &SourceSheet, config: &ExtractionConfig) -> Vec<LabelTally> {
    let mut counts: BTreeMap<(CategoryField, String), usize> = BTreeMap::new();
    for (_, row) in sheet.data_rows() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        for (field, offset) in [
            (CategoryField::Sector, config.columns.sector),
            (CategoryField::Scenario, config.columns.scenario),
        ] {
            let label = text_field(row, offset).unwrap_or(EMPTY_LABEL);
            *counts.entry((field, label.to_string())).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|((field, label), rows)| {
            let canonical = if label == EMPTY_LABEL {
                None
            } else {
                match field {
                    CategoryField::Sector => config
                        .mappings
                        .sector(&label, config.label_matching)
                        .map(|s| s.as_str().to_string()),
                    CategoryField::Scenario => config
                        .mappings
                        .scenario(&label, config.label_matching)
                        .map(|s| s.as_str().to_string()),
                }
            };
            LabelTally {
                field,
                label,
                rows,
                canonical,
            }
        })
        .collect()
}
