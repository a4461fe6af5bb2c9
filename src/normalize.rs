//! Per-row normalization: positional field extraction, category lookup,
//! metric classification and the metric allowlist.

use std::fmt;

use crate::{
    config::ExtractionConfig,
    mapping::{MetricType, Scenario, Sector, classify_metric},
    sheet::{Cell, cell_at},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoryField {
    Sector,
    Scenario,
}

impl fmt::Display for CategoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryField::Sector => f.write_str("sector"),
            CategoryField::Scenario => f.write_str("scenario"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedLabel {
    pub field: CategoryField,
    /// `None` when the cell was empty or not text.
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    UnmappedCategory(Vec<UnmappedLabel>),
    MissingMetricType,
    MetricNotAllowed(MetricType),
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::UnmappedCategory(_) => "unmapped_category",
            RejectReason::MissingMetricType => "missing_metric_type",
            RejectReason::MetricNotAllowed(_) => "metric_not_allowed",
        }
    }
}

/// Metadata shared by every record produced from one accepted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub scenario: Scenario,
    pub sector: Sector,
    pub region: String,
    pub metric_type: MetricType,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Accepted(NormalizedRow),
    Rejected(RejectReason),
}

/// Non-blank text at `index`. Numbers, booleans and blank strings in a
/// label column count as absent.
pub(crate) fn text_field(row: &[Cell], index: usize) -> Option<&str> {
    cell_at(row, index)
        .as_text()
        .filter(|text| !text.trim().is_empty())
}

pub fn normalize_row(row: &[Cell], config: &ExtractionConfig) -> RowOutcome {
    let offsets = &config.columns;
    let matching = config.label_matching;

    let scenario_raw = text_field(row, offsets.scenario);
    let sector_raw = text_field(row, offsets.sector);
    let scenario = scenario_raw.and_then(|label| config.mappings.scenario(label, matching));
    let sector = sector_raw.and_then(|label| config.mappings.sector(label, matching));

    let (scenario, sector) = match (scenario, sector) {
        (Some(scenario), Some(sector)) => (scenario, sector),
        (scenario, sector) => {
            let mut unmapped = Vec::new();
            if scenario.is_none() {
                unmapped.push(UnmappedLabel {
                    field: CategoryField::Scenario,
                    label: scenario_raw.map(str::to_string),
                });
            }
            if sector.is_none() {
                unmapped.push(UnmappedLabel {
                    field: CategoryField::Sector,
                    label: sector_raw.map(str::to_string),
                });
            }
            return RowOutcome::Rejected(RejectReason::UnmappedCategory(unmapped));
        }
    };

    let Some(metric_type) = classify_metric(
        text_field(row, offsets.metric),
        &config.activity_labels,
        config.unknown_metric,
    ) else {
        return RowOutcome::Rejected(RejectReason::MissingMetricType);
    };
    if !config.allows_metric(&metric_type) {
        return RowOutcome::Rejected(RejectReason::MetricNotAllowed(metric_type));
    }

    let region = text_field(row, offsets.region)
        .unwrap_or(config.fallback_region.as_str())
        .to_string();
    let unit = text_field(row, offsets.unit).unwrap_or_default().to_string();

    RowOutcome::Accepted(NormalizedRow {
        scenario,
        sector,
        region,
        metric_type,
        unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;
    use crate::mapping::LabelMatching;

    fn row(scenario: &str, region: &str, metric: &str, unit: &str, sector: &str) -> Vec<Cell> {
        [
            "PARAM", scenario, "Sheet", region, metric, unit, "Table", sector,
        ]
        .iter()
        .map(|value| Cell::from_text(value))
        .collect()
    }

    fn v2() -> ExtractionConfig {
        ExtractionConfig::profile(Profile::V2)
    }

    #[test]
    fn accepts_mapped_emissions_row() {
        let outcome = normalize_row(
            &row("SBTi 1.5C", "World", "Emissions", "MtCO2", "Cement"),
            &v2(),
        );
        assert_eq!(
            outcome,
            RowOutcome::Accepted(NormalizedRow {
                scenario: Scenario::Sbti1p5c,
                sector: Sector::Cement,
                region: "World".into(),
                metric_type: MetricType::Emissions,
                unit: "MtCO2".into(),
            })
        );
    }

    #[test]
    fn empty_region_falls_back() {
        let RowOutcome::Accepted(accepted) =
            normalize_row(&row("NZE2021", "", "Emissions", "", "Power"), &v2())
        else {
            panic!("row should be accepted");
        };
        assert_eq!(accepted.region, "World");
        assert_eq!(accepted.unit, "");
        assert_eq!(accepted.sector, Sector::PowerGeneration);
    }

    #[test]
    fn unmapped_sector_is_rejected_with_label() {
        let outcome = normalize_row(
            &row("SBTi 1.5C", "World", "Emissions", "MtCO2", "Chemicals"),
            &v2(),
        );
        assert_eq!(
            outcome,
            RowOutcome::Rejected(RejectReason::UnmappedCategory(vec![UnmappedLabel {
                field: CategoryField::Sector,
                label: Some("Chemicals".into()),
            }]))
        );
    }

    #[test]
    fn both_misses_are_reported() {
        let outcome = normalize_row(&row("B2DS", "World", "Emissions", "Mt", ""), &v2());
        let RowOutcome::Rejected(RejectReason::UnmappedCategory(labels)) = outcome else {
            panic!("expected unmapped category");
        };
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].field, CategoryField::Scenario);
        assert_eq!(labels[0].label.as_deref(), Some("B2DS"));
        assert_eq!(labels[1].label, None);
    }

    #[test]
    fn unmapped_category_wins_over_metric_filter() {
        let outcome = normalize_row(
            &row("SBTi 1.5C", "World", "Electricity", "TWh", "Chemicals"),
            &v2(),
        );
        let RowOutcome::Rejected(reason) = outcome else {
            panic!("row should be rejected");
        };
        assert_eq!(reason.code(), "unmapped_category");
    }

    #[test]
    fn allowlist_filters_activity_rows() {
        let outcome = normalize_row(
            &row("SBTi 1.5C", "World", "Electricity", "TWh", "Power"),
            &v2(),
        );
        assert_eq!(
            outcome,
            RowOutcome::Rejected(RejectReason::MetricNotAllowed(MetricType::Activity))
        );

        let mut open = v2();
        open.metric_allowlist = None;
        let RowOutcome::Accepted(accepted) = normalize_row(
            &row("SBTi 1.5C", "World", "Electricity", "TWh", "Power"),
            &open,
        ) else {
            panic!("row should be accepted without an allowlist");
        };
        assert_eq!(accepted.metric_type, MetricType::Activity);
    }

    #[test]
    fn unknown_metric_passes_through_without_allowlist() {
        let mut open = v2();
        open.metric_allowlist = None;
        let RowOutcome::Accepted(accepted) = normalize_row(
            &row("ETP B2DS", "OECD", "Intensity", "tCO2/t", "Iron and steel"),
            &open,
        ) else {
            panic!("row should be accepted");
        };
        assert_eq!(accepted.metric_type, MetricType::Other("Intensity".into()));
        assert_eq!(accepted.region, "OECD");
    }

    #[test]
    fn missing_metric_is_rejected_under_passthrough() {
        let mut open = v2();
        open.metric_allowlist = None;
        assert_eq!(
            normalize_row(&row("ETP B2DS", "World", "", "Mt", "Cement"), &open),
            RowOutcome::Rejected(RejectReason::MissingMetricType)
        );
    }

    #[test]
    fn normalized_matching_rescues_label_variants() {
        let mut config = v2();
        let cells = row(" sbti 1.5c", "World", "Emissions", "Mt", "CEMENT");
        assert!(matches!(
            normalize_row(&cells, &config),
            RowOutcome::Rejected(RejectReason::UnmappedCategory(_))
        ));
        config.label_matching = LabelMatching::Normalized;
        assert!(matches!(
            normalize_row(&cells, &config),
            RowOutcome::Accepted(_)
        ));
    }

    #[test]
    fn numeric_label_cells_count_as_absent() {
        let mut cells = row("SBTi 1.5C", "World", "Emissions", "Mt", "Cement");
        cells[7] = Cell::Number(7.0);
        assert!(matches!(
            normalize_row(&cells, &v2()),
            RowOutcome::Rejected(RejectReason::UnmappedCategory(_))
        ));
    }
}
