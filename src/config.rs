//! Extraction configuration and built-in profiles.
//!
//! Everything that used to be a literal in the extraction scripts (column
//! positions, year bounds, lookup tables, the metric allowlist, provenance)
//! lives in [`ExtractionConfig`]. Profiles are complete configurations that
//! can be dumped to YAML, edited, and loaded back with `--config`.

use std::{collections::BTreeSet, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    error::ExtractError,
    mapping::{
        CategoryMapping, EMISSIONS_LABEL, LabelMatching, MetricType, UnknownMetricPolicy,
        default_activity_labels,
    },
    scanner::YearRange,
};

pub const DEFAULT_TABLE: &str = "sbti_pathways";
pub const DEFAULT_REGION: &str = "World";

/// Zero-based positions of the metadata fields within a data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOffsets {
    pub scenario: usize,
    pub region: usize,
    pub metric: usize,
    pub unit: usize,
    pub sector: usize,
    /// First column considered when scanning the header for years.
    pub values_from: usize,
}

impl Default for ColumnOffsets {
    fn default() -> Self {
        Self {
            scenario: 1,
            region: 3,
            metric: 4,
            unit: 5,
            sector: 7,
            values_from: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Profile {
    /// Full v2.4 mapping, emissions rows only
    #[default]
    V2,
    /// Original extraction: reduced mapping, every metric kept
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub year_range: YearRange,
    pub columns: ColumnOffsets,
    pub mappings: CategoryMapping,
    pub label_matching: LabelMatching,
    pub activity_labels: BTreeSet<String>,
    pub unknown_metric: UnknownMetricPolicy,
    /// `null` keeps every metric type.
    pub metric_allowlist: Option<BTreeSet<String>>,
    pub fallback_region: String,
    pub provenance: String,
    pub table: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::profile(Profile::V2)
    }
}

impl ExtractionConfig {
    pub fn profile(profile: Profile) -> Self {
        match profile {
            Profile::V2 => Self {
                year_range: YearRange::default(),
                columns: ColumnOffsets::default(),
                mappings: CategoryMapping::v2(),
                label_matching: LabelMatching::Exact,
                activity_labels: default_activity_labels(),
                unknown_metric: UnknownMetricPolicy::Passthrough,
                metric_allowlist: Some(BTreeSet::from([EMISSIONS_LABEL.to_string()])),
                fallback_region: DEFAULT_REGION.to_string(),
                provenance: "IEA SBTi Tool v2.4".to_string(),
                table: DEFAULT_TABLE.to_string(),
            },
            Profile::Legacy => Self {
                year_range: YearRange::default(),
                columns: ColumnOffsets {
                    values_from: 0,
                    ..ColumnOffsets::default()
                },
                mappings: CategoryMapping::legacy(),
                label_matching: LabelMatching::Exact,
                activity_labels: BTreeSet::new(),
                unknown_metric: UnknownMetricPolicy::Activity,
                metric_allowlist: None,
                fallback_region: DEFAULT_REGION.to_string(),
                provenance: "IEA Database Sheet".to_string(),
                table: DEFAULT_TABLE.to_string(),
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: ExtractionConfig =
            serde_yaml::from_reader(reader).context("Parsing config YAML")?;
        config
            .validate()
            .with_context(|| format!("Validating config {path:?}"))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let file = File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing config YAML")
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing config to YAML string")
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        self.year_range.validate()?;
        validate_table_name(&self.table)
    }

    pub fn allows_metric(&self, metric: &MetricType) -> bool {
        self.metric_allowlist
            .as_ref()
            .is_none_or(|allowed| allowed.contains(metric.as_str()))
    }
}

/// Accepts `table` or `schema.table`, each part a plain SQL identifier. The
/// name is spliced into statements verbatim, so nothing else gets through.
pub fn validate_table_name(name: &str) -> Result<(), ExtractError> {
    let parts: Vec<&str> = name.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(ExtractError::InvalidTableName(name.to_string()))
    }
}
