//! Canonical vocabulary and the lookup tables that map raw spreadsheet
//! labels onto it.
//!
//! Sectors and scenarios form closed sets: a label that is not in the
//! mapping rejects the row. Metric types stay open, with a small rule that
//! folds known synonyms together and forwards everything else.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize, Serializer};

pub const EMISSIONS_LABEL: &str = "Emissions";
pub const ACTIVITY_LABEL: &str = "Activity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    IronSteel,
    Cement,
    Aluminum,
    PulpPaper,
    CrossSector,
    Buildings,
    PowerGeneration,
    Transport,
}

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::IronSteel => "iron_steel",
            Sector::Cement => "cement",
            Sector::Aluminum => "aluminum",
            Sector::PulpPaper => "pulp_paper",
            Sector::CrossSector => "cross_sector",
            Sector::Buildings => "buildings",
            Sector::PowerGeneration => "power_generation",
            Sector::Transport => "transport",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scenario {
    #[serde(rename = "ETP_B2DS")]
    EtpB2ds,
    #[serde(rename = "SBTi_1.5C")]
    Sbti1p5c,
    #[serde(rename = "NZE2021")]
    Nze2021,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::EtpB2ds => "ETP_B2DS",
            Scenario::Sbti1p5c => "SBTi_1.5C",
            Scenario::Nze2021 => "NZE2021",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricType {
    Emissions,
    Activity,
    Other(String),
}

impl MetricType {
    pub fn as_str(&self) -> &str {
        match self {
            MetricType::Emissions => EMISSIONS_LABEL,
            MetricType::Activity => ACTIVITY_LABEL,
            MetricType::Other(label) => label.as_str(),
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MetricType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// What happens to a metric label that is neither `Emissions` nor a known
/// activity synonym.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "kebab-case")]
pub enum UnknownMetricPolicy {
    /// Forward the raw label unchanged
    #[default]
    Passthrough,
    /// Fold it into `Activity`, including absent labels
    Activity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "kebab-case")]
pub enum LabelMatching {
    /// Raw labels must equal a mapping key byte for byte
    #[default]
    Exact,
    /// Compare after trimming, collapsing whitespace and lowercasing
    Normalized,
}

pub fn normalize_label(label: &str) -> String {
    label.split_whitespace().join(" ").to_lowercase()
}

pub fn default_activity_labels() -> BTreeSet<String> {
    ["Electricity", "Activity"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Classifies a raw metric label. Returns `None` only when the label is
/// absent and the policy has nothing to fall back on.
pub fn classify_metric(
    raw: Option<&str>,
    activity_labels: &BTreeSet<String>,
    policy: UnknownMetricPolicy,
) -> Option<MetricType> {
    match (raw, policy) {
        (Some(EMISSIONS_LABEL), _) => Some(MetricType::Emissions),
        (Some(label), _) if activity_labels.contains(label) => Some(MetricType::Activity),
        (Some(label), UnknownMetricPolicy::Passthrough) => {
            Some(MetricType::Other(label.to_string()))
        }
        (_, UnknownMetricPolicy::Activity) => Some(MetricType::Activity),
        (None, UnknownMetricPolicy::Passthrough) => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryMapping {
    #[serde(default)]
    pub sector: BTreeMap<String, Sector>,
    #[serde(default)]
    pub scenario: BTreeMap<String, Scenario>,
}

impl CategoryMapping {
    /// Complete mapping for the v2.4 target-setting tool's `Database` sheet.
    pub fn v2() -> Self {
        let sector = [
            ("Iron and steel", Sector::IronSteel),
            ("Cement", Sector::Cement),
            ("Aluminium", Sector::Aluminum),
            ("Aluminum", Sector::Aluminum),
            ("Pulp and paper", Sector::PulpPaper),
            ("Other industry", Sector::CrossSector),
            ("Services - Buildings", Sector::Buildings),
            ("Residential Buildings", Sector::Buildings),
            ("Power", Sector::PowerGeneration),
            ("Power generation", Sector::PowerGeneration),
            ("Transport", Sector::Transport),
            ("Primary energy demand and industry", Sector::CrossSector),
        ];
        Self::from_pairs(&sector, &default_scenarios())
    }

    /// Reduced mapping used by the first extraction runs.
    pub fn legacy() -> Self {
        let sector = [
            ("Iron and steel", Sector::IronSteel),
            ("Cement", Sector::Cement),
            ("Aluminium", Sector::Aluminum),
            ("Pulp and paper", Sector::PulpPaper),
            ("Other industry", Sector::CrossSector),
            ("Services - Buildings", Sector::Buildings),
            ("Power", Sector::PowerGeneration),
            ("Power generation", Sector::PowerGeneration),
        ];
        Self::from_pairs(&sector, &default_scenarios())
    }

    pub fn from_pairs(sector: &[(&str, Sector)], scenario: &[(&str, Scenario)]) -> Self {
        Self {
            sector: sector
                .iter()
                .map(|(label, value)| (label.to_string(), *value))
                .collect(),
            scenario: scenario
                .iter()
                .map(|(label, value)| (label.to_string(), *value))
                .collect(),
        }
    }

    pub fn sector(&self, label: &str, matching: LabelMatching) -> Option<Sector> {
        lookup(&self.sector, label, matching)
    }

    pub fn scenario(&self, label: &str, matching: LabelMatching) -> Option<Scenario> {
        lookup(&self.scenario, label, matching)
    }
}

fn default_scenarios() -> [(&'static str, Scenario); 3] {
    [
        ("ETP B2DS", Scenario::EtpB2ds),
        ("SBTi 1.5C", Scenario::Sbti1p5c),
        ("NZE2021", Scenario::Nze2021),
    ]
}

fn lookup<T: Copy>(map: &BTreeMap<String, T>, label: &str, matching: LabelMatching) -> Option<T> {
    match matching {
        LabelMatching::Exact => map.get(label).copied(),
        LabelMatching::Normalized => {
            let wanted = normalize_label(label);
            map.iter()
                .find(|(key, _)| normalize_label(key) == wanted)
                .map(|(_, value)| *value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_lookup_is_case_and_space_sensitive() {
        let mapping = CategoryMapping::v2();
        assert_eq!(
            mapping.sector("Cement", LabelMatching::Exact),
            Some(Sector::Cement)
        );
        assert_eq!(mapping.sector("cement", LabelMatching::Exact), None);
        assert_eq!(mapping.sector("Cement ", LabelMatching::Exact), None);
        assert_eq!(mapping.sector("Chemicals", LabelMatching::Exact), None);
    }

    #[test]
    fn normalized_lookup_tolerates_label_variants() {
        let mapping = CategoryMapping::v2();
        assert_eq!(
            mapping.sector("  iron AND   steel ", LabelMatching::Normalized),
            Some(Sector::IronSteel)
        );
        assert_eq!(
            mapping.scenario("sbti 1.5c", LabelMatching::Normalized),
            Some(Scenario::Sbti1p5c)
        );
        assert_eq!(mapping.sector("Chemicals", LabelMatching::Normalized), None);
    }

    #[test]
    fn legacy_mapping_lacks_late_additions() {
        let legacy = CategoryMapping::legacy();
        assert_eq!(legacy.sector("Transport", LabelMatching::Exact), None);
        assert_eq!(legacy.sector("Aluminum", LabelMatching::Exact), None);
        assert_eq!(
            legacy.scenario("NZE2021", LabelMatching::Exact),
            Some(Scenario::Nze2021)
        );
    }

    #[test]
    fn classify_metric_folds_synonyms() {
        let labels = default_activity_labels();
        let passthrough = UnknownMetricPolicy::Passthrough;
        assert_eq!(
            classify_metric(Some("Emissions"), &labels, passthrough),
            Some(MetricType::Emissions)
        );
        assert_eq!(
            classify_metric(Some("Electricity"), &labels, passthrough),
            Some(MetricType::Activity)
        );
        assert_eq!(
            classify_metric(Some("Intensity"), &labels, passthrough),
            Some(MetricType::Other("Intensity".into()))
        );
        assert_eq!(classify_metric(None, &labels, passthrough), None);
        assert_eq!(
            classify_metric(Some("emissions"), &labels, passthrough),
            Some(MetricType::Other("emissions".into()))
        );
    }

    #[test]
    fn activity_policy_absorbs_unknown_and_absent_labels() {
        let labels = default_activity_labels();
        let policy = UnknownMetricPolicy::Activity;
        assert_eq!(
            classify_metric(Some("Intensity"), &labels, policy),
            Some(MetricType::Activity)
        );
        assert_eq!(classify_metric(None, &labels, policy), Some(MetricType::Activity));
        assert_eq!(
            classify_metric(Some("Emissions"), &labels, policy),
            Some(MetricType::Emissions)
        );
    }

    #[test]
    fn canonical_names_match_serde_names() {
        for sector in [Sector::IronSteel, Sector::PowerGeneration, Sector::PulpPaper] {
            let yaml = serde_yaml::to_string(&sector).expect("serialize sector");
            assert_eq!(yaml.trim(), sector.as_str());
        }
        let yaml = serde_yaml::to_string(&Scenario::Sbti1p5c).expect("serialize scenario");
        assert_eq!(yaml.trim().trim_matches(['\'', '"']), "SBTi_1.5C");
    }
}
