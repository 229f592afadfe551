//! Data models for the region analytics pipeline.
//!
//! This module contains the core data structures shared across the
//! application: raw transaction events, the composite region key, the
//! per-region aggregate with its derived metrics, time series, the corpus
//! summary and the presentation view served to consumers.

use crate::analysis::{ImbalanceVariant, LifecycleVariant, TypologyPolicy};
use crate::config::SourceMode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Composite identity of an administrative district.
///
/// Ordering is lexicographic by (state, district), which keeps every
/// region table deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionKey {
    pub state: String,
    pub district: String,
}

impl RegionKey {
    pub fn new(state: impl Into<String>, district: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            district: district.into(),
        }
    }

    /// The `state|district` composite form used as the export key.
    pub fn composite(&self) -> String {
        format!("{}|{}", self.state, self.district)
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.state, self.district)
    }
}

/// Normalize a region name for lookup: trimmed and case-folded.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Kind of raw transaction batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Enrolment,
    Demographic,
    Biometric,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::Enrolment,
        EventKind::Demographic,
        EventKind::Biometric,
    ];

    /// Dataset folder holding this kind's CSV files.
    pub fn folder(&self) -> &'static str {
        match self {
            EventKind::Enrolment => "api_data_aadhar_enrolment",
            EventKind::Demographic => "api_data_aadhar_demographic",
            EventKind::Biometric => "api_data_aadhar_biometric",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Enrolment => write!(f, "enrolment"),
            EventKind::Demographic => write!(f, "demographic"),
            EventKind::Biometric => write!(f, "biometric"),
        }
    }
}

/// A single enrolment transaction row.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrolmentEvent {
    pub region: RegionKey,
    /// `None` when the source date failed to parse.
    pub date: Option<NaiveDate>,
    pub age_0_5: u64,
    pub age_5_17: u64,
    pub age_18_plus: u64,
}

/// A single demographic or biometric update row.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEvent {
    pub region: RegionKey,
    /// `None` when the source date failed to parse.
    pub date: Option<NaiveDate>,
    pub age_5_17: u64,
    pub age_18_plus: u64,
}

/// Ratio and percentage metrics derived from a region's counts.
///
/// Values are stored raw; percentages may exceed 100 here and are only
/// clamped in [`RegionDetail`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub adult_enrolment_share: f64,
    pub child_enrolment_share: f64,
    pub identity_volatility: f64,
    pub adult_bio_compliance: f64,
    pub child_bio_compliance: f64,
    pub lifecycle_integrity: f64,
    pub maintenance_imbalance: f64,
}

/// Categorical label summarizing a region's registration pattern.
///
/// The first five labels belong to the relative (median-based) policy,
/// the next six to the absolute policy. `Unknown` only appears on the
/// lookup-miss object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Typology {
    #[serde(rename = "Stable & Saturated")]
    StableSaturated,
    #[serde(rename = "Volatile")]
    Volatile,
    #[serde(rename = "Growth-focused")]
    GrowthFocused,
    #[serde(rename = "Under-maintained")]
    UnderMaintained,
    #[serde(rename = "Balanced")]
    Balanced,
    #[serde(rename = "No Data")]
    NoData,
    #[serde(rename = "Adult-Heavy")]
    AdultHeavy,
    #[serde(rename = "Child-Heavy")]
    ChildHeavy,
    #[serde(rename = "High-Churn")]
    HighChurn,
    #[serde(rename = "Well-Maintained")]
    WellMaintained,
    #[serde(rename = "Standard")]
    Standard,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Typology {
    pub fn label(&self) -> &'static str {
        match self {
            Typology::StableSaturated => "Stable & Saturated",
            Typology::Volatile => "Volatile",
            Typology::GrowthFocused => "Growth-focused",
            Typology::UnderMaintained => "Under-maintained",
            Typology::Balanced => "Balanced",
            Typology::NoData => "No Data",
            Typology::AdultHeavy => "Adult-Heavy",
            Typology::ChildHeavy => "Child-Heavy",
            Typology::HighChurn => "High-Churn",
            Typology::WellMaintained => "Well-Maintained",
            Typology::Standard => "Standard",
            Typology::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Typology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summed counts, derived metrics and typology for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAggregate {
    pub region: RegionKey,

    pub enrol_0_5: u64,
    pub enrol_5_17: u64,
    pub enrol_18_plus: u64,
    pub total_enrolments: u64,

    pub demo_5_17: u64,
    pub demo_18_plus: u64,
    pub total_demo_updates: u64,

    pub bio_5_17: u64,
    pub bio_18_plus: u64,
    pub total_bio_updates: u64,

    pub metrics: DerivedMetrics,
    pub typology: Typology,
}

impl RegionAggregate {
    /// Creates an aggregate with every count at zero.
    pub fn empty(region: RegionKey) -> Self {
        Self {
            region,
            enrol_0_5: 0,
            enrol_5_17: 0,
            enrol_18_plus: 0,
            total_enrolments: 0,
            demo_5_17: 0,
            demo_18_plus: 0,
            total_demo_updates: 0,
            bio_5_17: 0,
            bio_18_plus: 0,
            total_bio_updates: 0,
            metrics: DerivedMetrics::default(),
            typology: Typology::Unknown,
        }
    }

    /// Recomputes the three totals from their sub-brackets.
    pub fn recompute_totals(&mut self) {
        self.total_enrolments = self
            .enrol_0_5
            .saturating_add(self.enrol_5_17)
            .saturating_add(self.enrol_18_plus);
        self.total_demo_updates = self.demo_5_17.saturating_add(self.demo_18_plus);
        self.total_bio_updates = self.bio_5_17.saturating_add(self.bio_18_plus);
    }
}

/// Summed counts for one region in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Month bucket formatted as `YYYY-MM`.
    pub month: String,
    pub total: u64,
    pub children: u64,
    pub adults: u64,
}

/// Chronological per-kind sequences for one region.
///
/// Sequences may differ in length; months without events are absent,
/// not zero-filled. Each sequence serializes as parallel
/// `months`/`total`/`children`/`adults` arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionTimeSeries {
    #[serde(with = "monthly_columns")]
    pub enrolment: Vec<MonthlyPoint>,
    #[serde(with = "monthly_columns")]
    pub demographic: Vec<MonthlyPoint>,
    #[serde(with = "monthly_columns")]
    pub biometric: Vec<MonthlyPoint>,
}

mod monthly_columns {
    use super::MonthlyPoint;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Default, Serialize, Deserialize)]
    struct Columns {
        months: Vec<String>,
        total: Vec<u64>,
        children: Vec<u64>,
        adults: Vec<u64>,
    }

    pub fn serialize<S>(points: &[MonthlyPoint], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut columns = Columns::default();
        for point in points {
            columns.months.push(point.month.clone());
            columns.total.push(point.total);
            columns.children.push(point.children);
            columns.adults.push(point.adults);
        }
        columns.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<MonthlyPoint>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let columns = Columns::deserialize(deserializer)?;
        let len = columns.months.len();
        if [columns.total.len(), columns.children.len(), columns.adults.len()]
            .iter()
            .any(|&n| n != len)
        {
            return Err(D::Error::custom("monthly columns differ in length"));
        }

        Ok(columns
            .months
            .into_iter()
            .zip(columns.total)
            .zip(columns.children)
            .zip(columns.adults)
            .map(|(((month, total), children), adults)| MonthlyPoint {
                month,
                total,
                children,
                adults,
            })
            .collect())
    }
}

impl RegionTimeSeries {
    pub fn is_empty(&self) -> bool {
        self.enrolment.is_empty() && self.demographic.is_empty() && self.biometric.is_empty()
    }
}

/// Corpus-wide reduction of the region table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusSummary {
    #[serde(rename = "total_districts")]
    pub total_regions: usize,
    pub total_enrolments: u64,
    pub total_demo_updates: u64,
    pub total_bio_updates: u64,
    /// Unweighted mean across regions.
    pub avg_identity_volatility: f64,
    /// Unweighted mean across regions, using unclamped values.
    pub avg_adult_bio_compliance: f64,
    pub typology_distribution: BTreeMap<Typology, usize>,
}

impl CorpusSummary {
    /// Returns a copy with the means rounded for presentation.
    pub fn rounded(&self) -> Self {
        Self {
            avg_identity_volatility: round_to(self.avg_identity_volatility, 4),
            avg_adult_bio_compliance: round_to(self.avg_adult_bio_compliance, 2),
            ..self.clone()
        }
    }
}

/// Presentation view of one region, as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDetail {
    pub district: String,
    pub state: String,

    pub total_enrolments: u64,
    pub enrol_0_5: u64,
    pub enrol_5_17: u64,
    pub enrol_18_plus: u64,
    pub adult_enrolment_share: f64,
    pub child_enrolment_share: f64,

    pub total_demo_updates: u64,
    pub demo_5_17: u64,
    pub demo_18_plus: u64,

    pub total_bio_updates: u64,
    pub bio_5_17: u64,
    pub bio_18_plus: u64,

    pub identity_volatility: f64,
    pub adult_bio_compliance: f64,
    pub child_bio_compliance: f64,
    pub lifecycle_integrity: f64,
    pub maintenance_imbalance: f64,
    pub district_typology: Typology,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_series: Option<RegionTimeSeries>,
}

impl RegionDetail {
    /// Builds the presentation view of an aggregate.
    ///
    /// Percentages are clamped to 100 and all metrics rounded.
    /// `lifecycle_is_percentage` selects clamping and 2-place rounding for
    /// the normalized lifecycle form instead of 4-place ratio rounding.
    pub fn from_aggregate(
        agg: &RegionAggregate,
        lifecycle_is_percentage: bool,
        time_series: Option<RegionTimeSeries>,
    ) -> Self {
        let m = &agg.metrics;
        let lifecycle_integrity = if lifecycle_is_percentage {
            round_to(clamp_percentage(m.lifecycle_integrity), 2)
        } else {
            round_to(m.lifecycle_integrity, 4)
        };

        Self {
            district: agg.region.district.clone(),
            state: agg.region.state.clone(),
            total_enrolments: agg.total_enrolments,
            enrol_0_5: agg.enrol_0_5,
            enrol_5_17: agg.enrol_5_17,
            enrol_18_plus: agg.enrol_18_plus,
            adult_enrolment_share: round_to(clamp_percentage(m.adult_enrolment_share), 2),
            child_enrolment_share: round_to(clamp_percentage(m.child_enrolment_share), 2),
            total_demo_updates: agg.total_demo_updates,
            demo_5_17: agg.demo_5_17,
            demo_18_plus: agg.demo_18_plus,
            total_bio_updates: agg.total_bio_updates,
            bio_5_17: agg.bio_5_17,
            bio_18_plus: agg.bio_18_plus,
            identity_volatility: round_to(m.identity_volatility, 4),
            adult_bio_compliance: round_to(clamp_percentage(m.adult_bio_compliance), 2),
            child_bio_compliance: round_to(clamp_percentage(m.child_bio_compliance), 2),
            lifecycle_integrity,
            maintenance_imbalance: round_to(m.maintenance_imbalance, 4),
            district_typology: agg.typology,
            time_series,
        }
    }

    /// The well-defined result for a name that matches no region.
    pub fn unknown(name: &str) -> Self {
        let mut detail = Self::from_aggregate(
            &RegionAggregate::empty(RegionKey::new("Unknown", name)),
            false,
            Some(RegionTimeSeries::default()),
        );
        detail.district_typology = Typology::Unknown;
        detail
    }

    pub fn is_unknown(&self) -> bool {
        self.district_typology == Typology::Unknown
    }
}

/// Number of raw rows loaded per event kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    pub enrolment: usize,
    pub demographic: usize,
    pub biometric: usize,
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where the raw datasets were read from.
    pub source: String,
    pub source_mode: SourceMode,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    pub typology_policy: TypologyPolicy,
    pub lifecycle_variant: LifecycleVariant,
    pub imbalance_variant: ImbalanceVariant,
    pub records: RecordCounts,
    /// Wall-clock seconds spent loading and aggregating.
    pub duration_seconds: f64,
}

/// The complete corpus report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Summary with means rounded for presentation.
    pub summary: CorpusSummary,
    /// Regions with the highest identity volatility.
    pub most_volatile: Vec<RegionDetail>,
    /// Regions with adult enrolments but the lowest adult biometric compliance.
    pub lowest_compliance: Vec<RegionDetail>,
}

/// Caps a percentage at 100 for presentation.
pub fn clamp_percentage(value: f64) -> f64 {
    value.min(100.0)
}

/// Rounds to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_key_ordering_and_composite() {
        let a = RegionKey::new("Bihar", "Patna");
        let b = RegionKey::new("Maharashtra", "Pune");
        assert!(a < b);
        assert_eq!(b.composite(), "Maharashtra|Pune");
        assert_eq!(b.to_string(), "Maharashtra|Pune");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(" Pune "), "pune");
        assert_eq!(normalize_name("PUNE"), "pune");
    }

    #[test]
    fn test_typology_labels_serialize() {
        let json = serde_json::to_string(&Typology::StableSaturated).unwrap();
        assert_eq!(json, "\"Stable & Saturated\"");
        assert_eq!(Typology::NoData.to_string(), "No Data");
    }

    #[test]
    fn test_recompute_totals() {
        let mut agg = RegionAggregate::empty(RegionKey::new("S", "D"));
        agg.enrol_0_5 = 100;
        agg.enrol_5_17 = 200;
        agg.enrol_18_plus = 700;
        agg.demo_5_17 = 3;
        agg.demo_18_plus = 4;
        agg.bio_18_plus = 9;
        agg.recompute_totals();
        assert_eq!(agg.total_enrolments, 1000);
        assert_eq!(agg.total_demo_updates, 7);
        assert_eq!(agg.total_bio_updates, 9);
    }

    #[test]
    fn test_detail_clamps_and_rounds() {
        let mut agg = RegionAggregate::empty(RegionKey::new("Kerala", "Idukki"));
        agg.metrics.adult_bio_compliance = 250.0;
        agg.metrics.child_bio_compliance = 33.33333;
        agg.metrics.identity_volatility = 0.123456;
        agg.metrics.lifecycle_integrity = 180.0;

        let ratio = RegionDetail::from_aggregate(&agg, false, None);
        assert_eq!(ratio.adult_bio_compliance, 100.0);
        assert_eq!(ratio.child_bio_compliance, 33.33);
        assert_eq!(ratio.identity_volatility, 0.1235);
        assert_eq!(ratio.lifecycle_integrity, 180.0);

        let percent = RegionDetail::from_aggregate(&agg, true, None);
        assert_eq!(percent.lifecycle_integrity, 100.0);

        // Stored values are untouched.
        assert_eq!(agg.metrics.adult_bio_compliance, 250.0);
    }

    #[test]
    fn test_unknown_detail() {
        let detail = RegionDetail::unknown("Atlantis");
        assert!(detail.is_unknown());
        assert_eq!(detail.district, "Atlantis");
        assert_eq!(detail.state, "Unknown");
        assert_eq!(detail.total_enrolments, 0);
        assert_eq!(detail.time_series, Some(RegionTimeSeries::default()));

        let json = serde_json::to_string(&detail).unwrap();
        assert!(json.contains("\"district_typology\":\"Unknown\""));
    }

    #[test]
    fn test_export_shapes() {
        let series = RegionTimeSeries {
            enrolment: vec![
                MonthlyPoint {
                    month: "2023-01".to_string(),
                    total: 10,
                    children: 3,
                    adults: 7,
                },
                MonthlyPoint {
                    month: "2023-03".to_string(),
                    total: 2,
                    children: 1,
                    adults: 1,
                },
            ],
            ..Default::default()
        };

        let value = serde_json::to_value(&series).unwrap();
        assert_eq!(
            value["enrolment"],
            serde_json::json!({
                "months": ["2023-01", "2023-03"],
                "total": [10, 2],
                "children": [3, 1],
                "adults": [7, 1],
            })
        );
        assert_eq!(value["biometric"]["months"], serde_json::json!([]));

        let parsed: RegionTimeSeries = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, series);

        let ragged = serde_json::json!({
            "enrolment": {"months": ["2023-01"], "total": [], "children": [], "adults": []},
            "demographic": {"months": [], "total": [], "children": [], "adults": []},
            "biometric": {"months": [], "total": [], "children": [], "adults": []},
        });
        assert!(serde_json::from_value::<RegionTimeSeries>(ragged).is_err());

        let summary = serde_json::to_value(CorpusSummary::default()).unwrap();
        assert_eq!(summary["total_districts"], 0);
        assert!(summary.get("total_regions").is_none());
    }

    #[test]
    fn test_summary_rounded() {
        let summary = CorpusSummary {
            avg_identity_volatility: 0.123456,
            avg_adult_bio_compliance: 45.6789,
            ..Default::default()
        };
        let rounded = summary.rounded();
        assert_eq!(rounded.avg_identity_volatility, 0.1235);
        assert_eq!(rounded.avg_adult_bio_compliance, 45.68);
    }
}
