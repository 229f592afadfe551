//! Region typology classification.
//!
//! Two independent policies exist. The relative policy compares a region
//! against corpus medians, so corpus statistics are computed first and
//! passed in explicitly. The absolute policy uses fixed thresholds and
//! needs nothing beyond the region itself.

use crate::models::{RegionAggregate, Typology};
use serde::{Deserialize, Serialize};

/// Which classification policy assigns typology labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TypologyPolicy {
    /// Median-based thresholds over the whole corpus.
    #[default]
    Relative,
    /// Fixed thresholds, evaluated per region.
    Absolute,
}

impl TypologyPolicy {
    pub fn classify(&self, agg: &RegionAggregate, stats: &CorpusStats) -> Typology {
        match self {
            TypologyPolicy::Relative => classify_relative(agg, stats),
            TypologyPolicy::Absolute => classify_absolute(agg),
        }
    }

    /// The closed label set this policy can produce.
    #[cfg(test)]
    pub fn labels(&self) -> &'static [Typology] {
        match self {
            TypologyPolicy::Relative => &[
                Typology::StableSaturated,
                Typology::Volatile,
                Typology::GrowthFocused,
                Typology::UnderMaintained,
                Typology::Balanced,
            ],
            TypologyPolicy::Absolute => &[
                Typology::NoData,
                Typology::AdultHeavy,
                Typology::ChildHeavy,
                Typology::HighChurn,
                Typology::WellMaintained,
                Typology::Standard,
            ],
        }
    }
}

/// Corpus-wide statistics consumed by the relative policy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CorpusStats {
    pub median_enrolment: f64,
    pub median_volatility: f64,
}

impl CorpusStats {
    /// Medians of total enrolments and identity volatility across regions.
    ///
    /// Metrics must already be computed on the given aggregates.
    pub fn from_regions<'a, I>(regions: I) -> Self
    where
        I: IntoIterator<Item = &'a RegionAggregate>,
    {
        let (enrolments, volatility): (Vec<f64>, Vec<f64>) = regions
            .into_iter()
            .map(|r| (r.total_enrolments as f64, r.metrics.identity_volatility))
            .unzip();

        Self {
            median_enrolment: median(enrolments),
            median_volatility: median(volatility),
        }
    }
}

/// Median of a sample; the mean of the two middle values for an even
/// count, and zero for an empty sample.
pub fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;

    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Median-relative classification. First matching rule wins.
pub fn classify_relative(agg: &RegionAggregate, stats: &CorpusStats) -> Typology {
    let volatility = agg.metrics.identity_volatility;
    let enrolment = agg.total_enrolments as f64;

    if volatility < stats.median_volatility && enrolment < stats.median_enrolment {
        Typology::StableSaturated
    } else if volatility >= stats.median_volatility {
        Typology::Volatile
    } else if enrolment >= stats.median_enrolment && volatility < stats.median_volatility {
        Typology::GrowthFocused
    } else if agg.metrics.adult_bio_compliance < 50.0 {
        Typology::UnderMaintained
    } else {
        Typology::Balanced
    }
}

/// Fixed-threshold classification. First matching rule wins.
pub fn classify_absolute(agg: &RegionAggregate) -> Typology {
    let m = &agg.metrics;

    if agg.total_enrolments == 0 {
        Typology::NoData
    } else if m.adult_enrolment_share > 70.0 {
        Typology::AdultHeavy
    } else if m.child_enrolment_share > 50.0 {
        Typology::ChildHeavy
    } else if m.identity_volatility > 0.5 {
        Typology::HighChurn
    } else if m.lifecycle_integrity > 50.0 {
        Typology::WellMaintained
    } else {
        Typology::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegionKey;

    fn region(total_enrolments: u64, volatility: f64) -> RegionAggregate {
        let mut agg = RegionAggregate::empty(RegionKey::new("S", "D"));
        agg.total_enrolments = total_enrolments;
        agg.metrics.identity_volatility = volatility;
        agg
    }

    #[test]
    fn test_median_odd_even_empty() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(vec![]), 0.0);
    }

    #[test]
    fn test_corpus_stats() {
        let regions = vec![region(10, 0.1), region(30, 0.5), region(20, 0.3)];
        let stats = CorpusStats::from_regions(&regions);
        assert_eq!(stats.median_enrolment, 20.0);
        assert_eq!(stats.median_volatility, 0.3);
    }

    #[test]
    fn test_relative_rules() {
        let stats = CorpusStats {
            median_enrolment: 100.0,
            median_volatility: 0.5,
        };

        assert_eq!(
            classify_relative(&region(50, 0.1), &stats),
            Typology::StableSaturated
        );
        assert_eq!(classify_relative(&region(50, 0.5), &stats), Typology::Volatile);
        assert_eq!(classify_relative(&region(500, 0.9), &stats), Typology::Volatile);
        assert_eq!(
            classify_relative(&region(100, 0.2), &stats),
            Typology::GrowthFocused
        );
    }

    #[test]
    fn test_relative_policy_over_corpus() {
        let regions = vec![region(10, 0.1), region(20, 0.2), region(30, 0.3)];
        let stats = CorpusStats::from_regions(&regions);
        let labels: Vec<_> = regions
            .iter()
            .map(|r| TypologyPolicy::Relative.classify(r, &stats))
            .collect();

        assert_eq!(
            labels,
            vec![
                Typology::StableSaturated,
                Typology::Volatile,
                Typology::Volatile
            ]
        );
        for label in labels {
            assert!(TypologyPolicy::Relative.labels().contains(&label));
        }
    }

    #[test]
    fn test_absolute_rules_in_order() {
        assert_eq!(classify_absolute(&region(0, 9.0)), Typology::NoData);

        let mut adult = region(100, 0.0);
        adult.metrics.adult_enrolment_share = 70.5;
        adult.metrics.child_enrolment_share = 60.0;
        assert_eq!(classify_absolute(&adult), Typology::AdultHeavy);

        let mut child = region(100, 0.9);
        child.metrics.adult_enrolment_share = 40.0;
        child.metrics.child_enrolment_share = 60.0;
        assert_eq!(classify_absolute(&child), Typology::ChildHeavy);

        let mut churn = region(100, 0.6);
        churn.metrics.adult_enrolment_share = 50.0;
        churn.metrics.child_enrolment_share = 50.0;
        churn.metrics.lifecycle_integrity = 90.0;
        assert_eq!(classify_absolute(&churn), Typology::HighChurn);

        let mut maintained = region(100, 0.5);
        maintained.metrics.adult_enrolment_share = 50.0;
        maintained.metrics.child_enrolment_share = 50.0;
        maintained.metrics.lifecycle_integrity = 50.1;
        assert_eq!(classify_absolute(&maintained), Typology::WellMaintained);

        maintained.metrics.lifecycle_integrity = 50.0;
        assert_eq!(classify_absolute(&maintained), Typology::Standard);
    }

    #[test]
    fn test_absolute_ignores_corpus_stats() {
        let agg = region(0, 0.0);
        let skewed = CorpusStats {
            median_enrolment: 1e9,
            median_volatility: 1e9,
        };
        assert_eq!(
            TypologyPolicy::Absolute.classify(&agg, &skewed),
            TypologyPolicy::Absolute.classify(&agg, &CorpusStats::default())
        );
    }
}
