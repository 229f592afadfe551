//! Derived ratio and percentage metrics.
//!
//! Every division goes through [`safe_div`], which replaces a zero
//! denominator with 1. A region with no enrolments therefore gets zero
//! shares rather than an error or infinity.

use crate::models::{DerivedMetrics, RegionAggregate};
use serde::{Deserialize, Serialize};

/// How `lifecycle_integrity` is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum LifecycleVariant {
    /// total_bio_updates / total_demo_updates
    #[default]
    #[serde(rename = "ratio")]
    #[value(name = "ratio")]
    BioToDemoRatio,
    /// (total_bio + total_demo) / (2 * total_enrolments) * 100
    #[serde(rename = "normalized")]
    #[value(name = "normalized")]
    NormalizedPercentage,
}

impl LifecycleVariant {
    /// Whether the metric is a percentage (and clamped for presentation).
    pub fn is_percentage(&self) -> bool {
        matches!(self, LifecycleVariant::NormalizedPercentage)
    }
}

/// How `maintenance_imbalance` is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImbalanceVariant {
    /// (demo - bio) / demo; negative when bio updates dominate.
    #[default]
    Signed,
    /// |demo - bio| / (demo + bio); bounded to [0, 1].
    Unsigned,
}

/// Zero-guarded division: a zero denominator is treated as 1.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    let denominator = if denominator == 0.0 { 1.0 } else { denominator };
    numerator / denominator
}

pub fn lifecycle_integrity(agg: &RegionAggregate, variant: LifecycleVariant) -> f64 {
    let bio = agg.total_bio_updates as f64;
    let demo = agg.total_demo_updates as f64;

    match variant {
        LifecycleVariant::BioToDemoRatio => safe_div(bio, demo),
        LifecycleVariant::NormalizedPercentage => {
            let enrolments = agg.total_enrolments as f64;
            // Guard applies before doubling: zero enrolments divide by 2.
            safe_div(bio + demo, enrolments) / 2.0 * 100.0
        }
    }
}

pub fn maintenance_imbalance(agg: &RegionAggregate, variant: ImbalanceVariant) -> f64 {
    let bio = agg.total_bio_updates as f64;
    let demo = agg.total_demo_updates as f64;

    match variant {
        ImbalanceVariant::Signed => safe_div(demo - bio, demo),
        ImbalanceVariant::Unsigned => safe_div((demo - bio).abs(), demo + bio),
    }
}

/// Compute all derived metrics for one region's counts.
pub fn compute_metrics(
    agg: &RegionAggregate,
    lifecycle: LifecycleVariant,
    imbalance: ImbalanceVariant,
) -> DerivedMetrics {
    let total_enrolments = agg.total_enrolments as f64;
    let child_enrolments = agg.enrol_0_5.saturating_add(agg.enrol_5_17) as f64;

    DerivedMetrics {
        adult_enrolment_share: safe_div(agg.enrol_18_plus as f64, total_enrolments) * 100.0,
        child_enrolment_share: safe_div(child_enrolments, total_enrolments) * 100.0,
        identity_volatility: safe_div(agg.total_demo_updates as f64, total_enrolments),
        adult_bio_compliance: safe_div(agg.bio_18_plus as f64, agg.enrol_18_plus as f64) * 100.0,
        child_bio_compliance: safe_div(agg.bio_5_17 as f64, child_enrolments) * 100.0,
        lifecycle_integrity: lifecycle_integrity(agg, lifecycle),
        maintenance_imbalance: maintenance_imbalance(agg, imbalance),
    }
}
