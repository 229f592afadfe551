//! Corpus summary and region rankings.

use crate::models::{CorpusSummary, RegionAggregate};

/// Reduce the region table to a single corpus summary.
///
/// Means are simple unweighted averages across regions and are zero for
/// an empty corpus.
pub fn summarize_regions<'a, I>(regions: I) -> CorpusSummary
where
    I: IntoIterator<Item = &'a RegionAggregate>,
{
    let mut summary = CorpusSummary::default();
    let mut volatility_sum = 0.0;
    let mut compliance_sum = 0.0;

    for region in regions {
        summary.total_regions += 1;
        summary.total_enrolments += region.total_enrolments;
        summary.total_demo_updates += region.total_demo_updates;
        summary.total_bio_updates += region.total_bio_updates;

        volatility_sum += region.metrics.identity_volatility;
        compliance_sum += region.metrics.adult_bio_compliance;

        *summary
            .typology_distribution
            .entry(region.typology)
            .or_insert(0) += 1;
    }

    if summary.total_regions > 0 {
        let n = summary.total_regions as f64;
        summary.avg_identity_volatility = volatility_sum / n;
        summary.avg_adult_bio_compliance = compliance_sum / n;
    }

    summary
}

/// The `n` regions with the highest identity volatility.
pub fn most_volatile<'a, I>(regions: I, n: usize) -> Vec<&'a RegionAggregate>
where
    I: IntoIterator<Item = &'a RegionAggregate>,
{
    let mut ranked: Vec<_> = regions.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.metrics
            .identity_volatility
            .total_cmp(&a.metrics.identity_volatility)
    });
    ranked.truncate(n);
    ranked
}

/// The `n` regions with enrolments but the lowest adult biometric compliance.
pub fn lowest_compliance<'a, I>(regions: I, n: usize) -> Vec<&'a RegionAggregate>
where
    I: IntoIterator<Item = &'a RegionAggregate>,
{
    let mut ranked: Vec<_> = regions
        .into_iter()
        .filter(|r| r.enrol_18_plus > 0)
        .collect();
    ranked.sort_by(|a, b| {
        a.metrics
            .adult_bio_compliance
            .total_cmp(&b.metrics.adult_bio_compliance)
    });
    ranked.truncate(n);
    ranked
}
