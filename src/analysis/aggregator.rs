//! Region aggregation.
//!
//! Groups each raw collection by (state, district), sums every age bracket
//! independently and merges the three per-kind groupings with outer-join
//! semantics: a region seen in any collection yields a row, and counts of
//! kinds it never appeared in stay at zero.

use crate::models::{EnrolmentEvent, RegionAggregate, RegionKey, UpdateEvent};
use crate::source::RecordStore;
use std::collections::BTreeMap;

/// Summed enrolment brackets for one region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrolmentSums {
    pub age_0_5: u64,
    pub age_5_17: u64,
    pub age_18_plus: u64,
}

/// Summed update brackets for one region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSums {
    pub age_5_17: u64,
    pub age_18_plus: u64,
}

/// Group enrolment events by region and sum each bracket.
pub fn sum_enrolments(events: &[EnrolmentEvent]) -> BTreeMap<RegionKey, EnrolmentSums> {
    let mut grouped: BTreeMap<RegionKey, EnrolmentSums> = BTreeMap::new();

    for event in events {
        let sums = grouped.entry(event.region.clone()).or_default();
        sums.age_0_5 = sums.age_0_5.saturating_add(event.age_0_5);
        sums.age_5_17 = sums.age_5_17.saturating_add(event.age_5_17);
        sums.age_18_plus = sums.age_18_plus.saturating_add(event.age_18_plus);
    }

    grouped
}

/// Group demographic or biometric events by region and sum each bracket.
pub fn sum_updates(events: &[UpdateEvent]) -> BTreeMap<RegionKey, UpdateSums> {
    let mut grouped: BTreeMap<RegionKey, UpdateSums> = BTreeMap::new();

    for event in events {
        let sums = grouped.entry(event.region.clone()).or_default();
        sums.age_5_17 = sums.age_5_17.saturating_add(event.age_5_17);
        sums.age_18_plus = sums.age_18_plus.saturating_add(event.age_18_plus);
    }

    grouped
}

/// Outer-join the three per-kind groupings on region identity.
///
/// The returned aggregates carry counts and totals only; metrics and
/// typology are filled in by later pipeline stages.
pub fn merge_counts(
    enrolment: BTreeMap<RegionKey, EnrolmentSums>,
    demographic: BTreeMap<RegionKey, UpdateSums>,
    biometric: BTreeMap<RegionKey, UpdateSums>,
) -> BTreeMap<RegionKey, RegionAggregate> {
    let mut merged: BTreeMap<RegionKey, RegionAggregate> = BTreeMap::new();

    for (region, sums) in enrolment {
        let agg = merged
            .entry(region.clone())
            .or_insert_with(|| RegionAggregate::empty(region));
        agg.enrol_0_5 = sums.age_0_5;
        agg.enrol_5_17 = sums.age_5_17;
        agg.enrol_18_plus = sums.age_18_plus;
    }

    for (region, sums) in demographic {
        let agg = merged
            .entry(region.clone())
            .or_insert_with(|| RegionAggregate::empty(region));
        agg.demo_5_17 = sums.age_5_17;
        agg.demo_18_plus = sums.age_18_plus;
    }

    for (region, sums) in biometric {
        let agg = merged
            .entry(region.clone())
            .or_insert_with(|| RegionAggregate::empty(region));
        agg.bio_5_17 = sums.age_5_17;
        agg.bio_18_plus = sums.age_18_plus;
    }

    for agg in merged.values_mut() {
        agg.recompute_totals();
    }

    merged
}

/// One aggregation pass over the full record store.
pub fn aggregate_regions(store: &RecordStore) -> BTreeMap<RegionKey, RegionAggregate> {
    merge_counts(
        sum_enrolments(&store.enrolment),
        sum_updates(&store.demographic),
        sum_updates(&store.biometric),
    )
}
