//! Aggregation and derived-metrics pipeline.
//!
//! Raw events flow through region aggregation, metric derivation and
//! typology classification into the per-region table. Time series and the
//! corpus summary are computed from the raw events and the finished table
//! respectively.

pub mod aggregator;
pub mod index;
pub mod metrics;
pub mod summary;
pub mod timeseries;
pub mod typology;

pub use aggregator::aggregate_regions;
pub use index::RegionIndex;
pub use metrics::{compute_metrics, ImbalanceVariant, LifecycleVariant};
pub use summary::{lowest_compliance, most_volatile, summarize_regions};
pub use timeseries::build_time_series;
pub use typology::{CorpusStats, TypologyPolicy};

use crate::config::AnalysisConfig;
use crate::models::{RegionAggregate, RegionKey};
use crate::source::RecordStore;
use std::collections::BTreeMap;

/// Build the complete per-region table.
///
/// Classification runs in a second phase, after corpus statistics over
/// the fully derived table are known.
pub fn build_region_table(
    store: &RecordStore,
    options: &AnalysisConfig,
) -> BTreeMap<RegionKey, RegionAggregate> {
    let mut regions = aggregate_regions(store);

    for agg in regions.values_mut() {
        agg.metrics = compute_metrics(agg, options.lifecycle, options.imbalance);
    }

    let stats = CorpusStats::from_regions(regions.values());

    for agg in regions.values_mut() {
        agg.typology = options.typology.classify(agg, &stats);
    }

    regions
}
