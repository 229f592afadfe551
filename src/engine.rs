//! Memoized query engine over a loaded record store.
//!
//! The region table, the time-series table and the corpus summary are each
//! computed at most once, on first access, and then shared read-only.
//! `OnceLock` serializes the first computation: concurrent callers block
//! until the value exists instead of computing it twice.

use crate::analysis::{build_region_table, build_time_series, summarize_regions, RegionIndex};
use crate::config::AnalysisConfig;
use crate::models::{CorpusSummary, RegionAggregate, RegionDetail, RegionKey, RegionTimeSeries};
use crate::source::RecordStore;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, info};

/// Per-region aggregates together with their name index.
#[derive(Debug, Default)]
pub struct RegionTable {
    pub regions: BTreeMap<RegionKey, RegionAggregate>,
    pub index: RegionIndex,
}

pub struct InsightEngine {
    store: RecordStore,
    options: AnalysisConfig,
    regions: OnceLock<RegionTable>,
    time_series: OnceLock<BTreeMap<RegionKey, RegionTimeSeries>>,
    summary: OnceLock<CorpusSummary>,
}

impl InsightEngine {
    pub fn new(store: RecordStore, options: AnalysisConfig) -> Self {
        Self {
            store,
            options,
            regions: OnceLock::new(),
            time_series: OnceLock::new(),
            summary: OnceLock::new(),
        }
    }

    pub fn options(&self) -> &AnalysisConfig {
        &self.options
    }

    fn region_table(&self) -> &RegionTable {
        self.regions.get_or_init(|| {
            let start = Instant::now();
            let regions = build_region_table(&self.store, &self.options);
            let index = RegionIndex::build(regions.keys());
            info!(
                "Computed aggregates for {} regions in {:.2}s",
                regions.len(),
                start.elapsed().as_secs_f64()
            );
            RegionTable { regions, index }
        })
    }

    fn time_series_table(&self) -> &BTreeMap<RegionKey, RegionTimeSeries> {
        self.time_series.get_or_init(|| {
            let start = Instant::now();
            let series = build_time_series(&self.store);
            info!(
                "Computed time series for {} regions in {:.2}s",
                series.len(),
                start.elapsed().as_secs_f64()
            );
            series
        })
    }

    /// Every region aggregate, keyed by composite region identity.
    pub fn get_all_region_aggregates(&self) -> &BTreeMap<RegionKey, RegionAggregate> {
        &self.region_table().regions
    }

    /// Resolve a bare or `state|district` name to its aggregate.
    pub fn get_region(&self, name: &str) -> Option<&RegionAggregate> {
        let table = self.region_table();
        let found = table
            .index
            .resolve(name)
            .and_then(|key| table.regions.get(key));
        if found.is_none() {
            debug!("No region matches '{}'", name.trim());
        }
        found
    }

    /// Time series for a region; empty when the name matches nothing.
    pub fn get_time_series(&self, name: &str) -> RegionTimeSeries {
        self.region_table()
            .index
            .resolve(name)
            .and_then(|key| self.get_time_series_by_key(key))
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_time_series_by_key(&self, key: &RegionKey) -> Option<&RegionTimeSeries> {
        self.time_series_table().get(key)
    }

    pub fn get_summary(&self) -> &CorpusSummary {
        self.summary.get_or_init(|| {
            let summary = summarize_regions(self.get_all_region_aggregates().values());
            debug!("Computed corpus summary over {} regions", summary.total_regions);
            summary
        })
    }

    /// Presentation view of one region, including its time series.
    ///
    /// A name that matches nothing yields [`RegionDetail::unknown`].
    pub fn region_detail(&self, name: &str) -> RegionDetail {
        match self.get_region(name) {
            Some(agg) => RegionDetail::from_aggregate(
                agg,
                self.options.lifecycle.is_percentage(),
                Some(self.get_time_series(name)),
            ),
            None => RegionDetail::unknown(name),
        }
    }

    /// Presentation views of every region, without time series.
    pub fn region_details(&self) -> BTreeMap<String, RegionDetail> {
        let lifecycle_is_percentage = self.options.lifecycle.is_percentage();
        self.get_all_region_aggregates()
            .values()
            .map(|agg| {
                (
                    agg.region.composite(),
                    RegionDetail::from_aggregate(agg, lifecycle_is_percentage, None),
                )
            })
            .collect()
    }

    /// Time series of every region keyed by `state|district`.
    pub fn composite_time_series(&self) -> BTreeMap<String, &RegionTimeSeries> {
        self.time_series_table()
            .iter()
            .map(|(key, series)| (key.composite(), series))
            .collect()
    }

    /// Drop every memoized result; the next query recomputes from the store.
    #[allow(dead_code)]
    pub fn clear_cache(&mut self) {
        self.regions.take();
        self.time_series.take();
        self.summary.take();
        debug!("Cleared memoized aggregates");
    }

    #[allow(dead_code)]
    pub fn is_computed(&self) -> bool {
        self.regions.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrolmentEvent, Typology, UpdateEvent};
    use chrono::NaiveDate;

    fn enrol(state: &str, district: &str, date: &str, counts: [u64; 3]) -> EnrolmentEvent {
        EnrolmentEvent {
            region: RegionKey::new(state, district),
            date: NaiveDate::parse_from_str(date, "%d-%m-%Y").ok(),
            age_0_5: counts[0],
            age_5_17: counts[1],
            age_18_plus: counts[2],
        }
    }

    fn update(state: &str, district: &str, date: &str, counts: [u64; 2]) -> UpdateEvent {
        UpdateEvent {
            region: RegionKey::new(state, district),
            date: NaiveDate::parse_from_str(date, "%d-%m-%Y").ok(),
            age_5_17: counts[0],
            age_18_plus: counts[1],
        }
    }

    fn store() -> RecordStore {
        RecordStore {
            enrolment: vec![
                enrol("Maharashtra", "Pune", "05-01-2023", [100, 200, 700]),
                enrol("Maharashtra", "Pune", "not-a-date", [0, 0, 0]),
                enrol("Maharashtra", "Aurangabad", "10-03-2023", [1, 1, 1]),
                enrol("Bihar", "Aurangabad", "11-03-2023", [2, 2, 2]),
            ],
            demographic: vec![update("Maharashtra", "Pune", "07-02-2023", [10, 40])],
            biometric: vec![update("Kerala", "Idukki", "01-01-2023", [3, 4])],
        }
    }

    #[test]
    fn test_all_aggregates_and_outer_join() {
        let engine = InsightEngine::new(store(), AnalysisConfig::default());
        let all = engine.get_all_region_aggregates();
        assert_eq!(all.len(), 4);

        let idukki = engine.get_region("idukki").unwrap();
        assert_eq!(idukki.total_enrolments, 0);
        assert_eq!(idukki.total_demo_updates, 0);
        assert_eq!(idukki.total_bio_updates, 7);
    }

    #[test]
    fn test_lookup_forms() {
        let engine = InsightEngine::new(store(), AnalysisConfig::default());

        let a = engine.get_region("Pune").unwrap();
        let b = engine.get_region(" pune ").unwrap();
        let c = engine.get_region("PUNE").unwrap();
        assert!(std::ptr::eq(a, b) && std::ptr::eq(b, c));

        let bihar = engine.get_region("bihar|aurangabad").unwrap();
        assert_eq!(bihar.total_enrolments, 6);

        assert!(engine.get_region("Atlantis").is_none());
    }

    #[test]
    fn test_time_series_lookup() {
        let engine = InsightEngine::new(store(), AnalysisConfig::default());

        let pune = engine.get_time_series("Maharashtra|Pune");
        assert_eq!(pune.enrolment.len(), 1);
        assert_eq!(pune.enrolment[0].month, "2023-01");
        assert_eq!(pune.demographic[0].month, "2023-02");
        assert!(pune.biometric.is_empty());

        assert!(engine.get_time_series("Atlantis").is_empty());
    }

    #[test]
    fn test_summary_consistency() {
        let engine = InsightEngine::new(store(), AnalysisConfig::precompute());
        let summary = engine.get_summary();
        let all = engine.get_all_region_aggregates();

        assert_eq!(summary.total_regions, all.len());
        assert_eq!(
            summary.total_enrolments,
            all.values().map(|r| r.total_enrolments).sum::<u64>()
        );
        assert_eq!(
            summary.typology_distribution.values().sum::<usize>(),
            all.len()
        );
        assert_eq!(summary.typology_distribution[&Typology::NoData], 1);
    }

    #[test]
    fn test_region_detail_and_unknown() {
        let engine = InsightEngine::new(store(), AnalysisConfig::default());

        let detail = engine.region_detail("pune");
        assert_eq!(detail.state, "Maharashtra");
        assert_eq!(detail.adult_enrolment_share, 70.0);
        assert_eq!(detail.child_enrolment_share, 30.0);
        assert_eq!(detail.time_series.as_ref().map(|t| t.enrolment.len()), Some(1));

        let unknown = engine.region_detail("Atlantis");
        assert!(unknown.is_unknown());
        assert_eq!(unknown.district, "Atlantis");
    }

    #[test]
    fn test_region_details_keyed_by_composite() {
        let engine = InsightEngine::new(store(), AnalysisConfig::default());
        let details = engine.region_details();
        assert!(details.contains_key("Maharashtra|Pune"));
        assert!(details.contains_key("Bihar|Aurangabad"));
        assert!(details.values().all(|d| d.time_series.is_none()));
        assert!(engine.composite_time_series().contains_key("Kerala|Idukki"));
    }

    #[test]
    fn test_export_keys_resolve_to_themselves() {
        let store = RecordStore {
            enrolment: vec![
                enrol("Maharashtra", "Pune", "01-01-2023", [1, 1, 1]),
                enrol("Maharashtra", "Pune ", "01-01-2023", [2, 2, 2]),
                enrol("Maharashtra", "PUNE", "01-01-2023", [3, 3, 4]),
            ],
            ..Default::default()
        };
        let engine = InsightEngine::new(store, AnalysisConfig::default());

        assert_eq!(engine.get_all_region_aggregates().len(), 3);

        for (key, detail) in engine.region_details() {
            let agg = engine.get_region(&key).unwrap();
            assert_eq!(agg.region.composite(), key);
            assert_eq!(agg.total_enrolments, detail.total_enrolments);
        }
        assert_eq!(engine.get_region("Maharashtra|PUNE").unwrap().total_enrolments, 10);
    }

    #[test]
    fn test_compute_once_across_threads() {
        let engine = InsightEngine::new(store(), AnalysisConfig::default());
        assert!(!engine.is_computed());

        let addresses: Vec<usize> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| engine.get_summary() as *const CorpusSummary as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(engine.is_computed());
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_clear_cache() {
        let mut engine = InsightEngine::new(store(), AnalysisConfig::default());
        let before = engine.get_summary().clone();
        engine.clear_cache();
        assert!(!engine.is_computed());
        assert_eq!(engine.get_summary(), &before);
    }

    #[test]
    fn test_empty_store() {
        let engine = InsightEngine::new(RecordStore::default(), AnalysisConfig::default());
        assert!(engine.get_all_region_aggregates().is_empty());
        assert_eq!(engine.get_summary().total_regions, 0);
        assert!(engine.region_detail("Pune").is_unknown());
    }
}
