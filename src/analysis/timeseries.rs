//! Month-bucketed time series per region.

use crate::models::{MonthlyPoint, RegionKey, RegionTimeSeries};
use crate::source::RecordStore;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Calendar-month bucket of a date, formatted `YYYY-MM`.
pub fn month_bucket(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Sum (children, adults) per region and month.
///
/// Rows without a parsed date are skipped. Months come out ascending
/// because the inner map is ordered by the `YYYY-MM` string.
fn bucket_by_month<'a, I>(rows: I) -> BTreeMap<RegionKey, Vec<MonthlyPoint>>
where
    I: Iterator<Item = (&'a RegionKey, Option<NaiveDate>, u64, u64)>,
{
    let mut buckets: BTreeMap<&RegionKey, BTreeMap<String, (u64, u64)>> = BTreeMap::new();

    for (region, date, children, adults) in rows {
        let Some(date) = date else {
            continue;
        };
        let slot = buckets
            .entry(region)
            .or_default()
            .entry(month_bucket(date))
            .or_default();
        slot.0 = slot.0.saturating_add(children);
        slot.1 = slot.1.saturating_add(adults);
    }

    buckets
        .into_iter()
        .map(|(region, months)| {
            let points = months
                .into_iter()
                .map(|(month, (children, adults))| MonthlyPoint {
                    month,
                    total: children.saturating_add(adults),
                    children,
                    adults,
                })
                .collect();
            (region.clone(), points)
        })
        .collect()
}

/// Build the per-region time series for every region seen in any collection.
pub fn build_time_series(store: &RecordStore) -> BTreeMap<RegionKey, RegionTimeSeries> {
    let enrolment = bucket_by_month(
        store
            .enrolment
            .iter()
            .map(|e| {
                (
                    &e.region,
                    e.date,
                    e.age_0_5.saturating_add(e.age_5_17),
                    e.age_18_plus,
                )
            }),
    );
    let demographic = bucket_by_month(
        store
            .demographic
            .iter()
            .map(|e| (&e.region, e.date, e.age_5_17, e.age_18_plus)),
    );
    let biometric = bucket_by_month(
        store
            .biometric
            .iter()
            .map(|e| (&e.region, e.date, e.age_5_17, e.age_18_plus)),
    );

    let mut series: BTreeMap<RegionKey, RegionTimeSeries> = BTreeMap::new();

    for (region, points) in enrolment {
        series.entry(region).or_default().enrolment = points;
    }
    for (region, points) in demographic {
        series.entry(region).or_default().demographic = points;
    }
    for (region, points) in biometric {
        series.entry(region).or_default().biometric = points;
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrolmentEvent, UpdateEvent};

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn enrol(date: Option<NaiveDate>, a: u64, b: u64, c: u64) -> EnrolmentEvent {
        EnrolmentEvent {
            region: RegionKey::new("Maharashtra", "Pune"),
            date,
            age_0_5: a,
            age_5_17: b,
            age_18_plus: c,
        }
    }

    #[test]
    fn test_month_bucket() {
        assert_eq!(month_bucket(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap()), "2023-01");
    }

    #[test]
    fn test_no_gap_filling() {
        let store = RecordStore {
            enrolment: vec![
                enrol(date(2023, 3, 2), 1, 1, 1),
                enrol(date(2023, 1, 5), 1, 2, 3),
                enrol(date(2023, 1, 20), 0, 0, 4),
            ],
            ..Default::default()
        };

        let series = build_time_series(&store);
        let pune = &series[&RegionKey::new("Maharashtra", "Pune")];

        assert_eq!(pune.enrolment.len(), 2);
        assert_eq!(pune.enrolment[0].month, "2023-01");
        assert_eq!(pune.enrolment[1].month, "2023-03");
        assert_eq!(
            pune.enrolment[0],
            MonthlyPoint {
                month: "2023-01".to_string(),
                total: 10,
                children: 3,
                adults: 7,
            }
        );
        assert!(pune.demographic.is_empty());
        assert!(pune.biometric.is_empty());
    }

    #[test]
    fn test_undated_rows_are_excluded() {
        let store = RecordStore {
            enrolment: vec![enrol(None, 5, 5, 5), enrol(date(2024, 2, 1), 1, 0, 0)],
            ..Default::default()
        };

        let series = build_time_series(&store);
        let pune = &series[&RegionKey::new("Maharashtra", "Pune")];
        assert_eq!(pune.enrolment.len(), 1);
        assert_eq!(pune.enrolment[0].total, 1);
    }

    #[test]
    fn test_region_with_only_updates_gets_a_series() {
        let store = RecordStore {
            biometric: vec![
                UpdateEvent {
                    region: RegionKey::new("Kerala", "Idukki"),
                    date: date(2024, 12, 1),
                    age_5_17: 2,
                    age_18_plus: 8,
                },
                UpdateEvent {
                    region: RegionKey::new("Kerala", "Idukki"),
                    date: date(2024, 11, 30),
                    age_5_17: 1,
                    age_18_plus: 0,
                },
            ],
            ..Default::default()
        };

        let series = build_time_series(&store);
        let idukki = &series[&RegionKey::new("Kerala", "Idukki")];
        assert!(idukki.enrolment.is_empty());
        let months: Vec<_> = idukki.biometric.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["2024-11", "2024-12"]);
        assert_eq!(idukki.biometric[1].children, 2);
        assert_eq!(idukki.biometric[1].adults, 8);
    }

    #[test]
    fn test_large_counts_saturate() {
        let store = RecordStore {
            enrolment: vec![enrol(date(2024, 1, 1), u64::MAX, 1, 1)],
            ..Default::default()
        };

        let series = build_time_series(&store);
        let point = &series[&RegionKey::new("Maharashtra", "Pune")].enrolment[0];
        assert_eq!(point.children, u64::MAX);
        assert_eq!(point.total, u64::MAX);
    }

    #[test]
    fn test_only_undated_rows_yield_no_series() {
        let store = RecordStore {
            enrolment: vec![enrol(None, 1, 1, 1)],
            ..Default::default()
        };
        assert!(build_time_series(&store).is_empty());
    }
}
