//! CSV decoding for raw transaction batches.
//!
//! Columns are resolved by header name, so extra columns (such as
//! `pincode`) are ignored and column order does not matter. Count cells
//! that are missing, empty or unparseable become zero.

use crate::error::{LoadError, LoadResult};
use crate::models::{EnrolmentEvent, EventKind, RegionKey, UpdateEvent};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::io::Read;
use tracing::{debug, warn};

/// Date format used by every source file (`dd-mm-yyyy`).
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Decoded rows of one source unit.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBatch {
    Enrolment(Vec<EnrolmentEvent>),
    Demographic(Vec<UpdateEvent>),
    Biometric(Vec<UpdateEvent>),
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        match self {
            RecordBatch::Enrolment(rows) => rows.len(),
            RecordBatch::Demographic(rows) | RecordBatch::Biometric(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bracket columns for each kind, youngest first.
pub fn bracket_columns(kind: EventKind) -> &'static [&'static str] {
    match kind {
        EventKind::Enrolment => &["age_0_5", "age_5_17", "age_18_greater"],
        EventKind::Demographic => &["demo_age_5_17", "demo_age_17_"],
        EventKind::Biometric => &["bio_age_5_17", "bio_age_17_"],
    }
}

struct ColumnLayout {
    date: Option<usize>,
    state: Option<usize>,
    district: Option<usize>,
    brackets: Vec<Option<usize>>,
}

impl ColumnLayout {
    fn resolve(headers: &[String], kind: EventKind, unit: &str) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let brackets: Vec<Option<usize>> = bracket_columns(kind)
            .iter()
            .map(|name| {
                let idx = find(name);
                if idx.is_none() {
                    warn!("{}: column '{}' missing, treating as zero", unit, name);
                }
                idx
            })
            .collect();

        Self {
            date: find("date"),
            state: find("state"),
            district: find("district"),
            brackets,
        }
    }
}

struct RawRow {
    region: RegionKey,
    date: Option<NaiveDate>,
    counts: Vec<u64>,
}

/// Decode one CSV source unit of the given kind.
///
/// Rows with an empty state or district cell cannot be grouped and are
/// dropped. Non-empty region cells are stored as written.
/// A malformed record fails the whole unit.
pub fn parse_csv<R: Read>(reader: R, kind: EventKind, unit: &str) -> LoadResult<RecordBatch> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|source| LoadError::Csv {
            unit: unit.to_string(),
            source,
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    let layout = ColumnLayout::resolve(&headers, kind, unit);

    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        let record = result.map_err(|source| LoadError::Csv {
            unit: unit.to_string(),
            source,
        })?;
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        // Region cells are kept verbatim; only an empty cell is ungroupable.
        let state = cell(layout.state);
        let district = cell(layout.district);
        if state.is_empty() || district.is_empty() {
            dropped += 1;
            continue;
        }

        rows.push(RawRow {
            region: RegionKey::new(state, district),
            date: parse_date(cell(layout.date)),
            counts: layout.brackets.iter().map(|&b| parse_count(cell(b))).collect(),
        });
    }

    if dropped > 0 {
        debug!("{}: dropped {} rows without region identifiers", unit, dropped);
    }

    Ok(into_batch(kind, rows))
}

fn into_batch(kind: EventKind, rows: Vec<RawRow>) -> RecordBatch {
    match kind {
        EventKind::Enrolment => RecordBatch::Enrolment(
            rows.into_iter()
                .map(|r| EnrolmentEvent {
                    region: r.region,
                    date: r.date,
                    age_0_5: r.counts[0],
                    age_5_17: r.counts[1],
                    age_18_plus: r.counts[2],
                })
                .collect(),
        ),
        EventKind::Demographic => RecordBatch::Demographic(into_updates(rows)),
        EventKind::Biometric => RecordBatch::Biometric(into_updates(rows)),
    }
}

fn into_updates(rows: Vec<RawRow>) -> Vec<UpdateEvent> {
    rows.into_iter()
        .map(|r| UpdateEvent {
            region: r.region,
            date: r.date,
            age_5_17: r.counts[0],
            age_18_plus: r.counts[1],
        })
        .collect()
}

/// Parse a `dd-mm-yyyy` date, yielding `None` on failure.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(cell.trim(), DATE_FORMAT).ok()
}

/// Parse a count cell; null, negative or non-numeric values become zero.
pub fn parse_count(cell: &str) -> u64 {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return 0;
    }

    if let Ok(n) = trimmed.parse::<u64>() {
        return n;
    }

    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f > 0.0 => f as u64,
        _ => 0,
    }
}
