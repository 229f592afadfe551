//! Name-based region lookup.
//!
//! Regions are identified by their composite (state, district) key. This
//! secondary index resolves free-text names from consumers: either the
//! `state|district` composite form or a bare district name. Exported
//! composite keys match verbatim; anything else is trimmed and case-folded
//! before matching.

use crate::models::{normalize_name, RegionKey};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    exact: HashMap<String, RegionKey>,
    composite: HashMap<String, Vec<RegionKey>>,
    by_name: HashMap<String, Vec<RegionKey>>,
}

impl RegionIndex {
    /// Build the index over a set of region keys.
    pub fn build<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a RegionKey>,
    {
        let mut index = Self::default();

        for key in keys {
            let state = normalize_name(&key.state);
            let district = normalize_name(&key.district);

            index
                .exact
                .entry(key.composite())
                .or_insert_with(|| key.clone());
            index
                .composite
                .entry(format!("{}|{}", state, district))
                .or_default()
                .push(key.clone());
            index.by_name.entry(district).or_default().push(key.clone());
        }

        for candidates in index
            .composite
            .values_mut()
            .chain(index.by_name.values_mut())
        {
            candidates.sort();
        }

        index
    }

    /// Resolve a consumer-supplied name to a region key.
    ///
    /// An exact `state|district` match wins. Otherwise the normalized
    /// composite form is tried when the name contains `|`, then the bare
    /// district name. When several regions share a normalized name the
    /// first in key order is picked.
    pub fn resolve(&self, name: &str) -> Option<&RegionKey> {
        if let Some(key) = self.exact.get(name) {
            return Some(key);
        }

        if let Some((state, district)) = name.split_once('|') {
            let composite = format!("{}|{}", normalize_name(state), normalize_name(district));
            if let Some(candidates) = self.composite.get(&composite) {
                return first_candidate(name, candidates);
            }
        }

        first_candidate(name, self.candidates(name))
    }

    /// All regions sharing a bare district name.
    pub fn candidates(&self, name: &str) -> &[RegionKey] {
        self.by_name
            .get(&normalize_name(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn first_candidate<'a>(name: &str, candidates: &'a [RegionKey]) -> Option<&'a RegionKey> {
    if candidates.len() > 1 {
        debug!(
            "'{}' matches {} regions, using {}",
            name.trim(),
            candidates.len(),
            candidates[0]
        );
    }
    candidates.first()
}
