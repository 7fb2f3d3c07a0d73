//! Missing and duplicate arrival accounting.
//!
//! Every event is expected to be delivered once by each expected publisher.
//! A publisher absent from an event counts one missing arrival; a publisher
//! delivering the same payload more than once counts the extra copies as
//! duplicates.

use crate::correlator::Correlation;
use feedlat_core::PublisherId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Delivery coverage per publisher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    /// Publishers every event was expected from.
    pub expected: BTreeSet<PublisherId>,
    /// Events each expected publisher never delivered.
    pub missing: BTreeMap<PublisherId, u64>,
    /// Extra copies of an event from the same publisher.
    pub duplicates: BTreeMap<PublisherId, u64>,
    /// Events delivered by every expected publisher.
    pub complete_events: u64,
    pub events: u64,
}

impl Coverage {
    pub fn missing_for(&self, publisher: PublisherId) -> u64 {
        self.missing.get(&publisher).copied().unwrap_or(0)
    }

    pub fn duplicates_for(&self, publisher: PublisherId) -> u64 {
        self.duplicates.get(&publisher).copied().unwrap_or(0)
    }

    pub fn total_missing(&self) -> u64 {
        self.missing.values().sum()
    }

    pub fn total_duplicates(&self) -> u64 {
        self.duplicates.values().sum()
    }
}

/// Compute coverage. With no expected set, every publisher observed anywhere
/// in the correlation is expected in every event.
pub fn coverage(correlation: &Correlation, expected: Option<&BTreeSet<PublisherId>>) -> Coverage {
    let expected: BTreeSet<PublisherId> = match expected {
        Some(ids) => ids.clone(),
        None => correlation
            .events()
            .flat_map(|(_, event)| event.arrivals().iter().map(|a| a.publisher))
            .collect(),
    };

    let mut result = Coverage {
        missing: expected.iter().map(|id| (*id, 0)).collect(),
        expected,
        ..Coverage::default()
    };

    let mut seen: BTreeMap<PublisherId, u64> = BTreeMap::new();
    for (_, event) in correlation.events() {
        seen.clear();
        for arrival in event.arrivals() {
            *seen.entry(arrival.publisher).or_insert(0) += 1;
        }

        let mut complete = true;
        for id in &result.expected {
            if !seen.contains_key(id) {
                complete = false;
                *result.missing.entry(*id).or_insert(0) += 1;
            }
        }

        for (id, count) in &seen {
            if *count > 1 {
                *result.duplicates.entry(*id).or_insert(0) += count - 1;
            }
        }

        if complete {
            result.complete_events += 1;
        }
        result.events += 1;
    }

    for (id, missing) in &result.missing {
        if *missing > 0 {
            info!(publisher = %id, missing, events = result.events, "Publisher missing arrivals");
        }
    }

    result
}
