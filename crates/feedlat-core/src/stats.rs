//! Per-publisher latency aggregates.
//!
//! Statistics are keyed by publisher identity and created on demand, so any
//! identity the decoder produces can be folded in. When a known publisher set
//! is configured, identities outside it land in an explicit unknown bucket
//! instead of being mixed into the known totals.

use crate::frame::PublisherId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Totals for one publisher (or for the unknown bucket).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PublisherStats {
    /// Sum of delays of all arrivals, in seconds.
    pub total_delay: f64,
    /// Number of arrivals delivered.
    pub arrival_count: u64,
    /// Number of events this publisher delivered first.
    pub first_arrival_count: u64,
    /// Largest single delay, in seconds.
    pub max_delay: f64,
}

impl PublisherStats {
    pub fn record_arrival(&mut self, delay: f64) {
        self.total_delay += delay;
        self.arrival_count += 1;
        if delay > self.max_delay {
            self.max_delay = delay;
        }
    }

    pub fn record_first_arrival(&mut self) {
        self.first_arrival_count += 1;
    }

    /// Mean delay per arrival, `None` when nothing arrived.
    pub fn mean_delay(&self) -> Option<f64> {
        if self.arrival_count == 0 {
            None
        } else {
            Some(self.total_delay / self.arrival_count as f64)
        }
    }

    /// Share of events this publisher won, given the total event count.
    pub fn win_rate(&self, events: u64) -> f64 {
        if events == 0 {
            0.0
        } else {
            self.first_arrival_count as f64 / events as f64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.arrival_count == 0 && self.first_arrival_count == 0
    }
}

/// Which publisher identities are expected in the capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnownPublishers {
    /// Every identity is tracked individually.
    #[default]
    Any,
    /// Only these identities are tracked; others go to the unknown bucket.
    Set(BTreeSet<PublisherId>),
}

impl KnownPublishers {
    /// Build from a list of ids. An empty list means `Any`.
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PublisherId>,
    {
        let set: BTreeSet<PublisherId> = ids.into_iter().map(Into::into).collect();
        if set.is_empty() {
            Self::Any
        } else {
            Self::Set(set)
        }
    }

    pub fn contains(&self, publisher: PublisherId) -> bool {
        match self {
            Self::Any => true,
            Self::Set(set) => set.contains(&publisher),
        }
    }

    /// The configured ids, if any.
    pub fn ids(&self) -> Option<&BTreeSet<PublisherId>> {
        match self {
            Self::Any => None,
            Self::Set(set) => Some(set),
        }
    }
}

/// Catch-all bucket for identities outside the known set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnknownBucket {
    pub stats: PublisherStats,
    /// Distinct identities that were routed here.
    pub ids: BTreeSet<PublisherId>,
}

impl UnknownBucket {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Aggregated result of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Per-publisher totals, ordered by identity.
    pub publishers: BTreeMap<PublisherId, PublisherStats>,
    /// Identities outside the known set.
    pub unknown: UnknownBucket,
    /// Arrivals folded (accepted frames).
    pub frames: u64,
    /// Distinct events folded.
    pub events: u64,
}

impl LatencyStats {
    /// Create empty stats. Every id of a configured known set gets a zeroed
    /// entry so silent publishers still show up.
    pub fn new(known: &KnownPublishers) -> Self {
        let publishers = known
            .ids()
            .map(|ids| ids.iter().map(|id| (*id, PublisherStats::default())).collect())
            .unwrap_or_default();

        Self {
            publishers,
            ..Self::default()
        }
    }

    /// Bucket for a publisher, creating it on demand.
    pub fn bucket_mut(&mut self, publisher: PublisherId, known: &KnownPublishers) -> &mut PublisherStats {
        if known.contains(publisher) {
            self.publishers.entry(publisher).or_default()
        } else {
            self.unknown.ids.insert(publisher);
            &mut self.unknown.stats
        }
    }

    pub fn get(&self, publisher: PublisherId) -> Option<&PublisherStats> {
        self.publishers.get(&publisher)
    }

    /// Arrivals across known publishers and the unknown bucket.
    pub fn total_arrivals(&self) -> u64 {
        self.publishers.values().map(|s| s.arrival_count).sum::<u64>()
            + self.unknown.stats.arrival_count
    }

    /// First arrivals across known publishers and the unknown bucket.
    pub fn total_first_arrivals(&self) -> u64 {
        self.publishers
            .values()
            .map(|s| s.first_arrival_count)
            .sum::<u64>()
            + self.unknown.stats.first_arrival_count
    }

    /// Publisher with the most first arrivals. Ties go to the lower id.
    pub fn fastest(&self) -> Option<PublisherId> {
        self.publishers
            .iter()
            .filter(|(_, s)| s.first_arrival_count > 0)
            .max_by(|(a_id, a), (b_id, b)| {
                a.first_arrival_count
                    .cmp(&b.first_arrival_count)
                    .then_with(|| b_id.cmp(a_id))
            })
            .map(|(id, _)| *id)
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0 && self.events == 0
    }
}
