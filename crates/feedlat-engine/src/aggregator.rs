//! Per-publisher aggregation.

use crate::correlator::Correlation;
use feedlat_core::{KnownPublishers, LatencyStats};
use tracing::{debug, warn};

/// Folds correlated events into per-publisher statistics.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    known: KnownPublishers,
}

impl Aggregator {
    pub fn new(known: KnownPublishers) -> Self {
        Self { known }
    }

    pub fn known(&self) -> &KnownPublishers {
        &self.known
    }

    /// Aggregate a correlation. Reads the events only; calling this twice on
    /// the same correlation yields identical stats.
    pub fn aggregate(&self, correlation: &Correlation) -> LatencyStats {
        let mut stats = LatencyStats::new(&self.known);

        for (_, event) in correlation.events() {
            stats
                .bucket_mut(event.winner(), &self.known)
                .record_first_arrival();

            for arrival in event.arrivals() {
                stats
                    .bucket_mut(arrival.publisher, &self.known)
                    .record_arrival(arrival.delay);
            }

            stats.events += 1;
            stats.frames += event.len() as u64;
        }

        if !stats.unknown.is_empty() {
            warn!(
                ids = ?stats.unknown.ids,
                arrivals = stats.unknown.stats.arrival_count,
                "Arrivals from publishers outside the known set"
            );
        }

        debug!(
            publishers = stats.publishers.len(),
            frames = stats.frames,
            events = stats.events,
            "Aggregation complete"
        );

        stats
    }
}

/// Aggregate with the given known publisher set.
pub fn aggregate(correlation: &Correlation, known: &KnownPublishers) -> LatencyStats {
    Aggregator::new(known.clone()).aggregate(correlation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::correlate;
    use feedlat_core::{Frame, PublisherId};

    #[test]
    fn test_totals_and_wins() {
        let correlation = correlate(vec![
            Frame::new(0.0, 1, "A"),
            Frame::new(0.5, 2, "A"),
            Frame::new(1.0, 2, "B"),
            Frame::new(1.25, 1, "B"),
            Frame::new(2.0, 2, "C"),
        ]);
        let stats = aggregate(&correlation, &KnownPublishers::Any);

        let p1 = stats.get(PublisherId(1)).unwrap();
        assert_eq!(p1.arrival_count, 2);
        assert_eq!(p1.first_arrival_count, 1);
        assert_eq!(p1.total_delay, 0.25);

        let p2 = stats.get(PublisherId(2)).unwrap();
        assert_eq!(p2.arrival_count, 3);
        assert_eq!(p2.first_arrival_count, 2);
        assert_eq!(p2.total_delay, 0.5);

        assert_eq!(stats.frames, 5);
        assert_eq!(stats.events, 3);
        assert_eq!(stats.fastest(), Some(PublisherId(2)));
    }

    #[test]
    fn test_known_set_keeps_silent_publishers() {
        let correlation = correlate(vec![Frame::new(0.0, 1, "A")]);
        let stats = aggregate(&correlation, &KnownPublishers::from_ids([1u16, 2, 3, 4]));

        assert_eq!(stats.publishers.len(), 4);
        assert!(stats.get(PublisherId(4)).unwrap().is_empty());
    }
}
