//! Payload correlation.
//!
//! Frames are consumed in capture order. The first frame carrying a payload
//! opens an event; every later frame with the same payload joins it with a
//! delay relative to that first frame. Stream order is the only notion of
//! time: nothing is re-sorted.

use crate::delay::{delay, DelayQuality};
use feedlat_core::{Arrival, Event, Frame, Payload, PublisherId};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Why a frame was not correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SkipReason {
    MissingPayload,
    MissingPublisher,
    InvalidTimestamp,
}

impl SkipReason {
    pub const ALL: [SkipReason; 3] = [
        SkipReason::MissingPayload,
        SkipReason::MissingPublisher,
        SkipReason::InvalidTimestamp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingPayload => "missing_payload",
            Self::MissingPublisher => "missing_publisher",
            Self::InvalidTimestamp => "invalid_timestamp",
        }
    }
}

/// Skipped frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub missing_payload: u64,
    pub missing_publisher: u64,
    pub invalid_timestamp: u64,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        *self.slot(reason) += 1;
    }

    pub fn get(&self, reason: SkipReason) -> u64 {
        match reason {
            SkipReason::MissingPayload => self.missing_payload,
            SkipReason::MissingPublisher => self.missing_publisher,
            SkipReason::InvalidTimestamp => self.invalid_timestamp,
        }
    }

    pub fn total(&self) -> u64 {
        self.missing_payload + self.missing_publisher + self.invalid_timestamp
    }

    pub fn merge(&mut self, other: &SkipCounts) {
        self.missing_payload += other.missing_payload;
        self.missing_publisher += other.missing_publisher;
        self.invalid_timestamp += other.invalid_timestamp;
    }

    fn slot(&mut self, reason: SkipReason) -> &mut u64 {
        match reason {
            SkipReason::MissingPayload => &mut self.missing_payload,
            SkipReason::MissingPublisher => &mut self.missing_publisher,
            SkipReason::InvalidTimestamp => &mut self.invalid_timestamp,
        }
    }
}

/// Outcome of feeding one frame to the correlator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ingest {
    /// First copy of a payload: a new event was opened.
    Opened { publisher: PublisherId },
    /// Later copy: appended to an existing event.
    Joined { publisher: PublisherId, delay: f64 },
    /// Malformed frame, not correlated.
    Skipped(SkipReason),
}

/// Insertion-ordered mapping from payload to event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correlation {
    pub(crate) index: HashMap<Payload, usize>,
    pub(crate) events: Vec<(Payload, Event)>,
    pub(crate) frames: u64,
    pub(crate) skipped: SkipCounts,
    pub(crate) negative_delays: u64,
}

/// First and last events of a correlation, for quick inspection.
#[derive(Debug)]
pub struct Preview<'a> {
    pub head: Vec<(&'a Payload, &'a Event)>,
    /// Does not repeat events already in `head`.
    pub tail: Vec<(&'a Payload, &'a Event)>,
}

impl Correlation {
    /// Events in first-seen order.
    pub fn events(&self) -> impl ExactSizeIterator<Item = (&Payload, &Event)> + '_ {
        self.events.iter().map(|(payload, event)| (payload, event))
    }

    pub fn get(&self, payload: &Payload) -> Option<&Event> {
        self.index.get(payload).map(|&idx| &self.events[idx].1)
    }

    /// Number of distinct events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Frames correlated (skipped frames excluded).
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn skipped(&self) -> &SkipCounts {
        &self.skipped
    }

    /// Arrivals recorded with a negative delay.
    pub fn negative_delays(&self) -> u64 {
        self.negative_delays
    }

    /// First `n` and last `n` events.
    pub fn preview(&self, n: usize) -> Preview<'_> {
        let len = self.events.len();
        let head_end = n.min(len);
        let tail_start = len.saturating_sub(n).max(head_end);

        let pick = |range: std::ops::Range<usize>| {
            self.events[range]
                .iter()
                .map(|(payload, event)| (payload, event))
                .collect::<Vec<_>>()
        };

        Preview {
            head: pick(0..head_end),
            tail: pick(tail_start..len),
        }
    }
}

/// Incremental correlator for streamed frame sources.
#[derive(Debug, Default)]
pub struct Correlator {
    correlation: Correlation,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next frame in capture order.
    pub fn push(&mut self, frame: Frame) -> Ingest {
        let Frame {
            timestamp,
            publisher,
            payload,
        } = frame;

        let (publisher, payload) = match (publisher, payload) {
            _ if !timestamp.is_finite() => return self.skip(SkipReason::InvalidTimestamp, timestamp),
            (_, None) => return self.skip(SkipReason::MissingPayload, timestamp),
            (None, Some(_)) => return self.skip(SkipReason::MissingPublisher, timestamp),
            (Some(publisher), Some(payload)) => (publisher, payload),
        };

        let correlation = &mut self.correlation;
        correlation.frames += 1;

        if let Some(&idx) = correlation.index.get(&payload) {
            let event = &mut correlation.events[idx].1;
            let delay = delay(timestamp, event.start_time());

            if DelayQuality::classify(delay).is_degenerate() {
                correlation.negative_delays += 1;
                warn!(
                    payload = %payload,
                    publisher = %publisher,
                    delay,
                    start_time = event.start_time(),
                    "Arrival precedes event start, capture not time ordered"
                );
            }

            event.push(Arrival::new(publisher, delay));
            return Ingest::Joined { publisher, delay };
        }

        let idx = correlation.events.len();
        correlation.index.insert(payload.clone(), idx);
        correlation
            .events
            .push((payload, Event::open(timestamp, publisher)));

        Ingest::Opened { publisher }
    }

    fn skip(&mut self, reason: SkipReason, timestamp: f64) -> Ingest {
        self.correlation.skipped.record(reason);
        debug!(reason = reason.as_str(), timestamp, "Skipping malformed frame");
        Ingest::Skipped(reason)
    }

    /// Events correlated so far.
    pub fn len(&self) -> usize {
        self.correlation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.correlation.is_empty()
    }

    pub fn finish(self) -> Correlation {
        self.correlation
    }
}

/// Correlate a finite, chronologically ordered frame sequence in one pass.
pub fn correlate<I>(frames: I) -> Correlation
where
    I: IntoIterator<Item = Frame>,
{
    let mut correlator = Correlator::new();
    for frame in frames {
        correlator.push(frame);
    }
    let correlation = correlator.finish();

    if correlation.skipped.total() > 0 {
        warn!(
            skipped = correlation.skipped.total(),
            missing_payload = correlation.skipped.missing_payload,
            missing_publisher = correlation.skipped.missing_publisher,
            invalid_timestamp = correlation.skipped.invalid_timestamp,
            "Malformed frames skipped"
        );
    }
    info!(
        frames = correlation.frames,
        events = correlation.len(),
        negative_delays = correlation.negative_delays,
        "Correlation complete"
    );

    correlation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ts: f64, publisher: u16, payload: &str) -> Frame {
        Frame::new(ts, publisher, payload)
    }

    #[test]
    fn test_first_seen_order_preserved() {
        let correlation = correlate(vec![
            frame(0.0, 1, "B"),
            frame(0.1, 1, "A"),
            frame(0.2, 2, "B"),
            frame(0.3, 1, "C"),
        ]);

        let order: Vec<Vec<u8>> = correlation
            .events()
            .map(|(p, _)| p.as_bytes().to_vec())
            .collect();
        assert_eq!(order, vec![b"B".to_vec(), b"A".to_vec(), b"C".to_vec()]);
        assert_eq!(correlation.frames(), 4);
    }

    #[test]
    fn test_delay_against_first_arrival() {
        let correlation = correlate(vec![
            frame(100.0, 3, "X"),
            frame(100.5, 1, "X"),
            frame(101.25, 2, "X"),
        ]);

        let event = correlation.get(&Payload::from("X")).unwrap();
        let delays: Vec<f64> = event.arrivals().iter().map(|a| a.delay).collect();
        assert_eq!(delays, vec![0.0, 0.5, 1.25]);
        assert_eq!(event.winner(), PublisherId(3));
    }

    #[test]
    fn test_push_reports_outcome() {
        let mut correlator = Correlator::new();
        assert_eq!(
            correlator.push(frame(1.0, 1, "X")),
            Ingest::Opened {
                publisher: PublisherId(1)
            }
        );
        assert_eq!(
            correlator.push(frame(3.0, 2, "X")),
            Ingest::Joined {
                publisher: PublisherId(2),
                delay: 2.0
            }
        );
        assert_eq!(
            correlator.push(Frame::partial(4.0, Some(PublisherId(1)), None)),
            Ingest::Skipped(SkipReason::MissingPayload)
        );
        assert_eq!(correlator.len(), 1);
    }

    #[test]
    fn test_malformed_frames_counted() {
        let correlation = correlate(vec![
            frame(0.0, 1, "X"),
            Frame::partial(0.1, None, Some(Payload::from("X"))),
            Frame::partial(0.2, Some(PublisherId(2)), None),
            Frame::partial(f64::NAN, Some(PublisherId(2)), Some(Payload::from("X"))),
            frame(0.3, 2, "X"),
        ]);

        assert_eq!(correlation.frames(), 2);
        assert_eq!(correlation.skipped().total(), 3);
        assert_eq!(correlation.skipped().get(SkipReason::MissingPublisher), 1);
        assert_eq!(correlation.skipped().get(SkipReason::MissingPayload), 1);
        assert_eq!(correlation.skipped().get(SkipReason::InvalidTimestamp), 1);
        assert_eq!(correlation.len(), 1);
    }

    #[test]
    fn test_empty_payload_is_a_valid_event() {
        let correlation = correlate(vec![frame(0.0, 1, ""), frame(0.4, 2, "")]);
        assert_eq!(correlation.len(), 1);
        let event = correlation.get(&Payload::default()).unwrap();
        assert_eq!(event.len(), 2);
    }

    #[test]
    fn test_negative_delay_preserved() {
        let correlation = correlate(vec![frame(5.0, 1, "X"), frame(4.0, 2, "X")]);
        let event = correlation.get(&Payload::from("X")).unwrap();

        assert_eq!(event.arrivals()[1].delay, -1.0);
        assert_eq!(correlation.negative_delays(), 1);
    }

    #[test]
    fn test_preview_does_not_repeat_events() {
        let frames: Vec<Frame> = (0..4).map(|i| frame(i as f64, 1, &i.to_string())).collect();
        let correlation = correlate(frames);

        let preview = correlation.preview(3);
        assert_eq!(preview.head.len(), 3);
        assert_eq!(preview.tail.len(), 1);
        assert_eq!(preview.tail[0].0, &Payload::from("3"));

        let preview = correlation.preview(1);
        assert_eq!(preview.head[0].0, &Payload::from("0"));
        assert_eq!(preview.tail[0].0, &Payload::from("3"));
    }

    #[test]
    fn test_preview_of_empty_correlation() {
        let correlation = correlate(Vec::new());
        let preview = correlation.preview(3);
        assert!(preview.head.is_empty());
        assert!(preview.tail.is_empty());
    }
}
