//! Correlated events and their arrivals.

use crate::frame::PublisherId;
use serde::{Deserialize, Serialize};

/// One publisher's observed delivery of an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    pub publisher: PublisherId,
    /// Seconds since the event's first observed arrival.
    pub delay: f64,
}

impl Arrival {
    pub fn new(publisher: PublisherId, delay: f64) -> Self {
        Self { publisher, delay }
    }
}

/// All observed copies of one logical update.
///
/// The start time is fixed by the first arrival and never changes; later
/// arrivals can only be appended. Only `open` creates one, so there is always
/// a first arrival with zero delay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    start_time: f64,
    arrivals: Vec<Arrival>,
}

impl Event {
    /// Open an event with its first arrival (delay 0).
    pub fn open(start_time: f64, publisher: PublisherId) -> Self {
        Self {
            start_time,
            arrivals: vec![Arrival::new(publisher, 0.0)],
        }
    }

    /// Append an arrival with an already computed delay.
    pub fn push(&mut self, arrival: Arrival) {
        self.arrivals.push(arrival);
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn arrivals(&self) -> &[Arrival] {
        &self.arrivals
    }

    /// The arrival that opened the event.
    pub fn first(&self) -> &Arrival {
        // An event is only ever created with one arrival and never shrinks.
        &self.arrivals[0]
    }

    /// Publisher that delivered first.
    pub fn winner(&self) -> PublisherId {
        self.first().publisher
    }

    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    /// Largest delay among the arrivals.
    pub fn spread(&self) -> f64 {
        self.arrivals
            .iter()
            .map(|a| a.delay)
            .fold(0.0_f64, f64::max)
    }

    /// Whether the given publisher delivered this event at least once.
    pub fn delivered_by(&self, publisher: PublisherId) -> bool {
        self.arrivals.iter().any(|a| a.publisher == publisher)
    }
}
