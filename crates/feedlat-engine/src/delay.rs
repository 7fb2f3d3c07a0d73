//! Delay computation.
//!
//! Delay is always measured against the first observed arrival of the same
//! event, never against capture start or a per-publisher baseline.

use serde::Serialize;

/// Delay of an arrival at `timestamp` for an event that started at `start_time`.
#[inline]
pub fn delay(timestamp: f64, start_time: f64) -> f64 {
    timestamp - start_time
}

/// Classification of a computed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DelayQuality {
    /// Same timestamp as the first arrival.
    Zero,
    /// Arrived after the first copy.
    Late,
    /// Arrived before the event's start time: the capture is not time ordered.
    Negative,
}

impl DelayQuality {
    pub fn classify(delay: f64) -> Self {
        if delay < 0.0 {
            Self::Negative
        } else if delay == 0.0 {
            Self::Zero
        } else {
            Self::Late
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Negative)
    }
}
