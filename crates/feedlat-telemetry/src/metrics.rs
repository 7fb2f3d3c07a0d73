//! Prometheus metrics for feedlat.
//!
//! Metrics live in the process-wide default registry, so values accumulate
//! over every run in the process:
//! - Frames accepted per publisher
//! - Frames skipped per reason
//! - Events correlated and first arrivals per publisher
//! - Arrival delay distribution per publisher
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error caught on first use.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};
use std::fs;
use std::path::Path;

/// Histogram buckets for arrival delays, in milliseconds.
pub const DELAY_BUCKETS_MS: &[f64] = &[
    0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 250.0, 500.0, 1000.0,
];

/// Frames accepted into an event, by publisher.
pub static FRAMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "feedlat_frames_total",
        "Frames accepted into an event",
        &["publisher"]
    )
    .unwrap()
});

/// Frames skipped as malformed, by reason.
pub static FRAMES_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "feedlat_frames_skipped_total",
        "Frames skipped as malformed",
        &["reason"]
    )
    .unwrap()
});

/// Distinct events (payloads) correlated.
pub static EVENTS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("feedlat_events_total", "Distinct events correlated").unwrap()
});

/// Events first delivered by each publisher.
pub static FIRST_ARRIVALS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "feedlat_first_arrivals_total",
        "Events first delivered by a publisher",
        &["publisher"]
    )
    .unwrap()
});

/// Arrivals observed before their event's first arrival.
pub static NEGATIVE_DELAYS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "feedlat_negative_delays_total",
        "Arrivals timestamped before their event's first arrival"
    )
    .unwrap()
});

/// Arrival delay relative to the event's first arrival, in milliseconds.
pub static ARRIVAL_DELAY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "feedlat_arrival_delay_ms",
        "Arrival delay relative to the first arrival in milliseconds",
        &["publisher"],
        DELAY_BUCKETS_MS.to_vec()
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record an accepted frame and its delay. Negative delays are counted
    /// but kept out of the histogram.
    pub fn arrival(publisher: &str, delay_ms: f64) {
        FRAMES_TOTAL.with_label_values(&[publisher]).inc();
        if delay_ms < 0.0 {
            NEGATIVE_DELAYS_TOTAL.inc();
        } else {
            ARRIVAL_DELAY_MS
                .with_label_values(&[publisher])
                .observe(delay_ms);
        }
    }

    /// Record an event and the publisher that delivered it first.
    pub fn event(first_publisher: &str) {
        EVENTS_TOTAL.inc();
        FIRST_ARRIVALS_TOTAL
            .with_label_values(&[first_publisher])
            .inc();
    }

    /// Record skipped frames.
    pub fn skipped(reason: &str, count: u64) {
        if count > 0 {
            FRAMES_SKIPPED_TOTAL
                .with_label_values(&[reason])
                .inc_by(count as f64);
        }
    }

    pub fn frames(publisher: &str) -> u64 {
        FRAMES_TOTAL.with_label_values(&[publisher]).get() as u64
    }

    pub fn first_arrivals(publisher: &str) -> u64 {
        FIRST_ARRIVALS_TOTAL.with_label_values(&[publisher]).get() as u64
    }

    /// Render the default registry in Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write the text exposition to `path`.
    pub fn write_to(path: impl AsRef<Path>) -> TelemetryResult<()> {
        fs::write(path, Self::gather_text()?)?;
        Ok(())
    }
}
