//! Per-publisher delay percentiles.
//!
//! Each reporter owns an unregistered histogram, so the figures cover one
//! run only. Derives:
//! - sample count and mean delay
//! - P50/P95/P99 delay by linear interpolation within buckets

use crate::error::TelemetryResult;
use crate::metrics::DELAY_BUCKETS_MS;
use chrono::{DateTime, Utc};
use prometheus::proto::Bucket;
use prometheus::{Histogram, HistogramOpts, HistogramVec};
use tracing::info;

/// Delay distribution for one publisher, in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherDelayStats {
    pub publisher: String,
    pub samples: u64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

/// Delay statistics reporter.
pub struct DelayStatsReporter {
    histogram: HistogramVec,
    publishers: Vec<String>,
    start_time: DateTime<Utc>,
}

impl DelayStatsReporter {
    pub fn new() -> TelemetryResult<Self> {
        let histogram = HistogramVec::new(
            HistogramOpts::new(
                "feedlat_run_arrival_delay_ms",
                "Arrival delay within one run in milliseconds",
            )
            .buckets(DELAY_BUCKETS_MS.to_vec()),
            &["publisher"],
        )?;

        Ok(Self {
            histogram,
            publishers: Vec::new(),
            start_time: Utc::now(),
        })
    }

    /// Record one arrival. Negative delays register the publisher but are
    /// not observed.
    pub fn observe(&mut self, publisher: &str, delay_ms: f64) {
        if !self.publishers.iter().any(|p| p == publisher) {
            self.publishers.push(publisher.to_string());
        }
        if delay_ms >= 0.0 {
            self.histogram
                .with_label_values(&[publisher])
                .observe(delay_ms);
        }
    }

    /// Statistics for every publisher, in first-seen order.
    pub fn get_stats(&self) -> Vec<PublisherDelayStats> {
        self.publishers
            .iter()
            .map(|publisher| {
                publisher_stats(publisher, &self.histogram.with_label_values(&[publisher]))
            })
            .collect()
    }

    /// Log the delay distribution of every publisher.
    pub fn output_summary(&self) {
        let elapsed = Utc::now() - self.start_time;

        info!("========== Arrival Delay Percentiles ==========");
        info!(
            "Run started {} ({} ms)",
            self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            elapsed.num_milliseconds()
        );
        for s in self.get_stats() {
            info!(
                "  publisher {}: n={} mean={:.3}ms P50={:.3}ms P95={:.3}ms P99={:.3}ms",
                s.publisher, s.samples, s.mean_ms, s.p50_ms, s.p95_ms, s.p99_ms
            );
        }
        info!("===============================================");
    }
}

fn publisher_stats(publisher: &str, histogram: &Histogram) -> PublisherDelayStats {
    let samples = histogram.get_sample_count();
    let sum = histogram.get_sample_sum();

    let mut stats = PublisherDelayStats {
        publisher: publisher.to_string(),
        samples,
        mean_ms: 0.0,
        p50_ms: 0.0,
        p95_ms: 0.0,
        p99_ms: 0.0,
    };
    if samples == 0 {
        return stats;
    }

    let metric = prometheus::core::Metric::metric(histogram);
    let buckets = metric.get_histogram().get_bucket();

    stats.mean_ms = sum / samples as f64;
    stats.p50_ms = percentile_from_buckets(buckets, samples, 0.50);
    stats.p95_ms = percentile_from_buckets(buckets, samples, 0.95);
    stats.p99_ms = percentile_from_buckets(buckets, samples, 0.99);
    stats
}

/// Estimate a quantile from cumulative buckets.
///
/// Samples above the last bound report the last bound.
pub fn percentile_from_buckets(buckets: &[Bucket], total_count: u64, quantile: f64) -> f64 {
    if total_count == 0 {
        return 0.0;
    }
    let target = ((total_count as f64 * quantile).ceil() as u64).max(1);
    let mut prev_bound = 0.0;
    let mut prev_count = 0u64;

    for bucket in buckets {
        let upper_bound = bucket.get_upper_bound();
        let cumulative_count = bucket.get_cumulative_count();

        if cumulative_count >= target {
            let bucket_count = cumulative_count - prev_count;
            if bucket_count == 0 {
                return upper_bound;
            }
            let position = (target - prev_count) as f64 / bucket_count as f64;
            return prev_bound + position * (upper_bound - prev_bound);
        }

        prev_bound = upper_bound;
        prev_count = cumulative_count;
    }

    buckets.last().map(|b| b.get_upper_bound()).unwrap_or(0.0)
}
