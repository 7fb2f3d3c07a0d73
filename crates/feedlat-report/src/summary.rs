//! Per-publisher latency summary.

use chrono::{DateTime, Utc};
use feedlat_core::{LatencyStats, PublisherId, PublisherStats};
use feedlat_engine::{Correlation, Coverage, SkipCounts};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write;
use tracing::{info, warn};

/// One table row. `publisher` is `None` for the unknown bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublisherRow {
    pub publisher: Option<u16>,
    pub arrivals: u64,
    pub first_arrivals: u64,
    /// Share of events delivered first, 0.0 to 1.0.
    pub win_rate: f64,
    pub total_delay_s: f64,
    pub mean_delay_ms: Option<f64>,
    pub max_delay_ms: f64,
    pub missing: u64,
    pub duplicates: u64,
}

impl PublisherRow {
    fn new(publisher: Option<PublisherId>, stats: &PublisherStats, events: u64) -> Self {
        Self {
            publisher: publisher.map(|p| p.value()),
            arrivals: stats.arrival_count,
            first_arrivals: stats.first_arrival_count,
            win_rate: stats.win_rate(events),
            total_delay_s: stats.total_delay,
            mean_delay_ms: stats.mean_delay().map(|d| d * 1000.0),
            max_delay_ms: stats.max_delay * 1000.0,
            missing: 0,
            duplicates: 0,
        }
    }

    fn label(&self) -> String {
        match self.publisher {
            Some(id) => id.to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// Outcome of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub generated_at: DateTime<Utc>,
    pub capture: String,
    /// Frames accepted into events.
    pub frames: u64,
    pub events: u64,
    pub skipped: SkipCounts,
    pub skipped_total: u64,
    pub negative_delays: u64,
    /// Events delivered by every expected publisher.
    pub complete_events: u64,
    /// Publisher with the most first arrivals.
    pub fastest: Option<u16>,
    pub publishers: Vec<PublisherRow>,
    pub unknown: Option<PublisherRow>,
    pub unknown_ids: Vec<u16>,
}

impl SummaryReport {
    pub fn build(
        capture: impl Into<String>,
        correlation: &Correlation,
        stats: &LatencyStats,
        coverage: &Coverage,
    ) -> Self {
        let ids: BTreeSet<PublisherId> = stats
            .publishers
            .keys()
            .chain(coverage.expected.iter())
            .copied()
            .collect();

        let publishers = ids
            .into_iter()
            .map(|id| {
                let publisher_stats = stats.get(id).copied().unwrap_or_default();
                let mut row = PublisherRow::new(Some(id), &publisher_stats, stats.events);
                row.missing = coverage.missing_for(id);
                row.duplicates = coverage.duplicates_for(id);
                row
            })
            .collect();

        let unknown = (!stats.unknown.is_empty())
            .then(|| PublisherRow::new(None, &stats.unknown.stats, stats.events));

        Self {
            generated_at: Utc::now(),
            capture: capture.into(),
            frames: stats.frames,
            events: stats.events,
            skipped: *correlation.skipped(),
            skipped_total: correlation.skipped().total(),
            negative_delays: correlation.negative_delays(),
            complete_events: coverage.complete_events,
            fastest: stats.fastest().map(|p| p.value()),
            publishers,
            unknown,
            unknown_ids: stats.unknown.ids.iter().map(|p| p.value()).collect(),
        }
    }

    pub fn row(&self, publisher: u16) -> Option<&PublisherRow> {
        self.publishers
            .iter()
            .find(|row| row.publisher == Some(publisher))
    }

    /// Fixed-width text table, one line per publisher.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>9} {:>9} {:>7} {:>7} {:>12} {:>10} {:>10} {:>8} {:>5}",
            "publisher", "arrivals", "first", "win%", "total_s", "mean_ms", "max_ms", "missing", "dup"
        );

        for row in self.publishers.iter().chain(self.unknown.iter()) {
            let mean = row
                .mean_delay_ms
                .map(|m| format!("{:.3}", m))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:>9} {:>9} {:>7} {:>7.2} {:>12.6} {:>10} {:>10.3} {:>8} {:>5}",
                row.label(),
                row.arrivals,
                row.first_arrivals,
                row.win_rate * 100.0,
                row.total_delay_s,
                mean,
                row.max_delay_ms,
                row.missing,
                row.duplicates
            );
        }
        out
    }

    /// Output the summary to logs.
    pub fn log(&self) {
        info!("========== Feed Latency Summary ==========");
        info!("Capture: {}", self.capture);
        info!(
            "Frames: {} accepted, {} skipped ({} missing payload, {} missing publisher, {} invalid timestamp)",
            self.frames,
            self.skipped_total,
            self.skipped.missing_payload,
            self.skipped.missing_publisher,
            self.skipped.invalid_timestamp
        );
        info!(
            "Events: {} ({} complete)",
            self.events, self.complete_events
        );

        for row in self.publishers.iter().chain(self.unknown.iter()) {
            info!(
                "  publisher {}: arrivals={} first={} total_delay={:.6}s mean={}",
                row.label(),
                row.arrivals,
                row.first_arrivals,
                row.total_delay_s,
                row.mean_delay_ms
                    .map(|m| format!("{:.3}ms", m))
                    .unwrap_or_else(|| "-".to_string())
            );
            if row.missing > 0 {
                warn!(
                    publisher = %row.label(),
                    missing = row.missing,
                    "Publisher is missing packets"
                );
            }
        }

        if !self.unknown_ids.is_empty() {
            warn!(ids = ?self.unknown_ids, "Arrivals from publishers outside the known set");
        }
        if self.negative_delays > 0 {
            warn!(
                negative_delays = self.negative_delays,
                "Capture is not time ordered"
            );
        }
        if let Some(fastest) = self.fastest {
            info!("Fastest publisher: {}", fastest);
        }
        info!("==========================================");
    }
}
