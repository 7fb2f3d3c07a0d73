//! Analysis run orchestration.

use crate::config::AppConfig;
use crate::error::AppResult;
use feedlat_capture::{open_frames, FrameStream, JsonLinesFrameWriter};
use feedlat_core::{Frame, LatencyStats};
use feedlat_engine::{
    correlate_partitioned, coverage, Aggregator, Correlation, Correlator, Coverage, SkipReason,
};
use feedlat_report::{
    render_first_arrivals, render_preview, write_summary_json, EventLogWriter, SummaryReport,
};
use feedlat_telemetry::{DelayStatsReporter, Metrics, PublisherDelayStats};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Everything one run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub correlation: Correlation,
    pub stats: LatencyStats,
    pub coverage: Coverage,
    pub report: SummaryReport,
    /// Delay percentiles of this run, per publisher in first-seen order.
    pub delays: Vec<PublisherDelayStats>,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    capture: PathBuf,
}

impl Application {
    /// Create an application for one capture file.
    pub fn new(config: AppConfig, capture: impl Into<PathBuf>) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            capture: capture.into(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the analysis. Capture read errors abort the run; malformed frames
    /// are only counted.
    pub fn run(&self) -> AppResult<RunOutcome> {
        let started = Instant::now();
        let frames = open_frames(
            &self.capture,
            self.config.capture.format,
            self.config.capture.identity,
        )?;

        let mut export = match &self.config.report.export_frames {
            Some(path) => Some(JsonLinesFrameWriter::create(path)?),
            None => None,
        };

        let workers = self.config.analysis.workers;
        let correlation = if workers <= 1 {
            correlate_streaming(frames, export.as_mut())?
        } else {
            let frames = collect_frames(frames, export.as_mut())?;
            info!(frames = frames.len(), workers, "Correlating in parallel");
            correlate_partitioned(frames, workers)
        };

        if let Some(writer) = export {
            let written = writer.written();
            writer.finish()?;
            info!(frames = written, "Exported frames");
        }

        let delays = record_metrics(&correlation)?;

        let stats = Aggregator::new(self.config.analysis.known()).aggregate(&correlation);
        let expected = self.config.analysis.expected();
        let coverage = coverage(&correlation, expected.as_ref());
        let report = SummaryReport::build(
            self.capture.display().to_string(),
            &correlation,
            &stats,
            &coverage,
        );
        report.log();

        self.write_outputs(&correlation, &report)?;

        delays.output_summary();
        let delays = delays.get_stats();

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            events = correlation.len(),
            "Analysis complete"
        );

        Ok(RunOutcome {
            correlation,
            stats,
            coverage,
            report,
            delays,
        })
    }

    fn write_outputs(&self, correlation: &Correlation, report: &SummaryReport) -> AppResult<()> {
        if let Some(path) = &self.config.report.summary_json {
            write_summary_json(path, report)?;
        }

        if let Some(path) = &self.config.report.events_jsonl {
            let mut writer = EventLogWriter::create(path)?;
            writer.write_correlation(correlation)?;
            let written = writer.records_written();
            writer.close()?;
            info!(path = %path.display(), events = written, "Wrote event log");
        }

        if let Some(path) = &self.config.telemetry.metrics_out {
            Metrics::write_to(path)?;
            info!(path = %path.display(), "Wrote metrics");
        }
        Ok(())
    }

    /// Text shown to the user: preview, table and chart.
    pub fn render_text(&self, outcome: &RunOutcome) -> String {
        let report_config = &self.config.report;
        let mut sections = Vec::new();

        if report_config.preview_events > 0 {
            sections.push(render_preview(
                &outcome.correlation,
                report_config.preview_events,
            ));
        }
        sections.push(outcome.report.render_table());
        if report_config.chart {
            sections.push(render_first_arrivals(
                &outcome.stats,
                report_config.chart_width,
            ));
        }
        sections.join("\n")
    }

    pub fn capture(&self) -> &Path {
        &self.capture
    }
}

fn correlate_streaming(
    frames: FrameStream,
    mut export: Option<&mut JsonLinesFrameWriter<BufWriter<File>>>,
) -> AppResult<Correlation> {
    let mut correlator = Correlator::new();
    for frame in frames {
        let frame = frame?;
        if let Some(writer) = export.as_deref_mut() {
            writer.write(&frame)?;
        }
        correlator.push(frame);
    }

    let correlation = correlator.finish();
    if correlation.skipped().total() > 0 {
        warn!(
            skipped = correlation.skipped().total(),
            "Malformed frames skipped"
        );
    }
    Ok(correlation)
}

fn collect_frames(
    frames: FrameStream,
    mut export: Option<&mut JsonLinesFrameWriter<BufWriter<File>>>,
) -> AppResult<Vec<Frame>> {
    let mut collected = Vec::new();
    for frame in frames {
        let frame = frame?;
        if let Some(writer) = export.as_deref_mut() {
            writer.write(&frame)?;
        }
        collected.push(frame);
    }
    Ok(collected)
}

/// Feed the process metrics and a reporter holding this run's delays only.
fn record_metrics(correlation: &Correlation) -> AppResult<DelayStatsReporter> {
    let mut delays = DelayStatsReporter::new()?;
    for (_, event) in correlation.events() {
        Metrics::event(&event.winner().to_string());
        for arrival in event.arrivals() {
            let publisher = arrival.publisher.to_string();
            let delay_ms = arrival.delay * 1000.0;
            Metrics::arrival(&publisher, delay_ms);
            delays.observe(&publisher, delay_ms);
        }
    }
    for reason in SkipReason::ALL {
        Metrics::skipped(reason.as_str(), correlation.skipped().get(reason));
    }
    Ok(delays)
}

