//! Command line arguments.

use crate::config::AppConfig;
use crate::error::AppResult;
use clap::Parser;
use feedlat_capture::{CaptureFormat, IdentityField};
use feedlat_core::PublisherId;
use std::path::PathBuf;

/// Latency analyzer for redundant market data feeds
#[derive(Parser, Debug)]
#[command(name = "feedlat", version, about, long_about = None)]
pub struct Args {
    /// Capture file (.pcap, or .jsonl frames)
    pub capture: PathBuf,

    /// Configuration file path (can also be set via FEEDLAT_CONFIG env var)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Capture format, detected from the extension by default
    #[arg(long)]
    pub format: Option<CaptureFormat>,

    /// Publisher identity field: ip_id, src_port or dst_port
    #[arg(long)]
    pub identity: Option<IdentityField>,

    /// Known publisher ids, comma separated (e.g. 1,2,3,4)
    #[arg(long)]
    pub known: Option<String>,

    /// Publishers every event should arrive from, comma separated
    #[arg(long)]
    pub expected: Option<String>,

    /// Events to preview from each end of the capture
    #[arg(long)]
    pub preview: Option<usize>,

    /// Correlation worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Write the summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Write every correlated event as JSON Lines
    #[arg(long)]
    pub events_jsonl: Option<PathBuf>,

    /// Write Prometheus metrics in text format
    #[arg(long)]
    pub metrics_out: Option<PathBuf>,

    /// Write decoded frames as JSON Lines
    #[arg(long)]
    pub export_frames: Option<PathBuf>,

    /// Skip the first-arrival chart
    #[arg(long)]
    pub no_chart: bool,
}

impl Args {
    /// Config file path: CLI arg > FEEDLAT_CONFIG env var.
    pub fn config_path(&self) -> Option<String> {
        self.config
            .clone()
            .or_else(|| std::env::var("FEEDLAT_CONFIG").ok())
    }

    /// Override file values with the flags that were given.
    pub fn apply(&self, config: &mut AppConfig) -> AppResult<()> {
        if let Some(format) = self.format {
            config.capture.format = Some(format);
        }
        if let Some(identity) = self.identity {
            config.capture.identity = identity;
        }
        if let Some(list) = &self.known {
            config.analysis.known_publishers = parse_publishers(list)?;
        }
        if let Some(list) = &self.expected {
            config.analysis.expected_publishers = parse_publishers(list)?;
        }
        if let Some(preview) = self.preview {
            config.report.preview_events = preview;
        }
        if let Some(workers) = self.workers {
            config.analysis.workers = workers;
        }
        if let Some(path) = &self.summary_json {
            config.report.summary_json = Some(path.clone());
        }
        if let Some(path) = &self.events_jsonl {
            config.report.events_jsonl = Some(path.clone());
        }
        if let Some(path) = &self.metrics_out {
            config.telemetry.metrics_out = Some(path.clone());
        }
        if let Some(path) = &self.export_frames {
            config.report.export_frames = Some(path.clone());
        }
        if self.no_chart {
            config.report.chart = false;
        }
        Ok(())
    }
}

/// Parse a comma separated publisher list. Empty entries are ignored.
pub fn parse_publishers(list: &str) -> AppResult<Vec<PublisherId>> {
    let ids = list
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<PublisherId>)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}
