//! Result files.
//!
//! - Summary: one pretty-printed JSON document per run
//! - Events: JSON Lines, one correlated event per line, in first-seen order
//!
//! Both are rewritten on every run.

use crate::error::ReportResult;
use crate::summary::SummaryReport;
use feedlat_core::{Event, Payload};
use feedlat_engine::Correlation;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

fn create(path: &Path) -> ReportResult<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    Ok(BufWriter::new(file))
}

/// Write the summary as pretty JSON.
pub fn write_summary_json(path: impl AsRef<Path>, report: &SummaryReport) -> ReportResult<()> {
    let path = path.as_ref();
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    info!(path = %path.display(), "Wrote summary");
    Ok(())
}

/// One arrival of an event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalRecord {
    pub publisher: u16,
    pub delay_ms: f64,
}

/// Event record for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in first-seen order.
    pub index: u64,
    pub payload_hex: String,
    pub start_time: f64,
    pub winner: u16,
    pub spread_ms: f64,
    pub arrivals: Vec<ArrivalRecord>,
}

impl EventRecord {
    pub fn new(index: u64, payload: &Payload, event: &Event) -> Self {
        Self {
            index,
            payload_hex: payload.to_hex(),
            start_time: event.start_time(),
            winner: event.winner().value(),
            spread_ms: event.spread() * 1000.0,
            arrivals: event
                .arrivals()
                .iter()
                .map(|a| ArrivalRecord {
                    publisher: a.publisher.value(),
                    delay_ms: a.delay * 1000.0,
                })
                .collect(),
        }
    }
}

/// JSON Lines writer for event records.
pub struct EventLogWriter<W: Write> {
    writer: W,
    records_written: u64,
}

impl EventLogWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> ReportResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening event log");
        Ok(Self::new(create(path)?))
    }
}

impl<W: Write> EventLogWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records_written: 0,
        }
    }

    pub fn write(&mut self, record: &EventRecord) -> ReportResult<()> {
        let json = serde_json::to_string(record)?;
        writeln!(self.writer, "{}", json)?;
        self.records_written += 1;
        Ok(())
    }

    /// Write every event of a correlation.
    pub fn write_correlation(&mut self, correlation: &Correlation) -> ReportResult<()> {
        for (index, (payload, event)) in correlation.events().enumerate() {
            self.write(&EventRecord::new(index as u64, payload, event))?;
        }
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flush and return the inner writer.
    pub fn close(mut self) -> ReportResult<W> {
        self.writer.flush()?;
        debug!(records = self.records_written, "Closed event log");
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedlat_core::{Frame, KnownPublishers};
    use feedlat_engine::{aggregate, correlate, coverage};
    use std::io::{BufRead, BufReader};
    use tempfile::TempDir;

    fn sample() -> Correlation {
        correlate(vec![
            Frame::new(10.0, 1, "X"),
            Frame::new(10.004, 2, "X"),
            Frame::new(11.0, 2, "Y"),
        ])
    }

    #[test]
    fn test_event_record() {
        let correlation = sample();
        let (payload, event) = correlation.events().next().unwrap();
        let record = EventRecord::new(0, payload, event);

        assert_eq!(record.payload_hex, "58");
        assert_eq!(record.winner, 1);
        assert_eq!(record.arrivals.len(), 2);
        assert_eq!(record.arrivals[0].delay_ms, 0.0);
        assert!((record.spread_ms - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_write_and_read_events() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");

        let mut writer = EventLogWriter::create(&path).unwrap();
        writer.write_correlation(&sample()).unwrap();
        assert_eq!(writer.records_written(), 2);
        writer.close().unwrap();

        let file = File::open(&path).unwrap();
        let lines: Vec<_> = BufReader::new(file).lines().filter_map(|l| l.ok()).collect();
        assert_eq!(lines.len(), 2);

        let second: EventRecord = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.payload_hex, "59");
        assert_eq!(second.winner, 2);
    }

    #[test]
    fn test_rewrite_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");

        for _ in 0..2 {
            let mut writer = EventLogWriter::create(&path).unwrap();
            writer.write_correlation(&sample()).unwrap();
            writer.close().unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_summary_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("summary.json");

        let correlation = sample();
        let known = KnownPublishers::Any;
        let stats = aggregate(&correlation, &known);
        let cov = coverage(&correlation, None);
        let report = SummaryReport::build("feed.pcap", &correlation, &stats, &cov);

        write_summary_json(&path, &report).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["capture"], "feed.pcap");
        assert_eq!(value["events"], 2);
        assert_eq!(value["frames"], 3);
        assert_eq!(value["publishers"][0]["publisher"], 1);
        assert_eq!(value["publishers"][0]["missing"], 1);
        assert_eq!(value["skipped"]["missing_payload"], 0);
        assert!(value["unknown"].is_null());
    }
}
