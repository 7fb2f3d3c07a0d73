use feedlat_core::{Frame, KnownPublishers, Payload};
use feedlat_engine::{aggregate, correlate, coverage};
use feedlat_report::{
    render_first_arrivals, render_preview, write_summary_json, EventLogWriter, EventRecord,
    SummaryReport,
};
use tempfile::TempDir;

/// Four redundant publishers, publisher 2 drops every third update.
fn redundant_feed(updates: usize) -> Vec<Frame> {
    let mut frames = Vec::new();
    for i in 0..updates {
        let payload = Payload::new(format!("seq={i}").into_bytes());
        let base = i as f64 * 0.1;
        for (publisher, lag) in [(3u16, 0.0), (1, 0.0002), (4, 0.0005), (2, 0.001)] {
            if publisher == 2 && i % 3 == 0 {
                continue;
            }
            frames.push(Frame::new(base + lag, publisher, payload.clone()));
        }
    }
    frames
}

#[test]
fn summary_reflects_feed() {
    let correlation = correlate(redundant_feed(30));
    let known = KnownPublishers::from_ids([1u16, 2, 3, 4]);
    let stats = aggregate(&correlation, &known);
    let cov = coverage(&correlation, known.ids());
    let report = SummaryReport::build("redundant.pcap", &correlation, &stats, &cov);

    assert_eq!(report.events, 30);
    assert_eq!(report.fastest, Some(3));
    assert_eq!(report.row(3).unwrap().first_arrivals, 30);
    assert_eq!(report.row(2).unwrap().missing, 10);
    assert_eq!(report.row(2).unwrap().arrivals, 20);
    assert_eq!(report.complete_events, 20);
    assert_eq!(report.frames, 110);

    let chart = render_first_arrivals(&stats, 30);
    assert!(chart.lines().any(|l| l.trim_start().starts_with('3') && l.contains(&"#".repeat(30))));

    let preview = render_preview(&correlation, 2);
    assert!(preview.contains("26 events omitted"));
}

#[test]
fn result_files_written() {
    let dir = TempDir::new().unwrap();
    let correlation = correlate(redundant_feed(5));
    let stats = aggregate(&correlation, &KnownPublishers::Any);
    let cov = coverage(&correlation, None);
    let report = SummaryReport::build("redundant.pcap", &correlation, &stats, &cov);

    let summary_path = dir.path().join("summary.json");
    write_summary_json(&summary_path, &report).unwrap();
    assert!(std::fs::read_to_string(&summary_path)
        .unwrap()
        .contains("\"fastest\": 3"));

    let events_path = dir.path().join("events.jsonl");
    let mut writer = EventLogWriter::create(&events_path).unwrap();
    writer.write_correlation(&correlation).unwrap();
    writer.close().unwrap();

    let records: Vec<EventRecord> = std::fs::read_to_string(&events_path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.winner == 3));
    assert_eq!(records[0].arrivals.len(), 3);
    assert_eq!(records[1].arrivals.len(), 4);
}
