//! Event preview for quick inspection of a correlation.

use feedlat_core::{Event, Payload};
use feedlat_engine::Correlation;
use std::fmt::Write;

/// Payload bytes shown per event.
const PAYLOAD_PREVIEW_BYTES: usize = 16;

/// Render the first and last `n` events with their arrivals.
pub fn render_preview(correlation: &Correlation, n: usize) -> String {
    let preview = correlation.preview(n);
    let mut out = String::new();

    let _ = writeln!(out, "Events: {}", correlation.len());
    for (idx, (payload, event)) in preview.head.iter().enumerate() {
        write_event(&mut out, idx, payload, event);
    }

    if preview.tail.is_empty() {
        return out;
    }

    let tail_start = correlation.len() - preview.tail.len();
    let omitted = tail_start - preview.head.len();
    if omitted > 0 {
        let _ = writeln!(out, "  ... {} events omitted ...", omitted);
    }
    for (offset, (payload, event)) in preview.tail.iter().enumerate() {
        write_event(&mut out, tail_start + offset, payload, event);
    }
    out
}

fn write_event(out: &mut String, idx: usize, payload: &Payload, event: &Event) {
    let arrivals: Vec<String> = event
        .arrivals()
        .iter()
        .map(|a| format!("{}@+{:.3}ms", a.publisher, a.delay * 1000.0))
        .collect();
    let _ = writeln!(
        out,
        "  #{} {} start={:.6} [{}]",
        idx,
        payload.preview(PAYLOAD_PREVIEW_BYTES),
        event.start_time(),
        arrivals.join(", ")
    );
}
