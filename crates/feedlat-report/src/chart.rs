//! Text bar chart of first arrivals per publisher.

use feedlat_core::LatencyStats;
use std::fmt::Write;

const BAR: char = '#';

/// Render one bar per publisher, scaled so the largest count spans `width`
/// characters. A non-zero count always gets at least one character.
pub fn render_first_arrivals(stats: &LatencyStats, width: usize) -> String {
    let mut rows: Vec<(String, u64)> = stats
        .publishers
        .iter()
        .map(|(id, s)| (id.to_string(), s.first_arrival_count))
        .collect();
    if !stats.unknown.is_empty() {
        rows.push(("unknown".to_string(), stats.unknown.stats.first_arrival_count));
    }

    let mut out = String::new();
    let _ = writeln!(out, "First arrivals per publisher");
    if rows.is_empty() {
        let _ = writeln!(out, "  (no events)");
        return out;
    }

    let max = rows.iter().map(|(_, count)| *count).max().unwrap_or(0);
    let label_width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

    for (label, count) in &rows {
        let bar_len = scaled(*count, max, width);
        let _ = writeln!(
            out,
            "  {:>lw$} | {} {}",
            label,
            BAR.to_string().repeat(bar_len),
            count,
            lw = label_width
        );
    }
    out
}

fn scaled(count: u64, max: u64, width: usize) -> usize {
    if max == 0 || count == 0 {
        return 0;
    }
    let len = (count as f64 / max as f64 * width as f64).round() as usize;
    len.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedlat_core::{KnownPublishers, PublisherId};

    fn stats(counts: &[(u16, u64)]) -> LatencyStats {
        let known = KnownPublishers::Any;
        let mut stats = LatencyStats::new(&known);
        for (id, count) in counts {
            let bucket = stats.bucket_mut(PublisherId(*id), &known);
            for _ in 0..*count {
                bucket.record_first_arrival();
            }
        }
        stats
    }

    #[test]
    fn test_bars_scale_to_width() {
        let chart = render_first_arrivals(&stats(&[(1, 10), (2, 5), (3, 0)]), 20);
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].matches('#').count(), 20);
        assert_eq!(lines[2].matches('#').count(), 10);
        assert_eq!(lines[3].matches('#').count(), 0);
        assert!(lines[1].ends_with(" 10"));
    }

    #[test]
    fn test_small_count_still_visible() {
        let chart = render_first_arrivals(&stats(&[(1, 1000), (2, 1)]), 10);
        assert_eq!(chart.lines().nth(2).unwrap().matches('#').count(), 1);
    }

    #[test]
    fn test_empty_stats() {
        let chart = render_first_arrivals(&LatencyStats::default(), 40);
        assert!(chart.contains("no events"));
    }
}
