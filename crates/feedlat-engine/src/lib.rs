//! Correlation and aggregation engine.
//!
//! Groups frames carrying the same payload into events, measures every
//! arrival against the first copy of its event, and folds the arrivals into
//! per-publisher statistics:
//! - `correlate` / `Correlator`: single ordered pass building the event map
//! - `delay`: delay computation and classification
//! - `aggregate`: per-publisher totals, arrivals and first-arrival wins
//! - `coverage`: missing and duplicate arrivals per publisher
//! - `correlate_partitioned`: key-partitioned parallel correlation

pub mod aggregator;
pub mod correlator;
pub mod coverage;
pub mod delay;
pub mod partition;

pub use aggregator::{aggregate, Aggregator};
pub use correlator::{correlate, Correlation, Correlator, Ingest, Preview, SkipCounts, SkipReason};
pub use coverage::{coverage, Coverage};
pub use delay::DelayQuality;
pub use partition::correlate_partitioned;
