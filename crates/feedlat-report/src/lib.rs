//! Reporting for feedlat.
//!
//! Renders the outcome of an analysis run:
//! - `SummaryReport`: per-publisher table, logged and serializable
//! - `render_first_arrivals`: ASCII bar chart of first arrivals
//! - `render_preview`: first and last events with their arrivals
//! - `write_summary_json` / `EventLogWriter`: result files

pub mod chart;
pub mod error;
pub mod preview;
pub mod summary;
pub mod writer;

pub use chart::render_first_arrivals;
pub use error::{ReportError, ReportResult};
pub use preview::render_preview;
pub use summary::{PublisherRow, SummaryReport};
pub use writer::{write_summary_json, ArrivalRecord, EventLogWriter, EventRecord};
