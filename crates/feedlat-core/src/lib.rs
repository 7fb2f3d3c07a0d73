//! Core domain types for redundant-feed latency analysis.
//!
//! This crate provides the plain data shared by every stage of the pipeline:
//! - `Frame`: one decoded capture record (timestamp, publisher, payload)
//! - `Event` / `Arrival`: copies of one logical update correlated by payload
//! - `PublisherStats` / `LatencyStats`: per-publisher aggregates

pub mod error;
pub mod event;
pub mod frame;
pub mod stats;

pub use error::{CoreError, Result};
pub use event::{Arrival, Event};
pub use frame::{Frame, Payload, PublisherId};
pub use stats::{KnownPublishers, LatencyStats, PublisherStats, UnknownBucket};
