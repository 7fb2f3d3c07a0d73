//! Key-partitioned parallel correlation.
//!
//! Frames are routed to shards by payload hash so that every copy of an event
//! is seen by one worker in original relative order. Each shard runs its own
//! correlator; the shard results are merged back into global first-seen order
//! using the stream position of each event's first frame.

use crate::correlator::{Correlation, Correlator, Ingest};
use feedlat_core::{Event, Frame, Payload};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;
use tracing::debug;

struct ShardOutput {
    correlation: Correlation,
    /// Stream position of the frame that opened each event, in shard order.
    opened_at: Vec<u64>,
}

fn shard_of(payload: &Payload, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    payload.hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}

fn run_shard(frames: Vec<(u64, Frame)>) -> ShardOutput {
    let mut correlator = Correlator::new();
    let mut opened_at = Vec::new();

    for (seq, frame) in frames {
        if let Ingest::Opened { .. } = correlator.push(frame) {
            opened_at.push(seq);
        }
    }

    ShardOutput {
        correlation: correlator.finish(),
        opened_at,
    }
}

/// Correlate on `workers` threads. Produces the same result as
/// [`correlate`](crate::correlate) on the same input.
pub fn correlate_partitioned(frames: Vec<Frame>, workers: usize) -> Correlation {
    if workers <= 1 {
        return crate::correlator::correlate(frames);
    }

    let mut shards: Vec<Vec<(u64, Frame)>> = (0..workers).map(|_| Vec::new()).collect();
    for (seq, frame) in frames.into_iter().enumerate() {
        // Frames without a payload cannot be routed; shard 0 counts them as skipped.
        let shard = frame
            .payload
            .as_ref()
            .map(|payload| shard_of(payload, workers))
            .unwrap_or(0);
        shards[shard].push((seq as u64, frame));
    }

    for (idx, shard) in shards.iter().enumerate() {
        debug!(shard = idx, frames = shard.len(), "Shard assigned");
    }

    let outputs: Vec<ShardOutput> = thread::scope(|scope| {
        let handles: Vec<_> = shards
            .into_iter()
            .map(|shard| scope.spawn(move || run_shard(shard)))
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });

    merge(outputs)
}

fn merge(outputs: Vec<ShardOutput>) -> Correlation {
    let mut merged = Correlation::default();
    let mut ordered: Vec<(u64, Payload, Event)> = Vec::new();

    for output in outputs {
        let ShardOutput {
            correlation,
            opened_at,
        } = output;

        merged.frames += correlation.frames;
        merged.skipped.merge(&correlation.skipped);
        merged.negative_delays += correlation.negative_delays;

        ordered.extend(
            opened_at
                .into_iter()
                .zip(correlation.events)
                .map(|(seq, (payload, event))| (seq, payload, event)),
        );
    }

    ordered.sort_by_key(|(seq, _, _)| *seq);

    for (idx, (_, payload, event)) in ordered.into_iter().enumerate() {
        merged.index.insert(payload.clone(), idx);
        merged.events.push((payload, event));
    }

    merged
}
