//! JSON Lines frame format.
//!
//! One frame per line: `{"ts": 1.25, "publisher": 2, "payload_hex": "4142"}`.
//! `publisher` and `payload_hex` may be null or absent for frames the
//! upstream decoder could not fully read. A publisher that is not a `u16` or a
//! payload that is not valid hex reads as absent, so the frame is counted as
//! malformed downstream. Blank lines are ignored.

use crate::error::{CaptureError, CaptureResult};
use feedlat_core::{Frame, Payload, PublisherId};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Serialized frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub ts: f64,
    /// Kept as raw JSON so out-of-range ids do not fail the line.
    #[serde(default)]
    pub publisher: Option<serde_json::Value>,
    #[serde(default)]
    pub payload_hex: Option<serde_json::Value>,
}

impl From<&Frame> for FrameRecord {
    fn from(frame: &Frame) -> Self {
        Self {
            ts: frame.timestamp,
            publisher: frame.publisher.map(|p| serde_json::Value::from(p.value())),
            payload_hex: frame
                .payload
                .as_ref()
                .map(|p| serde_json::Value::String(p.to_hex())),
        }
    }
}

impl FrameRecord {
    fn into_frame(self, line: usize) -> Frame {
        let publisher = self.publisher.and_then(|value| match &value {
            serde_json::Value::Null => None,
            _ => {
                let id = value.as_u64().and_then(|v| u16::try_from(v).ok());
                if id.is_none() {
                    warn!(line, publisher = %value, "Unreadable publisher, frame kept without one");
                }
                id.map(PublisherId::new)
            }
        });

        let payload = self.payload_hex.and_then(|value| match &value {
            serde_json::Value::Null => None,
            serde_json::Value::String(hex) => match Payload::from_hex(hex) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!(line, error = %e, "Unreadable payload_hex, frame kept without payload");
                    None
                }
            },
            _ => {
                warn!(line, payload_hex = %value, "payload_hex is not a string, frame kept without payload");
                None
            }
        });

        Frame::partial(self.ts, publisher, payload)
    }
}

/// Streaming reader for JSON Lines frames.
pub struct JsonLinesFrameReader<R> {
    lines: Lines<R>,
    line: usize,
    done: bool,
}

impl JsonLinesFrameReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> CaptureResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!(path = %path.display(), "Opening JSON Lines frames");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesFrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesFrameReader<R> {
    type Item = CaptureResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(e) => {
                    self.done = true;
                    return Some(Err(CaptureError::Io(e)));
                }
            };
            self.line += 1;

            if text.trim().is_empty() {
                continue;
            }

            let line = self.line;
            let result = serde_json::from_str::<FrameRecord>(&text)
                .map(|record| record.into_frame(line))
                .map_err(|e| CaptureError::Parse {
                    line,
                    message: e.to_string(),
                });

            if result.is_err() {
                self.done = true;
            }
            return Some(result);
        }
    }
}

/// Writes frames as JSON Lines.
pub struct JsonLinesFrameWriter<W: Write> {
    writer: W,
    written: u64,
}

impl JsonLinesFrameWriter<BufWriter<File>> {
    /// Create (or truncate) a frame file.
    pub fn create(path: impl AsRef<Path>) -> CaptureResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        info!(path = %path.display(), "Writing JSON Lines frames");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesFrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn write(&mut self, frame: &Frame) -> CaptureResult<()> {
        let json = serde_json::to_string(&FrameRecord::from(frame))?;
        writeln!(self.writer, "{}", json)?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and return the inner writer.
    pub fn finish(mut self) -> CaptureResult<W> {
        self.writer.flush()?;
        debug!(frames = self.written, "Frame export flushed");
        Ok(self.writer)
    }
}
