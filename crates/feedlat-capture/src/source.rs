//! Frame source selection.

use crate::error::{CaptureError, CaptureResult};
use crate::identity::IdentityField;
use crate::jsonl::JsonLinesFrameReader;
use crate::pcap::PcapReader;
use feedlat_core::Frame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Lazy, finite, ordered frame stream. Consumed once.
pub type FrameStream = Box<dyn Iterator<Item = CaptureResult<Frame>> + Send>;

/// Capture file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    Pcap,
    Jsonl,
}

impl CaptureFormat {
    /// Guess the format from the file extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pcap" | "cap" => Some(Self::Pcap),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            _ => None,
        }
    }
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pcap => write!(f, "pcap"),
            Self::Jsonl => write!(f, "jsonl"),
        }
    }
}

impl FromStr for CaptureFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pcap" => Ok(Self::Pcap),
            "jsonl" | "ndjson" => Ok(Self::Jsonl),
            other => Err(format!("unknown capture format '{other}' (expected pcap or jsonl)")),
        }
    }
}

/// Open a capture as a frame stream.
///
/// `format` overrides extension detection. A missing file is reported before
/// anything is read.
pub fn open_frames(
    path: &Path,
    format: Option<CaptureFormat>,
    identity: IdentityField,
) -> CaptureResult<FrameStream> {
    if !path.is_file() {
        return Err(CaptureError::NotFound(path.display().to_string()));
    }

    let format = format
        .or_else(|| CaptureFormat::detect(path))
        .ok_or_else(|| {
            CaptureError::Unsupported(format!(
                "cannot detect format of {}, pass it explicitly",
                path.display()
            ))
        })?;

    let stream: FrameStream = match format {
        CaptureFormat::Pcap => Box::new(PcapReader::open(path, identity)?),
        CaptureFormat::Jsonl => Box::new(JsonLinesFrameReader::open(path)?),
    };
    Ok(stream)
}
