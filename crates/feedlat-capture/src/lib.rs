//! Capture readers for feedlat.
//!
//! Turns capture files into a lazy, ordered stream of `Frame`s:
//! - `PcapReader`: classic libpcap files (Ethernet, raw IPv4, Linux cooked)
//! - `JsonLinesFrameReader`: pre-decoded frames, one JSON object per line
//! - `IdentityField`: which network field identifies the publisher

pub mod error;
pub mod identity;
pub mod jsonl;
pub mod packet;
pub mod pcap;
pub mod source;

pub use error::{CaptureError, CaptureResult};
pub use identity::IdentityField;
pub use jsonl::{FrameRecord, JsonLinesFrameReader, JsonLinesFrameWriter};
pub use packet::{LinkType, PacketFields};
pub use pcap::PcapReader;
pub use source::{open_frames, CaptureFormat, FrameStream};
