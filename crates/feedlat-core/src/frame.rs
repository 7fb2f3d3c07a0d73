//! Decoded capture frames and their identity fields.
//!
//! A frame is what the capture decoder hands to the engine: when it was
//! observed, which publisher sent it, and the raw payload bytes. Publisher and
//! payload are optional at this boundary so that partially decoded records can
//! still be counted instead of silently dropped.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Publisher identity.
///
/// Derived upstream from a transport/network field (IPv4 identification by
/// default). Observed captures use a small range (1-4) but the type does not
/// restrict it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublisherId(pub u16);

impl PublisherId {
    pub fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for PublisherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PublisherId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u16>()
            .map(Self)
            .map_err(|_| CoreError::InvalidPublisher(s.to_string()))
    }
}

impl From<u16> for PublisherId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

/// Opaque payload bytes used as the correlation key.
///
/// Equality is exact byte equality. The contents are never parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode from a hex string (as written by the JSON Lines formats).
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(hex::decode(s.trim())?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short hex preview for log lines (first `max_bytes` bytes).
    pub fn preview(&self, max_bytes: usize) -> String {
        if self.0.len() <= max_bytes {
            self.to_hex()
        } else {
            format!("{}..({}B)", hex::encode(&self.0[..max_bytes]), self.0.len())
        }
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.preview(16))
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Payload::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// One decoded capture record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Capture timestamp in seconds. Non-decreasing within a stream.
    pub timestamp: f64,
    /// Publisher identity, `None` if the decoder could not extract it.
    pub publisher: Option<PublisherId>,
    /// Payload bytes, `None` if the decoder could not extract them.
    pub payload: Option<Payload>,
}

impl Frame {
    /// Create a fully decoded frame.
    pub fn new(timestamp: f64, publisher: impl Into<PublisherId>, payload: impl Into<Payload>) -> Self {
        Self {
            timestamp,
            publisher: Some(publisher.into()),
            payload: Some(payload.into()),
        }
    }

    /// Create a frame the decoder could only partially read.
    pub fn partial(timestamp: f64, publisher: Option<PublisherId>, payload: Option<Payload>) -> Self {
        Self {
            timestamp,
            publisher,
            payload,
        }
    }
}
