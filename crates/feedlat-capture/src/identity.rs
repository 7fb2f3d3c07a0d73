//! Publisher identity extraction.
//!
//! Each publisher stamps a network-layer field that tells its copies apart.
//! Redundant multicast feeds usually number their publishers through the IPv4
//! identification field; port-based identities cover feeds that publish from
//! distinct sockets instead.

use crate::packet::PacketFields;
use feedlat_core::PublisherId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field used as the publisher identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityField {
    /// IPv4 identification field.
    #[default]
    IpId,
    /// UDP/TCP source port.
    SrcPort,
    /// UDP/TCP destination port.
    DstPort,
}

impl IdentityField {
    /// Extract the publisher identity, `None` if the packet lacks the field.
    pub fn extract(&self, fields: &PacketFields<'_>) -> Option<PublisherId> {
        let raw = match self {
            Self::IpId => fields.ip_id,
            Self::SrcPort => fields.src_port,
            Self::DstPort => fields.dst_port,
        };
        raw.map(PublisherId::new)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IpId => "ip_id",
            Self::SrcPort => "src_port",
            Self::DstPort => "dst_port",
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "ip_id" => Ok(Self::IpId),
            "src_port" => Ok(Self::SrcPort),
            "dst_port" => Ok(Self::DstPort),
            other => Err(format!(
                "unknown identity field '{other}' (expected ip_id, src_port or dst_port)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> PacketFields<'static> {
        PacketFields {
            ip_id: Some(2),
            src_port: Some(4002),
            dst_port: Some(5000),
            payload: Some(b"x"),
        }
    }

    #[test]
    fn test_extract_each_field() {
        assert_eq!(IdentityField::IpId.extract(&fields()), Some(PublisherId(2)));
        assert_eq!(IdentityField::SrcPort.extract(&fields()), Some(PublisherId(4002)));
        assert_eq!(IdentityField::DstPort.extract(&fields()), Some(PublisherId(5000)));
    }

    #[test]
    fn test_missing_field_is_none() {
        let empty = PacketFields::default();
        assert_eq!(IdentityField::IpId.extract(&empty), None);
        assert_eq!(IdentityField::SrcPort.extract(&empty), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("ip_id".parse::<IdentityField>(), Ok(IdentityField::IpId));
        assert_eq!("src-port".parse::<IdentityField>(), Ok(IdentityField::SrcPort));
        assert_eq!("DST_PORT".parse::<IdentityField>(), Ok(IdentityField::DstPort));
        assert!("mac".parse::<IdentityField>().is_err());
    }

    #[test]
    fn test_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            identity: IdentityField,
        }
        let parsed: Wrapper = serde_json::from_str(r#"{"identity":"src_port"}"#).unwrap();
        assert_eq!(parsed.identity, IdentityField::SrcPort);
    }
}
