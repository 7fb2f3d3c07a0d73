//! Link, network and transport header decoding.
//!
//! Only the fields needed for correlation are read: the IPv4 identification,
//! transport ports and the innermost payload. Anything that cannot be decoded
//! is left as `None` so the engine can count the frame as malformed.

use serde::{Deserialize, Serialize};

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_QINQ: u16 = 0x88a8;

const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;

const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const LINUX_SLL_HEADER_LEN: usize = 16;
const IPV4_MIN_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;
const TCP_MIN_HEADER_LEN: usize = 20;

/// Capture link-layer type (pcap `network` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    Ethernet,
    RawIpv4,
    LinuxCooked,
}

impl LinkType {
    /// Map a pcap link type number. `None` for unsupported links.
    pub fn from_pcap(network: u32) -> Option<Self> {
        match network {
            1 => Some(Self::Ethernet),
            101 | 228 => Some(Self::RawIpv4),
            113 => Some(Self::LinuxCooked),
            _ => None,
        }
    }
}

/// Fields extracted from one captured packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketFields<'a> {
    pub ip_id: Option<u16>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub payload: Option<&'a [u8]>,
}

fn be_u16(data: &[u8], at: usize) -> Option<u16> {
    data.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
}

/// Decode a packet captured on the given link.
pub fn decode(link: LinkType, data: &[u8]) -> PacketFields<'_> {
    let ip = match link {
        LinkType::Ethernet => ethernet_ipv4(data),
        LinkType::LinuxCooked => match be_u16(data, 14) {
            Some(ETHERTYPE_IPV4) => data.get(LINUX_SLL_HEADER_LEN..),
            _ => None,
        },
        LinkType::RawIpv4 => Some(data),
    };

    ip.map(ipv4).unwrap_or_default()
}

fn ethernet_ipv4(data: &[u8]) -> Option<&[u8]> {
    let mut offset = ETHERNET_HEADER_LEN - 2;
    let mut ethertype = be_u16(data, offset)?;

    while ethertype == ETHERTYPE_VLAN || ethertype == ETHERTYPE_QINQ {
        offset += VLAN_TAG_LEN;
        ethertype = be_u16(data, offset)?;
    }

    if ethertype != ETHERTYPE_IPV4 {
        return None;
    }
    data.get(offset + 2..)
}

fn ipv4(data: &[u8]) -> PacketFields<'_> {
    let Some(&version_ihl) = data.first() else {
        return PacketFields::default();
    };
    let header_len = usize::from(version_ihl & 0x0f) * 4;
    if version_ihl >> 4 != 4 || header_len < IPV4_MIN_HEADER_LEN || data.len() < header_len {
        return PacketFields::default();
    }

    let mut fields = PacketFields {
        ip_id: be_u16(data, 4),
        ..PacketFields::default()
    };

    // Ethernet padding can follow the datagram; trust the total length when sane.
    let total_len = be_u16(data, 2)
        .map(usize::from)
        .filter(|len| *len >= header_len && *len <= data.len())
        .unwrap_or(data.len());
    let body = &data[header_len..total_len];

    match data[9] {
        IPPROTO_UDP => {
            if body.len() >= UDP_HEADER_LEN {
                fields.src_port = be_u16(body, 0);
                fields.dst_port = be_u16(body, 2);
                let udp_len = be_u16(body, 4)
                    .map(usize::from)
                    .filter(|len| *len >= UDP_HEADER_LEN && *len <= body.len())
                    .unwrap_or(body.len());
                fields.payload = Some(&body[UDP_HEADER_LEN..udp_len]);
            }
        }
        IPPROTO_TCP => {
            if body.len() >= TCP_MIN_HEADER_LEN {
                fields.src_port = be_u16(body, 0);
                fields.dst_port = be_u16(body, 2);
                let data_offset = usize::from(body[12] >> 4) * 4;
                if data_offset >= TCP_MIN_HEADER_LEN && data_offset <= body.len() {
                    fields.payload = Some(&body[data_offset..]);
                }
            }
        }
        _ => fields.payload = Some(body),
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn udp_datagram(ip_id: u16, src_port: u16, payload: &[u8]) -> Vec<u8> {
        let total = (IPV4_MIN_HEADER_LEN + UDP_HEADER_LEN + payload.len()) as u16;
        let mut ip = vec![0x45, 0x00];
        ip.extend_from_slice(&total.to_be_bytes());
        ip.extend_from_slice(&ip_id.to_be_bytes());
        ip.extend_from_slice(&[0x00, 0x00, 64, IPPROTO_UDP, 0x00, 0x00]);
        ip.extend_from_slice(&[10, 0, 0, 1, 239, 0, 0, 1]);
        ip.extend_from_slice(&src_port.to_be_bytes());
        ip.extend_from_slice(&5000u16.to_be_bytes());
        ip.extend_from_slice(&((UDP_HEADER_LEN + payload.len()) as u16).to_be_bytes());
        ip.extend_from_slice(&[0x00, 0x00]);
        ip.extend_from_slice(payload);
        ip
    }

    fn ethernet(ethertype: u16, body: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; 12];
        frame.extend_from_slice(&ethertype.to_be_bytes());
        frame.extend_from_slice(body);
        frame
    }

    #[test]
    fn test_raw_ipv4_udp() {
        let packet = udp_datagram(3, 4001, b"price");
        let fields = decode(LinkType::RawIpv4, &packet);

        assert_eq!(fields.ip_id, Some(3));
        assert_eq!(fields.src_port, Some(4001));
        assert_eq!(fields.dst_port, Some(5000));
        assert_eq!(fields.payload, Some(b"price".as_slice()));
    }

    #[test]
    fn test_ethernet_trailing_padding_ignored() {
        let mut packet = ethernet(ETHERTYPE_IPV4, &udp_datagram(2, 4000, b"ab"));
        packet.extend_from_slice(&[0u8; 12]);
        let fields = decode(LinkType::Ethernet, &packet);

        assert_eq!(fields.ip_id, Some(2));
        assert_eq!(fields.payload, Some(b"ab".as_slice()));
    }

    #[test]
    fn test_vlan_tag_skipped() {
        let mut body = vec![0x00, 0x64];
        body.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
        body.extend_from_slice(&udp_datagram(4, 4000, b"v"));
        let packet = ethernet(ETHERTYPE_VLAN, &body);

        let fields = decode(LinkType::Ethernet, &packet);
        assert_eq!(fields.ip_id, Some(4));
        assert_eq!(fields.payload, Some(b"v".as_slice()));
    }

    #[test]
    fn test_non_ipv4_has_no_fields() {
        let packet = ethernet(0x86dd, &[0u8; 40]);
        assert_eq!(decode(LinkType::Ethernet, &packet), PacketFields::default());
    }

    #[test]
    fn test_truncated_udp_keeps_ip_id() {
        let packet = udp_datagram(1, 4000, b"");
        let fields = decode(LinkType::RawIpv4, &packet[..24]);

        assert_eq!(fields.ip_id, Some(1));
        assert_eq!(fields.payload, None);
    }

    fn tcp_datagram(ip_id: u16, options: &[u8], payload: &[u8]) -> Vec<u8> {
        let tcp_len = TCP_MIN_HEADER_LEN + options.len();
        let total = (IPV4_MIN_HEADER_LEN + tcp_len + payload.len()) as u16;
        let mut ip = vec![0x45, 0x00];
        ip.extend_from_slice(&total.to_be_bytes());
        ip.extend_from_slice(&ip_id.to_be_bytes());
        ip.extend_from_slice(&[0x00, 0x00, 64, IPPROTO_TCP, 0x00, 0x00]);
        ip.extend_from_slice(&[10, 0, 0, 1, 10, 0, 0, 2]);
        ip.extend_from_slice(&7001u16.to_be_bytes());
        ip.extend_from_slice(&9000u16.to_be_bytes());
        ip.extend_from_slice(&[0u8; 8]);
        ip.push(((tcp_len / 4) as u8) << 4);
        ip.extend_from_slice(&[0x18, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00]);
        ip.extend_from_slice(options);
        ip.extend_from_slice(payload);
        ip
    }

    fn linux_cooked(ethertype: u16, body: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x00, 0x00, 0x00, 0x01, 0x00, 0x06];
        frame.extend_from_slice(&[0x02, 0x42, 0xac, 0x11, 0x00, 0x02, 0x00, 0x00]);
        frame.extend_from_slice(&ethertype.to_be_bytes());
        frame.extend_from_slice(body);
        frame
    }

    #[test]
    fn test_tcp_payload_after_data_offset() {
        let packet = tcp_datagram(8, &[], b"quote");
        let fields = decode(LinkType::RawIpv4, &packet);

        assert_eq!(fields.ip_id, Some(8));
        assert_eq!(fields.src_port, Some(7001));
        assert_eq!(fields.dst_port, Some(9000));
        assert_eq!(fields.payload, Some(b"quote".as_slice()));
    }

    #[test]
    fn test_tcp_options_skipped() {
        let options = [0x01, 0x01, 0x08, 0x0a, 0, 0, 0, 1, 0, 0, 0, 2];
        let packet = ethernet(ETHERTYPE_IPV4, &tcp_datagram(9, &options, b"px"));
        let fields = decode(LinkType::Ethernet, &packet);

        assert_eq!(fields.ip_id, Some(9));
        assert_eq!(fields.payload, Some(b"px".as_slice()));
    }

    #[test]
    fn test_tcp_bad_data_offset_has_no_payload() {
        let mut packet = tcp_datagram(10, &[], b"x");
        // Data offset of 15 words runs past the segment.
        packet[IPV4_MIN_HEADER_LEN + 12] = 0xf0;
        let fields = decode(LinkType::RawIpv4, &packet);

        assert_eq!(fields.ip_id, Some(10));
        assert_eq!(fields.src_port, Some(7001));
        assert_eq!(fields.payload, None);
    }

    #[test]
    fn test_linux_cooked_ipv4() {
        let packet = linux_cooked(ETHERTYPE_IPV4, &udp_datagram(6, 4006, b"sll"));
        let fields = decode(LinkType::LinuxCooked, &packet);

        assert_eq!(fields.ip_id, Some(6));
        assert_eq!(fields.src_port, Some(4006));
        assert_eq!(fields.payload, Some(b"sll".as_slice()));
    }

    #[test]
    fn test_linux_cooked_non_ipv4() {
        let packet = linux_cooked(0x86dd, &[0u8; 40]);
        assert_eq!(decode(LinkType::LinuxCooked, &packet), PacketFields::default());
        assert_eq!(decode(LinkType::LinuxCooked, &packet[..10]), PacketFields::default());
    }

    #[test]
    fn test_link_type_mapping() {
        assert_eq!(LinkType::from_pcap(1), Some(LinkType::Ethernet));
        assert_eq!(LinkType::from_pcap(101), Some(LinkType::RawIpv4));
        assert_eq!(LinkType::from_pcap(113), Some(LinkType::LinuxCooked));
        assert_eq!(LinkType::from_pcap(127), None);
    }
}
