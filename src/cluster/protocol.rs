//! Cluster Wire Envelope
//!
//! Defines the binary envelope used on the cluster-internal socket. A
//! datagram forwarded between nodes carries a record-type byte and the
//! encoded source address of the original client, so the owning node can
//! reconstruct the client datagram exactly. Everything that is not a
//! forward/return record is management traffic for the channel itself.

use std::net::{IpAddr, SocketAddr};

use bytes::{BufMut, Bytes, BytesMut};

/// Record type for a client datagram forwarded to the owning node.
pub const RECORD_FORWARD: u8 = 63;

/// Record type for a response datagram returned for client delivery.
pub const RECORD_RETURN: u8 = 62;

/// Worst-case envelope size: type, address length, port, IPv6 address.
/// Management socket buffers are enlarged by this amount so a full-size
/// client datagram still fits after wrapping.
pub const ENVELOPE_OVERHEAD: usize = 20;

/// A raw addressed datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Address the datagram was received from or is destined to.
    pub peer: SocketAddr,
    /// Raw datagram bytes.
    pub payload: Bytes,
}

impl Datagram {
    pub fn new(peer: SocketAddr, payload: Bytes) -> Self {
        Self { peer, payload }
    }

    /// Length of the raw payload in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// True when the record type belongs to the base routing layer
/// (forwarded client traffic) rather than the management channel.
pub fn is_routing_record(record_type: u8) -> bool {
    matches!(record_type, RECORD_FORWARD | RECORD_RETURN)
}

/// Wrap a client datagram for node-to-node transmission.
///
/// Layout: type (1), address length (1), source port (2, big endian),
/// source IP (4 or 16), payload.
pub fn encode_envelope(record_type: u8, source: SocketAddr, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(ENVELOPE_OVERHEAD + payload.len());
    buf.put_u8(record_type);
    match source.ip() {
        IpAddr::V4(ip) => {
            buf.put_u8(4);
            buf.put_u16(source.port());
            buf.put_slice(&ip.octets());
        }
        IpAddr::V6(ip) => {
            buf.put_u8(16);
            buf.put_u16(source.port());
            buf.put_slice(&ip.octets());
        }
    }
    buf.put_slice(payload);
    buf.freeze()
}

/// Unwrap a node-to-node envelope into record type, original source
/// address, and the client payload. Returns `None` on a malformed header.
pub fn decode_envelope(data: &[u8]) -> Option<(u8, SocketAddr, Bytes)> {
    if data.len() < 4 {
        return None;
    }
    let record_type = data[0];
    let addr_len = data[1] as usize;
    let port = u16::from_be_bytes([data[2], data[3]]);
    let header = 4 + addr_len;
    if data.len() < header {
        return None;
    }
    let ip: IpAddr = match addr_len {
        4 => {
            let octets: [u8; 4] = data[4..8].try_into().ok()?;
            IpAddr::from(octets)
        }
        16 => {
            let octets: [u8; 16] = data[4..20].try_into().ok()?;
            IpAddr::from(octets)
        }
        _ => return None,
    };
    let payload = Bytes::copy_from_slice(&data[header..]);
    Some((record_type, SocketAddr::new(ip, port), payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_roundtrip_v4() {
        let source: SocketAddr = "192.168.1.10:5684".parse().unwrap();
        let payload = b"client datagram";

        let wrapped = encode_envelope(RECORD_FORWARD, source, payload);
        assert_eq!(wrapped.len(), 1 + 1 + 2 + 4 + payload.len());

        let (record_type, decoded_source, decoded_payload) =
            decode_envelope(&wrapped).unwrap();
        assert_eq!(record_type, RECORD_FORWARD);
        assert_eq!(decoded_source, source);
        assert_eq!(&decoded_payload[..], payload);
    }

    #[test]
    fn test_envelope_roundtrip_v6() {
        let source: SocketAddr = "[2001:db8::7]:40001".parse().unwrap();
        let payload = vec![0xab; 1200];

        let wrapped = encode_envelope(RECORD_RETURN, source, &payload);
        assert_eq!(wrapped.len(), ENVELOPE_OVERHEAD + payload.len());

        let (record_type, decoded_source, decoded_payload) =
            decode_envelope(&wrapped).unwrap();
        assert_eq!(record_type, RECORD_RETURN);
        assert_eq!(decoded_source, source);
        assert_eq!(decoded_payload.len(), 1200);
    }

    #[test]
    fn test_envelope_overhead_is_worst_case() {
        let v6: SocketAddr = "[::1]:1".parse().unwrap();
        let wrapped = encode_envelope(RECORD_FORWARD, v6, &[]);
        assert_eq!(wrapped.len(), ENVELOPE_OVERHEAD);

        let v4: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let wrapped = encode_envelope(RECORD_FORWARD, v4, &[]);
        assert!(wrapped.len() <= ENVELOPE_OVERHEAD);
    }

    #[test]
    fn test_decode_rejects_truncated_header() {
        assert!(decode_envelope(&[]).is_none());
        assert!(decode_envelope(&[RECORD_FORWARD, 4, 0]).is_none());
        // address length says 16 but only 4 bytes follow
        assert!(decode_envelope(&[RECORD_FORWARD, 16, 0, 80, 1, 2, 3, 4]).is_none());
    }

    #[test]
    fn test_decode_rejects_bad_address_length() {
        let data = [RECORD_FORWARD, 7, 0, 80, 0, 0, 0, 0, 0, 0, 0];
        assert!(decode_envelope(&data).is_none());
    }

    #[test]
    fn test_record_classification() {
        assert!(is_routing_record(RECORD_FORWARD));
        assert!(is_routing_record(RECORD_RETURN));
        // DTLS record content types and plain management traffic
        assert!(!is_routing_record(22));
        assert!(!is_routing_record(23));
        assert!(!is_routing_record(0));
    }
}
