use byteorder::{ByteOrder, NetworkEndian};

use super::{Checksum, Error, IpProtocol, Result};
use super::ipv4::{self, Repr as Ipv4Repr};
use super::tcp::{self, Repr as TcpRepr};

/// A complete IPv4 datagram carrying one TCP segment, as read from a raw socket.
///
/// Every offset is checked against the buffer before it is used. Parsing never reads past the end
/// of the provided bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram<'a> {
    /// The network layer header.
    pub ip: Ipv4Repr,
    /// The transport layer header.
    pub tcp: TcpRepr,
    /// The payload bytes following both headers, possibly empty.
    pub payload: &'a [u8],
}

impl<'a> Datagram<'a> {
    /// The minimum length of an IPv4 datagram with a TCP segment.
    pub const MIN_LEN: usize = ipv4::HEADER_LEN + tcp::HEADER_LEN;

    /// Decode a raw datagram.
    ///
    /// Options of either header are skipped. The payload starts after both variable header
    /// lengths and is empty when the data offset points past the buffer. A total length field
    /// larger than the buffer is not an error, the buffer as received is authoritative, but
    /// trailing bytes beyond a smaller total length are cut off.
    pub fn parse(bytes: &'a [u8], checksum: Checksum) -> Result<Self> {
        if bytes.len() < Self::MIN_LEN {
            return Err(Error::Truncated);
        }

        let version = bytes[0] >> 4;
        let ip_header_len = usize::from(bytes[0] & 0x0f) * 4;
        if version != 4 || ip_header_len < ipv4::HEADER_LEN {
            return Err(Error::Malformed);
        }
        if ip_header_len + tcp::HEADER_LEN > bytes.len() {
            return Err(Error::Truncated);
        }

        let total_len = usize::from(NetworkEndian::read_u16(&bytes[2..4]));
        let end = if total_len >= ip_header_len + tcp::HEADER_LEN && total_len < bytes.len() {
            total_len
        } else {
            bytes.len()
        };
        let bytes = &bytes[..end];

        let ip_packet = ipv4::ipv4::new_unchecked(&bytes[..ip_header_len]);
        if ip_packet.protocol() != IpProtocol::Tcp {
            return Err(Error::Unrecognized);
        }
        if ip_packet.more_frags() || ip_packet.frag_offset() != 0 {
            return Err(Error::Unsupported);
        }
        if checksum.manual() && !ip_packet.verify_checksum() {
            return Err(Error::WrongChecksum);
        }

        let segment = &bytes[ip_header_len..];
        let tcp_packet = tcp::tcp::new_unchecked(segment);
        let tcp_header_len = usize::from(tcp_packet.header_len());
        if tcp_header_len < tcp::HEADER_LEN {
            return Err(Error::Malformed);
        }
        // A data offset past the end leaves an empty payload.
        let payload = segment.get(tcp_header_len..).unwrap_or(&[]);
        if checksum.manual()
            && !tcp_packet.verify_checksum(ip_packet.src_addr(), ip_packet.dst_addr())
        {
            return Err(Error::WrongChecksum);
        }
        let tcp_repr = TcpRepr::from_header(tcp_packet, payload.len());

        let ip_repr = Ipv4Repr::from_header(ip_packet, segment.len());

        Ok(Datagram {
            ip: ip_repr,
            tcp: tcp_repr,
            payload,
        })
    }

    /// The length of the whole datagram when emitted with minimal headers.
    pub fn buffer_len(&self) -> usize {
        Self::MIN_LEN + self.payload.len()
    }

    /// Write the datagram into `buffer`, filling both checksums.
    ///
    /// Returns the number of bytes written or `Error::Truncated` if the buffer is too small. The
    /// TCP checksum covers the payload and is computed last, the IP header checksum only covers
    /// the IP header.
    pub fn emit(&self, buffer: &mut [u8]) -> Result<usize> {
        let len = self.buffer_len();
        let buffer = buffer.get_mut(..len).ok_or(Error::Truncated)?;
        let (ip_bytes, segment) = buffer.split_at_mut(ipv4::HEADER_LEN);

        let ip_repr = Ipv4Repr { payload_len: segment.len(), ..self.ip };
        let tcp_repr = TcpRepr { payload_len: self.payload.len() as u16, ..self.tcp };

        let tcp_packet = tcp::tcp::new_unchecked_mut(segment);
        tcp_repr.emit(tcp_packet);
        tcp_packet.payload_mut_slice().copy_from_slice(self.payload);
        tcp_packet.fill_checksum(ip_repr.src_addr, ip_repr.dst_addr);

        ip_repr.emit(ipv4::ipv4::new_unchecked_mut(ip_bytes), Checksum::Manual);
        Ok(len)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::{Ipv4Address, TcpFlags, TcpSeqNumber};

    fn sample() -> Datagram<'static> {
        Datagram {
            ip: Ipv4Repr {
                src_addr: Ipv4Address::new(10, 0, 0, 2),
                dst_addr: Ipv4Address::new(10, 0, 0, 1),
                protocol: IpProtocol::Tcp,
                payload_len: 0,
                hop_limit: 64,
                ident: 7,
            },
            tcp: TcpRepr {
                src_port: 80,
                dst_port: 12345,
                seq_number: TcpSeqNumber(5001),
                ack_number: TcpSeqNumber(1001),
                flags: TcpFlags::PSH_ACK,
                window_len: 65535,
                urgent_at: 0,
                payload_len: 0,
            },
            payload: b"hi",
        }
    }

    fn emitted() -> Vec<u8> {
        let mut buffer = vec![0; 64];
        let len = sample().emit(&mut buffer).unwrap();
        buffer.truncate(len);
        buffer
    }

    #[test]
    fn test_emit_layout() {
        let bytes = emitted();
        assert_eq!(bytes.len(), 42);
        assert_eq!(bytes[0], 0x45);
        assert_eq!(NetworkEndian::read_u16(&bytes[2..4]), 42);
        assert_eq!(&bytes[6..8], &[0, 0]);
        assert_eq!(bytes[8], 64);
        assert_eq!(bytes[9], 6);
        assert_eq!(bytes[32], 0x50);
        assert_eq!(bytes[33], 0x18);
        assert_eq!(&bytes[40..], b"hi");
        assert!(ipv4::ipv4::new_unchecked(&bytes[..20]).verify_checksum());
        assert!(tcp::tcp::new_unchecked(&bytes[20..])
            .verify_checksum(Ipv4Address::new(10, 0, 0, 2), Ipv4Address::new(10, 0, 0, 1)));
    }

    #[test]
    fn test_parse_emitted() {
        let bytes = emitted();
        let datagram = Datagram::parse(&bytes, Checksum::Manual).unwrap();
        assert_eq!(datagram.payload, b"hi");
        assert_eq!(datagram.tcp.payload_len, 2);
        assert_eq!(datagram.tcp.seq_number, TcpSeqNumber(5001));
        assert_eq!(datagram.ip.payload_len, 22);
        assert_eq!(datagram.ip, Ipv4Repr { payload_len: 22, ..sample().ip });
    }

    #[test]
    fn test_fragments_rejected() {
        let mut bytes = emitted();
        bytes[6] = 0x20;
        assert_eq!(Datagram::parse(&bytes, Checksum::Ignored), Err(Error::Unsupported));

        let mut bytes = emitted();
        // The "don't fragment" flag alone is fine.
        bytes[6] = 0x40;
        assert!(Datagram::parse(&bytes, Checksum::Ignored).is_ok());
    }

    #[test]
    fn test_short_buffers() {
        assert_eq!(Datagram::parse(&[0x45; 10], Checksum::Ignored), Err(Error::Truncated));
        let bytes = emitted();
        assert_eq!(Datagram::parse(&bytes[..39], Checksum::Ignored), Err(Error::Truncated));
    }

    #[test]
    fn test_header_lengths_beyond_buffer() {
        let mut bytes = emitted();
        // An IP header length of 60 leaves no room for the TCP header.
        bytes[0] = 0x4f;
        assert_eq!(Datagram::parse(&bytes, Checksum::Ignored), Err(Error::Truncated));

        let mut bytes = emitted();
        // A data offset of 60 points past the end.
        bytes[32] = 0xf0;
        let datagram = Datagram::parse(&bytes, Checksum::Ignored).unwrap();
        assert!(datagram.payload.is_empty());
        assert_eq!(datagram.tcp.payload_len, 0);

        let mut bytes = emitted();
        bytes[32] = 0x40;
        assert_eq!(Datagram::parse(&bytes, Checksum::Ignored), Err(Error::Malformed));
    }

    #[test]
    fn test_header_exactly_fills_buffer() {
        let mut bytes = emitted();
        // A data offset of 24 consumes the whole remaining buffer, the payload is empty.
        bytes[32] = 0x60;
        let datagram = Datagram::parse(&bytes, Checksum::Ignored).unwrap();
        assert!(datagram.payload.is_empty());
    }

    #[test]
    fn test_wrong_version_and_protocol() {
        let mut bytes = emitted();
        bytes[0] = 0x65;
        assert_eq!(Datagram::parse(&bytes, Checksum::Ignored), Err(Error::Malformed));

        let mut bytes = emitted();
        bytes[9] = 17;
        assert_eq!(Datagram::parse(&bytes, Checksum::Ignored), Err(Error::Unrecognized));
    }

    #[test]
    fn test_checksum_only_when_asked() {
        let mut bytes = emitted();
        bytes[41] ^= 0xff;
        assert_eq!(Datagram::parse(&bytes, Checksum::Manual), Err(Error::WrongChecksum));
        assert!(Datagram::parse(&bytes, Checksum::Ignored).is_ok());

        let mut bytes = emitted();
        bytes[8] = 1;
        assert_eq!(Datagram::parse(&bytes, Checksum::Manual), Err(Error::WrongChecksum));
    }

    #[test]
    fn test_trailing_bytes_cut() {
        let mut bytes = emitted();
        bytes.extend_from_slice(&[0; 6]);
        let datagram = Datagram::parse(&bytes, Checksum::Manual).unwrap();
        assert_eq!(datagram.payload, b"hi");
    }
}
