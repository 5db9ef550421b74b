//! Internet protocol numbers and checksums.
use core::fmt;

enum_with_unknown! {
    /// IP datagram encapsulated protocol.
    pub enum Protocol(u8) {
        Icmp = 0x01,
        Tcp  = 0x06,
        Udp  = 0x11,
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::Icmp => write!(f, "ICMP"),
            Protocol::Tcp  => write!(f, "TCP"),
            Protocol::Udp  => write!(f, "UDP"),
            Protocol::Unknown(id) => write!(f, "0x{:02x}", id),
        }
    }
}

/// The Internet checksum (RFC 1071).
///
/// A 16-bit one's complement sum over big-endian words. It reliably detects any single bit error
/// in the summed region. It is weak against others: reordered 16-bit words, and errors that cancel
/// out in one's complement arithmetic (e.g. a `0x0000` word turning into `0xffff`), go unnoticed.
/// This is a property of the algorithm, not of this implementation.
///
/// Partial sums computed with [`data`] can be freely combined with [`combine`] as long as every
/// part except the last has an even length.
///
/// [`data`]: fn.data.html
/// [`combine`]: fn.combine.html
pub mod checksum {
    use core::convert::TryFrom;

    use byteorder::{ByteOrder, NetworkEndian};

    use super::Protocol;
    use crate::wire::ipv4::Address;

    /// Offset of the checksum field within a TCP header.
    const TCP_CHECKSUM_AT: usize = 16;

    /// Fold the carries of a 32-bit partial sum back into its low 16 bits.
    fn fold(word: u32) -> u32 {
        (word >> 16) + (word & 0xffff)
    }

    fn propagate_carries(word: u32) -> u16 {
        let sum = fold(word);
        ((sum >> 16) as u16) + (sum as u16)
    }

    /// Compute an RFC 1071 compliant checksum (without the final complement).
    ///
    /// Carries are folded after every chunk so that the sum never overflows, whatever the length
    /// of the data.
    pub fn data(mut data: &[u8]) -> u16 {
        let mut accum: u32 = 0;

        // For each 32-byte chunk...
        const CHUNK_SIZE: usize = 32;
        while data.len() >= CHUNK_SIZE {
            let mut d = &data[..CHUNK_SIZE];
            // ... take by 2 bytes and sum them.
            while d.len() >= 2 {
                accum += u32::from(NetworkEndian::read_u16(d));
                d = &d[2..];
            }

            accum = fold(accum);
            data = &data[CHUNK_SIZE..];
        }

        // Sum the rest that does not fit the last 32-byte chunk,
        // taking by 2 bytes.
        while data.len() >= 2 {
            accum += u32::from(NetworkEndian::read_u16(data));
            data = &data[2..];
        }

        // Add the last remaining odd byte, if any.
        if let Some(&value) = data.first() {
            accum += u32::from(value) << 8;
        }

        propagate_carries(accum)
    }

    /// Combine several RFC 1071 compliant checksums.
    pub fn combine(checksums: &[u16]) -> u16 {
        let mut accum: u32 = 0;
        for &word in checksums {
            accum = fold(accum + u32::from(word));
        }
        propagate_carries(accum)
    }

    /// Compute an IPv4 pseudo header checksum.
    ///
    /// The pseudo header is never transmitted. It consists of the source and destination address,
    /// a zero octet, the protocol number and the length of the upper layer segment. The length is
    /// summed as a 32-bit value, which equals the 16-bit field for every length a datagram can
    /// carry and never truncates larger ones.
    pub fn pseudo_header(src_addr: Address, dst_addr: Address, protocol: Protocol, length: u32)
        -> u16
    {
        let mut proto_len = [0u8; 6];
        proto_len[1] = protocol.into();
        NetworkEndian::write_u32(&mut proto_len[2..6], length);

        combine(&[
            data(src_addr.as_bytes()),
            data(dst_addr.as_bytes()),
            data(&proto_len[..])
        ])
    }

    /// The complemented Internet checksum of a byte sequence.
    ///
    /// An odd trailing byte is summed as the high byte of a word whose low byte is zero. The
    /// checksum of an empty sequence is `0xffff`.
    pub fn internet_checksum(bytes: &[u8]) -> u16 {
        !data(bytes)
    }

    /// The checksum of a TCP segment, including the IPv4 pseudo header.
    ///
    /// The checksum field contained in `header` is treated as zero, whatever its current value.
    /// The header must be of even length which all valid TCP headers are.
    pub fn tcp_checksum(header: &[u8], src_addr: Address, dst_addr: Address, payload: &[u8])
        -> u16
    {
        let length = segment_len(header.len() + payload.len());
        let (before, after) = match header.get(TCP_CHECKSUM_AT + 2..) {
            Some(after) => (&header[..TCP_CHECKSUM_AT], after),
            None => (header, &[][..]),
        };

        !combine(&[
            pseudo_header(src_addr, dst_addr, Protocol::Tcp, length),
            data(before),
            data(after),
            data(payload),
        ])
    }

    /// The segment length as summed into the pseudo header, saturating.
    pub(crate) fn segment_len(len: usize) -> u32 {
        u32::try_from(len).unwrap_or(u32::MAX)
    }

    #[cfg(test)]
    mod test {
        use byteorder::{ByteOrder, NetworkEndian};
        use super::*;

        // A simple xorshift, enough to get varied buffers.
        fn noise(seed: &mut u32) -> u8 {
            *seed ^= *seed << 13;
            *seed ^= *seed >> 17;
            *seed ^= *seed << 5;
            *seed as u8
        }

        #[test]
        fn test_empty() {
            assert_eq!(internet_checksum(&[]), 0xffff);
        }

        #[test]
        fn test_odd_length_pads_low_byte() {
            assert_eq!(data(&[0x12]), 0x1200);
            assert_eq!(data(&[0x12, 0x34, 0x56]), 0x1234 + 0x5600);
        }

        #[test]
        fn test_rfc1071_example() {
            // The worked example of RFC 1071, section 3.
            let bytes = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
            assert_eq!(data(&bytes), 0xddf2);
            assert_eq!(internet_checksum(&bytes), !0xddf2);
        }

        #[test]
        fn test_verification_rule() {
            let mut seed = 0x2545_f491;
            for len in (0..200).step_by(2) {
                let mut bytes: Vec<u8> = (0..len).map(|_| noise(&mut seed)).collect();
                let checksum = internet_checksum(&bytes);
                bytes.extend_from_slice(&checksum.to_be_bytes());
                assert_eq!(data(&bytes), 0xffff, "length {}", len);
            }
        }

        #[test]
        fn test_single_bit_flip_detected() {
            let mut seed = 0xdead_beef;
            let bytes: Vec<u8> = (0..64).map(|_| noise(&mut seed)).collect();
            let reference = internet_checksum(&bytes);
            for bit in 0..bytes.len()*8 {
                let mut corrupt = bytes.clone();
                corrupt[bit / 8] ^= 1 << (bit % 8);
                assert_ne!(internet_checksum(&corrupt), reference, "bit {}", bit);
            }
        }

        #[test]
        fn test_long_data_does_not_overflow() {
            // Every word is 0xffff, the one's complement sum stays 0xffff at any length.
            let ones = vec![0xff; 200_000];
            assert_eq!(data(&ones), 0xffff);
            assert_eq!(internet_checksum(&ones), 0);

            let mut seed = 0x0bad_cafe;
            let mut bytes: Vec<u8> = (0..262_144).map(|_| noise(&mut seed)).collect();
            let checksum = internet_checksum(&bytes);
            bytes.extend_from_slice(&checksum.to_be_bytes());
            assert_eq!(data(&bytes), 0xffff);

            // Splitting at an even offset gives the same sum as a single pass.
            let (head, tail) = bytes.split_at(131_072);
            assert_eq!(combine(&[data(head), data(tail)]), data(&bytes));
        }

        #[test]
        fn test_combine_many() {
            let words = vec![0xffff; 100_000];
            assert_eq!(combine(&words), 0xffff);
            let words = vec![0x0001; 70_000];
            // 70000 = 0x1_1170, folded to 0x1171.
            assert_eq!(combine(&words), 0x1171);
        }

        #[test]
        fn test_pseudo_header_length() {
            let src = Address::new(10, 0, 0, 1);
            let dst = Address::new(10, 0, 0, 2);
            // The wide length agrees with the 16-bit field for every representable length.
            let field = combine(&[data(&[10, 0, 0, 1, 10, 0, 0, 2, 0, 6, 0x01, 0x2c])]);
            assert_eq!(pseudo_header(src, dst, Protocol::Tcp, 300), field);
            // A segment longer than the field still sums its full length.
            assert_ne!(
                pseudo_header(src, dst, Protocol::Tcp, 0x1_0000 + 300),
                pseudo_header(src, dst, Protocol::Tcp, 300));
            let header = [0u8; 20];
            let payload = vec![0x5a; 70_000];
            let _ = tcp_checksum(&header, src, dst, &payload);
        }

        #[test]
        fn test_tcp_ignores_checksum_field() {
            let src = Address::new(10, 0, 0, 1);
            let dst = Address::new(10, 0, 0, 2);
            let mut header = [0u8; 20];
            header[12] = 0x50;
            header[13] = 0x02;
            let payload = b"hi";

            let clean = tcp_checksum(&header, src, dst, payload);
            header[16] = 0xab;
            header[17] = 0xcd;
            assert_eq!(tcp_checksum(&header, src, dst, payload), clean);
            assert_eq!(tcp_checksum(&header, src, dst, payload), clean);
        }

        #[test]
        fn test_tcp_payload_sensitivity() {
            let src = Address::new(192, 168, 1, 1);
            let dst = Address::new(192, 168, 1, 2);
            let header = [0x30, 0x39, 0x00, 0x50, 0, 0, 0x13, 0x88, 0, 0, 0, 0,
                          0x50, 0x18, 0xff, 0xff, 0, 0, 0, 0];
            let mut seed = 0x1234_5678;
            let payload: Vec<u8> = (0..37).map(|_| noise(&mut seed)).collect();
            let reference = tcp_checksum(&header, src, dst, &payload);
            for at in 0..payload.len() {
                let mut changed = payload.clone();
                changed[at] = changed[at].wrapping_add(1 + noise(&mut seed) % 254);
                assert_ne!(tcp_checksum(&header, src, dst, &changed), reference, "byte {}", at);
            }
        }

        #[test]
        fn test_tcp_verifies_to_ones() {
            let src = Address::new(10, 0, 0, 1);
            let dst = Address::new(10, 0, 0, 2);
            let mut segment = [0u8; 23];
            segment[12] = 0x50;
            segment[13] = 0x18;
            segment[20..].copy_from_slice(b"abc");
            let checksum = tcp_checksum(&segment[..20], src, dst, &segment[20..]);
            NetworkEndian::write_u16(&mut segment[16..18], checksum);
            let verify = combine(&[
                pseudo_header(src, dst, Protocol::Tcp, segment.len() as u32),
                data(&segment),
            ]);
            assert_eq!(verify, 0xffff);
        }
    }
}
