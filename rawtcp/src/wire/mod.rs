/*! Low-level packet access and construction.

# An overview over packet representations

The `wire` module deals with the packet *representation*. It provides two levels of
functionality.

 * First, it provides functions to extract fields from sequences of octets, and to insert fields
   into sequences of octets. This happens in the lowercase structures [`ipv4_packet`] and
   [`tcp_packet`]. All multi-octet fields are in network byte order and every bit field is read
   and written with explicit shifts and masks, so the layout never depends on how the compiler
   would lay out a struct.
 * Second, it provides a compact, high-level representation of header data that can be created
   from parsing and emitted into a sequence of octets. This happens through the `Repr` family of
   structs, [`Ipv4Repr`] and [`TcpRepr`].

[`ipv4_packet`]: struct.ipv4_packet.html
[`tcp_packet`]: struct.tcp_packet.html
[`Ipv4Repr`]: struct.Ipv4Repr.html
[`TcpRepr`]: struct.TcpRepr.html

The `packet` family of data structures guarantees that, if the `packet::check_len()` method
returned `Ok(())`, then no field accessor or setter method will panic; however, the guarantee only
hold while specific fields are mutated, which are listed in the documentation for the specific
packet.

In the `Repr` family of data structures, the `Repr::parse()` method never panics and the
`Repr::emit()` method never panics as long as the underlying buffer is exactly `Repr::buffer_len()`
octets long if provided.

Complete datagrams as they are read from a raw socket are handled by [`Datagram`], which checks
all bounds before a single field is interpreted.

[`Datagram`]: struct.Datagram.html

# Examples

To emit an IP packet header into an octet buffer, and then parse it back:

```rust
use rawtcp::wire::*;
let repr = Ipv4Repr {
    src_addr:    Ipv4Address::new(10, 0, 0, 1),
    dst_addr:    Ipv4Address::new(10, 0, 0, 2),
    protocol:    IpProtocol::Tcp,
    payload_len: 10,
    hop_limit:   64,
    ident:       0x1234,
};
let mut buffer = vec![0; repr.buffer_len() + repr.payload_len];
{ // emission
    let packet = ipv4_packet::new_unchecked_mut(&mut buffer);
    repr.emit(packet, Checksum::Manual);
}
{ // parsing
    let packet = ipv4_packet::new_checked(&buffer)
        .expect("truncated packet");
    let parsed = Ipv4Repr::parse(packet, Checksum::Manual)
        .expect("malformed packet");
    assert_eq!(repr, parsed);
}
```
*/
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//
// Applies to files in this folder unless otherwise noted. These are:
// * `error.rs`
// * `ip.rs`
// * `ipv4.rs`
// * `tcp.rs`
mod error;
pub mod ip;
pub mod ipv4;
pub mod tcp;
mod datagram;

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
}

pub use self::error::{Error, Result};

pub use self::ip::Protocol as IpProtocol;
pub use self::ip::checksum;

pub use self::ipv4::{
    Address as Ipv4Address,
    ipv4 as ipv4_packet,
    Repr as Ipv4Repr};

pub use self::tcp::{
    Flags as TcpFlags,
    SeqNumber as TcpSeqNumber,
    tcp as tcp_packet,
    Repr as TcpRepr};

pub use self::datagram::Datagram;

/// Describes whether checksums should be computed and verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// Fill checksums on emission and verify them on parsing.
    Manual,

    /// Never inspect the checksum.
    ///
    /// This assumes that some layer below has already performed the necessary checks. Emitting
    /// with this setting zeroes the checksum field instead of leaving stale data behind.
    Ignored,
}

impl Checksum {
    /// Query whether checksums should be handled manually.
    pub fn manual(self) -> bool {
        self == Checksum::Manual
    }
}
