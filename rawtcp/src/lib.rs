//! A minimal TCP engine operating directly on IPv4 datagrams.
//!
//! ## Table of contents
//!
//! This is also a recommended reading order but feel free to skip ahead, each chapter tries to be
//! somewhat self-contained.
//!
//! 1. [Design](#design-and-relevant-core-concepts)
//! 2. [The wire module](wire/index.html)
//!    1. [Checksums](wire/ip/checksum/index.html)
//!    1. [Ip V4](wire/ipv4/index.html)
//!    1. [Tcp](wire/tcp/index.html)
//! 3. [The tcp layer](layer/tcp/index.html)
//!    1. [The connection control block](layer/tcp/struct.Connection.html)
//!    1. [The socket](layer/tcp/struct.Socket.html)
//! 4. [Transports](nic/index.html)
//!
//! ## Design and relevant core concepts
//!
//! The kernel TCP stack is bypassed entirely. Every segment is assembled by hand into a complete
//! IPv4 datagram (header, TCP header, payload) and handed to a [`Transport`], usually a raw socket
//! with `IP_HDRINCL`. Inbound datagrams are read from the same transport, filtered down to the one
//! connection that owns the flow and fed into its state machine.
//!
//! [`Transport`]: nic/trait.Transport.html
//!
//! There is no global state. A [`Socket`] owns exactly one connection control block, its transport
//! and the sink that receives inbound payload. Driving more flows means creating more sockets and
//! demultiplexing datagrams between them, which is left to the caller.
//!
//! [`Socket`]: layer/tcp/struct.Socket.html
//!
//! Nothing within the protocol core dynamically allocates. Datagrams are built in a fixed buffer
//! owned by the socket, very much like the receive buffer.
#![warn(missing_docs)]
#![warn(unreachable_pub)]

// tests should be able to use `std`
#![cfg_attr(all(
    not(feature = "std"),
    not(test)),
no_std)]

#[macro_use] mod macros;
pub mod nic;
pub mod layer;
pub mod time;
pub mod wire;
