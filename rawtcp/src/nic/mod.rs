//! Encapsulates the channel that moves complete IPv4 datagrams.
//!
//! The engine never touches the operating system directly. Everything it sends and receives goes
//! through a [`Transport`], which may be a raw socket (see [`sys`]) or a software emulation such
//! as [`External`] for tests and simulation.
//!
//! [`Transport`]: trait.Transport.html
//! [`sys`]: sys/index.html
//! [`External`]: external/struct.External.html
use core::fmt;

use crate::time::{Duration, Instant};
use crate::wire::Ipv4Address;

pub mod external;

#[cfg(all(feature = "std", target_os = "linux"))]
#[path="sys/mod.rs"]
mod sys_internal;

#[cfg(all(feature = "std", target_os = "linux"))]
pub use self::sys_internal::exports as sys;

#[cfg(feature = "std")]
pub use self::external::External;

/// An errno value.
///
/// This is used as the error representation of raw libc calls and of transports in general. It
/// can be converted into a `std::io::Error` when the `std` feature is enabled, where it will
/// consequently have much more extensive error information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Errno(pub i32);

/// A channel for complete IPv4 datagrams.
///
/// The transport is owned exclusively by one socket for the socket's whole lifetime. It is
/// released exactly once, when dropped.
pub trait Transport {
    /// Transmit one complete datagram, IP header included.
    ///
    /// Returns the number of bytes handed to the channel.
    fn send(&mut self, datagram: &[u8]) -> Result<usize, Errno>;

    /// Wait at most `timeout` for one inbound datagram and copy it into `buffer`.
    ///
    /// Returns `Ok(None)` when the timeout elapsed without data. Otherwise returns the length of
    /// the datagram, truncated to the buffer, and the address it originated from.
    fn recv_timeout(&mut self, buffer: &mut [u8], timeout: Duration)
        -> Result<Option<(usize, Ipv4Address)>, Errno>;

    /// The current time, as seen by the transport.
    fn now(&self) -> Instant;
}

impl<T: Transport + ?Sized> Transport for &'_ mut T {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, Errno> {
        (**self).send(datagram)
    }

    fn recv_timeout(&mut self, buffer: &mut [u8], timeout: Duration)
        -> Result<Option<(usize, Ipv4Address)>, Errno>
    {
        (**self).recv_timeout(buffer, timeout)
    }

    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "os error {}", self.0)
    }
}

#[cfg(feature = "std")]
impl From<Errno> for std::io::Error {
    fn from(err: Errno) -> std::io::Error {
        std::io::Error::from_raw_os_error(err.0)
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Errno {
    /// Errors without an os code map to `EIO`.
    fn from(err: std::io::Error) -> Errno {
        Errno(err.raw_os_error().unwrap_or(5))
    }
}
