//! The process logic of the protocol layer.
//!
//! The `wire` module knows how a segment looks on the wire. This module knows what a segment
//! means for a connection: it keeps the connection control block, decides on transitions and
//! replies, and drives a transport until the connection is done.
//!
//! Errors of this layer are split by who can act on them. Datagrams that can not be decoded or
//! belong to another flow are dropped where they are found and never end an operation. Calls that
//! do not fit the connection state and failures of the transport are returned to the caller.
use core::fmt;

use crate::nic::Errno;

pub mod tcp;

/// The result type of connection operations.
pub type Result<T> = core::result::Result<T, Error>;

/// The error type of connection operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// The underlying channel could not be created or configured.
    TransportUnavailable(Errno),

    /// The transport refused to send a datagram.
    ///
    /// The connection keeps its last valid state, the segment was not accounted for.
    SendFailed(Errno),

    /// The transport failed while waiting for or reading a datagram.
    ReceiveFailed(Errno),

    /// The operation requires an established connection.
    NotConnected,

    /// A datagram could not be decoded.
    ///
    /// Only returned when feeding a single datagram by hand. The dispatch loop drops such
    /// datagrams and continues.
    MalformedSegment(crate::wire::Error),

    /// The peer did not complete the exchange before the configured deadline.
    PeerUnreachable,
}

/// Can convert from a wire error.
///
/// This indicates some layer tried to operate on a datagram but failed.
impl From<crate::wire::Error> for Error {
    fn from(err: crate::wire::Error) -> Self {
        Error::MalformedSegment(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::TransportUnavailable(errno) => write!(f, "transport unavailable: {}", errno),
            Error::SendFailed(errno) => write!(f, "sending failed: {}", errno),
            Error::ReceiveFailed(errno) => write!(f, "receiving failed: {}", errno),
            Error::NotConnected => write!(f, "connection not established"),
            Error::MalformedSegment(err) => write!(f, "malformed segment: {}", err),
            Error::PeerUnreachable => write!(f, "peer unreachable"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedSegment(err) => Some(err),
            _ => None,
        }
    }
}
