//! The TCP layer.
//!
//! Implements the active side of a connection on top of hand-built IPv4 datagrams. There is one
//! connection per [`Socket`], which exclusively owns its transport. Both are plain values, there is
//! no connection table and no global state.
//!
//! [`Socket`]: struct.Socket.html
//!
//! There are a number of simplifying assumptions compared to a full stack:
//! * Segments are never retransmitted. A lost segment stalls the connection until a caller
//!   provided deadline (`Options::linger`) gives up on the peer.
//! * Every segment is taken at face value. There is no check of sequence numbers against the
//!   window, no reassembly and no reset, neither sent nor honoured.
//! * Every segment with payload or FIN is acknowledged right away with a segment of its own.
//!
//! ## Structure
//!
//! The [`Connection`] is the connection control block. It holds sequence numbers and the state,
//! and its state machine turns every received segment into [`Signals`]: which replies to send and
//! whether the payload should be delivered. It does not do any IO on its own.
//!
//! [`Connection`]: struct.Connection.html
//! [`Signals`]: struct.Signals.html
//!
//! The [`Socket`] adds the IO. Its send path builds each segment from the control block, wraps it
//! in an IPv4 datagram and hands it to the transport, and only accounts for it in the control block
//! once the transport accepted it. Its dispatch loop waits for inbound datagrams with a bounded
//! timeout, drops what can not be decoded or belongs to other flows, and feeds the rest to the
//! state machine. Inbound payload goes to a [`Sink`].
//!
//! [`Sink`]: io/trait.Sink.html
//!
//! ## Closing
//!
//! When the peer closes first we answer its FIN with an ACK and immediately send our own FIN, so
//! the connection passes through `CloseWait` straight into `LastAck`. When we close first the
//! connection follows the usual `FinWait1`, `FinWait2`/`Closing` path. The dispatch loop ends in
//! `TimeWait` without waiting out the 2MSL timer.
mod connection;
pub mod io;
mod siphash;
mod socket;


pub use connection::{
    Connection,
    FourTuple,
    Reply,
    Signals,
    State};

pub use io::{RecvInto, Sink};

#[cfg(feature = "std")]
pub use io::WriteSink;

pub use siphash::IsnGenerator;

pub use socket::{
    Dispatch,
    Options,
    Socket,
    BUFFER_LEN,
    HOP_LIMIT};
