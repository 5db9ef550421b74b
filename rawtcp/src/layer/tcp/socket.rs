use crate::layer::{Error, Result};
use crate::nic::Transport;
use crate::time::{Duration, Expiration, Instant};
use crate::wire::{self, Checksum, Datagram, IpProtocol, Ipv4Address, Ipv4Repr, TcpFlags};

use super::connection::{Connection, FourTuple, Signals, State};
use super::io::Sink;
use super::siphash::IsnGenerator;

/// The size of the datagram buffers, in each direction.
pub const BUFFER_LEN: usize = 4096;

/// The time to live of every sent datagram.
pub const HOP_LIMIT: u8 = 64;

/// Configuration of a socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Options {
    /// The address we send from and accept datagrams for.
    pub local_addr: Ipv4Address,

    /// A fixed local port.
    ///
    /// When `None` an ephemeral port in `12345..22345` is derived from the flow.
    pub local_port: Option<u16>,

    /// The window we advertise.
    pub recv_window: u16,

    /// Largest payload of one segment.
    ///
    /// Capped such that a datagram always fits into `BUFFER_LEN` bytes.
    pub max_payload: usize,

    /// The longest single wait for an inbound datagram.
    pub poll_timeout: Duration,

    /// Whether inbound checksums are verified.
    ///
    /// Datagrams with a wrong checksum are dropped like any undecodable one.
    pub checksum: Checksum,

    /// The longest a blocking loop waits for the peer.
    ///
    /// `None` waits forever, as there is no retransmission that could give up on its own.
    pub linger: Option<Duration>,

    /// A fixed secret for sequence numbers, ports and identification.
    ///
    /// When `None` a random key is chosen, if the `std` feature permits.
    pub secret: Option<[u8; 16]>,
}

/// The outcome of feeding one datagram to a socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing arrived within the poll timeout.
    Idle,

    /// The datagram belonged to the connection and was processed.
    Processed,

    /// The datagram was for another flow or protocol and was discarded.
    Foreign,

    /// The datagram could not be decoded and was discarded.
    Dropped(wire::Error),
}

/// A single connection, driven over an exclusively owned transport.
///
/// The socket owns the connection control block, the transport and the sink for inbound payload.
/// All operations block on the transport at most for `Options::poll_timeout` per wait. The
/// transport is released exactly once, when the socket is dropped.
pub struct Socket<T, S> {
    control: Control<T, S>,

    /// Inbound datagrams are read into this buffer.
    recv_buffer: [u8; BUFFER_LEN],
}

/// Everything except the receive buffer, so that a received datagram can borrow the latter.
struct Control<T, S> {
    connection: Connection,
    transport: T,
    sink: S,
    options: Options,
    next_ident: u16,
    send_buffer: [u8; BUFFER_LEN],
}

impl Default for Options {
    fn default() -> Self {
        Options {
            local_addr: Ipv4Address::LOCALHOST,
            local_port: None,
            recv_window: 65535,
            max_payload: 1460,
            poll_timeout: Duration::from_secs(1),
            checksum: Checksum::Ignored,
            linger: None,
            secret: None,
        }
    }
}

impl Options {
    /// The largest payload actually put into one segment.
    pub fn segment_payload(&self) -> usize {
        self.max_payload.min(BUFFER_LEN - Datagram::MIN_LEN).max(1)
    }

    fn isn_generator(&self) -> IsnGenerator {
        match self.secret {
            Some(key) => IsnGenerator::from_secret_key_bytes(key),
            #[cfg(feature = "std")]
            None => IsnGenerator::from_std_hash(),
            #[cfg(not(feature = "std"))]
            None => IsnGenerator::from_secret_key_bytes([0; 16]),
        }
    }
}

#[cfg(all(feature = "std", target_os = "linux"))]
impl<S: Sink> Socket<crate::nic::sys::RawSocket, S> {
    /// Open a raw socket and start connecting over it.
    ///
    /// See [`connect`] for the handshake.
    ///
    /// [`connect`]: #method.connect
    pub fn open(sink: S, options: Options, remote: Ipv4Address, remote_port: u16)
        -> Result<Self>
    {
        let transport = crate::nic::sys::RawSocket::new()
            .map_err(Error::TransportUnavailable)?;
        Socket::connect(transport, sink, options, remote, remote_port)
    }
}

impl<T: Transport, S: Sink> Socket<T, S> {
    /// Start an active open towards `remote:remote_port`.
    ///
    /// Chooses the local port and the initial sequence number, sends the SYN and returns in
    /// `SynSent`. Drive the handshake with [`establish`], [`poll`] or [`run`].
    ///
    /// [`establish`]: #method.establish
    /// [`poll`]: #method.poll
    /// [`run`]: #method.run
    pub fn connect(
        transport: T,
        sink: S,
        options: Options,
        remote: Ipv4Address,
        remote_port: u16,
    ) -> Result<Self> {
        let isn = options.isn_generator();
        let local_port = options.local_port.unwrap_or_else(|| {
            isn.ephemeral_port(options.local_addr, remote, remote_port)
        });
        let tuple = FourTuple {
            local: options.local_addr,
            local_port,
            remote,
            remote_port,
        };

        let initial_seq = isn.get_isn(tuple, transport.now());
        let mut connection = Connection::new(tuple, initial_seq, options.recv_window);
        connection.enter(State::SynSent);
        net_debug!("tcp {}: connecting, isn={}", tuple, initial_seq);

        let mut socket = Socket {
            control: Control {
                connection,
                transport,
                sink,
                options,
                next_ident: isn.first_ident(tuple),
                send_buffer: [0; BUFFER_LEN],
            },
            recv_buffer: [0; BUFFER_LEN],
        };

        socket.control.transmit(TcpFlags::SYN, &[])?;
        Ok(socket)
    }

    /// Send data on an established connection.
    ///
    /// Data larger than one segment is split into consecutive PSH+ACK segments. Returns the number
    /// of payload bytes sent. An empty buffer sends nothing.
    pub fn send(&mut self, data: &[u8]) -> Result<usize> {
        if self.control.connection.state != State::Established {
            net_debug!("tcp {}: send in {}", self.control.connection.tuple,
                       self.control.connection.state);
            return Err(Error::NotConnected);
        }

        let mut sent = 0;
        for chunk in data.chunks(self.control.options.segment_payload()) {
            self.control.transmit(TcpFlags::PSH_ACK, chunk)?;
            sent += chunk.len();
        }

        Ok(sent)
    }

    /// Send our FIN without waiting for the peer.
    ///
    /// Only has an effect while established or after the peer closed its side. Does nothing in
    /// all other states.
    pub fn shutdown(&mut self) -> Result<()> {
        let next = match self.control.connection.state {
            State::Established => State::FinWait1,
            State::CloseWait => State::LastAck,
            _ => return Ok(()),
        };

        self.control.transmit(TcpFlags::FIN_ACK, &[])?;
        self.control.connection.enter(next);
        Ok(())
    }

    /// Close the connection, blocking until the closing handshake is complete.
    ///
    /// If established, sends our FIN and runs the dispatch loop until a terminal state. In any
    /// other state this returns immediately. Dropping the socket afterwards releases the
    /// transport.
    pub fn close(&mut self) -> Result<()> {
        if self.control.connection.state != State::Established {
            return Ok(());
        }

        self.shutdown()?;
        self.run()
    }

    /// Drive the connection until it reaches `Closed` or `TimeWait`.
    ///
    /// Returns `PeerUnreachable` when the configured linger time elapses first.
    pub fn run(&mut self) -> Result<()> {
        let deadline = self.deadline();
        while !self.control.connection.state.is_terminal() {
            self.poll_until(deadline)?;
        }
        Ok(())
    }

    /// Drive the handshake until the connection leaves `SynSent`.
    ///
    /// Returns `NotConnected` if the connection ends up in any state other than established.
    pub fn establish(&mut self) -> Result<()> {
        let deadline = self.deadline();
        while self.control.connection.state == State::SynSent {
            self.poll_until(deadline)?;
        }

        match self.control.connection.state {
            State::Established => Ok(()),
            _ => Err(Error::NotConnected),
        }
    }

    /// Wait once for an inbound datagram and process it.
    ///
    /// Datagrams that can not be decoded are dropped, failures of the transport are returned.
    pub fn poll(&mut self) -> Result<Dispatch> {
        let timeout = self.control.options.poll_timeout;
        let received = self.control.transport
            .recv_timeout(&mut self.recv_buffer, timeout)
            .map_err(Error::ReceiveFailed)?;

        let len = match received {
            None => return Ok(Dispatch::Idle),
            Some((len, _)) => len,
        };

        match self.control.receive(&self.recv_buffer[..len]) {
            Err(Error::MalformedSegment(err)) => {
                net_debug!("tcp {}: dropped datagram: {}", self.control.connection.tuple, err);
                Ok(Dispatch::Dropped(err))
            },
            other => other,
        }
    }

    /// Feed one raw datagram, as read from the transport.
    ///
    /// Returns `MalformedSegment` if it can not be decoded. Datagrams of other flows are
    /// reported as `Foreign` and leave the connection untouched.
    pub fn receive(&mut self, datagram: &[u8]) -> Result<Dispatch> {
        self.control.receive(datagram)
    }

    /// The connection control block.
    pub fn connection(&self) -> &Connection {
        &self.control.connection
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.control.connection.state
    }

    /// The configuration in use.
    pub fn options(&self) -> &Options {
        &self.control.options
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &T {
        &self.control.transport
    }

    /// Get a mutable reference to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.control.transport
    }

    /// Get a reference to the sink.
    pub fn sink(&self) -> &S {
        &self.control.sink
    }

    /// Get a mutable reference to the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.control.sink
    }

    /// Unwrap the transport and the sink.
    pub fn into_parts(self) -> (T, S) {
        (self.control.transport, self.control.sink)
    }

    fn deadline(&self) -> Expiration {
        let now = self.control.transport.now();
        self.control.options.linger.map(|linger| now + linger).into()
    }

    fn poll_until(&mut self, deadline: Expiration) -> Result<Dispatch> {
        if deadline.is_reached(self.control.transport.now()) {
            net_debug!("tcp {}: peer unreachable in {}", self.control.connection.tuple,
                       self.control.connection.state);
            return Err(Error::PeerUnreachable);
        }
        self.poll()
    }
}

impl<T: Transport, S: Sink> Control<T, S> {
    fn receive(&mut self, bytes: &[u8]) -> Result<Dispatch> {
        let datagram = match Datagram::parse(bytes, self.options.checksum) {
            Ok(datagram) => datagram,
            Err(wire::Error::Unrecognized) => return Ok(Dispatch::Foreign),
            Err(err) => return Err(err.into()),
        };

        if !self.connection.tuple.matches(&datagram) {
            return Ok(Dispatch::Foreign);
        }

        net_trace!("tcp {}: recv {}", self.connection.tuple, datagram.tcp);
        let signals = self.connection.arrives(&datagram.tcp);
        if signals.deliver {
            self.sink.on_data_received(datagram.payload);
        }

        self.answer(signals)?;
        Ok(Dispatch::Processed)
    }

    fn answer(&mut self, signals: Signals) -> Result<()> {
        for reply in signals.replies() {
            self.transmit(reply.flags, &[])?;
            if let Some(state) = reply.enter {
                self.connection.enter(state);
            }
        }
        Ok(())
    }

    /// Build, checksum and send one segment, then account for it.
    fn transmit(&mut self, flags: TcpFlags, payload: &[u8]) -> Result<usize> {
        let tcp = self.connection.segment(flags, payload.len());
        let datagram = Datagram {
            ip: Ipv4Repr {
                src_addr: self.connection.tuple.local,
                dst_addr: self.connection.tuple.remote,
                protocol: IpProtocol::Tcp,
                payload_len: tcp.buffer_len(),
                hop_limit: HOP_LIMIT,
                ident: self.next_ident,
            },
            tcp,
            payload,
        };

        let len = datagram.emit(&mut self.send_buffer)?;
        self.transport
            .send(&self.send_buffer[..len])
            .map_err(Error::SendFailed)?;

        net_trace!("tcp {}: sent {}", self.connection.tuple, tcp);
        self.next_ident = self.next_ident.wrapping_add(1);
        let now: Instant = self.transport.now();
        self.connection.sent(flags, payload.len(), now);
        Ok(len)
    }
}
