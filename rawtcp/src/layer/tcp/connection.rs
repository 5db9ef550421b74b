use core::fmt;

use crate::time::Instant;
use crate::wire::{Datagram, Ipv4Address, TcpFlags, TcpRepr, TcpSeqNumber};

/// The identity of a flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FourTuple {
    /// Our address.
    pub local: Ipv4Address,
    /// Our port.
    pub local_port: u16,
    /// The address of the peer.
    pub remote: Ipv4Address,
    /// The port of the peer.
    pub remote_port: u16,
}

/// The connection control block.
///
/// Holds every piece of per-flow state. It is a plain value, owned by whoever drives the flow,
/// and only modified by the state machine ([`arrives`]) and the send path ([`sent`]).
///
/// [`arrives`]: #method.arrives
/// [`sent`]: #method.sent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    /// The flow this connection belongs to.
    pub tuple: FourTuple,

    /// The current state of the state machine.
    pub state: State,

    /// The sequence number of the next segment we send.
    ///
    /// In RFC793 this is referred to as `SND.NXT`.
    pub send_seq: TcpSeqNumber,

    /// The acknowledgement number we put into the next segment.
    pub send_ack: TcpSeqNumber,

    /// The next sequence number expected from the peer.
    ///
    /// In RFC793 this is referred to as `RCV.NXT`. It is always equal to `send_ack` since every
    /// segment is acknowledged immediately.
    pub recv_seq: TcpSeqNumber,

    /// The latest acknowledgement number received from the peer.
    pub recv_ack: TcpSeqNumber,

    /// The window last advertised by the peer.
    pub send_window: u16,

    /// The window we advertise.
    pub recv_window: u16,

    /// The initial sequence number.
    ///
    /// This is read-only and only kept for debugging. In RFC793 this is referred to as `ISS`.
    pub initial_seq: TcpSeqNumber,

    /// When a segment was last handed to the transport.
    ///
    /// Together with `retransmit_count` this is where a retransmission policy would hook in. None
    /// is implemented, a lost segment stalls the connection.
    pub last_sent: Option<Instant>,

    /// The number of retransmissions of the oldest unacknowledged segment.
    ///
    /// Always zero without a retransmission policy.
    pub retransmit_count: u32,
}

/// State enum of the statemachine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// No connection, or it has been torn down.
    Closed,

    /// A listening connection.
    ///
    /// Passive open is not supported, a connection never enters this state on its own.
    Listen,

    /// An open connection request.
    SynSent,

    /// Connection request we intend to answer, waiting on ack.
    ///
    /// Only reachable through a passive open.
    SynReceived,

    /// An open connection.
    Established,

    /// Closed our side of the connection.
    FinWait1,

    /// Closing connection nicely, initiated by us and acknowledged.
    FinWait2,

    /// Closed both sides but we don't know the other knows.
    Closing,

    /// Both sides recognized connection as closed.
    TimeWait,

    /// Other side closed its connection.
    CloseWait,

    /// Connection closed after other side closed its already.
    LastAck,
}

/// A segment the state machine wants to send in response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reply {
    /// The flags of the segment, it never carries payload.
    pub flags: TcpFlags,

    /// The state to enter once the segment was sent.
    pub enter: Option<State>,
}

/// Output signals of the model.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Signals {
    /// Segments to send, in order.
    ///
    /// A failed send must abort the rest, the state of the connection then stays where the last
    /// successful reply put it.
    pub replies: [Option<Reply>; 2],

    /// If the payload of the segment should be handed to the application.
    pub deliver: bool,
}

impl FourTuple {
    /// Check if a received datagram belongs to this flow.
    pub fn matches(&self, datagram: &Datagram) -> bool {
        datagram.ip.src_addr == self.remote
            && datagram.ip.dst_addr == self.local
            && datagram.tcp.src_port == self.remote_port
            && datagram.tcp.dst_port == self.local_port
    }
}

impl fmt::Display for FourTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{} -> {}:{}", self.local, self.local_port, self.remote, self.remote_port)
    }
}

impl Connection {
    /// A closed connection for a flow, with a chosen initial sequence number.
    pub fn new(tuple: FourTuple, initial_seq: TcpSeqNumber, recv_window: u16) -> Self {
        Connection {
            tuple,
            state: State::Closed,
            send_seq: initial_seq,
            send_ack: TcpSeqNumber(0),
            recv_seq: TcpSeqNumber(0),
            recv_ack: TcpSeqNumber(0),
            send_window: 0,
            recv_window,
            initial_seq,
            last_sent: None,
            retransmit_count: 0,
        }
    }

    /// Change the state, logging the transition.
    pub fn enter(&mut self, state: State) {
        if self.state != state {
            net_debug!("tcp {}: {} -> {}", self.tuple, self.state, state);
        }
        self.state = state;
    }

    /// The header of the next segment we send.
    pub fn segment(&self, flags: TcpFlags, payload_len: usize) -> TcpRepr {
        TcpRepr {
            src_port: self.tuple.local_port,
            dst_port: self.tuple.remote_port,
            seq_number: self.send_seq,
            ack_number: self.send_ack,
            flags,
            window_len: self.recv_window,
            urgent_at: 0,
            payload_len: payload_len as u16,
        }
    }

    /// Account for a segment that was handed to the transport.
    ///
    /// Advances `send_seq` by the payload length plus one for each of SYN and FIN.
    pub fn sent(&mut self, flags: TcpFlags, payload_len: usize, time: Instant) {
        self.send_seq += payload_len + flags.sequence_len();
        self.last_sent = Some(time);
    }

    /// Process a segment of this flow.
    ///
    /// Segments that have no meaning in the current state are ignored, no reset is generated.
    /// Sequence and acknowledgement numbers are taken at face value, there is no check against
    /// the window and no reassembly.
    pub fn arrives(&mut self, segment: &TcpRepr) -> Signals {
        match self.state {
            State::Closed
            | State::Listen
            | State::SynReceived
            | State::CloseWait
            | State::TimeWait => Signals::default(),
            State::SynSent => self.arrives_syn_sent(segment),
            State::Established => self.arrives_established(segment),
            State::FinWait1 => self.arrives_fin_wait_1(segment),
            State::FinWait2 => self.arrives_fin_wait_2(segment),
            State::Closing => self.arrives_closing(segment),
            State::LastAck => self.arrives_last_ack(segment),
        }
    }

    fn arrives_syn_sent(&mut self, segment: &TcpRepr) -> Signals {
        if !(segment.flags.syn() && segment.flags.ack()) {
            return Signals::default();
        }

        self.recv_seq = segment.seq_number + 1;
        self.send_ack = self.recv_seq;
        self.recv_ack = segment.ack_number;
        self.send_window = segment.window_len;
        self.enter(State::Established);

        Signals::reply(TcpFlags::ACK, None)
    }

    fn arrives_established(&mut self, segment: &TcpRepr) -> Signals {
        let mut signals = self.receive_data(segment);

        if segment.flags.fin() {
            self.enter(State::CloseWait);
            // Our own FIN follows right away, there is no application to wait for.
            signals.replies = [
                Some(Reply { flags: TcpFlags::ACK, enter: None }),
                Some(Reply { flags: TcpFlags::FIN_ACK, enter: Some(State::LastAck) }),
            ];
        }

        signals
    }

    fn arrives_fin_wait_1(&mut self, segment: &TcpRepr) -> Signals {
        let mut signals = self.receive_data(segment);
        let fin_acked = self.acks_our_fin(segment);

        if segment.flags.fin() {
            self.enter(if fin_acked { State::TimeWait } else { State::Closing });
            signals.replies = [Some(Reply { flags: TcpFlags::ACK, enter: None }), None];
        } else if fin_acked {
            self.enter(State::FinWait2);
        }

        signals
    }

    fn arrives_fin_wait_2(&mut self, segment: &TcpRepr) -> Signals {
        let mut signals = self.receive_data(segment);

        if segment.flags.fin() {
            self.enter(State::TimeWait);
            signals.replies = [Some(Reply { flags: TcpFlags::ACK, enter: None }), None];
        }

        signals
    }

    fn arrives_closing(&mut self, segment: &TcpRepr) -> Signals {
        self.update_peer(segment);
        if self.acks_our_fin(segment) {
            self.enter(State::TimeWait);
        }
        Signals::default()
    }

    fn arrives_last_ack(&mut self, segment: &TcpRepr) -> Signals {
        self.update_peer(segment);
        if segment.flags.ack() {
            self.enter(State::Closed);
        }
        Signals::default()
    }

    /// Common handling of payload and FIN in states where the peer may still send.
    ///
    /// Advances the receive sequence past payload and FIN and asks for one ACK covering both.
    fn receive_data(&mut self, segment: &TcpRepr) -> Signals {
        self.update_peer(segment);
        let mut signals = Signals::default();
        let len = usize::from(segment.payload_len);

        if len > 0 {
            signals.deliver = true;
        }

        if len > 0 || segment.flags.fin() {
            let fin = if segment.flags.fin() { 1 } else { 0 };
            self.recv_seq = segment.seq_number + len + fin;
            self.send_ack = self.recv_seq;
            signals.replies[0] = Some(Reply { flags: TcpFlags::ACK, enter: None });
        }

        signals
    }

    fn update_peer(&mut self, segment: &TcpRepr) {
        if segment.flags.ack() {
            self.recv_ack = segment.ack_number;
        }
        self.send_window = segment.window_len;
    }

    fn acks_our_fin(&self, segment: &TcpRepr) -> bool {
        segment.flags.ack() && segment.ack_number == self.send_seq
    }
}

impl Signals {
    fn reply(flags: TcpFlags, enter: Option<State>) -> Self {
        Signals {
            replies: [Some(Reply { flags, enter }), None],
            deliver: false,
        }
    }

    /// Iterate over the requested replies.
    pub fn replies(&self) -> impl Iterator<Item=Reply> + '_ {
        self.replies.iter().filter_map(|reply| *reply)
    }
}

impl State {
    /// All states, for exhaustive inspection.
    pub const ALL: [State; 11] = [
        State::Closed,
        State::Listen,
        State::SynSent,
        State::SynReceived,
        State::Established,
        State::FinWait1,
        State::FinWait2,
        State::Closing,
        State::TimeWait,
        State::CloseWait,
        State::LastAck,
    ];

    /// If a dispatch loop should stop in this state.
    pub fn is_terminal(self) -> bool {
        match self {
            State::Closed | State::TimeWait => true,
            _ => false,
        }
    }

    /// If both sides have exchanged initial sequence numbers.
    pub fn is_synchronized(self) -> bool {
        match self {
            State::Closed | State::Listen | State::SynSent | State::SynReceived => false,
            _ => true,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        State::Closed
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            State::Closed => "CLOSED",
            State::Listen => "LISTEN",
            State::SynSent => "SYN-SENT",
            State::SynReceived => "SYN-RECEIVED",
            State::Established => "ESTABLISHED",
            State::FinWait1 => "FIN-WAIT-1",
            State::FinWait2 => "FIN-WAIT-2",
            State::Closing => "CLOSING",
            State::TimeWait => "TIME-WAIT",
            State::CloseWait => "CLOSE-WAIT",
            State::LastAck => "LAST-ACK",
        };
        f.write_str(name)
    }
}
