//! A software transport whose datagrams come from an external source.
//!
//! Nothing leaves the process. Sent datagrams are recorded for inspection and inbound datagrams
//! are queued by the owner, or produced by an emulated peer that answers every sent datagram.
#![cfg(feature = "std")]
use std::collections::VecDeque;
use std::vec::Vec;

use crate::time::{Duration, Instant};
use crate::wire::Ipv4Address;

use super::{Errno, Transport};

/// An emulated remote end, answering each sent datagram with any number of datagrams.
pub type Peer = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>>>;

/// An in-memory transport.
///
/// Time only advances when a receive finds no data, by exactly the requested timeout, or when
/// set explicitly. This makes every run over this transport deterministic.
#[derive(Default)]
pub struct External {
    /// Datagrams waiting to be received, with their source.
    inbound: VecDeque<(Vec<u8>, Ipv4Address)>,

    /// All datagrams that were sent, in order.
    sent: Vec<Vec<u8>>,

    /// The simulated clock.
    now: Instant,

    /// Fail all sends with this error.
    send_error: Option<Errno>,

    /// Fail the next receive with this error.
    recv_error: Option<Errno>,

    /// Answers sent datagrams, if installed.
    peer: Option<Peer>,
}

impl External {
    /// A new transport, with nothing to receive.
    pub fn new() -> Self {
        External::default()
    }

    /// Queue a datagram to be received.
    pub fn push_inbound(&mut self, datagram: &[u8], from: Ipv4Address) {
        self.inbound.push_back((datagram.to_vec(), from));
    }

    /// Remaining number of datagrams to receive.
    pub fn to_recv(&self) -> usize {
        self.inbound.len()
    }

    /// All datagrams sent so far.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Take the record of sent datagrams, clearing it.
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        core::mem::replace(&mut self.sent, Vec::new())
    }

    /// Let all sends fail with an error, or succeed again with `None`.
    pub fn set_send_error(&mut self, err: Option<Errno>) {
        self.send_error = err;
    }

    /// Let the next receive fail with an error.
    pub fn set_recv_error(&mut self, err: Errno) {
        self.recv_error = Some(err);
    }

    /// Update the simulated clock.
    pub fn set_current_time(&mut self, instant: Instant) {
        self.now = instant;
    }

    /// Install an emulated peer.
    ///
    /// Its answers are queued as inbound datagrams, the source address read from their headers.
    pub fn set_peer<F>(&mut self, peer: F)
        where F: FnMut(&[u8]) -> Vec<Vec<u8>> + 'static,
    {
        self.peer = Some(Box::new(peer));
    }
}

impl Transport for External {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, Errno> {
        if let Some(err) = self.send_error {
            return Err(err);
        }

        self.sent.push(datagram.to_vec());
        if let Some(peer) = self.peer.as_mut() {
            for answer in peer(datagram) {
                let from = answer.get(12..16)
                    .map(Ipv4Address::from_bytes)
                    .unwrap_or(Ipv4Address::UNSPECIFIED);
                self.inbound.push_back((answer, from));
            }
        }

        Ok(datagram.len())
    }

    fn recv_timeout(&mut self, buffer: &mut [u8], timeout: Duration)
        -> Result<Option<(usize, Ipv4Address)>, Errno>
    {
        if let Some(err) = self.recv_error.take() {
            return Err(err);
        }

        match self.inbound.pop_front() {
            Some((datagram, from)) => {
                let len = datagram.len().min(buffer.len());
                buffer[..len].copy_from_slice(&datagram[..len]);
                Ok(Some((len, from)))
            },
            None => {
                self.now += timeout;
                Ok(None)
            },
        }
    }

    fn now(&self) -> Instant {
        self.now
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn records_and_answers() {
        let mut nic = External::new();
        nic.set_peer(|sent| {
            let mut answer = vec![0; 20];
            answer[12..16].copy_from_slice(&[10, 0, 0, 2]);
            answer.push(sent.len() as u8);
            vec![answer]
        });

        assert_eq!(nic.send(&[1, 2, 3]), Ok(3));
        assert_eq!(nic.sent(), &[vec![1, 2, 3]][..]);
        assert_eq!(nic.to_recv(), 1);

        let mut buffer = [0; 64];
        let (len, from) = nic.recv_timeout(&mut buffer, Duration::from_secs(1))
            .unwrap()
            .unwrap();
        assert_eq!(len, 21);
        assert_eq!(buffer[20], 3);
        assert_eq!(from, Ipv4Address::new(10, 0, 0, 2));
    }

    #[test]
    fn empty_receive_advances_clock() {
        let mut nic = External::new();
        let mut buffer = [0; 8];
        assert_eq!(nic.recv_timeout(&mut buffer, Duration::from_millis(1500)), Ok(None));
        assert_eq!(nic.now(), Instant::from_millis(1500));
    }

    #[test]
    fn injected_errors() {
        let mut nic = External::new();
        nic.set_send_error(Some(Errno(1)));
        assert_eq!(nic.send(&[0]), Err(Errno(1)));
        assert!(nic.sent().is_empty());

        nic.set_recv_error(Errno(4));
        let mut buffer = [0; 8];
        assert_eq!(nic.recv_timeout(&mut buffer, Duration::from_millis(1)), Err(Errno(4)));
        assert_eq!(nic.recv_timeout(&mut buffer, Duration::from_millis(1)), Ok(None));
    }

    #[test]
    fn truncates_to_buffer() {
        let mut nic = External::new();
        nic.push_inbound(&[7; 10], Ipv4Address::LOCALHOST);
        let mut buffer = [0; 4];
        assert_eq!(nic.recv_timeout(&mut buffer, Duration::from_millis(1)),
                   Ok(Some((4, Ipv4Address::LOCALHOST))));
    }
}
