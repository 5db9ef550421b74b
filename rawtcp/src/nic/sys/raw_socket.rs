// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
use core::mem;
use std::os::unix::io::{RawFd, AsRawFd};

use libc;
use super::{now, wait, Errno, FdResult, LibcResult, IoLenResult};

use crate::nic::Transport;
use crate::time::{Duration, Instant};
use crate::wire::Ipv4Address;

/// A raw IPv4 socket for TCP, with the IP header supplied by the caller.
///
/// Opened with `AF_INET`, `SOCK_RAW` and `IPPROTO_TCP`, and with `IP_HDRINCL` set so that the
/// kernel transmits the datagrams exactly as built. The kernel still delivers a copy of every
/// inbound TCP datagram of the host, filtering is left to the caller. Needs `CAP_NET_RAW`.
///
/// The descriptor is closed exactly once, when the socket is dropped.
#[derive(Debug)]
pub struct RawSocket {
    lower: libc::c_int,
}

impl AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.lower
    }
}

impl RawSocket {
    /// Open the socket and enable `IP_HDRINCL`.
    pub fn new() -> Result<RawSocket, Errno> {
        let lower = unsafe {
            libc::socket(
                libc::AF_INET,
                libc::SOCK_RAW,
                libc::IPPROTO_TCP)
        };

        FdResult(lower).errno()?;
        // Owned from here on, also closed on the error path below.
        let socket = RawSocket { lower };

        let one: libc::c_int = 1;
        let res = unsafe {
            libc::setsockopt(
                socket.lower,
                libc::IPPROTO_IP,
                libc::IP_HDRINCL,
                &one as *const libc::c_int as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t)
        };

        FdResult(res).errno()?;
        Ok(socket)
    }

    /// Receive a single datagram into the buffer, blocking.
    pub fn recv_from(&mut self, buffer: &mut [u8]) -> Result<(usize, Ipv4Address), Errno> {
        let mut src = unsafe { mem::zeroed::<libc::sockaddr_in>() };
        let mut src_len = mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
        let len = unsafe {
            libc::recvfrom(
                self.lower,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
                0,
                &mut src as *mut libc::sockaddr_in as *mut libc::sockaddr,
                &mut src_len)
        };
        IoLenResult(len).errno()?;
        // `s_addr` is kept in network byte order.
        let from = Ipv4Address::from_network_integer(u32::from_be(src.sin_addr.s_addr));
        Ok((len as usize, from))
    }

    /// Send a single datagram to the destination in its IP header.
    pub fn send_to(&mut self, buffer: &[u8]) -> Result<usize, Errno> {
        let dst = match buffer.get(16..20) {
            Some(bytes) => Ipv4Address::from_bytes(bytes),
            None => return Err(Errno(libc::EINVAL)),
        };

        let mut dest = unsafe { mem::zeroed::<libc::sockaddr_in>() };
        dest.sin_family = libc::AF_INET as libc::sa_family_t;
        // Ignored for raw sockets.
        dest.sin_port = 0;
        dest.sin_addr.s_addr = dst.to_network_integer().to_be();

        let len = unsafe {
            libc::sendto(
                self.lower,
                buffer.as_ptr() as *const libc::c_void,
                buffer.len(),
                0,
                &dest as *const libc::sockaddr_in as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t)
        };
        IoLenResult(len).errno()?;
        Ok(len as usize)
    }
}

impl Drop for RawSocket {
    fn drop(&mut self) {
        unsafe { libc::close(self.lower); }
    }
}

impl Transport for RawSocket {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, Errno> {
        self.send_to(datagram)
    }

    fn recv_timeout(&mut self, buffer: &mut [u8], timeout: Duration)
        -> Result<Option<(usize, Ipv4Address)>, Errno>
    {
        if !wait(self.lower, timeout)? {
            return Ok(None);
        }

        match self.recv_from(buffer) {
            Ok(received) => Ok(Some(received)),
            Err(Errno(libc::EINTR)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn now(&self) -> Instant {
        now().unwrap_or_else(|_| Instant::now())
    }
}
