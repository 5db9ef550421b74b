//! Initial sequence number generation, as recommended by rfc6528.
//!
//! Uses a keyed cryptographic hash function (SipHash-2-4) over the IPv4 four tuple. Hash function
//! SipHash-2-4 from:
//!
//! > SipHash: a fast short-input PRF, Jean-Philippe Aumasson and Daniel J. Bernstein
use super::connection::FourTuple;
use crate::time::Instant;
use crate::wire::{Ipv4Address, TcpSeqNumber};

const EPHEMERAL_BASE: u16 = 12345;
const EPHEMERAL_RANGE: u16 = 10000;

/// An initial sequence number generator based on SipHash-2-4.
///
/// > ISN = M + SipHash-2-4(secretkey, localip, localport, remoteip, remoteport)
///
/// The secret is not appended to the hashed message. SipHash is keyed by construction and the
/// keyed initial state is what the generator stores. The same keyed hash also derives the
/// ephemeral local port and the first IP identification of a connection, so nothing else in the
/// engine needs a source of randomness.
pub struct IsnGenerator {
    keys: (u64, u64),
}

// Yes, that's the initial values, as ASCII text.
const IV: [&[u8; 8]; 4] = [
    b"somepseu",
    b"dorandom",
    b"lygenera",
    b"tedbytes"];

struct State {
    v0: u64,
    v1: u64,
    v2: u64,
    v3: u64,
}

impl IsnGenerator {
    /// Create a generator by deriving a key from the standard `RandomState`.
    ///
    /// This is done by individually hashing the numbers `0u64` and `1u64` each with the same
    /// hasher created from a new instance of `RandomState`. The two output tags are then used as
    /// the internal key state.
    #[cfg(feature = "std")]
    pub fn from_std_hash() -> Self {
        use std::hash::{Hasher, BuildHasher};
        use std::collections::hash_map::RandomState;

        let hash = RandomState::new().build_hasher();
        let x0 = {
            let mut hash = hash.clone();
            hash.write_u64(0);
            hash.finish()
        };
        let x1 = {
            let mut hash = hash.clone();
            hash.write_u64(1);
            hash.finish()
        };

        IsnGenerator {
            keys: (x0, x1),
        }
    }

    /// Create a generator with some pre-defined secret key.
    ///
    /// Really, create the key with some cryptographic random means or derive them from some other
    /// key with a key derivation function.
    pub fn from_secret_key_bytes(bytes: [u8; 16]) -> Self {
        let [a0, a1, a2, a3, a4, a5, a6, a7, b0, b1, b2, b3, b4, b5, b6, b7] = bytes;
        let a = u64::from_le_bytes([a0, a1, a2, a3, a4, a5, a6, a7]);
        let b = u64::from_le_bytes([b0, b1, b2, b3, b4, b5, b6, b7]);
        IsnGenerator { keys: (a, b), }
    }

    /// Create a generator with a pre-defined key.
    #[cfg(test)]
    pub(crate) fn from_key(a: u64, b: u64) -> Self {
        IsnGenerator { keys: (a, b), }
    }

    /// Get the initial sequence number for a connection.
    ///
    /// The value advances by one every 4ms or changes when the underlying secret key is updated.
    pub fn get_isn(&self, connection: FourTuple, time: Instant) -> TcpSeqNumber {
        let num = self.hash_tuple(connection);
        let clock = time.total_millis().rem_euclid(1 << 30) / 4;
        TcpSeqNumber(num as i32) + clock as usize
    }

    /// Choose a local port for a connection to `remote`.
    ///
    /// The port is in `12345..22345` and stable for the same key and remote endpoint.
    pub fn ephemeral_port(&self, local: Ipv4Address, remote: Ipv4Address, remote_port: u16)
        -> u16
    {
        let num = self.hash_tuple(FourTuple {
            local,
            local_port: 0,
            remote,
            remote_port,
        });
        EPHEMERAL_BASE + (num % u64::from(EPHEMERAL_RANGE)) as u16
    }

    /// The first IP identification value for the datagrams of a connection.
    pub fn first_ident(&self, connection: FourTuple) -> u16 {
        (self.hash_tuple(connection) >> 32) as u16
    }

    fn hash_tuple(&self, connection: FourTuple) -> u64 {
        let mut state = State::init(self.keys.0, self.keys.1);
        let m = u64::from(connection.local.to_network_integer())
            | u64::from(connection.remote.to_network_integer()) << 32;
        let p = u64::from(connection.local_port)
            | u64::from(connection.remote_port) << 16
            // Message length = 12
            | 12_u64 << 56;
        state.absorb(m);
        state.absorb(p);
        state.finalize()
    }
}

impl State {
    const SIP_C: usize = 2;
    const SIP_D: usize = 4;

    fn init(k0: u64, k1: u64) -> Self {
        State {
            v0: u64::from_be_bytes(*IV[0]) ^ k0,
            v1: u64::from_be_bytes(*IV[1]) ^ k1,
            v2: u64::from_be_bytes(*IV[2]) ^ k0,
            v3: u64::from_be_bytes(*IV[3]) ^ k1,
        }
    }

    fn round(&mut self) {
        self.v0 = self.v0.wrapping_add(self.v1);
        self.v1 = self.v1.rotate_left(13);
        self.v1 ^= self.v0;
        self.v0 = self.v0.rotate_left(32);
        self.v2 = self.v2.wrapping_add(self.v3);
        self.v3 = self.v3.rotate_left(16);
        self.v3 ^= self.v2;
        self.v0 = self.v0.wrapping_add(self.v3);
        self.v3 = self.v3.rotate_left(21);
        self.v3 ^= self.v0;
        self.v2 = self.v2.wrapping_add(self.v1);
        self.v1 = self.v1.rotate_left(17);
        self.v1 ^= self.v2;
        self.v2 = self.v2.rotate_left(32);
    }

    /// Process a single portion of the message.
    ///
    /// Note that all users need to manually add absorbing the length in the last block. This is
    /// slightly easier to read since it arranges the input to only have 8-btye blocks in all cases
    /// which separates the length block completely and makes it a constant.
    fn absorb(&mut self, m: u64) {
        self.v3 ^= m;
        (0..Self::SIP_C).for_each(|_| self.round());
        self.v0 ^= m;
    }

    /// Do the finalization rounds.
    fn finalize(mut self) -> u64 {
        self.v2 ^= 0xff;
        (0..Self::SIP_D).for_each(|_| self.round());
        self.v0 ^ self.v1 ^ self.v2 ^ self.v3
    }
}

#[cfg(test)]
mod tests {
    use core::fmt;
    use super::*;

    struct DebugState<'a>(&'a State);

    impl fmt::Debug for DebugState<'_> {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "{:x} ", self.0.v0)?;
            write!(f, "{:x} ", self.0.v1)?;
            write!(f, "{:x} ", self.0.v2)?;
            write!(f, "{:x} ", self.0.v3)
        }
    }

    impl super::State {
        fn debug(&self) -> DebugState {
            DebugState(self)
        }
    }

    /// See the paper, Appendix A
    #[test]
    fn manual_test_vectors() {
        let k0 = u64::from_le_bytes(0x0001020304050607_u64.to_be_bytes());
        let k1 = u64::from_le_bytes(0x08090a0b0c0d0e0f_u64.to_be_bytes());

        let mut state = State::init(k0, k1);
        println!("{:?}", state.debug());
        let m0 = u64::from_le_bytes(0x0001020304050607_u64.to_be_bytes());
        state.absorb(m0);
        println!("{:?}", state.debug());
        let m1 = u64::from_le_bytes(0x08090a0b0c0d0e0f_u64.to_be_bytes());
        state.absorb(m1);
        println!("{:?}", state.debug());

        assert_eq!(state.finalize(), 0xa129ca6149be45e5);
    }

    fn tuple() -> FourTuple {
        FourTuple {
            local: Ipv4Address::new(10, 0, 0, 1),
            local_port: 12345,
            remote: Ipv4Address::new(10, 0, 0, 2),
            remote_port: 80,
        }
    }

    #[test]
    fn isn_is_keyed() {
        let time = Instant::from_millis(0);
        let a = IsnGenerator::from_key(1, 2);
        let b = IsnGenerator::from_key(1, 2);
        let c = IsnGenerator::from_key(2, 1);
        assert_eq!(a.get_isn(tuple(), time), b.get_isn(tuple(), time));
        assert_ne!(a.get_isn(tuple(), time), c.get_isn(tuple(), time));

        let mut other = tuple();
        other.remote_port = 81;
        assert_ne!(a.get_isn(tuple(), time), a.get_isn(other, time));
    }

    #[test]
    fn isn_advances_with_clock() {
        let isn = IsnGenerator::from_key(7, 9);
        let early = isn.get_isn(tuple(), Instant::from_millis(0));
        let later = isn.get_isn(tuple(), Instant::from_millis(400));
        assert_eq!(later - early, 100);
    }

    #[test]
    fn ephemeral_port_range() {
        let isn = IsnGenerator::from_secret_key_bytes([0x5a; 16]);
        for port in 1..200 {
            let local = isn.ephemeral_port(
                Ipv4Address::LOCALHOST,
                Ipv4Address::new(10, 0, 0, 2),
                port);
            assert!((12345..22345).contains(&local), "{}", local);
        }
    }
}
