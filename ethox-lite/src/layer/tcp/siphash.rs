//! Initial sequence number generation, as recommended by rfc6528.
//!
//! Uses a keyed cryptographic hash function (SipHash-2-4) instead of appending the secret key to
//! the four tuple for hashing. Hash function SipHash-2-4 from:
//!
//! > SipHash: a fast short-input PRF, Jean-Philippe Aumasson and Daniel J. Bernstein
use core::fmt;

use crate::layer::socket::EPHEMERAL_PORTS;
use crate::time::Instant;
use crate::wire::{Ipv6Address, TcpSeqNumber};

/// The addresses and ports identifying a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourTuple {
    /// Our address.
    pub local: Ipv6Address,
    /// The address of the peer.
    pub remote: Ipv6Address,
    /// Our port.
    pub local_port: u16,
    /// The port of the peer.
    pub remote_port: u16,
}

/// An initial sequence number generator based on SipHash-2-4.
///
/// Implements most RFC6528 but with a particular choice of keyed hash function (instead of MD5).
/// Also, instead of hashing the secret as the last parameter the hash function already provides a
/// setup for keyed use that can be precomputed.
///
/// > ISN = M + SipHash-2-4(secretkey, localip, localport, remoteip, remoteport)
///
/// The same key also derives other values a peer should not be able to predict, the first
/// ephemeral port of a client and the identifier of a ping client. This stack has no other source
/// of randomness.
#[derive(Clone)]
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
    /// key with a key derivation function. On a device without an entropy source a serial number
    /// mixed with a value stored across reboots is better than a constant.
    pub fn from_secret_key_bytes(bytes: [u8; 16]) -> Self {
        let (mut a, mut b) = ([0; 8], [0; 8]);
        a.copy_from_slice(&bytes[..8]);
        b.copy_from_slice(&bytes[8..]);
        IsnGenerator {
            keys: (u64::from_le_bytes(a), u64::from_le_bytes(b)),
        }
    }

    /// Create a generator with a pre-defined key.
    #[cfg(test)]
    pub(crate) fn from_key(a: u64, b: u64) -> Self {
        IsnGenerator { keys: (a, b), }
    }

    /// Get the initial sequence number for a connection.
    ///
    /// The value advances by one every 4 microseconds and is different for each connection tuple
    /// and key.
    pub fn get_isn(&self, connection: FourTuple, time: Instant) -> TcpSeqNumber {
        let mut state = State::init(self.keys.0, self.keys.1);

        let (m0, m1) = Self::ipv6_to_messages(connection.local);
        let (m2, m3) = Self::ipv6_to_messages(connection.remote);
        let p = u64::from(connection.local_port)
            | u64::from(connection.remote_port) << 16
            // Message length = 20
            | 20_u64 << 56;
        state.absorb(m0);
        state.absorb(m1);
        state.absorb(m2);
        state.absorb(m3);
        state.absorb(p);
        let num = state.finalize();

        // M, the 4 microsecond timer.
        let m = time.total_millis().wrapping_mul(250) as u32;
        TcpSeqNumber::from_u32(num as u32) + m
    }

    /// Pick the first local port for connections to a remote.
    ///
    /// The port is in the ephemeral range.
    pub fn get_port(&self, remote: Ipv6Address, remote_port: u16) -> u16 {
        let mut state = State::init(self.keys.0, self.keys.1);

        let (m0, m1) = Self::ipv6_to_messages(remote);
        let p = u64::from(remote_port)
            // Message length = 18
            | 18_u64 << 56;
        state.absorb(m0);
        state.absorb(m1);
        state.absorb(p);

        let start = *EPHEMERAL_PORTS.start();
        let count = u64::from(*EPHEMERAL_PORTS.end() - start) + 1;
        start + (state.finalize() % count) as u16
    }

    /// Pick an echo identifier for pinging a remote.
    pub fn get_ident(&self, remote: Ipv6Address) -> u16 {
        let mut state = State::init(self.keys.0, self.keys.1);

        let (m0, m1) = Self::ipv6_to_messages(remote);
        state.absorb(m0);
        state.absorb(m1);
        // Message length = 16
        state.absorb(16_u64 << 56);
        state.finalize() as u16
    }

    fn ipv6_to_messages(addr: Ipv6Address) -> (u64, u64) {
        let Ipv6Address([a, b, c, d, e, f, g, h, i, j, k, l, m, n, o, p]) = addr;
        let m0 = u64::from_be_bytes([a, b, c, d, e, f, g, h]);
        let m1 = u64::from_be_bytes([i, j, k, l, m, n, o, p]);
        (m0, m1)
    }
}

impl fmt::Debug for IsnGenerator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Never print the key.
        f.write_str("IsnGenerator { .. }")
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
    /// slightly easier to read since it arranges the input to only have 8-byte blocks in all cases
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
