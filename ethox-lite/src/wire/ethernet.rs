use core::{fmt, str::FromStr};
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};

enum_with_unknown! {
    /// The EtherType of a frame.
    ///
    /// Only IPv6 is handled, all other frames are dropped without looking further.
    pub enum EtherType(u16) {
        /// Internet protocol version 6.
        Ipv6 = 0x86DD,
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EtherType::Ipv6 => f.write_str("IPv6"),
            EtherType::Unknown(id) => write!(f, "0x{:04x}", id),
        }
    }
}

/// A six-octet hardware address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 6]);

impl Address {
    /// Every station receives frames to this address.
    pub const BROADCAST: Address = Address([0xff; 6]);

    /// Read an address from the first six bytes of `data`.
    ///
    /// # Panics
    /// When `data` is shorter than six bytes.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(&data[..6]);
        Address(bytes)
    }

    /// The octets in transmission order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Group addresses, including broadcast, have the lowest bit of the first octet set.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// An individual station address, and not the all-zero placeholder.
    pub fn is_unicast(&self) -> bool {
        !self.is_multicast() && *self != Address([0; 6])
    }

    /// Whether the address was assigned locally instead of by the vendor.
    pub fn is_local(&self) -> bool {
        self.0[0] & 0x02 != 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

/// A string was not six colon separated hexadecimal octets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseAddressError {
    /// One of the components was not a hexadecimal octet.
    Octet,
    /// There were more or fewer than six components.
    Count,
}

impl fmt::Display for ParseAddressError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseAddressError::Octet => f.write_str("invalid octet in hardware address"),
            ParseAddressError::Count => f.write_str("hardware address needs six octets"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseAddressError { }

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(src: &str) -> core::result::Result<Self, ParseAddressError> {
        let mut octets = [0; 6];
        let mut parts = src.split(':');

        for octet in octets.iter_mut() {
            let part = parts.next().ok_or(ParseAddressError::Count)?;
            if part.is_empty() || part.len() > 2 {
                return Err(ParseAddressError::Octet);
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| ParseAddressError::Octet)?;
        }

        match parts.next() {
            Some(_) => Err(ParseAddressError::Count),
            None => Ok(Address(octets)),
        }
    }
}

byte_wrapper! {
    /// An Ethernet II frame, without preamble and frame check sequence.
    #[derive(Debug, PartialEq, Eq)]
    pub struct ethernet([u8]);
}

mod field {
    use crate::wire::field::*;

    pub(crate) const DST: Field = 0..6;
    pub(crate) const SRC: Field = 6..12;
    pub(crate) const TYPE: Field = 12..14;
    pub(crate) const PAYLOAD: Rest = 14..;
}

/// The length of an untagged Ethernet II header.
pub const HEADER_LEN: usize = field::PAYLOAD.start;

impl ethernet {
    /// View a byte slice as a frame.
    pub fn new_unchecked(data: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(data)
    }

    /// View a mutable byte slice as a frame.
    pub fn new_unchecked_mut(data: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(data)
    }

    /// View a byte slice as a frame, if it holds at least the header.
    pub fn new_checked(data: &[u8]) -> Result<&Self> {
        let frame = Self::new_unchecked(data);
        frame.check_len()?;
        Ok(frame)
    }

    /// Fails with `Error::Truncated` when the header does not fit.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    pub fn dst_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::DST])
    }

    pub fn src_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::SRC])
    }

    /// The EtherType, 802.1Q tags are not recognized.
    pub fn ethertype(&self) -> EtherType {
        NetworkEndian::read_u16(&self.0[field::TYPE]).into()
    }

    pub fn set_dst_addr(&mut self, addr: Address) {
        self.0[field::DST].copy_from_slice(addr.as_bytes())
    }

    pub fn set_src_addr(&mut self, addr: Address) {
        self.0[field::SRC].copy_from_slice(addr.as_bytes())
    }

    pub fn set_ethertype(&mut self, ethertype: EtherType) {
        NetworkEndian::write_u16(&mut self.0[field::TYPE], ethertype.into())
    }

    pub fn payload_slice(&self) -> &[u8] {
        &self.0[field::PAYLOAD]
    }

    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0[field::PAYLOAD]
    }
}
