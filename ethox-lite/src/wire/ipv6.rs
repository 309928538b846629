use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};
use super::EthernetAddress;

/// The length of the fixed IPv6 header.
pub const HEADER_LEN: usize = field::DST_ADDR.end;

enum_with_unknown! {
    /// The next header field.
    ///
    /// Extension headers are not parsed, a packet starting with one is of an unknown protocol to
    /// the transports and dropped.
    pub enum Protocol(u8) {
        /// Transmission control protocol.
        Tcp    = 0x06,
        /// User datagram protocol.
        Udp    = 0x11,
        /// Internet control message protocol for IPv6.
        Icmpv6 = 0x3a,
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("TCP"),
            Protocol::Udp => f.write_str("UDP"),
            Protocol::Icmpv6 => f.write_str("ICMPv6"),
            Protocol::Unknown(id) => write!(f, "0x{:02x}", id),
        }
    }
}

/// A sixteen-octet IPv6 address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 16]);

/// The lower 64 bits of a unicast address.
///
/// The same identifier forms both the link-local and the autoconfigured global address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct InterfaceId(pub [u8; 8]);

/// An IPv6 network prefix, all host bits are zero.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Subnet {
    network: Address,
    prefix_len: u8,
}

impl Address {
    /// `::`, the source of a host that has no address yet.
    pub const UNSPECIFIED: Address = Address([0; 16]);

    /// `ff02::1`, every node on the link.
    pub const LINK_LOCAL_ALL_NODES: Address =
        Address([0xff, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01]);

    /// `ff02::2`, every router on the link.
    pub const LINK_LOCAL_ALL_ROUTERS: Address =
        Address([0xff, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x02]);

    /// An address from its eight 16-bit groups, as written in text.
    #[allow(clippy::too_many_arguments)]
    pub fn new(a0: u16, a1: u16, a2: u16, a3: u16,
               a4: u16, a5: u16, a6: u16, a7: u16) -> Address {
        let mut addr = Address::UNSPECIFIED;
        NetworkEndian::write_u16_into(&[a0, a1, a2, a3, a4, a5, a6, a7], &mut addr.0);
        addr
    }

    /// Read an address from the first sixteen bytes of `data`.
    ///
    /// # Panics
    /// When `data` is shorter than sixteen bytes.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 16];
        bytes.copy_from_slice(&data[..16]);
        Address(bytes)
    }

    /// The `fe80::/64` address of an interface.
    pub const fn from_link_local_id(id: InterfaceId) -> Address {
        let InterfaceId([a, b, c, d, e, f, g, h]) = id;
        Address([0xfe, 0x80, 0, 0, 0, 0, 0, 0, a, b, c, d, e, f, g, h])
    }

    /// Combine an advertised prefix with the interface identifier.
    ///
    /// Stateless autoconfiguration is only defined for /64 prefixes, any other length gives
    /// `None`.
    pub fn from_global_unicast_id(net: Subnet, id: InterfaceId) -> Option<Address> {
        if net.prefix_len != 64 {
            return None;
        }

        let mut addr = net.network;
        addr.0[8..].copy_from_slice(&id.0);
        Some(addr)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Neither multicast nor unspecified.
    pub fn is_unicast(&self) -> bool {
        !(self.is_multicast() || self.is_unspecified())
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] == 0xff
    }

    pub fn is_unspecified(&self) -> bool {
        *self == Address::UNSPECIFIED
    }

    /// Within `fe80::/64`.
    pub fn is_link_local(&self) -> bool {
        self.0[..8] == [0xfe, 0x80, 0, 0, 0, 0, 0, 0]
    }

    /// Clear all bits after the first `prefix_len`.
    ///
    /// # Panics
    /// When `prefix_len` is greater than 128.
    pub fn mask(&self, prefix_len: u8) -> Address {
        assert!(prefix_len <= 128);
        let full = usize::from(prefix_len / 8);
        let partial = prefix_len % 8;

        let mut masked = Address::UNSPECIFIED;
        masked.0[..full].copy_from_slice(&self.0[..full]);
        if partial != 0 {
            masked.0[full] = self.0[full] & (0xff << (8 - partial));
        }
        masked
    }

    /// The `ff02::1:ffXX:XXXX` group that neighbor solicitations for this address are sent to.
    pub fn solicited_node_multicast(&self) -> Address {
        let mut group = Address([0xff, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0xff, 0, 0, 0]);
        group.0[13..].copy_from_slice(&self.0[13..]);
        group
    }

    /// The hardware group a multicast address maps to, `33:33` and its low 32 bits.
    ///
    /// `None` for addresses that are not multicast.
    pub fn multicast_ethernet(&self) -> Option<EthernetAddress> {
        if !self.is_multicast() {
            return None;
        }

        let [.., a, b, c, d] = self.0;
        Some(EthernetAddress([0x33, 0x33, a, b, c, d]))
    }
}

#[cfg(feature = "std")]
impl From<std::net::Ipv6Addr> for Address {
    fn from(addr: std::net::Ipv6Addr) -> Address {
        Address(addr.octets())
    }
}

#[cfg(feature = "std")]
impl From<Address> for std::net::Ipv6Addr {
    fn from(Address(octets): Address) -> std::net::Ipv6Addr {
        octets.into()
    }
}

/// Text form with the longest run of zero groups compressed.
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn groups(f: &mut fmt::Formatter, words: &[u16]) -> fmt::Result {
            for (idx, word) in words.iter().enumerate() {
                if idx > 0 {
                    f.write_str(":")?;
                }
                write!(f, "{:x}", word)?;
            }
            Ok(())
        }

        let mut words = [0u16; 8];
        NetworkEndian::read_u16_into(&self.0, &mut words);

        // (start, len) of the longest zero run, the first one on ties.
        let mut longest = (0, 0);
        let mut current = (0, 0);
        for (idx, &word) in words.iter().enumerate() {
            if word != 0 {
                current = (idx + 1, 0);
                continue;
            }
            current.1 += 1;
            if current.1 > longest.1 {
                longest = current;
            }
        }

        let (start, len) = longest;
        if len < 2 {
            return groups(f, &words);
        }

        groups(f, &words[..start])?;
        f.write_str("::")?;
        groups(f, &words[start + len..])
    }
}

impl InterfaceId {
    /// The modified EUI-64 identifier of a MAC address.
    ///
    /// `ff:fe` is inserted in the middle and the universal/local bit is inverted, see RFC 4291
    /// Appendix A.
    pub const fn from_vendor_ether(addr: EthernetAddress) -> Self {
        let EthernetAddress([a, b, c, d, e, f]) = addr;
        InterfaceId([a ^ 0x02, b, c, 0xff, 0xfe, d, e, f])
    }
}

impl Subnet {
    /// The subnet of `prefix_len` leading bits around an address.
    ///
    /// # Panics
    /// When `prefix_len` is greater than 128.
    pub fn new(address: Address, prefix_len: u8) -> Self {
        Subnet {
            network: address.mask(prefix_len),
            prefix_len,
        }
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn contains(&self, address: Address) -> bool {
        address.mask(self.prefix_len) == self.network
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

byte_wrapper! {
    /// An IPv6 packet, the fixed header and the payload.
    #[derive(Debug, PartialEq, Eq)]
    pub struct ipv6([u8]);
}

mod field {
    use crate::wire::field::Field;

    // Version, traffic class and flow label share the first word.
    pub(crate) const VERSION: usize = 0;
    pub(crate) const LENGTH: Field = 4..6;
    pub(crate) const NEXT_HEADER: usize = 6;
    pub(crate) const HOP_LIMIT: usize = 7;
    pub(crate) const SRC_ADDR: Field = 8..24;
    pub(crate) const DST_ADDR: Field = 24..40;
}

impl ipv6 {
    pub fn new_unchecked(data: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(data)
    }

    pub fn new_unchecked_mut(data: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(data)
    }

    /// View a byte slice as a packet, if it holds the header and the announced payload.
    pub fn new_checked(data: &[u8]) -> Result<&Self> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    /// Fails with `Error::Truncated` when the header or the payload length field exceed the data.
    ///
    /// Changing the payload length invalidates the check.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN
            || self.0.len() < HEADER_LEN + usize::from(self.payload_len())
        {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    pub fn version(&self) -> u8 {
        self.0[field::VERSION] >> 4
    }

    pub fn payload_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::LENGTH])
    }

    pub fn next_header(&self) -> Protocol {
        self.0[field::NEXT_HEADER].into()
    }

    pub fn hop_limit(&self) -> u8 {
        self.0[field::HOP_LIMIT]
    }

    pub fn src_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::SRC_ADDR])
    }

    pub fn dst_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::DST_ADDR])
    }

    /// Set the version, the traffic class bits in the same octet are kept.
    pub fn set_version(&mut self, version: u8) {
        let byte = &mut self.0[field::VERSION];
        *byte = (*byte & 0x0f) | (version << 4);
    }

    pub fn set_payload_len(&mut self, len: u16) {
        NetworkEndian::write_u16(&mut self.0[field::LENGTH], len)
    }

    pub fn set_next_header(&mut self, protocol: Protocol) {
        self.0[field::NEXT_HEADER] = protocol.into();
    }

    pub fn set_hop_limit(&mut self, hop_limit: u8) {
        self.0[field::HOP_LIMIT] = hop_limit;
    }

    pub fn set_src_addr(&mut self, addr: Address) {
        self.0[field::SRC_ADDR].copy_from_slice(addr.as_bytes())
    }

    pub fn set_dst_addr(&mut self, addr: Address) {
        self.0[field::DST_ADDR].copy_from_slice(addr.as_bytes())
    }

    /// The payload as announced by the length field, trailing padding excluded.
    ///
    /// # Panics
    /// When the length field exceeds the data, see `check_len`.
    pub fn payload_slice(&self) -> &[u8] {
        let end = HEADER_LEN + usize::from(self.payload_len());
        &self.0[HEADER_LEN..end]
    }
}
