use core::fmt;
use core::time::Duration;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Checksum, Error, Result};
use super::{EthernetAddress, IpProtocol, Ipv6Address, Ipv6Subnet};
use super::checksum;

enum_with_unknown! {
    /// Internet protocol control message type.
    pub enum Message(u8) {
        /// Destination Unreachable.
        DstUnreachable  = 0x01,
        /// Packet Too Big.
        PktTooBig       = 0x02,
        /// Time Exceeded.
        TimeExceeded    = 0x03,
        /// Parameter Problem.
        ParamProblem    = 0x04,
        /// Echo Request
        EchoRequest     = 0x80,
        /// Echo Reply
        EchoReply       = 0x81,
        /// Router Solicitation
        RouterSolicit   = 0x85,
        /// Router Advertisement
        RouterAdvert    = 0x86,
        /// Neighbor Solicitation
        NeighborSolicit = 0x87,
        /// Neighbor Advertisement
        NeighborAdvert  = 0x88,
        /// Redirect
        Redirect        = 0x89,
    }
}

impl Message {
    /// Per [RFC 4443 § 2.1] ICMPv6 message types with the highest order
    /// bit set are informational messages while message types without
    /// the highest order bit set are error messages.
    ///
    /// [RFC 4443 § 2.1]: https://tools.ietf.org/html/rfc4443#section-2.1
    pub fn is_error(&self) -> bool {
        (u8::from(*self) & 0x80) != 0x80
    }

    /// Return a boolean value indicating if the given message type
    /// is an [NDISC] message type.
    ///
    /// [NDISC]: https://tools.ietf.org/html/rfc4861
    pub fn is_ndisc(&self) -> bool {
        match *self {
            Message::RouterSolicit | Message::RouterAdvert | Message::NeighborSolicit |
            Message::NeighborAdvert | Message::Redirect => true,
            _ => false,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Message::DstUnreachable  => write!(f, "destination unreachable"),
            Message::PktTooBig       => write!(f, "packet too big"),
            Message::TimeExceeded    => write!(f, "time exceeded"),
            Message::ParamProblem    => write!(f, "parameter problem"),
            Message::EchoReply       => write!(f, "echo reply"),
            Message::EchoRequest     => write!(f, "echo request"),
            Message::RouterSolicit   => write!(f, "router solicitation"),
            Message::RouterAdvert    => write!(f, "router advertisement"),
            Message::NeighborSolicit => write!(f, "neighbor solicitation"),
            Message::NeighborAdvert  => write!(f, "neighbor advert"),
            Message::Redirect        => write!(f, "redirect"),
            Message::Unknown(id)     => write!(f, "{}", id)
        }
    }
}

bitflags::bitflags! {
    /// Flags of a router advertisement.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RouterFlags: u8 {
        const MANAGED = 0b1000_0000;
        const OTHER   = 0b0100_0000;
    }
}

bitflags::bitflags! {
    /// Flags of a neighbor advertisement.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NeighborFlags: u8 {
        const ROUTER    = 0b1000_0000;
        const SOLICITED = 0b0100_0000;
        const OVERRIDE  = 0b0010_0000;
    }
}

bitflags::bitflags! {
    /// Flags of the prefix information option.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PrefixInfoFlags: u8 {
        const ON_LINK  = 0b1000_0000;
        const ADDRCONF = 0b0100_0000;
    }
}

byte_wrapper! {
    /// A byte sequence representing an ICMPv6 message.
    #[derive(Debug, PartialEq, Eq)]
    pub struct icmpv6([u8]);
}

// Ranges and constants describing key boundaries in the ICMPv6 header.
mod field {
    use crate::wire::field::Field;

    pub(crate) const TYPE:          usize = 0;
    pub(crate) const CODE:          usize = 1;
    pub(crate) const CHECKSUM:      Field = 2..4;

    pub(crate) const UNUSED:        Field = 4..8;

    // Echo Request and Echo Reply Messages
    pub(crate) const ECHO_IDENT:    Field = 4..6;
    pub(crate) const ECHO_SEQNO:    Field = 6..8;

    // Router Advertisement Message
    pub(crate) const CUR_HOP_LIMIT: usize = 4;
    pub(crate) const ROUTER_FLAGS:  usize = 5;
    pub(crate) const ROUTER_LT:     Field = 6..8;
    pub(crate) const REACHABLE_TM:  Field = 8..12;
    pub(crate) const RETRANS_TM:    Field = 12..16;

    // Neighbor Solicitation and Advertisement Messages
    pub(crate) const NEIGH_FLAGS:   usize = 4;
    pub(crate) const TARGET_ADDR:   Field = 8..24;

    // Redirect Message
    pub(crate) const DEST_ADDR:     Field = 24..40;
}

/// The length of the common header of every ICMPv6 message.
pub const HEADER_LEN: usize = field::UNUSED.end;

impl icmpv6 {
    /// Imbue a raw octet buffer with ICMPv6 message structure.
    pub fn new_unchecked(buffer: &[u8]) -> &icmpv6 {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with ICMPv6 message structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut icmpv6 {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&icmpv6> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    /// Unwrap the packet as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unwrap the packet as a mutable raw byte slice.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    ///
    /// The required length depends on the message type. The result of this check is invalidated
    /// by calling [set_msg_type].
    ///
    /// [set_msg_type]: #method.set_msg_type
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN || self.0.len() < self.header_len() {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the message type field.
    #[inline]
    pub fn msg_type(&self) -> Message {
        Message::from(self.0[field::TYPE])
    }

    /// Return the message code field.
    #[inline]
    pub fn msg_code(&self) -> u8 {
        self.0[field::CODE]
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Return the identifier field (for echo request and reply packets).
    #[inline]
    pub fn echo_ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_IDENT])
    }

    /// Return the sequence number field (for echo request and reply packets).
    #[inline]
    pub fn echo_seq_no(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_SEQNO])
    }

    /// Return the current hop limit field (for router advertisements).
    #[inline]
    pub fn current_hop_limit(&self) -> u8 {
        self.0[field::CUR_HOP_LIMIT]
    }

    /// Return the flags of a router advertisement.
    #[inline]
    pub fn router_flags(&self) -> RouterFlags {
        RouterFlags::from_bits_truncate(self.0[field::ROUTER_FLAGS])
    }

    /// Return the router lifetime field, in seconds.
    #[inline]
    pub fn router_lifetime(&self) -> Duration {
        let raw = NetworkEndian::read_u16(&self.0[field::ROUTER_LT]);
        Duration::from_secs(u64::from(raw))
    }

    /// Return the reachable time field, in milliseconds.
    #[inline]
    pub fn reachable_time(&self) -> Duration {
        let raw = NetworkEndian::read_u32(&self.0[field::REACHABLE_TM]);
        Duration::from_millis(u64::from(raw))
    }

    /// Return the retransmit time field, in milliseconds.
    #[inline]
    pub fn retrans_time(&self) -> Duration {
        let raw = NetworkEndian::read_u32(&self.0[field::RETRANS_TM]);
        Duration::from_millis(u64::from(raw))
    }

    /// Return the flags of a neighbor advertisement.
    #[inline]
    pub fn neighbor_flags(&self) -> NeighborFlags {
        NeighborFlags::from_bits_truncate(self.0[field::NEIGH_FLAGS])
    }

    /// Return the target address field of a neighbor solicitation, advertisement or redirect.
    #[inline]
    pub fn target_addr(&self) -> Ipv6Address {
        Ipv6Address::from_bytes(&self.0[field::TARGET_ADDR])
    }

    /// Return the destination address field of a redirect.
    #[inline]
    pub fn destination_addr(&self) -> Ipv6Address {
        Ipv6Address::from_bytes(&self.0[field::DEST_ADDR])
    }

    /// Return the header length.
    ///
    /// The result depends on the value of the message type field. For neighbor discovery
    /// messages this is the offset of the options.
    pub fn header_len(&self) -> usize {
        match self.msg_type() {
            Message::RouterSolicit => field::UNUSED.end,
            Message::RouterAdvert => field::RETRANS_TM.end,
            Message::NeighborSolicit | Message::NeighborAdvert => field::TARGET_ADDR.end,
            Message::Redirect => field::DEST_ADDR.end,
            // For the echo messages, and those carrying an invoking packet.
            _ => field::UNUSED.end,
        }
    }

    /// Validate the checksum against the pseudo header of the surrounding IPv6 packet.
    pub fn verify_checksum(&self, src_addr: Ipv6Address, dst_addr: Ipv6Address) -> bool {
        checksum::verify_upper_layer(&src_addr, &dst_addr, IpProtocol::Icmpv6, &self.0)
    }

    /// Set the message type field.
    #[inline]
    pub fn set_msg_type(&mut self, value: Message) {
        self.0[field::TYPE] = value.into();
    }

    /// Set the message code field.
    #[inline]
    pub fn set_msg_code(&mut self, value: u8) {
        self.0[field::CODE] = value;
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value);
    }

    /// Clear the reserved field after the common header.
    #[inline]
    pub fn clear_reserved(&mut self) {
        for b in &mut self.0[field::UNUSED] {
            *b = 0;
        }
    }

    /// Set the identifier field (for echo request and reply packets).
    #[inline]
    pub fn set_echo_ident(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::ECHO_IDENT], value);
    }

    /// Set the sequence number field (for echo request and reply packets).
    #[inline]
    pub fn set_echo_seq_no(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::ECHO_SEQNO], value);
    }

    #[inline]
    pub fn set_current_hop_limit(&mut self, value: u8) {
        self.0[field::CUR_HOP_LIMIT] = value;
    }

    #[inline]
    pub fn set_router_flags(&mut self, flags: RouterFlags) {
        self.0[field::ROUTER_FLAGS] = flags.bits();
    }

    /// Set the router lifetime, saturating at the largest representable value.
    #[inline]
    pub fn set_router_lifetime(&mut self, value: Duration) {
        let secs = value.as_secs().min(u64::from(u16::max_value())) as u16;
        NetworkEndian::write_u16(&mut self.0[field::ROUTER_LT], secs);
    }

    #[inline]
    pub fn set_reachable_time(&mut self, value: Duration) {
        let millis = value.as_millis().min(u128::from(u32::max_value())) as u32;
        NetworkEndian::write_u32(&mut self.0[field::REACHABLE_TM], millis);
    }

    #[inline]
    pub fn set_retrans_time(&mut self, value: Duration) {
        let millis = value.as_millis().min(u128::from(u32::max_value())) as u32;
        NetworkEndian::write_u32(&mut self.0[field::RETRANS_TM], millis);
    }

    /// Set the flags of a neighbor advertisement, clearing the rest of the reserved field.
    #[inline]
    pub fn set_neighbor_flags(&mut self, flags: NeighborFlags) {
        self.clear_reserved();
        self.0[field::NEIGH_FLAGS] = flags.bits();
    }

    #[inline]
    pub fn set_target_addr(&mut self, value: Ipv6Address) {
        self.0[field::TARGET_ADDR].copy_from_slice(value.as_bytes());
    }

    /// Compute and fill in the checksum.
    pub fn fill_checksum(&mut self, src_addr: Ipv6Address, dst_addr: Ipv6Address) {
        self.set_checksum(0);
        let checksum = checksum::upper_layer(&src_addr, &dst_addr, IpProtocol::Icmpv6, &self.0);
        self.set_checksum(checksum)
    }

    /// Return the payload following the header.
    ///
    /// For neighbor discovery messages these are the options.
    pub fn payload_slice(&self) -> &[u8] {
        &self.0[self.header_len()..]
    }

    /// Return the payload following the header, mutably.
    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        let start = self.header_len();
        &mut self.0[start..]
    }

    /// Iterate over the neighbor discovery options.
    pub fn options(&self) -> NdiscOptions<'_> {
        NdiscOptions { remaining: self.payload_slice() }
    }
}

impl AsRef<[u8]> for icmpv6 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for icmpv6 {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

enum_with_unknown! {
    /// NDISC Option Type
    pub enum NdiscOptionType(u8) {
        /// Source Link-layer Address
        SourceLinkLayerAddr = 0x1,
        /// Target Link-layer Address
        TargetLinkLayerAddr = 0x2,
        /// Prefix Information
        PrefixInformation   = 0x3,
        /// Redirected Header
        RedirectedHeader    = 0x4,
        /// MTU
        Mtu                 = 0x5,
    }
}

impl fmt::Display for NdiscOptionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            NdiscOptionType::SourceLinkLayerAddr => write!(f, "source link-layer address"),
            NdiscOptionType::TargetLinkLayerAddr => write!(f, "target link-layer address"),
            NdiscOptionType::PrefixInformation   => write!(f, "prefix information"),
            NdiscOptionType::RedirectedHeader    => write!(f, "redirected header"),
            NdiscOptionType::Mtu                 => write!(f, "mtu"),
            NdiscOptionType::Unknown(id)         => write!(f, "{}", id)
        }
    }
}

byte_wrapper! {
    /// A byte sequence representing a single neighbor discovery option.
    #[derive(Debug, PartialEq, Eq)]
    pub struct ndisc_option([u8]);
}

mod option_field {
    #![allow(non_snake_case)]

    use crate::wire::field::Field;

    // 8-bit identifier of the type of option.
    pub(crate) const TYPE:          usize = 0;
    // 8-bit unsigned integer. Length of the option, in units of 8 octets.
    pub(crate) const LENGTH:        usize = 1;
    // Minimum length of an option.
    pub(crate) const MIN_OPT_LEN:   usize = 8;
    // Variable-length field. Option-Type-specific data.
    pub(crate) fn DATA(length: u8) -> Field {
        2..usize::from(length) * 8
    }

    // Source/Target Link-layer Option fields.
    pub(crate) const LL_ADDR:       Field = 2..8;

    // Prefix Information Option fields.
    pub(crate) const PREFIX_LEN:    usize = 2;
    pub(crate) const FLAGS:         usize = 3;
    pub(crate) const VALID_LT:      Field = 4..8;
    pub(crate) const PREF_LT:       Field = 8..12;
    pub(crate) const PREF_RESERVED: Field = 12..16;
    pub(crate) const PREFIX:        Field = 16..32;

    // MTU Option fields
    pub(crate) const MTU:           Field = 4..8;
}

/// The encoded length of a prefix information option.
const PREFIX_INFO_LEN: usize = option_field::PREFIX.end;

impl ndisc_option {
    /// Imbue a raw octet buffer with NDISC option structure.
    pub fn new_unchecked(buffer: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with NDISC option structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&Self> {
        let opt = Self::new_unchecked(data);
        opt.check_len()?;
        Ok(opt)
    }

    /// Ensure that no accessor method will panic if called.
    ///
    /// Returns `Err(Error::Truncated)` if the buffer is shorter than the length field claims and
    /// `Err(Error::Malformed)` if the length field is zero or too short for the option type.
    pub fn check_len(&self) -> Result<()> {
        let data = &self.0;
        let len = data.len();

        if len < option_field::MIN_OPT_LEN {
            return Err(Error::Truncated);
        }

        let opt_len = self.data_len();
        if opt_len == 0 {
            return Err(Error::Malformed);
        }

        if len < usize::from(opt_len) * 8 {
            return Err(Error::Truncated);
        }

        match self.option_type() {
            NdiscOptionType::PrefixInformation if usize::from(opt_len) * 8 < PREFIX_INFO_LEN =>
                Err(Error::Malformed),
            _ => Ok(()),
        }
    }

    /// The whole option as a byte slice, trimmed to its length field.
    ///
    /// Only valid after a successful `check_len`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..usize::from(self.data_len()) * 8]
    }

    /// Return the option type field.
    #[inline]
    pub fn option_type(&self) -> NdiscOptionType {
        NdiscOptionType::from(self.0[option_field::TYPE])
    }

    /// Return the length field, in units of 8 octets.
    #[inline]
    pub fn data_len(&self) -> u8 {
        self.0[option_field::LENGTH]
    }

    /// Return the option data, after the type and length.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.0[option_field::DATA(self.data_len())]
    }

    /// Return the Source/Target Link-layer Address.
    #[inline]
    pub fn link_layer_addr(&self) -> EthernetAddress {
        EthernetAddress::from_bytes(&self.0[option_field::LL_ADDR])
    }

    /// Return the prefix length field of a prefix information option.
    #[inline]
    pub fn prefix_len(&self) -> u8 {
        self.0[option_field::PREFIX_LEN]
    }

    /// Return the flags of a prefix information option.
    #[inline]
    pub fn prefix_flags(&self) -> PrefixInfoFlags {
        PrefixInfoFlags::from_bits_truncate(self.0[option_field::FLAGS])
    }

    /// Return the valid lifetime of the prefix.
    #[inline]
    pub fn valid_lifetime(&self) -> Duration {
        let raw = NetworkEndian::read_u32(&self.0[option_field::VALID_LT]);
        Duration::from_secs(u64::from(raw))
    }

    /// Return the preferred lifetime of the prefix.
    #[inline]
    pub fn preferred_lifetime(&self) -> Duration {
        let raw = NetworkEndian::read_u32(&self.0[option_field::PREF_LT]);
        Duration::from_secs(u64::from(raw))
    }

    /// Return the advertised prefix.
    #[inline]
    pub fn prefix(&self) -> Ipv6Address {
        Ipv6Address::from_bytes(&self.0[option_field::PREFIX])
    }

    /// Return the advertised link MTU.
    #[inline]
    pub fn mtu(&self) -> u32 {
        NetworkEndian::read_u32(&self.0[option_field::MTU])
    }

    #[inline]
    pub fn set_option_type(&mut self, value: NdiscOptionType) {
        self.0[option_field::TYPE] = value.into();
    }

    #[inline]
    pub fn set_data_len(&mut self, value: u8) {
        self.0[option_field::LENGTH] = value;
    }

    #[inline]
    pub fn set_link_layer_addr(&mut self, addr: EthernetAddress) {
        self.0[option_field::LL_ADDR].copy_from_slice(addr.as_bytes())
    }

    #[inline]
    pub fn set_prefix_len(&mut self, value: u8) {
        self.0[option_field::PREFIX_LEN] = value;
    }

    #[inline]
    pub fn set_prefix_flags(&mut self, flags: PrefixInfoFlags) {
        self.0[option_field::FLAGS] = flags.bits();
    }

    #[inline]
    pub fn set_valid_lifetime(&mut self, value: Duration) {
        let secs = value.as_secs().min(u64::from(u32::max_value())) as u32;
        NetworkEndian::write_u32(&mut self.0[option_field::VALID_LT], secs);
    }

    #[inline]
    pub fn set_preferred_lifetime(&mut self, value: Duration) {
        let secs = value.as_secs().min(u64::from(u32::max_value())) as u32;
        NetworkEndian::write_u32(&mut self.0[option_field::PREF_LT], secs);
    }

    #[inline]
    pub fn clear_prefix_reserved(&mut self) {
        NetworkEndian::write_u32(&mut self.0[option_field::PREF_RESERVED], 0);
    }

    #[inline]
    pub fn set_prefix(&mut self, addr: Ipv6Address) {
        self.0[option_field::PREFIX].copy_from_slice(addr.as_bytes());
    }

    #[inline]
    pub fn set_mtu(&mut self, value: u32) {
        NetworkEndian::write_u16(&mut self.0[2..4], 0);
        NetworkEndian::write_u32(&mut self.0[option_field::MTU], value);
    }
}

/// Iterator over the neighbor discovery options of a message.
///
/// Yields an error for an option that can not be delimited and stops afterwards, as the start of
/// the next option is unknown.
#[derive(Clone, Debug)]
pub struct NdiscOptions<'a> {
    remaining: &'a [u8],
}

impl<'a> NdiscOptions<'a> {
    /// Iterate the options contained in a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        NdiscOptions { remaining: data }
    }
}

impl<'a> Iterator for NdiscOptions<'a> {
    type Item = Result<&'a ndisc_option>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        let data = self.remaining;
        match ndisc_option::new_checked(data) {
            Ok(option) => {
                let len = usize::from(option.data_len()) * 8;
                self.remaining = &data[len..];
                Some(Ok(option))
            },
            Err(err) => {
                self.remaining = &[];
                Some(Err(err))
            },
        }
    }
}

/// The content of a prefix information option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PrefixInformation {
    pub prefix_len: u8,
    pub flags: PrefixInfoFlags,
    pub valid_lifetime: Duration,
    pub preferred_lifetime: Duration,
    pub prefix: Ipv6Address,
}

impl PrefixInformation {
    /// The advertised subnet, if the prefix length is valid.
    pub fn subnet(&self) -> Option<Ipv6Subnet> {
        if self.prefix_len > 128 {
            None
        } else {
            Some(Ipv6Subnet::new(self.prefix, self.prefix_len))
        }
    }

    /// Check if the prefix can be used for stateless address autoconfiguration.
    ///
    /// This requires the autonomous flag, a nonzero valid lifetime and a prefix of 64 bits, the
    /// length of an interface identifier formed from an Ethernet address.
    pub fn is_autoconf(&self) -> bool {
        self.flags.contains(PrefixInfoFlags::ADDRCONF)
            && self.valid_lifetime > Duration::from_secs(0)
            && self.prefix_len == 64
    }
}

/// A high-level representation of a neighbor discovery option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NdiscOptionRepr<'a> {
    SourceLinkLayerAddr(EthernetAddress),
    TargetLinkLayerAddr(EthernetAddress),
    PrefixInformation(PrefixInformation),
    Mtu(u32),
    Unknown {
        type_: u8,
        length: u8,
        data: &'a [u8],
    },
}

impl<'a> NdiscOptionRepr<'a> {
    /// Parse a checked option.
    pub fn parse(opt: &'a ndisc_option) -> Result<NdiscOptionRepr<'a>> {
        opt.check_len()?;
        match opt.option_type() {
            NdiscOptionType::SourceLinkLayerAddr =>
                Ok(NdiscOptionRepr::SourceLinkLayerAddr(opt.link_layer_addr())),
            NdiscOptionType::TargetLinkLayerAddr =>
                Ok(NdiscOptionRepr::TargetLinkLayerAddr(opt.link_layer_addr())),
            NdiscOptionType::PrefixInformation =>
                Ok(NdiscOptionRepr::PrefixInformation(PrefixInformation {
                    prefix_len: opt.prefix_len(),
                    flags: opt.prefix_flags(),
                    valid_lifetime: opt.valid_lifetime(),
                    preferred_lifetime: opt.preferred_lifetime(),
                    prefix: opt.prefix(),
                })),
            NdiscOptionType::Mtu =>
                Ok(NdiscOptionRepr::Mtu(opt.mtu())),
            other => Ok(NdiscOptionRepr::Unknown {
                type_: other.into(),
                length: opt.data_len(),
                data: opt.data(),
            }),
        }
    }

    /// The number of bytes the option occupies.
    pub fn buffer_len(&self) -> usize {
        match self {
            NdiscOptionRepr::SourceLinkLayerAddr(_)
            | NdiscOptionRepr::TargetLinkLayerAddr(_)
            | NdiscOptionRepr::Mtu(_) => option_field::MIN_OPT_LEN,
            NdiscOptionRepr::PrefixInformation(_) => PREFIX_INFO_LEN,
            NdiscOptionRepr::Unknown { length, .. } => usize::from(*length) * 8,
        }
    }

    /// Emit the option into the start of a buffer.
    ///
    /// # Panics
    /// This function panics if the buffer is shorter than `buffer_len`.
    pub fn emit(&self, opt: &mut ndisc_option) {
        match *self {
            NdiscOptionRepr::SourceLinkLayerAddr(addr) => {
                opt.set_option_type(NdiscOptionType::SourceLinkLayerAddr);
                opt.set_data_len(1);
                opt.set_link_layer_addr(addr);
            },
            NdiscOptionRepr::TargetLinkLayerAddr(addr) => {
                opt.set_option_type(NdiscOptionType::TargetLinkLayerAddr);
                opt.set_data_len(1);
                opt.set_link_layer_addr(addr);
            },
            NdiscOptionRepr::PrefixInformation(info) => {
                opt.set_option_type(NdiscOptionType::PrefixInformation);
                opt.set_data_len((PREFIX_INFO_LEN / 8) as u8);
                opt.set_prefix_len(info.prefix_len);
                opt.set_prefix_flags(info.flags);
                opt.set_valid_lifetime(info.valid_lifetime);
                opt.set_preferred_lifetime(info.preferred_lifetime);
                opt.clear_prefix_reserved();
                opt.set_prefix(info.prefix);
            },
            NdiscOptionRepr::Mtu(mtu) => {
                opt.set_option_type(NdiscOptionType::Mtu);
                opt.set_data_len(1);
                opt.set_mtu(mtu);
            },
            NdiscOptionRepr::Unknown { type_, length, data } => {
                opt.set_option_type(NdiscOptionType::Unknown(type_));
                opt.set_data_len(length);
                opt.0[option_field::DATA(length)].copy_from_slice(data);
            },
        }
    }
}

impl<'a> fmt::Display for NdiscOptionRepr<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NdiscOptionRepr::SourceLinkLayerAddr(addr) => write!(f, "SourceLinkLayer addr={}", addr),
            NdiscOptionRepr::TargetLinkLayerAddr(addr) => write!(f, "TargetLinkLayer addr={}", addr),
            NdiscOptionRepr::PrefixInformation(info) =>
                write!(f, "PrefixInformation prefix={}/{}", info.prefix, info.prefix_len),
            NdiscOptionRepr::Mtu(mtu) => write!(f, "MTU mtu={}", mtu),
            NdiscOptionRepr::Unknown { type_, length, .. } =>
                write!(f, "Unknown({}) length={}", type_, length),
        }
    }
}

/// A high-level representation of an Internet Control Message Protocol version 6 packet header.
///
/// Options that are not needed by a host are not represented. Unknown options are ignored on
/// parsing, as required by [RFC 4861 § 4.6].
///
/// [RFC 4861 § 4.6]: https://tools.ietf.org/html/rfc4861#section-4.6
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Repr {
    EchoRequest {
        ident:  u16,
        seq_no: u16,
        payload: usize,
    },
    EchoReply {
        ident:  u16,
        seq_no: u16,
        payload: usize,
    },
    RouterSolicit {
        lladdr: Option<EthernetAddress>,
    },
    RouterAdvert {
        hop_limit: u8,
        flags: RouterFlags,
        router_lifetime: Duration,
        reachable_time: Duration,
        retrans_time: Duration,
        lladdr: Option<EthernetAddress>,
        mtu: Option<u32>,
        prefix_info: Option<PrefixInformation>,
    },
    NeighborSolicit {
        target_addr: Ipv6Address,
        lladdr: Option<EthernetAddress>,
    },
    NeighborAdvert {
        flags: NeighborFlags,
        target_addr: Ipv6Address,
        lladdr: Option<EthernetAddress>,
    },
}

impl Repr {
    /// Get the echo reply if this is an echo request.
    pub fn echo_reply(self) -> Option<Repr> {
        match self {
            Repr::EchoRequest { ident, seq_no, payload, } =>
                Some(Repr::EchoReply { ident, seq_no, payload, }),
            _ => None,
        }
    }

    /// Parse an Internet Control Message Protocol version 6 packet and return a high-level
    /// representation.
    ///
    /// The addresses are those of the surrounding IPv6 header, used for the checksum.
    pub fn parse(
        packet: &icmpv6,
        src_addr: Ipv6Address,
        dst_addr: Ipv6Address,
        checksum: Checksum,
    ) -> Result<Repr> {
        packet.check_len()?;

        // Valid checksum is expected.
        if checksum.manual() && !packet.verify_checksum(src_addr, dst_addr) {
            return Err(Error::WrongChecksum)
        }

        match (packet.msg_type(), packet.msg_code()) {
            (Message::EchoRequest, 0) => Ok(Repr::EchoRequest {
                ident: packet.echo_ident(),
                seq_no: packet.echo_seq_no(),
                payload: packet.payload_slice().len(),
            }),
            (Message::EchoReply, 0) => Ok(Repr::EchoReply {
                ident: packet.echo_ident(),
                seq_no: packet.echo_seq_no(),
                payload: packet.payload_slice().len(),
            }),
            (Message::RouterSolicit, 0) => {
                let mut lladdr = None;
                for option in packet.options() {
                    if let NdiscOptionRepr::SourceLinkLayerAddr(addr) = NdiscOptionRepr::parse(option?)? {
                        lladdr = Some(addr);
                    }
                }
                Ok(Repr::RouterSolicit { lladdr })
            },
            (Message::RouterAdvert, 0) => {
                let (mut lladdr, mut mtu, mut prefix_info) = (None, None, None);
                for option in packet.options() {
                    match NdiscOptionRepr::parse(option?)? {
                        NdiscOptionRepr::SourceLinkLayerAddr(addr) => lladdr = Some(addr),
                        NdiscOptionRepr::Mtu(val) => mtu = Some(val),
                        NdiscOptionRepr::PrefixInformation(info) if prefix_info.is_none() =>
                            prefix_info = Some(info),
                        _ => (),
                    }
                }
                Ok(Repr::RouterAdvert {
                    hop_limit: packet.current_hop_limit(),
                    flags: packet.router_flags(),
                    router_lifetime: packet.router_lifetime(),
                    reachable_time: packet.reachable_time(),
                    retrans_time: packet.retrans_time(),
                    lladdr,
                    mtu,
                    prefix_info,
                })
            },
            (Message::NeighborSolicit, 0) => {
                let mut lladdr = None;
                for option in packet.options() {
                    if let NdiscOptionRepr::SourceLinkLayerAddr(addr) = NdiscOptionRepr::parse(option?)? {
                        lladdr = Some(addr);
                    }
                }
                Ok(Repr::NeighborSolicit {
                    target_addr: packet.target_addr(),
                    lladdr,
                })
            },
            (Message::NeighborAdvert, 0) => {
                let mut lladdr = None;
                for option in packet.options() {
                    if let NdiscOptionRepr::TargetLinkLayerAddr(addr) = NdiscOptionRepr::parse(option?)? {
                        lladdr = Some(addr);
                    }
                }
                Ok(Repr::NeighborAdvert {
                    flags: packet.neighbor_flags(),
                    target_addr: packet.target_addr(),
                    lladdr,
                })
            },
            // Unknown types are not as specified in the standard and iana registry.
            (Message::Unknown(_), _) => Err(Error::Unrecognized),
            // Others are just not supported.
            _ => Err(Error::Unsupported),
        }
    }

    /// Return the length of a packet that will be emitted from this high-level representation.
    pub fn buffer_len(&self) -> usize {
        let lladdr_len = |lladdr: &Option<EthernetAddress>| match lladdr {
            Some(_) => option_field::MIN_OPT_LEN,
            None => 0,
        };

        match self {
            Repr::EchoRequest { payload, .. } |
            Repr::EchoReply { payload, .. } => field::ECHO_SEQNO.end + payload,
            Repr::RouterSolicit { lladdr } => field::UNUSED.end + lladdr_len(lladdr),
            Repr::RouterAdvert { lladdr, mtu, prefix_info, .. } => {
                field::RETRANS_TM.end
                    + lladdr_len(lladdr)
                    + mtu.map_or(0, |_| option_field::MIN_OPT_LEN)
                    + prefix_info.map_or(0, |_| PREFIX_INFO_LEN)
            },
            Repr::NeighborSolicit { lladdr, .. } |
            Repr::NeighborAdvert { lladdr, .. } => field::TARGET_ADDR.end + lladdr_len(lladdr),
        }
    }

    /// Emit a high-level representation into an Internet Control Message Protocol version 6
    /// packet.
    ///
    /// The echo payload is not written. With a manual checksum it must be in place already.
    pub fn emit(
        &self,
        packet: &mut icmpv6,
        src_addr: Ipv6Address,
        dst_addr: Ipv6Address,
        checksum: Checksum,
    ) {
        packet.set_msg_code(0);
        match *self {
            Repr::EchoRequest { ident, seq_no, .. } => {
                packet.set_msg_type(Message::EchoRequest);
                packet.set_echo_ident(ident);
                packet.set_echo_seq_no(seq_no);
            },
            Repr::EchoReply { ident, seq_no, .. } => {
                packet.set_msg_type(Message::EchoReply);
                packet.set_echo_ident(ident);
                packet.set_echo_seq_no(seq_no);
            },
            Repr::RouterSolicit { lladdr } => {
                packet.set_msg_type(Message::RouterSolicit);
                packet.clear_reserved();
                if let Some(addr) = lladdr {
                    let opt = ndisc_option::new_unchecked_mut(packet.payload_mut_slice());
                    NdiscOptionRepr::SourceLinkLayerAddr(addr).emit(opt);
                }
            },
            Repr::RouterAdvert {
                hop_limit, flags, router_lifetime, reachable_time, retrans_time,
                lladdr, mtu, prefix_info
            } => {
                packet.set_msg_type(Message::RouterAdvert);
                packet.set_current_hop_limit(hop_limit);
                packet.set_router_flags(flags);
                packet.set_router_lifetime(router_lifetime);
                packet.set_reachable_time(reachable_time);
                packet.set_retrans_time(retrans_time);
                let options = packet.payload_mut_slice();
                let mut offset = 0;
                if let Some(addr) = lladdr {
                    let repr = NdiscOptionRepr::SourceLinkLayerAddr(addr);
                    repr.emit(ndisc_option::new_unchecked_mut(&mut options[offset..]));
                    offset += repr.buffer_len();
                }
                if let Some(mtu) = mtu {
                    let repr = NdiscOptionRepr::Mtu(mtu);
                    repr.emit(ndisc_option::new_unchecked_mut(&mut options[offset..]));
                    offset += repr.buffer_len();
                }
                if let Some(info) = prefix_info {
                    let repr = NdiscOptionRepr::PrefixInformation(info);
                    repr.emit(ndisc_option::new_unchecked_mut(&mut options[offset..]));
                }
            },
            Repr::NeighborSolicit { target_addr, lladdr } => {
                packet.set_msg_type(Message::NeighborSolicit);
                packet.clear_reserved();
                packet.set_target_addr(target_addr);
                if let Some(addr) = lladdr {
                    let opt = ndisc_option::new_unchecked_mut(packet.payload_mut_slice());
                    NdiscOptionRepr::SourceLinkLayerAddr(addr).emit(opt);
                }
            },
            Repr::NeighborAdvert { flags, target_addr, lladdr } => {
                packet.set_msg_type(Message::NeighborAdvert);
                packet.set_neighbor_flags(flags);
                packet.set_target_addr(target_addr);
                if let Some(addr) = lladdr {
                    let opt = ndisc_option::new_unchecked_mut(packet.payload_mut_slice());
                    NdiscOptionRepr::TargetLinkLayerAddr(addr).emit(opt);
                }
            },
        }

        if checksum.manual() {
            packet.fill_checksum(src_addr, dst_addr)
        } else {
            // make sure we get a consistently zeroed checksum,
            // since implementations might rely on it
            packet.set_checksum(0);
        }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Repr::EchoRequest { ident, seq_no, payload } =>
                write!(f, "ICMPv6 echo request id={} seq={} len={}", ident, seq_no, payload),
            Repr::EchoReply { ident, seq_no, payload } =>
                write!(f, "ICMPv6 echo reply id={} seq={} len={}", ident, seq_no, payload),
            Repr::RouterSolicit { .. } =>
                write!(f, "ICMPv6 router solicitation"),
            Repr::RouterAdvert { router_lifetime, prefix_info, .. } => {
                write!(f, "ICMPv6 router advertisement lifetime={}s", router_lifetime.as_secs())?;
                if let Some(info) = prefix_info {
                    write!(f, " prefix={}/{}", info.prefix, info.prefix_len)?;
                }
                Ok(())
            },
            Repr::NeighborSolicit { target_addr, .. } =>
                write!(f, "ICMPv6 neighbor solicitation target={}", target_addr),
            Repr::NeighborAdvert { target_addr, lladdr, .. } => {
                write!(f, "ICMPv6 neighbor advert target={}", target_addr)?;
                if let Some(addr) = lladdr {
                    write!(f, " lladdr={}", addr)?;
                }
                Ok(())
            },
        }
    }
}
