/*! Low-level packet access and construction.

# An overview over packet representations

The `wire` module deals with the packet *representation*. It provides two levels of
functionality.

 * First, it provides functions to extract fields from sequences of octets, and to insert fields
   into sequences of octets. This happens in the lowercase structures e.g. [`ethernet_frame`],
   [`ipv6_packet`], [`icmpv6_packet`] or [`tcp_packet`]. These are dynamically sized wrappers
   around a byte slice, so a `&ipv6_packet` is just a `&[u8]` with header accessors.
 * Second, it provides a compact, high-level representation of header data that can be created
   from parsing and emitted into a sequence of octets. This happens through the `Repr` family of
   structs and enums, e.g. [`Icmpv6Repr`].

[`ethernet_frame`]: struct.ethernet_frame.html
[`ipv6_packet`]: struct.ipv6_packet.html
[`icmpv6_packet`]: struct.icmpv6_packet.html
[`tcp_packet`]: struct.tcp_packet.html
[`Icmpv6Repr`]: enum.Icmpv6Repr.html

The lowercase family guarantees that, if the `check_len()` method returned `Ok(())`, then no
field accessor or setter method will panic; however, the guarantee only holds while the fields
named in the documentation of `check_len` are not mutated.

The `new_checked` constructors are a shorthand for combining `new_unchecked` and `check_len`.
When parsing untrusted input, it is *necessary* to use the checked constructors. When emitting
output, though, it is *incorrect* to use them; the length check is likely to succeed on a zeroed
buffer, but fail on a buffer filled with data from a previous packet. In this crate there is only
one buffer and it is reused for everything, so this matters.

In the `Repr` family of data structures, the `Repr::parse()` method never panics and the
`Repr::emit()` method never panics as long as the underlying buffer is at least
`Repr::buffer_len()` octets long.

# Checksums

All upper layer checksums are the Internet checksum over a pseudo header and the upper layer
data, see [`checksum`].

[`checksum`]: checksum/index.html
*/
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//
// Applies to files in this folder unless otherwise noted. These are:
// * `error.rs`
// * `ethernet.rs`
// * `icmpv6.rs`
// * `ipv6.rs`
// * `mod.rs` (this file)
// * `tcp.rs`

// Most fields should be self-explanatory from the RFC they implement.
#![allow(missing_docs)]

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
    pub(crate) type Rest  = ::core::ops::RangeFrom<usize>;
}

pub mod checksum;

mod error;
mod ethernet;
mod icmpv6;
mod ipv6;
mod tcp;

/// Describes how to handle checksums.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// Checksum must be computed or checked manually.
    Manual,

    /// The checksum field is filled or checked by the NIC.
    Ignored,
}

impl Checksum {
    /// Check if a checksum should be calculated by the library.
    ///
    /// Otherwise it is ignored due to the assumption that it was offloaded or is otherwise
    /// undesirable to check.
    pub fn manual(self) -> bool {
        match self {
            Checksum::Manual => true,
            Checksum::Ignored => false,
        }
    }
}

pub use self::error::{
    Error,
    Result};

pub use self::ethernet::{
    ethernet as ethernet_frame,
    EtherType as EthernetProtocol,
    Address as EthernetAddress,
    ParseAddressError as EthernetParseError,
    HEADER_LEN as ETHERNET_HEADER_LEN};

pub use self::ipv6::{
    InterfaceId,
    ipv6 as ipv6_packet,
    Address as Ipv6Address,
    Protocol as IpProtocol,
    Subnet as Ipv6Subnet,
    HEADER_LEN as IPV6_HEADER_LEN};

pub use self::icmpv6::{
    icmpv6 as icmpv6_packet,
    Message as Icmpv6Message,
    Repr as Icmpv6Repr,
    HEADER_LEN as ICMPV6_HEADER_LEN,
    RouterFlags as NdiscRouterFlags,
    NeighborFlags as NdiscNeighborFlags,
    ndisc_option,
    NdiscOptions,
    NdiscOptionType,
    NdiscOptionRepr,
    PrefixInformation as NdiscPrefixInformation,
    PrefixInfoFlags as NdiscPrefixInfoFlags};

pub use self::tcp::{
    tcp as tcp_packet,
    SeqNumber as TcpSeqNumber,
    Flags as TcpFlags,
    TcpOption,
    HEADER_LEN as TCP_HEADER_LEN};
