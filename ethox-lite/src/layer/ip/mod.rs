//! The IPv6 layer.
//!
//! There is exactly one frame layout in this stack: an Ethernet II header directly followed by a
//! fixed IPv6 header without extension headers, followed by the upper layer packet. The
//! [`Packet`] wrapper provides accessors for all header fields at their fixed offsets and for the
//! upper layer payload, bounded by both the payload length field and the buffer.
//!
//! Received frames with extension headers are not recognized as any upper layer protocol, their
//! next header field simply does not match.
//!
//! [`Packet`]: struct.Packet.html
use crate::wire::{ETHERNET_HEADER_LEN, IPV6_HEADER_LEN};

mod packet;

pub use packet::Packet;

/// Hop limit of all packets originating here.
///
/// Neighbor discovery messages must be sent with a hop limit of 255, other packets just use the
/// same value.
pub const DEFAULT_HOP_LIMIT: u8 = 255;

/// Offset of the upper layer packet within the frame buffer.
pub const PAYLOAD_OFFSET: usize = ETHERNET_HEADER_LEN + IPV6_HEADER_LEN;
