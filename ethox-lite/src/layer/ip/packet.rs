use core::ops::Range;

use super::{DEFAULT_HOP_LIMIT, PAYLOAD_OFFSET};
use crate::layer::{Error, Result};
use crate::wire::{checksum, ethernet_frame, ipv6_packet};
use crate::wire::{EthernetAddress, EthernetProtocol, IpProtocol, Ipv6Address};
use crate::wire::ETHERNET_HEADER_LEN;

/// An Ethernet frame carrying an IPv6 packet, in a single byte buffer.
///
/// The buffer is at least large enough for both headers, which is checked on construction. All
/// header accessors are then infallible. The upper layer payload is the region after both headers,
/// as long as the payload length field claims but never more than the buffer holds.
#[derive(Debug, Clone)]
pub struct Packet<C> {
    buffer: C,
}

impl<C: AsRef<[u8]> + AsMut<[u8]>> Packet<C> {
    /// Wrap a buffer and initialize the headers.
    ///
    /// Fails with `Error::BadSize` when the buffer can not hold both headers.
    pub fn new(buffer: C) -> Result<Self> {
        if buffer.as_ref().len() < PAYLOAD_OFFSET {
            return Err(Error::BadSize);
        }

        let mut packet = Packet { buffer };
        packet.init();
        Ok(packet)
    }

    /// Reset both headers to an empty IPv6 packet.
    ///
    /// Addresses are zeroed, the ethertype is IPv6 and the hop limit is the default.
    pub fn init(&mut self) {
        let bytes = self.buffer.as_mut();
        for byte in bytes[..PAYLOAD_OFFSET].iter_mut() {
            *byte = 0;
        }

        self.frame_mut().set_ethertype(EthernetProtocol::Ipv6);
        let ip = self.ip_mut();
        ip.set_version(6);
        ip.set_hop_limit(DEFAULT_HOP_LIMIT);
    }

    /// Check if the buffer holds a valid IPv6 packet of a received frame of `len` bytes.
    pub fn check_received(&self, len: usize) -> Result<()> {
        if len < PAYLOAD_OFFSET || len > self.buffer.as_ref().len() {
            return Err(Error::BadSize);
        }

        if self.frame().ethertype() != EthernetProtocol::Ipv6 {
            return Err(Error::Illegal);
        }

        let ip = self.ip();
        if ip.version() != 6 {
            return Err(Error::Illegal);
        }

        // Ethernet pads short frames, so more bytes than announced are fine.
        if PAYLOAD_OFFSET + usize::from(ip.payload_len()) > len {
            return Err(Error::BadSize);
        }

        Ok(())
    }

    fn frame(&self) -> &ethernet_frame {
        ethernet_frame::new_unchecked(self.buffer.as_ref())
    }

    fn frame_mut(&mut self) -> &mut ethernet_frame {
        ethernet_frame::new_unchecked_mut(self.buffer.as_mut())
    }

    fn ip(&self) -> &ipv6_packet {
        ipv6_packet::new_unchecked(&self.buffer.as_ref()[ETHERNET_HEADER_LEN..PAYLOAD_OFFSET])
    }

    fn ip_mut(&mut self) -> &mut ipv6_packet {
        ipv6_packet::new_unchecked_mut(&mut self.buffer.as_mut()[ETHERNET_HEADER_LEN..PAYLOAD_OFFSET])
    }

    /// The Ethernet source address.
    pub fn src_mac(&self) -> EthernetAddress {
        self.frame().src_addr()
    }

    /// The Ethernet destination address.
    pub fn dst_mac(&self) -> EthernetAddress {
        self.frame().dst_addr()
    }

    /// Set the Ethernet source address.
    pub fn set_src_mac(&mut self, addr: EthernetAddress) {
        self.frame_mut().set_src_addr(addr)
    }

    /// Set the Ethernet destination address.
    pub fn set_dst_mac(&mut self, addr: EthernetAddress) {
        self.frame_mut().set_dst_addr(addr)
    }

    /// The IPv6 source address.
    pub fn src_addr(&self) -> Ipv6Address {
        self.ip().src_addr()
    }

    /// The IPv6 destination address.
    pub fn dst_addr(&self) -> Ipv6Address {
        self.ip().dst_addr()
    }

    /// Set the IPv6 source address.
    pub fn set_src_addr(&mut self, addr: Ipv6Address) {
        self.ip_mut().set_src_addr(addr)
    }

    /// Set the IPv6 destination address.
    pub fn set_dst_addr(&mut self, addr: Ipv6Address) {
        self.ip_mut().set_dst_addr(addr)
    }

    /// The upper layer protocol, the next header field.
    pub fn protocol(&self) -> IpProtocol {
        self.ip().next_header()
    }

    /// Set the upper layer protocol.
    pub fn set_protocol(&mut self, protocol: IpProtocol) {
        self.ip_mut().set_next_header(protocol)
    }

    /// The hop limit field.
    pub fn hop_limit(&self) -> u8 {
        self.ip().hop_limit()
    }

    /// Set the hop limit field.
    pub fn set_hop_limit(&mut self, hop_limit: u8) {
        self.ip_mut().set_hop_limit(hop_limit)
    }

    /// The payload length field, the length of the upper layer packet.
    pub fn payload_len(&self) -> u16 {
        self.ip().payload_len()
    }

    /// Set the payload length field.
    ///
    /// This does not check the length against the buffer, `payload` is clamped instead.
    pub fn set_payload_len(&mut self, len: u16) {
        self.ip_mut().set_payload_len(len)
    }

    /// The number of upper layer bytes the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().len() - PAYLOAD_OFFSET
    }

    fn payload_range(&self) -> Range<usize> {
        let len = usize::from(self.payload_len()).min(self.capacity());
        PAYLOAD_OFFSET..PAYLOAD_OFFSET + len
    }

    /// The upper layer packet.
    pub fn payload(&self) -> &[u8] {
        let range = self.payload_range();
        &self.buffer.as_ref()[range]
    }

    /// The upper layer packet, mutably.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let range = self.payload_range();
        &mut self.buffer.as_mut()[range]
    }

    /// All bytes after the headers, regardless of the payload length.
    ///
    /// Used to assemble a packet before its length is known.
    pub fn payload_buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[PAYLOAD_OFFSET..]
    }

    /// Length of the frame on the wire, headers and payload.
    pub fn frame_len(&self) -> usize {
        self.payload_range().end
    }

    /// The frame on the wire.
    pub fn frame_bytes(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.frame_len()]
    }

    /// The whole buffer.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    /// The whole buffer, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut()
    }

    /// Compute the upper layer checksum over pseudo header and payload.
    ///
    /// The result is complemented, ready to be written into a zeroed checksum field.
    pub fn calculate_checksum(&self) -> u16 {
        let ip = self.ip();
        checksum::upper_layer(&ip.src_addr(), &ip.dst_addr(), ip.next_header(), self.payload())
    }

    /// Check the upper layer checksum, which is included in the payload.
    pub fn verify_checksum(&self) -> bool {
        let ip = self.ip();
        checksum::verify_upper_layer(&ip.src_addr(), &ip.dst_addr(), ip.next_header(), self.payload())
    }

    /// Swap source and destination of both the Ethernet and the IPv6 header.
    ///
    /// Applying this twice is the identity.
    pub fn swap_endpoints(&mut self) {
        let (src_mac, dst_mac) = (self.src_mac(), self.dst_mac());
        self.set_src_mac(dst_mac);
        self.set_dst_mac(src_mac);

        let (src_addr, dst_addr) = (self.src_addr(), self.dst_addr());
        self.set_src_addr(dst_addr);
        self.set_dst_addr(src_addr);
    }

    /// Unwrap the buffer.
    pub fn into_inner(self) -> C {
        self.buffer
    }
}
