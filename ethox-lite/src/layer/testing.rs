//! Frames of a simulated peer, shared by the layer tests.
use alloc::vec::Vec;

use crate::layer::eth::{Interface, FRAME_BUFFER_LEN};
use crate::layer::ip;
use crate::nic::External;
use crate::wire::{Checksum, EthernetAddress, InterfaceId, IpProtocol, Ipv6Address};
use crate::wire::{ethernet_frame, icmpv6_packet, ipv6_packet, Icmpv6Repr};

pub(crate) const MAC_HOST: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
pub(crate) const MAC_OTHER: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);
pub(crate) const MAC_ROUTER: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0xfe]);

pub(crate) fn link_local(mac: EthernetAddress) -> Ipv6Address {
    Ipv6Address::from_link_local_id(InterfaceId::from_vendor_ether(mac))
}

pub(crate) fn interface() -> Interface<External, Vec<u8>> {
    Interface::new(External::new(), vec![0; FRAME_BUFFER_LEN], MAC_HOST).unwrap()
}

/// A complete frame with an upper layer payload whose checksum is already in place.
pub(crate) fn ip_frame(
    src_mac: EthernetAddress,
    dst_mac: EthernetAddress,
    src_addr: Ipv6Address,
    dst_addr: Ipv6Address,
    protocol: IpProtocol,
    payload: &[u8],
) -> Vec<u8> {
    let mut packet = ip::Packet::new(vec![0; ip::PAYLOAD_OFFSET + payload.len()]).unwrap();
    packet.set_src_mac(src_mac);
    packet.set_dst_mac(dst_mac);
    packet.set_src_addr(src_addr);
    packet.set_dst_addr(dst_addr);
    packet.set_protocol(protocol);
    packet.set_payload_len(payload.len() as u16);
    packet.payload_mut().copy_from_slice(payload);
    packet.into_inner()
}

/// An ICMPv6 message, `data` is the echo payload if any.
pub(crate) fn icmp_frame(
    src_mac: EthernetAddress,
    dst_mac: EthernetAddress,
    src_addr: Ipv6Address,
    dst_addr: Ipv6Address,
    repr: Icmpv6Repr,
    data: &[u8],
) -> Vec<u8> {
    let len = repr.buffer_len();
    let mut message = vec![0; len];
    message[len - data.len()..].copy_from_slice(data);
    repr.emit(icmpv6_packet::new_unchecked_mut(&mut message), src_addr, dst_addr, Checksum::Manual);
    ip_frame(src_mac, dst_mac, src_addr, dst_addr, IpProtocol::Icmpv6, &message)
}

/// The headers of a sent frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Sent {
    pub(crate) src_mac: EthernetAddress,
    pub(crate) dst_mac: EthernetAddress,
    pub(crate) src_addr: Ipv6Address,
    pub(crate) dst_addr: Ipv6Address,
    pub(crate) protocol: IpProtocol,
    pub(crate) hop_limit: u8,
}

/// Split a sent frame into its headers and the upper layer payload.
pub(crate) fn parse_sent(frame: &[u8]) -> (Sent, &[u8]) {
    let eth = ethernet_frame::new_checked(frame).unwrap();
    let ip = ipv6_packet::new_checked(eth.payload_slice()).unwrap();
    assert_eq!(frame.len(), ip::PAYLOAD_OFFSET + usize::from(ip.payload_len()));

    let sent = Sent {
        src_mac: eth.src_addr(),
        dst_mac: eth.dst_addr(),
        src_addr: ip.src_addr(),
        dst_addr: ip.dst_addr(),
        protocol: ip.next_header(),
        hop_limit: ip.hop_limit(),
    };
    (sent, ip.payload_slice())
}

/// Parse a sent ICMPv6 message, checking its checksum.
pub(crate) fn parse_icmp(frame: &[u8]) -> (Sent, Icmpv6Repr) {
    let (sent, payload) = parse_sent(frame);
    assert_eq!(sent.protocol, IpProtocol::Icmpv6);
    let icmp = icmpv6_packet::new_checked(payload).unwrap();
    let repr = Icmpv6Repr::parse(icmp, sent.src_addr, sent.dst_addr, Checksum::Manual).unwrap();
    (sent, repr)
}
