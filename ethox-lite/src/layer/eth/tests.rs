use super::*;
use crate::layer::testing::*;
use crate::layer::Error;
use crate::time::Instant;
use crate::wire::{EthernetAddress, IpProtocol, Ipv6Address};

fn global() -> Ipv6Address {
    Ipv6Address::new(0x2001, 0xdb8, 1, 0, 0, 0xff, 0xfe00, 1)
}

fn remote() -> Ipv6Address {
    Ipv6Address::new(0x2001, 0xdb8, 2, 0, 0, 0, 0, 1)
}

#[test]
fn derived_link_local() {
    let iface = interface();
    assert_eq!(iface.ethernet_address(), MAC_HOST);
    assert_eq!(iface.link_local_address(), Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0xff, 0xfe00, 1));
    assert_eq!(iface.global_address(), None);
    assert!(!iface.contains_received());
}

#[test]
fn small_buffer_rejected() {
    let iface = Interface::new(crate::nic::External::new(), vec![0; 20], MAC_HOST);
    assert_eq!(iface.err(), Some(Error::BadSize));
}

#[test]
fn address_kind() {
    let mut iface = interface();
    let host = iface.link_local_address();
    assert_eq!(iface.address_kind(host), Some(AddressKind::LinkLocal));
    assert_eq!(iface.address_kind(global()), None);
    assert_eq!(iface.address_kind(Ipv6Address::LINK_LOCAL_ALL_NODES), Some(AddressKind::Multicast));
    assert_eq!(iface.address_kind(host.solicited_node_multicast()), Some(AddressKind::Multicast));
    assert_eq!(iface.address_kind(Ipv6Address::LINK_LOCAL_ALL_ROUTERS), None);

    iface.set_global_address(global());
    assert_eq!(iface.address_kind(global()), Some(AddressKind::Global));
    assert!(iface.is_our_address(global()));
    assert!(!iface.is_our_address(Ipv6Address::LINK_LOCAL_ALL_NODES));
}

#[test]
fn source_selection() {
    let mut iface = interface();
    let host = iface.link_local_address();
    assert_eq!(iface.source_for(remote()), host);

    iface.set_global_address(global());
    assert_eq!(iface.source_for(remote()), global());
    assert_eq!(iface.source_for(link_local(MAC_OTHER)), host);
    assert_eq!(iface.source_for(Ipv6Address::LINK_LOCAL_ALL_NODES), host);
    // Site-local scope multicast.
    assert_eq!(iface.source_for(Ipv6Address::new(0xff05, 0, 0, 0, 0, 0, 0, 2)), global());
}

#[test]
fn next_hop() {
    let mut iface = interface();
    let now = Instant::from_millis(0);
    let other = link_local(MAC_OTHER);

    assert_eq!(iface.next_hop(other, now), Err(Error::Unreachable));
    assert_eq!(iface.next_hop(remote(), now), Err(Error::Unreachable));
    assert_eq!(
        iface.next_hop(Ipv6Address::LINK_LOCAL_ALL_NODES, now),
        Ok(EthernetAddress([0x33, 0x33, 0, 0, 0, 1])));

    iface.neighbors_mut().fill(other, MAC_OTHER, Some(now)).unwrap();
    iface.set_router_mac(Some(MAC_ROUTER));
    assert_eq!(iface.next_hop(other, now), Ok(MAC_OTHER));
    assert_eq!(iface.next_hop(remote(), now), Ok(MAC_ROUTER));

    // Neighbors within our prefix are not routed.
    iface.set_global_address(global());
    let on_link = Ipv6Address::new(0x2001, 0xdb8, 1, 0, 0, 0, 0, 7);
    assert!(iface.is_on_link(on_link));
    assert_eq!(iface.next_hop(on_link, now), Err(Error::Unreachable));

    let later = now + NeighborCache::ENTRY_LIFETIME;
    assert_eq!(iface.next_hop(other, later), Err(Error::Unreachable));
}

#[test]
fn upper_layer_left_in_buffer() {
    let mut iface = interface();
    let host = iface.link_local_address();
    let other = link_local(MAC_OTHER);

    let payload = [0x5a; 20];
    iface.device_mut().push_recv(&ip_frame(MAC_OTHER, MAC_HOST, other, host, IpProtocol::Tcp, &payload));

    assert_eq!(iface.receive_packet(Instant::from_millis(0)), Some(IpProtocol::Tcp));
    assert!(iface.contains_received());
    assert_eq!(iface.packet().payload(), &payload[..]);
    assert_eq!(iface.packet().src_addr(), other);

    iface.discard_received();
    assert!(!iface.contains_received());
    assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
}

#[test]
fn foreign_frames_dropped() {
    let mut iface = interface();
    let host = iface.link_local_address();
    let other = link_local(MAC_OTHER);
    let payload = [0; 20];

    // Not our MAC.
    iface.device_mut().push_recv(&ip_frame(MAC_OTHER, MAC_ROUTER, other, host, IpProtocol::Tcp, &payload));
    // Not our address.
    iface.device_mut().push_recv(&ip_frame(MAC_OTHER, MAC_HOST, other, remote(), IpProtocol::Tcp, &payload));
    // Truncated.
    let mut frame = ip_frame(MAC_OTHER, MAC_HOST, other, host, IpProtocol::Tcp, &payload);
    frame.truncate(frame.len() - 1);
    iface.device_mut().push_recv(&frame);
    // Not IPv6.
    let mut frame = ip_frame(MAC_OTHER, MAC_HOST, other, host, IpProtocol::Tcp, &payload);
    frame[12..14].copy_from_slice(&[0x08, 0x00]);
    iface.device_mut().push_recv(&frame);

    for _ in 0..4 {
        assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
        assert!(!iface.contains_received());
    }
    assert_eq!(iface.device().to_recv(), 0);
    assert!(iface.device().sent().is_empty());
}

#[test]
fn reply_to_multicast_from_unicast() {
    let mut iface = interface();
    let host = iface.link_local_address();
    let other = link_local(MAC_OTHER);
    let all_nodes = Ipv6Address::LINK_LOCAL_ALL_NODES;

    let frame = ip_frame(
        MAC_OTHER, all_nodes.multicast_ethernet().unwrap(),
        other, all_nodes, IpProtocol::Udp, &[1, 2, 3, 4]);
    iface.device_mut().push_recv(&frame);
    assert_eq!(iface.receive_packet(Instant::from_millis(0)), Some(IpProtocol::Udp));

    iface.prepare_reply();
    assert!(!iface.contains_received());
    iface.send().unwrap();

    let (headers, payload) = parse_sent(iface.device().last_sent().unwrap());
    assert_eq!(headers.src_mac, MAC_HOST);
    assert_eq!(headers.dst_mac, MAC_OTHER);
    assert_eq!(headers.src_addr, host);
    assert_eq!(headers.dst_addr, other);
    assert_eq!(headers.hop_limit, crate::layer::ip::DEFAULT_HOP_LIMIT);
    assert_eq!(payload, &[1, 2, 3, 4]);
}

#[test]
fn prepare_send_keeps_payload() {
    let mut iface = interface();
    iface.packet_mut().payload_buffer_mut()[..3].copy_from_slice(b"abc");
    iface.prepare_send(remote(), MAC_ROUTER);
    iface.packet_mut().set_protocol(IpProtocol::Udp);
    iface.packet_mut().set_payload_len(3);
    iface.send().unwrap();

    let (headers, payload) = parse_sent(iface.device().last_sent().unwrap());
    assert_eq!(headers.dst_mac, MAC_ROUTER);
    assert_eq!(headers.src_addr, iface.link_local_address());
    assert_eq!(headers.dst_addr, remote());
    assert_eq!(payload, b"abc");
}

#[test]
fn send_on_dead_link() {
    let mut iface = interface();
    iface.device_mut().set_link_down(true);
    iface.prepare_send(remote(), MAC_ROUTER);
    assert_eq!(iface.send(), Err(Error::Device));
}
