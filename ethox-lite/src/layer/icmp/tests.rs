use super::*;
use crate::layer::socket::Connection;
use crate::layer::testing::*;
use crate::time::Instant;
use crate::wire::{icmpv6_packet, Checksum, EthernetAddress, Icmpv6Repr, IpProtocol, Ipv6Address, Ipv6Subnet};
use crate::wire::{NdiscNeighborFlags, NdiscPrefixInfoFlags, NdiscPrefixInformation, NdiscRouterFlags};

static PING_BYTES: [u8; 12] = [0xaa, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0xff];

fn global_prefix() -> Ipv6Address {
    Ipv6Address::new(0x2001, 0xdb8, 1, 0, 0, 0, 0, 0)
}

fn router_advert(lifetime: u64, prefix: Option<NdiscPrefixInformation>) -> Icmpv6Repr {
    Icmpv6Repr::RouterAdvert {
        hop_limit: 64,
        flags: NdiscRouterFlags::empty(),
        router_lifetime: Duration::from_secs(lifetime),
        reachable_time: Duration::from_millis(0),
        retrans_time: Duration::from_millis(0),
        lladdr: Some(MAC_ROUTER),
        mtu: Some(1500),
        prefix_info: prefix,
    }
}

fn autoconf_prefix() -> NdiscPrefixInformation {
    NdiscPrefixInformation {
        prefix_len: 64,
        flags: NdiscPrefixInfoFlags::ON_LINK | NdiscPrefixInfoFlags::ADDRCONF,
        valid_lifetime: Duration::from_secs(86400),
        preferred_lifetime: Duration::from_secs(14400),
        prefix: global_prefix(),
    }
}

fn all_nodes_mac() -> EthernetAddress {
    Ipv6Address::LINK_LOCAL_ALL_NODES.multicast_ethernet().unwrap()
}

#[test]
fn answer_ping() {
    let mut iface = interface();
    let host = iface.link_local_address();
    let other = link_local(MAC_OTHER);

    let request = Icmpv6Repr::EchoRequest { ident: 0x1234, seq_no: 7, payload: PING_BYTES.len() };
    iface.device_mut().push_recv(&icmp_frame(MAC_OTHER, MAC_HOST, other, host, request, &PING_BYTES));

    assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
    assert!(!iface.contains_received());

    let sent = iface.device().last_sent().unwrap();
    let (headers, repr) = parse_icmp(sent);
    assert_eq!(repr, Icmpv6Repr::EchoReply { ident: 0x1234, seq_no: 7, payload: PING_BYTES.len() });
    assert_eq!(headers.src_mac, MAC_HOST);
    assert_eq!(headers.dst_mac, MAC_OTHER);
    assert_eq!(headers.src_addr, host);
    assert_eq!(headers.dst_addr, other);

    let (_, payload) = parse_sent(sent);
    assert_eq!(&payload[8..], &PING_BYTES[..]);
}

#[test]
fn wrong_checksum_dropped() {
    let mut iface = interface();
    let host = iface.link_local_address();
    let other = link_local(MAC_OTHER);

    let request = Icmpv6Repr::EchoRequest { ident: 1, seq_no: 1, payload: PING_BYTES.len() };
    let mut frame = icmp_frame(MAC_OTHER, MAC_HOST, other, host, request, &PING_BYTES);
    let last = frame.len() - 1;
    frame[last] ^= 0x01;
    iface.device_mut().push_recv(&frame);

    assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
    assert!(iface.device().sent().is_empty());
}

#[test]
fn neighbor_solicit_answered() {
    let mut iface = interface();
    let host = iface.link_local_address();
    let other = link_local(MAC_OTHER);
    let group = host.solicited_node_multicast();

    let solicit = Icmpv6Repr::NeighborSolicit { target_addr: host, lladdr: Some(MAC_OTHER) };
    let frame = icmp_frame(MAC_OTHER, group.multicast_ethernet().unwrap(), other, group, solicit, &[]);
    iface.device_mut().push_recv(&frame);

    let now = Instant::from_millis(0);
    assert_eq!(iface.receive_packet(now), None);

    let (headers, repr) = parse_icmp(iface.device().last_sent().unwrap());
    assert_eq!(repr, Icmpv6Repr::NeighborAdvert {
        flags: NdiscNeighborFlags::SOLICITED | NdiscNeighborFlags::OVERRIDE,
        target_addr: host,
        lladdr: Some(MAC_HOST),
    });
    assert_eq!(headers.src_addr, host);
    assert_eq!(headers.dst_addr, other);
    assert_eq!(headers.dst_mac, MAC_OTHER);
    assert_eq!(headers.hop_limit, 255);

    // The solicitation taught us the sender.
    assert_eq!(iface.neighbors().lookup(other, now), Some(MAC_OTHER));
}

#[test]
fn duplicate_address_detection_answered_to_all_nodes() {
    let mut iface = interface();
    let host = iface.link_local_address();
    let group = host.solicited_node_multicast();

    let solicit = Icmpv6Repr::NeighborSolicit { target_addr: host, lladdr: None };
    let frame = icmp_frame(
        MAC_OTHER, group.multicast_ethernet().unwrap(),
        Ipv6Address::UNSPECIFIED, group, solicit, &[]);
    iface.device_mut().push_recv(&frame);

    assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
    let (headers, repr) = parse_icmp(iface.device().last_sent().unwrap());
    assert_eq!(repr, Icmpv6Repr::NeighborAdvert {
        flags: NdiscNeighborFlags::OVERRIDE,
        target_addr: host,
        lladdr: Some(MAC_HOST),
    });
    assert_eq!(headers.dst_addr, Ipv6Address::LINK_LOCAL_ALL_NODES);
    assert_eq!(headers.dst_mac, all_nodes_mac());
    assert_eq!(iface.neighbors().len(), 0);
}

#[test]
fn solicit_for_other_target_ignored() {
    let mut iface = interface();
    let other = link_local(MAC_OTHER);
    let target = link_local(MAC_ROUTER);
    let group = target.solicited_node_multicast();

    // Only the group of our own address passes the destination filter.
    let solicit = Icmpv6Repr::NeighborSolicit { target_addr: target, lladdr: Some(MAC_OTHER) };
    let frame = icmp_frame(MAC_OTHER, group.multicast_ethernet().unwrap(), other, group, solicit, &[]);
    iface.device_mut().push_recv(&frame);

    let host = iface.link_local_address();
    let solicit = Icmpv6Repr::NeighborSolicit { target_addr: target, lladdr: Some(MAC_OTHER) };
    iface.device_mut().push_recv(&icmp_frame(MAC_OTHER, MAC_HOST, other, host, solicit, &[]));

    assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
    assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
    assert!(iface.device().sent().is_empty());
}

#[test]
fn off_link_neighbor_discovery_dropped() {
    let mut iface = interface();
    let host = iface.link_local_address();
    let other = link_local(MAC_OTHER);

    let solicit = Icmpv6Repr::NeighborSolicit { target_addr: host, lladdr: Some(MAC_OTHER) };
    let mut frame = icmp_frame(MAC_OTHER, MAC_HOST, other, host, solicit, &[]);
    // Hop limit, forwarded at least once.
    frame[21] = 254;
    iface.device_mut().push_recv(&frame);

    assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
    assert!(iface.device().sent().is_empty());
    assert_eq!(iface.neighbors().len(), 0);
}

#[test]
fn neighbor_advert_fills_cache() {
    let mut iface = interface();
    let host = iface.link_local_address();
    let other = link_local(MAC_OTHER);

    let advert = Icmpv6Repr::NeighborAdvert {
        flags: NdiscNeighborFlags::SOLICITED,
        target_addr: other,
        lladdr: Some(MAC_OTHER),
    };
    iface.device_mut().push_recv(&icmp_frame(MAC_OTHER, MAC_HOST, other, host, advert, &[]));

    let now = Instant::from_millis(100);
    assert_eq!(iface.receive_packet(now), None);
    assert_eq!(iface.neighbors().lookup(other, now), Some(MAC_OTHER));
    assert_eq!(iface.next_hop(other, now), Ok(MAC_OTHER));
    assert!(iface.device().sent().is_empty());
}

#[test]
fn router_advert_configures() {
    let mut iface = interface();
    let router = link_local(MAC_ROUTER);
    let now = Instant::from_millis(0);
    iface.begin(now);
    assert!(iface.router_discovery().is_active());

    let advert = router_advert(1800, Some(autoconf_prefix()));
    let frame = icmp_frame(
        MAC_ROUTER, all_nodes_mac(),
        router, Ipv6Address::LINK_LOCAL_ALL_NODES, advert, &[]);
    iface.device_mut().push_recv(&frame);

    assert_eq!(iface.receive_packet(now), None);
    assert_eq!(iface.router_mac(), Some(MAC_ROUTER));
    assert_eq!(iface.global_address(), Some(Ipv6Address::new(0x2001, 0xdb8, 1, 0, 0, 0xff, 0xfe00, 1)));
    assert_eq!(iface.neighbors().lookup(router, now), Some(MAC_ROUTER));
    assert!(!iface.router_discovery().is_active());

    let remote = Ipv6Address::new(0x2001, 0xdb8, 2, 0, 0, 0, 0, 1);
    assert_eq!(iface.next_hop(remote, now), Ok(MAC_ROUTER));
}

#[test]
fn router_advert_keeps_global() {
    let mut iface = interface();
    let configured = Ipv6Address::new(0x2001, 0xdb8, 0xff, 0, 0, 0, 0, 5);
    iface.set_global_address(configured);

    let advert = router_advert(1800, Some(autoconf_prefix()));
    let frame = icmp_frame(
        MAC_ROUTER, all_nodes_mac(),
        link_local(MAC_ROUTER), Ipv6Address::LINK_LOCAL_ALL_NODES, advert, &[]);
    iface.device_mut().push_recv(&frame);

    assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
    assert_eq!(iface.global_address(), Some(configured));
    assert_eq!(iface.router_mac(), Some(MAC_ROUTER));
}

#[test]
fn router_advert_without_lifetime() {
    let mut iface = interface();

    let advert = router_advert(0, Some(autoconf_prefix()));
    let frame = icmp_frame(
        MAC_ROUTER, all_nodes_mac(),
        link_local(MAC_ROUTER), Ipv6Address::LINK_LOCAL_ALL_NODES, advert, &[]);
    iface.device_mut().push_recv(&frame);

    assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
    assert_eq!(iface.router_mac(), None);
    assert!(iface.global_address().is_some());
}

#[test]
fn router_advert_malformed_option() {
    let mut iface = interface();
    let router = link_local(MAC_ROUTER);
    let dst = Ipv6Address::LINK_LOCAL_ALL_NODES;

    let advert = router_advert(1800, Some(autoconf_prefix()));
    let mut message = vec![0; advert.buffer_len()];
    advert.emit(icmpv6_packet::new_unchecked_mut(&mut message), router, dst, Checksum::Manual);
    // Source link-layer address at 16, mtu at 24 and the prefix after it.
    message[25] = 0;
    icmpv6_packet::new_unchecked_mut(&mut message).fill_checksum(router, dst);

    let frame = ip_frame(MAC_ROUTER, all_nodes_mac(), router, dst, IpProtocol::Icmpv6, &message);
    iface.device_mut().push_recv(&frame);

    let now = Instant::from_millis(0);
    assert_eq!(iface.receive_packet(now), None);
    assert_eq!(iface.router_mac(), Some(MAC_ROUTER));
    assert_eq!(iface.neighbors().lookup(router, now), Some(MAC_ROUTER));
    assert_eq!(iface.global_address(), None);
}

#[test]
fn router_advert_from_global_source_ignored() {
    let mut iface = interface();
    let src = Ipv6Address::new(0x2001, 0xdb8, 1, 0, 0, 0, 0, 1);

    let advert = router_advert(1800, Some(autoconf_prefix()));
    let frame = icmp_frame(MAC_ROUTER, all_nodes_mac(), src, Ipv6Address::LINK_LOCAL_ALL_NODES, advert, &[]);
    iface.device_mut().push_recv(&frame);

    assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
    assert_eq!(iface.router_mac(), None);
    assert_eq!(iface.global_address(), None);
}

#[test]
fn router_solicitation_schedule() {
    let mut iface = interface();
    let start = Instant::from_millis(1000);
    iface.begin(start);

    let (headers, repr) = parse_icmp(iface.device().last_sent().unwrap());
    assert_eq!(repr, Icmpv6Repr::RouterSolicit { lladdr: Some(MAC_HOST) });
    assert_eq!(headers.dst_addr, Ipv6Address::LINK_LOCAL_ALL_ROUTERS);
    assert_eq!(headers.dst_mac, EthernetAddress([0x33, 0x33, 0, 0, 0, 2]));
    assert_eq!(headers.src_addr, iface.link_local_address());
    assert_eq!(iface.router_discovery().remaining(), ROUTER_SOLICITATION_ATTEMPTS - 1);

    let mut now = start;
    for sent in 2..=usize::from(ROUTER_SOLICITATION_ATTEMPTS) {
        now += ROUTER_SOLICITATION_TIMEOUT - Duration::from_millis(1);
        iface.receive_packet(now);
        assert_eq!(iface.device().sent().len(), sent - 1);

        now += Duration::from_millis(1);
        iface.receive_packet(now);
        assert_eq!(iface.device().sent().len(), sent);
    }

    now += ROUTER_SOLICITATION_TIMEOUT;
    iface.receive_packet(now);
    now += ROUTER_SOLICITATION_TIMEOUT;
    iface.receive_packet(now);
    assert_eq!(iface.device().sent().len(), usize::from(ROUTER_SOLICITATION_ATTEMPTS));
    assert!(!iface.router_discovery().is_active());
}

#[test]
fn no_solicitation_with_configured_router() {
    let mut iface = interface();
    iface.set_router_mac(Some(MAC_ROUTER));
    iface.begin(Instant::from_millis(0));
    iface.receive_packet(Instant::from_millis(10_000));
    assert!(iface.device().sent().is_empty());
}

#[test]
fn ping_reply_matched() {
    let mut iface = interface();
    let host = iface.link_local_address();
    let other = link_local(MAC_OTHER);
    let now = Instant::from_millis(0);
    iface.neighbors_mut().fill(other, MAC_OTHER, None).unwrap();

    let mut ping = PingClient::new(other, 0x4242);
    assert!(ping.socket_mut().resolve(&mut iface, now).is_resolved());
    ping.send_request(&mut iface).unwrap();
    assert_eq!(ping.seq_no(), 1);

    let sent = iface.device_mut().take_sent();
    assert_eq!(sent.len(), 1);
    let (headers, repr) = parse_icmp(&sent[0]);
    assert_eq!(repr, Icmpv6Repr::EchoRequest { ident: 0x4242, seq_no: 0, payload: PingClient::PAYLOAD_LEN });
    assert_eq!(headers.dst_mac, MAC_OTHER);
    assert_eq!(headers.src_addr, host);
    let data = parse_sent(&sent[0]).1[8..].to_vec();

    // A stale reply, then the matching one.
    let stale = Icmpv6Repr::EchoReply { ident: 0x4242, seq_no: 9, payload: data.len() };
    iface.device_mut().push_recv(&icmp_frame(MAC_OTHER, MAC_HOST, other, host, stale, &data));
    let reply = Icmpv6Repr::EchoReply { ident: 0x4242, seq_no: 0, payload: data.len() };
    iface.device_mut().push_recv(&icmp_frame(MAC_OTHER, MAC_HOST, other, host, reply, &data));

    assert!(!ping.have_packet(&mut iface, now));
    assert!(ping.have_packet(&mut iface, now));
    assert_eq!(ping.payload(&iface), &data[..]);
    assert_eq!(ping.payload_len(&iface), PingClient::PAYLOAD_LEN);
}

#[test]
fn ping_reply_from_stranger_ignored() {
    let mut iface = interface();
    let host = iface.link_local_address();
    let other = link_local(MAC_OTHER);
    let stranger = link_local(MAC_ROUTER);
    let now = Instant::from_millis(0);
    iface.neighbors_mut().fill(other, MAC_OTHER, None).unwrap();

    let mut ping = PingClient::new(other, 1);
    ping.socket_mut().resolve(&mut iface, now);
    ping.send_request(&mut iface).unwrap();

    let reply = Icmpv6Repr::EchoReply { ident: 1, seq_no: 0, payload: 0 };
    iface.device_mut().push_recv(&icmp_frame(MAC_ROUTER, MAC_HOST, stranger, host, reply, &[]));
    let reply = Icmpv6Repr::EchoReply { ident: 2, seq_no: 0, payload: 0 };
    iface.device_mut().push_recv(&icmp_frame(MAC_OTHER, MAC_HOST, other, host, reply, &[]));

    assert!(!ping.have_packet(&mut iface, now));
    assert!(!ping.have_packet(&mut iface, now));
}

#[test]
fn ping_needs_resolution() {
    let mut iface = interface();
    let mut ping = PingClient::new(link_local(MAC_OTHER), 1);
    assert_eq!(ping.send_request(&mut iface), Err(crate::layer::Error::Unreachable));
    assert!(iface.device().sent().is_empty());
}

#[test]
fn global_destination_accepted() {
    let mut iface = interface();
    let global = Ipv6Address::from_global_unicast_id(
        Ipv6Subnet::new(global_prefix(), 64),
        crate::wire::InterfaceId::from_vendor_ether(MAC_HOST)).unwrap();
    iface.set_global_address(global);

    let src = Ipv6Address::new(0x2001, 0xdb8, 1, 0, 0, 0, 0, 0x99);
    let request = Icmpv6Repr::EchoRequest { ident: 3, seq_no: 4, payload: 0 };
    iface.device_mut().push_recv(&icmp_frame(MAC_ROUTER, MAC_HOST, src, global, request, &[]));

    assert_eq!(iface.receive_packet(Instant::from_millis(0)), None);
    let (headers, _) = parse_icmp(iface.device().last_sent().unwrap());
    assert_eq!(headers.src_addr, global);
    assert_eq!(headers.dst_addr, src);
    assert_eq!(headers.dst_mac, MAC_ROUTER);
}
