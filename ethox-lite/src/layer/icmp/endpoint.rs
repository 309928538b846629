use super::{ROUTER_SOLICITATION_ATTEMPTS, ROUTER_SOLICITATION_TIMEOUT};
use crate::layer::{eth::Interface, ip, Error, Result};
use crate::nic::Device;
use crate::time::{Duration, Expiration, Instant};
use crate::wire::{Checksum, EthernetAddress, InterfaceId, IpProtocol, Ipv6Address, Ipv6Subnet};
use crate::wire::{icmpv6_packet, Icmpv6Message, Icmpv6Repr, NdiscNeighborFlags, NdiscOptionRepr};
use crate::wire::Error as WireError;

/// Progress of soliciting a router.
///
/// Solicitations are sent periodically after the interface came up until a router advertised
/// itself or the attempts are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterDiscovery {
    next_at: Expiration,
    remaining: u8,
}

impl RouterDiscovery {
    /// An inactive discovery.
    pub fn new() -> Self {
        RouterDiscovery {
            next_at: Expiration::Never,
            remaining: 0,
        }
    }

    /// Restart, sending the first solicitation at `now`.
    pub fn start(&mut self, now: Instant) {
        self.next_at = Expiration::When(now);
        self.remaining = ROUTER_SOLICITATION_ATTEMPTS;
    }

    /// Stop, a router is known.
    pub fn stop(&mut self) {
        self.next_at = Expiration::Never;
        self.remaining = 0;
    }

    /// Check if solicitations are still pending or awaiting an answer.
    pub fn is_active(&self) -> bool {
        self.next_at != Expiration::Never
    }

    /// The number of solicitations not yet sent.
    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    /// Consume one attempt if one is due.
    fn due(&mut self, now: Instant) -> bool {
        if !self.next_at.is_expired(now) {
            return false;
        }

        if self.remaining == 0 {
            net_debug!("icmp: no router answered");
            self.next_at = Expiration::Never;
            return false;
        }

        self.remaining -= 1;
        self.next_at = Expiration::When(now + ROUTER_SOLICITATION_TIMEOUT);
        true
    }
}

impl Default for RouterDiscovery {
    fn default() -> Self {
        RouterDiscovery::new()
    }
}

/// Send a router solicitation if one is due.
pub(crate) fn poll_router_discovery<D, C>(iface: &mut Interface<D, C>, now: Instant)
where
    D: Device,
    C: AsRef<[u8]> + AsMut<[u8]>,
{
    if iface.router_mac().is_some() {
        iface.router_discovery_mut().stop();
        return;
    }

    if !iface.router_discovery_mut().due(now) {
        return;
    }

    match send_router_solicitation(iface) {
        Ok(()) => { net_debug!("icmp: sent router solicitation"); },
        Err(err) => { net_debug!("icmp: router solicitation failed: {}", err); },
    }
}

/// Send a router solicitation to all routers.
///
/// Overwrites the frame buffer.
pub fn send_router_solicitation<D, C>(iface: &mut Interface<D, C>) -> Result<()>
where
    D: Device,
    C: AsRef<[u8]> + AsMut<[u8]>,
{
    let dst_addr = Ipv6Address::LINK_LOCAL_ALL_ROUTERS;
    let dst_mac = dst_addr.multicast_ethernet().ok_or(Error::Unreachable)?;
    iface.prepare_send(dst_addr, dst_mac);

    let repr = Icmpv6Repr::RouterSolicit {
        lladdr: Some(iface.ethernet_address()),
    };
    emit(iface, &repr)
}

/// Send a neighbor solicitation for `target` to its solicited-node multicast group.
///
/// Overwrites the frame buffer.
pub fn send_neighbor_solicitation<D, C>(iface: &mut Interface<D, C>, target: Ipv6Address)
    -> Result<()>
where
    D: Device,
    C: AsRef<[u8]> + AsMut<[u8]>,
{
    if !target.is_unicast() {
        return Err(Error::Illegal);
    }

    let dst_addr = target.solicited_node_multicast();
    let dst_mac = dst_addr.multicast_ethernet().ok_or(Error::Unreachable)?;
    let src_addr = iface.source_for(target);
    iface.prepare_send(dst_addr, dst_mac);
    iface.packet_mut().set_src_addr(src_addr);

    let repr = Icmpv6Repr::NeighborSolicit {
        target_addr: target,
        lladdr: Some(iface.ethernet_address()),
    };
    emit(iface, &repr)
}

/// Write a message behind the prepared headers and send it.
fn emit<D, C>(iface: &mut Interface<D, C>, repr: &Icmpv6Repr) -> Result<()>
where
    D: Device,
    C: AsRef<[u8]> + AsMut<[u8]>,
{
    let len = repr.buffer_len();
    let packet = iface.packet_mut();
    if len > packet.capacity() {
        return Err(Error::BadSize);
    }

    packet.set_protocol(IpProtocol::Icmpv6);
    packet.set_payload_len(len as u16);
    let (src_addr, dst_addr) = (packet.src_addr(), packet.dst_addr());
    let icmp = icmpv6_packet::new_unchecked_mut(packet.payload_mut());
    repr.emit(icmp, src_addr, dst_addr, Checksum::Manual);

    iface.send()
}

/// Handle the received ICMPv6 packet in the buffer.
///
/// Consumes the packet unless it is meant for an upper layer.
pub(crate) fn process<D, C>(iface: &mut Interface<D, C>, now: Instant)
where
    D: Device,
    C: AsRef<[u8]> + AsMut<[u8]>,
{
    let packet = iface.packet();
    let (src_addr, dst_addr) = (packet.src_addr(), packet.dst_addr());
    let src_mac = packet.src_mac();
    let hop_limit = packet.hop_limit();

    let icmp = match icmpv6_packet::new_checked(packet.payload()) {
        Ok(icmp) => icmp,
        Err(err) => {
            net_debug!("icmp: dropped packet from {}: {}", src_addr, err);
            iface.discard_received();
            return;
        },
    };

    if !icmp.verify_checksum(src_addr, dst_addr) {
        net_debug!("icmp: wrong checksum from {}", src_addr);
        iface.discard_received();
        return;
    }

    let msg_type = icmp.msg_type();
    if msg_type.is_ndisc() && (hop_limit != ip::DEFAULT_HOP_LIMIT || icmp.msg_code() != 0) {
        net_debug!("icmp: dropped off-link {} from {}", msg_type, src_addr);
        iface.discard_received();
        return;
    }

    if msg_type == Icmpv6Message::RouterAdvert {
        return process_router_advert(iface, src_addr, src_mac, now);
    }

    let repr = match Icmpv6Repr::parse(icmp, src_addr, dst_addr, Checksum::Ignored) {
        Ok(repr) => repr,
        // Errors and unknown messages are for the application.
        Err(WireError::Unsupported) | Err(WireError::Unrecognized) => return,
        Err(err) => {
            net_debug!("icmp: dropped {} from {}: {}", msg_type, src_addr, err);
            iface.discard_received();
            return;
        },
    };

    match repr {
        Icmpv6Repr::EchoRequest { .. } => answer_echo(iface, repr),
        Icmpv6Repr::NeighborSolicit { target_addr, lladdr } =>
            answer_neighbor_solicit(iface, src_addr, src_mac, target_addr, lladdr, now),
        Icmpv6Repr::NeighborAdvert { target_addr, lladdr, .. } => {
            iface.discard_received();
            learn_neighbor(iface, target_addr, lladdr.unwrap_or(src_mac), now);
        },
        Icmpv6Repr::RouterSolicit { .. } => {
            // We are not a router.
            iface.discard_received();
        },
        Icmpv6Repr::EchoReply { .. } | Icmpv6Repr::RouterAdvert { .. } => (),
    }
}

fn answer_echo<D, C>(iface: &mut Interface<D, C>, request: Icmpv6Repr)
where
    D: Device,
    C: AsRef<[u8]> + AsMut<[u8]>,
{
    let reply = match request.echo_reply() {
        Some(reply) => reply,
        None => return,
    };

    // The payload stays in place, only headers change.
    iface.prepare_reply();
    if let Err(err) = emit(iface, &reply) {
        net_debug!("icmp: echo reply failed: {}", err);
    }
}

fn answer_neighbor_solicit<D, C>(
    iface: &mut Interface<D, C>,
    src_addr: Ipv6Address,
    src_mac: EthernetAddress,
    target_addr: Ipv6Address,
    lladdr: Option<EthernetAddress>,
    now: Instant,
)
where
    D: Device,
    C: AsRef<[u8]> + AsMut<[u8]>,
{
    iface.discard_received();
    if !iface.is_our_address(target_addr) {
        return;
    }

    let (dst_addr, dst_mac, flags) = if src_addr.is_unspecified() {
        // Duplicate address detection of another node, tell everyone.
        let all_nodes = Ipv6Address::LINK_LOCAL_ALL_NODES;
        let dst_mac = all_nodes.multicast_ethernet().unwrap_or(EthernetAddress::BROADCAST);
        (all_nodes, dst_mac, NdiscNeighborFlags::OVERRIDE)
    } else {
        let dst_mac = lladdr.unwrap_or(src_mac);
        learn_neighbor(iface, src_addr, dst_mac, now);
        (src_addr, dst_mac, NdiscNeighborFlags::SOLICITED | NdiscNeighborFlags::OVERRIDE)
    };

    iface.prepare_send(dst_addr, dst_mac);
    iface.packet_mut().set_src_addr(target_addr);

    let advert = Icmpv6Repr::NeighborAdvert {
        flags,
        target_addr,
        lladdr: Some(iface.ethernet_address()),
    };

    match emit(iface, &advert) {
        Ok(()) => { net_trace!("icmp: advertised {} to {}", target_addr, dst_addr); },
        Err(err) => { net_debug!("icmp: neighbor advertisement failed: {}", err); },
    }
}

fn learn_neighbor<D, C>(
    iface: &mut Interface<D, C>,
    addr: Ipv6Address,
    mac: EthernetAddress,
    now: Instant,
)
where
    D: Device,
    C: AsRef<[u8]> + AsMut<[u8]>,
{
    if !addr.is_unicast() || !mac.is_unicast() {
        return;
    }

    if let Err(err) = iface.neighbors_mut().fill(addr, mac, Some(now)) {
        net_debug!("icmp: neighbor {} not cached: {:?}", addr, err);
    }
}

fn process_router_advert<D, C>(
    iface: &mut Interface<D, C>,
    src_addr: Ipv6Address,
    src_mac: EthernetAddress,
    now: Instant,
)
where
    D: Device,
    C: AsRef<[u8]> + AsMut<[u8]>,
{
    iface.discard_received();
    if !src_addr.is_link_local() {
        net_debug!("icmp: router advertisement from non link-local {}", src_addr);
        return;
    }

    let mut lladdr = None;
    let mut prefix: Option<Ipv6Subnet> = None;
    let router_lifetime = {
        let icmp = icmpv6_packet::new_unchecked(iface.packet().payload());
        // Options after a malformed one can not be located, keep what was learned before.
        for option in icmp.options() {
            let option = match option.and_then(NdiscOptionRepr::parse) {
                Ok(option) => option,
                Err(err) => {
                    net_debug!("icmp: malformed router advertisement option: {}", err);
                    break;
                },
            };

            match option {
                NdiscOptionRepr::SourceLinkLayerAddr(addr) => lladdr = Some(addr),
                NdiscOptionRepr::PrefixInformation(info) if prefix.is_none() && info.is_autoconf() =>
                    prefix = info.subnet(),
                _ => (),
            }
        }
        icmp.router_lifetime()
    };

    learn_neighbor(iface, src_addr, lladdr.unwrap_or(src_mac), now);

    if router_lifetime > Duration::from_secs(0) && src_mac.is_unicast() {
        if iface.router_mac() != Some(src_mac) {
            net_debug!("icmp: default router {} at {}", src_addr, src_mac);
        }
        iface.set_router_mac(Some(src_mac));
    }

    if iface.global_address().is_some() {
        return;
    }

    let id = InterfaceId::from_vendor_ether(iface.ethernet_address());
    if let Some(global) = prefix.and_then(|subnet| Ipv6Address::from_global_unicast_id(subnet, id)) {
        net_debug!("icmp: configured global address {}", global);
        iface.set_global_address(global);
    }
}
