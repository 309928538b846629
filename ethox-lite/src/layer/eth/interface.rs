use super::neighbor::Cache;
use crate::layer::{icmp, ip, Error, Result};
use crate::nic::Device;
use crate::time::Instant;
use crate::wire::{EthernetAddress, InterfaceId, IpProtocol, Ipv6Address, Ipv6Subnet};

/// The role of one of our addresses as a packet destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// Our link-local unicast address.
    LinkLocal,
    /// Our global unicast address.
    Global,
    /// A multicast group we listen to.
    Multicast,
}

/// A network interface with a single frame buffer.
///
/// The buffer either holds the most recently received frame or the frame being assembled for
/// sending. [`contains_received`] tells the two apart. Any send overwrites a received frame.
///
/// [`contains_received`]: #method.contains_received
#[derive(Debug)]
pub struct Interface<D, C> {
    device: D,
    packet: ip::Packet<C>,
    /// The buffer holds an unconsumed received packet.
    received: bool,
    mac: EthernetAddress,
    link_local: Ipv6Address,
    global: Option<Ipv6Address>,
    router_mac: Option<EthernetAddress>,
    neighbors: Cache,
    discovery: icmp::RouterDiscovery,
}

impl<D: Device, C: AsRef<[u8]> + AsMut<[u8]>> Interface<D, C> {
    /// Create an interface with a MAC address and a frame buffer.
    ///
    /// The link-local address is derived from the MAC address. Fails with `Error::BadSize` if the
    /// buffer can not even hold the headers.
    pub fn new(device: D, buffer: C, mac: EthernetAddress) -> Result<Self> {
        let packet = ip::Packet::new(buffer)?;
        let link_local = Ipv6Address::from_link_local_id(InterfaceId::from_vendor_ether(mac));

        Ok(Interface {
            device,
            packet,
            received: false,
            mac,
            link_local,
            global: None,
            router_mac: None,
            neighbors: Cache::new(),
            discovery: icmp::RouterDiscovery::new(),
        })
    }

    /// Bring the interface up.
    ///
    /// Starts router discovery unless a router is already known, which immediately sends the
    /// first router solicitation.
    pub fn begin(&mut self, now: Instant) {
        if self.router_mac.is_none() {
            self.discovery.start(now);
        }

        icmp::poll_router_discovery(self, now);
    }

    /// Our hardware address.
    pub fn ethernet_address(&self) -> EthernetAddress {
        self.mac
    }

    /// Our link-local address.
    pub fn link_local_address(&self) -> Ipv6Address {
        self.link_local
    }

    /// Our global address, if configured or learned.
    pub fn global_address(&self) -> Option<Ipv6Address> {
        self.global
    }

    /// Configure the global address.
    ///
    /// A configured address is never replaced by one learned from router advertisements.
    pub fn set_global_address(&mut self, addr: Ipv6Address) {
        self.global = Some(addr);
    }

    /// The hardware address of the default router.
    pub fn router_mac(&self) -> Option<EthernetAddress> {
        self.router_mac
    }

    /// Configure the default router, stopping router discovery.
    pub fn set_router_mac(&mut self, mac: Option<EthernetAddress>) {
        if mac.is_some() {
            self.discovery.stop();
        }
        self.router_mac = mac;
    }

    /// The state of router discovery.
    pub fn router_discovery(&self) -> &icmp::RouterDiscovery {
        &self.discovery
    }

    pub(crate) fn router_discovery_mut(&mut self) -> &mut icmp::RouterDiscovery {
        &mut self.discovery
    }

    /// The neighbor cache.
    pub fn neighbors(&self) -> &Cache {
        &self.neighbors
    }

    /// The neighbor cache, for manual entries.
    pub fn neighbors_mut(&mut self) -> &mut Cache {
        &mut self.neighbors
    }

    /// The device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The device, mutably.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// The packet in the frame buffer.
    pub fn packet(&self) -> &ip::Packet<C> {
        &self.packet
    }

    /// The packet in the frame buffer, mutably.
    pub fn packet_mut(&mut self) -> &mut ip::Packet<C> {
        &mut self.packet
    }

    /// Check if the buffer holds a received packet that was not answered or discarded yet.
    pub fn contains_received(&self) -> bool {
        self.received
    }

    /// Mark the received packet as consumed.
    pub fn discard_received(&mut self) {
        self.received = false;
    }

    /// Check if the address is one of our unicast addresses.
    pub fn is_our_address(&self, addr: Ipv6Address) -> bool {
        match self.address_kind(addr) {
            Some(AddressKind::LinkLocal) | Some(AddressKind::Global) => true,
            _ => false,
        }
    }

    /// Classify a destination address as one of ours.
    pub fn address_kind(&self, addr: Ipv6Address) -> Option<AddressKind> {
        if addr == self.link_local {
            Some(AddressKind::LinkLocal)
        } else if Some(addr) == self.global {
            Some(AddressKind::Global)
        } else if addr == Ipv6Address::LINK_LOCAL_ALL_NODES
            || addr == self.link_local.solicited_node_multicast()
            || self.global.map(|global| global.solicited_node_multicast()) == Some(addr)
        {
            Some(AddressKind::Multicast)
        } else {
            None
        }
    }

    /// Check if an address is reachable without a router.
    pub fn is_on_link(&self, addr: Ipv6Address) -> bool {
        if addr.is_link_local() || addr.is_multicast() {
            return true;
        }

        match self.global {
            Some(global) => Ipv6Subnet::new(global, 64).contains(addr),
            None => false,
        }
    }

    /// Select our source address for a destination.
    ///
    /// Link scoped destinations get the link-local address, all others the global address if we
    /// have one.
    pub fn source_for(&self, dst_addr: Ipv6Address) -> Ipv6Address {
        // Multicast scope is the low nibble of the second byte, 2 is link-local.
        let link_scope = dst_addr.is_link_local()
            || (dst_addr.is_multicast() && dst_addr.0[1] & 0x0f <= 2);

        match self.global {
            Some(global) if !link_scope => global,
            _ => self.link_local,
        }
    }

    /// Find the hardware address to send a packet for `dst_addr` to.
    ///
    /// Fails with `Error::Unreachable` when the neighbor is not resolved or, for off-link
    /// destinations, when there is no router.
    pub fn next_hop(&self, dst_addr: Ipv6Address, now: Instant) -> Result<EthernetAddress> {
        if dst_addr.is_multicast() {
            return dst_addr.multicast_ethernet().ok_or(Error::Unreachable);
        }

        if self.is_on_link(dst_addr) {
            self.neighbors.lookup(dst_addr, now).ok_or(Error::Unreachable)
        } else {
            self.router_mac.ok_or(Error::Unreachable)
        }
    }

    /// Read and process at most one frame.
    ///
    /// Also runs router discovery. Frames that are not IPv6 packets for one of our addresses are
    /// dropped. Control messages are answered right away. Returns the upper layer protocol of a
    /// packet left in the buffer for the application.
    pub fn receive_packet(&mut self, now: Instant) -> Option<IpProtocol> {
        icmp::poll_router_discovery(self, now);

        self.received = false;
        let len = match self.device.recv_frame(self.packet.as_bytes_mut()) {
            Ok(0) => return None,
            Ok(len) => len,
            Err(err) => {
                net_debug!("eth: receive failed: {}", err);
                return None;
            },
        };

        if let Err(err) = self.packet.check_received(len) {
            net_trace!("eth: dropped frame of {} bytes: {}", len, err);
            return None;
        }

        let dst_mac = self.packet.dst_mac();
        if dst_mac != self.mac && !dst_mac.is_multicast() {
            net_trace!("eth: dropped frame for {}", dst_mac);
            return None;
        }

        let dst_addr = self.packet.dst_addr();
        if self.address_kind(dst_addr).is_none() {
            net_trace!("eth: dropped packet for {}", dst_addr);
            return None;
        }

        self.received = true;
        let protocol = self.packet.protocol();
        if protocol == IpProtocol::Icmpv6 {
            icmp::process(self, now);
        }

        if self.received {
            Some(protocol)
        } else {
            None
        }
    }

    /// Initialize the headers for a new packet.
    ///
    /// The upper layer payload already in the buffer is kept.
    pub fn prepare_send(&mut self, dst_addr: Ipv6Address, dst_mac: EthernetAddress) {
        let src_addr = self.source_for(dst_addr);
        self.received = false;
        self.packet.init();
        self.packet.set_src_mac(self.mac);
        self.packet.set_dst_mac(dst_mac);
        self.packet.set_src_addr(src_addr);
        self.packet.set_dst_addr(dst_addr);
    }

    /// Turn the received packet into a reply to its sender.
    ///
    /// Swaps the endpoints, resets the hop limit and fixes our addresses. A packet that was sent
    /// to a multicast group is answered from our unicast address.
    pub fn prepare_reply(&mut self) {
        self.received = false;
        self.packet.swap_endpoints();
        self.packet.set_hop_limit(ip::DEFAULT_HOP_LIMIT);
        self.packet.set_src_mac(self.mac);

        if !self.is_our_address(self.packet.src_addr()) {
            let src_addr = self.source_for(self.packet.dst_addr());
            self.packet.set_src_addr(src_addr);
        }
    }

    /// Transmit the frame in the buffer.
    ///
    /// The frame length is taken from the payload length field.
    pub fn send(&mut self) -> Result<()> {
        self.received = false;
        net_trace!("eth: send {} bytes to {}", self.packet.frame_len(), self.packet.dst_addr());
        self.device.send_frame(self.packet.frame_bytes())
    }
}
