//! Connection endpoints and their common capabilities.
//!
//! A [`Socket`] stores the remote address and port of a connection together with the progress of
//! resolving the link layer address of the remote, or of the router for off-link remotes. It does
//! not own packet memory. Connection types embed a socket and implement [`Connection`], which
//! locates their payload within the shared frame buffer of an interface and sends it.
//!
//! ## Resolution
//!
//! Before anything can be sent the remote MAC must be known. [`Socket::resolve`] is polled until
//! it returns `Resolved` or `Failed`. Each poll also receives one frame on the interface so that
//! neighbor advertisements are processed, other packets received meanwhile are lost. A
//! solicitation is repeated after [`NEIGHBOR_SOLICITATION_TIMEOUT`] up to
//! [`NEIGHBOR_SOLICITATION_ATTEMPTS`] times.
//!
//! [`Socket`]: struct.Socket.html
//! [`Socket::resolve`]: struct.Socket.html#method.resolve
//! [`Connection`]: trait.Connection.html
//! [`NEIGHBOR_SOLICITATION_TIMEOUT`]: constant.NEIGHBOR_SOLICITATION_TIMEOUT.html
//! [`NEIGHBOR_SOLICITATION_ATTEMPTS`]: constant.NEIGHBOR_SOLICITATION_ATTEMPTS.html
use core::ops::RangeInclusive;

use crate::layer::{eth::Interface, icmp, Error, Result};
use crate::nic::Device;
use crate::time::{Duration, Instant};
use crate::wire::{EthernetAddress, Ipv6Address};

/// Interval between neighbor solicitations for an unresolved remote.
pub const NEIGHBOR_SOLICITATION_TIMEOUT: Duration = Duration::from_millis(1000);

/// Number of neighbor solicitations sent before resolution fails.
pub const NEIGHBOR_SOLICITATION_ATTEMPTS: u8 = 3;

/// Local ports for outbound connections, the dynamic range of RFC 6335.
pub const EPHEMERAL_PORTS: RangeInclusive<u16> = 49152..=65535;

/// Progress of resolving the link layer address of a remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing was tried yet.
    Unresolved,
    /// Solicitations were sent, waiting for an advertisement.
    Pending {
        /// Solicitations that may still be sent.
        remaining: u8,
        /// When to send the next one or give up.
        retry_at: Instant,
    },
    /// The frames for the remote go to this address.
    Resolved(EthernetAddress),
    /// No answer, or no router for an off-link remote.
    Failed,
}

impl Resolution {
    /// Check if the remote MAC is known.
    pub fn is_resolved(&self) -> bool {
        match self {
            Resolution::Resolved(_) => true,
            _ => false,
        }
    }

    /// Check if resolution was given up.
    pub fn is_failed(&self) -> bool {
        *self == Resolution::Failed
    }
}

/// The remote endpoint of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Socket {
    remote_addr: Ipv6Address,
    remote_port: u16,
    local_port: u16,
    resolution: Resolution,
}

impl Socket {
    /// Create a socket for a remote endpoint.
    ///
    /// The local port starts at the beginning of the ephemeral range.
    pub fn new(remote_addr: Ipv6Address, remote_port: u16) -> Self {
        Socket {
            remote_addr,
            remote_port,
            local_port: *EPHEMERAL_PORTS.start(),
            resolution: Resolution::Unresolved,
        }
    }

    /// The remote address.
    pub fn remote_addr(&self) -> Ipv6Address {
        self.remote_addr
    }

    /// The remote port.
    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    /// The local port.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Change the remote endpoint, which restarts resolution.
    pub fn set_remote(&mut self, remote_addr: Ipv6Address, remote_port: u16) {
        self.remote_addr = remote_addr;
        self.remote_port = remote_port;
        self.resolution = Resolution::Unresolved;
    }

    /// Set the local port.
    pub fn set_local_port(&mut self, port: u16) {
        self.local_port = port;
    }

    /// Advance to the next local port, wrapping within the ephemeral range.
    pub fn next_local_port(&mut self) -> u16 {
        self.local_port = match self.local_port.checked_add(1) {
            Some(port) if EPHEMERAL_PORTS.contains(&port) => port,
            _ => *EPHEMERAL_PORTS.start(),
        };
        self.local_port
    }

    /// The resolution progress.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// The resolved remote MAC.
    pub fn remote_mac(&self) -> Option<EthernetAddress> {
        match self.resolution {
            Resolution::Resolved(mac) => Some(mac),
            _ => None,
        }
    }

    /// Forget the resolved MAC, or a failure, to resolve again.
    pub fn reset_resolution(&mut self) {
        self.resolution = Resolution::Unresolved;
    }

    /// Make progress on resolving the remote MAC.
    ///
    /// Receives at most one frame on the interface and may send a neighbor solicitation, both
    /// overwrite the frame buffer. Off-link remotes resolve to the router once it is known; while
    /// router discovery is still running they stay `Unresolved`.
    pub fn resolve<D, C>(&mut self, iface: &mut Interface<D, C>, now: Instant) -> Resolution
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        match self.resolution {
            Resolution::Resolved(_) | Resolution::Failed => return self.resolution,
            _ => (),
        }

        if let Ok(mac) = iface.next_hop(self.remote_addr, now) {
            return self.resolved(mac);
        }

        iface.receive_packet(now);
        if let Ok(mac) = iface.next_hop(self.remote_addr, now) {
            return self.resolved(mac);
        }

        if !iface.is_on_link(self.remote_addr) {
            if !iface.router_discovery().is_active() {
                net_debug!("socket: no router towards {}", self.remote_addr);
                self.resolution = Resolution::Failed;
            }
            return self.resolution;
        }

        let remaining = match self.resolution {
            Resolution::Unresolved => NEIGHBOR_SOLICITATION_ATTEMPTS,
            Resolution::Pending { retry_at, .. } if now < retry_at => return self.resolution,
            Resolution::Pending { remaining: 0, .. } => {
                net_debug!("socket: {} did not answer", self.remote_addr);
                self.resolution = Resolution::Failed;
                return self.resolution;
            },
            Resolution::Pending { remaining, .. } => remaining,
            Resolution::Resolved(_) | Resolution::Failed => return self.resolution,
        };

        if let Err(err) = icmp::send_neighbor_solicitation(iface, self.remote_addr) {
            net_debug!("socket: neighbor solicitation failed: {}", err);
        }

        self.resolution = Resolution::Pending {
            remaining: remaining - 1,
            retry_at: now + NEIGHBOR_SOLICITATION_TIMEOUT,
        };
        self.resolution
    }

    fn resolved(&mut self, mac: EthernetAddress) -> Resolution {
        net_trace!("socket: {} is at {}", self.remote_addr, mac);
        self.resolution = Resolution::Resolved(mac);
        self.resolution
    }

    /// Initialize the headers of the frame buffer for a packet to the remote.
    ///
    /// Fails with `Error::Unreachable` when the remote MAC is not resolved.
    pub fn prepare_send<D, C>(&self, iface: &mut Interface<D, C>) -> Result<()>
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        let dst_mac = self.remote_mac().ok_or(Error::Unreachable)?;
        iface.prepare_send(self.remote_addr, dst_mac);
        Ok(())
    }

    /// Check if the received packet was sent by the remote to one of our addresses.
    pub fn is_from_remote<D, C>(&self, iface: &Interface<D, C>) -> bool
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        let packet = iface.packet();
        iface.contains_received()
            && packet.src_addr() == self.remote_addr
            && iface.is_our_address(packet.dst_addr())
    }
}

/// The capabilities of a connection type.
///
/// Implemented by each protocol client on top of an embedded [`Socket`]. The required methods
/// locate the protocol payload in the frame buffer and finish a packet whose payload is in place,
/// the provided `send` prepares the lower headers first.
///
/// [`Socket`]: struct.Socket.html
pub trait Connection {
    /// The embedded socket.
    fn socket(&self) -> &Socket;

    /// The embedded socket, mutably.
    fn socket_mut(&mut self) -> &mut Socket;

    /// The payload of the received packet.
    fn payload<'a, D, C>(&self, iface: &'a Interface<D, C>) -> &'a [u8]
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>;

    /// The region where the payload of the next sent packet must be written.
    fn transmit_payload<'a, D, C>(&self, iface: &'a mut Interface<D, C>) -> &'a mut [u8]
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>;

    /// Write the protocol header for a payload of `len` bytes and send the packet.
    ///
    /// The IPv6 and Ethernet headers are already prepared.
    fn send_internal<D, C>(&mut self, iface: &mut Interface<D, C>, len: usize) -> Result<()>
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>;

    /// The length of the payload of the received packet.
    fn payload_len<D, C>(&self, iface: &Interface<D, C>) -> usize
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.payload(iface).len()
    }

    /// Send `len` bytes of the transmit payload.
    ///
    /// A reply goes back to the sender of the received packet, otherwise the packet is addressed
    /// to the remote of the socket.
    fn send<D, C>(&mut self, iface: &mut Interface<D, C>, len: usize, is_reply: bool) -> Result<()>
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        if is_reply {
            iface.prepare_reply();
        } else {
            self.socket().prepare_send(iface)?;
        }

        self.send_internal(iface, len)
    }
}
