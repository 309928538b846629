//! The link layer interface.
//!
//! An [`Interface`] binds a device, a frame buffer and the addresses of this host together. It is
//! the only owner of packet memory in the stack. Receiving a frame validates its Ethernet and IPv6
//! headers against our addresses and passes control messages to the [icmp layer], which may
//! answer them right away. Whatever remains in the buffer afterwards is the received packet of
//! the application.
//!
//! ## Addresses
//!
//! The link-local address is derived from the MAC address when the interface is created and never
//! changes. A global address is either configured by the user or learned from the first router
//! advertisement with a usable prefix. Packets are accepted for both unicast addresses, for the
//! all-nodes multicast group and for our solicited-node multicast group.
//!
//! ## Next hop
//!
//! Multicast destinations map directly to a multicast MAC. Link-local destinations and those
//! within the /64 of our global address are neighbors, their MAC is looked up in the
//! [`NeighborCache`]. Everything else goes to the default router.
//!
//! [`Interface`]: struct.Interface.html
//! [`NeighborCache`]: struct.NeighborCache.html
//! [icmp layer]: ../icmp/index.html
mod interface;
mod neighbor;
#[cfg(test)]
mod tests;

pub use interface::{
    AddressKind,
    Interface,
};

pub use neighbor::{
    Cache as NeighborCache,
    Error as NeighborError,
    Neighbor,
    NEIGHBOR_CACHE_SIZE,
};

/// Recommended length of the frame buffer.
///
/// Large enough for the TCP segments of this stack, which never exceed the advertised window.
pub const FRAME_BUFFER_LEN: usize = 500;
