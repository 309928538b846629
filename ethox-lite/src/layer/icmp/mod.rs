//! Receiving and sending ICMPv6 messages.
//!
//! Tuned to automate all parts of neighbor and router discovery a host needs *internally*. Control
//! messages are handled while the interface receives them and never reach the application:
//!
//! * Echo requests to one of our addresses are answered in place, reusing the received buffer.
//! * Neighbor solicitations for one of our addresses are answered with an advertisement carrying
//!   our MAC. Solicitations from the unspecified address (duplicate address detection) are
//!   answered to all nodes.
//! * Link layer address options of solicitations and advertisements fill the neighbor cache.
//! * Router advertisements configure the default router and, from the first usable prefix, the
//!   global address.
//!
//! Messages with a wrong checksum are discarded silently, as are neighbor discovery messages that
//! did not originate on the link (hop limit below 255) or carry malformed options. All other
//! message types, echo replies and error messages, stay in the buffer for an upper layer. This is
//! in accordance with RFC 4443:
//!
//! > 2.4 (b) If an ICMPv6 informational message of unknown type is received, it MUST be silently
//! > discarded.
//!
//! but we leave the discarding to the application, which may well want to see them.
//!
//! ## Icmp ping
//!
//! The [`PingClient`] sends echo requests and recognizes the matching reply. It is a
//! [`Connection`] like the tcp client.
//!
//! [`PingClient`]: struct.PingClient.html
//! [`Connection`]: ../socket/trait.Connection.html
use crate::time::Duration;

mod endpoint;
mod ping;
#[cfg(test)]
mod tests;

pub use endpoint::{
    RouterDiscovery,
    send_neighbor_solicitation,
    send_router_solicitation,
};

pub(crate) use endpoint::{
    poll_router_discovery,
    process,
};

pub use ping::PingClient;

/// Interval between router solicitations.
pub const ROUTER_SOLICITATION_TIMEOUT: Duration = Duration::from_millis(3000);

/// Number of router solicitations sent before giving up.
pub const ROUTER_SOLICITATION_ATTEMPTS: u8 = 4;
