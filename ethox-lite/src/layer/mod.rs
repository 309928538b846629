//! The process logic of protocol layers.
//!
//! ## Layering
//!
//! Each protocol layer is split into two parts; the packet logic contained in `wire` and the
//! processing part in this module. The [`Interface`] owns the device and the one frame buffer of
//! the stack, everything else operates on it by reference. It validates inbound frames and answers
//! neighbor discovery and echo requests on its own through [`icmp`]. What remains in the buffer
//! after a poll is for the application or one of its connections.
//!
//! ## Connections
//!
//! Connections do not own any packet memory either. A [`Socket`] holds the remote endpoint and
//! the state of resolving its link layer address. Connection types ([`tcp::Client`],
//! [`icmp::PingClient`]) embed a socket and implement the [`Connection`] capability to find their
//! payload within the shared frame buffer and to send it.
//!
//! ## Polling
//!
//! Nothing happens on its own. Each poll function takes the current time and does a bounded
//! amount of work: read at most one frame, send at most one reply, advance timers. Sending always
//! overwrites the buffer so a received payload must be consumed before asking for anything else.
//!
//! [`Interface`]: eth/struct.Interface.html
//! [`icmp`]: icmp/index.html
//! [`Socket`]: socket/struct.Socket.html
//! [`Connection`]: socket/trait.Connection.html
//! [`tcp::Client`]: tcp/struct.Client.html
//! [`icmp::PingClient`]: icmp/struct.PingClient.html
use core::fmt;

pub mod eth;
pub mod icmp;
pub mod ip;
pub mod socket;
pub mod tcp;

#[cfg(test)]
mod testing;

/// The result type of layer operations.
pub type Result<T> = core::result::Result<T, Error>;

/// The error type of layer operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// The operation was not permitted.
    ///
    /// Returned when the interface or connection is not in a state to perform an operation, or
    /// when a packet could not be interpreted.
    Illegal,

    /// Not enough space for the requested packet.
    ///
    /// The payload does not fit into the frame buffer of the interface. In contrast to `Illegal`
    /// this would signal that a smaller size may be possible.
    BadSize,

    /// Unable to find a route towards the destination address.
    ///
    /// Either the link layer address of the remote is not resolved yet or there is no router for
    /// an off-link destination.
    Unreachable,

    /// The action could not be completed because there were not enough resources.
    ///
    /// The main difference towards `Illegal` is that implies that it would have been legal with
    /// more resources.
    Exhausted,

    /// The device refused to send or receive a frame.
    Device,
}

/// Can convert from a wire error.
///
/// This indicates some layer tried to operate on a packet but failed.
impl From<crate::wire::Error> for Error {
    fn from(_: crate::wire::Error) -> Self {
        Error::Illegal
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Error::Illegal => "operation not permitted in this state",
            Error::BadSize => "packet does not fit the frame buffer",
            Error::Unreachable => "destination unreachable",
            Error::Exhausted => "out of resources",
            Error::Device => "device error",
        })
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error { }
