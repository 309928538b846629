//! The TCP client.
//!
//! Offers a single actively opened connection on top of the interface. A listening side is not
//! supported: a SYN for anything but our own connection attempt is dropped, other segments for
//! ports we do not own are answered with a reset.
//!
//! ## Polling
//!
//! The [`Client`] has no timers of its own. Each call to [`Client::poll`] reads at most one frame,
//! answers it if required and advances the clocks from the provided `Instant`:
//!
//! * A periodic tick every [`PERIODIC_TIMEOUT`] counts down the retransmission timer while bytes
//!   are unacknowledged. The timer and the round trip estimate are counted in ticks.
//! * When the timer expires the outstanding segment is sent again with exponential backoff. The
//!   SYN and the FIN are resent by the client itself. Data is not stored anywhere, the application
//!   is told to resend it through [`Activity::REXMIT`] and calls `send` with the same bytes.
//! * After [`MAX_SYN_RETRANSMITS`] resent SYNs or [`MAX_RETRANSMITS`] resent segments the
//!   connection is reset and marked as timed out. The next poll moves it to `Disconnected`.
//! * If nothing happened for [`INACTIVITY_TIMEOUT`] the poll recommends a reset. What to do with
//!   that is left to the application.
//!
//! The outcome of each poll is an [`Activity`] value. The client also keeps it until the next
//! poll, for the flag accessors.
//!
//! ## Segments
//!
//! Control segments (pure ACK, FIN, RST) carry a header of [`RECEIVE_HEADER_LEN`] bytes. The SYN
//! and data segments carry one option line with the maximum segment size, [`TRANSMIT_HEADER_LEN`]
//! bytes in total, so data to send is written at that offset into the transmit payload. The
//! advertised window and segment size are both [`WINDOW_SIZE`], which is what fits into the
//! recommended frame buffer.
//!
//! An inbound FIN is only accepted when all our data was acknowledged. Otherwise it is ignored
//! and the peer has to retransmit it.
//!
//! [`Client`]: struct.Client.html
//! [`Client::poll`]: struct.Client.html#method.poll
//! [`Activity`]: struct.Activity.html
//! [`Activity::REXMIT`]: struct.Activity.html#associatedconstant.REXMIT
//! [`PERIODIC_TIMEOUT`]: constant.PERIODIC_TIMEOUT.html
//! [`MAX_SYN_RETRANSMITS`]: constant.MAX_SYN_RETRANSMITS.html
//! [`MAX_RETRANSMITS`]: constant.MAX_RETRANSMITS.html
//! [`INACTIVITY_TIMEOUT`]: constant.INACTIVITY_TIMEOUT.html
//! [`RECEIVE_HEADER_LEN`]: constant.RECEIVE_HEADER_LEN.html
//! [`TRANSMIT_HEADER_LEN`]: constant.TRANSMIT_HEADER_LEN.html
//! [`WINDOW_SIZE`]: constant.WINDOW_SIZE.html
use crate::time::Duration;

mod client;
mod retransmit;
mod siphash;
mod state;
#[cfg(test)]
mod tests;

pub use client::Client;

pub use retransmit::Retransmit;

// publically exposed for initialization.
pub use siphash::{FourTuple, IsnGenerator};

pub use state::{
    Activity,
    State,
    Stats,
};

/// The receive window we advertise, also our maximum segment size.
pub const WINDOW_SIZE: u16 = 400;

/// Interval of the tick driving the retransmission timer.
pub const PERIODIC_TIMEOUT: Duration = Duration::from_millis(250);

/// Initial retransmission timeout, in ticks.
pub const BASE_RTO: u8 = 3;

/// Number of retransmissions of a segment before the connection times out.
pub const MAX_RETRANSMITS: u8 = 8;

/// Number of retransmissions of the SYN before the connection attempt times out.
pub const MAX_SYN_RETRANSMITS: u8 = 5;

/// Time without any activity after which a reset is recommended.
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_millis(600_000);

/// Length of the header of control segments, without options.
pub const RECEIVE_HEADER_LEN: usize = 20;

/// Length of the header of SYN and data segments, with the segment size option.
pub const TRANSMIT_HEADER_LEN: usize = 24;
