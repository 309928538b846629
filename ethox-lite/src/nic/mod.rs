//! Encapsulates a network interface card.
//!
//! The stack only ever needs two operations from a card: hand over one complete Ethernet frame
//! for transmission and fill the frame buffer with the next received frame, if any. Both are
//! synchronous and non-blocking. A controller that needs to wait for hardware does so inside
//! `send_frame`, it is the only place where the stack can block.
#[cfg(feature = "alloc")]
pub mod external;

#[cfg(feature = "sys")]
#[path="sys/mod.rs"]
mod sys_internal;

use crate::layer::Result;

#[cfg(feature = "alloc")]
pub use self::external::External;

#[cfg(feature = "sys")]
pub use self::sys_internal::exports as sys;

/// A layer 2 device.
pub trait Device {
    /// Transmit a single Ethernet frame.
    ///
    /// The frame is complete, including the Ethernet header, but without preamble and frame check
    /// sequence. Fails with `Error::Device` when the link refused the frame.
    fn send_frame(&mut self, frame: &[u8]) -> Result<()>;

    /// Read the next received frame into `buffer`.
    ///
    /// Returns the length of the frame or `0` when no frame is pending. Frames that do not fit
    /// the buffer are discarded by the device, they can never be processed correctly.
    fn recv_frame(&mut self, buffer: &mut [u8]) -> Result<usize>;
}

impl<D: Device + ?Sized> Device for &'_ mut D {
    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send_frame(frame)
    }

    fn recv_frame(&mut self, buffer: &mut [u8]) -> Result<usize> {
        (**self).recv_frame(buffer)
    }
}
