//! A single-buffer IPv6 stack for small devices behind a raw Ethernet controller.
//!
//! ## Table of contents
//!
//! 1. [Design](#design-and-relevant-core-concepts)
//! 2. [The wire module](wire/index.html)
//! 3. [The layers](layer/index.html)
//!    1. [The interface and its frame buffer](layer/eth/index.html)
//!    1. [Neighbor and router discovery](layer/icmp/index.html)
//!    1. [Connections](layer/socket/index.html)
//!    1. [The tcp client](layer/tcp/index.html)
//! 4. [Network interfaces](nic/index.html)
//!
//! ## Design and relevant core concepts
//!
//! There is exactly one frame buffer. It is owned by the [`Interface`] and holds either the most
//! recently received frame or the frame currently being assembled for sending, never both. Every
//! operation that sends overwrites it, so an application must be done reading a received packet
//! before it asks for anything to be sent. This is the whole concurrency model: the stack is
//! polled by the application, single threaded, and nothing happens in between polls.
//!
//! Time does not come from a global counter. Every poll entry point takes the current
//! [`Instant`] as an argument, which makes it simple to drive the state machines from tests.
//!
//! Nothing within `ethox-lite` dynamically allocates memory. The frame buffer is anything that
//! is `AsRef<[u8]> + AsMut<[u8]>`, a static array works just as well as a `Vec`.
//!
//! [`Interface`]: layer/eth/struct.Interface.html
//! [`Instant`]: time/struct.Instant.html
#![warn(missing_docs)]
#![warn(unreachable_pub)]

// tests should be able to use `std`
#![cfg_attr(all(
    not(feature = "std"),
    not(test)),
no_std)]

#[macro_use] mod macros;
pub mod layer;
pub mod nic;
pub mod time;
pub mod wire;

/// The `alloc` crate, or a replacement without feature `"std"`.
#[cfg(any(
    feature = "alloc",
    test))]
pub extern crate alloc;

pub use layer::eth::Interface;
