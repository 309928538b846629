#![allow(unsafe_code)]
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//
// Applies to files in this folder unless otherwise noted. These are:
// * `mod.rs`
// * `tap.rs`
//! Hosted operation on Linux.
//!
//! The stack itself never touches the operating system. This module offers the few calls needed
//! to run it on a hosted system: a tap device for the frames, the monotonic clock for the
//! `Instant` of each poll and a way to sleep until a frame arrives.
use core::{fmt, mem};
use std::io;
use std::os::unix::io::RawFd;

use libc;
use crate::time::{Duration, Instant};

#[cfg(target_os = "linux")]
mod tap;

/// Module importing all types that should be exported.
///
/// Allows keeping all the `cfg` bits inside this module by enabling a controlled glob import from
/// the super module.
pub mod exports {
    #[cfg(target_os = "linux")]
    pub use super::tap::TapInterface;
    pub use super::wait as sys_wait;
    pub use super::now as sys_now;
    pub use super::Errno;
}

/// Sleep until the file descriptor is readable or the timeout passed.
///
/// Waits indefinitely without a timeout. Timeouts are rounded up to whole milliseconds, a poll
/// loop sleeping for a fraction of a millisecond would otherwise spin.
pub fn wait(fd: RawFd, timeout: Option<Duration>) -> Result<(), Errno> {
    let timeout = match timeout {
        None => -1,
        Some(timeout) => {
            let millis = timeout.as_micros().saturating_add(999) / 1000;
            millis.min(libc::c_int::max_value() as u128) as libc::c_int
        },
    };

    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    let res = unsafe { libc::poll(&mut pollfd, 1, timeout) };
    if res < 0 {
        let err = Errno::last();
        // A signal only shortens the sleep.
        if err.0 != libc::EINTR {
            return Err(err);
        }
    }

    Ok(())
}

/// Sample the monotonic system clock.
///
/// This is the clock the poll functions of the stack expect on a hosted system.
pub fn now() -> Result<Instant, Errno> {
    let mut ts = mem::MaybeUninit::<libc::timespec>::uninit();
    let res = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, ts.as_mut_ptr()) };
    check(res)?;

    let ts = unsafe { ts.assume_init() };
    Ok(Instant::from_millis(ts.tv_sec as i64 * 1000 + ts.tv_nsec as i64 / 1_000_000))
}

/// An errno value.
///
/// This is used as the error representation of raw libc calls. It can be converted into a
/// `std::io::Error` where it will consequently have much more extensive error information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Errno(pub libc::c_int);

impl Errno {
    /// The errno of the last failed call on this thread.
    pub fn last() -> Errno {
        Errno(unsafe { *libc::__errno_location() })
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&io::Error::from_raw_os_error(self.0), f)
    }
}

impl std::error::Error for Errno { }

impl From<Errno> for io::Error {
    fn from(err: Errno) -> io::Error {
        io::Error::from_raw_os_error(err.0)
    }
}

/// Turn the `-1` failure return of a libc call into the errno.
fn check(res: libc::c_int) -> Result<libc::c_int, Errno> {
    if res == -1 {
        Err(Errno::last())
    } else {
        Ok(res)
    }
}
