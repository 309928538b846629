use std::os::unix::io::{AsRawFd, RawFd};

use libc;
use super::{check, Errno};

use crate::layer::{Error, Result};
use crate::nic::Device;

const TUN_PATH: &[u8] = b"/dev/net/tun\0";

const TUNSETIFF: libc::c_ulong = 0x4004_54ca;
const SIOCGIFMTU: libc::c_ulong = 0x8921;
const IFF_TAP: libc::c_short = 0x0002;
// No packet information header, frames start with the Ethernet header.
const IFF_NO_PI: libc::c_short = 0x1000;

/// A `struct ifreq`, the union holds flags or the mtu in its first bytes.
#[repr(C)]
#[derive(Clone, Copy)]
struct IfReq {
    name: [libc::c_char; libc::IF_NAMESIZE],
    data: [u8; 24],
}

impl IfReq {
    /// Names longer than the kernel allows are cut, the last byte stays the terminator.
    fn new(name: &str) -> Self {
        let mut req = IfReq {
            name: [0; libc::IF_NAMESIZE],
            data: [0; 24],
        };

        for (slot, byte) in req.name.iter_mut().zip(name.as_bytes()).take(libc::IF_NAMESIZE - 1) {
            *slot = *byte as libc::c_char;
        }

        req
    }

    fn set_flags(&mut self, flags: libc::c_short) {
        self.data[..2].copy_from_slice(&flags.to_ne_bytes());
    }

    fn int_value(&self) -> libc::c_int {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.data[..4]);
        libc::c_int::from_ne_bytes(bytes)
    }

    fn ioctl(&mut self, fd: RawFd, request: libc::c_ulong) -> core::result::Result<(), Errno> {
        let res = unsafe { libc::ioctl(fd, request as _, self as *mut IfReq) };
        check(res).map(|_| ())
    }
}

/// A Linux tap interface usable as the device of an interface.
///
/// Sending blocks until the kernel accepted the frame, receiving never blocks. Use `sys_wait` on
/// the raw file descriptor to sleep until a frame arrives.
pub struct TapInterface {
    fd: RawFd,
    req: IfReq,
}

impl TapInterface {
    /// Open the tun device and attach it to the named tap.
    ///
    /// The tap is created if it does not exist and the process has the permission to do so.
    pub fn new(name: &str) -> core::result::Result<Self, Errno> {
        let fd = unsafe {
            libc::open(
                TUN_PATH.as_ptr() as *const libc::c_char,
                libc::O_RDWR | libc::O_NONBLOCK)
        };
        check(fd)?;

        // Owns the descriptor from here on, closes it on failure.
        let tap = TapInterface {
            fd,
            req: IfReq::new(name),
        };

        let mut req = tap.req;
        req.set_flags(IFF_TAP | IFF_NO_PI);
        req.ioctl(tap.fd, TUNSETIFF)?;
        Ok(tap)
    }

    /// The mtu of the attached interface.
    ///
    /// Queried through a datagram socket, the tun descriptor does not answer interface requests.
    pub fn mtu(&self) -> core::result::Result<usize, Errno> {
        let sock = unsafe { libc::socket(libc::AF_INET6, libc::SOCK_DGRAM, 0) };
        check(sock)?;

        let mut req = self.req;
        let res = req.ioctl(sock, SIOCGIFMTU);
        unsafe { libc::close(sock); }

        res.map(|()| req.int_value() as usize)
    }

}

fn device_err() -> Error {
    let err = Errno::last();
    net_debug!("tap: {}", err);
    Error::Device
}

impl Device for TapInterface {
    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        let len = unsafe {
            libc::write(self.fd, frame.as_ptr() as *const libc::c_void, frame.len())
        };

        if len < 0 {
            Err(device_err())
        } else if len as usize != frame.len() {
            Err(Error::Device)
        } else {
            Ok(())
        }
    }

    fn recv_frame(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let len = unsafe {
            libc::read(self.fd, buffer.as_mut_ptr() as *mut libc::c_void, buffer.len())
        };

        if len >= 0 {
            return Ok(len as usize);
        }

        match Errno::last() {
            Errno(libc::EAGAIN) | Errno(libc::EINTR) => Ok(0),
            _ => Err(device_err()),
        }
    }
}

impl AsRawFd for TapInterface {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for TapInterface {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd); }
    }
}
