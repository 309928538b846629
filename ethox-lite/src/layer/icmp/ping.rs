use crate::layer::eth::Interface;
use crate::layer::socket::{Connection, Socket};
use crate::layer::{Error, Result};
use crate::nic::Device;
use crate::time::Instant;
use crate::wire::{Checksum, IpProtocol, Ipv6Address, Icmpv6Message, Icmpv6Repr, icmpv6_packet};

/// Length of the echo header: type, code, checksum, identifier and sequence number.
const ECHO_HEADER_LEN: usize = 8;

/// Sends echo requests to a remote and recognizes its replies.
///
/// Each request carries the identifier of the client, a sequence number incremented with every
/// request and a short pseudo-random payload. A reply matches when it comes from the remote (or
/// from anyone, for an unspecified remote), to one of our addresses, and echoes the identifier
/// and the sequence number of the last request.
#[derive(Debug, Clone)]
pub struct PingClient {
    socket: Socket,
    ident: u16,
    seq_no: u16,
    prng: u64,
}

impl PingClient {
    /// Length of the payload of each request.
    pub const PAYLOAD_LEN: usize = 8;

    /// Create a client pinging `remote_addr` with a fixed identifier.
    pub fn new(remote_addr: Ipv6Address, ident: u16) -> Self {
        PingClient {
            socket: Socket::new(remote_addr, 0),
            ident,
            seq_no: 0,
            prng: 0x9e37_79b9_7f4a_7c15 ^ u64::from(ident),
        }
    }

    /// The echo identifier.
    pub fn ident(&self) -> u16 {
        self.ident
    }

    /// The sequence number of the next request.
    pub fn seq_no(&self) -> u16 {
        self.seq_no
    }

    /// Send the next echo request.
    pub fn send_request<D, C>(&mut self, iface: &mut Interface<D, C>) -> Result<()>
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        let data = self.next_random().to_be_bytes();
        let payload = self.transmit_payload(iface);
        if payload.len() < Self::PAYLOAD_LEN {
            return Err(Error::BadSize);
        }

        payload[..Self::PAYLOAD_LEN].copy_from_slice(&data);
        self.send(iface, Self::PAYLOAD_LEN, false)
    }

    /// Receive one frame and check if it is the reply to our last request.
    pub fn have_packet<D, C>(&mut self, iface: &mut Interface<D, C>, now: Instant) -> bool
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        iface.receive_packet(now);
        self.is_reply(iface)
    }

    /// Check if the received packet in the buffer is the reply to our last request.
    pub fn is_reply<D, C>(&self, iface: &Interface<D, C>) -> bool
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        let packet = iface.packet();
        if !iface.contains_received() || packet.protocol() != IpProtocol::Icmpv6 {
            return false;
        }

        if !iface.is_our_address(packet.dst_addr()) {
            return false;
        }

        let remote = self.socket.remote_addr();
        if !remote.is_unspecified() && packet.src_addr() != remote {
            return false;
        }

        let icmp = match icmpv6_packet::new_checked(packet.payload()) {
            Ok(icmp) => icmp,
            Err(_) => return false,
        };

        icmp.msg_type() == Icmpv6Message::EchoReply
            && icmp.msg_code() == 0
            && icmp.echo_ident() == self.ident
            && icmp.echo_seq_no() == self.seq_no.wrapping_sub(1)
    }

    /// Xorshift, the payload only needs to look arbitrary.
    fn next_random(&mut self) -> u64 {
        let mut x = self.prng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.prng = x;
        x
    }
}

impl Connection for PingClient {
    fn socket(&self) -> &Socket {
        &self.socket
    }

    fn socket_mut(&mut self) -> &mut Socket {
        &mut self.socket
    }

    fn payload<'a, D, C>(&self, iface: &'a Interface<D, C>) -> &'a [u8]
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        iface.packet().payload().get(ECHO_HEADER_LEN..).unwrap_or(&[])
    }

    fn transmit_payload<'a, D, C>(&self, iface: &'a mut Interface<D, C>) -> &'a mut [u8]
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        iface.packet_mut().payload_buffer_mut().get_mut(ECHO_HEADER_LEN..).unwrap_or_default()
    }

    fn send_internal<D, C>(&mut self, iface: &mut Interface<D, C>, len: usize) -> Result<()>
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        let repr = Icmpv6Repr::EchoRequest {
            ident: self.ident,
            seq_no: self.seq_no,
            payload: len,
        };

        let total = repr.buffer_len();
        let packet = iface.packet_mut();
        if total > packet.capacity() {
            return Err(Error::BadSize);
        }

        packet.set_protocol(IpProtocol::Icmpv6);
        packet.set_payload_len(total as u16);
        let (src_addr, dst_addr) = (packet.src_addr(), packet.dst_addr());
        repr.emit(icmpv6_packet::new_unchecked_mut(packet.payload_mut()), src_addr, dst_addr, Checksum::Manual);

        self.seq_no = self.seq_no.wrapping_add(1);
        iface.send()
    }
}
