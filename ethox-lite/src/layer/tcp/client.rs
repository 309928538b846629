use core::ops::Range;

use super::{
    Activity, FourTuple, IsnGenerator, Retransmit, State, Stats,
    INACTIVITY_TIMEOUT, MAX_RETRANSMITS, MAX_SYN_RETRANSMITS, PERIODIC_TIMEOUT,
    RECEIVE_HEADER_LEN, TRANSMIT_HEADER_LEN, WINDOW_SIZE,
};
use crate::layer::eth::Interface;
use crate::layer::ip::PAYLOAD_OFFSET;
use crate::layer::socket::{Connection, Resolution, Socket};
use crate::layer::{Error, Result};
use crate::nic::Device;
use crate::time::Instant;
use crate::wire::{IpProtocol, Ipv6Address, TcpFlags, TcpOption, TcpSeqNumber, tcp_packet};

/// An actively opened tcp connection.
///
/// Owns no packet memory. Received data is read from the frame buffer of the interface right
/// after a poll reported [`Activity::NEW_DATA`], data to send is written to the
/// `transmit_payload` of the [`Connection`] implementation and sent with `send`.
///
/// [`Activity::NEW_DATA`]: struct.Activity.html#associatedconstant.NEW_DATA
/// [`Connection`]: ../socket/trait.Connection.html
#[derive(Debug, Clone)]
pub struct Client {
    socket: Socket,
    isn: IsnGenerator,
    state: State,
    /// Gave up retransmitting, disconnect on the next poll.
    timed_out: bool,
    /// First sequence number not yet acknowledged by the peer.
    local_seq: TcpSeqNumber,
    /// Next sequence number expected from the peer.
    remote_seq: TcpSeqNumber,
    /// Bytes sent beyond `local_seq`, including SYN and FIN.
    unacked: u16,
    retransmit: Retransmit,
    /// Outcome of the last poll.
    activity: Activity,
    periodic_at: Instant,
    last_activity: Instant,
    /// Received data within the frame buffer.
    data: Range<usize>,
    stats: Stats,
}

/// The header fields of an outgoing segment.
#[derive(Debug, Clone, Copy)]
struct Header {
    src_port: u16,
    dst_port: u16,
    seq: TcpSeqNumber,
    ack: TcpSeqNumber,
    flags: TcpFlags,
    header_len: usize,
}

/// The fields of a received segment, copied before the buffer is reused for a reply.
#[derive(Debug, Clone)]
struct Segment {
    src_port: u16,
    dst_port: u16,
    seq: TcpSeqNumber,
    ack: TcpSeqNumber,
    flags: TcpFlags,
    data: Range<usize>,
}

/// How to continue after handling a received segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Done,
    CheckRetransmit,
}

impl Client {
    /// Create a disconnected client for a remote endpoint.
    ///
    /// The generator derives initial sequence numbers and the first local port.
    pub fn new(remote_addr: Ipv6Address, remote_port: u16, isn: IsnGenerator) -> Self {
        let mut socket = Socket::new(remote_addr, remote_port);
        socket.set_local_port(isn.get_port(remote_addr, remote_port));

        Client {
            socket,
            isn,
            state: State::Disconnected,
            timed_out: false,
            local_seq: TcpSeqNumber::default(),
            remote_seq: TcpSeqNumber::default(),
            unacked: 0,
            retransmit: Retransmit::new(),
            activity: Activity::empty(),
            periodic_at: Instant::from_millis(0),
            last_activity: Instant::from_millis(0),
            data: 0..0,
            stats: Stats::default(),
        }
    }

    /// Make progress on resolving the MAC of the remote.
    ///
    /// See [`Socket::resolve`](../socket/struct.Socket.html#method.resolve).
    pub fn resolve<D, C>(&mut self, iface: &mut Interface<D, C>, now: Instant) -> Resolution
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.socket.resolve(iface, now)
    }

    /// Open the connection by sending a SYN.
    ///
    /// Uses the next local port. Fails with `Error::Unreachable` before changing any state when
    /// the remote is not resolved yet.
    pub fn connect<D, C>(&mut self, iface: &mut Interface<D, C>, now: Instant) -> Result<()>
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        if self.socket.remote_mac().is_none() {
            return Err(Error::Unreachable);
        }

        let remote = self.socket.remote_addr();
        let local_port = self.socket.next_local_port();
        let tuple = FourTuple {
            local: iface.source_for(remote),
            remote,
            local_port,
            remote_port: self.socket.remote_port(),
        };

        self.local_seq = self.isn.get_isn(tuple, now);
        self.remote_seq = TcpSeqNumber::default();
        // The SYN occupies one sequence number.
        self.unacked = 1;
        self.retransmit = Retransmit::new();
        self.activity = Activity::empty();
        self.timed_out = false;
        self.periodic_at = now;
        self.last_activity = now;
        self.set_state(State::WaitSynAck);

        net_debug!("tcp: connecting {}:{} to {}:{}",
            tuple.local, local_port, remote, tuple.remote_port);
        self.send(iface, 0, false)
    }

    /// Receive one frame and process it.
    ///
    /// Returns true if the peer sent new data, readable through `payload`.
    pub fn have_packet<D, C>(&mut self, iface: &mut Interface<D, C>, now: Instant) -> bool
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.poll(iface, now).contains(Activity::NEW_DATA)
    }

    /// Receive one frame and process it, returning everything that happened.
    pub fn poll<D, C>(&mut self, iface: &mut Interface<D, C>, now: Instant) -> Activity
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        iface.receive_packet(now);
        self.process(iface, now)
    }

    /// Process the packet left in the frame buffer, if any, and advance the timers.
    ///
    /// For applications that receive on the interface themselves and dispatch by protocol. May
    /// send a reply, a retransmission or a reset.
    pub fn process<D, C>(&mut self, iface: &mut Interface<D, C>, now: Instant) -> Activity
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        if !self.activity.is_empty() {
            self.last_activity = now;
        }
        self.activity = Activity::empty();
        self.data = 0..0;

        if now.since(self.last_activity) >= INACTIVITY_TIMEOUT {
            self.activity |= Activity::RESET;
        }

        if self.state == State::Disconnected {
            return self.activity;
        }

        if self.timed_out {
            self.set_state(State::Disconnected);
            return self.activity;
        }

        if now.since(self.periodic_at) >= PERIODIC_TIMEOUT {
            self.periodic_at = now;
            if self.unacked > 0 {
                self.retransmit.tick();
            }
        }

        let step = if iface.contains_received() {
            self.stats.received = self.stats.received.wrapping_add(1);
            self.receive(iface)
        } else {
            Step::CheckRetransmit
        };

        if step == Step::CheckRetransmit {
            self.check_retransmit(iface);
        }

        self.activity
    }

    fn receive<D, C>(&mut self, iface: &mut Interface<D, C>) -> Step
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        let segment = match self.segment(iface) {
            Some(segment) => segment,
            None => {
                self.stats.dropped = self.stats.dropped.wrapping_add(1);
                return Step::CheckRetransmit;
            },
        };

        if segment.dst_port != self.socket.local_port() {
            // Only active open, never accept a connection.
            if segment.flags.syn() {
                net_trace!("tcp: dropped SYN for port {}", segment.dst_port);
                self.stats.dropped = self.stats.dropped.wrapping_add(1);
                return Step::CheckRetransmit;
            }

            self.send_reset(iface, &segment);
            return Step::Done;
        }

        self.receive_segment(iface, segment)
    }

    /// Extract the segment if it is a valid one from the remote.
    fn segment<D, C>(&self, iface: &Interface<D, C>) -> Option<Segment>
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        let packet = iface.packet();
        if packet.protocol() != IpProtocol::Tcp || !self.socket.is_from_remote(iface) {
            return None;
        }

        let tcp = tcp_packet::new_checked(packet.payload()).ok()?;
        if !tcp.verify_checksum(packet.src_addr(), packet.dst_addr()) {
            net_debug!("tcp: dropped segment with wrong checksum");
            return None;
        }

        if tcp.src_port() != self.socket.remote_port() {
            return None;
        }

        let start = PAYLOAD_OFFSET + tcp.header_len();
        Some(Segment {
            src_port: tcp.src_port(),
            dst_port: tcp.dst_port(),
            seq: tcp.seq_number(),
            ack: tcp.ack_number(),
            flags: tcp.flags(),
            data: start..PAYLOAD_OFFSET + tcp.as_bytes().len(),
        })
    }

    fn receive_segment<D, C>(&mut self, iface: &mut Interface<D, C>, segment: Segment) -> Step
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        if segment.flags.rst() {
            net_debug!("tcp: connection reset by peer");
            self.set_state(State::Disconnected);
            self.activity = Activity::ABORT;
            return Step::Done;
        }

        let data_len = segment.data.len() as u32;
        let handshake = self.state == State::WaitSynAck
            && (segment.flags.syn() || segment.flags.ack());
        if !handshake && (data_len > 0 || segment.flags.fin()) && segment.seq != self.remote_seq {
            net_trace!("tcp: unexpected sequence number {}, expected {}",
                segment.seq, self.remote_seq);
            self.reply(iface, TcpFlags::ACK);
            return Step::Done;
        }

        if segment.flags.ack()
            && self.unacked > 0
            && segment.ack == self.local_seq + u32::from(self.unacked)
        {
            self.local_seq += u32::from(self.unacked);
            self.unacked = 0;
            self.retransmit.acknowledged();
            self.activity = Activity::ACKED;
            net_trace!("tcp: acknowledged, sa {} sv {} rto {}",
                self.retransmit.smoothed_rtt(),
                self.retransmit.rtt_variation(),
                self.retransmit.rto());
        }

        match self.state {
            State::WaitSynAck => {
                if self.activity.contains(Activity::ACKED)
                    && segment.flags.syn()
                    && segment.flags.ack()
                {
                    self.set_state(State::Connected);
                    self.remote_seq = segment.seq + 1;
                    self.activity = Activity::CONNECTED;
                    self.reply(iface, TcpFlags::ACK);
                    return Step::Done;
                }

                net_debug!("tcp: handshake failed, flags {}", segment.flags);
                self.set_state(State::Disconnected);
                self.activity = Activity::ABORT;
                self.send_reset(iface, &segment);
                Step::Done
            },
            State::Connected => {
                if segment.flags.fin() {
                    // Our data must be acknowledged before the connection can close.
                    if self.unacked > 0 {
                        return Step::CheckRetransmit;
                    }

                    self.remote_seq += data_len + 1;
                    self.activity |= Activity::CLOSE;
                    if data_len > 0 {
                        self.activity |= Activity::NEW_DATA;
                        self.data = segment.data;
                    }

                    // Our FIN.
                    self.unacked = 1;
                    self.retransmit.clear_retries();
                    self.set_state(State::LastAck);
                    self.reply(iface, TcpFlags::FIN | TcpFlags::ACK);
                    return Step::Done;
                }

                if data_len > 0 {
                    self.activity |= Activity::NEW_DATA;
                    self.remote_seq += data_len;
                    self.data = segment.data;
                    self.reply(iface, TcpFlags::ACK);
                    return Step::Done;
                }

                Step::CheckRetransmit
            },
            State::LastAck => {
                if self.activity.contains(Activity::ACKED) {
                    self.set_state(State::Disconnected);
                    self.activity = Activity::CLOSE;
                    return Step::Done;
                }

                Step::CheckRetransmit
            },
            State::Disconnected => Step::Done,
        }
    }

    fn check_retransmit<D, C>(&mut self, iface: &mut Interface<D, C>)
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        if self.unacked == 0 || !self.retransmit.is_expired() {
            return;
        }

        self.retransmit.backoff();
        let retries = self.retransmit.retries();
        if retries == MAX_RETRANSMITS
            || (self.state == State::WaitSynAck && retries == MAX_SYN_RETRANSMITS)
        {
            net_debug!("tcp: {} timed out after {} retransmissions", self.state, retries);
            self.timed_out = true;
            self.resend(iface, TcpFlags::RST | TcpFlags::ACK, RECEIVE_HEADER_LEN);
            return;
        }

        self.retransmit.retry();
        match self.state {
            State::WaitSynAck => {
                self.stats.syn_retransmits = self.stats.syn_retransmits.wrapping_add(1);
                self.resend(iface, TcpFlags::SYN, TRANSMIT_HEADER_LEN);
            },
            State::Connected => {
                self.stats.data_retransmits = self.stats.data_retransmits.wrapping_add(1);
                self.activity |= Activity::REXMIT;
            },
            State::LastAck => {
                self.stats.fin_retransmits = self.stats.fin_retransmits.wrapping_add(1);
                self.resend(iface, TcpFlags::FIN | TcpFlags::ACK, RECEIVE_HEADER_LEN);
            },
            State::Disconnected => (),
        }
    }

    /// Answer the received segment with a control segment.
    fn reply<D, C>(&mut self, iface: &mut Interface<D, C>, flags: TcpFlags)
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        iface.prepare_reply();
        let header = self.header(flags, RECEIVE_HEADER_LEN);
        if let Err(err) = transmit(iface, header, 0) {
            net_debug!("tcp: reply {} failed: {}", flags, err);
        }
    }

    /// Send a control segment to the remote.
    fn resend<D, C>(&mut self, iface: &mut Interface<D, C>, flags: TcpFlags, header_len: usize)
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        let result = self.socket.prepare_send(iface)
            .and_then(|()| transmit(iface, self.header(flags, header_len), 0));
        if let Err(err) = result {
            net_debug!("tcp: resend {} failed: {}", flags, err);
        }
    }

    /// Reset the sender of a segment that belongs to no connection of ours.
    ///
    /// A reset is never answered.
    fn send_reset<D, C>(&mut self, iface: &mut Interface<D, C>, segment: &Segment)
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        if segment.flags.rst() {
            return;
        }

        net_trace!("tcp: reset segment for port {}", segment.dst_port);
        iface.prepare_reply();
        let header = Header {
            src_port: segment.dst_port,
            dst_port: segment.src_port,
            seq: segment.ack,
            ack: segment.seq + 1,
            flags: TcpFlags::RST | TcpFlags::ACK,
            header_len: RECEIVE_HEADER_LEN,
        };

        if let Err(err) = transmit(iface, header, 0) {
            net_debug!("tcp: reset failed: {}", err);
        }
    }

    fn header(&self, flags: TcpFlags, header_len: usize) -> Header {
        Header {
            src_port: self.socket.local_port(),
            dst_port: self.socket.remote_port(),
            seq: self.local_seq,
            ack: self.remote_seq,
            flags,
            header_len,
        }
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            net_debug!("tcp: {} -> {}", self.state, state);
        }
        if state == State::Disconnected {
            self.timed_out = false;
        }
        self.state = state;
    }

    /// The state of the connection.
    pub fn state(&self) -> State {
        self.state
    }

    /// Check if data can be exchanged.
    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    /// Check if the last poll completed the handshake.
    pub fn synacked(&self) -> bool {
        self.activity.contains(Activity::CONNECTED)
    }

    /// Check if the last data sent must be sent again.
    ///
    /// Call `send` with the same payload before polling again.
    pub fn rexmit(&self) -> bool {
        self.activity.contains(Activity::REXMIT)
    }

    /// Check if the connection gave up retransmitting.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Check if anything happened during the last poll.
    pub fn is_alive(&self) -> bool {
        !self.activity.is_empty()
    }

    /// Check if the connection was reset during the last poll.
    pub fn aborted(&self) -> bool {
        self.activity.contains(Activity::ABORT)
    }

    /// Check if the peer closed the connection during the last poll.
    pub fn closing(&self) -> bool {
        self.activity.contains(Activity::CLOSE)
    }

    /// Check if nothing happened for so long that a reset is recommended.
    pub fn reset_recommended(&self) -> bool {
        self.activity.contains(Activity::RESET)
    }

    /// The outcome of the last poll.
    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// The counters of the connection.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// The retransmission timer and round trip estimate.
    pub fn retransmit(&self) -> &Retransmit {
        &self.retransmit
    }

    /// The first of our sequence numbers not acknowledged yet.
    pub fn local_seq(&self) -> TcpSeqNumber {
        self.local_seq
    }

    /// The next sequence number expected from the peer.
    pub fn remote_seq(&self) -> TcpSeqNumber {
        self.remote_seq
    }

    /// Number of sent bytes not acknowledged yet.
    pub fn unacked(&self) -> u16 {
        self.unacked
    }
}

impl Connection for Client {
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
        iface.packet().as_bytes().get(self.data.clone()).unwrap_or(&[])
    }

    fn transmit_payload<'a, D, C>(&self, iface: &'a mut Interface<D, C>) -> &'a mut [u8]
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        iface.packet_mut().payload_buffer_mut().get_mut(TRANSMIT_HEADER_LEN..).unwrap_or_default()
    }

    /// Send the SYN, or data when connected.
    ///
    /// A send while the last poll asked for a retransmission is that retransmission and does not
    /// count the bytes again.
    fn send_internal<D, C>(&mut self, iface: &mut Interface<D, C>, len: usize) -> Result<()>
    where
        D: Device,
        C: AsRef<[u8]> + AsMut<[u8]>,
    {
        let flags = match self.state {
            State::WaitSynAck if len == 0 => TcpFlags::SYN,
            State::Connected => TcpFlags::PSH | TcpFlags::ACK,
            _ => return Err(Error::Illegal),
        };

        self.data = 0..0;
        transmit(iface, self.header(flags, TRANSMIT_HEADER_LEN), len)?;

        if !self.activity.contains(Activity::REXMIT) {
            self.unacked = self.unacked.saturating_add(len as u16);
            self.retransmit.restart();
        }

        Ok(())
    }
}

/// Write the tcp header in front of `len` bytes of payload and send the frame.
///
/// The IPv6 and Ethernet headers must be prepared already.
fn transmit<D, C>(iface: &mut Interface<D, C>, header: Header, len: usize) -> Result<()>
where
    D: Device,
    C: AsRef<[u8]> + AsMut<[u8]>,
{
    let total = header.header_len + len;
    let packet = iface.packet_mut();
    if total > packet.capacity() {
        return Err(Error::BadSize);
    }

    packet.set_protocol(IpProtocol::Tcp);
    packet.set_payload_len(total as u16);
    let (src_addr, dst_addr) = (packet.src_addr(), packet.dst_addr());

    let tcp = tcp_packet::new_unchecked_mut(packet.payload_mut());
    tcp.set_src_port(header.src_port);
    tcp.set_dst_port(header.dst_port);
    tcp.set_seq_number(header.seq);
    tcp.set_ack_number(header.ack);
    tcp.set_header_len(header.header_len);
    tcp.set_flags(header.flags);
    tcp.set_window_len(WINDOW_SIZE);
    tcp.set_urgent_at(0);
    if header.header_len > RECEIVE_HEADER_LEN {
        TcpOption::MaxSegmentSize(WINDOW_SIZE).emit(tcp.options_mut());
    }
    tcp.fill_checksum(src_addr, dst_addr);

    iface.send()
}
