//! Tcp layer tests.
//!
//! The peer is simulated with hand-made segments pushed into the external device, time advances
//! only through the instants passed to each poll.
use alloc::vec::Vec;

use super::*;
use crate::layer::eth::Interface;
use crate::layer::socket::{Connection, EPHEMERAL_PORTS};
use crate::layer::testing::*;
use crate::layer::Error;
use crate::nic::External;
use crate::time::Instant;
use crate::wire::{IpProtocol, Ipv6Address, TcpFlags, TcpSeqNumber, tcp_packet};

const REMOTE_PORT: u16 = 80;

const PEER_ISN: TcpSeqNumber = TcpSeqNumber(1000);

type Iface = Interface<External, Vec<u8>>;

fn at(millis: i64) -> Instant {
    Instant::from_millis(millis)
}

fn remote() -> Ipv6Address {
    link_local(MAC_OTHER)
}

/// An interface and a client whose remote is resolved.
fn setup() -> (Iface, Client) {
    let mut iface = interface();
    iface.neighbors_mut().fill(remote(), MAC_OTHER, None).unwrap();
    let mut client = Client::new(remote(), REMOTE_PORT, IsnGenerator::from_key(0x1234, 0x5678));
    assert!(client.resolve(&mut iface, at(0)).is_resolved());
    (iface, client)
}

/// A segment from the peer, with arbitrary ports.
fn tcp_frame(
    src_port: u16,
    dst_port: u16,
    seq: TcpSeqNumber,
    ack: TcpSeqNumber,
    flags: TcpFlags,
    data: &[u8],
) -> Vec<u8> {
    let (src_addr, dst_addr) = (remote(), link_local(MAC_HOST));
    let mut bytes = vec![0; RECEIVE_HEADER_LEN + data.len()];
    let tcp = tcp_packet::new_unchecked_mut(&mut bytes);
    tcp.set_src_port(src_port);
    tcp.set_dst_port(dst_port);
    tcp.set_seq_number(seq);
    tcp.set_ack_number(ack);
    tcp.set_header_len(RECEIVE_HEADER_LEN);
    tcp.set_flags(flags);
    tcp.set_window_len(1024);
    tcp.payload_mut_slice().copy_from_slice(data);
    tcp.fill_checksum(src_addr, dst_addr);
    ip_frame(MAC_OTHER, MAC_HOST, src_addr, dst_addr, IpProtocol::Tcp, &bytes)
}

/// A segment from the peer for the connection of the client.
fn from_peer(
    client: &Client,
    seq: TcpSeqNumber,
    ack: TcpSeqNumber,
    flags: TcpFlags,
    data: &[u8],
) -> Vec<u8> {
    tcp_frame(REMOTE_PORT, client.socket().local_port(), seq, ack, flags, data)
}

#[derive(Debug)]
struct SentSegment {
    headers: Sent,
    src_port: u16,
    dst_port: u16,
    seq: TcpSeqNumber,
    ack: TcpSeqNumber,
    flags: TcpFlags,
    header_len: usize,
    window: u16,
    mss: Option<u16>,
    data: Vec<u8>,
}

fn parse_tcp(frame: &[u8]) -> SentSegment {
    let (headers, payload) = parse_sent(frame);
    assert_eq!(headers.protocol, IpProtocol::Tcp);
    let tcp = tcp_packet::new_checked(payload).unwrap();
    assert!(tcp.verify_checksum(headers.src_addr, headers.dst_addr));

    SentSegment {
        headers,
        src_port: tcp.src_port(),
        dst_port: tcp.dst_port(),
        seq: tcp.seq_number(),
        ack: tcp.ack_number(),
        flags: tcp.flags(),
        header_len: tcp.header_len(),
        window: tcp.window_len(),
        mss: tcp.max_seg_size().unwrap(),
        data: tcp.payload_slice().to_vec(),
    }
}

fn last_segment(iface: &Iface) -> SentSegment {
    parse_tcp(iface.device().last_sent().unwrap())
}

/// Complete the handshake, the last poll happens at 250ms.
///
/// Returns the next sequence number of the peer.
fn connected() -> (Iface, Client, TcpSeqNumber) {
    let (mut iface, mut client) = setup();
    client.connect(&mut iface, at(0)).unwrap();
    let syn = last_segment(&iface);

    let synack = from_peer(&client, PEER_ISN, syn.seq + 1, TcpFlags::SYN | TcpFlags::ACK, &[]);
    iface.device_mut().push_recv(&synack);
    assert_eq!(client.poll(&mut iface, at(250)), Activity::CONNECTED);
    (iface, client, PEER_ISN + 1)
}

/// Send data as the application does.
fn send_data(iface: &mut Iface, client: &mut Client, data: &[u8]) {
    client.transmit_payload(iface)[..data.len()].copy_from_slice(data);
    client.send(iface, data.len(), false).unwrap();
}

#[test]
fn handshake() {
    let (mut iface, mut client) = setup();
    client.connect(&mut iface, at(0)).unwrap();
    assert_eq!(client.state(), State::WaitSynAck);
    assert_eq!(client.unacked(), 1);
    assert!(EPHEMERAL_PORTS.contains(&client.socket().local_port()));

    let syn = last_segment(&iface);
    assert_eq!(syn.headers.dst_mac, MAC_OTHER);
    assert_eq!(syn.headers.src_addr, iface.link_local_address());
    assert_eq!(syn.headers.dst_addr, remote());
    assert_eq!(syn.src_port, client.socket().local_port());
    assert_eq!(syn.dst_port, REMOTE_PORT);
    assert_eq!(syn.flags, TcpFlags::SYN);
    assert_eq!(syn.seq, client.local_seq());
    assert_eq!(syn.ack, TcpSeqNumber(0));
    assert_eq!(syn.header_len, TRANSMIT_HEADER_LEN);
    assert_eq!(syn.window, WINDOW_SIZE);
    assert_eq!(syn.mss, Some(WINDOW_SIZE));
    assert!(syn.data.is_empty());

    let synack = from_peer(&client, PEER_ISN, syn.seq + 1, TcpFlags::SYN | TcpFlags::ACK, &[]);
    iface.device_mut().push_recv(&synack);
    assert_eq!(client.poll(&mut iface, at(250)), Activity::CONNECTED);
    assert_eq!(client.state(), State::Connected);
    assert!(client.is_connected());
    assert!(client.synacked());
    assert_eq!(client.unacked(), 0);
    assert_eq!(client.local_seq(), syn.seq + 1);
    assert_eq!(client.remote_seq(), PEER_ISN + 1);

    let ack = last_segment(&iface);
    assert_eq!(iface.device().sent().len(), 2);
    assert_eq!(ack.flags, TcpFlags::ACK);
    assert_eq!(ack.seq, syn.seq + 1);
    assert_eq!(ack.ack, PEER_ISN + 1);
    assert_eq!(ack.header_len, RECEIVE_HEADER_LEN);
    assert_eq!(ack.mss, None);
    assert_eq!(ack.headers.dst_mac, MAC_OTHER);

    // One tick elapsed before the SYN was acknowledged.
    let rtx = client.retransmit();
    assert_eq!(rtx.smoothed_rtt(), 1);
    assert_eq!(rtx.rtt_variation(), 13);
    assert_eq!(rtx.rto(), 13);
}

#[test]
fn syn_timeout() {
    let (mut iface, mut client) = setup();
    client.connect(&mut iface, at(0)).unwrap();
    let isn = client.local_seq();

    // Backoff 3 + 3 + 6 + 12 + 24 + 48 ticks.
    for tick in 1..=96 {
        assert!(!client.timed_out(), "timed out early at tick {}", tick);
        client.poll(&mut iface, at(tick * 250));
    }
    assert!(client.timed_out());
    assert_eq!(client.state(), State::WaitSynAck);
    assert_eq!(client.stats().syn_retransmits, u32::from(MAX_SYN_RETRANSMITS));

    let sent: Vec<_> = iface.device().sent().iter().map(|frame| parse_tcp(frame)).collect();
    assert_eq!(sent.len(), 7);
    for syn in &sent[..6] {
        assert_eq!(syn.flags, TcpFlags::SYN);
        assert_eq!(syn.seq, isn);
    }
    let reset = &sent[6];
    assert_eq!(reset.flags, TcpFlags::RST | TcpFlags::ACK);
    assert_eq!(reset.seq, isn);
    assert_eq!(reset.header_len, RECEIVE_HEADER_LEN);

    client.poll(&mut iface, at(97 * 250));
    assert_eq!(client.state(), State::Disconnected);
    assert!(!client.timed_out());

    for tick in 98..300 {
        client.poll(&mut iface, at(tick * 250));
    }
    assert_eq!(iface.device().sent().len(), 7);
}

#[test]
fn data_acknowledged() {
    let (mut iface, mut client, peer_seq) = connected();
    let start = client.local_seq();

    send_data(&mut iface, &mut client, b"hello");
    assert_eq!(client.unacked(), 5);
    assert_eq!(client.retransmit().timer(), 13);

    let data = last_segment(&iface);
    assert_eq!(data.flags, TcpFlags::PSH | TcpFlags::ACK);
    assert_eq!(data.seq, start);
    assert_eq!(data.ack, peer_seq);
    assert_eq!(data.header_len, TRANSMIT_HEADER_LEN);
    assert_eq!(data.mss, Some(WINDOW_SIZE));
    assert_eq!(data.data, b"hello");

    for millis in &[500, 750, 1000] {
        assert_eq!(client.poll(&mut iface, at(*millis)), Activity::empty());
    }
    assert_eq!(client.retransmit().timer(), 10);

    let sent = iface.device().sent().len();
    iface.device_mut().push_recv(&from_peer(&client, peer_seq, start + 5, TcpFlags::ACK, &[]));
    assert_eq!(client.poll(&mut iface, at(1250)), Activity::ACKED);
    assert_eq!(client.unacked(), 0);
    assert_eq!(client.local_seq(), start + 5);
    // A pure acknowledgment is not answered.
    assert_eq!(iface.device().sent().len(), sent);

    // Measured 4 ticks: sa = 1 + (4 - 1/8), sv = 13 + (|4| - 13/4), rto = sa/8 + sv.
    let rtx = client.retransmit();
    assert_eq!(rtx.smoothed_rtt(), 5);
    assert_eq!(rtx.rtt_variation(), 14);
    assert_eq!(rtx.rto(), 14);
    assert_eq!(rtx.timer(), 14);
}

#[test]
fn retransmitted_data_not_measured() {
    let (mut iface, mut client, peer_seq) = connected();
    let start = client.local_seq();
    send_data(&mut iface, &mut client, b"hello");

    for tick in 2..14 {
        assert!(!client.poll(&mut iface, at(tick * 250)).contains(Activity::REXMIT));
    }
    assert!(client.poll(&mut iface, at(14 * 250)).contains(Activity::REXMIT));
    assert!(client.rexmit());
    assert_eq!(client.retransmit().retries(), 1);
    assert_eq!(client.stats().data_retransmits, 1);

    // The application sends the same bytes again.
    send_data(&mut iface, &mut client, b"hello");
    assert_eq!(client.unacked(), 5);
    let again = last_segment(&iface);
    assert_eq!(again.seq, start);
    assert_eq!(again.data, b"hello");

    iface.device_mut().push_recv(&from_peer(&client, peer_seq, start + 5, TcpFlags::ACK, &[]));
    assert_eq!(client.poll(&mut iface, at(15 * 250)), Activity::ACKED);
    let rtx = client.retransmit();
    assert_eq!(rtx.smoothed_rtt(), 1);
    assert_eq!(rtx.rtt_variation(), 13);
    assert_eq!(rtx.rto(), 13);
    assert_eq!(rtx.timer(), 13);
}

#[test]
fn data_received() {
    let (mut iface, mut client, peer_seq) = connected();
    let local = client.local_seq();

    iface.device_mut().push_recv(&from_peer(&client, peer_seq, local, TcpFlags::PSH | TcpFlags::ACK, b"hello world"));
    assert!(client.have_packet(&mut iface, at(500)));
    assert_eq!(client.remote_seq(), peer_seq + 11);

    // Still readable after the acknowledgment was sent.
    assert_eq!(client.payload(&iface), b"hello world");
    assert_eq!(client.payload_len(&iface), 11);

    let ack = last_segment(&iface);
    assert_eq!(ack.flags, TcpFlags::ACK);
    assert_eq!(ack.seq, local);
    assert_eq!(ack.ack, peer_seq + 11);

    assert!(!client.have_packet(&mut iface, at(750)));
    assert!(client.payload(&iface).is_empty());
}

#[test]
fn out_of_order_corrected() {
    let (mut iface, mut client, peer_seq) = connected();
    let local = client.local_seq();

    iface.device_mut().push_recv(&from_peer(&client, peer_seq + 100, local, TcpFlags::ACK, b"future"));
    assert!(!client.have_packet(&mut iface, at(500)));
    assert!(!client.activity().contains(Activity::NEW_DATA));
    assert_eq!(client.remote_seq(), peer_seq);
    assert!(client.payload(&iface).is_empty());

    let ack = last_segment(&iface);
    assert_eq!(ack.flags, TcpFlags::ACK);
    assert_eq!(ack.seq, local);
    assert_eq!(ack.ack, peer_seq);
}

#[test]
fn passive_close() {
    let (mut iface, mut client, peer_seq) = connected();
    let local = client.local_seq();

    iface.device_mut().push_recv(&from_peer(&client, peer_seq, local, TcpFlags::FIN | TcpFlags::ACK, &[]));
    assert_eq!(client.poll(&mut iface, at(500)), Activity::CLOSE);
    assert!(client.closing());
    assert_eq!(client.state(), State::LastAck);
    assert_eq!(client.unacked(), 1);

    let fin = last_segment(&iface);
    assert_eq!(fin.flags, TcpFlags::FIN | TcpFlags::ACK);
    assert_eq!(fin.seq, local);
    assert_eq!(fin.ack, peer_seq + 1);
    assert_eq!(fin.header_len, RECEIVE_HEADER_LEN);

    iface.device_mut().push_recv(&from_peer(&client, peer_seq + 1, local + 1, TcpFlags::ACK, &[]));
    assert_eq!(client.poll(&mut iface, at(750)), Activity::CLOSE);
    assert!(client.closing());
    assert_eq!(client.state(), State::Disconnected);
}

#[test]
fn fin_with_data() {
    let (mut iface, mut client, peer_seq) = connected();
    let local = client.local_seq();

    iface.device_mut().push_recv(&from_peer(&client, peer_seq, local, TcpFlags::FIN | TcpFlags::ACK, b"bye"));
    assert!(client.have_packet(&mut iface, at(500)));
    assert_eq!(client.activity(), Activity::CLOSE | Activity::NEW_DATA);
    assert_eq!(client.payload(&iface), b"bye");
    assert_eq!(last_segment(&iface).ack, peer_seq + 4);
}

#[test]
fn fin_deferred_while_unacked() {
    let (mut iface, mut client, peer_seq) = connected();
    let start = client.local_seq();
    send_data(&mut iface, &mut client, b"data");
    let sent = iface.device().sent().len();

    iface.device_mut().push_recv(&from_peer(&client, peer_seq, start, TcpFlags::FIN | TcpFlags::ACK, &[]));
    assert_eq!(client.poll(&mut iface, at(500)), Activity::empty());
    assert_eq!(client.state(), State::Connected);
    assert_eq!(client.remote_seq(), peer_seq);
    assert_eq!(iface.device().sent().len(), sent);

    // The retransmitted FIN also acknowledges our data.
    iface.device_mut().push_recv(&from_peer(&client, peer_seq, start + 4, TcpFlags::FIN | TcpFlags::ACK, &[]));
    assert_eq!(client.poll(&mut iface, at(750)), Activity::ACKED | Activity::CLOSE);
    assert_eq!(client.state(), State::LastAck);
    assert_eq!(last_segment(&iface).seq, start + 4);
}

#[test]
fn fin_retransmitted() {
    let (mut iface, mut client, peer_seq) = connected();
    let local = client.local_seq();

    iface.device_mut().push_recv(&from_peer(&client, peer_seq, local, TcpFlags::FIN | TcpFlags::ACK, &[]));
    client.poll(&mut iface, at(500));
    let sent = iface.device().sent().len();

    let mut tick = 3;
    while iface.device().sent().len() == sent {
        assert!(tick < 100, "FIN was never retransmitted");
        client.poll(&mut iface, at(tick * 250));
        tick += 1;
    }

    let fin = last_segment(&iface);
    assert_eq!(fin.flags, TcpFlags::FIN | TcpFlags::ACK);
    assert_eq!(fin.seq, local);
    assert_eq!(fin.headers.dst_mac, MAC_OTHER);
    assert_eq!(client.stats().fin_retransmits, 1);
    assert_eq!(client.state(), State::LastAck);
}

#[test]
fn reset_aborts() {
    let (mut iface, mut client, peer_seq) = connected();
    let sent = iface.device().sent().len();

    iface.device_mut().push_recv(&from_peer(&client, peer_seq, TcpSeqNumber(0), TcpFlags::RST, &[]));
    assert_eq!(client.poll(&mut iface, at(500)), Activity::ABORT);
    assert!(client.aborted());
    assert_eq!(client.state(), State::Disconnected);

    // Nothing is answered once disconnected.
    iface.device_mut().push_recv(&from_peer(&client, peer_seq, TcpSeqNumber(0), TcpFlags::ACK, b"late"));
    assert_eq!(client.poll(&mut iface, at(750)), Activity::empty());
    assert_eq!(iface.device().sent().len(), sent);
}

#[test]
fn wrong_port_reset() {
    let (mut iface, mut client, _) = connected();
    let port = client.socket().local_port().wrapping_add(1);
    let (seq, ack) = (TcpSeqNumber(5000), TcpSeqNumber(7000));

    iface.device_mut().push_recv(&tcp_frame(REMOTE_PORT, port, seq, ack, TcpFlags::ACK, b"x"));
    client.poll(&mut iface, at(500));

    let reset = last_segment(&iface);
    assert_eq!(reset.flags, TcpFlags::RST | TcpFlags::ACK);
    assert_eq!(reset.src_port, port);
    assert_eq!(reset.dst_port, REMOTE_PORT);
    assert_eq!(reset.seq, ack);
    assert_eq!(reset.ack, seq + 1);
    assert_eq!(reset.headers.dst_mac, MAC_OTHER);
    assert_eq!(client.state(), State::Connected);
}

#[test]
fn wrong_port_syn_and_reset_ignored() {
    let (mut iface, mut client, _) = connected();
    let port = client.socket().local_port().wrapping_add(1);
    let sent = iface.device().sent().len();
    let dropped = client.stats().dropped;

    iface.device_mut().push_recv(&tcp_frame(REMOTE_PORT, port, TcpSeqNumber(1), TcpSeqNumber(0), TcpFlags::SYN, &[]));
    client.poll(&mut iface, at(500));
    assert_eq!(client.stats().dropped, dropped + 1);

    iface.device_mut().push_recv(&tcp_frame(REMOTE_PORT, port, TcpSeqNumber(1), TcpSeqNumber(0), TcpFlags::RST, &[]));
    client.poll(&mut iface, at(750));

    assert_eq!(iface.device().sent().len(), sent);
    assert_eq!(client.state(), State::Connected);
}

#[test]
fn foreign_segments_dropped() {
    let (mut iface, mut client, peer_seq) = connected();
    let local = client.local_seq();
    let sent = iface.device().sent().len();

    // Wrong checksum.
    let mut frame = from_peer(&client, peer_seq, local, TcpFlags::ACK, b"data");
    let last = frame.len() - 1;
    frame[last] ^= 0xff;
    iface.device_mut().push_recv(&frame);
    // Wrong remote port.
    let port = client.socket().local_port();
    iface.device_mut().push_recv(&tcp_frame(REMOTE_PORT + 1, port, peer_seq, local, TcpFlags::ACK, b"data"));

    for tick in 2..4 {
        assert!(!client.have_packet(&mut iface, at(tick * 250)));
    }
    assert_eq!(client.stats().dropped, 2);
    assert_eq!(client.remote_seq(), peer_seq);
    assert_eq!(iface.device().sent().len(), sent);
}

#[test]
fn handshake_failure_resets() {
    let (mut iface, mut client) = setup();
    client.connect(&mut iface, at(0)).unwrap();
    let syn = last_segment(&iface);

    // Acknowledges the SYN but is not a SYN itself.
    iface.device_mut().push_recv(&from_peer(&client, PEER_ISN, syn.seq + 1, TcpFlags::ACK, &[]));
    assert_eq!(client.poll(&mut iface, at(250)), Activity::ABORT);
    assert_eq!(client.state(), State::Disconnected);

    let reset = last_segment(&iface);
    assert_eq!(reset.flags, TcpFlags::RST | TcpFlags::ACK);
    assert_eq!(reset.seq, syn.seq + 1);
    assert_eq!(reset.ack, PEER_ISN + 1);
}

#[test]
fn inactivity_recommends_reset() {
    let (mut iface, mut client, _) = connected();

    assert_eq!(client.poll(&mut iface, at(500)), Activity::empty());
    let timeout = INACTIVITY_TIMEOUT.as_millis() as i64;
    assert_eq!(client.poll(&mut iface, at(500 + timeout - 1)), Activity::empty());
    assert_eq!(client.poll(&mut iface, at(500 + timeout)), Activity::RESET);
    assert!(client.reset_recommended());
    assert!(client.is_alive());
    assert_eq!(client.state(), State::Connected);

    // The signal counts as activity itself.
    assert_eq!(client.poll(&mut iface, at(750 + timeout)), Activity::empty());
}

#[test]
fn send_needs_connection() {
    let (mut iface, mut client) = setup();
    assert_eq!(client.send(&mut iface, 5, false), Err(Error::Illegal));

    client.connect(&mut iface, at(0)).unwrap();
    assert_eq!(client.send(&mut iface, 5, false), Err(Error::Illegal));
    assert_eq!(client.unacked(), 1);
}

#[test]
fn connect_needs_resolution() {
    let mut iface = interface();
    let mut client = Client::new(remote(), REMOTE_PORT, IsnGenerator::from_key(1, 2));
    let port = client.socket().local_port();

    assert_eq!(client.connect(&mut iface, at(0)), Err(Error::Unreachable));
    assert_eq!(client.state(), State::Disconnected);
    assert_eq!(client.socket().local_port(), port);
    assert!(iface.device().sent().is_empty());
}

#[test]
fn send_too_large() {
    let (mut iface, mut client, _) = connected();
    let capacity = client.transmit_payload(&mut iface).len();
    assert_eq!(client.send(&mut iface, capacity + 1, false), Err(Error::BadSize));
    assert_eq!(client.unacked(), 0);
}

#[test]
fn state_display() {
    assert_eq!(format!("{}", State::WaitSynAck), "WAIT-SYN-ACK");
    assert_eq!(format!("{}", State::default()), "DISCONNECTED");
}
