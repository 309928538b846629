//! Pings a host through a tap interface.
//!
//! # Usage
//!
//! Setup the tap interface as for the `tcp_tap` example, then ping the link-local address of the
//! host:
//!
//!   > $ cargo run --features sys --example ping_tap -- tap0 02:00:00:00:00:01 fe80::xxxx -c 4
//!
//! Pings from the host to the stack are answered while the example runs.
use std::io::{stdout, Write};
use std::net;
use std::os::unix::io::AsRawFd;
use std::process;
use structopt::StructOpt;

use ethox_lite::layer::eth::{Interface, FRAME_BUFFER_LEN};
use ethox_lite::layer::icmp::PingClient;
use ethox_lite::layer::socket::{Connection, Resolution};
use ethox_lite::layer::tcp::IsnGenerator;
use ethox_lite::nic::sys::{sys_now, sys_wait, TapInterface};
use ethox_lite::time::{Duration, Instant};
use ethox_lite::wire::EthernetAddress;

const INTERVAL: Duration = Duration::from_millis(1000);

fn main() {
    let Config {
        name,
        hostmac,
        remote,
        count,
    } = Config::from_args();

    let device = TapInterface::new(&name)
        .expect(&format!("Couldn't initialize interface {}", name));
    let fd = device.as_raw_fd();
    let mut iface = Interface::new(device, vec![0; FRAME_BUFFER_LEN], hostmac)
        .expect("Frame buffer too small");
    iface.begin(now());

    let ident = IsnGenerator::from_std_hash().get_ident(remote.into());
    let mut ping = PingClient::new(remote.into(), ident);

    loop {
        match ping.socket_mut().resolve(&mut iface, now()) {
            Resolution::Resolved(_) => break,
            Resolution::Failed => {
                eprintln!("Could not resolve {}", remote);
                process::exit(1);
            },
            _ => wait(fd),
        }
    }

    let out = stdout();
    let mut out = out.lock();
    let mut answered = 0;

    for _ in 0..count {
        let sent_at = now();
        ping.send_request(&mut iface).expect("Couldn't send echo request");
        let seq_no = ping.seq_no().wrapping_sub(1);

        loop {
            if ping.have_packet(&mut iface, now()) {
                let rtt = now().since(sent_at);
                writeln!(out, "Reply from {}: seq={} time={}ms", remote, seq_no, rtt.as_millis()).unwrap();
                answered += 1;
            }

            if now().since(sent_at) >= INTERVAL {
                break;
            }
            wait(fd);
        }
    }

    writeln!(out, "{} requests, {} replies", count, answered).unwrap();
}

fn now() -> Instant {
    sys_now().expect("Couldn't read the clock")
}

fn wait(fd: i32) {
    sys_wait(fd, Some(Duration::from_millis(10))).expect("Couldn't wait on the interface");
}

#[derive(StructOpt)]
struct Config {
    name: String,
    hostmac: EthernetAddress,
    remote: net::Ipv6Addr,
    /// Number of requests to send.
    #[structopt(short = "c", long = "count", default_value = "4")]
    count: u16,
}
