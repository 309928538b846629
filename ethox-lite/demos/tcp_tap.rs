//! Connects to a tcp server through a tap interface and prints what it sends.
//!
//! # Usage
//!
//! The stack configures itself: the link-local address is derived from the given MAC, a global
//! address and the default router are learned from router advertisements if the link has a
//! router. The following steps set up a link to the host system (likely requires root or sudo):
//!
//! 1. Setup the tap interface, named `tap0` here:
//!
//!   > $ ip tuntap add mode tap name tap0
//! 2. Bring up the interface on the host, which assigns a link-local address
//!
//!   > $ ip link set up dev tap0
//! 3. Start a server on the host, for example
//!
//!   > $ nc -6 -l -p 8000
//! 4. Start the example with the link-local address of the host.
//!
//!   > $ cargo run --features sys --example tcp_tap -- tap0 02:00:00:00:00:01 fe80::xxxx 8000 -m hello
//!
//! Everything the server sends is printed to stdout. The example exits when the server closes
//! the connection.
use std::io::{stdout, Write};
use std::net;
use std::os::unix::io::AsRawFd;
use std::process;
use structopt::StructOpt;

use ethox_lite::layer::eth::{Interface, FRAME_BUFFER_LEN};
use ethox_lite::layer::socket::{Connection, Resolution};
use ethox_lite::layer::tcp::{Activity, Client, IsnGenerator, State};
use ethox_lite::nic::sys::{sys_now, sys_wait, TapInterface};
use ethox_lite::time::{Duration, Instant};
use ethox_lite::wire::EthernetAddress;

fn main() {
    let Config {
        name,
        hostmac,
        server,
        server_port,
        message,
    } = Config::from_args();

    let device = TapInterface::new(&name)
        .expect(&format!("Couldn't initialize interface {}", name));
    let fd = device.as_raw_fd();

    let out = stdout();
    let mut out = out.lock();

    match device.mtu() {
        Ok(mtu) if mtu + 14 > FRAME_BUFFER_LEN => eprintln!("Frames over {} bytes are dropped", FRAME_BUFFER_LEN),
        Ok(_) => (),
        Err(err) => eprintln!("Couldn't query the mtu: {}", err),
    }

    let mut iface = Interface::new(device, vec![0; FRAME_BUFFER_LEN], hostmac)
        .expect("Frame buffer too small");

    iface.begin(now());
    writeln!(out, "Started on {}", iface.link_local_address()).unwrap();

    let mut client = Client::new(server.into(), server_port, IsnGenerator::from_std_hash());

    loop {
        match client.resolve(&mut iface, now()) {
            Resolution::Resolved(mac) => {
                writeln!(out, "Next hop towards {} is {}", server, mac).unwrap();
                break;
            },
            Resolution::Failed => {
                eprintln!("Could not resolve {}", server);
                process::exit(1);
            },
            _ => wait(fd),
        }
    }

    if let Some(global) = iface.global_address() {
        writeln!(out, "Global address {}", global).unwrap();
    }

    client.connect(&mut iface, now()).expect("Couldn't send SYN");

    loop {
        let activity = client.poll(&mut iface, now());

        // Read before sending, sending overwrites the buffer.
        if activity.contains(Activity::NEW_DATA) {
            out.write_all(client.payload(&iface)).unwrap();
            out.flush().unwrap();
        }

        if activity.intersects(Activity::CONNECTED | Activity::REXMIT) {
            if let Some(message) = &message {
                let payload = client.transmit_payload(&mut iface);
                let len = message.len().min(payload.len());
                payload[..len].copy_from_slice(&message.as_bytes()[..len]);
                if let Err(err) = client.send(&mut iface, len, false) {
                    eprintln!("Sending failed: {}", err);
                }
            }
        }

        if activity.contains(Activity::ABORT) {
            eprintln!("Connection reset");
            process::exit(1);
        }

        if activity.contains(Activity::RESET) {
            eprintln!("Connection idle for too long");
            break;
        }

        if client.state() == State::Disconnected {
            break;
        }

        if !activity.contains(Activity::NEW_DATA) {
            wait(fd);
        }
    }

    let stats = client.stats();
    eprintln!("Received {} segments, dropped {}", stats.received, stats.dropped);
}

fn now() -> Instant {
    sys_now().expect("Couldn't read the clock")
}

fn wait(fd: i32) {
    sys_wait(fd, Some(Duration::from_millis(50))).expect("Couldn't wait on the interface");
}

#[derive(StructOpt)]
struct Config {
    name: String,
    hostmac: EthernetAddress,
    server: net::Ipv6Addr,
    server_port: u16,
    /// Sent once the connection is established.
    #[structopt(short = "m", long = "message")]
    message: Option<String>,
}
