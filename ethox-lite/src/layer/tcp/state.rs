use core::fmt;

/// The state of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// No connection, inbound segments are ignored.
    Disconnected,
    /// Our SYN was sent, waiting for the SYN of the peer.
    WaitSynAck,
    /// Data can be exchanged.
    Connected,
    /// The peer closed, waiting for the acknowledgment of our FIN.
    LastAck,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            State::Disconnected => "DISCONNECTED",
            State::WaitSynAck => "WAIT-SYN-ACK",
            State::Connected => "CONNECTED",
            State::LastAck => "LAST-ACK",
        })
    }
}

impl Default for State {
    fn default() -> Self {
        State::Disconnected
    }
}

bitflags::bitflags! {
    /// What happened during one poll of the connection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Activity: u8 {
        /// All outstanding bytes were acknowledged.
        const ACKED     = 1;
        /// Data arrived and can be read from the payload.
        const NEW_DATA  = 2;
        /// The last data segment must be sent again.
        const REXMIT    = 8;
        /// The peer closed the connection.
        const CLOSE     = 16;
        /// The connection was reset or the handshake failed.
        const ABORT     = 32;
        /// The handshake completed.
        const CONNECTED = 64;
        /// Nothing happened for a long time.
        const RESET     = 128;
    }
}

/// Counters of a connection, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Stats {
    /// Packets seen by the client.
    pub received: u32,
    /// Packets that were not for the connection or not valid.
    pub dropped: u32,
    /// Retransmitted SYNs.
    pub syn_retransmits: u32,
    /// Requests to the application to resend data.
    pub data_retransmits: u32,
    /// Retransmitted FINs.
    pub fin_retransmits: u32,
}
