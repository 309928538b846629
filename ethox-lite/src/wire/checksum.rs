//! The Internet checksum of RFC 1071.
//!
//! The checksum is the one's complement of the one's complement sum of all 16-bit big-endian
//! words of the data. An odd trailing byte is treated as if padded with a zero low byte. Upper
//! layer protocols of IPv6 (ICMPv6, TCP, UDP) sum a pseudo header consisting of source address,
//! destination address, upper-layer length and protocol number first, followed by their header
//! and payload with the checksum field zeroed.
//!
//! The functions here all work on the folded sum *without* the final complement. Complement the
//! result once before writing it into a header. A packet whose checksum field is correct sums,
//! including that field, to `!0`.
use byteorder::{ByteOrder, NetworkEndian};

use super::{IpProtocol, Ipv6Address};

/// Fold all carries of a wide accumulator back into the low 16 bits.
fn propagate_carries(word: u32) -> u16 {
    let sum = (word >> 16) + (word & 0xffff);
    ((sum >> 16) as u16) + (sum as u16)
}

/// Continue a running sum over more data.
///
/// All words of `data` are accumulated in a 32-bit accumulator and the carries are folded back
/// only once the whole range is summed. Chaining `running` over several ranges is the same as a
/// single call over their concatenation, provided all but the last range have even length.
pub fn running(sum: u16, mut data: &[u8]) -> u16 {
    let mut accum = u32::from(sum);

    // For each 32-byte chunk...
    const CHUNK_SIZE: usize = 32;
    while data.len() >= CHUNK_SIZE {
        let mut d = &data[..CHUNK_SIZE];
        // ... take by 2 bytes and sum them.
        while d.len() >= 2 {
            accum += u32::from(NetworkEndian::read_u16(d));
            d = &d[2..];
        }

        data = &data[CHUNK_SIZE..];
    }

    // Sum the rest that does not fit the last 32-byte chunk,
    // taking by 2 bytes.
    while data.len() >= 2 {
        accum += u32::from(NetworkEndian::read_u16(data));
        data = &data[2..];
    }

    // Add the last remaining odd byte, if any.
    if let Some(&value) = data.first() {
        accum += u32::from(value) << 8;
    }

    propagate_carries(accum)
}

/// Compute the folded sum of a single range.
pub fn data(data: &[u8]) -> u16 {
    running(0, data)
}

/// Combine several folded sums.
pub fn combine(checksums: &[u16]) -> u16 {
    let mut accum: u32 = 0;
    for &word in checksums {
        accum += u32::from(word);
    }
    propagate_carries(accum)
}

/// Compute the sum of an IPv6 pseudo header.
///
/// The upper-layer packet length is a 32-bit field in the IPv6 pseudo header, followed by three
/// zero bytes and the next header value.
pub fn pseudo_header(
    src_addr: &Ipv6Address,
    dst_addr: &Ipv6Address,
    protocol: IpProtocol,
    length: u32,
) -> u16 {
    let mut proto_len = [0u8; 8];
    proto_len[7] = protocol.into();
    NetworkEndian::write_u32(&mut proto_len[0..4], length);
    combine(&[
        data(src_addr.as_bytes()),
        data(dst_addr.as_bytes()),
        data(&proto_len[..])
    ])
}

/// Compute the value of the checksum field for an upper layer packet.
///
/// The checksum field inside `packet` must be zero. The returned value is already complemented
/// and can be written as is.
pub fn upper_layer(
    src_addr: &Ipv6Address,
    dst_addr: &Ipv6Address,
    protocol: IpProtocol,
    packet: &[u8],
) -> u16 {
    !combine(&[
        pseudo_header(src_addr, dst_addr, protocol, packet.len() as u32),
        data(packet),
    ])
}

/// Verify an upper layer packet including its checksum field.
pub fn verify_upper_layer(
    src_addr: &Ipv6Address,
    dst_addr: &Ipv6Address,
    protocol: IpProtocol,
    packet: &[u8],
) -> bool {
    combine(&[
        pseudo_header(src_addr, dst_addr, protocol, packet.len() as u32),
        data(packet),
    ]) == !0
}
