//! RFC 2460 §8.1 upper-layer checksum.
//!
//! Kept as the single place in the workspace that folds one's-complement
//! sums; packet crafters call this instead of byte-swapping inline.

use std::net::Ipv6Addr;

/// Checksum of a transport segment carried in an IPv6 packet.
///
/// Covers the pseudo-header (source, destination, upper-layer length,
/// next-header) followed by `segment`, whose checksum field must be zeroed
/// by the caller beforehand. An odd trailing byte is padded with zero.
pub fn ipv6_payload_checksum(
    src: &Ipv6Addr,
    dst: &Ipv6Addr,
    next_header: u8,
    segment: &[u8],
) -> u16 {
    let mut sum: u32 = 0;
    sum = sum_be_words(sum, &src.octets());
    sum = sum_be_words(sum, &dst.octets());

    let upper_len = segment.len() as u32;
    sum += upper_len >> 16;
    sum += upper_len & 0xffff;
    sum += u32::from(next_header);

    sum = sum_be_words(sum, segment);

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

fn sum_be_words(mut sum: u32, bytes: &[u8]) -> u32 {
    let mut words = bytes.chunks_exact(2);
    for word in &mut words {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = words.remainder() {
        sum += u32::from(u16::from_be_bytes([*last, 0]));
    }
    sum
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
