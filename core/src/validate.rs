//! Stateless probe validation.
//!
//! A scanner pushing millions of probes per second cannot keep a record per
//! target. Instead, every outgoing probe embeds values derived from the
//! flow tuple and a secret drawn once at startup; when a reply arrives, the
//! same derivation over the reply's (swapped) tuple reproduces those values
//! and proves the reply answers a probe this process actually sent.
//!
//! The derivation must be unpredictable to anyone who does not hold the
//! secret, or an off-path host could spoof acknowledgments. It is keyed
//! HMAC-SHA-256 here, truncated to [`VALIDATE_BYTES`].

use std::net::{Ipv4Addr, Ipv6Addr};

use hmac::digest::Key;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use sweepr_common::network::ports::SourcePortRange;

type HmacSha256 = Hmac<Sha256>;

pub const VALIDATE_BYTES: usize = 16;
pub const VALIDATE_WORDS: usize = VALIDATE_BYTES / 4;

/// Holds the process-lifetime secret.
///
/// Created exactly once before the first probe is sent and read-only from
/// then on. Regenerating it mid-run would orphan every in-flight probe.
#[derive(Clone)]
pub struct Validator {
    key: Key<HmacSha256>,
}

impl Validator {
    /// Draws a fresh secret. Call once at engine start.
    pub fn new() -> Self {
        let mut key = Key::<HmacSha256>::default();
        rand::rng().fill(key.as_mut_slice());
        Self { key }
    }

    /// Builds a validator over a fixed secret. Any two validators built
    /// from the same bytes agree on every tuple.
    pub fn with_secret(secret: &[u8]) -> Self {
        let mut key = Key::<HmacSha256>::default();
        let take = secret.len().min(key.len());
        key.as_mut_slice()[..take].copy_from_slice(&secret[..take]);
        Self { key }
    }

    /// The generic primitive: mixes an ordered word sequence and the
    /// destination port with the secret. Total over its domain; identical
    /// inputs always produce identical output within one process run.
    pub fn generate(&self, words: &[u32], dst_port: u16) -> Validation {
        let mut mac = HmacSha256::new(&self.key);
        for word in words {
            mac.update(&word.to_be_bytes());
        }
        mac.update(&dst_port.to_be_bytes());
        let tag = mac.finalize().into_bytes();

        let mut bytes = [0u8; VALIDATE_BYTES];
        bytes.copy_from_slice(&tag[..VALIDATE_BYTES]);
        Validation::from_bytes(bytes)
    }

    /// 4-tuple variant over 32-bit addresses.
    pub fn tuple_v4(&self, src: Ipv4Addr, dst: Ipv4Addr, dst_port: u16) -> Validation {
        self.generate(&[u32::from(src), u32::from(dst)], dst_port)
    }

    /// 6-tuple variant over 128-bit addresses, eight words total.
    pub fn tuple_v6(&self, src: &Ipv6Addr, dst: &Ipv6Addr, dst_port: u16) -> Validation {
        let src_octets = src.octets();
        let dst_octets = dst.octets();
        let chunks = src_octets.chunks_exact(4).chain(dst_octets.chunks_exact(4));

        let mut words = [0u32; 8];
        for (word, chunk) in words.iter_mut().zip(chunks) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        self.generate(&words, dst_port)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// The 16 validation bytes, viewed as four 32-bit words.
///
/// Word 0 becomes the probe's sequence number; word 1 feeds source-port
/// derivation. A receiver regenerates the same words from the reply's
/// swapped tuple and compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    words: [u32; VALIDATE_WORDS],
}

impl Validation {
    pub fn from_bytes(bytes: [u8; VALIDATE_BYTES]) -> Self {
        let mut words = [0u32; VALIDATE_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self { words }
    }

    pub fn word(&self, index: usize) -> u32 {
        self.words[index]
    }

    /// Sequence number stamped into the outgoing probe.
    pub fn sequence(&self) -> u32 {
        self.words[0]
    }

    /// Acknowledgment number a genuine reply to our SYN must carry.
    pub fn expected_ack(&self) -> u32 {
        self.words[0].wrapping_add(1)
    }
}

/// Ephemeral source port for one probe attempt. Folding the attempt number
/// through word 1 keeps concurrently outstanding probes to the same target
/// distinguishable.
pub fn source_port(range: &SourcePortRange, probe_num: u16, validation: &Validation) -> u16 {
    let offset = validation.word(1).wrapping_add(u32::from(probe_num)) % range.count();
    range.first + offset as u16
}

/// Whether `port` is one of the source ports this process could have used
/// for the probed tuple, given `packet_streams` concurrent attempts.
///
/// The attempt offsets occupy a circular window of the range starting at
/// `word 1 mod count`; membership is a wrap-aware offset comparison.
pub fn covers_source_port(
    port: u16,
    range: &SourcePortRange,
    packet_streams: u16,
    validation: &Validation,
) -> bool {
    if !range.contains(port) {
        return false;
    }
    let num_ports = i64::from(range.count());
    let to_validate = i64::from(port - range.first);
    let min = i64::from(validation.word(1)) % num_ports;
    let max = (i64::from(validation.word(1)) + i64::from(packet_streams) - 1) % num_ports;

    (max - min).rem_euclid(num_ports) >= (to_validate - min).rem_euclid(num_ports)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
