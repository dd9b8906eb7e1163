//! The central **abstraction** for probe protocols.
//!
//! This module defines the unified lifecycle every wire protocol must
//! implement so that one scan engine can drive them all: construct once,
//! stamp a send template, fill per-target fields, classify captured
//! replies, and parse the survivors into output fields.
//!
//! **Architectural note:**
//! The engine depends strictly on [`ProbeModule`] and never on a concrete
//! protocol type; modules are looked up by name at startup (see
//! `sweepr-probes`). A module is constructed single-threaded, before any
//! worker starts, and is immutable afterwards — every callback takes
//! `&self` plus a caller-owned buffer, so concurrent sending and receiving
//! threads need no locks.

use std::io::{self, Write};
use std::net::IpAddr;
use std::time::SystemTime;

use pnet::util::MacAddr;

use sweepr_common::error::ProbeError;
use sweepr_common::network::ports::TargetPorts;

use crate::fieldset::{FieldDef, FieldSet};
use crate::validate::Validation;

/// How a captured packet relates to the running scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketValidity {
    /// Answers a probe this process sent to a swept port.
    Valid,
    /// Malformed, truncated, or failed a validation check. Dropped
    /// silently; the network delivers arbitrary and hostile traffic.
    Invalid,
    /// Well formed and addressed to us, but not to a port in the current
    /// sweep. Not an error, just somebody else's conversation.
    OffTarget,
}

/// Immutable facts about a constructed module.
///
/// Mutable exactly once, during construction: the maximum packet length
/// grows by the decoded option length and the capture filter gains a
/// source-address clause. Read-only for the rest of the process lifetime.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub name: &'static str,
    /// Largest wire frame `make_packet` will produce; send buffers must be
    /// at least this long.
    pub max_packet_length: usize,
    /// Capture filter handed to the receive loop.
    pub pcap_filter: String,
    /// Capture truncation length; sized for headers plus maximum options.
    pub pcap_snaplen: usize,
    /// How many destination ports one probe consumes (1 = single port).
    pub port_args: usize,
    pub helptext: &'static str,
    /// Output schema, in emission order.
    pub fields: &'static [FieldDef],
}

/// One concrete probe to stamp over the send template.
#[derive(Debug, Clone, Copy)]
pub struct ProbeTarget {
    pub src_addr: IpAddr,
    pub dst_addr: IpAddr,
    pub dst_port: u16,
    pub ttl: u8,
    /// Network-layer identification; unused by protocols without one.
    pub ip_id: u16,
}

/// Lifecycle contract between the scan engine and a wire protocol.
///
/// Call order per run: construction (module-specific, from a
/// [`crate::config::ScanConfig`]), then `prepare_packet` once per send
/// buffer, then `make_packet` per target/attempt immediately before
/// transmission. On the receive side `validate_packet` gates every
/// captured packet and `process_packet` runs only for `Valid` ones.
pub trait ProbeModule: Send + Sync {
    fn descriptor(&self) -> &ModuleDescriptor;

    /// Writes the fields shared by all targets of the run into `buf`:
    /// link-layer addresses, network protocol, initial flags.
    fn prepare_packet(
        &self,
        buf: &mut [u8],
        src_mac: MacAddr,
        gw_mac: MacAddr,
    ) -> Result<(), ProbeError>;

    /// Overwrites the per-target fields on top of the template and returns
    /// the wire length to transmit.
    fn make_packet(
        &self,
        buf: &mut [u8],
        target: &ProbeTarget,
        validation: &Validation,
        probe_num: u16,
    ) -> Result<usize, ProbeError>;

    /// Classifies a captured packet. `ip_packet` starts at the network
    /// header; `validation` was regenerated from the packet's swapped
    /// tuple. Must never read past the captured bytes.
    fn validate_packet(
        &self,
        ip_packet: &[u8],
        validation: &Validation,
        target_ports: &TargetPorts,
    ) -> PacketValidity;

    /// Extracts output fields from a frame that already classified
    /// [`PacketValidity::Valid`]; performs no re-validation.
    fn process_packet(
        &self,
        packet: &[u8],
        validation: &Validation,
        ts: SystemTime,
    ) -> Result<FieldSet, ProbeError>;

    /// Best-effort human-readable dump of a crafted or captured frame.
    fn print_packet(&self, out: &mut dyn Write, packet: &[u8]) -> io::Result<()>;

    /// Teardown hook. Modules without run-long resources keep the default.
    fn close(&mut self) -> Result<(), ProbeError> {
        Ok(())
    }
}
