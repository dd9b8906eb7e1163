//! Shared fixtures for the integration tests: a canned scan configuration
//! and a reply builder that plays the role of a probed host.

use std::net::{IpAddr, Ipv6Addr};

use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv6::MutableIpv6Packet;
use pnet::packet::tcp::MutableTcpPacket;
use pnet::util::MacAddr;

use sweepr_common::network::{IPV6_HDR_LEN, TCP_HDR_LEN};
use sweepr_core::config::ScanConfig;
use sweepr_core::probe::{ProbeModule, ProbeTarget};
use sweepr_core::validate::Validation;

pub const SCANNER: &str = "2001:db8::1";
pub const TARGET: &str = "2001:db8::2";

pub fn scanner() -> Ipv6Addr {
    SCANNER.parse().unwrap()
}

pub fn target() -> Ipv6Addr {
    TARGET.parse().unwrap()
}

/// A small source-port range keeps the derivation windows easy to reason
/// about in assertions.
pub fn scan_config() -> ScanConfig {
    let mut config = ScanConfig::new(IpAddr::V6(scanner()));
    config.source_ports = sweepr_common::network::ports::SourcePortRange::new(40000, 40063);
    config
}

/// Crafts one outgoing probe frame through the full module lifecycle.
pub fn craft_probe(
    module: &dyn ProbeModule,
    validation: &Validation,
    dst_port: u16,
    probe_num: u16,
) -> Vec<u8> {
    let mut buf = vec![0u8; module.descriptor().max_packet_length];
    module
        .prepare_packet(&mut buf, MacAddr::zero(), MacAddr::broadcast())
        .expect("template fits the declared maximum");
    let probe = ProbeTarget {
        src_addr: IpAddr::V6(scanner()),
        dst_addr: IpAddr::V6(target()),
        dst_port,
        ttl: 64,
        ip_id: 0,
    };
    let wire_len = module
        .make_packet(&mut buf, &probe, validation, probe_num)
        .expect("per-target fill fits the declared maximum");
    buf.truncate(wire_len);
    buf
}

/// What the probed host sends back.
pub struct ReplySpec {
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
    pub sport: u16,
    pub dport: u16,
    pub ack: u32,
    pub flags: u8,
    /// Overrides the IPv6 payload-length field when set, to fake replies
    /// whose header claims more than the capture holds.
    pub declared_payload_len: Option<u16>,
    pub next_header: pnet::packet::ip::IpNextHeaderProtocol,
}

impl ReplySpec {
    pub fn new(sport: u16, dport: u16, ack: u32, flags: u8) -> Self {
        Self {
            src: target(),
            dst: scanner(),
            sport,
            dport,
            ack,
            flags,
            declared_payload_len: None,
            next_header: IpNextHeaderProtocols::Tcp,
        }
    }
}

/// Builds a reply as the capture path would hand it over: starting at the
/// IPv6 header, options-free TCP, no link layer.
pub fn build_reply(spec: &ReplySpec) -> Vec<u8> {
    let mut packet = vec![0u8; IPV6_HDR_LEN + TCP_HDR_LEN];
    {
        let mut ip = MutableIpv6Packet::new(&mut packet).expect("buffer holds an IPv6 header");
        ip.set_version(6);
        ip.set_payload_length(spec.declared_payload_len.unwrap_or(TCP_HDR_LEN as u16));
        ip.set_next_header(spec.next_header);
        ip.set_hop_limit(58);
        ip.set_source(spec.src);
        ip.set_destination(spec.dst);
    }
    {
        let mut tcp = MutableTcpPacket::new(&mut packet[IPV6_HDR_LEN..])
            .expect("buffer holds a TCP header");
        tcp.set_source(spec.sport);
        tcp.set_destination(spec.dport);
        tcp.set_sequence(0x1020_3040);
        tcp.set_acknowledgement(spec.ack);
        tcp.set_data_offset(5);
        tcp.set_flags(spec.flags);
        tcp.set_window(28800);
    }
    packet
}
