//! IPv6 TCP SYN probe with raw, operator-supplied TCP options.
//!
//! A SYN-ACK reply is a success, a reset a failed response. The module
//! keeps no per-target state: the sequence number and source port of every
//! probe are derived from the flow tuple, so any captured reply can be
//! checked against a regenerated [`Validation`] alone.

use std::io::{self, Write};
use std::net::IpAddr;
use std::time::SystemTime;

use pnet::packet::Packet;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv6::{Ipv6Packet, MutableIpv6Packet};
use pnet::packet::tcp::{MutableTcpPacket, TcpFlags, TcpPacket};
use pnet::util::MacAddr;
use tracing::debug;

use sweepr_common::error::ProbeError;
use sweepr_common::network::checksum::ipv6_payload_checksum;
use sweepr_common::network::ports::{SourcePortRange, TargetPorts};
use sweepr_common::network::{ETH_HDR_LEN, IPV6_HDR_LEN, TCP_HDR_LEN};

use sweepr_core::config::ScanConfig;
use sweepr_core::fieldset::{FieldDef, FieldKind, FieldSet};
use sweepr_core::probe::{ModuleDescriptor, PacketValidity, ProbeModule, ProbeTarget};
use sweepr_core::validate::{self, Validation};

use crate::options::{self, MAX_OPT_LEN};

/// Frame length with no options: Ethernet + IPv6 + fixed TCP header.
const BASE_PACKET_LEN: usize = ETH_HDR_LEN + IPV6_HDR_LEN + TCP_HDR_LEN;
/// Headers plus the full option space.
const SNAPLEN: usize = 116 + MAX_OPT_LEN;

/// TCP over IPv6, carrying ACK or SYN+RST flag combinations.
const BASE_FILTER: &str = "ip6 proto 6 && (ip6[53] & 4 != 0 || ip6[53] == 18)";

const HELPTEXT: &str = "Probe module that sends an IPv6+TCP SYN packet to a specific port, \
with raw TCP options appended from a hex:<data> argument. Possible \
classifications are: synack and rst. A SYN-ACK packet is considered a \
success and a reset packet is considered a failed response.";

static FIELDS: &[FieldDef] = &[
    FieldDef { name: "sport", kind: FieldKind::Uint, help: "TCP source port" },
    FieldDef { name: "dport", kind: FieldKind::Uint, help: "TCP destination port" },
    FieldDef { name: "seqnum", kind: FieldKind::Uint, help: "TCP sequence number" },
    FieldDef { name: "acknum", kind: FieldKind::Uint, help: "TCP acknowledgement number" },
    FieldDef { name: "window", kind: FieldKind::Uint, help: "TCP window size" },
    FieldDef { name: "flags", kind: FieldKind::Uint, help: "TCP flag bits" },
    FieldDef { name: "classification", kind: FieldKind::Str, help: "packet classification" },
    FieldDef { name: "success", kind: FieldKind::Uint, help: "is response considered success" },
    FieldDef { name: "options", kind: FieldKind::Bytes, help: "raw TCP option bytes of the reply" },
];

pub struct Ipv6TcpSynOpt {
    descriptor: ModuleDescriptor,
    options: Vec<u8>,
    source_ports: SourcePortRange,
    packet_streams: u16,
    validate_source_port: bool,
}

impl Ipv6TcpSynOpt {
    pub const NAME: &'static str = "ipv6_tcp_synopt";

    /// Runs once, single-threaded, before any packet is sent.
    ///
    /// Decodes the option argument, extends the declared maximum packet
    /// length by the decoded bytes, and narrows the capture filter to
    /// packets destined to our own source address so parallel scan
    /// processes on one device do not cross replies.
    pub fn initialize(config: &ScanConfig) -> Result<Self, ProbeError> {
        let options = options::parse_probe_args(config.probe_args.as_deref())?;
        if options.is_empty() {
            debug!("no probe args, sending bare SYNs");
        }

        let descriptor = ModuleDescriptor {
            name: Self::NAME,
            max_packet_length: BASE_PACKET_LEN + options.len(),
            pcap_filter: format!("{BASE_FILTER} && ip6 dst host {}", config.source_addr),
            pcap_snaplen: SNAPLEN,
            port_args: 1,
            helptext: HELPTEXT,
            fields: FIELDS,
        };

        Ok(Self {
            descriptor,
            options,
            source_ports: config.source_ports,
            packet_streams: config.packet_streams,
            validate_source_port: config.validate_source_port,
        })
    }

    fn segment_len(&self) -> usize {
        TCP_HDR_LEN + self.options.len()
    }
}

impl ProbeModule for Ipv6TcpSynOpt {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn prepare_packet(
        &self,
        buf: &mut [u8],
        src_mac: MacAddr,
        gw_mac: MacAddr,
    ) -> Result<(), ProbeError> {
        let eth_buf = buf
            .get_mut(..ETH_HDR_LEN)
            .ok_or(ProbeError::EthernetBuffer)?;
        let mut eth = MutableEthernetPacket::new(eth_buf).ok_or(ProbeError::EthernetBuffer)?;
        eth.set_source(src_mac);
        eth.set_destination(gw_mac);
        eth.set_ethertype(EtherTypes::Ipv6);

        let ip_buf = buf
            .get_mut(ETH_HDR_LEN..ETH_HDR_LEN + IPV6_HDR_LEN)
            .ok_or(ProbeError::Ipv6Buffer)?;
        let mut ip = MutableIpv6Packet::new(ip_buf).ok_or(ProbeError::Ipv6Buffer)?;
        ip.set_version(6);
        ip.set_traffic_class(0);
        ip.set_flow_label(0);
        ip.set_payload_length(self.segment_len() as u16);
        ip.set_next_header(IpNextHeaderProtocols::Tcp);

        let tcp_buf = buf
            .get_mut(ETH_HDR_LEN + IPV6_HDR_LEN..BASE_PACKET_LEN)
            .ok_or(ProbeError::TcpBuffer)?;
        let mut tcp = MutableTcpPacket::new(tcp_buf).ok_or(ProbeError::TcpBuffer)?;
        tcp.set_flags(TcpFlags::SYN);
        tcp.set_window(65535);
        tcp.set_data_offset(5);
        tcp.set_reserved(0);
        tcp.set_urgent_ptr(0);
        Ok(())
    }

    fn make_packet(
        &self,
        buf: &mut [u8],
        target: &ProbeTarget,
        validation: &Validation,
        probe_num: u16,
    ) -> Result<usize, ProbeError> {
        let (IpAddr::V6(src), IpAddr::V6(dst)) = (target.src_addr, target.dst_addr) else {
            return Err(ProbeError::AddressFamily {
                module: Self::NAME,
                family: "IPv6",
            });
        };

        let wire_len = BASE_PACKET_LEN + self.options.len();

        let ip_buf = buf
            .get_mut(ETH_HDR_LEN..ETH_HDR_LEN + IPV6_HDR_LEN)
            .ok_or(ProbeError::Ipv6Buffer)?;
        let mut ip = MutableIpv6Packet::new(ip_buf).ok_or(ProbeError::Ipv6Buffer)?;
        ip.set_source(src);
        ip.set_destination(dst);
        ip.set_hop_limit(target.ttl);

        let tcp_buf = buf
            .get_mut(ETH_HDR_LEN + IPV6_HDR_LEN..wire_len)
            .ok_or(ProbeError::TcpBuffer)?;
        tcp_buf[TCP_HDR_LEN..].copy_from_slice(&self.options);

        let mut tcp = MutableTcpPacket::new(tcp_buf).ok_or(ProbeError::TcpBuffer)?;
        tcp.set_source(validate::source_port(
            &self.source_ports,
            probe_num,
            validation,
        ));
        tcp.set_destination(target.dst_port);
        tcp.set_sequence(validation.sequence());
        tcp.set_data_offset((5 + self.options.len() / 4) as u8);
        tcp.set_checksum(0);

        let checksum =
            ipv6_payload_checksum(&src, &dst, IpNextHeaderProtocols::Tcp.0, tcp.packet());
        tcp.set_checksum(checksum);

        Ok(wire_len)
    }

    fn validate_packet(
        &self,
        ip_packet: &[u8],
        validation: &Validation,
        target_ports: &TargetPorts,
    ) -> PacketValidity {
        let Some(ip) = Ipv6Packet::new(ip_packet) else {
            return PacketValidity::Invalid;
        };
        if ip.get_next_header() != IpNextHeaderProtocols::Tcp {
            return PacketValidity::Invalid;
        }

        // The capture must hold everything the header claims; a shorter
        // buffer means truncation or a lying length field.
        let payload = &ip_packet[IPV6_HDR_LEN..];
        if usize::from(ip.get_payload_length()) > payload.len() {
            return PacketValidity::Invalid;
        }

        let Some(tcp) = TcpPacket::new(payload) else {
            return PacketValidity::Invalid;
        };

        if self.validate_source_port && !target_ports.contains(tcp.get_source()) {
            return PacketValidity::Invalid;
        }
        if !validate::covers_source_port(
            tcp.get_destination(),
            &self.source_ports,
            self.packet_streams,
            validation,
        ) {
            return PacketValidity::OffTarget;
        }
        if tcp.get_acknowledgement() != validation.expected_ack() {
            return PacketValidity::Invalid;
        }
        PacketValidity::Valid
    }

    fn process_packet(
        &self,
        packet: &[u8],
        _validation: &Validation,
        _ts: SystemTime,
    ) -> Result<FieldSet, ProbeError> {
        let segment = packet
            .get(ETH_HDR_LEN + IPV6_HDR_LEN..)
            .ok_or(ProbeError::TcpBuffer)?;
        let tcp = TcpPacket::new(segment).ok_or(ProbeError::TcpBuffer)?;

        let mut fields = FieldSet::new();
        fields.add_uint("sport", u64::from(tcp.get_source()));
        fields.add_uint("dport", u64::from(tcp.get_destination()));
        fields.add_uint("seqnum", u64::from(tcp.get_sequence()));
        fields.add_uint("acknum", u64::from(tcp.get_acknowledgement()));
        fields.add_uint("window", u64::from(tcp.get_window()));

        let flags = tcp.get_flags();
        fields.add_uint("flags", u64::from(flags));
        if flags & TcpFlags::RST != 0 {
            fields.add_str("classification", "rst");
            fields.add_uint("success", 0);
        } else {
            fields.add_str("classification", "synack");
            fields.add_uint("success", 1);
        }

        // Option bytes as captured, bounded by both the declared data
        // offset and the snaplen truncation.
        let header_len = usize::from(tcp.get_data_offset()) * 4;
        let end = header_len.min(segment.len());
        let reply_options = segment.get(TCP_HDR_LEN..end).unwrap_or(&[]);
        fields.add_bytes("options", reply_options.to_vec());

        Ok(fields)
    }

    fn print_packet(&self, out: &mut dyn Write, packet: &[u8]) -> io::Result<()> {
        let tcp = packet
            .get(ETH_HDR_LEN + IPV6_HDR_LEN..)
            .and_then(TcpPacket::new);
        match tcp {
            Some(tcp) => writeln!(
                out,
                "tcp {{ source: {} | dest: {} | seq: {} | checksum: {:#06x} }}",
                tcp.get_source(),
                tcp.get_destination(),
                tcp.get_sequence(),
                tcp.get_checksum()
            )?,
            None => writeln!(out, "tcp {{ truncated }}")?,
        }

        match packet.get(ETH_HDR_LEN..).and_then(Ipv6Packet::new) {
            Some(ip) => writeln!(
                out,
                "ip6 {{ src: {} | dst: {} | hop limit: {} }}",
                ip.get_source(),
                ip.get_destination(),
                ip.get_hop_limit()
            )?,
            None => writeln!(out, "ip6 {{ truncated }}")?,
        }

        match EthernetPacket::new(packet) {
            Some(eth) => writeln!(
                out,
                "eth {{ src: {} | dst: {} }}",
                eth.get_source(),
                eth.get_destination()
            )?,
            None => writeln!(out, "eth {{ truncated }}")?,
        }
        writeln!(out, "------------------------------------------------------")
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
