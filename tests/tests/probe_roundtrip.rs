//! End-to-end exercises of the IPv6 TCP SYN+options module: craft a probe,
//! play the probed host, and check how the module classifies the reply.

use std::net::IpAddr;
use std::time::SystemTime;

use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::tcp::{TcpFlags, TcpPacket};

use sweepr_common::network::ports::TargetPorts;
use sweepr_common::network::{ETH_HDR_LEN, IPV6_HDR_LEN};
use sweepr_core::fieldset::FieldValue;
use sweepr_core::probe::{PacketValidity, ProbeModule, ProbeTarget};
use sweepr_core::validate::Validator;

use sweepr_integration_tests::{
    build_reply, craft_probe, scan_config, scanner, target, ReplySpec,
};

fn module_with_args(args: Option<&str>) -> Box<dyn ProbeModule> {
    let mut config = scan_config();
    config.probe_args = args.map(str::to_string);
    sweepr_probes::by_name("ipv6_tcp_synopt", &config).expect("module constructs")
}

fn outgoing_tcp(frame: &[u8]) -> TcpPacket<'_> {
    TcpPacket::new(&frame[ETH_HDR_LEN + IPV6_HDR_LEN..]).expect("crafted frame holds TCP")
}

#[test]
fn synack_reply_with_swapped_tuple_is_valid() {
    let module = module_with_args(None);
    let validator = Validator::with_secret(b"roundtrip");
    let validation = validator.tuple_v6(&scanner(), &target(), 443);

    let frame = craft_probe(module.as_ref(), &validation, 443, 0);
    let probe = outgoing_tcp(&frame);

    // The host answers: addresses swapped, our destination port as source,
    // our sequence number acknowledged plus one.
    let reply = build_reply(&ReplySpec::new(
        443,
        probe.get_source(),
        probe.get_sequence().wrapping_add(1),
        TcpFlags::SYN | TcpFlags::ACK,
    ));

    // The receive path regenerates validation from the reply's own bytes.
    let regenerated = validator.tuple_v6(&scanner(), &target(), 443);
    assert_eq!(
        module.validate_packet(&reply, &regenerated, &TargetPorts::single(443)),
        PacketValidity::Valid
    );
}

#[test]
fn corrupted_acknowledgment_is_invalid() {
    let module = module_with_args(None);
    let validator = Validator::with_secret(b"roundtrip");
    let validation = validator.tuple_v6(&scanner(), &target(), 443);

    let frame = craft_probe(module.as_ref(), &validation, 443, 0);
    let probe = outgoing_tcp(&frame);
    let sport = probe.get_source();
    let ack = probe.get_sequence().wrapping_add(1);
    drop(probe);

    let good = build_reply(&ReplySpec::new(443, sport, ack, TcpFlags::SYN | TcpFlags::ACK));
    let ports = TargetPorts::single(443);
    assert_eq!(
        module.validate_packet(&good, &validation, &ports),
        PacketValidity::Valid
    );

    // Flipping any single byte of the acknowledgment field must reject.
    let ack_field = IPV6_HDR_LEN + 8;
    for byte in ack_field..ack_field + 4 {
        let mut tampered = good.clone();
        tampered[byte] ^= 0x01;
        assert_eq!(
            module.validate_packet(&tampered, &validation, &ports),
            PacketValidity::Invalid,
            "flip at offset {byte} slipped through"
        );
    }

    let wrong_ack = build_reply(&ReplySpec::new(
        443,
        sport,
        ack.wrapping_add(1),
        TcpFlags::SYN | TcpFlags::ACK,
    ));
    assert_eq!(
        module.validate_packet(&wrong_ack, &validation, &ports),
        PacketValidity::Invalid
    );
}

#[test]
fn data_offset_tracks_option_length() {
    let validator = Validator::with_secret(b"offsets");
    let validation = validator.tuple_v6(&scanner(), &target(), 443);

    for words in 0..=10usize {
        let opt_len = words * 4;
        let args = (opt_len > 0).then(|| format!("hex:{}", "01".repeat(opt_len)));
        let module = module_with_args(args.as_deref());

        let frame = craft_probe(module.as_ref(), &validation, 443, 0);
        assert_eq!(frame.len(), 74 + opt_len);
        let probe = outgoing_tcp(&frame);
        assert_eq!(
            usize::from(probe.get_data_offset()),
            5 + words,
            "wrong data offset for {opt_len} option bytes"
        );
    }
}

#[test]
fn declared_length_beyond_capture_is_invalid() {
    let module = module_with_args(None);
    let validator = Validator::with_secret(b"truncation");
    let validation = validator.tuple_v6(&scanner(), &target(), 443);

    let frame = craft_probe(module.as_ref(), &validation, 443, 0);
    let probe = outgoing_tcp(&frame);

    let mut spec = ReplySpec::new(
        443,
        probe.get_source(),
        probe.get_sequence().wrapping_add(1),
        TcpFlags::SYN | TcpFlags::ACK,
    );
    spec.declared_payload_len = Some(0xffff);
    let lying = build_reply(&spec);

    assert_eq!(
        module.validate_packet(&lying, &validation, &TargetPorts::single(443)),
        PacketValidity::Invalid
    );
}

#[test]
fn capture_shorter_than_headers_is_invalid() {
    let module = module_with_args(None);
    let validator = Validator::with_secret(b"truncation");
    let validation = validator.tuple_v6(&scanner(), &target(), 443);
    let ports = TargetPorts::single(443);

    assert_eq!(
        module.validate_packet(&[0u8; 12], &validation, &ports),
        PacketValidity::Invalid
    );
    // An IPv6 header alone, with no TCP header behind it.
    let reply = build_reply(&ReplySpec::new(443, 40000, 1, TcpFlags::ACK));
    assert_eq!(
        module.validate_packet(&reply[..IPV6_HDR_LEN], &validation, &ports),
        PacketValidity::Invalid
    );
}

#[test]
fn non_tcp_protocol_is_invalid() {
    let module = module_with_args(None);
    let validator = Validator::with_secret(b"protocol");
    let validation = validator.tuple_v6(&scanner(), &target(), 443);

    let mut spec = ReplySpec::new(443, 40000, validation.expected_ack(), TcpFlags::ACK);
    spec.next_header = IpNextHeaderProtocols::Udp;
    assert_eq!(
        module.validate_packet(&build_reply(&spec), &validation, &TargetPorts::single(443)),
        PacketValidity::Invalid
    );
}

#[test]
fn unrelated_destination_port_is_off_target() {
    let module = module_with_args(None);
    let validator = Validator::with_secret(b"off-target");
    let validation = validator.tuple_v6(&scanner(), &target(), 443);

    let frame = craft_probe(module.as_ref(), &validation, 443, 0);
    let probe = outgoing_tcp(&frame);

    // A port inside the source range but outside the one-probe window.
    let ours = probe.get_source();
    let elsewhere = 40000 + ((ours - 40000 + 5) % 64);
    assert_ne!(ours, elsewhere);

    let reply = build_reply(&ReplySpec::new(
        443,
        elsewhere,
        probe.get_sequence().wrapping_add(1),
        TcpFlags::SYN | TcpFlags::ACK,
    ));
    assert_eq!(
        module.validate_packet(&reply, &validation, &TargetPorts::single(443)),
        PacketValidity::OffTarget
    );
}

#[test]
fn source_port_gate_honors_the_toggle() {
    // The host answers a probe to port 8080 correctly, but the sweep set
    // only contains 443.
    let validator = Validator::with_secret(b"gating");
    let validation = validator.tuple_v6(&scanner(), &target(), 8080);
    let ports = TargetPorts::single(443);

    let strict = module_with_args(None);
    let frame = craft_probe(strict.as_ref(), &validation, 8080, 0);
    let probe = outgoing_tcp(&frame);
    let reply = build_reply(&ReplySpec::new(
        8080,
        probe.get_source(),
        probe.get_sequence().wrapping_add(1),
        TcpFlags::SYN | TcpFlags::ACK,
    ));

    assert_eq!(
        strict.validate_packet(&reply, &validation, &ports),
        PacketValidity::Invalid
    );

    let mut lenient_config = scan_config();
    lenient_config.validate_source_port = false;
    let lenient =
        sweepr_probes::by_name("ipv6_tcp_synopt", &lenient_config).expect("module constructs");
    assert_eq!(
        lenient.validate_packet(&reply, &validation, &ports),
        PacketValidity::Valid
    );
}

#[test]
fn process_packet_extracts_reply_fields() {
    let module = module_with_args(None);
    let validator = Validator::with_secret(b"fields");
    let validation = validator.tuple_v6(&scanner(), &target(), 443);

    let frame = craft_probe(module.as_ref(), &validation, 443, 0);
    let probe = outgoing_tcp(&frame);
    let sport = probe.get_source();
    let ack = probe.get_sequence().wrapping_add(1);
    drop(probe);

    // process_packet consumes whole frames; prepend a link layer.
    let reply = build_reply(&ReplySpec::new(443, sport, ack, TcpFlags::SYN | TcpFlags::ACK));
    let mut captured = vec![0u8; ETH_HDR_LEN];
    captured.extend_from_slice(&reply);

    let fields = module
        .process_packet(&captured, &validation, SystemTime::now())
        .expect("valid frame parses");

    assert_eq!(fields.get("sport"), Some(&FieldValue::Uint(443)));
    assert_eq!(fields.get("dport"), Some(&FieldValue::Uint(u64::from(sport))));
    assert_eq!(fields.get("acknum"), Some(&FieldValue::Uint(u64::from(ack))));
    assert_eq!(
        fields.get("classification"),
        Some(&FieldValue::Str("synack".to_string()))
    );
    assert_eq!(fields.get("success"), Some(&FieldValue::Uint(1)));
    assert_eq!(fields.get("options"), Some(&FieldValue::Bytes(Vec::new())));

    let mut names: Vec<&str> = Vec::new();
    for (name, _) in fields.iter() {
        names.push(name);
    }
    let schema: Vec<&str> = module
        .descriptor()
        .fields
        .iter()
        .map(|field| field.name)
        .collect();
    assert_eq!(names, schema, "emission order deviates from the schema");
}

#[test]
fn reset_reply_classifies_as_rst() {
    let module = module_with_args(None);
    let validator = Validator::with_secret(b"rst");
    let validation = validator.tuple_v6(&scanner(), &target(), 443);

    let frame = craft_probe(module.as_ref(), &validation, 443, 0);
    let probe = outgoing_tcp(&frame);
    let reply = build_reply(&ReplySpec::new(
        443,
        probe.get_source(),
        probe.get_sequence().wrapping_add(1),
        TcpFlags::RST | TcpFlags::ACK,
    ));

    let mut captured = vec![0u8; ETH_HDR_LEN];
    captured.extend_from_slice(&reply);
    let fields = module
        .process_packet(&captured, &validation, SystemTime::now())
        .expect("valid frame parses");

    assert_eq!(
        fields.get("classification"),
        Some(&FieldValue::Str("rst".to_string()))
    );
    assert_eq!(fields.get("success"), Some(&FieldValue::Uint(0)));
}

#[test]
fn make_packet_rejects_ipv4_targets() {
    let module = module_with_args(None);
    let validator = Validator::with_secret(b"family");
    let validation = validator.tuple_v6(&scanner(), &target(), 443);

    let mut buf = vec![0u8; module.descriptor().max_packet_length];
    let probe = ProbeTarget {
        src_addr: IpAddr::V4([10, 0, 0, 1].into()),
        dst_addr: IpAddr::V4([10, 0, 0, 2].into()),
        dst_port: 443,
        ttl: 64,
        ip_id: 0,
    };
    assert!(module.make_packet(&mut buf, &probe, &validation, 0).is_err());
}
