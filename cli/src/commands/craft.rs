use std::io::Write;
use std::net::IpAddr;

use tracing::info;

use sweepr_core::config::ScanConfig;
use sweepr_core::probe::ProbeTarget;
use sweepr_core::validate::Validator;

use crate::commands::CraftArgs;

/// Builds one probe exactly as a scan would and dumps it to stdout.
///
/// The whole lifecycle short of transmission runs: module construction
/// (argument parsing, filter/packet-length adjustment), template
/// preparation, and the per-target fill with a freshly drawn secret.
pub fn craft(args: &CraftArgs) -> anyhow::Result<()> {
    let mut config = ScanConfig::new(IpAddr::V6(args.source));
    config.probe_args = args.probe_args.clone();

    let module = sweepr_probes::by_name(&args.module, &config)?;
    let descriptor = module.descriptor();
    info!("module {} ready", descriptor.name);
    info!("capture filter: {}", descriptor.pcap_filter);

    let mut buf = vec![0u8; descriptor.max_packet_length];
    module.prepare_packet(&mut buf, args.src_mac, args.gw_mac)?;

    let validator = Validator::new();
    let validation = validator.tuple_v6(&args.source, &args.target, args.port);
    let target = ProbeTarget {
        src_addr: IpAddr::V6(args.source),
        dst_addr: IpAddr::V6(args.target),
        dst_port: args.port,
        ttl: args.ttl,
        ip_id: 0,
    };
    let wire_len = module.make_packet(&mut buf, &target, &validation, 0)?;

    let mut stdout = std::io::stdout().lock();
    module.print_packet(&mut stdout, &buf[..wire_len])?;
    writeln!(stdout, "{}", hex_dump(&buf[..wire_len]))?;
    Ok(())
}

fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .map(|row| {
            row.iter()
                .map(|byte| format!("{byte:02x}"))
                .collect::<Vec<String>>()
                .join(" ")
        })
        .collect::<Vec<String>>()
        .join("\n")
}
