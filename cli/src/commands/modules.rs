use std::net::{IpAddr, Ipv6Addr};

use tracing::{info, warn};

use sweepr_core::config::ScanConfig;

/// Lists every registered probe module with its descriptor facts.
pub fn list() {
    let config = ScanConfig::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED));

    for name in sweepr_probes::MODULE_NAMES {
        match sweepr_probes::by_name(name, &config) {
            Ok(module) => {
                let descriptor = module.descriptor();
                info!(
                    "{} (port args: {}, max packet: {} bytes, snaplen: {})",
                    descriptor.name,
                    descriptor.port_args,
                    descriptor.max_packet_length,
                    descriptor.pcap_snaplen
                );
                info!("  {}", descriptor.helptext);
            }
            Err(e) => warn!("{name}: failed to construct: {e}"),
        }
    }
}
