use std::net::IpAddr;

use sweepr_common::network::ports::SourcePortRange;

/// Run configuration handed to probe-module construction.
///
/// Built once before worker threads start and passed by shared reference;
/// modules copy what they need during construction and never look back.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Address probes are sent from; appended to the capture filter so
    /// parallel scan processes on one device do not cross replies.
    pub source_addr: IpAddr,
    /// Ephemeral ports available for outgoing probes.
    pub source_ports: SourcePortRange,
    /// Concurrently outstanding probe attempts per target.
    pub packet_streams: u16,
    /// Reject replies whose source port is not a swept destination port.
    pub validate_source_port: bool,
    /// Module-specific argument string, e.g. `hex:020405a0` for raw TCP
    /// options. Grammar and limits belong to the module.
    pub probe_args: Option<String>,
}

impl ScanConfig {
    pub fn new(source_addr: IpAddr) -> Self {
        Self {
            source_addr,
            source_ports: SourcePortRange::default(),
            packet_streams: 1,
            validate_source_port: true,
            probe_args: None,
        }
    }
}
