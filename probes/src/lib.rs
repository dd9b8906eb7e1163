//! # Sweepr Probes
//!
//! Concrete wire protocols behind the [`sweepr_core::probe::ProbeModule`]
//! contract, plus the name-based registry the engine selects them through
//! at startup.

pub mod ipv6_tcp_synopt;
pub mod options;

use sweepr_common::error::ProbeError;
use sweepr_core::config::ScanConfig;
use sweepr_core::probe::ProbeModule;

use crate::ipv6_tcp_synopt::Ipv6TcpSynOpt;

/// Every registered module name, in listing order.
pub const MODULE_NAMES: &[&str] = &[Ipv6TcpSynOpt::NAME];

/// Constructs the named module for this run.
///
/// Construction is the module's one-time initialization: it parses the
/// module arguments in `config` and fails on any configuration error, so
/// a caller that gets `Ok` holds a module ready for every later lifecycle
/// call.
pub fn by_name(name: &str, config: &ScanConfig) -> Result<Box<dyn ProbeModule>, ProbeError> {
    match name {
        Ipv6TcpSynOpt::NAME => Ok(Box::new(Ipv6TcpSynOpt::initialize(config)?)),
        other => Err(ProbeError::UnknownModule(other.to_string())),
    }
}
