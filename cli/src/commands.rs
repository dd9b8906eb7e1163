pub mod craft;
pub mod modules;

use std::net::Ipv6Addr;

use clap::{Args, Parser, Subcommand};
use pnet::util::MacAddr;

#[derive(Parser)]
#[command(name = "sweepr")]
#[command(about = "Stateless IPv6 probe crafting, without the sending.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered probe modules
    #[command(alias = "m")]
    Modules,
    /// Craft one probe packet and dump it instead of sending
    #[command(alias = "c")]
    Craft(CraftArgs),
}

#[derive(Args)]
pub struct CraftArgs {
    /// Target address to probe
    pub target: Ipv6Addr,

    /// Address probes claim to originate from
    #[arg(long)]
    pub source: Ipv6Addr,

    /// Destination port
    #[arg(long, default_value_t = 443)]
    pub port: u16,

    /// Probe module to craft with
    #[arg(long, default_value = "ipv6_tcp_synopt")]
    pub module: String,

    /// Module argument string, e.g. hex:020405a0
    #[arg(long)]
    pub probe_args: Option<String>,

    /// Hop limit stamped into the probe
    #[arg(long, default_value_t = 64)]
    pub ttl: u8,

    /// Source MAC for the Ethernet header
    #[arg(long, default_value_t = MacAddr::zero())]
    pub src_mac: MacAddr,

    /// Gateway MAC for the Ethernet header
    #[arg(long, default_value_t = MacAddr::broadcast())]
    pub gw_mac: MacAddr,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
