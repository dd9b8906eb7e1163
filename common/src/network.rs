pub mod checksum;
pub mod ports;

pub const ETH_HDR_LEN: usize = 14;
pub const IPV6_HDR_LEN: usize = 40;
pub const TCP_HDR_LEN: usize = 20;
