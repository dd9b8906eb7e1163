use thiserror::Error;

/// Errors a probe module can report.
///
/// Configuration variants surface during module construction and are fatal
/// at the binary level: a scan must never start with a half-initialized
/// module. Buffer variants surface on the crafting path when the caller
/// hands a buffer smaller than the declared maximum packet length.
/// Malformed *received* packets are never errors; the receive path
/// classifies them instead (see `PacketValidity` in `sweepr-core`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("probe arguments must take the form hex:<data>")]
    OptionSyntax,

    #[error("probe options are {0} hex digits, expected an even count")]
    OddHexDigits(usize),

    #[error("non-hex character in probe options: {0:?}")]
    NonHexCharacter(char),

    #[error("probe options are empty, omit the argument to send a bare SYN")]
    OptionsEmpty,

    #[error("probe options are {len} bytes, pad to a multiple of 4 with NOPs (0x01)")]
    OptionsNotAligned { len: usize },

    #[error("probe options are {len} bytes, the TCP option space holds at most {max}")]
    OptionsTooLong { len: usize, max: usize },

    #[error("buffer too small for Ethernet header")]
    EthernetBuffer,

    #[error("buffer too small for IPv6 header")]
    Ipv6Buffer,

    #[error("buffer too small for TCP segment")]
    TcpBuffer,

    #[error("{module} only probes {family} targets")]
    AddressFamily {
        module: &'static str,
        family: &'static str,
    },

    #[error("unknown probe module: {0}")]
    UnknownModule(String),
}
