//! Parsing for the shared `hex:<data>` probe-argument grammar.
//!
//! Several TCP modules accept raw option bytes this way, so the grammar
//! lives outside any single module. Every violation is a configuration
//! error: the scan must refuse to start rather than send a probe the
//! operator did not ask for.

use sweepr_common::error::ProbeError;

/// TCP option space ceiling: data offset is four bits, 15 words max, five
/// of which are the fixed header.
pub const MAX_OPT_LEN: usize = 40;

/// Decodes a module argument into raw TCP option bytes.
///
/// `None` or an empty string means "bare SYN, no options". Anything else
/// must be `hex:<even-length-hex>` decoding to a positive multiple of 4
/// no longer than [`MAX_OPT_LEN`]; the length checks run before decoding
/// so oversized input is rejected without work.
pub fn parse_probe_args(args: Option<&str>) -> Result<Vec<u8>, ProbeError> {
    let Some(args) = args.filter(|args| !args.is_empty()) else {
        return Ok(Vec::new());
    };

    let Some((scheme, payload)) = args.split_once(':') else {
        return Err(ProbeError::OptionSyntax);
    };
    if scheme != "hex" {
        return Err(ProbeError::OptionSyntax);
    }
    if payload.is_empty() {
        return Err(ProbeError::OptionsEmpty);
    }
    if payload.len() % 2 != 0 {
        return Err(ProbeError::OddHexDigits(payload.len()));
    }

    let len = payload.len() / 2;
    if len > MAX_OPT_LEN {
        return Err(ProbeError::OptionsTooLong {
            len,
            max: MAX_OPT_LEN,
        });
    }
    if len % 4 != 0 {
        return Err(ProbeError::OptionsNotAligned { len });
    }

    decode_hex(payload)
}

fn decode_hex(payload: &str) -> Result<Vec<u8>, ProbeError> {
    payload
        .as_bytes()
        .chunks_exact(2)
        .map(|pair| {
            let digits = std::str::from_utf8(pair).map_err(|_| bad_digit(pair))?;
            u8::from_str_radix(digits, 16).map_err(|_| bad_digit(pair))
        })
        .collect()
}

fn bad_digit(pair: &[u8]) -> ProbeError {
    let offender = pair
        .iter()
        .map(|byte| *byte as char)
        .find(|ch| !ch.is_ascii_hexdigit())
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    ProbeError::NonHexCharacter(offender)
}
