//! Hex address and port decoding for `/proc/net/*` tables.
//!
//! The kernel prints addresses as the in-memory `__be32` words formatted with
//! `%08X`, so on little-endian hosts every 4-byte group appears byte-reversed.
//! IPv6 addresses are four such words back to back.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::ParseError;

const IPV4_HEX_LEN: usize = 8;
const IPV6_HEX_LEN: usize = 32;

/// Which address width a table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    fn hex_len(self) -> usize {
        match self {
            AddressFamily::V4 => IPV4_HEX_LEN,
            AddressFamily::V6 => IPV6_HEX_LEN,
        }
    }

    fn expected(self) -> &'static str {
        match self {
            AddressFamily::V4 => "8",
            AddressFamily::V6 => "32",
        }
    }
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Decode one 8-character word, returning its bytes in address order.
fn parse_word(hex: &str) -> Result<[u8; 4], ParseError> {
    if !is_hex(hex) {
        return Err(ParseError::InvalidAddress(hex.to_string()));
    }
    let word =
        u32::from_str_radix(hex, 16).map_err(|_| ParseError::InvalidAddress(hex.to_string()))?;
    Ok(word.to_le_bytes())
}

pub fn parse_hex_addr(hex: &str) -> Result<Ipv4Addr, ParseError> {
    if hex.len() != IPV4_HEX_LEN {
        return Err(ParseError::InvalidAddressLength {
            len: hex.len(),
            expected: AddressFamily::V4.expected(),
        });
    }
    Ok(Ipv4Addr::from(parse_word(hex)?))
}

pub fn parse_hex_addr_v6(hex: &str) -> Result<Ipv6Addr, ParseError> {
    if hex.len() != IPV6_HEX_LEN {
        return Err(ParseError::InvalidAddressLength {
            len: hex.len(),
            expected: AddressFamily::V6.expected(),
        });
    }
    // A multi-byte char would make the slicing below panic.
    if !hex.is_ascii() {
        return Err(ParseError::InvalidAddress(hex.to_string()));
    }

    let mut octets = [0u8; 16];
    for (i, chunk) in octets.chunks_exact_mut(4).enumerate() {
        chunk.copy_from_slice(&parse_word(&hex[i * 8..(i + 1) * 8])?);
    }

    Ok(Ipv6Addr::from(octets))
}

/// Decode an address token for a table of known width.
///
/// A token whose length does not match `family` is rejected rather than
/// reinterpreted as the other family.
pub fn decode_address(hex: &str, family: AddressFamily) -> Result<IpAddr, ParseError> {
    if hex.len() != family.hex_len() {
        return Err(ParseError::InvalidAddressLength {
            len: hex.len(),
            expected: family.expected(),
        });
    }
    match family {
        AddressFamily::V4 => parse_hex_addr(hex).map(IpAddr::V4),
        AddressFamily::V6 => parse_hex_addr_v6(hex).map(IpAddr::V6),
    }
}

/// Decode an address token, picking the family from its length.
pub fn decode_address_any(hex: &str) -> Result<IpAddr, ParseError> {
    match hex.len() {
        IPV4_HEX_LEN => decode_address(hex, AddressFamily::V4),
        IPV6_HEX_LEN => decode_address(hex, AddressFamily::V6),
        len => Err(ParseError::InvalidAddressLength {
            len,
            expected: "8 or 32",
        }),
    }
}

pub fn parse_hex_port(hex: &str) -> Result<u16, ParseError> {
    if !is_hex(hex) {
        return Err(ParseError::InvalidPort(hex.to_string()));
    }
    u16::from_str_radix(hex, 16).map_err(|_| ParseError::InvalidPort(hex.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_hex_addr(addr: Ipv4Addr) -> String {
        format!("{:08X}", u32::from_le_bytes(addr.octets()))
    }

    #[test]
    fn test_parse_hex_addr_localhost() {
        let result = parse_hex_addr("0100007F").unwrap();
        assert_eq!(result, Ipv4Addr::new(127, 0, 0, 1));
    }

    #[test]
    fn test_parse_hex_addr_any() {
        let result = parse_hex_addr("00000000").unwrap();
        assert_eq!(result, Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn test_parse_hex_addr_192_168_1_5() {
        let result = parse_hex_addr("0501A8C0").unwrap();
        assert_eq!(result, Ipv4Addr::new(192, 168, 1, 5));
    }

    #[test]
    fn test_parse_hex_addr_lowercase() {
        let result = parse_hex_addr("0501a8c0").unwrap();
        assert_eq!(result, Ipv4Addr::new(192, 168, 1, 5));
    }

    #[test]
    fn test_parse_hex_addr_reencodes_to_same_token() {
        for token in ["0100007F", "0501A8C0", "00000000", "FFFFFFFF", "8A0C10AC"] {
            let addr = parse_hex_addr(token).unwrap();
            assert_eq!(encode_hex_addr(addr), token);
        }
    }

    #[test]
    fn test_parse_hex_addr_rejects_sign_prefix() {
        assert_eq!(
            parse_hex_addr("+100007F"),
            Err(ParseError::InvalidAddress("+100007F".to_string()))
        );
    }

    #[test]
    fn test_parse_hex_addr_wrong_length() {
        assert!(matches!(
            parse_hex_addr("7F0001"),
            Err(ParseError::InvalidAddressLength { len: 6, .. })
        ));
    }

    #[test]
    fn test_parse_hex_port_8080() {
        assert_eq!(parse_hex_port("1F90").unwrap(), 8080);
    }

    #[test]
    fn test_parse_hex_port_443() {
        assert_eq!(parse_hex_port("01BB").unwrap(), 443);
    }

    #[test]
    fn test_parse_hex_port_not_hex() {
        assert_eq!(
            parse_hex_port("00ZZ"),
            Err(ParseError::InvalidPort("00ZZ".to_string()))
        );
    }

    #[test]
    fn test_parse_hex_port_overflow() {
        assert!(parse_hex_port("10000").is_err());
    }

    #[test]
    fn test_parse_hex_addr_v6_loopback() {
        let result = parse_hex_addr_v6("00000000000000000000000001000000").unwrap();
        assert_eq!(result, Ipv6Addr::LOCALHOST);
    }

    #[test]
    fn test_parse_hex_addr_v6_any() {
        let result = parse_hex_addr_v6("00000000000000000000000000000000").unwrap();
        assert_eq!(result, Ipv6Addr::UNSPECIFIED);
    }

    #[test]
    fn test_parse_hex_addr_v6_ipv4_mapped() {
        let result = parse_hex_addr_v6("0000000000000000FFFF00000100007F").unwrap();
        assert_eq!(result, "::ffff:127.0.0.1".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn test_parse_hex_addr_v6_link_local() {
        let result = parse_hex_addr_v6("000080FE00000000FF005450B6AC0FFE").unwrap();
        assert_eq!(result, "fe80::5054:ff:fe0f:acb6".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn test_parse_hex_addr_v6_invalid_length() {
        assert!(matches!(
            parse_hex_addr_v6("0100007F"),
            Err(ParseError::InvalidAddressLength { len: 8, .. })
        ));
    }

    #[test]
    fn test_parse_hex_addr_v6_non_ascii() {
        let token = "é000000000000000000000000000000";
        assert_eq!(token.len(), 32);
        assert!(matches!(
            parse_hex_addr_v6(token),
            Err(ParseError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_decode_address_rejects_family_mismatch() {
        assert!(matches!(
            decode_address("0100007F", AddressFamily::V6),
            Err(ParseError::InvalidAddressLength { len: 8, .. })
        ));
        assert!(matches!(
            decode_address("00000000000000000000000001000000", AddressFamily::V4),
            Err(ParseError::InvalidAddressLength { len: 32, .. })
        ));
    }

    #[test]
    fn test_decode_address_any_agrees_with_family() {
        let v4 = "0100007F";
        let v6 = "00000000000000000000000001000000";
        assert_eq!(
            decode_address_any(v4).unwrap(),
            decode_address(v4, AddressFamily::V4).unwrap()
        );
        assert_eq!(
            decode_address_any(v6).unwrap(),
            decode_address(v6, AddressFamily::V6).unwrap()
        );
    }

    #[test]
    fn test_decode_address_any_bad_length() {
        assert!(matches!(
            decode_address_any("0100"),
            Err(ParseError::InvalidAddressLength { len: 4, .. })
        ));
    }
}
