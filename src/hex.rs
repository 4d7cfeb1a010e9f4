//! Hex string helpers: prefix handling and quantity parsing.

use crate::error::{Error, Result};
use alloy::primitives::{Address, U256};
use std::str::FromStr;

/// Removes a leading `0x`/`0X` prefix if present.
pub fn strip_hex_prefix(value: &str) -> &str {
    if value.starts_with("0x") || value.starts_with("0X") {
        &value[2..]
    } else {
        value
    }
}

/// Adds a `0x` prefix if the string does not already carry one.
pub fn add_hex_prefix(value: &str) -> String {
    format!("0x{}", strip_hex_prefix(value))
}

/// Renders a `U256` as a minimal `0x`-prefixed hex quantity.
pub fn u256_hex(value: U256) -> String {
    format!("0x{value:x}")
}

/// Parses a quantity string into a `U256`.
///
/// `0x`-prefixed strings are interpreted as hexadecimal, everything else as
/// decimal. Idempotent with [`u256_hex`]: `parse_u256(&u256_hex(v)) == v`.
pub fn parse_u256(value: &str) -> Result<U256> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Encode("value cannot be empty".to_string()));
    }

    if value.starts_with("0x") || value.starts_with("0X") {
        U256::from_str_radix(&value[2..], 16)
            .map_err(|_| Error::Encode(format!("invalid hexadecimal value: '{value}'")))
    } else {
        U256::from_str(value).map_err(|_| {
            Error::Encode(format!(
                "invalid numeric value: '{value}'. Use decimal format or '0x' prefixed hex"
            ))
        })
    }
}

/// Validates and parses an Ethereum address.
pub fn parse_address(address: &str) -> Result<Address> {
    let address = address.trim();

    if address.is_empty() {
        return Err(Error::Encode("address cannot be empty".to_string()));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(Error::Encode(format!(
            "invalid address format: '{address}'. Ethereum addresses must start with '0x'"
        )));
    }

    if address.len() != 42 {
        return Err(Error::Encode(format!(
            "invalid address length: '{address}'. Expected 0x followed by 40 hex characters"
        )));
    }

    Address::from_str(address)
        .map_err(|e| Error::Encode(format!("invalid Ethereum address: '{address}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_and_add_prefix_are_idempotent() {
        assert_eq!(strip_hex_prefix("0xabc"), "abc");
        assert_eq!(strip_hex_prefix("abc"), "abc");
        assert_eq!(add_hex_prefix("abc"), "0xabc");
        assert_eq!(add_hex_prefix("0xabc"), "0xabc");
        assert_eq!(add_hex_prefix(strip_hex_prefix("0xabc")), "0xabc");
    }

    #[test]
    fn parse_u256_handles_hex_and_decimal() {
        assert_eq!(parse_u256("0x2a").unwrap(), U256::from(42u64));
        assert_eq!(parse_u256("42").unwrap(), U256::from(42u64));
        assert_eq!(parse_u256("0x0").unwrap(), U256::ZERO);
        assert!(parse_u256("").is_err());
        assert!(parse_u256("0xzz").is_err());
        assert!(parse_u256("not a number").is_err());
    }

    #[test]
    fn u256_round_trips_through_hex() {
        for v in [0u64, 1, 42, 20_000_000_000, u64::MAX] {
            let v = U256::from(v);
            assert_eq!(parse_u256(&u256_hex(v)).unwrap(), v);
        }
        let big = U256::MAX;
        assert_eq!(parse_u256(&u256_hex(big)).unwrap(), big);
    }

    #[test]
    fn parse_address_validates_shape() {
        assert!(parse_address("0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_ok());
        assert!(parse_address("0x0000000000000000000000000000000000000000").is_ok());

        assert!(parse_address("").is_err());
        assert!(parse_address("0x123").is_err());
        assert!(parse_address("742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err());
        assert!(parse_address("0xgg2d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err());
    }
}
