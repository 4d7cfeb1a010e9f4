//! ABI fragment resolution and selector derivation.
//!
//! Signature strings are parsed by `alloy::json_abi`; this module only
//! normalizes the accepted forms and derives selectors. Both
//! `name(type,...)` and the legacy `name(type,...):(outtype,...)` return
//! syntax are accepted.

use crate::error::{Error, Result};
use alloy::{
    json_abi::{AbiItem, Event, Function},
    primitives::{keccak256, B256},
};

/// A method description: either a signature string still to be parsed, or an
/// already-structured ABI fragment, which resolves to itself unchanged.
#[derive(Debug, Clone)]
pub enum Abi {
    Signature(String),
    Function(Function),
}

impl Abi {
    /// Normalizes to a structured [`Function`]. Parse failures propagate;
    /// there are no retry semantics and no side effects.
    pub fn resolve(&self) -> Result<Function> {
        match self {
            Abi::Signature(sig) => parse_function(sig),
            Abi::Function(function) => Ok(function.clone()),
        }
    }
}

impl From<&str> for Abi {
    fn from(sig: &str) -> Self {
        Abi::Signature(sig.to_string())
    }
}

impl From<Function> for Abi {
    fn from(function: Function) -> Self {
        Abi::Function(function)
    }
}

/// Rewrites the legacy `name(inputs):(outputs)` form into the
/// `name(inputs) returns (outputs)` form the alloy parser understands.
fn normalize_signature(signature: &str) -> String {
    match signature.find("):(") {
        Some(_) => signature.replacen("):(", ") returns (", 1),
        None => signature.to_string(),
    }
}

/// Parses a Solidity-style function signature into an ABI fragment.
pub fn parse_function(signature: &str) -> Result<Function> {
    let normalized = normalize_signature(signature.trim());
    let declaration = if normalized.starts_with("function ") {
        normalized
    } else {
        format!("function {normalized}")
    };
    match AbiItem::parse(&declaration) {
        Ok(AbiItem::Function(function)) => Ok(function.into_owned()),
        Ok(_) => Err(Error::Abi(format!(
            "'{signature}' is not a function signature"
        ))),
        Err(e) => Err(Error::Abi(format!(
            "invalid function signature '{signature}': {e}"
        ))),
    }
}

/// Parses a Solidity-style event signature into an ABI fragment.
pub fn parse_event(signature: &str) -> Result<Event> {
    let trimmed = signature.trim();
    let declaration = if trimmed.starts_with("event ") {
        trimmed.to_string()
    } else {
        format!("event {trimmed}")
    };
    match AbiItem::parse(&declaration) {
        Ok(AbiItem::Event(event)) => Ok(event.into_owned()),
        Ok(_) => Err(Error::Abi(format!("'{signature}' is not an event signature"))),
        Err(e) => Err(Error::Abi(format!(
            "invalid event signature '{signature}': {e}"
        ))),
    }
}

/// Derives the 4-byte function selector: `0x` followed by the first four
/// bytes of keccak256 over the canonical signature. The hash function and
/// truncation point are fixed by the wire protocol.
pub fn function_selector(function: &Function) -> String {
    let hash = keccak256(function.signature().as_bytes());
    format!("0x{}", hex::encode(&hash[..4]))
}

/// Derives the full 32-byte event selector hash used in `topics[0]`.
pub fn event_selector(event: &Event) -> B256 {
    keccak256(event.signature().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn balance_of_selector_matches_known_value() {
        let function = parse_function("balanceOf(address)").unwrap();
        assert_eq!(function_selector(&function), "0x70a08231");
    }

    #[test]
    fn legacy_return_syntax_parses() {
        let function = parse_function("get():(uint256)").unwrap();
        assert_eq!(function.name, "get");
        assert!(function.inputs.is_empty());
        assert_eq!(function.outputs.len(), 1);
        assert_eq!(function.outputs[0].ty, "uint256");
    }

    #[test]
    fn multi_arg_signature_parses() {
        let function = parse_function("transfer(address,uint256):(bool)").unwrap();
        assert_eq!(function.name, "transfer");
        assert_eq!(function.inputs.len(), 2);
        assert_eq!(function.inputs[0].ty, "address");
        assert_eq!(function.inputs[1].ty, "uint256");
        assert_eq!(function.outputs[0].ty, "bool");
    }

    #[test]
    fn structured_fragment_resolves_unchanged() {
        let function = parse_function("get():(uint256)").unwrap();
        let resolved = Abi::Function(function.clone()).resolve().unwrap();
        assert_eq!(resolved, function);
    }

    #[test]
    fn transfer_event_selector_matches_known_topic() {
        let event =
            parse_event("event Transfer(address indexed from, address indexed to, uint256 value)")
                .unwrap();
        let expected =
            B256::from_str("0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef")
                .unwrap();
        assert_eq!(event_selector(&event), expected);
    }

    #[test]
    fn malformed_signature_is_an_abi_error() {
        assert!(parse_function("not a signature").is_err());
        assert!(parse_function("").is_err());
    }
}
