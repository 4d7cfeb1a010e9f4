//! The contract call engine.
//!
//! Builds `eth_call` / `eth_sendTransaction` payloads from [`CallOptions`]:
//! resolves the ABI, encodes the selector and arguments, fills in gas and
//! value defaults, issues the request through the transport, and decodes the
//! returned bytes against the function outputs. Any stage failure rejects
//! the whole operation; no partial results are returned.

use crate::{
    abi::{function_selector, Abi},
    config::DEFAULT_GAS_PRICE,
    error::{Error, Result},
    hex::strip_hex_prefix,
    transport::RpcTransport,
};
use alloy::{
    dyn_abi::{DynSolType, DynSolValue, FunctionExt, Word},
    eips::BlockNumberOrTag,
    json_abi::{Function, Param},
    primitives::{Address, B256, I256, U256},
};
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// Gas amount for a transaction, tagged with the JSON key name the caller
/// wants on the wire (`gas` vs `gasLimit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasSpec {
    Gas(U256),
    GasLimit(U256),
}

/// Everything needed to build one contract call or transaction.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Target contract address. Omitted on the wire for deployment calls.
    pub to: Option<Address>,
    pub from: Option<Address>,
    /// Method description; required for argument encoding and, on
    /// `eth_call`, for output decoding.
    pub abi: Option<Abi>,
    /// Arguments in declaration order. Must match the ABI input count
    /// exactly; options never hide in a trailing argument.
    pub args: Vec<Value>,
    pub value: Option<U256>,
    pub gas: Option<GasSpec>,
    /// Gas price in wei; defaults to [`DEFAULT_GAS_PRICE`] when unset here
    /// and in the client configuration.
    pub gas_price: Option<U256>,
    /// Raw data prefix (deployment bytecode); encoded arguments are appended
    /// after it.
    pub data: Option<String>,
    /// Block tag for `eth_call`; defaults to `latest`.
    pub block: Option<BlockNumberOrTag>,
    /// Deployment call: the selector and the `to` field are omitted.
    pub deploy: bool,
    /// Overrides the RPC method name used by [`send_transaction`].
    pub rpc_method: Option<String>,
}

/// Explicit per-call overrides, merged onto base options before the request
/// is built.
#[derive(Debug, Clone, Default)]
pub struct CallOverrides {
    pub from: Option<Address>,
    pub gas: Option<GasSpec>,
    pub gas_price: Option<U256>,
    pub value: Option<U256>,
    pub block: Option<BlockNumberOrTag>,
}

impl CallOptions {
    /// Returns a copy with the override fields taking precedence.
    pub fn with_overrides(&self, overrides: &CallOverrides) -> CallOptions {
        let mut merged = self.clone();
        if overrides.from.is_some() {
            merged.from = overrides.from;
        }
        if overrides.gas.is_some() {
            merged.gas = overrides.gas;
        }
        if overrides.gas_price.is_some() {
            merged.gas_price = overrides.gas_price;
        }
        if overrides.value.is_some() {
            merged.value = overrides.value;
        }
        if overrides.block.is_some() {
            merged.block = overrides.block;
        }
        merged
    }
}

/// Decoded return values of a call, viewable positionally and by output
/// name. The keyed view also carries stringified indices ("0", "1", ...) so
/// unnamed outputs stay addressable.
#[derive(Debug, Clone, Default)]
pub struct DecodedOutput {
    values: Vec<Value>,
    named: Map<String, Value>,
}

impl DecodedOutput {
    pub(crate) fn from_params(params: &[Param], decoded: Vec<DynSolValue>) -> Result<Self> {
        let mut values = Vec::with_capacity(decoded.len());
        let mut named = Map::new();
        for (index, (param, value)) in params.iter().zip(decoded).enumerate() {
            let json_value = sol_value_to_json(&value)?;
            named.insert(index.to_string(), json_value.clone());
            if !param.name.is_empty() {
                named.insert(param.name.clone(), json_value.clone());
            }
            values.push(json_value);
        }
        Ok(Self { values, named })
    }

    /// Value at the given output position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value by output name or stringified index.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.named.get(key)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Issues a read-only `eth_call` and decodes the result against the ABI
/// outputs.
pub async fn call(transport: &dyn RpcTransport, options: &CallOptions) -> Result<DecodedOutput> {
    let function = resolve_function(options)?;
    let function = function.ok_or_else(|| {
        Error::Encode("an ABI is required to encode and decode an eth_call".to_string())
    })?;

    let tx = build_tx_object(options, Some(&function))?;
    let block = options.block.unwrap_or(BlockNumberOrTag::Latest);
    let params = vec![Value::Object(tx), json!(block)];

    let result = transport.request("eth_call", params).await?;
    decode_call_result(&function, &result)
}

/// Issues a state-mutating transaction (default method
/// `eth_sendTransaction`) and returns the transaction hash unchanged.
pub async fn send_transaction(transport: &dyn RpcTransport, options: &CallOptions) -> Result<B256> {
    let function = resolve_function(options)?;
    let tx = build_tx_object(options, function.as_ref())?;

    let method = options.rpc_method.as_deref().unwrap_or("eth_sendTransaction");
    let result = transport.request(method, vec![Value::Object(tx)]).await?;

    let hash = result
        .as_str()
        .ok_or_else(|| Error::Decode(format!("expected transaction hash string, got {result}")))?;
    B256::from_str(hash).map_err(|e| Error::Decode(format!("invalid transaction hash '{hash}': {e}")))
}

fn resolve_function(options: &CallOptions) -> Result<Option<Function>> {
    options.abi.as_ref().map(Abi::resolve).transpose()
}

/// Builds the JSON transaction object shared by calls and transactions.
fn build_tx_object(options: &CallOptions, function: Option<&Function>) -> Result<Map<String, Value>> {
    let calldata = match function {
        Some(function) => encode_call_data(function, &options.args, options.deploy)?,
        None if options.args.is_empty() => String::new(),
        None => {
            return Err(Error::Encode(
                "arguments were supplied but no ABI is available to encode them".to_string(),
            ))
        }
    };

    let prefix = options.data.as_deref().map(strip_hex_prefix).unwrap_or("");
    let data = format!("0x{}{}", prefix, strip_hex_prefix(&calldata));

    let mut tx = Map::new();
    if !options.deploy {
        let to = options
            .to
            .ok_or_else(|| Error::Encode("missing contract address".to_string()))?;
        tx.insert("to".to_string(), json!(to));
    }
    if let Some(from) = options.from {
        tx.insert("from".to_string(), json!(from));
    }
    match options.gas {
        Some(GasSpec::Gas(gas)) => {
            tx.insert("gas".to_string(), json!(gas));
        }
        Some(GasSpec::GasLimit(gas)) => {
            tx.insert("gasLimit".to_string(), json!(gas));
        }
        None => {}
    }
    let gas_price = options
        .gas_price
        .unwrap_or_else(|| U256::from(DEFAULT_GAS_PRICE));
    tx.insert("gasPrice".to_string(), json!(gas_price));
    tx.insert(
        "value".to_string(),
        json!(options.value.unwrap_or(U256::ZERO)),
    );
    tx.insert("data".to_string(), json!(data));

    Ok(tx)
}

/// Encodes calldata: selector (omitted for deployment) followed by the
/// ABI-encoded arguments.
pub fn encode_call_data(function: &Function, args: &[Value], deploy: bool) -> Result<String> {
    if args.len() != function.inputs.len() {
        let expected: Vec<String> = function
            .inputs
            .iter()
            .map(|input| format!("{} {}", input.ty, input.name))
            .collect();
        return Err(Error::Encode(format!(
            "argument count mismatch for '{}': expected {} arguments [{}], got {}",
            function.name,
            function.inputs.len(),
            expected.join(", "),
            args.len()
        )));
    }

    let mut values = Vec::with_capacity(args.len());
    for (input, arg) in function.inputs.iter().zip(args) {
        let value = json_to_sol_value(arg, &input.ty).map_err(|e| {
            Error::Encode(format!(
                "invalid argument '{}' of type '{}' for '{}': {e}",
                input.name, input.ty, function.name
            ))
        })?;
        values.push(value);
    }

    let encoded = DynSolValue::Tuple(values).abi_encode_params();
    let selector = if deploy {
        String::new()
    } else {
        strip_hex_prefix(&function_selector(function)).to_string()
    };
    Ok(format!("0x{}{}", selector, hex::encode(encoded)))
}

fn decode_call_result(function: &Function, result: &Value) -> Result<DecodedOutput> {
    let hex_str = result
        .as_str()
        .ok_or_else(|| Error::Decode(format!("expected hex string result, got {result}")))?;
    let bytes = hex::decode(strip_hex_prefix(hex_str))?;
    if bytes.is_empty() {
        return Ok(DecodedOutput::default());
    }

    let decoded = function
        .abi_decode_output(&bytes, false)
        .map_err(|e| Error::Decode(format!("failed to decode output of '{}': {e}", function.name)))?;
    DecodedOutput::from_params(&function.outputs, decoded)
}

/// Converts a JSON argument to a `DynSolValue` for the expected Solidity
/// type.
pub(crate) fn json_to_sol_value(value: &Value, sol_type: &str) -> Result<DynSolValue> {
    match sol_type {
        // Arrays first: "uint256[]" must not be captured by the scalar
        // prefix guards below.
        ty if ty.ends_with("[]") => {
            let array = value
                .as_array()
                .ok_or_else(|| Error::Encode("array parameter must be an array".to_string()))?;
            let element_type = &ty[..ty.len() - 2];
            let mut elements = Vec::with_capacity(array.len());
            for element in array {
                elements.push(json_to_sol_value(element, element_type)?);
            }
            Ok(DynSolValue::Array(elements))
        }
        "address" => {
            let addr_str = value
                .as_str()
                .ok_or_else(|| Error::Encode("address must be a string".to_string()))?;
            let address = Address::from_str(addr_str)
                .map_err(|e| Error::Encode(format!("invalid address '{addr_str}': {e}")))?;
            Ok(DynSolValue::Address(address))
        }
        ty if ty.starts_with("uint") => {
            let num = match value {
                Value::Number(n) => n
                    .as_u64()
                    .map(U256::from)
                    .ok_or_else(|| Error::Encode(format!("invalid uint value: {n}")))?,
                Value::String(s) => crate::hex::parse_u256(s)?,
                _ => return Err(Error::Encode("uint must be a number or string".to_string())),
            };
            Ok(DynSolValue::Uint(num, 256))
        }
        ty if ty.starts_with("int") => {
            let num = match value {
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|v| I256::try_from(v).ok())
                    .ok_or_else(|| Error::Encode(format!("invalid int value: {n}")))?,
                Value::String(s) => I256::from_str(s)
                    .map_err(|_| Error::Encode(format!("invalid int string: '{s}'")))?,
                _ => return Err(Error::Encode("int must be a number or string".to_string())),
            };
            Ok(DynSolValue::Int(num, 256))
        }
        "string" => {
            let s = value
                .as_str()
                .ok_or_else(|| Error::Encode("string parameter must be a string".to_string()))?;
            Ok(DynSolValue::String(s.to_string()))
        }
        "bool" => {
            let b = value
                .as_bool()
                .ok_or_else(|| Error::Encode("bool parameter must be a boolean".to_string()))?;
            Ok(DynSolValue::Bool(b))
        }
        ty if ty.starts_with("bytes") && ty != "bytes" => {
            let hex_str = value
                .as_str()
                .ok_or_else(|| Error::Encode("fixed bytes must be a hex string".to_string()))?;
            let bytes = hex::decode(strip_hex_prefix(hex_str))?;

            // Pad into a 32-byte word, keeping the declared size.
            let mut word_bytes = [0u8; 32];
            let len = bytes.len().min(32);
            word_bytes[..len].copy_from_slice(&bytes[..len]);
            Ok(DynSolValue::FixedBytes(Word::from(word_bytes), len))
        }
        "bytes" => {
            let hex_str = value
                .as_str()
                .ok_or_else(|| Error::Encode("bytes must be a hex string".to_string()))?;
            let bytes = hex::decode(strip_hex_prefix(hex_str))?;
            Ok(DynSolValue::Bytes(bytes))
        }
        _ => Err(Error::Encode(format!("unsupported Solidity type: {sol_type}"))),
    }
}

/// Renders a decoded `DynSolValue` as JSON. Integers become decimal strings
/// so values beyond 2^53 survive.
pub(crate) fn sol_value_to_json(value: &DynSolValue) -> Result<Value> {
    match value {
        DynSolValue::Address(addr) => Ok(Value::String(format!("0x{addr:x}"))),
        DynSolValue::Uint(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Int(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Bool(b) => Ok(Value::Bool(*b)),
        DynSolValue::String(s) => Ok(Value::String(s.clone())),
        DynSolValue::Bytes(bytes) => Ok(Value::String(format!("0x{}", hex::encode(bytes)))),
        DynSolValue::FixedBytes(word, size) => Ok(Value::String(format!(
            "0x{}",
            hex::encode(&word.as_slice()[..(*size).min(32)])
        ))),
        DynSolValue::Array(items) | DynSolValue::Tuple(items) => {
            let mut json_items = Vec::with_capacity(items.len());
            for item in items {
                json_items.push(sol_value_to_json(item)?);
            }
            Ok(Value::Array(json_items))
        }
        other => Err(Error::Decode(format!("unsupported decoded value: {other:?}"))),
    }
}

/// Parses the Solidity type names of the given parameters.
pub(crate) fn param_types(params: &[&str]) -> Result<Vec<DynSolType>> {
    params
        .iter()
        .map(|ty| {
            ty.parse::<DynSolType>()
                .map_err(|e| Error::Abi(format!("failed to parse type '{ty}': {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::parse_function;

    #[test]
    fn encode_balance_of_call_data() {
        let function = parse_function("balanceOf(address):(uint256)").unwrap();
        let args = vec![json!("0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e")];
        let data = encode_call_data(&function, &args, false).unwrap();

        assert!(data.starts_with("0x70a08231"));
        // selector + one padded address word
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.ends_with("742d35cc6435c9c1c72c5e7b18bab7e1db7a5d6e"));
    }

    #[test]
    fn deployment_call_data_omits_selector() {
        let function = parse_function("constructorish(uint256)").unwrap();
        let data = encode_call_data(&function, &[json!(7)], true).unwrap();
        assert_eq!(
            data,
            format!("0x{:0>64}", "7"),
        );
    }

    #[test]
    fn array_arguments_encode_elementwise() {
        let function = parse_function("setMany(uint256[])").unwrap();
        let data = encode_call_data(&function, &[json!([1, 2])], false).unwrap();

        // selector + offset word + length word + two element words
        assert_eq!(data.len(), 2 + 8 + 4 * 64);
        assert!(data.ends_with(&format!("{:0>64}{:0>64}", "1", "2")));

        assert!(json_to_sol_value(&json!(["-1"]), "int256[]").is_ok());
        assert!(json_to_sol_value(&json!(["0x01"]), "bytes32[]").is_ok());
    }

    #[test]
    fn args_without_abi_are_rejected() {
        let options = CallOptions {
            to: Some(Address::ZERO),
            args: vec![json!(1)],
            data: Some("0x6001".to_string()),
            ..Default::default()
        };
        let err = build_tx_object(&options, None).unwrap_err();
        assert!(matches!(err, Error::Encode(_)));
    }

    #[test]
    fn argument_count_mismatch_is_an_encode_error() {
        let function = parse_function("transfer(address,uint256):(bool)").unwrap();
        let err = encode_call_data(&function, &[json!(1)], false).unwrap_err();
        assert!(matches!(err, Error::Encode(_)));
    }

    #[test]
    fn tx_object_carries_documented_defaults() {
        let options = CallOptions {
            to: Some(Address::ZERO),
            abi: Some(Abi::from("get():(uint256)")),
            ..Default::default()
        };
        let function = parse_function("get():(uint256)").unwrap();
        let tx = build_tx_object(&options, Some(&function)).unwrap();

        // 20 Gwei default and zero value, both as hex quantities.
        assert_eq!(tx["gasPrice"], json!("0x4a817c800"));
        assert_eq!(tx["value"], json!("0x0"));
        assert!(tx.get("gas").is_none());
        assert!(tx.get("gasLimit").is_none());
    }

    #[test]
    fn gas_spec_chooses_the_json_key() {
        let base = CallOptions {
            to: Some(Address::ZERO),
            ..Default::default()
        };

        let gas = CallOptions {
            gas: Some(GasSpec::Gas(U256::from(21000))),
            ..base.clone()
        };
        let tx = build_tx_object(&gas, None).unwrap();
        assert!(tx.contains_key("gas"));
        assert!(!tx.contains_key("gasLimit"));

        let gas_limit = CallOptions {
            gas: Some(GasSpec::GasLimit(U256::from(21000))),
            ..base
        };
        let tx = build_tx_object(&gas_limit, None).unwrap();
        assert!(tx.contains_key("gasLimit"));
        assert!(!tx.contains_key("gas"));
    }

    #[test]
    fn overrides_take_precedence() {
        let base = CallOptions {
            to: Some(Address::ZERO),
            gas_price: Some(U256::from(1)),
            ..Default::default()
        };
        let overrides = CallOverrides {
            gas_price: Some(U256::from(2)),
            ..Default::default()
        };
        let merged = base.with_overrides(&overrides);
        assert_eq!(merged.gas_price, Some(U256::from(2)));
        assert_eq!(merged.to, base.to);
    }

    #[test]
    fn data_prefix_is_preserved_before_arguments() {
        let function = parse_function("init(uint256)").unwrap();
        let options = CallOptions {
            abi: Some(Abi::Function(function)),
            args: vec![json!(1)],
            data: Some("0x6001600155".to_string()),
            deploy: true,
            ..Default::default()
        };
        let tx = build_tx_object(&options, Some(&parse_function("init(uint256)").unwrap())).unwrap();
        let data = tx["data"].as_str().unwrap();
        assert!(data.starts_with("0x6001600155"));
        assert!(data.ends_with(&format!("{:0>64}", "1")));
        assert!(tx.get("to").is_none());
    }

    #[test]
    fn decoded_output_keys_by_name_and_index() {
        let function = parse_function("info():(uint256 count,address)").unwrap();
        let decoded = vec![
            DynSolValue::Uint(U256::from(5), 256),
            DynSolValue::Address(Address::ZERO),
        ];
        let output = DecodedOutput::from_params(&function.outputs, decoded).unwrap();

        assert_eq!(output.get(0), Some(&json!("5")));
        assert_eq!(output.field("count"), Some(&json!("5")));
        assert_eq!(output.field("0"), Some(&json!("5")));
        assert_eq!(output.field("1"), output.get(1));
        assert_eq!(output.len(), 2);
    }

    #[test]
    fn json_conversion_round_trips_simple_types() {
        let uint = json_to_sol_value(&json!("0x2a"), "uint256").unwrap();
        assert_eq!(sol_value_to_json(&uint).unwrap(), json!("42"));

        let boolean = json_to_sol_value(&json!(true), "bool").unwrap();
        assert_eq!(sol_value_to_json(&boolean).unwrap(), json!(true));

        let array = json_to_sol_value(&json!([1, 2]), "uint256[]").unwrap();
        assert_eq!(sol_value_to_json(&array).unwrap(), json!(["1", "2"]));

        assert!(json_to_sol_value(&json!(1), "fancy_struct").is_err());
    }
}
