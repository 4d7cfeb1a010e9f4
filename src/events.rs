//! Event log decoding.
//!
//! A [`LogDecoder`] precomputes the selector-hash map for an ABI's events
//! and turns raw `eth_getLogs` entries into decoded events. Logs whose
//! `topics[0]` matches no known event are silently dropped; that filtering
//! is documented behavior, not an error.

use crate::{
    abi::event_selector,
    call::{param_types, sol_value_to_json},
    error::{Error, Result},
};
use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    json_abi::Event,
    primitives::{Address, Bytes, B256, U256},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A raw log entry as returned by `eth_getLogs`. `topics[0]` is the event
/// selector hash unless the event is anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<U256>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub log_index: Option<U256>,
}

/// One decoded event: parameter values keyed by name and by positional
/// index, plus the originating raw log for traceability.
#[derive(Debug, Clone)]
pub struct DecodedEvent {
    pub name: String,
    params: Map<String, Value>,
    pub log: RawLog,
}

impl DecodedEvent {
    /// Parameter value at the given declaration position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.params.get(&index.to_string())
    }

    /// Parameter value by name or stringified index.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }
}

/// Maps raw log entries to decoded events by selector hash.
#[derive(Debug, Clone, Default)]
pub struct LogDecoder {
    events: HashMap<B256, Event>,
}

impl LogDecoder {
    /// Precomputes the selector map. Anonymous events carry no selector in
    /// `topics[0]` and cannot be matched, so they are skipped.
    pub fn new(events: &[Event]) -> Self {
        let mut map = HashMap::new();
        for event in events {
            if event.anonymous {
                tracing::debug!(event = %event.name, "skipping anonymous event in decoder");
                continue;
            }
            map.insert(event_selector(event), event.clone());
        }
        Self { events: map }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Decodes a batch of logs, dropping entries for unrecognized events.
    pub fn decode(&self, logs: &[RawLog]) -> Result<Vec<DecodedEvent>> {
        let mut decoded = Vec::new();
        for log in logs {
            let Some(selector) = log.topics.first() else {
                tracing::debug!("dropping log without topics");
                continue;
            };
            match self.events.get(selector) {
                Some(event) => decoded.push(decode_log(event, log)?),
                None => tracing::debug!(%selector, "dropping log for unrecognized event"),
            }
        }
        Ok(decoded)
    }
}

/// Decodes one log against one event fragment: non-indexed inputs come from
/// `data` as a single ABI tuple, indexed inputs individually from their
/// topic slot (offset by one unless the event is anonymous).
pub fn decode_log(event: &Event, log: &RawLog) -> Result<DecodedEvent> {
    let non_indexed: Vec<&str> = event
        .inputs
        .iter()
        .filter(|input| !input.indexed)
        .map(|input| input.ty.as_str())
        .collect();

    let mut data_values = if non_indexed.is_empty() {
        Vec::new()
    } else {
        let tuple = DynSolType::Tuple(param_types(&non_indexed)?);
        let decoded = tuple.abi_decode_sequence(&log.data).map_err(|e| {
            Error::Decode(format!("failed to decode data of event '{}': {e}", event.name))
        })?;
        match decoded {
            DynSolValue::Tuple(values) => values,
            other => vec![other],
        }
    }
    .into_iter();

    let topic_offset = usize::from(!event.anonymous);
    let mut indexed_seen = 0usize;
    let mut params = Map::new();

    for (position, input) in event.inputs.iter().enumerate() {
        let value = if input.indexed {
            let topic = log
                .topics
                .get(indexed_seen + topic_offset)
                .ok_or_else(|| {
                    Error::Decode(format!(
                        "event '{}' is missing topic for indexed input '{}'",
                        event.name, input.name
                    ))
                })?;
            indexed_seen += 1;
            decode_topic(&input.ty, topic)?
        } else {
            let decoded = data_values.next().ok_or_else(|| {
                Error::Decode(format!(
                    "event '{}' data is short of input '{}'",
                    event.name, input.name
                ))
            })?;
            sol_value_to_json(&decoded)?
        };

        params.insert(position.to_string(), value.clone());
        if !input.name.is_empty() {
            params.insert(input.name.clone(), value);
        }
    }

    Ok(DecodedEvent {
        name: event.name.clone(),
        params,
        log: log.clone(),
    })
}

/// Decodes a single 32-byte topic word. Dynamic indexed types only carry
/// their hash in the topic, so those fall back to the raw topic hex.
fn decode_topic(sol_type: &str, topic: &B256) -> Result<Value> {
    let ty = sol_type
        .parse::<DynSolType>()
        .map_err(|e| Error::Abi(format!("failed to parse type '{sol_type}': {e}")))?;
    match ty.abi_decode(topic.as_slice()) {
        Ok(value) => sol_value_to_json(&value),
        Err(_) => Ok(Value::String(format!("0x{}", hex::encode(topic)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::parse_event;
    use serde_json::json;
    use std::str::FromStr;

    fn address_topic(address: Address) -> B256 {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(address.as_slice());
        B256::from(word)
    }

    fn transfer_log(value: u64) -> (Event, RawLog) {
        let event =
            parse_event("event Transfer(address indexed from, address indexed to, uint256 value)")
                .unwrap();
        let from = Address::from_str("0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").unwrap();
        let to = Address::from_str("0x0000000000000000000000000000000000000001").unwrap();
        let log = RawLog {
            address: Address::ZERO,
            topics: vec![event_selector(&event), address_topic(from), address_topic(to)],
            data: Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec()),
            block_number: Some(U256::from(10)),
            transaction_hash: None,
            log_index: Some(U256::ZERO),
        };
        (event, log)
    }

    #[test]
    fn transfer_log_decodes_by_name_and_position() {
        let (event, log) = transfer_log(1000);
        let decoder = LogDecoder::new(&[event]);
        let decoded = decoder.decode(&[log.clone()]).unwrap();

        assert_eq!(decoded.len(), 1);
        let transfer = &decoded[0];
        assert_eq!(transfer.name, "Transfer");
        assert_eq!(
            transfer.field("from"),
            Some(&json!("0x742d35cc6435c9c1c72c5e7b18bab7e1db7a5d6e"))
        );
        assert_eq!(transfer.field("value"), Some(&json!("1000")));
        assert_eq!(transfer.get(2), Some(&json!("1000")));
        assert_eq!(transfer.log, log);
    }

    #[test]
    fn unrecognized_selector_is_dropped_not_an_error() {
        let event = parse_event("event Ping(uint256 n)").unwrap();
        let (_, log) = transfer_log(1);
        let decoder = LogDecoder::new(&[event]);

        let decoded = decoder.decode(&[log]).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn non_indexed_only_event_decodes_from_data() {
        let event = parse_event("event Count(uint256 n, bool ok)").unwrap();
        let mut data = U256::from(7).to_be_bytes::<32>().to_vec();
        data.extend_from_slice(&U256::from(1).to_be_bytes::<32>());
        let log = RawLog {
            address: Address::ZERO,
            topics: vec![event_selector(&event)],
            data: Bytes::from(data),
            block_number: None,
            transaction_hash: None,
            log_index: None,
        };

        let decoded = LogDecoder::new(&[event]).decode(&[log]).unwrap();
        assert_eq!(decoded[0].field("n"), Some(&json!("7")));
        assert_eq!(decoded[0].field("ok"), Some(&json!(true)));
    }

    #[test]
    fn anonymous_event_reads_topics_without_offset() {
        let event = parse_event("event Tick(uint256 indexed n) anonymous").unwrap();
        let log = RawLog {
            address: Address::ZERO,
            topics: vec![B256::from(U256::from(9).to_be_bytes::<32>())],
            data: Bytes::new(),
            block_number: None,
            transaction_hash: None,
            log_index: None,
        };
        let decoded = decode_log(&event, &log).unwrap();
        assert_eq!(decoded.field("n"), Some(&json!("9")));
    }

    #[test]
    fn raw_log_deserializes_from_rpc_json() {
        let value = json!({
            "address": "0x0000000000000000000000000000000000000001",
            "topics": ["0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"],
            "data": "0x",
            "blockNumber": "0x10",
            "transactionHash": "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
            "logIndex": "0x0",
            "removed": false
        });
        let log: RawLog = serde_json::from_value(value).unwrap();
        assert_eq!(log.block_number, Some(U256::from(16)));
        assert_eq!(log.topics.len(), 1);
    }
}
