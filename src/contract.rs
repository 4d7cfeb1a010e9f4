//! Contract bindings.
//!
//! A [`Contract`] is built once from method and event signatures and is
//! immutable afterwards: a frozen name-to-fragment map, a log decoder bound
//! to the event fragments, and call/send entry points bound to the contract
//! address.

use crate::{
    abi::{parse_event, parse_function, Abi},
    call::{self, CallOptions, CallOverrides, DecodedOutput, GasSpec},
    error::{Error, Result},
    events::{DecodedEvent, LogDecoder, RawLog},
    poll::{self, PollHandle, DEFAULT_POLL_INTERVAL},
    transport::RpcTransport,
};
use alloy::{
    eips::BlockNumberOrTag,
    json_abi::Function,
    primitives::{Address, B256, U256},
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Construction options for a contract binding.
#[derive(Debug, Clone, Default)]
pub struct ContractOptions {
    pub address: Address,
    /// Default sender merged into every call.
    pub from: Option<Address>,
    /// Method signatures, e.g. `"balanceOf(address):(uint256)"`.
    pub methods: Vec<String>,
    /// Event signatures for log decoding, e.g.
    /// `"event Transfer(address indexed from, address indexed to, uint256 value)"`.
    pub events: Vec<String>,
    /// Polling period for `on_event`; defaults to the client's.
    pub interval: Option<Duration>,
    pub gas: Option<GasSpec>,
    pub gas_price: Option<U256>,
}

/// Log filter arguments for `get_logs`. Named block tags pass through
/// unchanged; numeric values are sent as hex quantities.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub from_block: Option<BlockNumberOrTag>,
    pub to_block: Option<BlockNumberOrTag>,
    pub topics: Vec<Value>,
}

/// Options for event subscriptions.
#[derive(Debug, Clone, Default)]
pub struct EventPollOptions {
    pub interval: Option<Duration>,
    /// First block of interest; defaults to the block observed on the first
    /// tick.
    pub from_block: Option<u64>,
}

struct ContractInner {
    transport: Arc<dyn RpcTransport>,
    address: Address,
    from: Option<Address>,
    interval: Duration,
    gas: Option<GasSpec>,
    gas_price: Option<U256>,
    methods: HashMap<String, Function>,
    decoder: LogDecoder,
}

/// An immutable contract handle: no methods may be added or replaced after
/// construction. Cloning is cheap and shares the underlying state.
#[derive(Clone)]
pub struct Contract {
    inner: Arc<ContractInner>,
}

impl Contract {
    pub fn new(transport: Arc<dyn RpcTransport>, options: ContractOptions) -> Result<Self> {
        let mut methods = HashMap::new();
        for signature in &options.methods {
            let function = parse_function(signature)?;
            methods.insert(function.name.clone(), function);
        }

        let mut events = Vec::with_capacity(options.events.len());
        for signature in &options.events {
            events.push(parse_event(signature)?);
        }

        Ok(Self {
            inner: Arc::new(ContractInner {
                transport,
                address: options.address,
                from: options.from,
                interval: options.interval.unwrap_or(DEFAULT_POLL_INTERVAL),
                gas: options.gas,
                gas_price: options.gas_price,
                methods,
                decoder: LogDecoder::new(&events),
            }),
        })
    }

    pub fn address(&self) -> Address {
        self.inner.address
    }

    /// Names of the bound methods.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.inner.methods.keys().map(String::as_str)
    }

    pub fn decoder(&self) -> &LogDecoder {
        &self.inner.decoder
    }

    fn function(&self, name: &str) -> Result<&Function> {
        self.inner.methods.get(name).ok_or_else(|| {
            let mut known: Vec<&str> = self.inner.methods.keys().map(String::as_str).collect();
            known.sort_unstable();
            Error::Abi(format!(
                "method '{name}' not bound on this contract; bound methods: [{}]",
                known.join(", ")
            ))
        })
    }

    fn options_for(&self, name: &str, args: Vec<Value>) -> Result<CallOptions> {
        let function = self.function(name)?;
        Ok(CallOptions {
            to: Some(self.inner.address),
            from: self.inner.from,
            abi: Some(Abi::Function(function.clone())),
            args,
            gas: self.inner.gas,
            gas_price: self.inner.gas_price,
            ..Default::default()
        })
    }

    /// Read-only call of a bound method.
    pub async fn call(&self, name: &str, args: Vec<Value>) -> Result<DecodedOutput> {
        self.call_with(name, args, &CallOverrides::default()).await
    }

    pub async fn call_with(
        &self,
        name: &str,
        args: Vec<Value>,
        overrides: &CallOverrides,
    ) -> Result<DecodedOutput> {
        let options = self.options_for(name, args)?.with_overrides(overrides);
        call::call(self.inner.transport.as_ref(), &options).await
    }

    /// State-mutating invocation of a bound method; returns the transaction
    /// hash.
    pub async fn send(&self, name: &str, args: Vec<Value>) -> Result<B256> {
        self.send_with(name, args, &CallOverrides::default()).await
    }

    pub async fn send_with(
        &self,
        name: &str,
        args: Vec<Value>,
        overrides: &CallOverrides,
    ) -> Result<B256> {
        let options = self.options_for(name, args)?.with_overrides(overrides);
        call::send_transaction(self.inner.transport.as_ref(), &options).await
    }

    /// Fetches logs for this contract's address and decodes them with the
    /// bound decoder.
    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<DecodedEvent>> {
        let logs = self.get_raw_logs(filter).await?;
        self.inner.decoder.decode(&logs)
    }

    async fn get_raw_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>> {
        let params = json!({
            "fromBlock": filter.from_block.unwrap_or(BlockNumberOrTag::Latest),
            "toBlock": filter.to_block.unwrap_or(BlockNumberOrTag::Latest),
            "address": self.inner.address,
            "topics": filter.topics,
        });
        let result = self
            .inner
            .transport
            .request("eth_getLogs", vec![params])
            .await?;
        serde_json::from_value(result).map_err(Into::into)
    }

    /// Subscribes to this contract's events by polling for new blocks.
    ///
    /// Each tick that observes a new block fetches the logs between the last
    /// processed block + 1 and the block just seen, decodes them, and hands
    /// non-empty batches to the listener. The high-water mark advances so no
    /// block is fetched twice or skipped.
    pub fn on_event<F>(&self, options: EventPollOptions, mut listener: F) -> PollHandle
    where
        F: FnMut(Result<Vec<DecodedEvent>>) + Send + 'static,
    {
        let contract = self.clone();
        let period = options.interval.unwrap_or(self.inner.interval);
        let start = options.from_block;

        poll::spawn_poll(async move {
            let mut ticker = tokio::time::interval(period);
            let mut last: Option<u64> = None;
            loop {
                ticker.tick().await;
                let current = match poll::fetch_block_number(contract.inner.transport.as_ref()).await
                {
                    Ok(number) => number,
                    Err(e) => {
                        listener(Err(e));
                        continue;
                    }
                };
                if last == Some(current) {
                    continue;
                }

                let from = match last {
                    Some(last) => last + 1,
                    None => start.unwrap_or(current),
                };
                let filter = LogFilter {
                    from_block: Some(BlockNumberOrTag::Number(from)),
                    to_block: Some(BlockNumberOrTag::Number(current)),
                    topics: Vec::new(),
                };
                match contract.get_logs(&filter).await {
                    Ok(batch) => {
                        last = Some(current);
                        if !batch.is_empty() {
                            listener(Ok(batch));
                        }
                    }
                    Err(e) => listener(Err(e)),
                }
            }
        })
    }
}

impl std::fmt::Debug for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contract")
            .field("address", &self.inner.address)
            .field("methods", &self.inner.methods.keys())
            .finish_non_exhaustive()
    }
}
