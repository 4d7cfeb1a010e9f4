//! The client: binds a network/transport configuration to raw RPC calls,
//! chain-state polling, and the contract call engine.

use crate::{
    call::{self, CallOptions, DecodedOutput, GasSpec},
    config::Config,
    contract::{Contract, ContractOptions},
    error::{Error, Result},
    hex::parse_u256,
    poll::{self, PollHandle},
    transport::{HttpTransport, RpcTransport},
};
use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, B256, U256},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Client-level defaults merged into every call issued through this client.
#[derive(Debug, Clone)]
pub struct ClientDefaults {
    pub from: Option<Address>,
    pub interval: Duration,
    pub gas_price: Option<U256>,
    pub gas: Option<GasSpec>,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            from: None,
            interval: poll::DEFAULT_POLL_INTERVAL,
            gas_price: None,
            gas: None,
        }
    }
}

/// An Ethereum JSON-RPC client over a configurable transport.
#[derive(Clone)]
pub struct Eth {
    transport: Arc<dyn RpcTransport>,
    defaults: ClientDefaults,
}

impl Eth {
    /// Builds an HTTP client for the configuration's default network.
    pub fn new(config: &Config) -> Result<Self> {
        Self::for_network(config, None)
    }

    /// Builds an HTTP client for a named network from the configuration.
    pub fn for_network(config: &Config, network: Option<&str>) -> Result<Self> {
        let network_config = config.network(network)?;
        let transport = HttpTransport::new(&network_config.rpc_url)?;
        let defaults = ClientDefaults {
            interval: Duration::from_millis(config.polling.interval_ms),
            gas_price: Some(U256::from(config.gas.gas_price)),
            ..Default::default()
        };
        Ok(Self {
            transport: Arc::new(transport),
            defaults,
        })
    }

    /// Wraps an injected transport (e.g. a test double or a custom
    /// provider).
    pub fn with_transport(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            defaults: ClientDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: ClientDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.defaults.from = Some(from);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.defaults.interval = interval;
        self
    }

    pub fn transport(&self) -> Arc<dyn RpcTransport> {
        Arc::clone(&self.transport)
    }

    pub fn defaults(&self) -> &ClientDefaults {
        &self.defaults
    }

    /// Issues an arbitrary JSON-RPC request and returns the raw result.
    pub async fn raw(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        self.transport.request(method, params).await
    }

    /// Current block number via `eth_blockNumber`.
    pub async fn block_number(&self) -> Result<u64> {
        poll::fetch_block_number(self.transport.as_ref()).await
    }

    /// Accounts owned by the node via `eth_accounts`.
    pub async fn accounts(&self) -> Result<Vec<Address>> {
        poll::fetch_accounts(self.transport.as_ref()).await
    }

    /// Balance of an account at the given block (default `latest`).
    pub async fn balance_of(
        &self,
        address: Address,
        block: Option<BlockNumberOrTag>,
    ) -> Result<U256> {
        let block = block.unwrap_or(BlockNumberOrTag::Latest);
        let result = self
            .transport
            .request("eth_getBalance", vec![json!(address), json!(block)])
            .await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| Error::Decode(format!("expected balance string, got {result}")))?;
        parse_u256(hex_str)
    }

    /// Receipt for a transaction hash, or `None` while it is pending.
    pub async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<Value>> {
        poll::fetch_receipt(self.transport.as_ref(), tx_hash).await
    }

    fn merge_defaults(&self, mut options: CallOptions) -> CallOptions {
        if options.from.is_none() {
            options.from = self.defaults.from;
        }
        if options.gas_price.is_none() {
            options.gas_price = self.defaults.gas_price;
        }
        if options.gas.is_none() {
            options.gas = self.defaults.gas;
        }
        options
    }

    /// Read-only contract call with the client defaults merged in.
    pub async fn call(&self, options: CallOptions) -> Result<DecodedOutput> {
        let options = self.merge_defaults(options);
        call::call(self.transport.as_ref(), &options).await
    }

    /// Sends a transaction with the client defaults merged in; returns the
    /// transaction hash.
    pub async fn send_transaction(&self, options: CallOptions) -> Result<B256> {
        let options = self.merge_defaults(options);
        call::send_transaction(self.transport.as_ref(), &options).await
    }

    /// Builds an immutable contract binding sharing this client's transport
    /// and defaults.
    pub fn contract(&self, mut options: ContractOptions) -> Result<Contract> {
        if options.from.is_none() {
            options.from = self.defaults.from;
        }
        if options.interval.is_none() {
            options.interval = Some(self.defaults.interval);
        }
        if options.gas_price.is_none() {
            options.gas_price = self.defaults.gas_price;
        }
        Contract::new(Arc::clone(&self.transport), options)
    }

    /// Watches for new blocks; the listener fires once per distinct block
    /// number.
    pub fn on_block<F>(&self, listener: F) -> PollHandle
    where
        F: FnMut(Result<u64>) + Send + 'static,
    {
        poll::on_block(Arc::clone(&self.transport), self.defaults.interval, listener)
    }

    /// Watches for available accounts; the listener fires on non-empty
    /// lists.
    pub fn on_account<F>(&self, listener: F) -> PollHandle
    where
        F: FnMut(Result<Vec<Address>>) + Send + 'static,
    {
        poll::on_account(Arc::clone(&self.transport), self.defaults.interval, listener)
    }

    /// Resolves once the transaction's receipt is observed. Never times out
    /// on its own.
    pub async fn on_receipt(&self, tx_hash: B256) -> Result<Value> {
        poll::wait_for_receipt(Arc::clone(&self.transport), tx_hash, self.defaults.interval).await
    }
}

impl std::fmt::Debug for Eth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Eth")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
