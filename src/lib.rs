//! A thin client for Ethereum-compatible JSON-RPC nodes.
//!
//! The crate composes three things on top of a stateless request/response
//! transport: raw RPC calls, timer-driven polling for chain state changes
//! (blocks, accounts, receipts, event logs), and a contract-call layer that
//! encodes arguments and decodes results from function and event signature
//! strings. ABI encoding and signature parsing are delegated to the
//! [`alloy`] ecosystem; this crate only glues them together.
//!
//! ```no_run
//! use minieth::{client::Eth, config::Config, contract::ContractOptions};
//! use serde_json::json;
//!
//! # async fn run() -> minieth::error::Result<()> {
//! let config = Config::load_or_default(None::<&str>).await;
//! let eth = Eth::new(&config)?;
//!
//! let block = eth.block_number().await?;
//! println!("at block {block}");
//!
//! let token = eth.contract(ContractOptions {
//!     address: "0x6b175474e89094c44da98b954eedeac495271d0f".parse().unwrap(),
//!     methods: vec!["balanceOf(address):(uint256)".to_string()],
//!     ..Default::default()
//! })?;
//! let balance = token
//!     .call("balanceOf", vec![json!("0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e")])
//!     .await?;
//! println!("balance: {:?}", balance.get(0));
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod call;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod events;
pub mod hex;
pub mod poll;
pub mod transport;

pub use abi::{event_selector, function_selector, parse_event, parse_function, Abi};
pub use call::{CallOptions, CallOverrides, DecodedOutput, GasSpec};
pub use client::{ClientDefaults, Eth};
pub use config::{Config, NetworkConfig, DEFAULT_GAS_PRICE};
pub use contract::{Contract, ContractOptions, EventPollOptions, LogFilter};
pub use error::{Error, Result};
pub use events::{DecodedEvent, LogDecoder, RawLog};
pub use poll::{wait_for_receipt, PollHandle, DEFAULT_POLL_INTERVAL};
pub use transport::{HttpTransport, RpcTransport};
