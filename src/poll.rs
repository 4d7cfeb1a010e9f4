//! Timer-driven polling primitives.
//!
//! Each primitive spawns one task that owns its own cursor state and ticks
//! on a fixed period (first tick fires immediately). The returned
//! [`PollHandle`] is the only way to stop a poller; `cancel` is idempotent
//! and dropping the handle leaves the poller running detached.

use crate::{
    error::{Error, Result},
    hex::parse_u256,
    transport::RpcTransport,
};
use alloy::primitives::{Address, B256};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Handle to a running poller. Owns cancellation; the cursor state lives
/// inside the polling task itself.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
    cancelled: Arc<AtomicBool>,
}

impl PollHandle {
    /// Stops issuing further ticks. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub(crate) fn spawn_poll<F>(future: F) -> PollHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    PollHandle {
        task: tokio::spawn(future),
        cancelled: Arc::new(AtomicBool::new(false)),
    }
}

pub(crate) async fn fetch_block_number(transport: &dyn RpcTransport) -> Result<u64> {
    let result = transport.request("eth_blockNumber", Vec::new()).await?;
    let hex_str = result
        .as_str()
        .ok_or_else(|| Error::Decode(format!("expected block number string, got {result}")))?;
    let number = parse_u256(hex_str)?;
    u64::try_from(number).map_err(|_| Error::Decode(format!("block number out of range: {number}")))
}

pub(crate) async fn fetch_accounts(transport: &dyn RpcTransport) -> Result<Vec<Address>> {
    let result = transport.request("eth_accounts", Vec::new()).await?;
    serde_json::from_value(result).map_err(Into::into)
}

pub(crate) async fn fetch_receipt(
    transport: &dyn RpcTransport,
    tx_hash: B256,
) -> Result<Option<Value>> {
    let result = transport
        .request("eth_getTransactionReceipt", vec![json!(tx_hash)])
        .await?;
    Ok(match result {
        Value::Null => None,
        receipt => Some(receipt),
    })
}

/// Polls `eth_blockNumber`, invoking the listener only when the fetched
/// value differs from the last one seen. Transport failures are reported to
/// the listener and polling continues.
pub fn on_block<F>(transport: Arc<dyn RpcTransport>, period: Duration, mut listener: F) -> PollHandle
where
    F: FnMut(Result<u64>) + Send + 'static,
{
    spawn_poll(async move {
        let mut ticker = tokio::time::interval(period);
        let mut last: Option<u64> = None;
        loop {
            ticker.tick().await;
            match fetch_block_number(transport.as_ref()).await {
                Ok(number) if last == Some(number) => {}
                Ok(number) => {
                    last = Some(number);
                    listener(Ok(number));
                }
                Err(e) => listener(Err(e)),
            }
        }
    })
}

/// Polls `eth_accounts`, invoking the listener only with non-empty account
/// lists.
pub fn on_account<F>(
    transport: Arc<dyn RpcTransport>,
    period: Duration,
    mut listener: F,
) -> PollHandle
where
    F: FnMut(Result<Vec<Address>>) + Send + 'static,
{
    spawn_poll(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match fetch_accounts(transport.as_ref()).await {
                Ok(accounts) if accounts.is_empty() => {}
                Ok(accounts) => listener(Ok(accounts)),
                Err(e) => listener(Err(e)),
            }
        }
    })
}

/// Polls `eth_getTransactionReceipt` until a receipt carrying the matching
/// transaction hash appears, then resolves exactly once and stops ticking.
///
/// An absent receipt is not an error and never times out here; callers apply
/// their own deadline if they want one. Transport failures reject the
/// future.
pub async fn wait_for_receipt(
    transport: Arc<dyn RpcTransport>,
    tx_hash: B256,
    period: Duration,
) -> Result<Value> {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        if let Some(receipt) = fetch_receipt(transport.as_ref(), tx_hash).await? {
            let matches = receipt
                .get("transactionHash")
                .and_then(Value::as_str)
                .map(|hash| hash.eq_ignore_ascii_case(&format!("{tx_hash:?}")))
                .unwrap_or(false);
            if matches {
                return Ok(receipt);
            }
        }
    }
}
