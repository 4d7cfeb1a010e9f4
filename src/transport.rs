//! The JSON-RPC transport seam.
//!
//! Everything network-facing goes through [`RpcTransport`], so tests can
//! substitute scripted transports and callers can inject their own provider.
//! Retry and timeout policy belong to the transport implementation, never to
//! the layers above it.

use crate::error::{Error, Result};
use alloy::{
    providers::{Provider, ProviderBuilder, RootProvider},
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;

/// A stateless request/response transport: sends one JSON-RPC request and
/// returns the raw `result` field, or the provider's error message.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value>;
}

/// HTTP transport backed by an alloy provider.
#[derive(Debug)]
pub struct HttpTransport {
    provider: RootProvider<Http<Client>>,
    url: String,
}

impl HttpTransport {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("invalid RPC URL '{rpc_url}': {e}")))?;
        let provider = ProviderBuilder::new().on_http(url);
        Ok(Self {
            provider,
            url: rpc_url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        tracing::debug!(method, url = %self.url, "sending JSON-RPC request");
        self.provider
            .raw_request::<_, Value>(Cow::Owned(method.to_string()), params)
            .await
            .map_err(|e| Error::Transport(interpret_rpc_error(&e.to_string())))
    }
}

/// Maps common RPC failure strings onto friendlier messages. The original
/// provider message is kept when nothing matches.
pub fn interpret_rpc_error(error: &str) -> String {
    if error.contains("execution reverted") {
        "the contract function reverted execution; check your parameters".to_string()
    } else if error.contains("insufficient funds") {
        "insufficient funds to cover gas costs".to_string()
    } else if error.contains("gas required exceeds allowance") {
        "gas limit too low for this transaction".to_string()
    } else if error.contains("connection refused") || error.contains("network unreachable") {
        "cannot connect to RPC endpoint; check the RPC URL configuration".to_string()
    } else if error.contains("rate limit") {
        "too many requests to the RPC endpoint".to_string()
    } else if error.contains("method not found") {
        "the requested method is not supported by this RPC endpoint".to_string()
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_transport_rejects_malformed_url() {
        assert!(HttpTransport::new("not a url").is_err());
        assert!(HttpTransport::new("http://localhost:8545").is_ok());
    }

    #[test]
    fn rpc_errors_are_interpreted() {
        assert!(interpret_rpc_error("execution reverted: boom").contains("reverted"));
        assert_eq!(interpret_rpc_error("weird failure"), "weird failure");
    }
}
