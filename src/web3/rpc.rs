use crate::error::{Error, Result};
use crate::web3::abi::ContractCall;
use alloy_primitives::{hex, Address, Bytes, U256};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// A JSON-RPC 2.0 request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method: method.to_string(),
            params,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    /// `eth_call` against the latest block
    pub fn eth_call(call: &ContractCall) -> Self {
        Self::new(
            "eth_call",
            json!([
                {
                    "to": call.to().to_checksum(None),
                    "data": hex::encode_prefixed(call.encode()),
                },
                "latest"
            ]),
        )
    }

    pub fn eth_get_balance(owner: Address) -> Self {
        Self::new("eth_getBalance", json!([owner.to_checksum(None), "latest"]))
    }

    pub fn eth_get_transaction_count(owner: Address) -> Self {
        Self::new(
            "eth_getTransactionCount",
            json!([owner.to_checksum(None), "pending"]),
        )
    }

    pub fn eth_block_number() -> Self {
        Self::new("eth_blockNumber", json!([]))
    }

    pub fn eth_gas_price() -> Self {
        Self::new("eth_gasPrice", json!([]))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// A JSON-RPC 2.0 response
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    pub fn into_result(self) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        self.result
            .ok_or_else(|| Error::cast("response has neither result nor error"))
    }
}

fn hex_str(value: &Value) -> Result<&str> {
    value
        .as_str()
        .filter(|s| s.starts_with("0x"))
        .ok_or_else(|| Error::cast(format!("expected a 0x-prefixed string, got {}", value)))
}

/// Parse a hex quantity such as `0x1bc16d674ec80000`
pub fn parse_quantity(value: &Value) -> Result<U256> {
    let digits = &hex_str(value)?[2..];
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| Error::cast(format!("invalid quantity {}: {}", value, e)))
}

/// Parse hex call data such as the result of `eth_call`
pub fn parse_data(value: &Value) -> Result<Bytes> {
    let raw = hex_str(value)?;
    hex::decode(raw)
        .map(Bytes::from)
        .map_err(|e| Error::cast(format!("invalid hex data: {}", e)))
}

/// Anything that can answer JSON-RPC requests
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Send `request` and return its `result`
    async fn request(&self, request: RpcRequest) -> Result<Value>;
}

/// JSON-RPC over HTTP
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(http: reqwest::Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RpcTransport for RpcClient {
    async fn request(&self, request: RpcRequest) -> Result<Value> {
        let request = request.with_id(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!("RPC {} (id {})", request.method, request.id);

        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_result()
    }
}
