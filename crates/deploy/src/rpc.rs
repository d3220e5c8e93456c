//! Minimal Ethereum JSON-RPC client over HTTP.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

/// An error object returned by the node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, thiserror::Error)]
#[error("RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// JSON-RPC client bound to a single endpoint.
#[derive(Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for `url` with the given per-request timeout.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, anyhow::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Make a JSON-RPC call and deserialize the result.
    ///
    /// A `null` result is passed to the deserializer, so methods that may
    /// return nothing can be called with an `Option<T>` result type.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, anyhow::Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        tracing::trace!(method, id, "Sending RPC request");

        let response = self
            .http
            .post(self.url.clone())
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": id
            }))
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to {}", method, self.url))?;

        let status = response.status();
        let body: RpcResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response (HTTP {})", method, status))?;

        if let Some(error) = body.error {
            return Err(anyhow::Error::new(error).context(format!("{} failed", method)));
        }

        let result = body.result.unwrap_or(Value::Null);

        serde_json::from_value(result)
            .with_context(|| format!("Failed to deserialize {} result", method))
    }
}

/// Deserialize an optional u64 hex quantity.
pub fn deserialize_opt_u64_from_hex<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    s.as_deref()
        .map(parse_hex_u64)
        .transpose()
        .map_err(serde::de::Error::custom)
}

/// Deserialize an optional u128 hex quantity.
pub fn deserialize_opt_u128_from_hex<'de, D>(deserializer: D) -> Result<Option<u128>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    s.as_deref()
        .map(parse_hex_u128)
        .transpose()
        .map_err(serde::de::Error::custom)
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_hex_u64(s: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
}

/// Parse a `0x`-prefixed hex quantity that may exceed 64 bits.
pub fn parse_hex_u128(s: &str) -> Result<u128, std::num::ParseIntError> {
    u128::from_str_radix(s.trim_start_matches("0x"), 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Block {
        #[serde(default, deserialize_with = "deserialize_opt_u64_from_hex")]
        number: Option<u64>,
        #[serde(
            default,
            rename = "baseFeePerGas",
            deserialize_with = "deserialize_opt_u128_from_hex"
        )]
        base_fee_per_gas: Option<u128>,
    }

    #[test]
    fn test_parse_hex_quantities() {
        assert_eq!(parse_hex_u64("0x0").unwrap(), 0);
        assert_eq!(parse_hex_u64("0x7a69").unwrap(), 31337);
        assert_eq!(parse_hex_u128("0x3b9aca00").unwrap(), 1_000_000_000);
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn test_deserialize_block_quantities() {
        let block: Block =
            serde_json::from_value(serde_json::json!({ "number": "0x10", "baseFeePerGas": "0x7" }))
                .unwrap();
        assert_eq!(block.number, Some(16));
        assert_eq!(block.base_fee_per_gas, Some(7));

        let block: Block = serde_json::from_value(serde_json::json!({ "number": "0x1" })).unwrap();
        assert_eq!(block.base_fee_per_gas, None);
    }

    #[test]
    fn test_rpc_error_response() {
        let response: RpcResponse = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "insufficient funds for gas * price + value" }
        }))
        .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(
            error.to_string(),
            "RPC error -32000: insufficient funds for gas * price + value"
        );
        assert!(response.result.is_none());
    }
}
