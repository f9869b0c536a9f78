//! EVM chain-height and log fetcher.
//!
//! Uses JSON-RPC `eth_blockNumber` and `eth_getLogs`. The scanner only depends
//! on the [`EvmRpcClient`] trait; [`HttpRpcClient`] is the `reqwest`-backed
//! implementation used by the binary.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use wrapindex_core::error::IndexerError;
use wrapindex_core::types::{address_key, BlockRange, LogEntry, LogFilter};
use wrapindex_core::{Address, Bytes, B256};

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(default)]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }

    /// Parse the hex-encoded JSON fields into a [`LogEntry`].
    pub fn into_entry(self) -> Result<LogEntry, IndexerError> {
        let address = Address::from_str(&self.address)
            .map_err(|e| IndexerError::Rpc(format!("bad log address '{}': {e}", self.address)))?;
        let topics = self
            .topics
            .iter()
            .map(|t| {
                B256::from_str(t).map_err(|e| IndexerError::Rpc(format!("bad topic '{t}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let data = hex::decode(self.data.trim_start_matches("0x"))
            .map_err(|e| IndexerError::Rpc(format!("bad log data: {e}")))?;

        Ok(LogEntry {
            address,
            topics,
            data: Bytes::from(data),
            block_number: parse_hex_u64(&self.block_number)?,
            log_index: parse_hex_u64(&self.log_index)?,
        })
    }
}

/// Trait for reading chain height and logs from a JSON-RPC provider.
#[async_trait]
pub trait EvmRpcClient: Send + Sync {
    /// Current chain height.
    async fn block_number(&self) -> Result<u64, IndexerError>;

    /// All logs in `range` matching `filter`, in the order the node returns
    /// them (block, then log index).
    async fn get_logs(
        &self,
        filter: &LogFilter,
        range: BlockRange,
    ) -> Result<Vec<LogEntry>, IndexerError>;
}

#[async_trait]
impl<T: EvmRpcClient + ?Sized> EvmRpcClient for Arc<T> {
    async fn block_number(&self) -> Result<u64, IndexerError> {
        (**self).block_number().await
    }

    async fn get_logs(
        &self,
        filter: &LogFilter,
        range: BlockRange,
    ) -> Result<Vec<LogEntry>, IndexerError> {
        (**self).get_logs(filter, range).await
    }
}

// ─── JSON-RPC wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

// ─── HTTP client ──────────────────────────────────────────────────────────────

/// HTTP JSON-RPC client backed by `reqwest`.
///
/// Does not retry on its own; the scanner owns the retry policy.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, IndexerError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| IndexerError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, IndexerError> {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| IndexerError::Rpc(format!("{method}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexerError::Rpc(format!("{method}: HTTP {status}: {body}")));
        }

        let body: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| IndexerError::Rpc(format!("{method}: invalid response: {e}")))?;

        if let Some(err) = body.error {
            return Err(IndexerError::Rpc(format!(
                "{method}: JSON-RPC error {}: {}",
                err.code, err.message
            )));
        }
        body.result
            .ok_or_else(|| IndexerError::Rpc(format!("{method}: response has no result")))
    }
}

#[async_trait]
impl EvmRpcClient for HttpRpcClient {
    async fn block_number(&self) -> Result<u64, IndexerError> {
        let v = self.call("eth_blockNumber", json!([])).await?;
        let s = v
            .as_str()
            .ok_or_else(|| IndexerError::Rpc(format!("eth_blockNumber: expected string, got {v}")))?;
        parse_hex_u64(s)
    }

    async fn get_logs(
        &self,
        filter: &LogFilter,
        range: BlockRange,
    ) -> Result<Vec<LogEntry>, IndexerError> {
        let v = self.call("eth_getLogs", json!([logs_params(filter, range)])).await?;
        logs_from_json(v)
    }
}

/// The filter object for `eth_getLogs`.
pub fn logs_params(filter: &LogFilter, range: BlockRange) -> Value {
    let topics: Vec<String> = filter
        .topics
        .iter()
        .map(|t| format!("0x{}", hex::encode(t.as_slice())))
        .collect();
    json!({
        "address": address_key(&filter.address),
        "fromBlock": format!("{:#x}", range.from),
        "toBlock": format!("{:#x}", range.to),
        "topics": [topics],
    })
}

/// Convert an `eth_getLogs` result array, dropping logs removed by a reorg.
///
/// Only a result that is not an array is an error. A single log with a
/// malformed field is logged and skipped so the window can still be committed.
pub fn logs_from_json(v: Value) -> Result<Vec<LogEntry>, IndexerError> {
    let items: Vec<Value> = serde_json::from_value(v)
        .map_err(|e| IndexerError::Rpc(format!("eth_getLogs: unexpected shape: {e}")))?;

    let mut logs = Vec::with_capacity(items.len());
    for item in items {
        let (block, index) = (wire_quantity(&item, "blockNumber"), wire_quantity(&item, "logIndex"));
        let converted = serde_json::from_value::<RawLog>(item)
            .map_err(|e| IndexerError::Rpc(format!("bad log: {e}")))
            .and_then(|raw| {
                if raw.is_removed() {
                    Ok(None)
                } else {
                    raw.into_entry().map(Some)
                }
            });
        match converted {
            Ok(Some(entry)) => logs.push(entry),
            Ok(None) => {}
            Err(e) => warn!(block = ?block, log_index = ?index, error = %e, "skipping malformed log"),
        }
    }
    Ok(logs)
}

/// Best-effort read of a hex quantity field, for log context only.
fn wire_quantity(item: &Value, field: &str) -> Option<u64> {
    item.get(field)?.as_str().and_then(|s| parse_hex_u64(s).ok())
}

/// Parse a hex-encoded quantity (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Result<u64, IndexerError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| IndexerError::Rpc(format!("bad hex quantity '{s}': {e}")))
}
