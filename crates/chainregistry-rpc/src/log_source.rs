//! `LogSource` over JSON-RPC (`eth_blockNumber`, `eth_getLogs`).

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use chainregistry_core::error::RegistryError;
use chainregistry_core::source::LogSource;
use chainregistry_core::types::{format_address, LogEntry};

use crate::error::TransportError;
use crate::request::JsonRpcRequest;
use crate::transport::RpcTransport;

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    /// `None` while the log is still pending.
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }

    /// Returns `true` if the log is not yet in a block.
    pub fn is_pending(&self) -> bool {
        self.block_number.is_none()
    }

    /// Parse the hex fields into a [`LogEntry`].
    ///
    /// An unreadable `blockNumber` is a bad node response
    /// ([`RegistryError::SourceUnavailable`]); bad topics or data are
    /// [`RegistryError::Decode`] at the log's block.
    pub fn to_entry(&self) -> Result<LogEntry, RegistryError> {
        let raw_block = self.block_number.as_deref().unwrap_or_default();
        let block_number = parse_hex_u64(raw_block).ok_or_else(|| {
            RegistryError::from(TransportError::InvalidResponse {
                method: "eth_getLogs".into(),
                reason: format!("log has unreadable blockNumber '{raw_block}'"),
            })
        })?;
        let topics = self
            .topics
            .iter()
            .map(|t| {
                B256::from_str(t).map_err(|e| {
                    RegistryError::decode(block_number, format!("bad topic '{t}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let data = hex::decode(self.data.trim_start_matches("0x"))
            .map_err(|e| RegistryError::decode(block_number, format!("bad data: {e}")))?;
        Ok(LogEntry {
            block_number,
            topics,
            data,
        })
    }
}

/// Parse a hex quantity (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16).ok()
}

/// JSON-RPC backed [`LogSource`].
pub struct RpcLogSource<T> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: RpcTransport> RpcLogSource<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<R, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .transport
            .send(JsonRpcRequest::new(id, method, params))
            .await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl<T: RpcTransport> LogSource for RpcLogSource<T> {
    async fn head_height(&self) -> Result<u64, RegistryError> {
        let hex: String = self.call("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&hex).ok_or_else(|| {
            RegistryError::from(TransportError::InvalidResponse {
                method: "eth_blockNumber".into(),
                reason: format!("not a hex quantity: '{hex}'"),
            })
        })
    }

    async fn filter_logs(
        &self,
        address: Address,
        topic: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, RegistryError> {
        let filter = json!({
            "address": format_address(&address),
            "topics": [format!("0x{}", hex::encode(topic))],
            "fromBlock": format!("0x{from_block:x}"),
            "toBlock": format!("0x{to_block:x}"),
        });
        let raw: Vec<RawLog> = self.call("eth_getLogs", vec![filter]).await?;
        tracing::debug!(
            url = %self.transport.url(),
            from_block,
            to_block,
            logs = raw.len(),
            "eth_getLogs"
        );
        raw.iter()
            .filter(|log| !log.is_removed() && !log.is_pending())
            .map(RawLog::to_entry)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::request::{JsonRpcError, JsonRpcResponse};

    /// Answers each method with a canned result and records requests.
    #[derive(Default)]
    struct CannedTransport {
        results: HashMap<&'static str, Result<Value, JsonRpcError>>,
        requests: Mutex<Vec<JsonRpcRequest>>,
    }

    impl CannedTransport {
        fn with(mut self, method: &'static str, result: Value) -> Self {
            self.results.insert(method, Ok(result));
            self
        }

        fn with_error(mut self, method: &'static str, code: i64) -> Self {
            self.results.insert(
                method,
                Err(JsonRpcError {
                    code,
                    message: "boom".into(),
                    data: None,
                }),
            );
            self
        }
    }

    #[async_trait]
    impl RpcTransport for CannedTransport {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            self.requests.lock().unwrap().push(req.clone());
            match self.results.get(req.method.as_str()) {
                Some(Ok(v)) => Ok(JsonRpcResponse::success(req.id, v.clone())),
                Some(Err(e)) => Ok(JsonRpcResponse {
                    jsonrpc: "2.0".into(),
                    id: Value::from(req.id),
                    result: None,
                    error: Some(e.clone()),
                }),
                None => Err(TransportError::Http("no route".into())),
            }
        }

        fn url(&self) -> &str {
            "canned://"
        }
    }

    fn raw_log(block: &str, removed: bool) -> Value {
        json!({
            "address": "0xda107a1caf36d198b12c16c7b6a1d1c795978c42",
            "topics": [
                "0x3cd6a0ffcc37406d9958e09bba79ff19d8237819eb2e1911f9edbce656499c87",
                "0x000000000000000000000000aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "0x0000000000000000000000000000000000000000000000000000000000000007"
            ],
            "data": "0x",
            "blockNumber": block,
            "blockHash": "0x00",
            "transactionHash": "0x00",
            "logIndex": "0x0",
            "removed": removed
        })
    }

    #[test]
    fn parse_hex_u64_basic() {
        assert_eq!(parse_hex_u64("0x1"), Some(1));
        assert_eq!(parse_hex_u64("0xff"), Some(255));
        assert_eq!(parse_hex_u64("1234"), Some(0x1234));
        assert_eq!(parse_hex_u64("0xzz"), None);
    }

    #[tokio::test]
    async fn head_height_parses_quantity() {
        let transport = CannedTransport::default().with("eth_blockNumber", json!("0x5dc"));
        let source = RpcLogSource::new(transport);
        assert_eq!(source.head_height().await.unwrap(), 1500);
    }

    #[tokio::test]
    async fn filter_logs_builds_query_and_drops_removed() {
        let transport = CannedTransport::default().with(
            "eth_getLogs",
            json!([raw_log("0x4b0", false), raw_log("0x4b1", true)]),
        );
        let source = RpcLogSource::new(transport);
        let address = Address::repeat_byte(0xab);
        let topic = B256::repeat_byte(0x01);

        let logs = source.filter_logs(address, topic, 1000, 2999).await.unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_number, 1200);
        assert_eq!(logs[0].topics.len(), 3);

        let requests = source.transport().requests.lock().unwrap();
        let filter = &requests[0].params[0];
        assert_eq!(filter["fromBlock"], "0x3e8");
        assert_eq!(filter["toBlock"], "0xbb7");
        assert_eq!(filter["address"], format!("0x{}", "ab".repeat(20)));
        assert_eq!(filter["topics"][0], format!("0x{}", "01".repeat(32)));
    }

    #[tokio::test]
    async fn rpc_error_is_source_unavailable() {
        let transport = CannedTransport::default().with_error("eth_getLogs", -32005);
        let source = RpcLogSource::new(transport);
        let err = source
            .filter_logs(Address::ZERO, B256::ZERO, 0, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn pending_logs_are_skipped() {
        let mut pending = raw_log("0x0", false);
        pending["blockNumber"] = Value::Null;
        let transport = CannedTransport::default()
            .with("eth_getLogs", json!([pending, raw_log("0x20", false)]));
        let source = RpcLogSource::new(transport);

        let logs = source.filter_logs(Address::ZERO, B256::ZERO, 0, 100).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_number, 32);
    }

    #[tokio::test]
    async fn unreadable_block_number_is_a_bad_response() {
        let mut bad = raw_log("0x10", false);
        bad["blockNumber"] = json!("0xnope");
        let transport = CannedTransport::default().with("eth_getLogs", json!([bad]));
        let source = RpcLogSource::new(transport);

        let err = source
            .filter_logs(Address::ZERO, B256::ZERO, 0, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::SourceUnavailable(ref m) if m.contains("blockNumber")));
    }

    #[tokio::test]
    async fn malformed_topic_is_decode_error() {
        let mut bad = raw_log("0x10", false);
        bad["topics"][1] = json!("0x1234");
        let transport = CannedTransport::default().with("eth_getLogs", json!([bad]));
        let source = RpcLogSource::new(transport);

        let err = source
            .filter_logs(Address::ZERO, B256::ZERO, 0, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Decode { block_number: 16, .. }));
    }
}
