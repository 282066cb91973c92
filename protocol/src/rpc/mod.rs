//! # Ledger RPC
//!
//! The narrow interface the store/retrieve protocol needs from a node, and
//! the JSON-RPC implementation of it.
//!
//! ```text
//! envelope.rs — JSON-RPC 2.0 request/response types and method names
//! http.rs     — HttpLedgerClient: LedgerRpc over HTTP via reqwest
//! ```
//!
//! Everything above this module talks to [`LedgerRpc`] only. The handle is
//! owned by the caller and shared by `Arc`; the client keeps no chain state
//! of its own, so nothing here needs locking.

pub mod envelope;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use alloy_primitives::U64;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::types::{Address, BlockTag, Bytes, TxHash, B256};

pub use envelope::{RpcErrorObject, RpcMethod, RpcRequest, RpcResponse};
pub use http::{ConnectError, HttpLedgerClient};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Transport-level failures. These propagate unchanged; nothing at this
/// layer retries.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The HTTP request could not be completed.
    #[error("{method} failed: {source}")]
    Http {
        /// JSON-RPC method name.
        method: &'static str,
        /// Underlying transport error.
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-2xx status.
    #[error("{method} returned HTTP {status}: {body}")]
    Status {
        /// JSON-RPC method name.
        method: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The node returned a JSON-RPC error object.
    #[error("{method} rejected by node ({code}): {message}")]
    Node {
        /// JSON-RPC method name.
        method: &'static str,
        /// JSON-RPC error code.
        code: i64,
        /// Node-supplied message.
        message: String,
    },

    /// The response parsed as JSON-RPC but not as the expected type.
    #[error("{method} returned an invalid response: {reason}")]
    InvalidResponse {
        /// JSON-RPC method name.
        method: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A transaction needs a sender and none is configured or unlocked.
    #[error("no sender account configured and the node exposes none")]
    NoSender,
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// A contract call or transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Sender; filled in by the client from its configured account when unset.
    pub from: Option<Address>,
    /// Target contract.
    pub to: Address,
    /// ABI-encoded call data.
    pub data: Vec<u8>,
    /// Gas budget, normally the node's own estimate.
    pub gas: Option<u64>,
}

impl CallRequest {
    /// A call to `to` with `data` and no sender or gas.
    pub fn new(to: Address, data: Vec<u8>) -> Self {
        Self {
            from: None,
            to,
            data,
            gas: None,
        }
    }

    /// Attaches a gas budget.
    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    /// The JSON object form used by `eth_call`, `eth_estimateGas` and
    /// `eth_sendTransaction`.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if let Some(from) = &self.from {
            obj.insert("from".into(), json!(from));
        }
        obj.insert("to".into(), json!(self.to));
        obj.insert("data".into(), json!(Bytes::copy_from_slice(&self.data)));
        if let Some(gas) = self.gas {
            obj.insert("gas".into(), json!(U64::from(gas)));
        }
        Value::Object(obj)
    }
}

/// Filter for `eth_getLogs`. Topics are positional and exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    /// First block of the window.
    pub from_block: BlockTag,
    /// Last block of the window, inclusive.
    pub to_block: BlockTag,
    /// Emitting contract.
    pub address: Address,
    /// Topic values, position by position.
    pub topics: Vec<B256>,
}

impl LogFilter {
    /// JSON form for `eth_getLogs`.
    pub fn to_json(&self) -> Value {
        json!({
            "fromBlock": self.from_block,
            "toBlock": self.to_block,
            "address": self.address,
            "topics": self.topics,
        })
    }

    /// Whether `entry` satisfies the topic filter.
    pub fn matches_topics(&self, entry_topics: &[B256]) -> bool {
        self.topics.len() <= entry_topics.len()
            && self.topics.iter().zip(entry_topics).all(|(a, b)| a == b)
    }
}

/// A confirmed (or pending) event log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Non-indexed event data.
    pub data: Vec<u8>,
    /// Indexed topics.
    pub topics: Vec<B256>,
    /// Containing block; `None` for pending logs.
    pub block_number: Option<u64>,
}

/// A transaction seen in the pending block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    /// Transaction hash.
    pub hash: Option<TxHash>,
    /// Recipient; `None` for contract creation.
    pub to: Option<Address>,
    /// Call data.
    pub input: Vec<u8>,
}

/// The node's tentative next block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingBlock {
    /// Height the block would be mined at, when the node reports one.
    pub number: Option<u64>,
    /// Transactions it currently contains.
    pub transactions: Vec<PendingTransaction>,
}

// Wire forms as nodes return them. Hex decoding happens in serde, so a
// malformed field fails the whole response as `InvalidResponse`.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawLog {
    data: Bytes,
    #[serde(default)]
    topics: Vec<B256>,
    block_number: Option<U64>,
}

impl From<RawLog> for LogEntry {
    fn from(raw: RawLog) -> Self {
        Self {
            data: raw.data.to_vec(),
            topics: raw.topics,
            block_number: raw.block_number.map(|n| n.to::<u64>()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTransaction {
    hash: Option<TxHash>,
    to: Option<Address>,
    input: Bytes,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBlock {
    number: Option<U64>,
    #[serde(default)]
    transactions: Vec<RawTransaction>,
}

impl From<RawBlock> for PendingBlock {
    fn from(raw: RawBlock) -> Self {
        Self {
            number: raw.number.map(|n| n.to::<u64>()),
            transactions: raw
                .transactions
                .into_iter()
                .map(|tx| PendingTransaction {
                    hash: tx.hash,
                    to: tx.to,
                    input: tx.input.to_vec(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerRpc
// ---------------------------------------------------------------------------

/// The node operations the store/retrieve protocol is built on.
///
/// Every method is one request/response round trip; these are the only
/// suspension points of a store or retrieve call.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Height of the latest mined block.
    async fn block_number(&self) -> Result<u64, RpcError>;

    /// Read-only call against `view`. Never creates a transaction.
    async fn call(&self, call: &CallRequest, view: BlockTag) -> Result<Vec<u8>, RpcError>;

    /// Gas the node expects `call` to consume against `view`.
    async fn estimate_cost(&self, call: &CallRequest, view: BlockTag) -> Result<u64, RpcError>;

    /// Broadcasts `call` as a transaction signed by the node.
    async fn send_transaction(&self, call: &CallRequest) -> Result<TxHash, RpcError>;

    /// The pending block with full transaction objects.
    async fn pending_block(&self) -> Result<PendingBlock, RpcError>;

    /// Log entries matching `filter`.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, RpcError>;

    /// Accounts the node can sign for.
    async fn accounts(&self) -> Result<Vec<Address>, RpcError>;
}

#[async_trait]
impl<T: LedgerRpc + ?Sized> LedgerRpc for Arc<T> {
    async fn block_number(&self) -> Result<u64, RpcError> {
        (**self).block_number().await
    }

    async fn call(&self, call: &CallRequest, view: BlockTag) -> Result<Vec<u8>, RpcError> {
        (**self).call(call, view).await
    }

    async fn estimate_cost(&self, call: &CallRequest, view: BlockTag) -> Result<u64, RpcError> {
        (**self).estimate_cost(call, view).await
    }

    async fn send_transaction(&self, call: &CallRequest) -> Result<TxHash, RpcError> {
        (**self).send_transaction(call).await
    }

    async fn pending_block(&self) -> Result<PendingBlock, RpcError> {
        (**self).pending_block().await
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, RpcError> {
        (**self).get_logs(filter).await
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        (**self).accounts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: Address = Address::repeat_byte(0x11);

    #[test]
    fn call_request_json_omits_unset_fields() {
        let call = CallRequest::new(CONTRACT, vec![0xde, 0xad]);
        let json = call.to_json();
        assert_eq!(json["to"], "0x1111111111111111111111111111111111111111");
        assert_eq!(json["data"], "0xdead");
        assert!(json.get("from").is_none());
        assert!(json.get("gas").is_none());

        let json = call.with_gas(21_000).to_json();
        assert_eq!(json["gas"], "0x5208");
    }

    #[test]
    fn log_filter_json_shape() {
        let filter = LogFilter {
            from_block: BlockTag::Number(10),
            to_block: BlockTag::Pending,
            address: CONTRACT,
            topics: vec![B256::repeat_byte(0xaa)],
        };
        let json = filter.to_json();
        assert_eq!(json["fromBlock"], "0xa");
        assert_eq!(json["toBlock"], "pending");
        assert_eq!(json["topics"][0], format!("0x{}", "aa".repeat(32)));
    }

    #[test]
    fn topic_matching_is_positional() {
        let [one, two, three] = [1u8, 2, 3].map(B256::repeat_byte);
        let filter = LogFilter {
            from_block: BlockTag::Latest,
            to_block: BlockTag::Latest,
            address: CONTRACT,
            topics: vec![one, two],
        };
        assert!(filter.matches_topics(&[one, two, three]));
        assert!(!filter.matches_topics(&[two, one]));
        assert!(!filter.matches_topics(&[one]));
    }

    #[test]
    fn raw_log_converts() {
        let raw: RawLog = serde_json::from_value(json!({
            "data": "0x0102",
            "topics": [format!("0x{}", "ab".repeat(32))],
            "blockNumber": "0x10",
        }))
        .unwrap();
        let entry = LogEntry::from(raw);
        assert_eq!(entry.data, vec![1, 2]);
        assert_eq!(entry.topics, vec![B256::repeat_byte(0xab)]);
        assert_eq!(entry.block_number, Some(16));
    }

    #[test]
    fn malformed_topic_fails_to_parse() {
        let raw = serde_json::from_value::<RawLog>(json!({
            "data": "0x",
            "topics": ["0xabcd"],
        }));
        assert!(raw.is_err());
    }

    #[test]
    fn raw_pending_block_tolerates_missing_number_and_to() {
        let raw: RawBlock = serde_json::from_value(json!({
            "number": null,
            "transactions": [{ "hash": null, "to": null, "input": "0x" }],
        }))
        .unwrap();
        let block = PendingBlock::from(raw);
        assert_eq!(block.number, None);
        assert_eq!(block.transactions[0].to, None);
        assert!(block.transactions[0].input.is_empty());
    }
}
