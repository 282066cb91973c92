//! [`LedgerRpc`] over HTTP JSON-RPC.

use std::sync::atomic::{AtomicU64, Ordering};

use std::fmt::Display;

use alloy_primitives::U64;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::envelope::{RpcMethod, RpcRequest, RpcResponse};
use super::{
    CallRequest, LedgerRpc, LogEntry, LogFilter, PendingBlock, RawBlock, RawLog, RpcError,
};
use crate::config::{ClientConfig, ConfigError};
use crate::types::{Address, BlockTag, Bytes, TxHash};

/// JSON-RPC client for an Ethereum node.
///
/// Stateless apart from the request id counter and the sender account;
/// share it behind an `Arc`.
#[derive(Debug)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    url: Url,
    from: Option<Address>,
    next_id: AtomicU64,
}

impl HttpLedgerClient {
    /// Builds a client without contacting the node.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let url = Url::parse(&config.rpc_url).map_err(|e| ConfigError::InvalidUrl {
            url: config.rpc_url.clone(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            url,
            from: config.from,
            next_id: AtomicU64::new(1),
        })
    }

    /// Builds a client and, when no sender is configured, adopts the node's
    /// first unlocked account. A node with no accounts still yields a
    /// usable read-only client.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ConnectError> {
        let mut client = Self::new(config)?;
        if client.from.is_none() {
            client.from = client.accounts().await?.into_iter().next();
            debug!(from = ?client.from, "adopted node account");
        }
        Ok(client)
    }

    /// The endpoint this client talks to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The sender used for transactions, if any.
    pub fn from(&self) -> Option<Address> {
        self.from
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: RpcMethod,
        params: Value,
    ) -> Result<T, RpcError> {
        let name = method.as_str();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest::new(json!(id), method, params);

        let resp = self
            .http
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|source| RpcError::Http {
                method: name,
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::Status {
                method: name,
                status: status.as_u16(),
                body: describe_body(resp.text().await),
            });
        }

        let envelope: RpcResponse = resp.json().await.map_err(|source| RpcError::Http {
            method: name,
            source,
        })?;

        if let Some(err) = envelope.error {
            return Err(RpcError::Node {
                method: name,
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_value(envelope.result.unwrap_or(Value::Null)).map_err(|e| {
            RpcError::InvalidResponse {
                method: name,
                reason: e.to_string(),
            }
        })
    }

    /// Fills in the configured sender; calls and estimates run as that
    /// account so contract logic keyed on the caller sees the real owner.
    fn with_sender(&self, call: &CallRequest) -> CallRequest {
        let mut call = call.clone();
        if call.from.is_none() {
            call.from = self.from;
        }
        call
    }

    async fn request_quantity(&self, method: RpcMethod, params: Value) -> Result<u64, RpcError> {
        let raw: U64 = self.request(method, params).await?;
        Ok(raw.to::<u64>())
    }
}

/// Body text of a failed response. A body that cannot be read is reported
/// in its place.
fn describe_body<E: Display>(read: Result<String, E>) -> String {
    match read {
        Ok(body) => body,
        Err(e) => format!("<unreadable body: {e}>"),
    }
}

/// Failure to bring up an [`HttpLedgerClient`].
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

#[async_trait]
impl LedgerRpc for HttpLedgerClient {
    async fn block_number(&self) -> Result<u64, RpcError> {
        self.request_quantity(RpcMethod::BlockNumber, json!([])).await
    }

    async fn call(&self, call: &CallRequest, view: BlockTag) -> Result<Vec<u8>, RpcError> {
        let call = self.with_sender(call);
        let raw: Bytes = self
            .request(RpcMethod::Call, json!([call.to_json(), view]))
            .await?;
        Ok(raw.to_vec())
    }

    async fn estimate_cost(&self, call: &CallRequest, view: BlockTag) -> Result<u64, RpcError> {
        let call = self.with_sender(call);
        self.request_quantity(
            RpcMethod::EstimateGas,
            json!([call.to_json(), view]),
        )
        .await
    }

    async fn send_transaction(&self, call: &CallRequest) -> Result<TxHash, RpcError> {
        let mut call = call.clone();
        if call.from.is_none() {
            call.from = Some(self.from.ok_or(RpcError::NoSender)?);
        }
        self.request(RpcMethod::SendTransaction, json!([call.to_json()]))
            .await
    }

    async fn pending_block(&self) -> Result<PendingBlock, RpcError> {
        let raw: Option<RawBlock> = self
            .request(RpcMethod::GetBlockByNumber, json!(["pending", true]))
            .await?;
        Ok(raw.map(PendingBlock::from).unwrap_or_default())
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, RpcError> {
        let raw: Vec<RawLog> = self
            .request(RpcMethod::GetLogs, json!([filter.to_json()]))
            .await?;
        Ok(raw.into_iter().map(LogEntry::from).collect())
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.request(RpcMethod::Accounts, json!([])).await
    }
}
