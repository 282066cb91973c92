//! # JSON-RPC Envelope
//!
//! Request/response framing for the Ethereum JSON-RPC methods the client
//! consumes. Only the methods listed here are ever sent.
//!
//! | Method                     | Used for                                  |
//! |----------------------------|-------------------------------------------|
//! | `eth_blockNumber`          | chain head for the reorg window           |
//! | `eth_call`                 | pointer queries, existence, nonce probes  |
//! | `eth_estimateGas`          | resource budget before broadcast          |
//! | `eth_sendTransaction`      | broadcast (node signs)                    |
//! | `eth_getBlockByNumber`     | pending block for mempool scans           |
//! | `eth_getLogs`              | log window scans                          |
//! | `eth_accounts`             | default sender discovery                  |

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RPC Method Enumeration
// ---------------------------------------------------------------------------

/// JSON-RPC methods issued by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcMethod {
    #[serde(rename = "eth_blockNumber")]
    BlockNumber,
    #[serde(rename = "eth_call")]
    Call,
    #[serde(rename = "eth_estimateGas")]
    EstimateGas,
    #[serde(rename = "eth_sendTransaction")]
    SendTransaction,
    #[serde(rename = "eth_getBlockByNumber")]
    GetBlockByNumber,
    #[serde(rename = "eth_getLogs")]
    GetLogs,
    #[serde(rename = "eth_accounts")]
    Accounts,
}

impl RpcMethod {
    /// The method name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockNumber => "eth_blockNumber",
            Self::Call => "eth_call",
            Self::EstimateGas => "eth_estimateGas",
            Self::SendTransaction => "eth_sendTransaction",
            Self::GetBlockByNumber => "eth_getBlockByNumber",
            Self::GetLogs => "eth_getLogs",
            Self::Accounts => "eth_accounts",
        }
    }
}

// ---------------------------------------------------------------------------
// RPC Request / Response
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version. Always "2.0".
    pub jsonrpc: String,
    /// Request identifier, echoed back in the response.
    pub id: serde_json::Value,
    /// The method to invoke.
    pub method: RpcMethod,
    /// Positional parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RpcRequest {
    /// Creates a new request with the given method and parameters.
    pub fn new(id: serde_json::Value, method: RpcMethod, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method,
            params,
        }
    }
}

/// A JSON-RPC 2.0 response.
///
/// A conforming node sets exactly one of `result` or `error`. A `null`
/// result (for example no pending block) deserializes as `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// The request ID this response corresponds to.
    pub id: serde_json::Value,
    /// The result, if the call succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The error, if the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Creates a successful response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    pub fn error(id: serde_json::Value, error: RpcErrorObject) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// RPC Errors
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 error object.
///
/// Standard codes: `-32700` parse error, `-32600` invalid request, `-32601`
/// method not found, `-32602` invalid params, `-32603` internal error.
/// Nodes report reverted calls and gas estimation failures in the
/// `-32000..=-32099` server range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error data (revert payloads and the like).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcErrorObject {
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_ERROR: i64 = -32000;

    /// An error object with no data payload.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_request_serialization() {
        let req = RpcRequest::new(
            serde_json::json!(1),
            RpcMethod::BlockNumber,
            serde_json::json!([]),
        );

        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"eth_blockNumber\""));
        assert!(json.contains("\"2.0\""));

        let recovered: RpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered.method, RpcMethod::BlockNumber);
    }

    #[test]
    fn null_result_reads_as_none() {
        let resp: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(resp.result.is_none());
        assert!(resp.error.is_none());
    }

    #[test]
    fn rpc_error_response() {
        let resp = RpcResponse::error(
            serde_json::json!(1),
            RpcErrorObject::new(RpcErrorObject::SERVER_ERROR, "execution reverted"),
        );

        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().code, -32000);
    }

    #[test]
    fn wire_names_match_serde_names() {
        let methods = [
            RpcMethod::BlockNumber,
            RpcMethod::Call,
            RpcMethod::EstimateGas,
            RpcMethod::SendTransaction,
            RpcMethod::GetBlockByNumber,
            RpcMethod::GetLogs,
            RpcMethod::Accounts,
        ];

        for method in methods {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
            let recovered: RpcMethod = serde_json::from_str(&json).unwrap();
            assert_eq!(method, recovered);
        }
    }
}
