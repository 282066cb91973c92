//! # Client Configuration & Constants
//!
//! Every magic number the client relies on lives here: default endpoints,
//! deployed contract addresses, ABI offsets and the reorg safety margins.
//! The deployed contracts are immutable, so most of these values are facts
//! about the chain rather than tuning knobs. The structs at the bottom are
//! the knobs.

use std::env;
use std::time::Duration;

use alloy_primitives::{address, b256};
use serde::{Deserialize, Serialize};

use crate::types::{Address, B256};

// ---------------------------------------------------------------------------
// Endpoints & Deployments
// ---------------------------------------------------------------------------

/// Default JSON-RPC endpoint of a locally running node.
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// Deployment of the log-backed contract (`storeBlob` emits the bytes as an
/// anonymous event whose only topic is the blob hash).
pub const BLOB_LOG_ADDRESS: Address = address!("21a54ad0db3ab86bc3bd303766ece237d7c30ae4");

/// Deployment of the state-backed contract (bytes live in contract storage).
pub const BLOB_STATE_ADDRESS: Address = address!("67f4bd6ca9cff2d7358ffd2d9bf4553b522b9e88");

/// Deployment of the revisioned BlobStore contract.
pub const BLOB_STORE_ADDRESS: Address = address!("e70e90fdd2b9d3e27bdd56ef249ee1d408f40be2");

/// Topic 0 of `Store(bytes20,uint256,bytes)`, emitted by the revisioned
/// contract for every stored revision. Topic 1 is the padded blob id, topic
/// 2 the revision index.
pub const BLOB_STORE_REVISION_EVENT: B256 =
    b256!("fd5eeef8919c5473de9558a49bf3a5b19bcf59ec0d36e420586d7c3bbaf17d01");

// ---------------------------------------------------------------------------
// Encoding Layout
// ---------------------------------------------------------------------------

/// Width of an ABI word.
pub const WORD_SIZE: usize = 32;

/// Function selector width at the start of call data.
pub const SELECTOR_SIZE: usize = 4;

/// Identifier width. Every scheme produces a full word.
pub const IDENTIFIER_SIZE: usize = 32;

/// Significant bytes of a revisioned-contract blob id. The remaining
/// 12 bytes of the word are reserved and always zero on the client side.
pub const BLOB_STORE_ID_SIZE: usize = 20;

/// Width of the packed flag prefix in front of the creation nonce.
pub const FLAGS_PREFIX_SIZE: usize = 4;

/// Offset of the length word inside event data carrying a single `bytes`
/// argument: the first word is the head offset, the second the length.
pub const LOG_LENGTH_OFFSET: usize = WORD_SIZE;

/// Offset of the length word in `storeBlob(bytes)` call data.
pub const STORE_CALL_LENGTH_OFFSET: usize = SELECTOR_SIZE + WORD_SIZE;

/// Offset of the length word in `createWithNonce(bytes32,bytes)` call data.
pub const CREATE_CALL_LENGTH_OFFSET: usize = SELECTOR_SIZE + 2 * WORD_SIZE;

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Blocks behind the head that the log contract re-scans when a pointer is
/// recent. Roughly an hour of blocks; deliberately conservative.
pub const BLOB_LOG_REORG_MARGIN: u64 = 200;

/// Re-scan margin for the revisioned contract, which also scans the
/// pending block and can afford a tighter window.
pub const BLOB_STORE_REORG_MARGIN: u64 = 20;

/// Stale-read restarts allowed before a lookup gives up.
pub const DEFAULT_MAX_RECONCILE_ATTEMPTS: u32 = 5;

/// Simulated create calls tried before the nonce probe fails hard. A single
/// probe succeeds unless Keccak-256 collides, so this bound is generous.
pub const DEFAULT_MAX_NONCE_PROBES: u32 = 16;

/// HTTP request timeout for a single JSON-RPC round trip.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Overrides [`ClientConfig::rpc_url`].
pub const ENV_RPC_URL: &str = "BLOBSTORE_RPC_URL";

/// Overrides [`ClientConfig::from`].
pub const ENV_FROM: &str = "BLOBSTORE_FROM";

/// Overrides [`ClientConfig::request_timeout_ms`].
pub const ENV_RPC_TIMEOUT_MS: &str = "BLOBSTORE_RPC_TIMEOUT_MS";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Configuration could not be assembled.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that does not parse.
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv {
        /// The variable name.
        var: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The RPC endpoint is not a valid URL.
    #[error("invalid rpc url {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The HTTP client could not be built (TLS backend initialisation).
    #[error("http client: {0}")]
    HttpClient(String),
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Connection settings for [`HttpLedgerClient`](crate::rpc::HttpLedgerClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,

    /// Account the node signs with. When `None` the client adopts the
    /// node's first unlocked account on connect.
    pub from: Option<Address>,

    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            from: None,
            request_timeout_ms: DEFAULT_RPC_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ClientConfig {
    /// Builds a config from defaults overlaid with `BLOBSTORE_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup, so
    /// tests do not have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_RPC_URL) {
            config.rpc_url = url;
        }
        if let Some(from) = lookup(ENV_FROM) {
            let address = from.parse::<Address>().map_err(|e| ConfigError::InvalidEnv {
                var: ENV_FROM,
                reason: e.to_string(),
            })?;
            config.from = Some(address);
        }
        if let Some(timeout) = lookup(ENV_RPC_TIMEOUT_MS) {
            config.request_timeout_ms =
                timeout.parse::<u64>().map_err(|e| ConfigError::InvalidEnv {
                    var: ENV_RPC_TIMEOUT_MS,
                    reason: e.to_string(),
                })?;
        }

        Ok(config)
    }

    /// The request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// RetrieverConfig
// ---------------------------------------------------------------------------

/// Bounds on the reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Full passes through resolve → scan before a lookup fails with
    /// `ReconciliationTimeout`. Must be at least 1.
    pub max_attempts: u32,

    /// Optional wall-clock budget for one lookup, in milliseconds.
    pub deadline_ms: Option<u64>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RECONCILE_ATTEMPTS,
            deadline_ms: None,
        }
    }
}

impl RetrieverConfig {
    /// The deadline as a [`Duration`], if one is configured.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// SubmitterConfig
// ---------------------------------------------------------------------------

/// Knobs for the submission pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitterConfig {
    /// Upper bound on simulated create calls during the nonce probe.
    pub max_nonce_probes: u32,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            max_nonce_probes: DEFAULT_MAX_NONCE_PROBES,
        }
    }
}
