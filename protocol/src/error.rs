//! Error types for storing and retrieving blobs.
//!
//! Each pipeline returns its own enum. Transport failures are wrapped, never
//! retried here, and stay distinguishable from protocol outcomes such as a
//! blob that does not exist or a broadcast the node never surfaced.

use thiserror::Error;

use crate::abi::AbiError;
use crate::identifier::Identifier;
use crate::rpc::RpcError;
use crate::types::TxHash;

/// Failures while obtaining an identifier for a new blob.
#[derive(Debug, Error)]
pub enum IdentifierError {
    /// Every nonce candidate collided with an existing blob.
    #[error("no free identifier after {attempts} nonce probes")]
    ProbeExhausted {
        /// Simulated create calls issued.
        attempts: u32,
    },

    /// A simulated create call failed in transport.
    #[error("nonce probe failed: {0}")]
    Transport(#[from] RpcError),

    /// A simulated create returned something other than an id.
    #[error("malformed create response: {0}")]
    Malformed(#[from] AbiError),
}

/// Errors from [`Submitter`](crate::submit::Submitter).
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The identifier could not be derived or probed.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// The node refused to estimate the store call. Usually a revert: the
    /// blob already exists or the payload is too large for a block.
    #[error("cost estimation failed: {0}")]
    Estimation(#[source] RpcError),

    /// The broadcast or the confirmation query failed in transport.
    #[error("transport error: {0}")]
    Transport(#[source] RpcError),

    /// The node accepted the transaction but the blob is not visible in the
    /// pending view.
    #[error("broadcast {tx_hash} accepted but {identifier} is not observable")]
    BroadcastNotObserved {
        /// Identifier the blob was submitted under.
        identifier: Identifier,
        /// Hash the node returned for the broadcast.
        tx_hash: TxHash,
    },

    /// The existence query returned something other than a bool word.
    #[error("malformed confirmation response: {0}")]
    Malformed(#[from] AbiError),
}

/// Errors from [`Retriever`](crate::retrieve::Retriever).
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// An RPC round trip failed.
    #[error("transport error: {0}")]
    Transport(#[from] RpcError),

    /// The identifier (or revision) is unknown to both the chain and the
    /// mempool.
    #[error("blob {identifier} not found{}", at_revision(.revision))]
    NotFound {
        /// The identifier looked up.
        identifier: Identifier,
        /// The revision looked up, for revisioned contracts.
        revision: Option<u64>,
    },

    /// Every attempt ended in a stale read.
    #[error("reconciliation gave up after {attempts} stale reads")]
    ReconciliationTimeout {
        /// Attempts made.
        attempts: u32,
    },

    /// A revision was requested from a contract without revisions.
    #[error("this contract version does not support revisions")]
    RevisionsUnsupported,

    /// A pointer or log payload failed to decode.
    #[error("malformed payload: {0}")]
    Malformed(#[from] AbiError),

    /// Shutdown was signalled while the lookup was in flight.
    #[error("retrieval cancelled")]
    Cancelled,

    /// The configured deadline elapsed.
    #[error("retrieval deadline exceeded")]
    DeadlineExceeded,
}

fn at_revision(revision: &Option<u64>) -> String {
    revision.map(|r| format!(" at revision {r}")).unwrap_or_default()
}

impl RetrieveError {
    /// Whether this is a definite "does not exist" answer rather than a
    /// failure to find out.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
