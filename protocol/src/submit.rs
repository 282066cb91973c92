//! # Submission Pipeline
//!
//! ```text
//! derive id ──► build call ──► estimate ──► broadcast ──► confirm (pending)
//!     │
//!     └─ revisioned contract: probe nonce candidates until a simulated
//!        create returns an id
//! ```
//!
//! The confirmation step asks the contract, against the pending view,
//! whether the blob now exists. A node that accepts a transaction and then
//! silently drops it is reported as
//! [`SubmitError::BroadcastNotObserved`], not as success.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::SubmitterConfig;
use crate::error::{IdentifierError, SubmitError};
use crate::identifier::{derive_identifier, BlobFlags, Identifier, NonceCandidates};
use crate::rpc::{CallRequest, LedgerRpc};
use crate::types::{Address, BlockTag, TxHash, B256};
use crate::version::ProtocolVersion;

/// A blob to store, with the flags it is created under. Flags only matter
/// to the revisioned contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePayload {
    pub blob: Vec<u8>,
    pub flags: BlobFlags,
}

impl StorePayload {
    /// A payload with default (all-off) flags.
    pub fn new(blob: impl Into<Vec<u8>>) -> Self {
        Self {
            blob: blob.into(),
            flags: BlobFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: BlobFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Identifier the blob can be retrieved under.
    pub identifier: Identifier,
    /// Hash of the broadcast transaction.
    pub tx_hash: TxHash,
    /// Gas budget attached to the transaction.
    pub cost: u64,
}

/// Stores blobs through one contract deployment.
pub struct Submitter<R: LedgerRpc + ?Sized> {
    rpc: Arc<R>,
    contract: Address,
    version: ProtocolVersion,
    config: SubmitterConfig,
}

impl<R: LedgerRpc + ?Sized> Submitter<R> {
    pub fn new(
        rpc: Arc<R>,
        contract: Address,
        version: ProtocolVersion,
        config: SubmitterConfig,
    ) -> Self {
        Self {
            rpc,
            contract,
            version,
            config,
        }
    }

    /// The contract this submitter targets.
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Stores `payload` and returns its identifier once the node reports the
    /// blob as pending.
    ///
    /// Storing the same blob twice yields the same identifier: the contract
    /// answers the simulated create with the id it already holds for that
    /// content, and that answer is what gets returned.
    pub async fn submit(&self, payload: StorePayload) -> Result<Submission, SubmitError> {
        let (identifier, salt) = self.resolve_identifier(&payload).await?;
        let call = CallRequest::new(self.contract, self.version.store_call(&payload.blob, salt));

        let cost = self
            .rpc
            .estimate_cost(&call, BlockTag::Pending)
            .await
            .map_err(SubmitError::Estimation)?;
        let call = call.with_gas(cost);

        let tx_hash = self
            .rpc
            .send_transaction(&call)
            .await
            .map_err(SubmitError::Transport)?;
        info!(
            %identifier,
            %tx_hash,
            cost,
            bytes = payload.blob.len(),
            "blob broadcast"
        );

        if !self.blob_exists(&identifier).await? {
            return Err(SubmitError::BroadcastNotObserved {
                identifier,
                tx_hash,
            });
        }

        Ok(Submission {
            identifier,
            tx_hash,
            cost,
        })
    }

    /// Gas the store call for `blob` would consume, without broadcasting.
    pub async fn estimate_store_cost(&self, blob: &[u8]) -> Result<u64, SubmitError> {
        let payload = StorePayload::new(blob);
        let (_, salt) = self.resolve_identifier(&payload).await?;
        let call = CallRequest::new(self.contract, self.version.store_call(blob, salt));
        self.rpc
            .estimate_cost(&call, BlockTag::Pending)
            .await
            .map_err(SubmitError::Estimation)
    }

    /// Whether `identifier` exists in the pending view.
    pub async fn blob_exists(&self, identifier: &Identifier) -> Result<bool, SubmitError> {
        let call = CallRequest::new(self.contract, self.version.exists_call(identifier));
        let response = self
            .rpc
            .call(&call, BlockTag::Pending)
            .await
            .map_err(SubmitError::Transport)?;
        Ok(self.version.decode_exists(&response)?)
    }

    /// Estimates and broadcasts arbitrary call data to the contract. Owner
    /// operations on existing blobs go through here.
    pub async fn send_call(&self, data: Vec<u8>) -> Result<(TxHash, u64), SubmitError> {
        let call = CallRequest::new(self.contract, data);
        let cost = self
            .rpc
            .estimate_cost(&call, BlockTag::Pending)
            .await
            .map_err(SubmitError::Estimation)?;
        let tx_hash = self
            .rpc
            .send_transaction(&call.with_gas(cost))
            .await
            .map_err(SubmitError::Transport)?;
        debug!(%tx_hash, cost, "call broadcast");
        Ok((tx_hash, cost))
    }

    /// Identifier and creation salt for `payload`.
    async fn resolve_identifier(
        &self,
        payload: &StorePayload,
    ) -> Result<(Identifier, B256), IdentifierError> {
        match derive_identifier(&payload.blob, self.version.scheme()) {
            Some(identifier) => Ok((identifier, B256::ZERO)),
            None => self.probe_identifier(&payload.blob, payload.flags).await,
        }
    }

    /// Simulates create calls over the nonce candidates until the contract
    /// hands back an id.
    pub async fn probe_identifier(
        &self,
        blob: &[u8],
        flags: BlobFlags,
    ) -> Result<(Identifier, B256), IdentifierError> {
        let mut attempts = 0;
        for salt in NonceCandidates::new(blob, flags, self.config.max_nonce_probes) {
            attempts += 1;
            let call = CallRequest::new(self.contract, self.version.store_call(blob, salt));
            let response = self.rpc.call(&call, BlockTag::Pending).await?;

            if let Some(identifier) = self.version.decode_created_id(&response)? {
                debug!(%identifier, attempts, "nonce probe accepted");
                return Ok((identifier, salt));
            }
            debug!(attempts, "nonce candidate collided");
        }
        Err(IdentifierError::ProbeExhausted { attempts })
    }
}
