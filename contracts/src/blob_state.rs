//! # State-Storage Contract
//!
//! The earliest deployment kept each blob in contract storage instead of
//! emitting it as an event. Reads are a single `getBlob` call, so there is
//! no pointer, no log window and nothing to reconcile: the pending view is
//! authoritative.
//!
//! Storing shares `storeBlob(bytes)` and `blobExists(bytes32)` with the log
//! contract, so submission reuses the log contract's content-hash pipeline
//! pointed at this address.

use std::sync::Arc;

use blobstore_protocol::abi::{AbiError, BlobState, SolCall};
use blobstore_protocol::config::{SubmitterConfig, BLOB_STATE_ADDRESS};
use blobstore_protocol::rpc::{CallRequest, LedgerRpc, RpcError};
use blobstore_protocol::submit::{StorePayload, Submission, Submitter};
use blobstore_protocol::types::{Address, BlockTag};
use blobstore_protocol::version::ProtocolVersion;
use blobstore_protocol::{Identifier, SubmitError};
use thiserror::Error;
use tracing::debug;

/// Failures of state-contract reads and writes.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("transport: {0}")]
    Transport(#[from] RpcError),

    #[error("malformed response: {0}")]
    Malformed(#[from] AbiError),

    #[error("blob {0} not found")]
    NotFound(Identifier),
}

/// Handle on one deployment of the state-storage contract.
pub struct BlobStateContract<R: LedgerRpc + ?Sized> {
    rpc: Arc<R>,
    submitter: Submitter<R>,
}

impl<R: LedgerRpc + ?Sized> BlobStateContract<R> {
    pub fn new(rpc: Arc<R>, contract: Address) -> Self {
        Self {
            // storeBlob and blobExists have the same signatures, hence the
            // same selectors, on both hash-keyed contracts.
            submitter: Submitter::new(
                Arc::clone(&rpc),
                contract,
                ProtocolVersion::BlobLog,
                SubmitterConfig::default(),
            ),
            rpc,
        }
    }

    /// The canonical deployment.
    pub fn canonical(rpc: Arc<R>) -> Self {
        Self::new(rpc, BLOB_STATE_ADDRESS)
    }

    pub fn address(&self) -> Address {
        self.submitter.contract()
    }

    /// Stores `blob` and confirms it is visible in the pending view.
    pub async fn store(&self, blob: &[u8]) -> Result<Submission, StateError> {
        Ok(self.submitter.submit(StorePayload::new(blob)).await?)
    }

    pub async fn exists(&self, id: &Identifier) -> Result<bool, StateError> {
        Ok(self.submitter.blob_exists(id).await?)
    }

    /// Reads the blob back out of contract storage.
    ///
    /// The contract answers an unknown id with empty bytes, which is also
    /// what a stored empty blob looks like, so an empty answer is checked
    /// against `blobExists`.
    pub async fn get(&self, id: &Identifier) -> Result<Vec<u8>, StateError> {
        let data = BlobState::getBlobCall { hash: id.as_word() }.abi_encode();
        let call = CallRequest::new(self.address(), data);
        let response = self.rpc.call(&call, BlockTag::Pending).await?;
        let blob = BlobState::getBlobCall::abi_decode_returns(&response, true)
            .map_err(AbiError::from)?
            .blob
            .to_vec();

        if blob.is_empty() && !self.exists(id).await? {
            return Err(StateError::NotFound(*id));
        }
        debug!(%id, bytes = blob.len(), "blob read from storage");
        Ok(blob)
    }
}
