//! # Revisioned BlobStore Contract
//!
//! Typed access to the administration surface of the revisioned contract.
//! Creating a blob goes through the nonce probe in
//! [`Submitter`]; everything after creation is an owner operation on the
//! 20-byte blob id, broadcast through [`Submitter::send_call`].
//!
//! ## Permission model
//!
//! The contract enforces who may do what; this wrapper only encodes calls.
//! A refused operation surfaces as [`SubmitError::Estimation`] because the
//! node rejects the call while estimating it.
//!
//! | Operation                         | Caller    | Requires                         |
//! |-----------------------------------|-----------|----------------------------------|
//! | `create_new_revision`             | owner     | updatable                        |
//! | `update_latest_revision`, `restart` | owner   | updatable, revisions not enforced |
//! | `retract_latest_revision`         | owner     | as above, more than one revision |
//! | `retract`                         | owner     | retractable                      |
//! | `transfer_enable` / `_disable`    | recipient | transferable                     |
//! | `transfer`, `disown`              | owner     | transferable                     |
//!
//! Getters run against the pending view so a freshly created blob is
//! visible before it is mined.

use std::sync::Arc;

use alloy_primitives::FixedBytes;
use blobstore_protocol::abi::{self, AbiError, BlobStore, SolCall};
use blobstore_protocol::config::{SubmitterConfig, FLAGS_PREFIX_SIZE};
use blobstore_protocol::rpc::{CallRequest, LedgerRpc, RpcError};
use blobstore_protocol::submit::{StorePayload, Submission, Submitter};
use blobstore_protocol::types::{Address, BlockTag, Bytes, TxHash, U256};
use blobstore_protocol::version::ProtocolVersion;
use blobstore_protocol::{BlobFlags, Identifier, SubmitError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of revisioned-contract operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Estimation, broadcast, or creation failed.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// A getter could not reach the node.
    #[error("transport: {0}")]
    Transport(#[from] RpcError),

    /// A getter returned bytes that do not decode.
    #[error("malformed response: {0}")]
    Malformed(#[from] AbiError),

    /// The blob has no such revision.
    #[error("blob {identifier} has no revision {revision}")]
    NoSuchRevision {
        identifier: Identifier,
        revision: u64,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Snapshot of a blob's on-chain record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub flags: BlobFlags,
    /// `None` once the blob is anonymous, disowned or retracted.
    pub owner: Option<Address>,
    /// Block number of each revision, oldest first.
    pub revision_block_numbers: Vec<u64>,
}

impl BlobInfo {
    pub fn revision_count(&self) -> u64 {
        self.revision_block_numbers.len() as u64
    }
}

/// A broadcast revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionReceipt {
    pub tx_hash: TxHash,
    /// Index of the revision the transaction writes, as seen in the
    /// pending view right after the broadcast.
    pub revision: u64,
}

// ---------------------------------------------------------------------------
// BlobStoreContract
// ---------------------------------------------------------------------------

/// Handle on one deployment of the revisioned contract.
pub struct BlobStoreContract<R: LedgerRpc + ?Sized> {
    rpc: Arc<R>,
    submitter: Submitter<R>,
}

impl<R: LedgerRpc + ?Sized> BlobStoreContract<R> {
    pub fn new(rpc: Arc<R>, contract: Address) -> Self {
        Self::with_config(rpc, contract, SubmitterConfig::default())
    }

    /// The canonical deployment.
    pub fn canonical(rpc: Arc<R>) -> Self {
        Self::new(rpc, ProtocolVersion::BlobStore.default_address())
    }

    pub fn with_config(rpc: Arc<R>, contract: Address, config: SubmitterConfig) -> Self {
        Self {
            submitter: Submitter::new(
                Arc::clone(&rpc),
                contract,
                ProtocolVersion::BlobStore,
                config,
            ),
            rpc,
        }
    }

    pub fn address(&self) -> Address {
        self.submitter.contract()
    }

    /// Creates a blob under `flags`. The sender becomes its owner unless
    /// `flags.anonymous` is set.
    pub async fn create(&self, blob: &[u8], flags: BlobFlags) -> Result<Submission, AdminError> {
        let payload = StorePayload::new(blob).with_flags(flags);
        Ok(self.submitter.submit(payload).await?)
    }

    // -- Revisions ----------------------------------------------------------

    /// Appends `blob` as a new revision.
    pub async fn create_new_revision(
        &self,
        id: &Identifier,
        blob: &[u8],
    ) -> Result<RevisionReceipt, AdminError> {
        let call = BlobStore::createNewRevisionCall {
            blobId: id.short_id(),
            contents: Bytes::copy_from_slice(blob),
        };
        let tx_hash = self.send(id, call).await?;
        let revision = self.revision_count(id).await?.saturating_sub(1);
        info!(%id, revision, %tx_hash, "revision created");
        Ok(RevisionReceipt { tx_hash, revision })
    }

    /// Replaces the contents of the latest revision.
    pub async fn update_latest_revision(
        &self,
        id: &Identifier,
        blob: &[u8],
    ) -> Result<TxHash, AdminError> {
        let call = BlobStore::updateLatestRevisionCall {
            blobId: id.short_id(),
            contents: Bytes::copy_from_slice(blob),
        };
        self.send(id, call).await
    }

    pub async fn retract_latest_revision(&self, id: &Identifier) -> Result<TxHash, AdminError> {
        let call = BlobStore::retractLatestRevisionCall {
            blobId: id.short_id(),
        };
        self.send(id, call).await
    }

    /// Drops every revision and starts over at revision 0 with `blob`.
    pub async fn restart(&self, id: &Identifier, blob: &[u8]) -> Result<TxHash, AdminError> {
        let call = BlobStore::restartCall {
            blobId: id.short_id(),
            contents: Bytes::copy_from_slice(blob),
        };
        self.send(id, call).await
    }

    /// Removes the blob entirely. Its id is never reusable.
    pub async fn retract(&self, id: &Identifier) -> Result<TxHash, AdminError> {
        self.send(id, BlobStore::retractCall { blobId: id.short_id() }).await
    }

    // -- Ownership ----------------------------------------------------------

    /// Sent by the prospective recipient to accept a future transfer.
    pub async fn transfer_enable(&self, id: &Identifier) -> Result<TxHash, AdminError> {
        self.send(id, BlobStore::transferEnableCall { blobId: id.short_id() }).await
    }

    pub async fn transfer_disable(&self, id: &Identifier) -> Result<TxHash, AdminError> {
        self.send(id, BlobStore::transferDisableCall { blobId: id.short_id() }).await
    }

    /// Hands ownership to `recipient`, who must have enabled the transfer.
    pub async fn transfer(
        &self,
        id: &Identifier,
        recipient: Address,
    ) -> Result<TxHash, AdminError> {
        let call = BlobStore::transferCall {
            blobId: id.short_id(),
            recipient,
        };
        self.send(id, call).await
    }

    pub async fn disown(&self, id: &Identifier) -> Result<TxHash, AdminError> {
        self.send(id, BlobStore::disownCall { blobId: id.short_id() }).await
    }

    // -- Flags (one-way) ----------------------------------------------------

    pub async fn set_not_updatable(&self, id: &Identifier) -> Result<TxHash, AdminError> {
        self.send(id, BlobStore::setNotUpdatableCall { blobId: id.short_id() }).await
    }

    pub async fn set_enforce_revisions(&self, id: &Identifier) -> Result<TxHash, AdminError> {
        self.send(id, BlobStore::setEnforceRevisionsCall { blobId: id.short_id() }).await
    }

    pub async fn set_not_retractable(&self, id: &Identifier) -> Result<TxHash, AdminError> {
        self.send(id, BlobStore::setNotRetractableCall { blobId: id.short_id() }).await
    }

    pub async fn set_not_transferable(&self, id: &Identifier) -> Result<TxHash, AdminError> {
        self.send(id, BlobStore::setNotTransferableCall { blobId: id.short_id() }).await
    }

    // -- Getters ------------------------------------------------------------

    /// The 12-byte prefix that distinguishes this deployment's ids.
    pub async fn contract_id(&self) -> Result<[u8; 12], AdminError> {
        Ok(self.query(BlobStore::getContractIdCall {}).await?.contractId.0)
    }

    pub async fn exists(&self, id: &Identifier) -> Result<bool, AdminError> {
        let call = BlobStore::getExistsCall { blobId: id.short_id() };
        Ok(self.query(call).await?.exists)
    }

    pub async fn info(&self, id: &Identifier) -> Result<BlobInfo, AdminError> {
        let info = self.query(BlobStore::getInfoCall { blobId: id.short_id() }).await?;
        Ok(BlobInfo {
            flags: flags_from_prefix(info.flags),
            owner: owner_or_none(info.owner),
            revision_block_numbers: abi::to_u64s(&info.blockNumbers)?,
        })
    }

    pub async fn flags(&self, id: &Identifier) -> Result<BlobFlags, AdminError> {
        let call = BlobStore::getFlagsCall { blobId: id.short_id() };
        Ok(flags_from_prefix(self.query(call).await?.flags))
    }

    pub async fn updatable(&self, id: &Identifier) -> Result<bool, AdminError> {
        let call = BlobStore::getUpdatableCall { blobId: id.short_id() };
        Ok(self.query(call).await?.updatable)
    }

    pub async fn enforce_revisions(&self, id: &Identifier) -> Result<bool, AdminError> {
        let call = BlobStore::getEnforceRevisionsCall { blobId: id.short_id() };
        Ok(self.query(call).await?.enforceRevisions)
    }

    pub async fn retractable(&self, id: &Identifier) -> Result<bool, AdminError> {
        let call = BlobStore::getRetractableCall { blobId: id.short_id() };
        Ok(self.query(call).await?.retractable)
    }

    pub async fn transferable(&self, id: &Identifier) -> Result<bool, AdminError> {
        let call = BlobStore::getTransferableCall { blobId: id.short_id() };
        Ok(self.query(call).await?.transferable)
    }

    pub async fn owner(&self, id: &Identifier) -> Result<Option<Address>, AdminError> {
        let call = BlobStore::getOwnerCall { blobId: id.short_id() };
        Ok(owner_or_none(self.query(call).await?.owner))
    }

    pub async fn revision_count(&self, id: &Identifier) -> Result<u64, AdminError> {
        let call = BlobStore::getRevisionCountCall { blobId: id.short_id() };
        Ok(abi::to_u64(self.query(call).await?.revisionCount)?)
    }

    /// Block number revision `revision` was written in. Revisions at or past
    /// the count are reported as missing rather than as block 0.
    pub async fn revision_block_number(
        &self,
        id: &Identifier,
        revision: u64,
    ) -> Result<u64, AdminError> {
        let call = BlobStore::getRevisionBlockNumberCall {
            blobId: id.short_id(),
            revisionId: U256::from(revision),
        };
        match abi::to_u64(self.query(call).await?.blockNumber)? {
            0 => Err(AdminError::NoSuchRevision {
                identifier: *id,
                revision,
            }),
            block => Ok(block),
        }
    }

    pub async fn all_revision_block_numbers(
        &self,
        id: &Identifier,
    ) -> Result<Vec<u64>, AdminError> {
        let call = BlobStore::getAllRevisionBlockNumbersCall { blobId: id.short_id() };
        Ok(abi::to_u64s(&self.query(call).await?.blockNumbers)?)
    }

    // -- Plumbing -----------------------------------------------------------

    async fn send<C: SolCall>(&self, id: &Identifier, call: C) -> Result<TxHash, AdminError> {
        let (tx_hash, _) = self.submitter.send_call(call.abi_encode()).await?;
        info!(%id, %tx_hash, operation = C::SIGNATURE, "owner operation broadcast");
        Ok(tx_hash)
    }

    /// Runs a getter against the pending view.
    async fn query<C: SolCall>(&self, call: C) -> Result<C::Return, AdminError> {
        let request = CallRequest::new(self.address(), call.abi_encode());
        let response = self.rpc.call(&request, BlockTag::Pending).await?;
        Ok(C::abi_decode_returns(&response, true).map_err(AbiError::from)?)
    }
}

/// Flags travel as a `bytes4` holding the bits in its last byte.
fn flags_from_prefix(prefix: FixedBytes<FLAGS_PREFIX_SIZE>) -> BlobFlags {
    BlobFlags::from_bits(prefix[FLAGS_PREFIX_SIZE - 1])
}

fn owner_or_none(owner: Address) -> Option<Address> {
    (!owner.is_zero()).then_some(owner)
}
