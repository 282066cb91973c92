//! # BlobClient
//!
//! One handle per contract deployment, bundling a [`Submitter`] and a
//! [`Retriever`] over the same caller-owned node connection.
//!
//! ```no_run
//! use blobstore_protocol::client::BlobClient;
//! use blobstore_protocol::config::ClientConfig;
//! use blobstore_protocol::version::ProtocolVersion;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let client = BlobClient::connect(&config, ProtocolVersion::BlobLog).await?;
//!
//! let stored = client.store(b"hello").await?;
//! let bytes = client.retrieve(&stored.identifier, None).await?;
//! assert_eq!(bytes, b"hello");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::{ClientConfig, RetrieverConfig, SubmitterConfig};
use crate::error::{RetrieveError, SubmitError};
use crate::identifier::{derive_identifier, BlobFlags, Identifier};
use crate::retrieve::Retriever;
use crate::rpc::{ConnectError, HttpLedgerClient, LedgerRpc};
use crate::submit::{StorePayload, Submission, Submitter};
use crate::types::Address;
use crate::version::ProtocolVersion;

/// Stores and retrieves blobs through one contract deployment.
pub struct BlobClient<R: LedgerRpc + ?Sized> {
    rpc: Arc<R>,
    version: ProtocolVersion,
    submitter: Submitter<R>,
    retriever: Retriever<R>,
}

impl<R: LedgerRpc + ?Sized> BlobClient<R> {
    /// A client for the contract at `contract` with default limits.
    pub fn new(rpc: Arc<R>, version: ProtocolVersion, contract: Address) -> Self {
        Self::with_configs(
            rpc,
            version,
            contract,
            SubmitterConfig::default(),
            RetrieverConfig::default(),
        )
    }

    /// A client for the canonical deployment of `version`.
    pub fn for_version(rpc: Arc<R>, version: ProtocolVersion) -> Self {
        Self::new(rpc, version, version.default_address())
    }

    pub fn with_configs(
        rpc: Arc<R>,
        version: ProtocolVersion,
        contract: Address,
        submit: SubmitterConfig,
        retrieve: RetrieverConfig,
    ) -> Self {
        Self {
            submitter: Submitter::new(Arc::clone(&rpc), contract, version, submit),
            retriever: Retriever::new(Arc::clone(&rpc), contract, version, retrieve),
            rpc,
            version,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn contract(&self) -> Address {
        self.submitter.contract()
    }

    /// The node connection.
    pub fn rpc(&self) -> &Arc<R> {
        &self.rpc
    }

    pub fn submitter(&self) -> &Submitter<R> {
        &self.submitter
    }

    pub fn retriever(&self) -> &Retriever<R> {
        &self.retriever
    }

    /// The identifier `blob` would be stored under, when it can be known
    /// without asking the chain.
    pub fn derive(&self, blob: &[u8]) -> Option<Identifier> {
        derive_identifier(blob, self.version.scheme())
    }

    /// Stores `blob` with default flags.
    pub async fn store(&self, blob: &[u8]) -> Result<Submission, SubmitError> {
        self.submitter.submit(StorePayload::new(blob)).await
    }

    /// Stores `blob` with explicit flags (revisioned contract only).
    pub async fn store_with_flags(
        &self,
        blob: &[u8],
        flags: BlobFlags,
    ) -> Result<Submission, SubmitError> {
        self.submitter
            .submit(StorePayload::new(blob).with_flags(flags))
            .await
    }

    pub async fn retrieve(
        &self,
        identifier: &Identifier,
        revision: Option<u64>,
    ) -> Result<Vec<u8>, RetrieveError> {
        self.retriever.retrieve(identifier, revision).await
    }

    pub async fn retrieve_until(
        &self,
        identifier: &Identifier,
        revision: Option<u64>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<u8>, RetrieveError> {
        self.retriever
            .retrieve_until(identifier, revision, shutdown)
            .await
    }

    /// Whether `identifier` exists in the pending view.
    pub async fn exists(&self, identifier: &Identifier) -> Result<bool, SubmitError> {
        self.submitter.blob_exists(identifier).await
    }

    /// Gas a store of `blob` would cost.
    pub async fn estimate(&self, blob: &[u8]) -> Result<u64, SubmitError> {
        self.submitter.estimate_store_cost(blob).await
    }
}

impl BlobClient<HttpLedgerClient> {
    /// Connects to the node in `config` and targets the canonical
    /// deployment of `version`.
    pub async fn connect(
        config: &ClientConfig,
        version: ProtocolVersion,
    ) -> Result<Self, ConnectError> {
        let rpc = Arc::new(HttpLedgerClient::connect(config).await?);
        Ok(Self::for_version(rpc, version))
    }
}
