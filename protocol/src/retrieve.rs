//! # Reconciling Retriever
//!
//! Resolves an identifier back to its bytes. The contract only records
//! *where* a blob landed (a block number); the bytes themselves live in
//! event logs or, before mining, in the raw pending transaction.
//!
//! ```text
//!            ┌──────────────────────────── stale read ───────────────────────────┐
//!            ▼                                                                   │
//!   RESOLVE_POINTER ──(0)──► SCAN_MEMPOOL ──(miss)──► re-resolve ──(0)──► NOT_FOUND
//!            │                    │                        │                     │
//!            │                  (hit)──► DONE              ▼                     │
//!            └───────────────(n)─────────────────► SCAN_LOG_WINDOW ──(empty)─────┘
//!                                                          │
//!                                                        (hit)──► DONE
//! ```
//!
//! A pointer read moments ago may be invalidated by a reorg before the log
//! scan runs, so recent pointers widen the scan to the last `margin` blocks
//! and an empty scan restarts from the pointer. Restarts are capped by
//! [`RetrieverConfig::max_attempts`]; callers may add a deadline or a
//! shutdown signal on top.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::abi;
use crate::config::RetrieverConfig;
use crate::error::RetrieveError;
use crate::identifier::{derive_identifier, Identifier};
use crate::rpc::{CallRequest, LedgerRpc, LogFilter};
use crate::types::{Address, BlockTag};
use crate::version::ProtocolVersion;

/// Result of one log-window scan.
#[derive(Debug, PartialEq, Eq)]
enum ScanOutcome {
    Found(Vec<u8>),
    /// No matching entry: the pointer was stale.
    Stale,
}

/// Looks blobs up through one contract deployment.
pub struct Retriever<R: LedgerRpc + ?Sized> {
    rpc: Arc<R>,
    contract: Address,
    version: ProtocolVersion,
    config: RetrieverConfig,
}

impl<R: LedgerRpc + ?Sized> Retriever<R> {
    pub fn new(
        rpc: Arc<R>,
        contract: Address,
        version: ProtocolVersion,
        config: RetrieverConfig,
    ) -> Self {
        Self {
            rpc,
            contract,
            version,
            config,
        }
    }

    /// Returns the bytes stored under `identifier`.
    ///
    /// `revision` selects a revision on contracts that keep them; `None`
    /// means the latest one. Asking a contract without revisions for one is
    /// an error.
    pub async fn retrieve(
        &self,
        identifier: &Identifier,
        revision: Option<u64>,
    ) -> Result<Vec<u8>, RetrieveError> {
        match self.config.deadline() {
            Some(deadline) => tokio::time::timeout(deadline, self.reconcile(identifier, revision))
                .await
                .map_err(|_| RetrieveError::DeadlineExceeded)?,
            None => self.reconcile(identifier, revision).await,
        }
    }

    /// Like [`retrieve`](Self::retrieve), but gives up with
    /// [`RetrieveError::Cancelled`] as soon as `shutdown` turns true.
    pub async fn retrieve_until(
        &self,
        identifier: &Identifier,
        revision: Option<u64>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<u8>, RetrieveError> {
        tokio::select! {
            biased;
            _ = shutdown_signalled(shutdown) => {
                info!(%identifier, "retrieval cancelled by shutdown");
                Err(RetrieveError::Cancelled)
            }
            result = self.retrieve(identifier, revision) => result,
        }
    }

    /// Number of revisions recorded for `identifier`, as seen by the
    /// pending view. `None` for contracts without revisions.
    pub async fn revision_count(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<u64>, RetrieveError> {
        let Some(data) = self.version.revision_count_call(identifier) else {
            return Ok(None);
        };
        let response = self
            .rpc
            .call(&CallRequest::new(self.contract, data), BlockTag::Pending)
            .await?;
        Ok(Some(self.version.decode_revision_count(&response)?))
    }

    async fn reconcile(
        &self,
        identifier: &Identifier,
        revision: Option<u64>,
    ) -> Result<Vec<u8>, RetrieveError> {
        let revision = self.resolve_revision(identifier, revision).await?;
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let (mut pointer, mut head) = self.resolve_pointer(identifier, revision).await?;
            debug!(%identifier, ?revision, pointer, head, attempt, "pointer resolved");

            if pointer == 0 {
                if self.version.scans_mempool() {
                    if let Some(blob) = self.scan_mempool(identifier).await? {
                        info!(%identifier, bytes = blob.len(), "blob found in mempool");
                        return Ok(blob);
                    }
                }
                // It may have been mined between the pointer read and the scan.
                (pointer, head) = self.resolve_pointer(identifier, revision).await?;
                if pointer == 0 {
                    return Err(RetrieveError::NotFound {
                        identifier: *identifier,
                        revision,
                    });
                }
            }

            match self.scan_log_window(identifier, revision, pointer, head).await? {
                ScanOutcome::Found(blob) => {
                    debug!(%identifier, bytes = blob.len(), attempt, "blob found in logs");
                    return Ok(blob);
                }
                ScanOutcome::Stale => {
                    warn!(
                        %identifier,
                        pointer,
                        head,
                        attempt,
                        max_attempts,
                        "stale read, restarting"
                    );
                }
            }
        }

        Err(RetrieveError::ReconciliationTimeout {
            attempts: max_attempts,
        })
    }

    async fn resolve_revision(
        &self,
        identifier: &Identifier,
        revision: Option<u64>,
    ) -> Result<Option<u64>, RetrieveError> {
        if !self.version.supports_revisions() {
            return match revision {
                Some(_) => Err(RetrieveError::RevisionsUnsupported),
                None => Ok(None),
            };
        }
        if revision.is_some() {
            return Ok(revision);
        }

        match self.revision_count(identifier).await? {
            Some(0) | None => Err(RetrieveError::NotFound {
                identifier: *identifier,
                revision: None,
            }),
            Some(count) => Ok(Some(count - 1)),
        }
    }

    /// Block-number pointer and current head, queried concurrently.
    async fn resolve_pointer(
        &self,
        identifier: &Identifier,
        revision: Option<u64>,
    ) -> Result<(u64, u64), RetrieveError> {
        let call = CallRequest::new(self.contract, self.version.pointer_call(identifier, revision));
        let (response, head) = tokio::try_join!(
            self.rpc.call(&call, self.version.pointer_view()),
            self.rpc.block_number(),
        )?;
        Ok((self.version.decode_pointer(&response)?, head))
    }

    async fn scan_mempool(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Vec<u8>>, RetrieveError> {
        let block = self.rpc.pending_block().await?;
        let scheme = self.version.scheme();

        for tx in block.transactions {
            if tx.to != Some(self.contract) {
                continue;
            }
            let blob = match self.version.decode_store_call(&tx.input) {
                Ok(blob) => blob,
                Err(e) => {
                    debug!(hash = ?tx.hash, error = %e, "skipping undecodable pending call");
                    continue;
                }
            };
            if derive_identifier(blob, scheme).as_ref() == Some(identifier) {
                return Ok(Some(blob.to_vec()));
            }
        }
        Ok(None)
    }

    async fn scan_log_window(
        &self,
        identifier: &Identifier,
        revision: Option<u64>,
        pointer: u64,
        head: u64,
    ) -> Result<ScanOutcome, RetrieveError> {
        let (from_block, to_block) = window(pointer, head, self.version);
        debug!(%from_block, %to_block, "scanning log window");

        let filter = LogFilter {
            from_block,
            to_block,
            address: self.contract,
            topics: self.version.log_topics(identifier, revision),
        };
        let entries = self.rpc.get_logs(&filter).await?;
        let scheme = self.version.scheme();
        let verify = scheme.is_offline();

        // A rewritten revision leaves several entries under the same topics.
        // The newest one in the pointer's block wins, else the newest overall.
        let mut at_pointer = None;
        let mut newest = None;
        for entry in entries.iter().filter(|e| filter.matches_topics(&e.topics)) {
            let decoded = abi::read_length_prefixed(&entry.data, self.version.log_length_offset());
            let blob = match decoded {
                Ok(blob) => blob,
                Err(e) if verify => {
                    debug!(error = %e, "skipping undecodable log entry");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if verify && derive_identifier(blob, scheme).as_ref() != Some(identifier) {
                debug!(block = ?entry.block_number, "skipping log entry with mismatched hash");
                continue;
            }
            if entry.block_number.unwrap_or(head + 1) == pointer {
                at_pointer = Some(blob);
            }
            newest = Some(blob);
        }
        Ok(match at_pointer.or(newest) {
            Some(blob) => ScanOutcome::Found(blob.to_vec()),
            None => ScanOutcome::Stale,
        })
    }
}

/// Log window for a pointer. Recent pointers widen to the last `margin`
/// blocks up to the version's tip; old ones scan exactly their block.
fn window(pointer: u64, head: u64, version: ProtocolVersion) -> (BlockTag, BlockTag) {
    let margin = version.reorg_margin();
    if pointer.saturating_add(margin) > head {
        (BlockTag::Number(head.saturating_sub(margin)), version.window_tip())
    } else {
        (BlockTag::Number(pointer), BlockTag::Number(pointer))
    }
}

/// Resolves once `shutdown` reads true. A dropped sender never signals.
async fn shutdown_signalled(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
