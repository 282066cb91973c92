// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # BlobStore Contracts
//!
//! Typed call wrappers for the contract generations that sit beside the
//! core store/retrieve pipeline:
//!
//! - **Blob Store** — administration of the revisioned contract: new
//!   revisions, retraction, ownership transfer, and the one-way flag
//!   switches, plus its getters.
//! - **Blob State** — the state-storage contract, where a blob lives in
//!   contract storage and is read back with a single call.
//!
//! Both wrappers share the caller's [`LedgerRpc`](blobstore_protocol::LedgerRpc)
//! handle and broadcast through the protocol crate's submitter, so
//! estimation failures and dropped broadcasts are reported the same way as
//! for plain stores.

pub mod blob_state;
pub mod blob_store;

pub use blob_state::{BlobStateContract, StateError};
pub use blob_store::{AdminError, BlobInfo, BlobStoreContract, RevisionReceipt};
