// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # BlobStore Protocol — Core Library
//!
//! A client for storing opaque byte blobs on an Ethereum chain and getting
//! them back. The chain is the storage medium: the blob travels as call
//! data, the contract emits it as an event and records the block it landed
//! in, and a lookup walks back from that block number to the event.
//!
//! The interesting part is that "the block it landed in" is a moving
//! target. A fresh blob sits in the mempool with no block at all, and a
//! reorg can move it after the pointer has been read. The retriever
//! reconciles these views instead of trusting any single one.
//!
//! ## Architecture
//!
//! - **identifier** — Keccak-256 identifiers, creation flags, nonce candidates.
//! - **abi** — Contract interfaces via `sol!`, plus the fixed-offset blob reader.
//! - **version** — Per-deployment layout: calls, views, topics, margins.
//! - **rpc** — The `LedgerRpc` seam and its JSON-RPC implementation.
//! - **submit** — Estimate, broadcast, confirm.
//! - **retrieve** — Pointer, mempool, reorg-aware log window, bounded retry.
//! - **client** — One handle bundling both pipelines.
//! - **config** — Constants, deployments and the few tunables.
//! - **logging** — Optional subscriber setup for embedders.
//! - **testing** — In-memory chain emulator (feature `testing`).

pub mod abi;
pub mod client;
pub mod config;
pub mod error;
pub mod identifier;
pub mod logging;
pub mod retrieve;
pub mod rpc;
pub mod submit;
pub mod types;
pub mod version;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::BlobClient;
pub use error::{IdentifierError, RetrieveError, SubmitError};
pub use identifier::{BlobFlags, Identifier};
pub use rpc::{HttpLedgerClient, LedgerRpc, RpcError};
pub use version::ProtocolVersion;
