//! Integration tests for the state-storage contract wrapper.

use std::sync::Arc;

use blobstore_contracts::{BlobStateContract, StateError};
use blobstore_protocol::identifier::keccak256;
use blobstore_protocol::testing::InMemoryLedger;
use blobstore_protocol::{Identifier, SubmitError};

fn setup() -> (Arc<InMemoryLedger>, BlobStateContract<InMemoryLedger>) {
    let ledger = Arc::new(InMemoryLedger::new());
    let contract = BlobStateContract::canonical(Arc::clone(&ledger));
    (ledger, contract)
}

#[tokio::test]
async fn stored_blob_is_readable_before_and_after_mining() {
    let (ledger, contract) = setup();

    let stored = contract.store(b"kept in storage").await.unwrap();
    assert_eq!(stored.identifier, Identifier::from(keccak256(b"kept in storage")));
    assert_eq!(contract.get(&stored.identifier).await.unwrap(), b"kept in storage");

    ledger.mine();
    assert_eq!(contract.get(&stored.identifier).await.unwrap(), b"kept in storage");
}

#[tokio::test]
async fn empty_blob_is_distinct_from_missing() {
    let (_ledger, contract) = setup();

    let stored = contract.store(b"").await.unwrap();
    assert!(contract.get(&stored.identifier).await.unwrap().is_empty());

    let unknown = Identifier::new([0x42; 32]);
    assert!(matches!(
        contract.get(&unknown).await,
        Err(StateError::NotFound(id)) if id == unknown
    ));
}

#[tokio::test]
async fn duplicate_store_is_refused() {
    let (_ledger, contract) = setup();

    contract.store(b"once").await.unwrap();
    assert!(matches!(
        contract.store(b"once").await,
        Err(StateError::Submit(SubmitError::Estimation(_)))
    ));
}

#[tokio::test]
async fn storage_is_per_deployment() {
    let (ledger, contract) = setup();
    let log_contract = blobstore_protocol::BlobClient::for_version(
        Arc::clone(&ledger),
        blobstore_protocol::ProtocolVersion::BlobLog,
    );

    let stored = contract.store(b"here only").await.unwrap();
    assert!(contract.exists(&stored.identifier).await.unwrap());
    assert!(!log_contract.exists(&stored.identifier).await.unwrap());
}
