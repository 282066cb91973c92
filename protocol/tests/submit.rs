//! Submission pipeline against the in-memory chain: identifier derivation,
//! nonce probing, and the failures that must stay distinguishable from
//! transport errors.

use std::sync::Arc;

use blobstore_protocol::config::{RetrieverConfig, SubmitterConfig};
use blobstore_protocol::identifier::{keccak256, BlobFlags, Identifier, NonceCandidates};
use blobstore_protocol::rpc::RpcError;
use blobstore_protocol::testing::InMemoryLedger;
use blobstore_protocol::types::B256;
use blobstore_protocol::{BlobClient, IdentifierError, ProtocolVersion, SubmitError};

fn client(ledger: &Arc<InMemoryLedger>, version: ProtocolVersion) -> BlobClient<InMemoryLedger> {
    BlobClient::for_version(Arc::clone(ledger), version)
}

/// The id the emulator hands out for a creation salt.
fn emulated_id(salt: B256) -> [u8; 20] {
    let mut id = [0u8; 20];
    id.copy_from_slice(&keccak256(salt)[..20]);
    id
}

#[tokio::test]
async fn content_hash_identifier_is_returned_and_observable() {
    let ledger = Arc::new(InMemoryLedger::new());
    let client = client(&ledger, ProtocolVersion::BlobLog);

    let stored = client.store(b"payload").await.unwrap();
    assert_eq!(stored.identifier, Identifier::from(keccak256(b"payload")));
    assert!(stored.cost > 21_000);
    assert!(client.exists(&stored.identifier).await.unwrap());
    assert_eq!(ledger.mempool_len(), 1);
}

#[tokio::test]
async fn estimate_matches_submitted_cost() {
    let ledger = Arc::new(InMemoryLedger::new());
    let client = client(&ledger, ProtocolVersion::BlobLog);

    let estimate = client.estimate(b"sized").await.unwrap();
    let stored = client.store(b"sized").await.unwrap();
    assert_eq!(estimate, stored.cost);
}

#[tokio::test]
async fn estimation_failure_is_not_a_transport_error() {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.set_fail_estimation(true);

    let err = client(&ledger, ProtocolVersion::BlobLog)
        .store(b"x")
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Estimation(RpcError::Node { .. })));
    assert_eq!(ledger.mempool_len(), 0);
}

#[tokio::test]
async fn storing_the_same_blob_twice_fails_estimation() {
    let ledger = Arc::new(InMemoryLedger::new());
    let client = client(&ledger, ProtocolVersion::BlobLog);

    client.store(b"dup").await.unwrap();
    assert!(matches!(
        client.store(b"dup").await,
        Err(SubmitError::Estimation(_))
    ));
}

#[tokio::test]
async fn dropped_broadcast_is_reported() {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.set_drop_broadcasts(true);

    let err = client(&ledger, ProtocolVersion::BlobLog)
        .store(b"lost")
        .await
        .unwrap_err();
    match err {
        SubmitError::BroadcastNotObserved { identifier, .. } => {
            assert_eq!(identifier, Identifier::from(keccak256(b"lost")));
        }
        other => panic!("expected BroadcastNotObserved, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_sender_surfaces_as_transport() {
    let ledger = Arc::new(InMemoryLedger::with_accounts(Vec::new()));

    let err = client(&ledger, ProtocolVersion::BlobLog)
        .store(b"anon")
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Transport(RpcError::NoSender)));
}

// ---------------------------------------------------------------------------
// Nonce probing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_free_candidate_wins() {
    let ledger = Arc::new(InMemoryLedger::new());
    let flags = BlobFlags::from_bits(BlobFlags::UPDATABLE);
    let salts: Vec<_> = NonceCandidates::new(b"probed", flags, 3).collect();
    ledger.reserve_blob_id(&emulated_id(salts[0]));

    let client = client(&ledger, ProtocolVersion::BlobStore);
    let stored = client.store_with_flags(b"probed", flags).await.unwrap();

    assert_eq!(&stored.identifier.as_bytes()[..20], &emulated_id(salts[1]));
    assert!(stored.identifier.as_bytes()[20..].iter().all(|b| *b == 0));
}

#[tokio::test]
async fn same_blob_twice_resolves_to_one_identifier() {
    let ledger = Arc::new(InMemoryLedger::new());
    let client = client(&ledger, ProtocolVersion::BlobStore);

    let first = client.store(b"twice").await.unwrap();
    // Still pending: the contract already answers with the first id.
    let second = client.store(b"twice").await.unwrap();
    assert_eq!(second.identifier, first.identifier);

    ledger.mine();
    let third = client.store(b"twice").await.unwrap();
    assert_eq!(third.identifier, first.identifier);
    ledger.mine();

    let retriever = client.retriever();
    assert_eq!(retriever.revision_count(&first.identifier).await.unwrap(), Some(1));
    assert_eq!(client.retrieve(&first.identifier, None).await.unwrap(), b"twice");
}

#[tokio::test]
async fn flags_change_the_identifier() {
    let ledger = Arc::new(InMemoryLedger::new());
    let client = client(&ledger, ProtocolVersion::BlobStore);

    let plain = client.store(b"flagged").await.unwrap();
    let updatable = client
        .store_with_flags(b"flagged", BlobFlags::from_bits(BlobFlags::UPDATABLE))
        .await
        .unwrap();
    assert_ne!(plain.identifier, updatable.identifier);
}

#[tokio::test]
async fn probe_gives_up_after_its_bound() {
    let ledger = Arc::new(InMemoryLedger::new());
    for salt in NonceCandidates::new(b"crowded", BlobFlags::default(), 2) {
        ledger.reserve_blob_id(&emulated_id(salt));
    }

    let client = BlobClient::with_configs(
        Arc::clone(&ledger),
        ProtocolVersion::BlobStore,
        ProtocolVersion::BlobStore.default_address(),
        SubmitterConfig {
            max_nonce_probes: 2,
        },
        RetrieverConfig::default(),
    );

    let calls_before = ledger.call_count();
    let err = client.store(b"crowded").await.unwrap_err();
    assert!(matches!(
        err,
        SubmitError::Identifier(IdentifierError::ProbeExhausted { attempts: 2 })
    ));
    assert_eq!(ledger.call_count() - calls_before, 2);
    assert_eq!(ledger.mempool_len(), 0);
}
