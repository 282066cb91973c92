//! # Contract Protocol Versions
//!
//! The BlobStore contract has been redeployed with different layouts over
//! time. Rather than one pipeline per deployment, each layout is a
//! [`ProtocolVersion`] that answers the handful of questions the submitter
//! and retriever need: which calls to encode, which view to query, which
//! topics identify a log entry, where the length word sits, and how wide
//! the reorg window is.
//!
//! | Version     | Id scheme       | Pointer view | Window tip | Margin |
//! |-------------|-----------------|--------------|------------|--------|
//! | `BlobLog`   | content hash    | latest       | latest     | 200    |
//! | `BlobStore` | nonce probe     | pending      | pending    | 20     |

use alloy_primitives::{Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::abi::{self, AbiError, BlobLog, BlobStore, SolCall, SolEvent};
use crate::config::{
    BLOB_LOG_ADDRESS, BLOB_LOG_REORG_MARGIN, BLOB_STORE_ADDRESS, BLOB_STORE_ID_SIZE,
    BLOB_STORE_REORG_MARGIN, CREATE_CALL_LENGTH_OFFSET, IDENTIFIER_SIZE, LOG_LENGTH_OFFSET,
    STORE_CALL_LENGTH_OFFSET,
};
use crate::identifier::{Identifier, IdentifierScheme};
use crate::types::{Address, BlockTag, B256};

/// Reserved trailing bytes of a revisioned-contract id.
const BLOB_STORE_RESERVED_SUFFIX: usize = IDENTIFIER_SIZE - BLOB_STORE_ID_SIZE;

/// Layout of one deployed BlobStore contract generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolVersion {
    /// Blobs are emitted as anonymous events keyed by their content hash.
    BlobLog,
    /// Blobs carry flags and revisions; ids are chosen by the contract.
    BlobStore,
}

impl ProtocolVersion {
    /// The canonical deployment of this version.
    pub fn default_address(&self) -> Address {
        match self {
            Self::BlobLog => BLOB_LOG_ADDRESS,
            Self::BlobStore => BLOB_STORE_ADDRESS,
        }
    }

    /// How identifiers are derived.
    pub fn scheme(&self) -> IdentifierScheme {
        match self {
            Self::BlobLog => IdentifierScheme::ContentHash,
            Self::BlobStore => IdentifierScheme::NonceProbe {
                reserved_suffix: BLOB_STORE_RESERVED_SUFFIX,
            },
        }
    }

    /// Whether entries are addressed by `(id, revision)`.
    pub fn supports_revisions(&self) -> bool {
        matches!(self, Self::BlobStore)
    }

    /// Whether a blob can be recognised in a raw pending transaction by
    /// recomputing its identifier offline.
    pub fn scans_mempool(&self) -> bool {
        self.scheme().is_offline()
    }

    /// Blocks behind the head re-scanned when a pointer is recent.
    pub fn reorg_margin(&self) -> u64 {
        match self {
            Self::BlobLog => BLOB_LOG_REORG_MARGIN,
            Self::BlobStore => BLOB_STORE_REORG_MARGIN,
        }
    }

    /// View the block-number pointer is read from.
    pub fn pointer_view(&self) -> BlockTag {
        match self {
            Self::BlobLog => BlockTag::Latest,
            Self::BlobStore => BlockTag::Pending,
        }
    }

    /// Upper bound of a widened log window.
    pub fn window_tip(&self) -> BlockTag {
        match self {
            Self::BlobLog => BlockTag::Latest,
            Self::BlobStore => BlockTag::Pending,
        }
    }

    // -- Store ---------------------------------------------------------------

    /// Encodes the state-mutating store call. `salt` is the flags/nonce
    /// word and is ignored by versions that do not take one.
    pub fn store_call(&self, blob: &[u8], salt: B256) -> Vec<u8> {
        let blob = Bytes::copy_from_slice(blob);
        match self {
            Self::BlobLog => BlobLog::storeBlobCall { blob }.abi_encode(),
            Self::BlobStore => BlobStore::createWithNonceCall {
                flagsNonce: salt,
                contents: blob,
            }
            .abi_encode(),
        }
    }

    /// Extracts the blob from the call data of a store transaction.
    pub fn decode_store_call<'a>(&self, input: &'a [u8]) -> Result<&'a [u8], AbiError> {
        match self {
            Self::BlobLog => {
                abi::expect_call::<BlobLog::storeBlobCall>(input)?;
                abi::read_length_prefixed(input, STORE_CALL_LENGTH_OFFSET)
            }
            Self::BlobStore => {
                abi::expect_call::<BlobStore::createWithNonceCall>(input)?;
                abi::read_length_prefixed(input, CREATE_CALL_LENGTH_OFFSET)
            }
        }
    }

    /// Reads the id out of a simulated create. An empty response means the
    /// salt collided and the contract refused it; that is `None`, not an
    /// error. Versions without a create call never yield an id.
    pub fn decode_created_id(&self, response: &[u8]) -> Result<Option<Identifier>, AbiError> {
        match self {
            Self::BlobLog => Ok(None),
            Self::BlobStore if response.is_empty() => Ok(None),
            Self::BlobStore => {
                let created = BlobStore::createWithNonceCall::abi_decode_returns(response, true)?;
                Ok(Some(Identifier::from_short_id(created.blobId)))
            }
        }
    }

    // -- Existence -----------------------------------------------------------

    /// Encodes the existence query used to confirm a broadcast.
    pub fn exists_call(&self, id: &Identifier) -> Vec<u8> {
        match self {
            Self::BlobLog => BlobLog::blobExistsCall { hash: id.as_word() }.abi_encode(),
            Self::BlobStore => BlobStore::getExistsCall {
                blobId: id.short_id(),
            }
            .abi_encode(),
        }
    }

    pub fn decode_exists(&self, response: &[u8]) -> Result<bool, AbiError> {
        Ok(match self {
            Self::BlobLog => BlobLog::blobExistsCall::abi_decode_returns(response, true)?.exists,
            Self::BlobStore => BlobStore::getExistsCall::abi_decode_returns(response, true)?.exists,
        })
    }

    // -- Pointer -------------------------------------------------------------

    /// Encodes the block-number pointer query.
    pub fn pointer_call(&self, id: &Identifier, revision: Option<u64>) -> Vec<u8> {
        match self {
            Self::BlobLog => BlobLog::getBlobBlockNumberCall { hash: id.as_word() }.abi_encode(),
            Self::BlobStore => BlobStore::getRevisionBlockNumberCall {
                blobId: id.short_id(),
                revisionId: U256::from(revision.unwrap_or(0)),
            }
            .abi_encode(),
        }
    }

    /// Block number out of a pointer response; 0 means "not recorded".
    pub fn decode_pointer(&self, response: &[u8]) -> Result<u64, AbiError> {
        let block = match self {
            Self::BlobLog => {
                BlobLog::getBlobBlockNumberCall::abi_decode_returns(response, true)?.blockNumber
            }
            Self::BlobStore => {
                BlobStore::getRevisionBlockNumberCall::abi_decode_returns(response, true)?
                    .blockNumber
            }
        };
        abi::to_u64(block)
    }

    /// Encodes the revision-count query, for versions that have revisions.
    pub fn revision_count_call(&self, id: &Identifier) -> Option<Vec<u8>> {
        match self {
            Self::BlobLog => None,
            Self::BlobStore => Some(
                BlobStore::getRevisionCountCall {
                    blobId: id.short_id(),
                }
                .abi_encode(),
            ),
        }
    }

    pub fn decode_revision_count(&self, response: &[u8]) -> Result<u64, AbiError> {
        let count = BlobStore::getRevisionCountCall::abi_decode_returns(response, true)?;
        abi::to_u64(count.revisionCount)
    }

    // -- Logs ----------------------------------------------------------------

    /// Topic filter identifying the log entry of `(id, revision)`.
    pub fn log_topics(&self, id: &Identifier, revision: Option<u64>) -> Vec<B256> {
        match self {
            Self::BlobLog => vec![id.as_word()],
            Self::BlobStore => vec![
                BlobStore::Store::SIGNATURE_HASH,
                id.as_word(),
                B256::left_padding_from(&revision.unwrap_or(0).to_be_bytes()),
            ],
        }
    }

    /// Offset of the length word inside event data.
    pub fn log_length_offset(&self) -> usize {
        LOG_LENGTH_OFFSET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::SolValue;
    use crate::config::BLOB_STORE_REVISION_EVENT;
    use crate::identifier::derive_identifier;

    fn id() -> Identifier {
        derive_identifier(b"hello", IdentifierScheme::ContentHash).unwrap()
    }

    #[test]
    fn only_content_addressed_versions_scan_the_mempool() {
        assert!(ProtocolVersion::BlobLog.scans_mempool());
        assert!(!ProtocolVersion::BlobStore.scans_mempool());
    }

    #[test]
    fn store_call_round_trips_through_decoder() {
        for version in [ProtocolVersion::BlobLog, ProtocolVersion::BlobStore] {
            let input = version.store_call(b"payload bytes", B256::repeat_byte(3));
            assert_eq!(version.decode_store_call(&input).unwrap(), b"payload bytes");
        }
    }

    #[test]
    fn decoder_rejects_foreign_calls() {
        let log_call = ProtocolVersion::BlobLog.store_call(b"x", B256::ZERO);
        assert!(matches!(
            ProtocolVersion::BlobStore.decode_store_call(&log_call),
            Err(AbiError::WrongFunction { .. })
        ));
    }

    #[test]
    fn blob_log_topics_are_the_identifier() {
        assert_eq!(ProtocolVersion::BlobLog.log_topics(&id(), None), vec![id().as_word()]);
    }

    #[test]
    fn blob_store_topics_carry_revision() {
        let short = id().with_reserved_suffix(12);
        let topics = ProtocolVersion::BlobStore.log_topics(&short, Some(7));
        assert_eq!(topics.len(), 3);
        assert_eq!(topics[0], BLOB_STORE_REVISION_EVENT);
        assert_eq!(topics[1], short.as_word());
        assert_eq!(topics[2][31], 7);
        assert!(topics[2][..28].iter().all(|b| *b == 0));
    }

    #[test]
    fn pointer_calls_use_version_selectors() {
        let log = ProtocolVersion::BlobLog.pointer_call(&id(), None);
        assert_eq!(&log[..4], &BlobLog::getBlobBlockNumberCall::SELECTOR);
        assert_eq!(log.len(), 36);

        let store = ProtocolVersion::BlobStore.pointer_call(&id(), Some(2));
        assert_eq!(&store[..4], &BlobStore::getRevisionBlockNumberCall::SELECTOR);
        assert_eq!(store.len(), 68);
        assert_eq!(store[67], 2);
        // bytes20 argument keeps only the significant prefix.
        assert!(store[24..36].iter().all(|b| *b == 0));
    }

    #[test]
    fn pointer_response_decodes() {
        let word = U256::from(436u64).abi_encode();
        assert_eq!(ProtocolVersion::BlobLog.decode_pointer(&word).unwrap(), 436);
        assert!(ProtocolVersion::BlobLog.decode_pointer(&[]).is_err());
    }

    #[test]
    fn created_id_comes_from_the_response() {
        let version = ProtocolVersion::BlobStore;
        assert_eq!(version.decode_created_id(&[]).unwrap(), None);

        let response = alloy_primitives::FixedBytes::<20>::repeat_byte(0xff).abi_encode();
        let id = version.decode_created_id(&response).unwrap().unwrap();
        assert_eq!(id.prefix(20), &[0xff; 20]);
        assert!(id.as_bytes()[20..].iter().all(|b| *b == 0));
    }

    #[test]
    fn revision_count_only_for_revisioned_contract() {
        assert!(ProtocolVersion::BlobLog.revision_count_call(&id()).is_none());
        assert!(ProtocolVersion::BlobStore.revision_count_call(&id()).is_some());
    }

    #[test]
    fn versions_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProtocolVersion::BlobStore).unwrap(),
            "\"blob_store\""
        );
    }
}
