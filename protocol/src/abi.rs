//! # Contract ABI
//!
//! Interfaces of the three BlobStore contract generations, declared with
//! `alloy_sol_types::sol!`. Call data, return values and event data are
//! encoded and decoded through the generated types.
//!
//! The one exception is reading a blob back out of raw call data or event
//! data. The deployed contracts have always been read by taking the length
//! word at a fixed offset rather than chasing the head pointer, and
//! [`read_length_prefixed`] keeps that contract:
//!
//! ```text
//! event data:                        offset(32) | length | bytes
//! storeBlob(bytes):       selector | offset(32) | length | bytes
//! createWithNonce(...):   selector | salt(32) | offset(32) | length | bytes
//! ```

use alloy_primitives::U256;
use alloy_sol_types::sol;

use crate::config::WORD_SIZE;

pub use alloy_sol_types::{SolCall, SolEvent, SolInterface, SolValue};

sol! {
    /// Log-backed contract: the blob is emitted as an anonymous event whose
    /// only topic is its hash.
    contract BlobLog {
        event Store(bytes32 indexed hash, bytes contents) anonymous;

        function storeBlob(bytes blob) external;
        function blobExists(bytes32 hash) external view returns (bool exists);
        function getBlobBlockNumber(bytes32 hash)
            external
            view
            returns (uint256 blockNumber);
    }

    /// State-backed contract: the blob lives in contract storage.
    contract BlobState {
        function storeBlob(bytes blob) external;
        function blobExists(bytes32 hash) external view returns (bool exists);
        function getBlob(bytes32 hash) external view returns (bytes blob);
    }

    /// Revisioned contract. Ids are 20 bytes chosen by the contract from a
    /// `flags ‖ nonce` salt.
    contract BlobStore {
        event Store(bytes20 indexed blobId, uint256 indexed revisionId, bytes contents);

        function createWithNonce(bytes32 flagsNonce, bytes contents)
            external
            returns (bytes20 blobId);
        function createNewRevision(bytes20 blobId, bytes contents)
            external
            returns (uint256 revisionId);
        function updateLatestRevision(bytes20 blobId, bytes contents) external;
        function retractLatestRevision(bytes20 blobId) external;
        function restart(bytes20 blobId, bytes contents) external;
        function retract(bytes20 blobId) external;
        function transferEnable(bytes20 blobId) external;
        function transferDisable(bytes20 blobId) external;
        function transfer(bytes20 blobId, address recipient) external;
        function disown(bytes20 blobId) external;
        function setNotUpdatable(bytes20 blobId) external;
        function setEnforceRevisions(bytes20 blobId) external;
        function setNotRetractable(bytes20 blobId) external;
        function setNotTransferable(bytes20 blobId) external;

        function getContractId() external view returns (bytes12 contractId);
        function getExists(bytes20 blobId) external view returns (bool exists);
        function getInfo(bytes20 blobId)
            external
            view
            returns (bytes4 flags, address owner, uint256 revisionCount, uint256[] blockNumbers);
        function getFlags(bytes20 blobId) external view returns (bytes4 flags);
        function getUpdatable(bytes20 blobId) external view returns (bool updatable);
        function getEnforceRevisions(bytes20 blobId)
            external
            view
            returns (bool enforceRevisions);
        function getRetractable(bytes20 blobId) external view returns (bool retractable);
        function getTransferable(bytes20 blobId) external view returns (bool transferable);
        function getOwner(bytes20 blobId) external view returns (address owner);
        function getRevisionCount(bytes20 blobId)
            external
            view
            returns (uint256 revisionCount);
        function getRevisionBlockNumber(bytes20 blobId, uint256 revisionId)
            external
            view
            returns (uint256 blockNumber);
        function getAllRevisionBlockNumbers(bytes20 blobId)
            external
            view
            returns (uint256[] blockNumbers);
    }
}

/// ABI decoding failures.
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    /// The payload ends before the field being read.
    #[error("payload truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required to read the field.
        needed: usize,
        /// Bytes actually present.
        available: usize,
    },

    /// A length word does not fit the native width.
    #[error("length at offset {offset} does not fit in 64 bits")]
    Overflow {
        /// Offset of the offending word.
        offset: usize,
    },

    /// The call data targets a different function.
    #[error("call data does not target {expected}")]
    WrongFunction {
        /// Signature of the expected function.
        expected: &'static str,
    },

    /// A `uint256` value does not fit in 64 bits.
    #[error("value {0} does not fit in 64 bits")]
    Uint(U256),

    /// The generated decoder rejected the payload.
    #[error(transparent)]
    Decode(#[from] alloy_sol_types::Error),
}

/// Narrows a `uint256` to `u64`. Values wider than 64 bits are rejected
/// rather than truncated.
pub fn to_u64(value: U256) -> Result<u64, AbiError> {
    if value.bit_len() > 64 {
        return Err(AbiError::Uint(value));
    }
    Ok(value.as_limbs()[0])
}

/// Narrows every element of a `uint256[]`.
pub fn to_u64s(values: &[U256]) -> Result<Vec<u64>, AbiError> {
    values.iter().copied().map(to_u64).collect()
}

/// Checks that `input` calls `C`.
pub fn expect_call<C: SolCall>(input: &[u8]) -> Result<(), AbiError> {
    match input.get(..C::SELECTOR.len()) {
        Some(selector) if selector == C::SELECTOR.as_slice() => Ok(()),
        _ => Err(AbiError::WrongFunction {
            expected: C::SIGNATURE,
        }),
    }
}

/// Reads a length-prefixed byte string whose big-endian length word sits at
/// `length_offset`; the bytes start immediately after it.
pub fn read_length_prefixed(data: &[u8], length_offset: usize) -> Result<&[u8], AbiError> {
    let end = length_offset
        .checked_add(WORD_SIZE)
        .ok_or(AbiError::Overflow { offset: length_offset })?;
    let word = data.get(length_offset..end).ok_or(AbiError::Truncated {
        needed: end,
        available: data.len(),
    })?;
    let len = to_u64(U256::from_be_slice(word))
        .ok()
        .and_then(|len| usize::try_from(len).ok())
        .ok_or(AbiError::Overflow {
            offset: length_offset,
        })?;
    let stop = end.checked_add(len).ok_or(AbiError::Overflow {
        offset: length_offset,
    })?;
    data.get(end..stop).ok_or(AbiError::Truncated {
        needed: stop,
        available: data.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CREATE_CALL_LENGTH_OFFSET, LOG_LENGTH_OFFSET, STORE_CALL_LENGTH_OFFSET};
    use alloy_primitives::{Bytes, FixedBytes, B256};

    #[test]
    fn store_call_length_sits_after_selector_and_head() {
        let call = BlobLog::storeBlobCall {
            blob: Bytes::from_static(b"abc"),
        }
        .abi_encode();
        assert_eq!(read_length_prefixed(&call, STORE_CALL_LENGTH_OFFSET).unwrap(), b"abc");
    }

    #[test]
    fn create_call_length_sits_after_two_head_words() {
        let call = BlobStore::createWithNonceCall {
            flagsNonce: B256::repeat_byte(9),
            contents: Bytes::from_static(b"payload"),
        }
        .abi_encode();
        assert_eq!(&call[4..36], &[9u8; 32]);
        assert_eq!(read_length_prefixed(&call, CREATE_CALL_LENGTH_OFFSET).unwrap(), b"payload");
    }

    #[test]
    fn event_data_length_sits_after_head() {
        let data = Bytes::from_static(b"hello").abi_encode();
        assert_eq!(data.len(), 96);
        assert_eq!(read_length_prefixed(&data, LOG_LENGTH_OFFSET).unwrap(), b"hello");
        assert!(data[69..].iter().all(|b| *b == 0));
    }

    #[test]
    fn revision_event_topic_is_the_deployed_one() {
        assert_eq!(
            BlobStore::Store::SIGNATURE_HASH,
            crate::config::BLOB_STORE_REVISION_EVENT
        );
    }

    #[test]
    fn shared_calls_have_one_selector() {
        assert_eq!(BlobLog::storeBlobCall::SELECTOR, BlobState::storeBlobCall::SELECTOR);
        assert_eq!(BlobLog::blobExistsCall::SELECTOR, BlobState::blobExistsCall::SELECTOR);
    }

    #[test]
    fn returns_decode_through_generated_types() {
        let word = FixedBytes::<20>::repeat_byte(0x11).abi_encode();
        let decoded = BlobStore::createWithNonceCall::abi_decode_returns(&word, true).unwrap();
        assert_eq!(decoded.blobId, FixedBytes::<20>::repeat_byte(0x11));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut data = Bytes::from_static(b"hello world").abi_encode();
        data.truncate(70);
        assert!(matches!(
            read_length_prefixed(&data, LOG_LENGTH_OFFSET),
            Err(AbiError::Truncated { needed: 75, available: 70 })
        ));
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut data = vec![0u8; 64];
        data[32] = 0x01;
        assert!(matches!(
            read_length_prefixed(&data, LOG_LENGTH_OFFSET),
            Err(AbiError::Overflow { offset: 32 })
        ));
    }

    #[test]
    fn call_check_matches_selector() {
        let call = BlobLog::storeBlobCall { blob: Bytes::new() }.abi_encode();
        assert!(expect_call::<BlobLog::storeBlobCall>(&call).is_ok());
        assert!(matches!(
            expect_call::<BlobStore::createWithNonceCall>(&call),
            Err(AbiError::WrongFunction { expected: "createWithNonce(bytes32,bytes)" })
        ));
        assert!(expect_call::<BlobLog::storeBlobCall>(&[1, 2]).is_err());
    }

    #[test]
    fn wide_uints_do_not_narrow() {
        assert_eq!(to_u64(U256::from(7u64)).unwrap(), 7);
        assert!(matches!(to_u64(U256::MAX), Err(AbiError::Uint(_))));
        assert_eq!(to_u64s(&[U256::from(1u64), U256::from(2u64)]).unwrap(), vec![1, 2]);
    }
}
