//! # Blob Identifiers
//!
//! Every blob is addressed by a 32-byte identifier derived from its content.
//! The log contract uses the plain Keccak-256 of the bytes. The revisioned
//! contract picks the identifier itself from a flags/nonce salt and keeps
//! only 20 significant bytes; the trailing 12 are a reserved suffix that the
//! client always zeroes.
//!
//! ## Nonce probing
//!
//! The revisioned contract enforces global uniqueness on-chain, which the
//! client cannot predict offline. [`NonceCandidates`] yields a bounded
//! sequence of `flags ‖ nonce` salts (the first nonce is the content hash,
//! each next one is the hash of the previous). The submitter simulates a
//! create call per candidate and keeps the first one the contract accepts.
//! Candidates are proposals; the id the contract returns is the answer.
//!
//! Keccak-256 here is the original Keccak padding used by Ethereum, not
//! NIST SHA3-256. They differ, and mixing them up silently breaks lookups.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::hex::FromHexError;
use alloy_primitives::{FixedBytes, B256};
use serde::{Deserialize, Serialize};

use crate::config::{BLOB_STORE_ID_SIZE, FLAGS_PREFIX_SIZE, IDENTIFIER_SIZE};

/// Keccak-256, as used by Ethereum.
///
/// ```
/// use blobstore_protocol::identifier::keccak256;
///
/// let digest = keccak256(b"");
/// assert_eq!(digest[0], 0xc5);
/// ```
pub use alloy_primitives::keccak256;

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// Content-derived lookup key for a blob.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(B256);

impl Identifier {
    /// Wraps a raw 32-byte word.
    pub const fn new(bytes: [u8; IDENTIFIER_SIZE]) -> Self {
        Self(B256::new(bytes))
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_SIZE] {
        &self.0 .0
    }

    /// The word form. This is also the indexed topic value in event logs.
    pub fn as_word(&self) -> B256 {
        self.0
    }

    /// Returns a copy with the trailing `len` bytes zeroed.
    pub fn with_reserved_suffix(&self, len: usize) -> Self {
        let mut bytes = self.0;
        let keep = IDENTIFIER_SIZE.saturating_sub(len);
        bytes[keep..].fill(0);
        Self(bytes)
    }

    /// The first `len` bytes, for contracts that take a shorter id type.
    pub fn prefix(&self, len: usize) -> &[u8] {
        &self.0[..len.min(IDENTIFIER_SIZE)]
    }

    /// The `bytes20` argument the revisioned contract takes.
    pub fn short_id(&self) -> FixedBytes<BLOB_STORE_ID_SIZE> {
        FixedBytes::from_slice(&self.0[..BLOB_STORE_ID_SIZE])
    }

    /// Widens a revisioned-contract id; the reserved suffix is zero.
    pub fn from_short_id(id: FixedBytes<BLOB_STORE_ID_SIZE>) -> Self {
        Self(B256::right_padding_from(id.as_slice()))
    }
}

impl From<B256> for Identifier {
    fn from(word: B256) -> Self {
        Self(word)
    }
}

impl FromStr for Identifier {
    type Err = FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s).map(Self)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// How a contract version turns bytes into an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierScheme {
    /// `keccak256(blob)`.
    ContentHash,
    /// `keccak256(blob)` with the trailing `len` bytes zeroed, for the
    /// contract generation that fills the suffix in with a block number.
    ///
    /// None of the shipped [`ProtocolVersion`](crate::ProtocolVersion)s
    /// derive ids this way. It is the offline form of the reserved-suffix
    /// rule, for callers that hold such ids and need to recompute them:
    ///
    /// ```
    /// use blobstore_protocol::identifier::{derive_identifier, IdentifierScheme};
    ///
    /// let id = derive_identifier(b"blob", IdentifierScheme::ReservedSuffix { len: 12 }).unwrap();
    /// assert!(id.as_bytes()[20..].iter().all(|b| *b == 0));
    /// ```
    ReservedSuffix {
        /// Bytes reserved for a suffix the contract fills in.
        len: usize,
    },
    /// Chosen by the contract from a flags/nonce salt; see [`NonceCandidates`].
    NonceProbe {
        /// Bytes of the returned id the client must zero.
        reserved_suffix: usize,
    },
}

impl IdentifierScheme {
    /// Whether [`derive_identifier`] can compute the id without asking the
    /// chain. Mempool scans only work for offline schemes.
    pub fn is_offline(&self) -> bool {
        !matches!(self, Self::NonceProbe { .. })
    }
}

/// Derives the identifier for `blob` under an offline scheme.
///
/// Returns `None` for [`IdentifierScheme::NonceProbe`], whose ids only exist
/// once the contract has answered a simulated create.
pub fn derive_identifier(blob: &[u8], scheme: IdentifierScheme) -> Option<Identifier> {
    let hash = Identifier(keccak256(blob));
    match scheme {
        IdentifierScheme::ContentHash => Some(hash),
        IdentifierScheme::ReservedSuffix { len } => Some(hash.with_reserved_suffix(len)),
        IdentifierScheme::NonceProbe { .. } => None,
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// Mutability policy of a blob, fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobFlags {
    /// New revisions may be added.
    pub updatable: bool,
    /// Updates must append a revision instead of replacing the latest.
    pub enforce_revisions: bool,
    /// The owner may retract the blob.
    pub retractable: bool,
    /// Ownership may be transferred.
    pub transferable: bool,
    /// No owner is recorded.
    pub anonymous: bool,
}

impl BlobFlags {
    pub const UPDATABLE: u8 = 0x01;
    pub const ENFORCE_REVISIONS: u8 = 0x02;
    pub const RETRACTABLE: u8 = 0x04;
    pub const TRANSFERABLE: u8 = 0x08;
    pub const ANONYMOUS: u8 = 0x10;

    /// Packs the flags into their bit representation.
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.updatable {
            bits |= Self::UPDATABLE;
        }
        if self.enforce_revisions {
            bits |= Self::ENFORCE_REVISIONS;
        }
        if self.retractable {
            bits |= Self::RETRACTABLE;
        }
        if self.transferable {
            bits |= Self::TRANSFERABLE;
        }
        if self.anonymous {
            bits |= Self::ANONYMOUS;
        }
        bits
    }

    /// Unpacks a bit representation. Unknown bits are ignored.
    pub fn from_bits(bits: u8) -> Self {
        Self {
            updatable: bits & Self::UPDATABLE != 0,
            enforce_revisions: bits & Self::ENFORCE_REVISIONS != 0,
            retractable: bits & Self::RETRACTABLE != 0,
            transferable: bits & Self::TRANSFERABLE != 0,
            anonymous: bits & Self::ANONYMOUS != 0,
        }
    }

    /// The 4-byte big-endian prefix placed ahead of the creation nonce.
    pub fn prefix(&self) -> [u8; FLAGS_PREFIX_SIZE] {
        (self.bits() as u32).to_be_bytes()
    }
}

// ---------------------------------------------------------------------------
// NonceCandidates
// ---------------------------------------------------------------------------

/// Bounded iterator over `flags ‖ nonce[..28]` creation salts for a blob.
#[derive(Debug, Clone)]
pub struct NonceCandidates {
    prefix: [u8; FLAGS_PREFIX_SIZE],
    nonce: B256,
    remaining: u32,
}

impl NonceCandidates {
    /// Starts the sequence at `keccak256(blob)`, yielding at most `max` salts.
    pub fn new(blob: &[u8], flags: BlobFlags, max: u32) -> Self {
        Self {
            prefix: flags.prefix(),
            nonce: keccak256(blob),
            remaining: max,
        }
    }
}

impl Iterator for NonceCandidates {
    type Item = B256;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let mut salt = B256::ZERO;
        salt[..FLAGS_PREFIX_SIZE].copy_from_slice(&self.prefix);
        salt[FLAGS_PREFIX_SIZE..].copy_from_slice(&self.nonce[..32 - FLAGS_PREFIX_SIZE]);

        self.nonce = keccak256(self.nonce);
        Some(salt)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    #[test]
    fn keccak_matches_known_vectors() {
        assert_eq!(
            keccak256(b""),
            b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
        assert_eq!(
            keccak256(b"hello"),
            b256!("1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8")
        );
    }

    #[test]
    fn content_hash_is_deterministic() {
        let a = derive_identifier(b"hello", IdentifierScheme::ContentHash).unwrap();
        let b = derive_identifier(b"hello", IdentifierScheme::ContentHash).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_separates_inputs() {
        let a = derive_identifier(b"hello", IdentifierScheme::ContentHash).unwrap();
        let b = derive_identifier(b"hellp", IdentifierScheme::ContentHash).unwrap();
        let empty = derive_identifier(b"", IdentifierScheme::ContentHash).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, empty);
    }

    #[test]
    fn reserved_suffix_zeroes_tail_only() {
        let full = derive_identifier(b"blob", IdentifierScheme::ContentHash).unwrap();
        let short =
            derive_identifier(b"blob", IdentifierScheme::ReservedSuffix { len: 12 }).unwrap();
        assert_eq!(short.prefix(20), full.prefix(20));
        assert!(short.as_bytes()[20..].iter().all(|b| *b == 0));
    }

    #[test]
    fn nonce_probe_is_not_offline() {
        let scheme = IdentifierScheme::NonceProbe { reserved_suffix: 12 };
        assert!(!scheme.is_offline());
        assert!(derive_identifier(b"x", scheme).is_none());
        assert!(IdentifierScheme::ContentHash.is_offline());
    }

    #[test]
    fn short_ids_widen_with_a_zero_suffix() {
        let id = Identifier::from_short_id(FixedBytes::repeat_byte(0xff));
        assert_eq!(id.prefix(20), &[0xff; 20]);
        assert!(id.as_bytes()[20..].iter().all(|b| *b == 0));
        assert_eq!(id.short_id(), FixedBytes::<20>::repeat_byte(0xff));
        assert_eq!(id.with_reserved_suffix(12), id);
    }

    #[test]
    fn identifier_hex_round_trip() {
        let id = derive_identifier(b"hello", IdentifierScheme::ContentHash).unwrap();
        let text = id.to_string();
        assert!(text.starts_with("0x1c8aff95"));
        assert_eq!(text.parse::<Identifier>().unwrap(), id);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{text}\""));
        assert_eq!(serde_json::from_str::<Identifier>(&json).unwrap(), id);
    }

    #[test]
    fn flag_bits_pack_in_the_last_prefix_byte() {
        let flags = BlobFlags {
            updatable: true,
            transferable: true,
            ..BlobFlags::default()
        };
        assert_eq!(flags.bits(), 0x09);
        assert_eq!(flags.prefix(), [0, 0, 0, 0x09]);
        assert_eq!(BlobFlags::from_bits(0x09), flags);
        assert_eq!(BlobFlags::from_bits(0x1f).bits(), 0x1f);
    }

    #[test]
    fn nonce_candidates_start_from_content_hash() {
        let flags = BlobFlags {
            anonymous: true,
            ..BlobFlags::default()
        };
        let mut candidates = NonceCandidates::new(b"hello", flags, 3);
        let first = candidates.next().unwrap();

        assert_eq!(&first[..4], &[0, 0, 0, 0x10]);
        assert_eq!(&first[4..], &keccak256(b"hello")[..28]);

        let second = candidates.next().unwrap();
        let rehashed = keccak256(keccak256(b"hello"));
        assert_eq!(&second[4..], &rehashed[..28]);
    }

    #[test]
    fn nonce_candidates_are_bounded() {
        let candidates = NonceCandidates::new(b"hello", BlobFlags::default(), 4);
        assert_eq!(candidates.size_hint(), (4, Some(4)));
        let all: Vec<_> = candidates.collect();
        assert_eq!(all.len(), 4);
        assert_eq!(NonceCandidates::new(b"x", BlobFlags::default(), 0).count(), 0);
    }
}
