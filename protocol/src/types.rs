//! Primitive chain types shared by every layer. Addresses, hashes and byte
//! strings come from `alloy-primitives`; [`BlockTag`] selects the state view
//! a query runs against.

use std::fmt;

use serde::{Serialize, Serializer};

pub use alloy_primitives::{Address, Bytes, TxHash, B256, U256};

// ---------------------------------------------------------------------------
// BlockTag
// ---------------------------------------------------------------------------

/// Which view of the chain a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    /// The most recently mined block.
    Latest,
    /// The tentative block assembled from the mempool.
    Pending,
    /// A specific mined block.
    Number(u64),
}

impl BlockTag {
    /// The JSON-RPC rendering: `"latest"`, `"pending"` or a hex quantity.
    pub fn to_rpc(&self) -> String {
        match self {
            Self::Latest => "latest".to_string(),
            Self::Pending => "pending".to_string(),
            Self::Number(n) => format!("0x{:x}", n),
        }
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            other => f.write_str(&other.to_rpc()),
        }
    }
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rpc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parsing_ignores_case() {
        let checksummed: Address = "0xe70e90fdD2B9d3e27BDd56ef249EE1D408F40BE2".parse().unwrap();
        let lower: Address = "0xe70e90fdd2b9d3e27bdd56ef249ee1d408f40be2".parse().unwrap();
        assert_eq!(checksummed, lower);
    }

    #[test]
    fn address_word_is_left_padded() {
        let word = Address::repeat_byte(0xab).into_word();
        assert!(word[..12].iter().all(|b| *b == 0));
        assert_eq!(&word[12..], &[0xab; 20]);
    }

    #[test]
    fn block_tags_render_for_rpc() {
        assert_eq!(BlockTag::Latest.to_rpc(), "latest");
        assert_eq!(BlockTag::Pending.to_rpc(), "pending");
        assert_eq!(BlockTag::Number(255).to_rpc(), "0xff");
        assert_eq!(serde_json::to_string(&BlockTag::Number(16)).unwrap(), "\"0x10\"");
        assert_eq!(BlockTag::Number(16).to_string(), "16");
    }
}
