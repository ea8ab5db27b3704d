// crates/tspend-core/src/chain.rs
//
// Chain data returned by a `ChainSource`.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::hash::Hash;

/// Hash and height of the current chain tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestBlock {
    pub hash: Hash,
    pub height: u64,
}

/// Treasury state at one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryBalance {
    pub hash: Hash,
    pub height: u64,
    /// Treasury balance after this block was connected.
    pub balance: Amount,
    /// Signed deltas applied by this block: positive for treasury adds and
    /// treasury bases, negative for treasury spends.
    #[serde(default)]
    pub updates: Vec<i64>,
}

impl TreasuryBalance {
    pub fn negative_updates(&self) -> usize {
        self.updates.iter().filter(|u| **u < 0).count()
    }
}

/// Vote tally for one tspend sitting in the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub hash: Hash,
    pub expiry: u32,
    pub vote_start: u32,
    pub vote_end: u32,
    pub yes_votes: u64,
    pub no_votes: u64,
}

/// Tallies for all mempool tspends as of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TspendVotes {
    pub hash: Hash,
    pub height: u64,
    pub votes: Vec<VoteTally>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Network name as reported by the node (e.g. "mainnet", "testnet3").
    pub chain: String,
    pub blocks: u64,
    pub best_block_hash: Hash,
}

/// Semantic version of one node component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub name: String,
    pub version_string: String,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_updates() {
        let tb = TreasuryBalance {
            hash: Hash::ZERO,
            height: 10,
            balance: Amount(100),
            updates: vec![50, -10, 0, -3],
        };
        assert_eq!(tb.negative_updates(), 2);
    }
}
