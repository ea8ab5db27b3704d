// crates/tspend-core/src/traits.rs

use async_trait::async_trait;

use crate::chain::{BestBlock, ChainInfo, TreasuryBalance, TspendVotes, VersionInfo};
use crate::error::TspendError;
use crate::hash::Hash;
use crate::wire::{Block, BlockHeader, Transaction};

/// Read (and submit) access to a node's view of the chain.
///
/// Implemented by tspend-rpc (JSON-RPC client) and by in-memory chains in
/// tests. Callers issue one request at a time.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current chain tip.
    async fn best_block(&self) -> Result<BestBlock, TspendError>;

    /// Hash of the main chain block at `height`.
    async fn block_hash(&self, height: u64) -> Result<Hash, TspendError>;

    async fn block_header(&self, hash: &Hash) -> Result<BlockHeader, TspendError>;

    /// Full block including stake transactions.
    async fn block(&self, hash: &Hash) -> Result<Block, TspendError>;

    /// Treasury balance and the updates applied at `hash`.
    async fn treasury_balance(&self, hash: &Hash) -> Result<TreasuryBalance, TspendError>;

    /// Vote tallies of every tspend in the mempool.
    async fn tspend_votes(&self) -> Result<TspendVotes, TspendError>;

    async fn blockchain_info(&self) -> Result<ChainInfo, TspendError>;

    /// Versions of the node and its RPC API.
    async fn node_versions(&self) -> Result<Vec<VersionInfo>, TspendError>;

    /// Submit a transaction. Returns its hash.
    async fn send_raw_transaction(&self, tx: &Transaction) -> Result<Hash, TspendError>;
}
