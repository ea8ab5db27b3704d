// crates/tspend-builder/src/publish.rs
//
// Broadcasting a built tspend.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tspend_core::cancel::cancellable;
use tspend_core::{ChainSource, Hash, Transaction, TspendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishOutcome {
    Published(Hash),
    /// The node already had the transaction. Republishing is idempotent so
    /// this counts as success.
    Duplicate,
}

/// Submit a tspend to the node.
pub async fn publish<C: ChainSource + ?Sized>(
    chain: &C,
    tx: &Transaction,
    cancel: &CancellationToken,
) -> Result<PublishOutcome, TspendError> {
    match cancellable(cancel, chain.send_raw_transaction(tx)).await {
        Ok(hash) => {
            info!("Published tspend {}", hash);
            Ok(PublishOutcome::Published(hash))
        }
        Err(e) if e.is_duplicate_tx() => {
            warn!("Node already has tspend {}", tx.tx_hash());
            Ok(PublishOutcome::Duplicate)
        }
        Err(e) => Err(e.context("failed to publish tspend")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tspend_core::error::RPC_ERR_DUPLICATE_TX;
    use tspend_core::{
        BestBlock, Block, BlockHeader, ChainInfo, TreasuryBalance, TspendVotes, VersionInfo,
    };

    /// A node that only answers `send_raw_transaction`.
    struct Submitter {
        code: Option<i64>,
        unreachable: bool,
    }

    #[async_trait]
    impl ChainSource for Submitter {
        async fn best_block(&self) -> Result<BestBlock, TspendError> {
            Err(TspendError::NotFound("best block".into()))
        }
        async fn block_hash(&self, _height: u64) -> Result<Hash, TspendError> {
            Err(TspendError::NotFound("block hash".into()))
        }
        async fn block_header(&self, _hash: &Hash) -> Result<BlockHeader, TspendError> {
            Err(TspendError::NotFound("header".into()))
        }
        async fn block(&self, _hash: &Hash) -> Result<Block, TspendError> {
            Err(TspendError::NotFound("block".into()))
        }
        async fn treasury_balance(&self, _hash: &Hash) -> Result<TreasuryBalance, TspendError> {
            Err(TspendError::NotFound("balance".into()))
        }
        async fn tspend_votes(&self) -> Result<TspendVotes, TspendError> {
            Err(TspendError::NotFound("votes".into()))
        }
        async fn blockchain_info(&self) -> Result<ChainInfo, TspendError> {
            Err(TspendError::NotFound("info".into()))
        }
        async fn node_versions(&self) -> Result<Vec<VersionInfo>, TspendError> {
            Ok(Vec::new())
        }
        async fn send_raw_transaction(&self, tx: &Transaction) -> Result<Hash, TspendError> {
            if self.unreachable {
                return Err(TspendError::Connectivity("connection refused".into()));
            }
            match self.code {
                None => Ok(tx.tx_hash()),
                Some(code) => Err(TspendError::Rpc {
                    code,
                    message: "rejected".into(),
                }),
            }
        }
    }

    fn tx() -> Transaction {
        let mut tx = Transaction::new(3);
        tx.expiry = 10;
        tx
    }

    #[tokio::test]
    async fn test_published() {
        let node = Submitter {
            code: None,
            unreachable: false,
        };
        let tx = tx();
        let out = publish(&node, &tx, &CancellationToken::new()).await.unwrap();
        assert_eq!(out, PublishOutcome::Published(tx.tx_hash()));
    }

    #[tokio::test]
    async fn test_duplicate_is_success() {
        let node = Submitter {
            code: Some(RPC_ERR_DUPLICATE_TX),
            unreachable: false,
        };
        let out = publish(&node, &tx(), &CancellationToken::new()).await.unwrap();
        assert_eq!(out, PublishOutcome::Duplicate);
    }

    #[tokio::test]
    async fn test_other_rejection_fails() {
        let node = Submitter {
            code: Some(-22),
            unreachable: false,
        };
        let err = publish(&node, &tx(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TspendError::Rpc { code: -22, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_node_stays_connectivity_error() {
        let node = Submitter {
            code: None,
            unreachable: true,
        };
        let err = publish(&node, &tx(), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            TspendError::Connectivity(m) => {
                assert_eq!(m, "failed to publish tspend: connection refused")
            }
            other => panic!("expected connectivity error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled() {
        let node = Submitter {
            code: None,
            unreachable: false,
        };
        let token = CancellationToken::new();
        token.cancel();
        let err = publish(&node, &tx(), &token).await.unwrap_err();
        assert!(matches!(err, TspendError::Cancelled));
    }
}
