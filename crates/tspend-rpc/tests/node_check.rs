// crates/tspend-rpc/tests/node_check.rs
//
// Node check against a scripted chain source.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tspend_core::{
    BestBlock, Block, BlockHeader, ChainInfo, ChainParams, ChainSource, Hash, Transaction,
    TreasuryBalance, TspendError, TspendVotes, VersionInfo,
};
use tspend_rpc::check_node;

struct ScriptedNode {
    chain: &'static str,
    api_major: u32,
    delay: Duration,
    fail_info: bool,
}

impl ScriptedNode {
    fn healthy(chain: &'static str) -> Self {
        Self {
            chain,
            api_major: 8,
            delay: Duration::ZERO,
            fail_info: false,
        }
    }
}

fn unused<T>() -> Result<T, TspendError> {
    Err(TspendError::NotFound("not scripted".to_string()))
}

#[async_trait]
impl ChainSource for ScriptedNode {
    async fn best_block(&self) -> Result<BestBlock, TspendError> {
        unused()
    }

    async fn block_hash(&self, _height: u64) -> Result<Hash, TspendError> {
        unused()
    }

    async fn block_header(&self, _hash: &Hash) -> Result<BlockHeader, TspendError> {
        unused()
    }

    async fn block(&self, _hash: &Hash) -> Result<Block, TspendError> {
        unused()
    }

    async fn treasury_balance(&self, _hash: &Hash) -> Result<TreasuryBalance, TspendError> {
        unused()
    }

    async fn tspend_votes(&self) -> Result<TspendVotes, TspendError> {
        unused()
    }

    async fn blockchain_info(&self) -> Result<ChainInfo, TspendError> {
        tokio::time::sleep(self.delay).await;
        if self.fail_info {
            return Err(TspendError::Rpc {
                code: -32603,
                message: "internal error".to_string(),
            });
        }
        Ok(ChainInfo {
            chain: self.chain.to_string(),
            blocks: 1000,
            best_block_hash: Hash::ZERO,
        })
    }

    async fn node_versions(&self) -> Result<Vec<VersionInfo>, TspendError> {
        Ok(vec![
            VersionInfo {
                name: "dcrd".to_string(),
                version_string: "1.8.1".to_string(),
                major: 1,
                minor: 8,
                patch: 1,
            },
            VersionInfo {
                name: "dcrdjsonrpcapi".to_string(),
                version_string: format!("{}.0.0", self.api_major),
                major: self.api_major,
                minor: 0,
                patch: 0,
            },
        ])
    }

    async fn send_raw_transaction(&self, _tx: &Transaction) -> Result<Hash, TspendError> {
        unused()
    }
}

#[tokio::test]
async fn test_check_passes() {
    let params = ChainParams::testnet();
    let node = ScriptedNode::healthy("testnet3");
    let version = check_node(&node, &params, false, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(version, "1.8.1");
}

#[tokio::test]
async fn test_network_mismatch() {
    let params = ChainParams::mainnet();
    let node = ScriptedNode::healthy("simnet");
    let err = check_node(&node, &params, false, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TspendError::Connectivity(_)));
    assert!(err.to_string().contains("want mainnet"));
}

#[tokio::test]
async fn test_unsupported_api_version() {
    let params = ChainParams::simnet();
    let node = ScriptedNode {
        api_major: 7,
        ..ScriptedNode::healthy("simnet")
    };
    let cancel = CancellationToken::new();
    assert!(matches!(
        check_node(&node, &params, false, &cancel).await,
        Err(TspendError::Connectivity(_))
    ));
    assert_eq!(check_node(&node, &params, true, &cancel).await.unwrap(), "1.8.1");
}

#[tokio::test]
async fn test_rpc_failure_becomes_connectivity() {
    let params = ChainParams::simnet();
    let node = ScriptedNode {
        fail_info: true,
        ..ScriptedNode::healthy("simnet")
    };
    let err = check_node(&node, &params, false, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TspendError::Connectivity(_)));
}

#[tokio::test(start_paused = true)]
async fn test_slow_node_times_out() {
    let params = ChainParams::simnet();
    let node = ScriptedNode {
        delay: Duration::from_secs(30),
        ..ScriptedNode::healthy("simnet")
    };
    let err = check_node(&node, &params, false, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TspendError::Connectivity(_)));
    assert!(err.to_string().contains("within 5s"));
}

#[tokio::test]
async fn test_cancelled_check() {
    let params = ChainParams::simnet();
    let node = ScriptedNode::healthy("simnet");
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        check_node(&node, &params, false, &cancel).await,
        Err(TspendError::Cancelled)
    ));
}
