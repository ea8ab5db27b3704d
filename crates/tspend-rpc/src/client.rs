// crates/tspend-rpc/src/client.rs
//
// JSON-RPC client for a dcrd node.
// POSTs JSON-RPC 1.0 envelopes over HTTPS using reqwest, with basic auth and
// the node's self-signed certificate added as a trust root.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, trace};

use tspend_core::{
    BestBlock, Block, BlockHeader, ChainInfo, ChainSource, Hash, Transaction, TreasuryBalance,
    TspendError, TspendVotes, VersionInfo, VoteTally,
};

/// Connection settings for the node's RPC interface.
#[derive(Debug, Clone, Default)]
pub struct RpcConfig {
    /// `host:port` of the RPC server.
    pub host: String,
    pub user: String,
    pub pass: String,
    /// PEM encoded certificate of the RPC server. When absent the system
    /// trust roots are used.
    pub cert_pem: Option<Vec<u8>>,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Decode a response body. An `error` member wins over `result`.
pub(crate) fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T, TspendError> {
    let resp: RpcResponse = serde_json::from_str(body)?;
    if let Some(err) = resp.error {
        return Err(TspendError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    let result = resp.result.unwrap_or(Value::Null);
    Ok(serde_json::from_value(result)?)
}

// Node result shapes whose field names differ from ours.

#[derive(Debug, Deserialize)]
struct TspendVoteResult {
    hash: Hash,
    expiry: u32,
    votestart: u32,
    voteend: u32,
    yesvotes: u64,
    novotes: u64,
}

#[derive(Debug, Deserialize)]
struct TspendVotesResult {
    hash: Hash,
    height: u64,
    #[serde(default)]
    votes: Vec<TspendVoteResult>,
}

impl From<TspendVotesResult> for TspendVotes {
    fn from(r: TspendVotesResult) -> Self {
        TspendVotes {
            hash: r.hash,
            height: r.height,
            votes: r
                .votes
                .into_iter()
                .map(|v| VoteTally {
                    hash: v.hash,
                    expiry: v.expiry,
                    vote_start: v.votestart,
                    vote_end: v.voteend,
                    yes_votes: v.yesvotes,
                    no_votes: v.novotes,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChainInfoResult {
    chain: String,
    blocks: u64,
    bestblockhash: Hash,
}

#[derive(Debug, Deserialize)]
struct VersionResult {
    versionstring: String,
    major: u32,
    minor: u32,
    patch: u32,
}

/// Flatten the `version` map into a list sorted by component name.
fn versions_from_map(map: BTreeMap<String, VersionResult>) -> Vec<VersionInfo> {
    map.into_iter()
        .map(|(name, v)| VersionInfo {
            name,
            version_string: v.versionstring,
            major: v.major,
            minor: v.minor,
            patch: v.patch,
        })
        .collect()
}

/// dcrd JSON-RPC client.
#[derive(Debug)]
pub struct DcrdClient {
    url: String,
    user: String,
    pass: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl DcrdClient {
    pub fn new(config: &RpcConfig) -> Result<Self, TspendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(pem) = &config.cert_pem {
            let cert = reqwest::Certificate::from_pem(pem).map_err(|e| {
                TspendError::Config(format!("invalid RPC certificate: {}", e))
            })?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| TspendError::Config(format!("unable to build RPC client: {}", e)))?;

        let host = config.host.trim_end_matches('/');
        let url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            url,
            user: config.user.clone(),
            pass: config.pass.clone(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one RPC call and decode its result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, TspendError> {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        trace!("RPC request {} {}", method, request.params);

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.pass))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                TspendError::Connectivity(format!("RPC {} request failed: {}", method, e))
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TspendError::Connectivity(
                "RPC authentication failed (check rpcuser/rpcpass)".to_string(),
            ));
        }
        let body = response.text().await.map_err(|e| {
            TspendError::Connectivity(format!("RPC {} response read failed: {}", method, e))
        })?;

        // The node reports RPC errors with a non-2xx status and a JSON body.
        match parse_response(&body) {
            Ok(v) => Ok(v),
            Err(e @ TspendError::Rpc { .. }) => {
                debug!("RPC {} returned error: {}", method, e);
                Err(e)
            }
            Err(_) if !status.is_success() => Err(TspendError::Connectivity(format!(
                "RPC {} failed ({}): {}",
                method, status, body
            ))),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ChainSource for DcrdClient {
    async fn best_block(&self) -> Result<BestBlock, TspendError> {
        self.call("getbestblock", json!([])).await
    }

    async fn block_hash(&self, height: u64) -> Result<Hash, TspendError> {
        self.call("getblockhash", json!([height])).await
    }

    async fn block_header(&self, hash: &Hash) -> Result<BlockHeader, TspendError> {
        let hex: String = self
            .call("getblockheader", json!([hash.to_string(), false]))
            .await?;
        BlockHeader::from_hex(&hex)
    }

    async fn block(&self, hash: &Hash) -> Result<Block, TspendError> {
        let hex: String = self
            .call("getblock", json!([hash.to_string(), false]))
            .await?;
        Block::from_hex(&hex)
    }

    async fn treasury_balance(&self, hash: &Hash) -> Result<TreasuryBalance, TspendError> {
        self.call("gettreasurybalance", json!([hash.to_string(), true]))
            .await
    }

    async fn tspend_votes(&self) -> Result<TspendVotes, TspendError> {
        let result: TspendVotesResult = self.call("gettreasuryspendvotes", json!([])).await?;
        Ok(result.into())
    }

    async fn blockchain_info(&self) -> Result<ChainInfo, TspendError> {
        let r: ChainInfoResult = self.call("getblockchaininfo", json!([])).await?;
        Ok(ChainInfo {
            chain: r.chain,
            blocks: r.blocks,
            best_block_hash: r.bestblockhash,
        })
    }

    async fn node_versions(&self) -> Result<Vec<VersionInfo>, TspendError> {
        let map: BTreeMap<String, VersionResult> = self.call("version", json!([])).await?;
        Ok(versions_from_map(map))
    }

    async fn send_raw_transaction(&self, tx: &Transaction) -> Result<Hash, TspendError> {
        // Allow high fees: the fee rate was chosen explicitly by the caller.
        self.call("sendrawtransaction", json!([tx.to_hex(), true]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "000000000000000001d3b2ad4e06b0c1c1f9d3ad0a0ff1cbdd0e4cc8a2b1c3d4";

    #[test]
    fn test_parse_result() {
        let body = format!(
            r#"{{"result":{{"hash":"{}","height":512}},"error":null,"id":1}}"#,
            HASH
        );
        let best: BestBlock = parse_response(&body).unwrap();
        assert_eq!(best.height, 512);
        assert_eq!(best.hash.to_string(), HASH);
    }

    #[test]
    fn test_parse_error_object() {
        let body = r#"{"result":null,"error":{"code":-40,"message":"already have transaction"},"id":3}"#;
        let err = parse_response::<Hash>(body).unwrap_err();
        assert!(err.is_duplicate_tx());
        match err {
            TspendError::Rpc { code, message } => {
                assert_eq!(code, -40);
                assert_eq!(message, "already have transaction");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_garbage_is_encoding_error() {
        let err = parse_response::<BestBlock>("<html>nope</html>").unwrap_err();
        assert!(matches!(err, TspendError::Encoding(_)));
    }

    #[test]
    fn test_parse_treasury_balance() {
        let body = format!(
            r#"{{"result":{{"hash":"{}","height":100,"balance":5000000,"updates":[300,-1200]}},"error":null,"id":1}}"#,
            HASH
        );
        let tb: TreasuryBalance = parse_response(&body).unwrap();
        assert_eq!(tb.height, 100);
        assert_eq!(tb.balance.atoms(), 5_000_000);
        assert_eq!(tb.updates, vec![300, -1200]);
        assert_eq!(tb.negative_updates(), 1);
    }

    #[test]
    fn test_parse_tspend_votes() {
        let body = format!(
            r#"{{"result":{{"hash":"{h}","height":580000,"votes":[
                {{"hash":"{h}","expiry":581762,"votestart":578304,"voteend":581760,"yesvotes":4000,"novotes":500}}
            ]}},"error":null,"id":7}}"#,
            h = HASH
        );
        let r: TspendVotesResult = parse_response(&body).unwrap();
        let votes: TspendVotes = r.into();
        assert_eq!(votes.height, 580_000);
        assert_eq!(votes.votes.len(), 1);
        let v = &votes.votes[0];
        assert_eq!(v.expiry, 581_762);
        assert_eq!(v.vote_start, 578_304);
        assert_eq!(v.vote_end, 581_760);
        assert_eq!(v.yes_votes, 4000);
        assert_eq!(v.no_votes, 500);
    }

    #[test]
    fn test_parse_versions() {
        let body = r#"{"result":{
            "dcrdjsonrpcapi":{"versionstring":"8.0.0","major":8,"minor":0,"patch":0,"prerelease":"","buildmetadata":""},
            "dcrd":{"versionstring":"1.8.0+release","major":1,"minor":8,"patch":0,"prerelease":"","buildmetadata":"release"}
        },"error":null,"id":2}"#;
        let map: BTreeMap<String, VersionResult> = parse_response(body).unwrap();
        let versions = versions_from_map(map);
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].name, "dcrd");
        assert_eq!(versions[0].version_string, "1.8.0+release");
        assert_eq!(versions[1].name, "dcrdjsonrpcapi");
        assert_eq!(versions[1].major, 8);
    }

    #[test]
    fn test_url_defaults_to_https() {
        let client = DcrdClient::new(&RpcConfig {
            host: "localhost:9109".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.url(), "https://localhost:9109");

        let plain = DcrdClient::new(&RpcConfig {
            host: "http://127.0.0.1:19556/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(plain.url(), "http://127.0.0.1:19556");
    }
}
