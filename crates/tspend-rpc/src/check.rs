// crates/tspend-rpc/src/check.rs
//
// Early node checks run before any chain-dependent work.
//
// These are perfunctory: the node may still change (e.g. restart on another
// network) afterwards. They exist so misconfiguration is reported up front.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tspend_core::cancel::cancellable;
use tspend_core::{ChainParams, ChainSource, TspendError, VersionInfo};

/// Required major version of the node's JSON-RPC API.
pub const WANT_JSON_RPC_MAJOR: u32 = 8;
/// Minimum minor version of the node's JSON-RPC API.
pub const WANT_JSON_RPC_MINOR: u32 = 0;

pub const RPC_API_COMPONENT: &str = "dcrdjsonrpcapi";
pub const NODE_COMPONENT: &str = "dcrd";

/// Upper bound on the whole check.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

fn find<'v>(versions: &'v [VersionInfo], name: &str) -> Option<&'v VersionInfo> {
    versions.iter().find(|v| v.name == name)
}

/// Validate the versions reported by the node and return the node's own
/// version string.
///
/// An unsupported RPC API version is an error unless `ignore_rpc_version`
/// is set, in which case it is only logged.
pub fn check_versions(
    versions: &[VersionInfo],
    ignore_rpc_version: bool,
) -> Result<String, TspendError> {
    let api = find(versions, RPC_API_COMPONENT).ok_or_else(|| {
        TspendError::Connectivity(format!(
            "node did not provide the '{}' version",
            RPC_API_COMPONENT
        ))
    })?;

    if api.major != WANT_JSON_RPC_MAJOR || api.minor < WANT_JSON_RPC_MINOR {
        let msg = format!(
            "node running on unsupported JSON-RPC API version (want {}.{} got {})",
            WANT_JSON_RPC_MAJOR, WANT_JSON_RPC_MINOR, api.version_string
        );
        if !ignore_rpc_version {
            return Err(TspendError::Connectivity(msg));
        }
        warn!("{} - ignoring as requested", msg);
    }

    let node = find(versions, NODE_COMPONENT).ok_or_else(|| {
        TspendError::Connectivity(format!(
            "node did not provide the '{}' version",
            NODE_COMPONENT
        ))
    })?;
    Ok(node.version_string.clone())
}

async fn verify<C: ChainSource + ?Sized>(
    chain: &C,
    params: &ChainParams,
    ignore_rpc_version: bool,
    cancel: &CancellationToken,
) -> Result<String, TspendError> {
    let info = cancellable(cancel, chain.blockchain_info())
        .await
        .map_err(|e| match e {
            TspendError::Cancelled => e,
            e => TspendError::Connectivity(format!(
                "unable to get blockchain info from node: {}",
                e
            )),
        })?;

    if info.chain != params.name {
        return Err(TspendError::Connectivity(format!(
            "network mismatch (want {}, node is on {})",
            params.name, info.chain
        )));
    }

    let versions = cancellable(cancel, chain.node_versions())
        .await
        .map_err(|e| match e {
            TspendError::Cancelled => e,
            e => TspendError::Connectivity(format!("unable to query node version: {}", e)),
        })?;

    check_versions(&versions, ignore_rpc_version)
}

/// Verify the node is reachable, on the selected network and speaking a
/// supported RPC API. Returns the node's version string.
pub async fn check_node<C: ChainSource + ?Sized>(
    chain: &C,
    params: &ChainParams,
    ignore_rpc_version: bool,
    cancel: &CancellationToken,
) -> Result<String, TspendError> {
    let version = tokio::time::timeout(
        CHECK_TIMEOUT,
        verify(chain, params, ignore_rpc_version, cancel),
    )
    .await
    .map_err(|_| {
        TspendError::Connectivity(format!(
            "node did not answer within {}s",
            CHECK_TIMEOUT.as_secs()
        ))
    })??;

    info!("Connected to node {} on {}", version, params.name);
    Ok(version)
}
