// crates/tspend-rpc/src/lib.rs
//
// tspend-rpc: Node access for treasury spend tooling.
//
// Provides a JSON-RPC client implementing `ChainSource` against a dcrd node,
// and the connectivity/version check run before chain-dependent commands.

pub mod check;
pub mod client;

pub use check::{check_node, check_versions, CHECK_TIMEOUT, WANT_JSON_RPC_MAJOR};
pub use client::{DcrdClient, RpcConfig};
