// crates/tspend-core/src/lib.rs
//
// tspend-core: Core types, wire codec and policy rules for treasury spends.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines chain parameters, amounts, the transaction and block codec,
// treasury scripts and addresses, the tspend signature scheme and consensus
// check, expiry/window placement, relay policy, and the `ChainSource` trait.

pub mod address;
pub mod amount;
pub mod cancel;
pub mod chain;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod params;
pub mod policy;
pub mod script;
pub mod traits;
pub mod tspend;
pub mod window;
pub mod wire;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use tspend_core::ChainParams;`

// Chain parameters and amounts
pub use amount::{Amount, ATOMS_PER_COIN, MAX_AMOUNT};
pub use params::{ChainParams, Network, Ratio};

// Wire types
pub use hash::Hash;
pub use wire::{Block, BlockHeader, OutPoint, Transaction, TxIn, TxOut};

// Addresses
pub use address::{Address, AddressKind, StakeAddress};

// Chain data
pub use chain::{BestBlock, ChainInfo, TreasuryBalance, TspendVotes, VersionInfo, VoteTally};

// Policy
pub use policy::{check_output, fee_for_size, is_dust_amount, OutputError};
pub use window::{ExpiryRule, Placement, TreasuryVoteRule, WindowPolicy};

// Consensus check
pub use tspend::{check_tspend, is_tspend};

// Errors
pub use error::{PolicyWarning, TspendError};

// Traits
pub use traits::ChainSource;
