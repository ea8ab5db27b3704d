// crates/tspend-core/src/params.rs
//
// Per-network chain parameters relevant to treasury spends.
//
// Only the constants the treasury tooling needs are carried: vote interval
// timing, vote thresholds, subsidy schedule, maturity and address prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::TspendError;

/// The networks this tooling knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Simnet,
}

impl Network {
    pub fn params(&self) -> ChainParams {
        match self {
            Network::Mainnet => ChainParams::mainnet(),
            Network::Testnet => ChainParams::testnet(),
            Network::Simnet => ChainParams::simnet(),
        }
    }

    /// Default port of the node's RPC interface on this network.
    pub fn default_rpc_port(&self) -> u16 {
        match self {
            Network::Mainnet => 9109,
            Network::Testnet => 19109,
            Network::Simnet => 19556,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
            Network::Simnet => write!(f, "simnet"),
        }
    }
}

impl FromStr for Network {
    type Err = TspendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" | "testnet3" => Ok(Network::Testnet),
            "simnet" => Ok(Network::Simnet),
            other => Err(TspendError::Config(format!("unknown network: {}", other))),
        }
    }
}

/// A rational threshold `num / den`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub num: u64,
    pub den: u64,
}

impl Ratio {
    pub const fn new(num: u64, den: u64) -> Self {
        Self { num, den }
    }

    /// `floor(value * num / den)`.
    pub fn of_floor(&self, value: u64) -> u64 {
        value * self.num / self.den
    }

    /// `ceil(value * num / den)`.
    pub fn of_ceil(&self, value: u64) -> u64 {
        div_ceil(value * self.num, self.den)
    }
}

/// Integer division rounding up.
pub fn div_ceil(a: u64, b: u64) -> u64 {
    let r = a / b;
    if a % b > 0 {
        r + 1
    } else {
        r
    }
}

/// Address prefixes (two characters) for one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPrefixes {
    /// Pay-to-pubkey-hash (secp256k1 ECDSA). Stake capable.
    pub pubkey_hash: &'static str,
    /// Pay-to-pubkey-hash (Ed25519). Not stake capable.
    pub pubkey_hash_ed25519: &'static str,
    /// Pay-to-script-hash. Stake capable.
    pub script_hash: &'static str,
}

/// Built-in simnet Pi key. Simnet is a private test network, so the
/// matching secret key is public:
/// `de19ba3352830f3957b9f496ae5a92fc335b84f4cf007b34806f794ad2e3f139`.
pub const SIMNET_PI_KEY: [u8; 33] = [
    0xed, 0x06, 0x73, 0x98, 0xe4, 0xb3, 0x99, 0x3e, 0x05, 0x3d, 0x1e, 0xe1, 0xe7, 0xe4, 0x12, 0x6d,
    0x88, 0xda, 0x1d, 0x1a, 0x6d, 0xe7, 0xdc, 0xe9, 0x68, 0xc9, 0xc4, 0x05, 0x9f, 0x42, 0x85, 0x6e,
    0x13,
];

/// Immutable network constants.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainParams {
    pub net: Network,
    /// Chain name as reported by the node's `getblockchaininfo`.
    pub name: &'static str,
    /// Treasury vote interval (TVI), in blocks.
    pub treasury_vote_interval: u64,
    /// Number of TVIs a tspend vote lasts.
    pub treasury_vote_interval_multiplier: u64,
    /// Number of vote windows making up the expenditure policy window.
    pub treasury_expenditure_window: u64,
    pub votes_per_block: u64,
    /// Yes share required to approve a tspend.
    pub treasury_vote_required: Ratio,
    /// Share of all possible votes that must be cast.
    pub treasury_vote_quorum: Ratio,
    pub subsidy_reduction_interval: i64,
    pub base_subsidy: i64,
    pub mul_subsidy: i64,
    pub div_subsidy: i64,
    /// Proportion of the block subsidy going to the treasury, out of
    /// `total_subsidy_proportions`.
    pub treasury_subsidy_proportion: i64,
    pub total_subsidy_proportions: i64,
    pub coinbase_maturity: u64,
    pub target_time_per_block: Duration,
    pub address_prefixes: AddressPrefixes,
    /// Public keys authorized to sign treasury spends (33-byte encoding).
    pub pi_keys: Vec<Vec<u8>>,
}

impl ChainParams {
    pub fn mainnet() -> Self {
        Self {
            net: Network::Mainnet,
            name: "mainnet",
            treasury_vote_interval: 288,
            treasury_vote_interval_multiplier: 12,
            treasury_expenditure_window: 4,
            votes_per_block: 5,
            treasury_vote_required: Ratio::new(3, 5),
            treasury_vote_quorum: Ratio::new(1, 5),
            subsidy_reduction_interval: 6144,
            base_subsidy: 3_119_582_664,
            mul_subsidy: 100,
            div_subsidy: 101,
            treasury_subsidy_proportion: 1,
            total_subsidy_proportions: 10,
            coinbase_maturity: 256,
            target_time_per_block: Duration::from_secs(5 * 60),
            address_prefixes: AddressPrefixes {
                pubkey_hash: "Ds",
                pubkey_hash_ed25519: "De",
                script_hash: "Dc",
            },
            pi_keys: Vec::new(),
        }
    }

    pub fn testnet() -> Self {
        Self {
            net: Network::Testnet,
            name: "testnet3",
            treasury_vote_interval: 288,
            treasury_vote_interval_multiplier: 12,
            treasury_expenditure_window: 4,
            votes_per_block: 5,
            treasury_vote_required: Ratio::new(3, 5),
            treasury_vote_quorum: Ratio::new(1, 5),
            subsidy_reduction_interval: 2048,
            base_subsidy: 2_500_000_000,
            mul_subsidy: 100,
            div_subsidy: 101,
            treasury_subsidy_proportion: 1,
            total_subsidy_proportions: 10,
            coinbase_maturity: 16,
            target_time_per_block: Duration::from_secs(2 * 60),
            address_prefixes: AddressPrefixes {
                pubkey_hash: "Ts",
                pubkey_hash_ed25519: "Te",
                script_hash: "Tc",
            },
            pi_keys: Vec::new(),
        }
    }

    pub fn simnet() -> Self {
        Self {
            net: Network::Simnet,
            name: "simnet",
            treasury_vote_interval: 16,
            treasury_vote_interval_multiplier: 4,
            treasury_expenditure_window: 4,
            votes_per_block: 5,
            treasury_vote_required: Ratio::new(3, 5),
            treasury_vote_quorum: Ratio::new(1, 5),
            subsidy_reduction_interval: 128,
            base_subsidy: 50_000_000_000,
            mul_subsidy: 100,
            div_subsidy: 101,
            treasury_subsidy_proportion: 1,
            total_subsidy_proportions: 10,
            coinbase_maturity: 16,
            target_time_per_block: Duration::from_secs(1),
            address_prefixes: AddressPrefixes {
                pubkey_hash: "Ss",
                pubkey_hash_ed25519: "Se",
                script_hash: "Sc",
            },
            pi_keys: vec![SIMNET_PI_KEY.to_vec()],
        }
    }

    /// Add authorized Pi keys (hex encoded, 33 bytes each).
    pub fn with_pi_keys<S: AsRef<str>>(mut self, keys: &[S]) -> Result<Self, TspendError> {
        for key in keys {
            let bytes = hex::decode(key.as_ref().trim())?;
            if bytes.len() != crate::crypto::PUBKEY_SIZE {
                return Err(TspendError::Config(format!(
                    "Pi key {} is {} bytes, expected {}",
                    key.as_ref(),
                    bytes.len(),
                    crate::crypto::PUBKEY_SIZE
                )));
            }
            self.pi_keys.push(bytes);
        }
        Ok(self)
    }

    /// Length, in blocks, of the rolling window over which treasury
    /// expenditures are limited.
    pub fn policy_window_blocks(&self) -> u64 {
        self.treasury_vote_interval
            * self.treasury_vote_interval_multiplier
            * self.treasury_expenditure_window
    }

    pub fn blocks_per_day(&self) -> u64 {
        let secs = self.target_time_per_block.as_secs().max(1);
        24 * 60 * 60 / secs
    }

    pub fn is_pi_key(&self, pubkey: &[u8]) -> bool {
        self.pi_keys.iter().any(|k| k.as_slice() == pubkey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_policy_window() {
        let params = ChainParams::mainnet();
        assert_eq!(params.policy_window_blocks(), 288 * 12 * 4);
        assert_eq!(params.blocks_per_day(), 288);
    }

    #[test]
    fn test_network_from_str() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("testnet3".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!("SimNet".parse::<Network>().unwrap(), Network::Simnet);
        assert!("regnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_ratio() {
        let r = Ratio::new(3, 5);
        assert_eq!(r.of_floor(13438), 8062);
        assert_eq!(r.of_ceil(13438), 8063);
        assert_eq!(r.of_ceil(10), 6);
    }

    #[test]
    fn test_with_pi_keys() {
        let key = format!("ed{}", "11".repeat(32));
        let params = ChainParams::simnet().with_pi_keys(&[key.as_str()]).unwrap();
        assert!(params.is_pi_key(&hex::decode(&key).unwrap()));
        assert!(ChainParams::simnet().with_pi_keys(&["abcd"]).is_err());
    }

    #[test]
    fn test_simnet_ships_pi_key() {
        assert!(ChainParams::simnet().is_pi_key(&SIMNET_PI_KEY));
        assert!(!ChainParams::mainnet().is_pi_key(&SIMNET_PI_KEY));
        // Extra keys from the config file are added after the built-in one.
        let key = format!("ed{}", "11".repeat(32));
        let params = ChainParams::simnet().with_pi_keys(&[key]).unwrap();
        assert_eq!(params.pi_keys.len(), 2);
    }
}
