// crates/tspend-core/src/address.rs
//
// Payment addresses.
//
// String form: a two character network/kind prefix followed by the hex
// encoding of the 20-byte destination hash and a 4-byte checksum (first four
// bytes of the double SHA-256 of prefix || hash).

use std::fmt;

use crate::error::TspendError;
use crate::hash::double_sha256;
use crate::params::{ChainParams, Network};
use crate::script::{
    pay_from_treasury_pubkey_hash, pay_from_treasury_script_hash, HASH160_SIZE,
};

const PREFIX_LEN: usize = 2;
const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// secp256k1 pubkey hash.
    PubKeyHash,
    /// Ed25519 pubkey hash.
    PubKeyHashEd25519,
    ScriptHash,
}

impl AddressKind {
    /// Whether outputs to this kind of address may appear in stake
    /// transactions (and therefore in treasury spends).
    pub fn is_stake_capable(&self) -> bool {
        matches!(self, AddressKind::PubKeyHash | AddressKind::ScriptHash)
    }

    fn prefix(&self, params: &ChainParams) -> &'static str {
        match self {
            AddressKind::PubKeyHash => params.address_prefixes.pubkey_hash,
            AddressKind::PubKeyHashEd25519 => params.address_prefixes.pubkey_hash_ed25519,
            AddressKind::ScriptHash => params.address_prefixes.script_hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    kind: AddressKind,
    hash: [u8; HASH160_SIZE],
    net: Network,
    prefix: &'static str,
}

fn checksum(prefix: &str, hash: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut data = Vec::with_capacity(prefix.len() + hash.len());
    data.extend_from_slice(prefix.as_bytes());
    data.extend_from_slice(hash);
    let digest = double_sha256(&data);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest.as_bytes()[..CHECKSUM_LEN]);
    out
}

impl Address {
    pub fn new(kind: AddressKind, hash: [u8; HASH160_SIZE], params: &ChainParams) -> Self {
        Self {
            kind,
            hash,
            net: params.net,
            prefix: kind.prefix(params),
        }
    }

    /// Decode an address, making sure it belongs to the given network.
    pub fn decode(s: &str, params: &ChainParams) -> Result<Self, TspendError> {
        let s = s.trim();
        if !s.is_ascii() || s.len() != PREFIX_LEN + 2 * (HASH160_SIZE + CHECKSUM_LEN) {
            return Err(TspendError::Encoding(format!(
                "malformed address {:?}",
                s
            )));
        }
        let (prefix, body) = s.split_at(PREFIX_LEN);
        let kind = [
            AddressKind::PubKeyHash,
            AddressKind::PubKeyHashEd25519,
            AddressKind::ScriptHash,
        ]
        .into_iter()
        .find(|k| k.prefix(params) == prefix)
        .ok_or_else(|| {
            TspendError::Encoding(format!(
                "address {} is not valid for network {}",
                s, params.name
            ))
        })?;

        let raw = hex::decode(body)?;
        let (hash_bytes, sum) = raw.split_at(HASH160_SIZE);
        if checksum(prefix, hash_bytes).as_slice() != sum {
            return Err(TspendError::Encoding(format!(
                "address {} has a bad checksum",
                s
            )));
        }
        let mut hash = [0u8; HASH160_SIZE];
        hash.copy_from_slice(hash_bytes);
        Ok(Self::new(kind, hash, params))
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn hash(&self) -> &[u8; HASH160_SIZE] {
        &self.hash
    }

    pub fn network(&self) -> Network {
        self.net
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sum = checksum(self.prefix, &self.hash);
        write!(
            f,
            "{}{}{}",
            self.prefix,
            hex::encode(self.hash),
            hex::encode(sum)
        )
    }
}

/// An address that is allowed to receive treasury funds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeAddress(Address);

impl StakeAddress {
    /// Script version and script paying to this address from the treasury.
    pub fn pay_from_treasury_script(&self) -> (u16, Vec<u8>) {
        let script = match self.0.kind {
            AddressKind::ScriptHash => pay_from_treasury_script_hash(&self.0.hash),
            _ => pay_from_treasury_pubkey_hash(&self.0.hash),
        };
        (0, script)
    }

    pub fn address(&self) -> &Address {
        &self.0
    }
}

impl TryFrom<Address> for StakeAddress {
    type Error = TspendError;

    fn try_from(addr: Address) -> Result<Self, Self::Error> {
        if !addr.kind.is_stake_capable() {
            return Err(TspendError::Config(format!(
                "address {} is not a stake capable address ({:?})",
                addr, addr.kind
            )));
        }
        Ok(StakeAddress(addr))
    }
}

impl fmt::Display for StakeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
