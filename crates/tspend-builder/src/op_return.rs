// crates/tspend-builder/src/op_return.rs
//
// The tspend OP_RETURN commitment: 8 bytes of little-endian value in
// followed by 24 bytes of entropy, caller data or a deterministic hash over
// the payouts.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use tspend_core::script::{op_return_script, ENTROPY_SIZE, OP_RETURN_PAYLOAD_SIZE, VALUE_IN_SIZE};
use tspend_core::{Amount, TspendError};

use crate::builder::Payout;

/// Domain separation tag for deterministic commitments.
pub const DETERMINISTIC_TAG: &[u8] = b"tspend OP_RETURN";

/// Largest extra data mixed into a deterministic commitment.
pub const MAX_DETERMINISTIC_EXTRA: usize = 32;

/// How the 24 bytes after the value in are filled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OpReturnPolicy {
    /// Fresh randomness from the OS.
    #[default]
    Random,
    /// Caller supplied bytes (at most 24), zero padded.
    Explicit(Vec<u8>),
    /// Hash over the payouts and optional extra data, so independent
    /// signers on separate machines build the same transaction.
    Deterministic { extra: Vec<u8> },
}

impl OpReturnPolicy {
    /// Policy from the command line flags: `--opreturndata` is caller data
    /// unless deterministic mode is on, in which case it is extra hash input.
    pub fn from_flags(data_hex: Option<&str>, deterministic: bool) -> Result<Self, TspendError> {
        let data = match data_hex {
            Some(s) => hex::decode(s.trim())?,
            None => Vec::new(),
        };
        if deterministic {
            if data.len() > MAX_DETERMINISTIC_EXTRA {
                return Err(TspendError::Config(format!(
                    "deterministic OP_RETURN extra data is {} bytes, max {}",
                    data.len(),
                    MAX_DETERMINISTIC_EXTRA
                )));
            }
            return Ok(OpReturnPolicy::Deterministic { extra: data });
        }
        if data_hex.is_some() {
            if data.len() > ENTROPY_SIZE {
                return Err(TspendError::Config(format!(
                    "OP_RETURN data is {} bytes, max {}",
                    data.len(),
                    ENTROPY_SIZE
                )));
            }
            return Ok(OpReturnPolicy::Explicit(data));
        }
        Ok(OpReturnPolicy::Random)
    }
}

fn deterministic_entropy(payouts: &[Payout], extra: &[u8]) -> [u8; ENTROPY_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(DETERMINISTIC_TAG);
    for payout in payouts {
        let (version, script) = payout.address.pay_from_treasury_script();
        hasher.update((payout.amount.atoms() as u64).to_le_bytes());
        hasher.update(version.to_le_bytes());
        hasher.update(&script);
    }
    hasher.update(extra);
    let digest = hasher.finalize();
    let mut out = [0u8; ENTROPY_SIZE];
    out.copy_from_slice(&digest[..ENTROPY_SIZE]);
    out
}

/// Fill in the 32-byte payload.
pub fn commitment_payload(
    value_in: Amount,
    policy: &OpReturnPolicy,
    payouts: &[Payout],
) -> Result<[u8; OP_RETURN_PAYLOAD_SIZE], TspendError> {
    let mut payload = [0u8; OP_RETURN_PAYLOAD_SIZE];
    payload[..VALUE_IN_SIZE].copy_from_slice(&(value_in.atoms() as u64).to_le_bytes());
    let entropy = &mut payload[VALUE_IN_SIZE..];
    match policy {
        OpReturnPolicy::Random => OsRng.fill_bytes(entropy),
        OpReturnPolicy::Explicit(data) => {
            if data.len() > ENTROPY_SIZE {
                return Err(TspendError::Config(format!(
                    "OP_RETURN data is {} bytes, max {}",
                    data.len(),
                    ENTROPY_SIZE
                )));
            }
            entropy[..data.len()].copy_from_slice(data);
        }
        OpReturnPolicy::Deterministic { extra } => {
            if extra.len() > MAX_DETERMINISTIC_EXTRA {
                return Err(TspendError::Config(format!(
                    "deterministic OP_RETURN extra data is {} bytes, max {}",
                    extra.len(),
                    MAX_DETERMINISTIC_EXTRA
                )));
            }
            entropy.copy_from_slice(&deterministic_entropy(payouts, extra));
        }
    }
    Ok(payload)
}

/// Full OP_RETURN script for the commitment.
pub fn commitment_script(
    value_in: Amount,
    policy: &OpReturnPolicy,
    payouts: &[Payout],
) -> Result<Vec<u8>, TspendError> {
    Ok(op_return_script(&commitment_payload(value_in, policy, payouts)?))
}
