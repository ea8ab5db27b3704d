// crates/tspend-core/src/tspend.rs
//
// Structural consensus rules for treasury spend transactions.

use crate::crypto::{parse_tspend_signature_script, verify_tspend_signature, PUBKEY_SIZE};
use crate::error::TspendError;
use crate::script::{op_return_payload, parse_pay_from_treasury, VALUE_IN_SIZE};
use crate::wire::{Transaction, MAX_TX_IN_SEQUENCE, TX_VERSION_TREASURY};

fn fail(msg: impl Into<String>) -> TspendError {
    TspendError::ConsensusCheck(msg.into())
}

/// Everything in `check_tspend` except signature verification.
fn check_tspend_structure(tx: &Transaction) -> Result<(), TspendError> {
    if tx.version != TX_VERSION_TREASURY {
        return Err(fail(format!(
            "invalid tspend version {} (want {})",
            tx.version, TX_VERSION_TREASURY
        )));
    }
    if tx.inputs.len() != 1 {
        return Err(fail(format!(
            "tspend must have exactly one input, has {}",
            tx.inputs.len()
        )));
    }
    if tx.outputs.len() < 2 {
        return Err(fail(format!(
            "tspend must have at least two outputs, has {}",
            tx.outputs.len()
        )));
    }
    if tx.lock_time != 0 {
        return Err(fail("tspend lock time must be zero"));
    }
    if tx.expiry == 0 {
        return Err(fail("tspend must have an expiry"));
    }

    let txin = &tx.inputs[0];
    if !txin.previous_out_point.is_null() {
        return Err(fail("tspend input must not reference a previous output"));
    }
    if txin.sequence != MAX_TX_IN_SEQUENCE {
        return Err(fail("tspend input must use the maximum sequence number"));
    }
    parse_tspend_signature_script(&txin.signature_script)?;

    let op_return = &tx.outputs[0];
    let payload = match op_return_payload(&op_return.pk_script) {
        Some(p) if op_return.version == 0 && op_return.value == 0 => p,
        _ => return Err(fail("first tspend output must be a zero value OP_RETURN commitment")),
    };
    let mut value_bytes = [0u8; VALUE_IN_SIZE];
    value_bytes.copy_from_slice(&payload[..VALUE_IN_SIZE]);
    let committed = u64::from_le_bytes(value_bytes);
    if committed != txin.value_in as u64 || txin.value_in < 0 {
        return Err(fail(format!(
            "OP_RETURN commits to value in {} but input declares {}",
            committed, txin.value_in
        )));
    }

    let mut total_out: i64 = 0;
    for (i, out) in tx.outputs.iter().enumerate().skip(1) {
        if out.version != 0 || parse_pay_from_treasury(&out.pk_script).is_none() {
            return Err(fail(format!(
                "output {} is not a pay-from-treasury script",
                i
            )));
        }
        if out.value <= 0 {
            return Err(fail(format!("output {} has non-positive value", i)));
        }
        total_out = total_out
            .checked_add(out.value)
            .ok_or_else(|| fail("output values overflow"))?;
    }
    if txin.value_in < total_out {
        return Err(fail(format!(
            "value in {} does not cover outputs {}",
            txin.value_in, total_out
        )));
    }
    Ok(())
}

/// Validate a signed treasury spend and return the signer's public key.
pub fn check_tspend(tx: &Transaction) -> Result<[u8; PUBKEY_SIZE], TspendError> {
    check_tspend_structure(tx)?;
    verify_tspend_signature(tx)
}

/// Whether a stake transaction has the shape of a treasury spend.
pub fn is_tspend(tx: &Transaction) -> bool {
    check_tspend_structure(tx).is_ok()
}
