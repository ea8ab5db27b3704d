// crates/tspend-core/src/policy.rs
//
// Relay policy: dust, output bounds and fee computation.

use thiserror::Error;

use crate::amount::{Amount, MAX_AMOUNT};
use crate::script::{is_null_data, is_unspendable};
use crate::wire::{var_int_size, TxOut};

/// Default minimum relay fee, in atoms per kB.
pub const DEFAULT_RELAY_FEE_PER_KB: i64 = 10_000;

/// Assumed size of the input that will eventually redeem an output.
const REDEEM_INPUT_SIZE: usize = 165;

/// Why an output would be rejected by relay policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    #[error("transaction output value of {0} is negative")]
    Negative(i64),
    #[error("transaction output value of {0} is higher than max allowed value of {max}", max = MAX_AMOUNT)]
    TooLarge(i64),
    #[error("transaction output is unspendable")]
    Unspendable,
    #[error("transaction output amount of {0} is dust")]
    Dust(i64),
}

/// An output is dust when the fee to spend it is more than a third of its
/// value at the given relay fee.
pub fn is_dust_amount(amount: i64, script_size: usize, relay_fee_per_kb: i64) -> bool {
    let total_size =
        8 + 2 + var_int_size(script_size as u64) + script_size + REDEEM_INPUT_SIZE;
    let total_size = total_size as i128;
    (amount as i128) * 1000 / (3 * total_size) < relay_fee_per_kb as i128
}

pub fn is_dust_output(output: &TxOut, relay_fee_per_kb: i64) -> bool {
    is_dust_amount(output.value, output.pk_script.len(), relay_fee_per_kb)
}

/// Check an output against relay policy. Null-data outputs are exempt from
/// the spendability and dust checks.
pub fn check_output(output: &TxOut, relay_fee_per_kb: i64) -> Result<(), OutputError> {
    if output.value < 0 {
        return Err(OutputError::Negative(output.value));
    }
    if output.value > MAX_AMOUNT {
        return Err(OutputError::TooLarge(output.value));
    }
    if is_null_data(&output.pk_script) {
        return Ok(());
    }
    if is_unspendable(output.value, &output.pk_script) {
        return Err(OutputError::Unspendable);
    }
    if is_dust_output(output, relay_fee_per_kb) {
        return Err(OutputError::Dust(output.value));
    }
    Ok(())
}

/// Minimum fee for a transaction of `serialized_size` bytes.
pub fn fee_for_size(relay_fee_per_kb: i64, serialized_size: usize) -> Amount {
    let mut fee = (relay_fee_per_kb as i128) * (serialized_size as i128) / 1000;
    if fee == 0 && relay_fee_per_kb > 0 {
        fee = relay_fee_per_kb as i128;
    }
    Amount(fee.clamp(0, MAX_AMOUNT as i128) as i64)
}
