// crates/tspend-core/src/script.rs
//
// The handful of output script forms treasury spends deal with: the
// OP_RETURN commitment, OP_TGEN-tagged pay-from-treasury scripts and generic
// null-data detection.

pub const OP_0: u8 = 0x00;
pub const OP_DATA_20: u8 = 0x14;
pub const OP_DATA_32: u8 = 0x20;
pub const OP_DATA_33: u8 = 0x21;
pub const OP_DATA_65: u8 = 0x41;
pub const OP_DATA_75: u8 = 0x4b;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
/// Tags an output as created by a treasury generation (spend).
pub const OP_TGEN: u8 = 0xc3;

pub const MAX_SCRIPT_SIZE: usize = 16384;
pub const MAX_DATA_CARRIER_SIZE: usize = 256;

/// Length of the tspend OP_RETURN payload (value in + entropy/commitment).
pub const OP_RETURN_PAYLOAD_SIZE: usize = 32;
/// OP_RETURN OP_DATA_32 <32 bytes>.
pub const OP_RETURN_SCRIPT_SIZE: usize = 2 + OP_RETURN_PAYLOAD_SIZE;
/// Leading payload bytes holding the little-endian value in.
pub const VALUE_IN_SIZE: usize = 8;
/// Payload bytes after the value in.
pub const ENTROPY_SIZE: usize = OP_RETURN_PAYLOAD_SIZE - VALUE_IN_SIZE;

pub const HASH160_SIZE: usize = 20;

/// Destination types a treasury spend can pay to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreasuryPayoutKind {
    PubKeyHash,
    ScriptHash,
}

/// `OP_TGEN OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn pay_from_treasury_pubkey_hash(hash: &[u8; HASH160_SIZE]) -> Vec<u8> {
    let mut script = Vec::with_capacity(26);
    script.extend_from_slice(&[OP_TGEN, OP_DUP, OP_HASH160, OP_DATA_20]);
    script.extend_from_slice(hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

/// `OP_TGEN OP_HASH160 <hash> OP_EQUAL`
pub fn pay_from_treasury_script_hash(hash: &[u8; HASH160_SIZE]) -> Vec<u8> {
    let mut script = Vec::with_capacity(24);
    script.extend_from_slice(&[OP_TGEN, OP_HASH160, OP_DATA_20]);
    script.extend_from_slice(hash);
    script.push(OP_EQUAL);
    script
}

/// Recognise a pay-from-treasury script and return its destination.
pub fn parse_pay_from_treasury(script: &[u8]) -> Option<(TreasuryPayoutKind, [u8; HASH160_SIZE])> {
    let mut hash = [0u8; HASH160_SIZE];
    match script {
        [OP_TGEN, OP_DUP, OP_HASH160, OP_DATA_20, body @ .., OP_EQUALVERIFY, OP_CHECKSIG]
            if body.len() == HASH160_SIZE =>
        {
            hash.copy_from_slice(body);
            Some((TreasuryPayoutKind::PubKeyHash, hash))
        }
        [OP_TGEN, OP_HASH160, OP_DATA_20, body @ .., OP_EQUAL] if body.len() == HASH160_SIZE => {
            hash.copy_from_slice(body);
            Some((TreasuryPayoutKind::ScriptHash, hash))
        }
        _ => None,
    }
}

/// `OP_RETURN OP_DATA_32 <payload>`
pub fn op_return_script(payload: &[u8; OP_RETURN_PAYLOAD_SIZE]) -> Vec<u8> {
    let mut script = Vec::with_capacity(OP_RETURN_SCRIPT_SIZE);
    script.push(OP_RETURN);
    script.push(OP_DATA_32);
    script.extend_from_slice(payload);
    script
}

/// Payload of a tspend OP_RETURN script, if the script has that exact form.
pub fn op_return_payload(script: &[u8]) -> Option<&[u8]> {
    match script {
        [OP_RETURN, OP_DATA_32, payload @ ..] if payload.len() == OP_RETURN_PAYLOAD_SIZE => {
            Some(payload)
        }
        _ => None,
    }
}

/// Length of the data pushed by the opcode at the start of `script`, along
/// with the size of the opcode plus its length prefix.
fn push_data_len(script: &[u8]) -> Option<(usize, usize)> {
    let op = *script.first()?;
    match op {
        OP_0 => Some((1, 0)),
        0x01..=OP_DATA_75 => Some((1, op as usize)),
        OP_PUSHDATA1 => Some((2, *script.get(1)? as usize)),
        OP_PUSHDATA2 => {
            let b = script.get(1..3)?;
            Some((3, u16::from_le_bytes([b[0], b[1]]) as usize))
        }
        OP_PUSHDATA4 => {
            let b = script.get(1..5)?;
            Some((5, u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize))
        }
        OP_1..=OP_16 => Some((1, 0)),
        _ => None,
    }
}

/// Standard null-data script: `OP_RETURN` optionally followed by exactly one
/// data push no larger than the data-carrier limit.
pub fn is_null_data(script: &[u8]) -> bool {
    match script.split_first() {
        Some((&OP_RETURN, [])) => true,
        Some((&OP_RETURN, rest)) => match push_data_len(rest) {
            Some((prefix, len)) => {
                len <= MAX_DATA_CARRIER_SIZE && prefix + len == rest.len()
            }
            None => false,
        },
        _ => false,
    }
}

/// Outputs that can never be spent: zero value, oversized, or starting with
/// OP_RETURN.
pub fn is_unspendable(amount: i64, script: &[u8]) -> bool {
    amount == 0 || script.len() > MAX_SCRIPT_SIZE || script.first() == Some(&OP_RETURN)
}
