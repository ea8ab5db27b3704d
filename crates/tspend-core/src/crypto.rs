// crates/tspend-core/src/crypto.rs
//
// Treasury spend signature scheme.
//
// A tspend input carries exactly one signature script of fixed size:
//   OP_DATA_65 <64-byte Ed25519 signature || sighash type>
//   OP_DATA_33 <0xed || 32-byte Ed25519 public key>
// The signature commits to the sighash type, the transaction prefix and the
// witness with all signature scripts blanked. Ed25519 signing is
// deterministic, so the same key and transaction always produce the same
// script.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::TspendError;
use crate::hash::{sha256, Hash};
use crate::script::{OP_DATA_33, OP_DATA_65};
use crate::wire::Transaction;

pub const SECRET_KEY_SIZE: usize = 32;
/// Encoded public key length: suite tag + 32-byte key.
pub const PUBKEY_SIZE: usize = 33;
pub const PUBKEY_TAG_ED25519: u8 = 0xed;
pub const SIGNATURE_SIZE: usize = 64;
pub const SIG_HASH_ALL: u8 = 0x01;

/// OP_DATA_65 + [64-byte sig + sighash type] + OP_DATA_33 + [33-byte key].
pub const TSPEND_SIGSCRIPT_SIZE: usize = 1 + 65 + 1 + 33;

/// Secret key bytes wiped from memory when dropped, on every exit path.
pub type SecretKeyBytes = Zeroizing<[u8; SECRET_KEY_SIZE]>;

/// Encode a verifying key in the 33-byte tagged form.
pub fn encode_public_key(key: &VerifyingKey) -> [u8; PUBKEY_SIZE] {
    let mut out = [0u8; PUBKEY_SIZE];
    out[0] = PUBKEY_TAG_ED25519;
    out[1..].copy_from_slice(key.as_bytes());
    out
}

/// Decode a 33-byte tagged public key.
pub fn decode_public_key(bytes: &[u8]) -> Result<VerifyingKey, TspendError> {
    if bytes.len() != PUBKEY_SIZE || bytes[0] != PUBKEY_TAG_ED25519 {
        return Err(TspendError::Crypto(format!(
            "unsupported public key encoding ({} bytes)",
            bytes.len()
        )));
    }
    let mut raw = [0u8; 32];
    raw.copy_from_slice(&bytes[1..]);
    Ok(VerifyingKey::from_bytes(&raw)?)
}

/// Public key for the given secret key bytes.
pub fn public_key_from_secret(secret: &[u8; SECRET_KEY_SIZE]) -> [u8; PUBKEY_SIZE] {
    let signing_key = SigningKey::from_bytes(secret);
    encode_public_key(&signing_key.verifying_key())
}

/// Generate a fresh random secret key.
pub fn generate_secret_key() -> SecretKeyBytes {
    let signing_key = SigningKey::generate(&mut OsRng);
    Zeroizing::new(signing_key.to_bytes())
}

/// Message committed to by an input signature.
pub fn signature_hash(tx: &Transaction, hash_type: u8) -> Hash {
    let prefix_hash = sha256(&tx.serialize_prefix());
    let witness_hash = sha256(&tx.serialize_witness_for_signing());
    let mut msg = Vec::with_capacity(4 + 64);
    msg.extend_from_slice(&(hash_type as u32).to_le_bytes());
    msg.extend_from_slice(prefix_hash.as_bytes());
    msg.extend_from_slice(witness_hash.as_bytes());
    sha256(&msg)
}

/// Produce the signature script for a fully formed tspend.
pub fn tspend_signature_script(
    tx: &Transaction,
    secret: &[u8; SECRET_KEY_SIZE],
) -> Result<Vec<u8>, TspendError> {
    let signing_key = SigningKey::from_bytes(secret);
    let sighash = signature_hash(tx, SIG_HASH_ALL);
    let signature = signing_key.sign(sighash.as_bytes());
    let pubkey = encode_public_key(&signing_key.verifying_key());

    let mut script = Vec::with_capacity(TSPEND_SIGSCRIPT_SIZE);
    script.push(OP_DATA_65);
    script.extend_from_slice(&signature.to_bytes());
    script.push(SIG_HASH_ALL);
    script.push(OP_DATA_33);
    script.extend_from_slice(&pubkey);

    if script.len() != TSPEND_SIGSCRIPT_SIZE {
        return Err(TspendError::Crypto(format!(
            "signature script is {} bytes, expected {}",
            script.len(),
            TSPEND_SIGSCRIPT_SIZE
        )));
    }
    Ok(script)
}

/// Pieces of a tspend signature script.
#[derive(Debug, Clone)]
pub struct TspendSigScript {
    pub signature: [u8; SIGNATURE_SIZE],
    pub hash_type: u8,
    pub pubkey: [u8; PUBKEY_SIZE],
}

/// Split a signature script into signature, sighash type and public key.
pub fn parse_tspend_signature_script(script: &[u8]) -> Result<TspendSigScript, TspendError> {
    if script.len() != TSPEND_SIGSCRIPT_SIZE {
        return Err(TspendError::ConsensusCheck(format!(
            "signature script is {} bytes, expected {}",
            script.len(),
            TSPEND_SIGSCRIPT_SIZE
        )));
    }
    if script[0] != OP_DATA_65 || script[66] != OP_DATA_33 {
        return Err(TspendError::ConsensusCheck(
            "signature script is not <signature> <pubkey>".to_string(),
        ));
    }
    let mut signature = [0u8; SIGNATURE_SIZE];
    signature.copy_from_slice(&script[1..65]);
    let mut pubkey = [0u8; PUBKEY_SIZE];
    pubkey.copy_from_slice(&script[67..]);
    Ok(TspendSigScript {
        signature,
        hash_type: script[65],
        pubkey,
    })
}

/// Verify the signature in the first input of a tspend and return the
/// signer's encoded public key.
pub fn verify_tspend_signature(tx: &Transaction) -> Result<[u8; PUBKEY_SIZE], TspendError> {
    let txin = tx
        .inputs
        .first()
        .ok_or_else(|| TspendError::ConsensusCheck("transaction has no inputs".to_string()))?;
    let parts = parse_tspend_signature_script(&txin.signature_script)?;
    if parts.hash_type != SIG_HASH_ALL {
        return Err(TspendError::ConsensusCheck(format!(
            "invalid sighash type {:#x}",
            parts.hash_type
        )));
    }
    let key = decode_public_key(&parts.pubkey)
        .map_err(|e| TspendError::ConsensusCheck(e.to_string()))?;
    let sighash = signature_hash(tx, parts.hash_type);
    let signature = Signature::from_bytes(&parts.signature);
    key.verify(sighash.as_bytes(), &signature)
        .map_err(|_| TspendError::ConsensusCheck("invalid tspend signature".to_string()))?;
    Ok(parts.pubkey)
}
