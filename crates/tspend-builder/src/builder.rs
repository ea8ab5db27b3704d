// crates/tspend-builder/src/builder.rs
//
// Treasury spend assembly.
//
// The transaction is built with a zeroed OP_RETURN placeholder of the final
// size so the serialized size, and therefore the fee, is known before the
// commitment (which encodes the fee inclusive value in) is materialized.

use serde::Serialize;
use tracing::{debug, info, warn};

use tspend_core::crypto::{tspend_signature_script, SecretKeyBytes, TSPEND_SIGSCRIPT_SIZE};
use tspend_core::script::OP_RETURN_SCRIPT_SIZE;
use tspend_core::wire::{
    MAX_TX_IN_SEQUENCE, NULL_BLOCK_HEIGHT, NULL_BLOCK_INDEX, TX_VERSION_TREASURY,
};
use tspend_core::{
    check_output, check_tspend, fee_for_size, Amount, ChainParams, Hash, OutPoint,
    PolicyWarning, StakeAddress, Transaction, TspendError, TxIn, TxOut, WindowPolicy,
};

use crate::op_return::{commitment_script, OpReturnPolicy};

/// One disbursement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub address: StakeAddress,
    pub amount: Amount,
}

/// Where the expiry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirySource {
    /// Use this expiry as is.
    Explicit(u32),
    /// Derive the expiry from the chain tip height.
    Height(u64),
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub payouts: Vec<Payout>,
    /// Relay fee rate in atoms per kB.
    pub fee_rate_per_kb: i64,
    pub expiry: ExpirySource,
    pub op_return: OpReturnPolicy,
}

/// A signed, consensus checked treasury spend.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltTspend {
    pub tx: Transaction,
    pub hash: Hash,
    /// Hex encoded public key of the signer.
    pub signer: String,
    pub is_pi_key: bool,
    pub expiry: u32,
    /// Voting window, when the expiry maps onto one.
    pub vote_window: Option<(u32, u32)>,
    pub total_payout: Amount,
    pub fee: Amount,
    pub value_in: Amount,
    pub estimated_size: usize,
    pub size: usize,
    #[serde(skip)]
    pub warnings: Vec<PolicyWarning>,
}

impl BuiltTspend {
    pub fn to_hex(&self) -> String {
        self.tx.to_hex()
    }
}

pub struct TxBuilder<'a> {
    params: &'a ChainParams,
}

impl<'a> TxBuilder<'a> {
    pub fn new(params: &'a ChainParams) -> Self {
        Self { params }
    }

    /// Resolve the expiry for a request.
    pub fn resolve_expiry(&self, source: ExpirySource) -> Result<u32, TspendError> {
        let policy = WindowPolicy::new(self.params);
        match source {
            ExpirySource::Explicit(expiry) => policy.compute_expiry(0, Some(expiry)),
            ExpirySource::Height(height) => {
                info!("Next block height: {}", height + 1);
                policy.compute_expiry(height, None)
            }
        }
    }

    /// Assemble and sign a tspend. The secret key is wiped as soon as the
    /// signature is produced, whether or not signing succeeded.
    pub fn build(
        &self,
        req: &BuildRequest,
        secret: SecretKeyBytes,
    ) -> Result<BuiltTspend, TspendError> {
        let expiry = self.resolve_expiry(req.expiry)?;

        if req.payouts.is_empty() {
            return Err(TspendError::Config(
                "at least one payout must be specified".to_string(),
            ));
        }

        let mut tx = Transaction::new(TX_VERSION_TREASURY);
        tx.expiry = expiry;
        tx.outputs.push(TxOut::new(0, 0, vec![0u8; OP_RETURN_SCRIPT_SIZE]));

        let mut warnings = Vec::new();
        let mut total_payout = Amount::ZERO;
        for (i, payout) in req.payouts.iter().enumerate() {
            total_payout += payout.amount;
            let (version, script) = payout.address.pay_from_treasury_script();
            let txout = TxOut::new(payout.amount.atoms(), version, script);
            if let Err(e) = check_output(&txout, req.fee_rate_per_kb) {
                warn!(
                    "Output {} ({} atoms) failed check: {}",
                    payout.address,
                    payout.amount.atoms(),
                    e
                );
                warnings.push(PolicyWarning::Output {
                    index: i,
                    address: payout.address.to_string(),
                    amount: payout.amount.atoms(),
                    reason: e.to_string(),
                });
            }
            tx.outputs.push(txout);
        }

        tx.inputs.push(TxIn {
            previous_out_point: OutPoint::null(),
            sequence: MAX_TX_IN_SEQUENCE,
            value_in: 0,
            block_height: NULL_BLOCK_HEIGHT,
            block_index: NULL_BLOCK_INDEX,
            signature_script: Vec::new(),
        });

        let estimated_size = tx.serialize_size() + TSPEND_SIGSCRIPT_SIZE;
        let fee = fee_for_size(req.fee_rate_per_kb, estimated_size);
        let value_in = total_payout + fee;
        tx.inputs[0].value_in = value_in.atoms();
        debug!(
            "Estimated size {} bytes, fee {}, value in {}",
            estimated_size, fee, value_in
        );

        tx.outputs[0].pk_script = commitment_script(value_in, &req.op_return, &req.payouts)?;

        let sigscript = tspend_signature_script(&tx, &secret);
        drop(secret);
        tx.inputs[0].signature_script = sigscript?;

        let pubkey = check_tspend(&tx)
            .map_err(|e| TspendError::ConsensusCheck(format!("CheckTSpend failed: {}", e)))?;
        let signer = hex::encode(pubkey);
        let is_pi_key = self.params.is_pi_key(&pubkey);
        if !is_pi_key {
            warn!(
                "Signing key {} does not correspond to a Pi key for network {}",
                signer, self.params.name
            );
            warnings.push(PolicyWarning::UnknownPiKey(signer.clone()));
        }

        let vote_window = WindowPolicy::new(self.params).window_for(expiry).ok();
        let size = tx.serialize_size();
        Ok(BuiltTspend {
            hash: tx.tx_hash(),
            tx,
            signer,
            is_pi_key,
            expiry,
            vote_window,
            total_payout,
            fee,
            value_in,
            estimated_size,
            size,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tspend_core::crypto::{generate_secret_key, public_key_from_secret};
    use tspend_core::params::SIMNET_PI_KEY;
    use tspend_core::{Address, AddressKind};
    use zeroize::Zeroizing;

    fn payout(params: &ChainParams, byte: u8, atoms: i64) -> Payout {
        let addr = Address::new(AddressKind::PubKeyHash, [byte; 20], params);
        Payout {
            address: StakeAddress::try_from(addr).unwrap(),
            amount: Amount(atoms),
        }
    }

    fn request(payouts: Vec<Payout>) -> BuildRequest {
        BuildRequest {
            payouts,
            fee_rate_per_kb: 10_000,
            expiry: ExpirySource::Explicit(4610),
            op_return: OpReturnPolicy::Deterministic { extra: Vec::new() },
        }
    }

    #[test]
    fn test_estimated_size_matches_final() {
        let params = ChainParams::mainnet();
        let req = request(vec![payout(&params, 1, 100_000_000)]);
        let built = TxBuilder::new(&params)
            .build(&req, generate_secret_key())
            .unwrap();
        assert_eq!(built.size, built.estimated_size);
        assert_eq!(built.tx.serialize().len(), built.estimated_size);
        assert_eq!(built.fee, fee_for_size(10_000, built.estimated_size));
    }

    #[test]
    fn test_value_in_balances() {
        let params = ChainParams::mainnet();
        let req = request(vec![
            payout(&params, 1, 100_000_000),
            payout(&params, 2, 250_000_000),
        ]);
        let built = TxBuilder::new(&params)
            .build(&req, generate_secret_key())
            .unwrap();
        let sum: i64 = built.tx.outputs.iter().skip(1).map(|o| o.value).sum();
        assert_eq!(sum + built.fee.atoms(), built.tx.inputs[0].value_in);
        assert_eq!(built.total_payout + built.fee, built.value_in);
        assert_eq!(built.tx.outputs.len(), 3);
    }

    #[test]
    fn test_empty_payouts_rejected() {
        let params = ChainParams::mainnet();
        let req = request(Vec::new());
        let err = TxBuilder::new(&params)
            .build(&req, generate_secret_key())
            .unwrap_err();
        assert!(matches!(err, TspendError::Config(_)));
    }

    #[test]
    fn test_deterministic_build_is_reproducible() {
        let params = ChainParams::mainnet();
        let req = request(vec![payout(&params, 7, 500_000_000)]);
        let key = generate_secret_key();
        let a = TxBuilder::new(&params)
            .build(&req, Zeroizing::new(*key))
            .unwrap();
        let b = TxBuilder::new(&params).build(&req, key).unwrap();
        assert_eq!(a.to_hex(), b.to_hex());
    }

    #[test]
    fn test_dust_is_warning_not_error() {
        let params = ChainParams::mainnet();
        let req = request(vec![payout(&params, 1, 100)]);
        let built = TxBuilder::new(&params)
            .build(&req, generate_secret_key())
            .unwrap();
        assert!(built
            .warnings
            .iter()
            .any(|w| matches!(w, PolicyWarning::Output { index: 0, .. })));
    }

    #[test]
    fn test_simnet_pi_key_builds_without_warnings() {
        let params = ChainParams::simnet();
        let mut key = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(
            "de19ba3352830f3957b9f496ae5a92fc335b84f4cf007b34806f794ad2e3f139",
            key.as_mut_slice(),
        )
        .unwrap();
        assert_eq!(public_key_from_secret(&key), SIMNET_PI_KEY);

        let req = request(vec![payout(&params, 1, 100_000_000)]);
        let built = TxBuilder::new(&params).build(&req, key).unwrap();
        assert!(built.is_pi_key);
        assert!(built.warnings.is_empty());
    }

    #[test]
    fn test_pi_key_recognised() {
        let key = generate_secret_key();
        let pubkey = hex::encode(public_key_from_secret(&key));
        let params = ChainParams::mainnet().with_pi_keys(&[pubkey]).unwrap();
        let req = request(vec![payout(&params, 1, 100_000_000)]);
        let built = TxBuilder::new(&params).build(&req, key).unwrap();
        assert!(built.is_pi_key);
        assert!(built.warnings.is_empty());

        let other = TxBuilder::new(&params)
            .build(&req, generate_secret_key())
            .unwrap();
        assert!(!other.is_pi_key);
        assert!(other
            .warnings
            .iter()
            .any(|w| matches!(w, PolicyWarning::UnknownPiKey(_))));
    }

    #[test]
    fn test_expiry_from_height() {
        let params = ChainParams::mainnet();
        let builder = TxBuilder::new(&params);
        let expiry = builder.resolve_expiry(ExpirySource::Height(1000)).unwrap();
        assert_eq!(expiry, 1152 + 3456 + 2);
        let mut req = request(vec![payout(&params, 1, 100_000_000)]);
        req.expiry = ExpirySource::Height(1000);
        let built = builder.build(&req, generate_secret_key()).unwrap();
        assert_eq!(built.tx.expiry, expiry);
        assert_eq!(built.vote_window, Some((1152, 1152 + 3456)));
    }
}
