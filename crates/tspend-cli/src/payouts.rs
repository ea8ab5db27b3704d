// crates/tspend-cli/src/payouts.rs
//
// Payout loading from repeated --address/--amount flags or a CSV file.
//
// CSV records are `address,amount` with the amount in decimal coins. Blank
// lines and lines starting with '#' are skipped.

use std::fs;
use std::path::Path;

use tspend_builder::Payout;
use tspend_core::{Address, Amount, ChainParams, StakeAddress, TspendError};

fn stake_address(s: &str, params: &ChainParams, what: &str) -> Result<StakeAddress, TspendError> {
    let addr = Address::decode(s, params)
        .map_err(|e| TspendError::Config(format!("{} is not an address: {}", what, e)))?;
    StakeAddress::try_from(addr)
        .map_err(|e| TspendError::Config(format!("{} is not a stakeable address: {}", what, e)))
}

fn positive(amount: Amount, what: &str) -> Result<Amount, TspendError> {
    if amount.atoms() <= 0 {
        return Err(TspendError::Config(format!(
            "{} has a non-positive amount ({} atoms)",
            what,
            amount.atoms()
        )));
    }
    Ok(amount)
}

/// Pair up addresses with amounts given in atoms.
pub fn payouts_from_flags(
    addresses: &[String],
    amounts: &[i64],
    params: &ChainParams,
) -> Result<Vec<Payout>, TspendError> {
    if addresses.len() != amounts.len() {
        return Err(TspendError::Config(format!(
            "Number of addresses ({}) must match number of amounts ({})",
            addresses.len(),
            amounts.len()
        )));
    }
    addresses
        .iter()
        .zip(amounts)
        .enumerate()
        .map(|(i, (addr, atoms))| {
            let what = format!("address {}", i);
            Ok(Payout {
                address: stake_address(addr, params, &what)?,
                amount: positive(Amount::from_atoms(*atoms), &what)?,
            })
        })
        .collect()
}

/// Parse CSV payouts.
pub fn payouts_from_csv(data: &str, params: &ChainParams) -> Result<Vec<Payout>, TspendError> {
    let mut payouts = Vec::new();
    for (i, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 2 {
            return Err(TspendError::Config(format!(
                "record {} does not have 2 elements ({})",
                i,
                fields.len()
            )));
        }
        let address = stake_address(fields[0], params, &format!("record {}[0]", i))?;
        let coins: f64 = fields[1].parse().map_err(|e| {
            TspendError::Config(format!("record {}[1] is not a number: {}", i, e))
        })?;
        let amount = Amount::from_coins(coins)
            .map_err(|e| TspendError::Config(format!("record {}[1]: {}", i, e)))?;
        payouts.push(Payout {
            address,
            amount: positive(amount, &format!("record {}", i))?,
        });
    }
    Ok(payouts)
}

pub fn load_csv(path: &Path, params: &ChainParams) -> Result<Vec<Payout>, TspendError> {
    let data = fs::read_to_string(path).map_err(|e| {
        TspendError::Config(format!("unable to read CSV file {}: {}", path.display(), e))
    })?;
    payouts_from_csv(&data, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tspend_core::AddressKind;

    fn addr(kind: AddressKind, byte: u8, params: &ChainParams) -> String {
        Address::new(kind, [byte; 20], params).to_string()
    }

    #[test]
    fn test_flags() {
        let params = ChainParams::testnet();
        let addresses = vec![
            addr(AddressKind::PubKeyHash, 1, &params),
            addr(AddressKind::ScriptHash, 2, &params),
        ];
        let payouts = payouts_from_flags(&addresses, &[100_000_000, 5000], &params).unwrap();
        assert_eq!(payouts.len(), 2);
        assert_eq!(payouts[0].amount, Amount(100_000_000));
        assert_eq!(payouts[1].address.to_string(), addresses[1]);
    }

    #[test]
    fn test_flags_count_mismatch() {
        let params = ChainParams::testnet();
        let addresses = vec![addr(AddressKind::PubKeyHash, 1, &params)];
        let err = payouts_from_flags(&addresses, &[1, 2], &params).unwrap_err();
        assert!(err.to_string().contains("must match"));
    }

    #[test]
    fn test_rejects_non_stake_and_wrong_network() {
        let params = ChainParams::mainnet();
        let ed = vec![addr(AddressKind::PubKeyHashEd25519, 3, &params)];
        assert!(matches!(
            payouts_from_flags(&ed, &[1000], &params),
            Err(TspendError::Config(_))
        ));

        let testnet = vec![addr(AddressKind::PubKeyHash, 3, &ChainParams::testnet())];
        assert!(payouts_from_flags(&testnet, &[1000], &params).is_err());
    }

    #[test]
    fn test_rejects_non_positive() {
        let params = ChainParams::simnet();
        let a = vec![addr(AddressKind::PubKeyHash, 4, &params)];
        assert!(payouts_from_flags(&a, &[0], &params).is_err());
        assert!(payouts_from_flags(&a, &[-5], &params).is_err());
    }

    #[test]
    fn test_csv() {
        let params = ChainParams::simnet();
        let data = format!(
            "# payouts\n{},1.5\n\n{}, 0.00000001\n",
            addr(AddressKind::PubKeyHash, 5, &params),
            addr(AddressKind::ScriptHash, 6, &params)
        );
        let payouts = payouts_from_csv(&data, &params).unwrap();
        assert_eq!(payouts.len(), 2);
        assert_eq!(payouts[0].amount, Amount(150_000_000));
        assert_eq!(payouts[1].amount, Amount(1));
    }

    #[test]
    fn test_csv_bad_records() {
        let params = ChainParams::simnet();
        let a = addr(AddressKind::PubKeyHash, 7, &params);
        assert!(payouts_from_csv(&format!("{},1,2", a), &params).is_err());
        assert!(payouts_from_csv(&format!("{},abc", a), &params).is_err());
        assert!(payouts_from_csv(&format!("{},NaN", a), &params).is_err());
        assert!(payouts_from_csv(&format!("{},-1", a), &params).is_err());
        assert!(payouts_from_csv("notanaddress,1", &params).is_err());
    }

    #[test]
    fn test_load_csv_file() {
        let params = ChainParams::testnet();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payouts.csv");
        fs::write(&path, format!("{},2\n", addr(AddressKind::PubKeyHash, 8, &params))).unwrap();
        let payouts = load_csv(&path, &params).unwrap();
        assert_eq!(payouts[0].amount, Amount(200_000_000));
        assert!(load_csv(&dir.path().join("missing.csv"), &params).is_err());
    }
}
