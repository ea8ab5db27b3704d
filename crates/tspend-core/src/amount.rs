// crates/tspend-core/src/amount.rs
//
// Coin amounts.
//
// The smallest unit is the "atom". 1 DCR = 10^8 atoms. Amounts are signed so
// that projections which go below zero (more spent than accrued) are
// representable; every on-chain value is non-negative.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::error::TspendError;

/// Number of atoms in one coin.
pub const ATOMS_PER_COIN: i64 = 100_000_000;

/// Maximum representable amount: 21 million coins.
pub const MAX_AMOUNT: i64 = 21_000_000 * ATOMS_PER_COIN;

/// Amount in atoms.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_atoms(atoms: i64) -> Self {
        Self(atoms)
    }

    /// Convert a decimal coin value into atoms, rounding half away from
    /// zero. Non-finite values are rejected.
    pub fn from_coins(coins: f64) -> Result<Self, TspendError> {
        if !coins.is_finite() {
            return Err(TspendError::Config(format!(
                "invalid coin amount: {}",
                coins
            )));
        }
        let atoms = (coins * ATOMS_PER_COIN as f64).round();
        if atoms.abs() > MAX_AMOUNT as f64 {
            return Err(TspendError::Config(format!(
                "amount {} exceeds the maximum of {} coins",
                coins,
                MAX_AMOUNT / ATOMS_PER_COIN
            )));
        }
        Ok(Self(atoms as i64))
    }

    pub fn atoms(&self) -> i64 {
        self.0
    }

    pub fn to_coins(&self) -> f64 {
        self.0 as f64 / ATOMS_PER_COIN as f64
    }

    /// This amount plus half of it again (the 150% spend allowance).
    pub fn with_allowance(&self) -> Self {
        Self(self.0 + self.0 / 2)
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / ATOMS_PER_COIN as u64;
        let frac = abs % ATOMS_PER_COIN as u64;
        if frac == 0 {
            write!(f, "{}{} DCR", sign, whole)
        } else {
            let frac_str = format!("{:08}", frac);
            let trimmed = frac_str.trim_end_matches('0');
            write!(f, "{}{}.{} DCR", sign, whole, trimmed)
        }
    }
}
