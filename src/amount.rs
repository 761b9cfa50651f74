//! Fixed-point amounts at 18-decimal scale
//!
//! Every monetary quantity (assets, shares, prices, AUM, fees) is an
//! arbitrary-precision integer. Ratios are computed as `a * SCALE / b` with
//! truncating division; no rounding correction is applied.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Number of decimals in the fixed-point representation
pub const SCALE_DECIMALS: u32 = 18;

/// Arbitrary-precision signed integer amount
///
/// Signed because locally accumulated deltas (e.g. a withdrawal of shares
/// received through an unindexed path) can transiently go below zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigInt);

impl Amount {
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    /// The canonical `1.0` at 18 decimals (10^18)
    pub fn scale() -> Self {
        Self(BigInt::from(10u8).pow(SCALE_DECIMALS))
    }

    pub fn from_i64(value: i64) -> Self {
        Self(BigInt::from(value))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// `self * SCALE / denominator`, truncating. `None` when denominator is zero.
    pub fn scaled_ratio(&self, denominator: &Amount) -> Option<Amount> {
        if denominator.is_zero() {
            return None;
        }
        Some(Amount(&self.0 * Self::scale().0 / &denominator.0))
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }
}

/// Unit price for an entity: `holdings * SCALE / shares`, or `SCALE` when no
/// shares are issued. Negative holdings price at zero.
pub fn unit_price(holdings: &Amount, shares: &Amount) -> Amount {
    if !shares.is_positive() {
        Amount::scale()
    } else if holdings.is_negative() {
        Amount::zero()
    } else {
        holdings.scaled_ratio(shares).unwrap_or_else(Amount::scale)
    }
}

impl From<BigInt> for Amount {
    fn from(value: BigInt) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigInt::from(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid amount literal: {0}")]
pub struct ParseAmountError(String);

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigInt::from_str(s.trim())
            .map(Amount)
            .map_err(|_| ParseAmountError(s.to_string()))
    }
}

impl Add<&Amount> for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl Sub<&Amount> for &Amount {
    type Output = Amount;

    fn sub(self, rhs: &Amount) -> Amount {
        Amount(&self.0 - &rhs.0)
    }
}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, rhs: &Amount) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<&Amount> for Amount {
    fn sub_assign(&mut self, rhs: &Amount) {
        self.0 -= &rhs.0;
    }
}

// Decimal strings keep JSON bodies readable and lossless past 2^53.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Int(i64),
            UInt(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Int(v) => Ok(Amount::from_i64(v)),
            Repr::UInt(v) => Ok(Amount::from(v)),
        }
    }
}
