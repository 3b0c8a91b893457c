//! Asset quantities at ledger precision.

use crate::errors::AmountError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fractional digits the ledger stores.
pub const DECIMAL_PLACES: u32 = 7;

/// Stroops in one whole unit.
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Non-negative quantity of an asset, counted in stroops.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(0);

    /// Largest representable quantity (used as the default trustline limit).
    pub const MAX: Amount = Amount(i64::MAX);

    /// Create from a raw stroop count.
    pub fn from_stroops(stroops: i64) -> Result<Self, AmountError> {
        if stroops < 0 {
            return Err(AmountError::Negative(Decimal::new(stroops, DECIMAL_PLACES)));
        }
        Ok(Self(stroops))
    }

    /// Convert a decimal quantity.
    ///
    /// Values with more significant fractional digits than the ledger keeps
    /// are rejected; trailing zeros are not significant.
    pub fn from_decimal(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value));
        }

        let normalized = value.normalize();
        if normalized.scale() > DECIMAL_PLACES {
            return Err(AmountError::TooPrecise {
                value,
                max_places: DECIMAL_PLACES,
            });
        }

        normalized
            .checked_mul(Decimal::from(STROOPS_PER_UNIT))
            .and_then(|stroops| stroops.to_i64())
            .map(|stroops| Self(stroops.max(0)))
            .ok_or(AmountError::Overflow(value))
    }

    /// Raw stroop count.
    pub fn stroops(self) -> i64 {
        self.0
    }

    /// Decimal value at ledger scale (always 7 fractional digits).
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, DECIMAL_PLACES)
    }

    /// `true` for zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction; `None` when the result would be negative.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0
            .checked_sub(other.0)
            .filter(|stroops| *stroops >= 0)
            .map(Amount)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| AmountError::Parse(e.to_string()))?;
        Self::from_decimal(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Balance of the tracked asset as reported by the ledger.
///
/// Zero is a real balance, distinct from having no balance entry at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(Amount);

impl Balance {
    /// Wrap an amount.
    pub fn new(amount: Amount) -> Self {
        Self(amount)
    }

    /// Decimal value with exactly 7 fractional digits.
    pub fn value(&self) -> Decimal {
        self.0.to_decimal()
    }

    /// Underlying amount.
    pub fn amount(&self) -> Amount {
        self.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
