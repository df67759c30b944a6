//! Amount - Non-negative decimal wrapper for monetary values
//!
//! Every monetary value in PayVault (purchase prices, loan principals,
//! refunds) is non-negative, enforced at the type level. Values that
//! are charged or disbursed must additionally be non-zero; the
//! `positive` constructor rejects zero up front so callers at the edge
//! (CLI, request parsing) fail before reaching a store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when constructing amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    Negative(Decimal),

    #[error("Amount must be strictly positive: {0}")]
    NotPositive(Decimal),
}

/// A non-negative decimal amount.
///
/// # Invariant
/// The inner value is always >= 0, enforced by the constructors.
///
/// # Example
/// ```
/// use payvault_core::Amount;
/// use rust_decimal::Decimal;
///
/// let price = Amount::positive(Decimal::new(999, 0)).unwrap();
/// assert!(price.is_positive());
///
/// assert!(Amount::new(Decimal::new(-1, 0)).is_err());
/// assert!(Amount::positive(Decimal::ZERO).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Zero amount constant
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Amount, rejecting negative values.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::Negative(value));
        }
        Ok(Self(value))
    }

    /// Create an Amount that must be strictly positive.
    ///
    /// Purchase prices, refunds and loan principals are all non-zero.
    pub fn positive(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// Create an Amount without validation.
    ///
    /// The caller must ensure the value is non-negative. Use only for
    /// trusted sources (e.g., rows read from validated storage).
    #[inline]
    pub const fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// Get the inner Decimal value
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Check if the amount is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Check if the amount is strictly greater than zero
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checked addition
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction - None if the result would go negative
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        match self.0.checked_sub(other.0) {
            Some(d) if d >= Decimal::ZERO => Some(Amount(d)),
            _ => None,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}
