//! Currency - Type-safe fiat currency codes
//!
//! Processor profiles and purchases carry a settlement currency. Common
//! fiat currencies are pre-defined; anything else uses the `Other` fallback.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing currencies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("Empty currency code")]
    EmptyCode,

    #[error("Currency code too long (max 10 chars): {0}")]
    TooLong(String),

    #[error("Invalid currency code format: {0}")]
    InvalidFormat(String),
}

/// Fiat currency codes
///
/// # Examples
/// ```
/// use payvault_core::Currency;
///
/// let inr: Currency = "INR".parse().unwrap();
/// assert_eq!(inr, Currency::Inr);
/// assert_eq!(inr.to_string(), "INR");
///
/// let exotic: Currency = "KES".parse().unwrap();
/// assert!(matches!(exotic, Currency::Other(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    /// Indian Rupee (default settlement currency)
    Inr,
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// British Pound
    Gbp,
    /// Japanese Yen
    Jpy,
    /// UAE Dirham
    Aed,
    /// Singapore Dollar
    Sgd,
    /// Any other ISO-style code
    Other(String),
}

impl Currency {
    /// Returns the currency code as a string slice
    pub fn code(&self) -> &str {
        match self {
            Currency::Inr => "INR",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Aed => "AED",
            Currency::Sgd => "SGD",
            Currency::Other(s) => s.as_str(),
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Inr
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();

        if s.is_empty() {
            return Err(CurrencyError::EmptyCode);
        }

        if s.len() > 10 {
            return Err(CurrencyError::TooLong(s));
        }

        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CurrencyError::InvalidFormat(s));
        }

        Ok(match s.as_str() {
            "INR" => Currency::Inr,
            "USD" => Currency::Usd,
            "EUR" => Currency::Eur,
            "GBP" => Currency::Gbp,
            "JPY" => Currency::Jpy,
            "AED" => Currency::Aed,
            "SGD" => Currency::Sgd,
            _ => Currency::Other(s),
        })
    }
}

impl TryFrom<String> for Currency {
    type Error = CurrencyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.code().to_string()
    }
}
