//! PayVault Core - Domain types
//!
//! This crate contains the fundamental types used across PayVault:
//! - `Amount`: Non-negative decimal wrapper for monetary values
//! - `Currency`: Type-safe fiat currency codes

pub mod amount;
pub mod currency;

pub use amount::Amount;
pub use currency::Currency;
