//! Coupon discounts applied at purchase time
//!
//! A discount is evaluated exactly once, when the purchase record is
//! built; the applied value lands in the record metadata and is never
//! recomputed.

use chrono::{DateTime, Utc};
use payvault_core::Amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the discount value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountKind {
    /// Value is a percentage of the amount (capped at 100)
    Percent,
    /// Value is a flat amount (capped at the purchase amount)
    Flat,
}

/// A coupon rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub name: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub active: bool,
    pub valid_from: DateTime<Utc>,
    /// None means no expiry
    pub valid_until: Option<DateTime<Utc>>,
    /// None means unlimited
    pub max_usage: Option<u32>,
    pub current_usage: u32,
}

impl Discount {
    pub fn percent(name: impl Into<String>, value: Decimal) -> Self {
        Self::new(name, DiscountKind::Percent, value)
    }

    pub fn flat(name: impl Into<String>, value: Decimal) -> Self {
        Self::new(name, DiscountKind::Flat, value)
    }

    fn new(name: impl Into<String>, kind: DiscountKind, value: Decimal) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.max(Decimal::ZERO),
            active: true,
            // No lower bound until with_validity narrows the window;
            // a fresh coupon must validate against any caller clock.
            valid_from: DateTime::<Utc>::MIN_UTC,
            valid_until: None,
            max_usage: None,
            current_usage: 0,
        }
    }

    pub fn with_validity(
        mut self,
        valid_from: DateTime<Utc>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        self
    }

    pub fn with_max_usage(mut self, max_usage: u32) -> Self {
        self.max_usage = Some(max_usage);
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether the coupon may be redeemed at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.active
            && now >= self.valid_from
            && self.valid_until.map_or(true, |until| now < until)
            && self.max_usage.map_or(true, |max| self.current_usage < max)
    }

    /// Apply the discount, returning `(net_amount, discount_applied)`.
    ///
    /// The net amount never goes below zero.
    pub fn apply(&self, amount: Amount) -> (Amount, Amount) {
        let gross = amount.value();
        let applied = match self.kind {
            DiscountKind::Percent => {
                let pct = self.value.min(Decimal::ONE_HUNDRED);
                gross * pct / Decimal::ONE_HUNDRED
            }
            DiscountKind::Flat => self.value.min(gross),
        };
        let applied = Amount::new_unchecked(applied);
        let net = amount.checked_sub(applied).unwrap_or(Amount::ZERO);
        (net, applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn amount(v: Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn test_percent_discount() {
        let discount = Discount::percent("SAVE10", dec!(10));
        let (net, applied) = discount.apply(amount(dec!(1000)));

        assert_eq!(net.value(), dec!(900));
        assert_eq!(applied.value(), dec!(100));
    }

    #[test]
    fn test_percent_capped_at_hundred() {
        let discount = Discount::percent("FREE", dec!(150));
        let (net, applied) = discount.apply(amount(dec!(500)));

        assert_eq!(net, Amount::ZERO);
        assert_eq!(applied.value(), dec!(500));
    }

    #[test]
    fn test_flat_discount() {
        let discount = Discount::flat("MINUS50", dec!(50));
        let (net, applied) = discount.apply(amount(dec!(999)));

        assert_eq!(net.value(), dec!(949));
        assert_eq!(applied.value(), dec!(50));
    }

    #[test]
    fn test_flat_discount_capped_at_amount() {
        let discount = Discount::flat("BIG", dec!(2000));
        let (net, applied) = discount.apply(amount(dec!(999)));

        assert_eq!(net, Amount::ZERO);
        assert_eq!(applied.value(), dec!(999));
    }

    #[test]
    fn test_negative_value_clamped() {
        let discount = Discount::flat("WEIRD", dec!(-10));
        let (net, applied) = discount.apply(amount(dec!(100)));

        assert_eq!(net.value(), dec!(100));
        assert!(applied.is_zero());
    }

    #[test]
    fn test_fresh_coupon_valid_against_earlier_clock() {
        // Callers capture `now` before constructing the coupon
        let now = Utc::now();
        let discount = Discount::percent("FRESH", dec!(10));

        assert!(discount.is_valid_at(now));
        let (net, _) = discount.apply(amount(dec!(1000)));
        assert_eq!(net.value(), dec!(900));
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let discount = Discount::percent("WINDOW", dec!(5))
            .with_validity(now - Duration::days(1), Some(now + Duration::days(1)));

        assert!(discount.is_valid_at(now));
        assert!(!discount.is_valid_at(now - Duration::days(2)));
        assert!(!discount.is_valid_at(now + Duration::days(2)));
    }

    #[test]
    fn test_inactive_discount_invalid() {
        let now = Utc::now();
        let discount = Discount::percent("OFF", dec!(5)).deactivated();
        assert!(!discount.is_valid_at(now));
    }

    #[test]
    fn test_usage_cap() {
        let now = Utc::now();
        let mut discount = Discount::percent("LIMITED", dec!(5)).with_max_usage(2);

        assert!(discount.is_valid_at(now));
        discount.current_usage = 2;
        assert!(!discount.is_valid_at(now));
    }
}
