//! Entitlement policy - derived download rules
//!
//! All queries here are pure functions over a record snapshot. Nothing
//! is persisted, so the answers can never go stale relative to the
//! record they were computed from.

use crate::record::{PaymentStatus, PurchaseRecord};
use chrono::{DateTime, Utc};
use std::fmt;

/// Why a download was blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Payment is not in the completed state
    NotPaid,
    /// Download allowance used up
    AttemptsExhausted,
    /// Entitlement window has ended
    Expired,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotPaid => "not-paid",
            DenyReason::AttemptsExhausted => "attempts-exhausted",
            DenyReason::Expired => "expired",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the buyer may perform one more download right now
pub fn can_download(record: &PurchaseRecord, now: DateTime<Utc>) -> bool {
    deny_reason(record, now).is_none()
}

/// The first rule blocking a download, if any.
///
/// Checked in order: payment state, attempt allowance, expiry.
pub fn deny_reason(record: &PurchaseRecord, now: DateTime<Utc>) -> Option<DenyReason> {
    if record.payment_status != PaymentStatus::Completed {
        return Some(DenyReason::NotPaid);
    }
    if record.download_attempts >= record.max_downloads {
        return Some(DenyReason::AttemptsExhausted);
    }
    if now >= record.expires_at {
        return Some(DenyReason::Expired);
    }
    None
}

/// Downloads left in the allowance (floors at zero)
pub fn remaining_downloads(record: &PurchaseRecord) -> u32 {
    record.max_downloads.saturating_sub(record.download_attempts)
}

/// Whole days until expiry, rounded up. Negative after expiry.
pub fn days_until_expiry(record: &PurchaseRecord, now: DateTime<Utc>) -> i64 {
    let seconds = (record.expires_at - now).num_seconds();
    (seconds as f64 / 86_400.0).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{NewPurchase, PaymentGateway, PaymentMethod};
    use chrono::Duration;
    use payvault_core::Amount;
    use rust_decimal_macros::dec;

    fn record_at(now: DateTime<Utc>) -> PurchaseRecord {
        NewPurchase::new(
            "USER-001",
            "PROD-001",
            "TXN-ENT00000001",
            Amount::new(dec!(499)).unwrap(),
            PaymentMethod::Card,
            PaymentGateway::Stripe,
        )
        .build(now)
    }

    #[test]
    fn test_pending_purchase_cannot_download() {
        let now = Utc::now();
        let record = record_at(now);

        assert!(!can_download(&record, now));
        assert_eq!(deny_reason(&record, now), Some(DenyReason::NotPaid));
    }

    #[test]
    fn test_not_paid_wins_over_other_reasons() {
        let now = Utc::now();
        let mut record = record_at(now);
        record.download_attempts = record.max_downloads;
        record.expires_at = now - Duration::days(1);

        // Still reported as not-paid: payment state is checked first
        assert_eq!(deny_reason(&record, now), Some(DenyReason::NotPaid));
    }

    #[test]
    fn test_completed_purchase_can_download() {
        let now = Utc::now();
        let mut record = record_at(now);
        record.payment_status = PaymentStatus::Completed;

        assert!(can_download(&record, now));
        assert_eq!(deny_reason(&record, now), None);
    }

    #[test]
    fn test_attempts_exhausted() {
        let now = Utc::now();
        let mut record = record_at(now);
        record.payment_status = PaymentStatus::Completed;
        record.download_attempts = record.max_downloads;

        assert_eq!(deny_reason(&record, now), Some(DenyReason::AttemptsExhausted));
        assert_eq!(remaining_downloads(&record), 0);
    }

    #[test]
    fn test_expired_with_attempts_remaining() {
        let now = Utc::now();
        let mut record = record_at(now);
        record.payment_status = PaymentStatus::Completed;
        record.expires_at = now - Duration::seconds(1);

        assert_eq!(deny_reason(&record, now), Some(DenyReason::Expired));
    }

    #[test]
    fn test_refunded_purchase_cannot_download() {
        let now = Utc::now();
        let mut record = record_at(now);
        record.payment_status = PaymentStatus::Refunded;

        assert_eq!(deny_reason(&record, now), Some(DenyReason::NotPaid));
    }

    #[test]
    fn test_remaining_downloads_never_negative() {
        let now = Utc::now();
        let mut record = record_at(now);
        // Attempts past the cap can only happen if the enforcement point
        // was bypassed; the derived query still floors at zero.
        record.download_attempts = record.max_downloads + 3;

        assert_eq!(remaining_downloads(&record), 0);
    }

    #[test]
    fn test_days_until_expiry_rounds_up() {
        let now = Utc::now();
        let mut record = record_at(now);

        record.expires_at = now + Duration::hours(36);
        assert_eq!(days_until_expiry(&record, now), 2);

        record.expires_at = now + Duration::days(365);
        assert_eq!(days_until_expiry(&record, now), 365);
    }

    #[test]
    fn test_days_until_expiry_negative_after_expiry() {
        let now = Utc::now();
        let mut record = record_at(now);
        record.expires_at = now - Duration::hours(36);

        assert_eq!(days_until_expiry(&record, now), -1);
    }
}
