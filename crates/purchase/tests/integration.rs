//! End-to-end purchase lifecycle tests

use chrono::{Duration, Utc};
use payvault_core::Amount;
use payvault_purchase::{
    days_until_expiry, remaining_downloads, DenyReason, NewPurchase, PaymentGateway,
    PaymentMethod, PaymentStatus, ProductSnapshot, PurchaseError, PurchaseStore,
};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[test]
fn test_full_purchase_lifecycle() {
    let store = PurchaseStore::in_memory().unwrap();

    // Create: 999 INR over UPI via Razorpay
    let record = store
        .create(
            NewPurchase::new(
                "USER-042",
                "PROD-EBOOK",
                "TXN-LIFECYCLE01",
                Amount::new(dec!(999)).unwrap(),
                PaymentMethod::Upi,
                PaymentGateway::Razorpay,
            )
            .with_snapshot(ProductSnapshot {
                name: "Personal Finance Ebook".to_string(),
                sku: "EBOOK-PF".to_string(),
                version: "1.0".to_string(),
            }),
        )
        .unwrap();

    assert_eq!(record.payment_status, PaymentStatus::Pending);
    assert_eq!(record.download_attempts, 0);

    // Expiry is about a year out
    let days = days_until_expiry(&record, Utc::now());
    assert!((364..=365).contains(&days), "expiry {days} days out");

    // Gateway confirms the payment
    let record = store
        .record_gateway_result("TXN-LIFECYCLE01", Some("pay_9x"), Some("order_7y"), true)
        .unwrap();
    assert_eq!(record.payment_status, PaymentStatus::Completed);

    // All five downloads succeed
    for i in 1..=5 {
        let record = store
            .register_download("TXN-LIFECYCLE01", "203.0.113.9", "Mozilla/5.0")
            .unwrap();
        assert_eq!(record.download_attempts, i);
    }
    let record = store.get("TXN-LIFECYCLE01").unwrap();
    assert_eq!(remaining_downloads(&record), 0);

    // The sixth is denied and nothing changes
    let denied = store.register_download("TXN-LIFECYCLE01", "203.0.113.9", "Mozilla/5.0");
    assert!(matches!(
        denied,
        Err(PurchaseError::EntitlementDenied(DenyReason::AttemptsExhausted))
    ));
    let record = store.get("TXN-LIFECYCLE01").unwrap();
    assert_eq!(record.download_attempts, 5);
    assert_eq!(record.downloads.len(), 5);
}

#[test]
fn test_expired_purchase_keeps_history() {
    let store = PurchaseStore::in_memory().unwrap();
    let now = Utc::now();

    store
        .create(
            NewPurchase::new(
                "USER-042",
                "PROD-EBOOK",
                "TXN-EXPIRED01",
                Amount::new(dec!(499)).unwrap(),
                PaymentMethod::Card,
                PaymentGateway::Stripe,
            )
            .with_expires_at(now - Duration::days(1)),
        )
        .unwrap();
    store
        .record_gateway_result("TXN-EXPIRED01", Some("pi_1"), None, true)
        .unwrap();

    let denied = store.register_download_at("TXN-EXPIRED01", "203.0.113.9", "curl/8.0", now);
    assert!(matches!(
        denied,
        Err(PurchaseError::EntitlementDenied(DenyReason::Expired))
    ));

    // Retained past expiry for audit
    let record = store.get("TXN-EXPIRED01").unwrap();
    assert_eq!(record.payment_status, PaymentStatus::Completed);
    assert!(days_until_expiry(&record, now) <= 0);
}

#[test]
fn test_concurrent_downloads_cannot_exceed_allowance() {
    let store = Arc::new(PurchaseStore::in_memory().unwrap());

    store
        .create(NewPurchase::new(
            "USER-042",
            "PROD-EBOOK",
            "TXN-RACE01",
            Amount::new(dec!(999)).unwrap(),
            PaymentMethod::Wallet,
            PaymentGateway::Phonepe,
        ))
        .unwrap();
    store
        .record_gateway_result("TXN-RACE01", Some("pay_r"), None, true)
        .unwrap();

    // Burn down to a single remaining download
    for _ in 0..4 {
        store.register_download("TXN-RACE01", "203.0.113.9", "curl/8.0").unwrap();
    }

    let threads = 8;
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                store
                    .register_download("TXN-RACE01", "203.0.113.9", "curl/8.0")
                    .is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    // Exactly one thread wins the last download
    assert_eq!(successes, 1);

    let record = store.get("TXN-RACE01").unwrap();
    assert_eq!(record.download_attempts, 5);
    assert_eq!(record.downloads.len(), 5);
    assert_eq!(remaining_downloads(&record), 0);
}
