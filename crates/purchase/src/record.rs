//! Purchase record data structures

use crate::discount::Discount;
use chrono::{DateTime, Duration, Timelike, Utc};
use payvault_core::Amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days a completed purchase stays downloadable
pub const ENTITLEMENT_DAYS: i64 = 365;

/// Default download allowance per purchase
pub const DEFAULT_MAX_DOWNLOADS: u32 = 5;

/// Payment instrument used by the buyer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Card,
    Upi,
    Netbanking,
    Wallet,
    Emi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Netbanking => "netbanking",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Emi => "emi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "card" => Some(PaymentMethod::Card),
            "upi" => Some(PaymentMethod::Upi),
            "netbanking" => Some(PaymentMethod::Netbanking),
            "wallet" => Some(PaymentMethod::Wallet),
            "emi" => Some(PaymentMethod::Emi),
            _ => None,
        }
    }
}

/// Lifecycle status of the payment behind a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Created, awaiting the gateway callback
    Pending,
    /// Gateway confirmed the payment
    Completed,
    /// Gateway rejected the payment
    Failed,
    /// Refund sub-record attached
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// External processor the purchase was routed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentGateway {
    Razorpay,
    Stripe,
    Paytm,
    Phonepe,
}

impl PaymentGateway {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentGateway::Razorpay => "razorpay",
            PaymentGateway::Stripe => "stripe",
            PaymentGateway::Paytm => "paytm",
            PaymentGateway::Phonepe => "phonepe",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "razorpay" => Some(PaymentGateway::Razorpay),
            "stripe" => Some(PaymentGateway::Stripe),
            "paytm" => Some(PaymentGateway::Paytm),
            "phonepe" => Some(PaymentGateway::Phonepe),
            _ => None,
        }
    }
}

/// One fulfilled download (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadEvent {
    pub downloaded_at: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: String,
}

/// Refund sub-record, attached when a purchase is refunded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundDetails {
    pub refund_amount: Amount,
    pub refund_date: DateTime<Utc>,
    pub refund_reason: String,
    /// Opaque id from the external processor
    pub refund_transaction_id: Option<String>,
}

/// Point-in-time view of the product entity, copied into the record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub sku: String,
    pub version: String,
}

/// Denormalized product snapshot plus discount applied at purchase time.
///
/// Populated once at creation and never re-synced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurchaseMetadata {
    pub product_name: String,
    pub product_sku: String,
    pub product_version: String,
    pub discount_applied: Decimal,
    pub coupon_code: Option<String>,
}

/// Persistent record of one buyer's acquisition of one digital product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub buyer: String,
    pub product: String,
    /// Internal correlation id, globally unique
    pub transaction_id: String,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_gateway: PaymentGateway,
    pub gateway_transaction_id: Option<String>,
    pub gateway_order_id: Option<String>,
    pub download_attempts: u32,
    pub max_downloads: u32,
    pub downloads: Vec<DownloadEvent>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub refund_details: Option<RefundDetails>,
    pub metadata: PurchaseMetadata,
}

/// Truncate to microsecond precision, the resolution storage retains.
/// Record timestamps must round-trip unchanged through the store.
fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(ts.timestamp_subsec_micros() * 1000)
        .unwrap_or(ts)
}

/// Generate an internal transaction id (`TXN-` prefixed)
pub fn generate_transaction_id() -> String {
    let hex: String = uuid::Uuid::new_v4().simple().to_string()[..12].to_uppercase();
    format!("TXN-{hex}")
}

/// Parameters for creating a purchase record
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub buyer: String,
    pub product: String,
    pub transaction_id: String,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    pub payment_gateway: PaymentGateway,
    pub max_downloads: u32,
    snapshot: Option<ProductSnapshot>,
    coupon_code: Option<String>,
    discount_applied: Decimal,
    expires_at_override: Option<DateTime<Utc>>,
}

impl NewPurchase {
    pub fn new(
        buyer: impl Into<String>,
        product: impl Into<String>,
        transaction_id: impl Into<String>,
        amount: Amount,
        payment_method: PaymentMethod,
        payment_gateway: PaymentGateway,
    ) -> Self {
        Self {
            buyer: buyer.into(),
            product: product.into(),
            transaction_id: transaction_id.into(),
            amount,
            payment_method,
            payment_gateway,
            max_downloads: DEFAULT_MAX_DOWNLOADS,
            snapshot: None,
            coupon_code: None,
            discount_applied: Decimal::ZERO,
            expires_at_override: None,
        }
    }

    pub fn with_max_downloads(mut self, max_downloads: u32) -> Self {
        self.max_downloads = max_downloads;
        self
    }

    /// Attach the live product entity view to snapshot into metadata
    pub fn with_snapshot(mut self, snapshot: ProductSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Apply a coupon. An invalid discount is ignored with a warning;
    /// coupon failure must not abort the purchase.
    pub fn with_coupon(mut self, code: impl Into<String>, discount: &Discount, now: DateTime<Utc>) -> Self {
        let code = code.into();
        if !discount.is_valid_at(now) {
            tracing::warn!(coupon = %code, "coupon not valid at purchase time, ignoring");
            return self;
        }
        let (net, applied) = discount.apply(self.amount);
        self.amount = net;
        self.discount_applied = applied.value();
        self.coupon_code = Some(code);
        self
    }

    /// Override the expiry timestamp (tests and migrations)
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at_override = Some(expires_at);
        self
    }

    /// Materialize the record with `payment_status = pending`.
    ///
    /// The metadata snapshot is an explicit step here, not a persistence
    /// hook. A missing snapshot degrades to empty metadata.
    pub fn build(self, now: DateTime<Utc>) -> PurchaseRecord {
        let now = truncate_to_micros(now);
        let metadata = match self.snapshot {
            Some(snapshot) => PurchaseMetadata {
                product_name: snapshot.name,
                product_sku: snapshot.sku,
                product_version: snapshot.version,
                discount_applied: self.discount_applied,
                coupon_code: self.coupon_code,
            },
            None => {
                tracing::warn!(
                    product = %self.product,
                    "product snapshot unavailable, metadata left empty"
                );
                PurchaseMetadata {
                    discount_applied: self.discount_applied,
                    coupon_code: self.coupon_code,
                    ..PurchaseMetadata::default()
                }
            }
        };

        PurchaseRecord {
            buyer: self.buyer,
            product: self.product,
            transaction_id: self.transaction_id,
            amount: self.amount,
            payment_method: self.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_gateway: self.payment_gateway,
            gateway_transaction_id: None,
            gateway_order_id: None,
            download_attempts: 0,
            max_downloads: self.max_downloads,
            downloads: Vec::new(),
            created_at: now,
            expires_at: self
                .expires_at_override
                .map(truncate_to_micros)
                .unwrap_or(now + Duration::days(ENTITLEMENT_DAYS)),
            refund_details: None,
            metadata,
        }
    }
}
