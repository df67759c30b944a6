//! # PayVault Purchase Module
//!
//! The purchase/entitlement lifecycle:
//! - `PurchaseRecord`: one buyer's acquisition of one digital product,
//!   with payment status, gateway linkage and download entitlement
//! - Entitlement policy: pure derived queries (`can_download`,
//!   `remaining_downloads`, `days_until_expiry`), never persisted
//! - `PurchaseStore`: SQLite-backed store whose download increment is an
//!   atomic check-and-increment, so concurrent downloads can never push
//!   `download_attempts` past `max_downloads`
//! - `Discount`: coupon rules applied once, at purchase time
//!
//! Records are immutable history: they are retained past expiry for
//! audit and never deleted.

mod discount;
mod entitlement;
mod error;
mod record;
mod store;

pub use discount::{Discount, DiscountKind};
pub use entitlement::{can_download, days_until_expiry, deny_reason, remaining_downloads, DenyReason};
pub use error::{PurchaseError, PurchaseResult};
pub use record::{
    generate_transaction_id, DownloadEvent, NewPurchase, PaymentGateway, PaymentMethod,
    PaymentStatus, ProductSnapshot, PurchaseMetadata, PurchaseRecord, RefundDetails,
};
pub use store::PurchaseStore;
