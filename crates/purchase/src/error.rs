//! Purchase errors

use crate::entitlement::DenyReason;
use crate::record::PaymentStatus;
use thiserror::Error;

/// Errors from the purchase store
#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Purchase not found: {0}")]
    NotFound(String),

    #[error("Operation not permitted while purchase {transaction_id} is {status}")]
    InvalidState {
        transaction_id: String,
        status: PaymentStatus,
    },

    #[error("Download denied: {0}")]
    EntitlementDenied(DenyReason),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for purchase operations
pub type PurchaseResult<T> = Result<T, PurchaseError>;
