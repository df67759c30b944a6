//! Loan errors

use crate::record::LoanStatus;
use thiserror::Error;

/// Errors from the loan store and workflow
#[derive(Debug, Error)]
pub enum LoanError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Loan not found: {0}")]
    NotFound(String),

    #[error("Operation not permitted while loan {id} is {status}")]
    InvalidState { id: String, status: LoanStatus },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for loan operations
pub type LoanResult<T> = Result<T, LoanError>;
