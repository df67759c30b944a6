//! Gateway errors

use thiserror::Error;

/// Errors from the gateway layer
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unknown processor: {0}")]
    UnknownProcessor(String),

    #[error("Secret not configured: {0}")]
    MissingSecret(String),

    #[error("Malformed signature header: {0}")]
    MalformedSignature(String),

    #[error("Upstream processor error: {0}")]
    Upstream(String),

    #[error("Upstream processor timed out after {0}ms")]
    Timeout(u64),
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
