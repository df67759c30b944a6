//! Processor profiles and endpoint resolution
//!
//! One generic bank profile, three named bank profiles and two payment
//! processors. Each profile may override a subset of the named endpoint
//! slots and falls back to the generic defaults for the rest.
//!
//! Resolution is static: no URL reachability or credential validation
//! happens here.

use crate::error::GatewayError;
use crate::secrets::SecretSource;
use payvault_core::Currency;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default timeout for processor calls (milliseconds)
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default retry attempts for failed calls
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Identifies a configured payment processor or bank API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessorId {
    /// Generic bank API, fully environment-configured
    GenericBank,
    Icici,
    Hdfc,
    Sbi,
    Stripe,
    Razorpay,
}

impl ProcessorId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorId::GenericBank => "generic-bank",
            ProcessorId::Icici => "icici",
            ProcessorId::Hdfc => "hdfc",
            ProcessorId::Sbi => "sbi",
            ProcessorId::Stripe => "stripe",
            ProcessorId::Razorpay => "razorpay",
        }
    }

    /// Prefix used for environment secret keys (e.g. `RAZORPAY_API_KEY`)
    fn env_prefix(&self) -> &'static str {
        match self {
            ProcessorId::GenericBank => "BANK",
            ProcessorId::Icici => "ICICI",
            ProcessorId::Hdfc => "HDFC",
            ProcessorId::Sbi => "SBI",
            ProcessorId::Stripe => "STRIPE",
            ProcessorId::Razorpay => "RAZORPAY",
        }
    }
}

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProcessorId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generic-bank" => Ok(ProcessorId::GenericBank),
            "icici" => Ok(ProcessorId::Icici),
            "hdfc" => Ok(ProcessorId::Hdfc),
            "sbi" => Ok(ProcessorId::Sbi),
            "stripe" => Ok(ProcessorId::Stripe),
            "razorpay" => Ok(ProcessorId::Razorpay),
            other => Err(GatewayError::UnknownProcessor(other.to_string())),
        }
    }
}

/// Named endpoint slots every profile must resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Debit,
    Credit,
    Status,
    Refund,
    VerifyAccount,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Debit => "DEBIT",
            Endpoint::Credit => "CREDIT",
            Endpoint::Status => "STATUS",
            Endpoint::Refund => "REFUND",
            Endpoint::VerifyAccount => "VERIFY_ACCOUNT",
        }
    }
}

/// Resolved endpoint path table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPaths {
    pub debit: String,
    pub credit: String,
    pub status: String,
    pub refund: String,
    pub verify_account: String,
}

impl EndpointPaths {
    /// Generic defaults used when a profile does not override a slot
    fn generic() -> Self {
        Self {
            debit: "/payments/debit".to_string(),
            credit: "/payments/credit".to_string(),
            status: "/payments/status".to_string(),
            refund: "/payments/refund".to_string(),
            verify_account: "/accounts/verify".to_string(),
        }
    }

    pub fn path(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Debit => &self.debit,
            Endpoint::Credit => &self.credit,
            Endpoint::Status => &self.status,
            Endpoint::Refund => &self.refund,
            Endpoint::VerifyAccount => &self.verify_account,
        }
    }
}

/// An opaque credential. Debug/Display never print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Access the underlying value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

/// Immutable configuration bundle for one processor
///
/// Secrets that are absent from the environment stay `None`; such a
/// profile is usable only in non-production contexts.
#[derive(Debug, Clone)]
pub struct ProcessorProfile {
    pub processor: ProcessorId,
    pub base_url: String,
    pub api_key: Option<Secret>,
    pub client_id: Option<Secret>,
    pub client_secret: Option<Secret>,
    pub webhook_secret: Option<Secret>,
    pub endpoints: EndpointPaths,
    pub currency: Currency,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
}

impl ProcessorProfile {
    /// Full URL for a named endpoint slot
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.endpoints.path(endpoint)
        )
    }

    /// Whether the profile carries the credentials required for
    /// production use. Bank profiles additionally need client
    /// credentials for their OAuth-style flows.
    pub fn is_production_ready(&self) -> bool {
        let has_core = self.api_key.is_some() && self.webhook_secret.is_some();
        match self.processor {
            ProcessorId::GenericBank | ProcessorId::Icici | ProcessorId::Hdfc | ProcessorId::Sbi => {
                has_core && self.client_id.is_some() && self.client_secret.is_some()
            }
            ProcessorId::Stripe | ProcessorId::Razorpay => has_core,
        }
    }
}

/// Resolve the configuration bundle for a processor.
///
/// Endpoint slots not overridden by the profile fall back to the
/// generic defaults.
pub fn resolve(processor: ProcessorId, secrets: &dyn SecretSource) -> ProcessorProfile {
    let prefix = processor.env_prefix();
    let secret = |suffix: &str| secrets.get(&format!("{prefix}_{suffix}")).map(Secret::new);

    let base_url = match processor {
        // The generic bank is fully environment-configured; the fallback
        // URL is deliberately unresolvable.
        ProcessorId::GenericBank => secrets
            .get("BANK_API_URL")
            .unwrap_or_else(|| "https://bank.example.invalid/api/v1".to_string()),
        ProcessorId::Icici => "https://apigwuat.icicibank.com:8443".to_string(),
        ProcessorId::Hdfc => "https://api.hdfcbank.com/v1".to_string(),
        ProcessorId::Sbi => "https://api.onlinesbi.com/v1".to_string(),
        ProcessorId::Stripe => "https://api.stripe.com/v1".to_string(),
        ProcessorId::Razorpay => "https://api.razorpay.com/v1".to_string(),
    };

    let mut endpoints = EndpointPaths::generic();
    match processor {
        ProcessorId::GenericBank => {}
        ProcessorId::Icici => {
            endpoints.debit = "/iciciapi/api/v1/payments/debit".to_string();
            endpoints.status = "/iciciapi/api/v1/payments/status".to_string();
        }
        ProcessorId::Hdfc => {
            endpoints.debit = "/payments/immediate-payment".to_string();
            endpoints.status = "/payments/transaction-status".to_string();
        }
        ProcessorId::Sbi => {
            endpoints.debit = "/retail/fund-transfer".to_string();
            endpoints.status = "/retail/transaction-inquiry".to_string();
        }
        ProcessorId::Stripe => {
            endpoints.debit = "/payment_intents".to_string();
            endpoints.status = "/payment_intents".to_string();
            endpoints.refund = "/refunds".to_string();
        }
        ProcessorId::Razorpay => {
            endpoints.debit = "/payments".to_string();
            endpoints.status = "/payments".to_string();
            endpoints.refund = "/payments/{id}/refund".to_string();
        }
    }

    let currency = match processor {
        ProcessorId::Stripe => Currency::Usd,
        _ => Currency::Inr,
    };

    ProcessorProfile {
        processor,
        base_url,
        api_key: secret("API_KEY"),
        client_id: secret("CLIENT_ID"),
        client_secret: secret("CLIENT_SECRET"),
        webhook_secret: secret("WEBHOOK_SECRET"),
        endpoints,
        currency,
        timeout_ms: DEFAULT_TIMEOUT_MS,
        retry_attempts: DEFAULT_RETRY_ATTEMPTS,
    }
}
