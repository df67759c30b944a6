//! Outbound processor client seam
//!
//! No real HTTP client ships here; `ProcessorApi` is the seam where one
//! would plug in, and `SimulatedProcessor` is the in-process stand-in
//! used by the CLI and tests. `call_with_retry` applies the profile's
//! retry budget to upstream failures.

use crate::error::{GatewayError, GatewayResult};
use crate::profile::{Endpoint, ProcessorProfile};
use payvault_core::{Amount, Currency};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Result of a successful processor call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayReceipt {
    /// Opaque id assigned by the processor
    pub gateway_transaction_id: String,
    /// Optional order id (some processors issue both)
    pub gateway_order_id: Option<String>,
    pub success: bool,
}

/// Parameters for a debit call
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Internal correlation id
    pub transaction_id: String,
    pub amount: Amount,
    pub currency: Currency,
}

/// Outbound calls to a payment processor
pub trait ProcessorApi {
    fn debit(&self, profile: &ProcessorProfile, request: &ChargeRequest)
        -> GatewayResult<GatewayReceipt>;

    fn refund(
        &self,
        profile: &ProcessorProfile,
        gateway_transaction_id: &str,
        amount: Amount,
    ) -> GatewayResult<GatewayReceipt>;

    fn status(
        &self,
        profile: &ProcessorProfile,
        gateway_transaction_id: &str,
    ) -> GatewayResult<GatewayReceipt>;
}

/// Deterministic in-process processor.
///
/// Can be configured to fail its first N calls, which exercises the
/// retry path.
#[derive(Debug, Default)]
pub struct SimulatedProcessor {
    failures_remaining: AtomicU32,
}

impl SimulatedProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A processor whose first `n` calls fail with an upstream error
    pub fn failing(n: u32) -> Self {
        Self {
            failures_remaining: AtomicU32::new(n),
        }
    }

    fn maybe_fail(&self, endpoint: Endpoint) -> GatewayResult<()> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(GatewayError::Upstream(format!(
                "simulated failure on {}",
                endpoint.as_str()
            )));
        }
        Ok(())
    }

    fn receipt() -> GatewayReceipt {
        let suffix = || uuid::Uuid::new_v4().to_string()[..8].to_uppercase();
        GatewayReceipt {
            gateway_transaction_id: format!("SIM-{}", suffix()),
            gateway_order_id: Some(format!("ORD-{}", suffix())),
            success: true,
        }
    }
}

impl ProcessorApi for SimulatedProcessor {
    fn debit(
        &self,
        profile: &ProcessorProfile,
        request: &ChargeRequest,
    ) -> GatewayResult<GatewayReceipt> {
        self.maybe_fail(Endpoint::Debit)?;
        tracing::debug!(
            url = %profile.endpoint_url(Endpoint::Debit),
            transaction_id = %request.transaction_id,
            amount = %request.amount,
            currency = %request.currency,
            "simulated debit"
        );
        Ok(Self::receipt())
    }

    fn refund(
        &self,
        profile: &ProcessorProfile,
        gateway_transaction_id: &str,
        amount: Amount,
    ) -> GatewayResult<GatewayReceipt> {
        self.maybe_fail(Endpoint::Refund)?;
        tracing::debug!(
            url = %profile.endpoint_url(Endpoint::Refund),
            gateway_transaction_id,
            amount = %amount,
            "simulated refund"
        );
        Ok(GatewayReceipt {
            gateway_transaction_id: gateway_transaction_id.to_string(),
            gateway_order_id: None,
            success: true,
        })
    }

    fn status(
        &self,
        profile: &ProcessorProfile,
        gateway_transaction_id: &str,
    ) -> GatewayResult<GatewayReceipt> {
        self.maybe_fail(Endpoint::Status)?;
        tracing::debug!(
            url = %profile.endpoint_url(Endpoint::Status),
            gateway_transaction_id,
            "simulated status check"
        );
        Ok(GatewayReceipt {
            gateway_transaction_id: gateway_transaction_id.to_string(),
            gateway_order_id: None,
            success: true,
        })
    }
}

/// Base delay between retry attempts
const RETRY_BASE_DELAY_MS: u64 = 25;

/// Run a processor call, retrying upstream failures.
///
/// Only `Upstream` and `Timeout` errors are retried; everything else
/// (missing secrets, malformed input) returns immediately. Delay doubles
/// per attempt.
pub fn call_with_retry<T>(
    profile: &ProcessorProfile,
    mut op: impl FnMut() -> GatewayResult<T>,
) -> GatewayResult<T> {
    let attempts = profile.retry_attempts.max(1);
    let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(err @ (GatewayError::Upstream(_) | GatewayError::Timeout(_))) => {
                if attempt == attempts {
                    return Err(err);
                }
                tracing::warn!(
                    processor = %profile.processor,
                    attempt,
                    error = %err,
                    "processor call failed, retrying"
                );
                std::thread::sleep(delay);
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }

    unreachable!("loop returns on the final attempt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{resolve, ProcessorId};
    use crate::secrets::StaticSecrets;
    use rust_decimal::Decimal;

    fn profile() -> ProcessorProfile {
        resolve(ProcessorId::Razorpay, &StaticSecrets::new())
    }

    fn request() -> ChargeRequest {
        ChargeRequest {
            transaction_id: "TXN-TEST0001".to_string(),
            amount: Amount::new(Decimal::new(999, 0)).unwrap(),
            currency: Currency::Inr,
        }
    }

    #[test]
    fn test_simulated_debit_succeeds() {
        let processor = SimulatedProcessor::new();
        let receipt = processor.debit(&profile(), &request()).unwrap();

        assert!(receipt.success);
        assert!(receipt.gateway_transaction_id.starts_with("SIM-"));
        assert!(receipt.gateway_order_id.is_some());
    }

    #[test]
    fn test_failing_processor_errors() {
        let processor = SimulatedProcessor::failing(1);

        assert!(matches!(
            processor.debit(&profile(), &request()),
            Err(GatewayError::Upstream(_))
        ));
        // Second call succeeds
        assert!(processor.debit(&profile(), &request()).is_ok());
    }

    #[test]
    fn test_retry_recovers_within_budget() {
        let profile = profile();
        let processor = SimulatedProcessor::failing(2);

        // retry_attempts = 3: two failures then success
        let receipt =
            call_with_retry(&profile, || processor.debit(&profile, &request())).unwrap();
        assert!(receipt.success);
    }

    #[test]
    fn test_retry_budget_exhausted() {
        let profile = profile();
        let processor = SimulatedProcessor::failing(10);

        let result = call_with_retry(&profile, || processor.debit(&profile, &request()));
        assert!(matches!(result, Err(GatewayError::Upstream(_))));
    }

    #[test]
    fn test_non_upstream_error_not_retried() {
        let profile = profile();
        let mut calls = 0;

        let result: GatewayResult<GatewayReceipt> = call_with_retry(&profile, || {
            calls += 1;
            Err(GatewayError::MissingSecret("RAZORPAY_API_KEY".to_string()))
        });

        assert!(matches!(result, Err(GatewayError::MissingSecret(_))));
        assert_eq!(calls, 1);
    }
}
