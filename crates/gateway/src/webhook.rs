//! Webhook signature verification
//!
//! Inbound processor callbacks carry a signature header of the form
//! `t=<unix seconds>,v1=<hex hmac>` where the MAC is HMAC-SHA256 over
//! `"<timestamp>.<payload>"` keyed by the profile's webhook secret.
//! Timestamps outside the tolerance window are rejected to limit replay.

use crate::error::{GatewayError, GatewayResult};
use crate::profile::ProcessorProfile;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed age of a webhook timestamp (seconds)
const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verifies inbound webhook signatures for one processor profile
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Build a verifier from a resolved profile.
    ///
    /// Fails when the profile has no webhook secret configured; an
    /// unset secret must never verify anything.
    pub fn from_profile(profile: &ProcessorProfile) -> GatewayResult<Self> {
        let secret = profile
            .webhook_secret
            .as_ref()
            .ok_or_else(|| {
                GatewayError::MissingSecret(format!("webhook secret for {}", profile.processor))
            })?
            .expose()
            .to_string();
        Ok(Self::new(secret))
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Compute the signature for a payload at a given timestamp.
    ///
    /// Used by tests and by the simulated processor when emitting
    /// callbacks.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any size");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a signature header against a payload.
    ///
    /// Returns `Ok(false)` for wrong or stale signatures; errors only on
    /// a structurally malformed header.
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> GatewayResult<bool> {
        let (timestamp, provided) = parse_header(signature_header)?;

        if (now.timestamp() - timestamp).abs() > self.tolerance_secs {
            return Ok(false);
        }

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any size");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        let provided_bytes = match hex::decode(&provided) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };

        // Constant-time comparison via the hmac crate
        Ok(mac.verify_slice(&provided_bytes).is_ok())
    }
}

/// Parse `t=<unix>,v1=<hex>` into (timestamp, signature)
fn parse_header(header: &str) -> GatewayResult<(i64, String)> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    GatewayError::MalformedSignature(header.to_string())
                })?);
            }
            Some(("v1", value)) => signature = Some(value.to_string()),
            _ => {}
        }
    }

    match (timestamp, signature) {
        (Some(t), Some(s)) => Ok((t, s)),
        _ => Err(GatewayError::MalformedSignature(header.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{resolve, ProcessorId};
    use crate::secrets::StaticSecrets;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new("whsec_test123secret456")
    }

    fn header_for(verifier: &WebhookVerifier, payload: &[u8], timestamp: i64) -> String {
        format!("t={},v1={}", timestamp, verifier.sign(payload, timestamp))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let v = verifier();
        let payload = br#"{"event":"payment.captured"}"#;
        let now = Utc::now();
        let header = header_for(&v, payload, now.timestamp());

        assert!(v.verify(payload, &header, now).unwrap());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let v = verifier();
        let other = WebhookVerifier::new("some-other-secret");
        let payload = br#"{"event":"payment.captured"}"#;
        let now = Utc::now();
        let header = header_for(&other, payload, now.timestamp());

        assert!(!v.verify(payload, &header, now).unwrap());
    }

    #[test]
    fn test_modified_payload_rejected() {
        let v = verifier();
        let now = Utc::now();
        let header = header_for(&v, br#"{"amount":100}"#, now.timestamp());

        assert!(!v.verify(br#"{"amount":999}"#, &header, now).unwrap());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let v = verifier();
        let payload = b"{}";
        let now = Utc::now();
        let stale = now.timestamp() - 600; // beyond 300s tolerance
        let header = header_for(&v, payload, stale);

        assert!(!v.verify(payload, &header, now).unwrap());
    }

    #[test]
    fn test_custom_tolerance() {
        let v = verifier().with_tolerance(3600);
        let payload = b"{}";
        let now = Utc::now();
        let header = header_for(&v, payload, now.timestamp() - 600);

        assert!(v.verify(payload, &header, now).unwrap());
    }

    #[test]
    fn test_malformed_header_errors() {
        let v = verifier();
        let now = Utc::now();

        assert!(matches!(
            v.verify(b"{}", "garbage", now),
            Err(GatewayError::MalformedSignature(_))
        ));
        assert!(matches!(
            v.verify(b"{}", "t=notanumber,v1=abc", now),
            Err(GatewayError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_non_hex_signature_rejected_not_error() {
        let v = verifier();
        let now = Utc::now();
        let header = format!("t={},v1=zzzz", now.timestamp());

        assert!(!v.verify(b"{}", &header, now).unwrap());
    }

    #[test]
    fn test_from_profile_requires_secret() {
        let bare = resolve(ProcessorId::Razorpay, &StaticSecrets::new());
        assert!(matches!(
            WebhookVerifier::from_profile(&bare),
            Err(GatewayError::MissingSecret(_))
        ));

        let secrets = StaticSecrets::new().with("RAZORPAY_WEBHOOK_SECRET", "whsec_abc");
        let profile = resolve(ProcessorId::Razorpay, &secrets);
        assert!(WebhookVerifier::from_profile(&profile).is_ok());
    }
}
