//! Secret sourcing for processor profiles
//!
//! Secrets come from the deployment environment. A missing secret stays
//! missing; it is never replaced by a placeholder string, so a profile
//! resolved without credentials can be detected as non-production.

use std::collections::HashMap;

/// Source of deployment secrets (API keys, webhook secrets)
pub trait SecretSource {
    /// Look up a secret by key. Empty values count as absent.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads secrets from process environment variables
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Map-backed secret source (for tests and embedding)
#[derive(Debug, Default, Clone)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret, returning self for chaining
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl SecretSource for StaticSecrets {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).filter(|v| !v.trim().is_empty()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_secrets_lookup() {
        let secrets = StaticSecrets::new().with("RAZORPAY_API_KEY", "rzp_test_123");

        assert_eq!(
            secrets.get("RAZORPAY_API_KEY"),
            Some("rzp_test_123".to_string())
        );
        assert_eq!(secrets.get("STRIPE_API_KEY"), None);
    }

    #[test]
    fn test_empty_value_counts_as_absent() {
        let secrets = StaticSecrets::new().with("BANK_API_KEY", "  ");
        assert_eq!(secrets.get("BANK_API_KEY"), None);
    }
}
