//! # PayVault Gateway Module
//!
//! Payment processor integration layer:
//! - Named processor profiles (banks and payment processors) with
//!   endpoint-slot resolution and environment-sourced secrets
//! - Webhook signature verification (HMAC-SHA256)
//! - The outbound client seam (`ProcessorApi`) with retry support
//!
//! Profile resolution performs no network or credential validation;
//! errors surface only when a call is attempted.

mod client;
mod error;
mod profile;
mod secrets;
mod webhook;

pub use client::{call_with_retry, ChargeRequest, GatewayReceipt, ProcessorApi, SimulatedProcessor};
pub use error::{GatewayError, GatewayResult};
pub use profile::{resolve, Endpoint, EndpointPaths, ProcessorId, ProcessorProfile, Secret};
pub use secrets::{EnvSecrets, SecretSource, StaticSecrets};
pub use webhook::WebhookVerifier;
