//! Card gateway port
//!
//! Two calls: initialize a hosted checkout, and verify a transaction by
//! reference. The verify call is the source of truth for settlement; a
//! webhook is only a hint to go verify. Calls are never retried
//! automatically, failures surface to the caller who may re-verify later.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway call failures
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Credentials are missing; the tenant cannot take online payments
    #[error("Payment gateway is not configured")]
    NotConfigured,

    /// The call exceeded the request timeout
    #[error("Gateway request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Transport-level failure (DNS, TLS, connection reset)
    #[error("Gateway network error: {0}")]
    Network(String),

    /// The gateway answered with a non-success HTTP status
    #[error("Gateway returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body did not match the expected shape
    #[error("Unexpected gateway response: {0}")]
    Protocol(String),
}

impl GatewayError {
    /// Timeouts and transport errors may succeed on a later manual
    /// re-verification; HTTP and protocol errors will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Timeout { .. } | GatewayError::Network(_))
    }
}

/// Request to open a hosted checkout page
#[derive(Debug, Clone, Serialize)]
pub struct InitializePayment {
    /// Payer's email, required by the gateway
    pub email: String,
    /// Amount in minor units (kobo for NGN)
    pub amount_minor: i64,
    /// Our reference, echoed back by webhooks and verify
    pub reference: String,
    /// Where the gateway redirects after payment
    pub callback_url: Option<String>,
}

/// A checkout the payer can be redirected to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Terminal state the gateway reports for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPaymentStatus {
    /// Money confirmed
    Success,
    /// Payment declined or errored
    Failed,
    /// Payer never completed checkout; may still complete later
    Abandoned,
}

/// What the gateway knows about a transaction
#[derive(Debug, Clone)]
pub struct GatewayVerification {
    pub reference: String,
    pub status: GatewayPaymentStatus,
    /// Amount the gateway actually collected, in minor units
    pub amount_minor: i64,
    pub paid_at: Option<DateTime<Utc>>,
    /// Payment channel as reported, e.g. "card", "bank_transfer"
    pub channel: Option<String>,
}

/// The external card gateway
#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Opens a hosted checkout session for the given reference
    async fn initialize(&self, request: InitializePayment)
        -> Result<CheckoutSession, GatewayError>;

    /// Asks the gateway for the authoritative state of a transaction
    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(GatewayError::Timeout { seconds: 10 }.is_transient());
        assert!(GatewayError::Network("connection reset".into()).is_transient());
        assert!(!GatewayError::Http {
            status: 401,
            message: "Invalid key".into()
        }
        .is_transient());
        assert!(!GatewayError::NotConfigured.is_transient());
    }
}
