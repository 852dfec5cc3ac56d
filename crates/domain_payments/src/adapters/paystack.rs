//! Paystack gateway client
//!
//! Implements the hosted-checkout flow: POST /transaction/initialize to
//! open a checkout page, GET /transaction/verify/{reference} to confirm.
//! Every response arrives in Paystack's `{status, message, data}`
//! envelope. Authentication is a bearer secret key.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::gateway::{
    CheckoutSession, GatewayError, GatewayPaymentStatus, GatewayVerification, InitializePayment,
    PaymentGateway,
};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Paystack credentials and endpoint
#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub secret_key: Secret<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl PaystackConfig {
    pub fn new(secret_key: Secret<String>, base_url: impl Into<String>) -> Self {
        Self {
            secret_key,
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Paystack client
#[derive(Clone)]
pub struct PaystackGateway {
    client: Client,
    config: PaystackConfig,
}

/// Paystack's standard response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    reference: String,
    status: String,
    amount: i64,
    paid_at: Option<DateTime<Utc>>,
    channel: Option<String>,
}

impl PaystackGateway {
    /// Creates a client with the configured request timeout
    pub fn new(config: PaystackConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty() && !self.config.base_url.is_empty()
    }

    fn map_transport_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout {
                seconds: self.config.timeout_secs,
            }
        } else {
            GatewayError::Network(err.to_string())
        }
    }

    async fn read_envelope<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        debug!(status = %status, "Gateway response received");

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(GatewayError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Protocol(format!("Malformed envelope: {e}")))?;

        if !envelope.status {
            return Err(GatewayError::Protocol(envelope.message));
        }

        envelope
            .data
            .ok_or_else(|| GatewayError::Protocol("Envelope missing data".to_string()))
    }
}

fn parse_payment_status(raw: &str) -> GatewayPaymentStatus {
    match raw {
        "success" => GatewayPaymentStatus::Success,
        "failed" | "reversed" => GatewayPaymentStatus::Failed,
        // "abandoned", "ongoing", "pending", "queued" all mean the payer
        // has not finished; the transaction may still complete
        _ => GatewayPaymentStatus::Abandoned,
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(
        &self,
        request: InitializePayment,
    ) -> Result<CheckoutSession, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }

        let url = format!("{}/transaction/initialize", self.config.base_url);
        let body = serde_json::json!({
            "email": request.email,
            "amount": request.amount_minor,
            "reference": request.reference,
            "callback_url": request.callback_url,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let data: InitializeData = self.read_envelope(response).await?;
        info!(reference = %data.reference, "Checkout session created");

        Ok(CheckoutSession {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }

        let url = format!("{}/transaction/verify/{}", self.config.base_url, reference);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let data: VerifyData = self.read_envelope(response).await?;
        let status = parse_payment_status(&data.status);

        if status != GatewayPaymentStatus::Success {
            warn!(reference = %data.reference, raw_status = %data.status, "Verification did not confirm payment");
        }

        Ok(GatewayVerification {
            reference: data.reference,
            status,
            amount_minor: data.amount,
            paid_at: data.paid_at,
            channel: data.channel,
        })
    }
}
