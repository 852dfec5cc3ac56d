//! A scripted payment gateway double
//!
//! Records initializations and answers verifications from a per-reference
//! script, so tests can exercise webhook duplication, declines, and
//! timeouts without any network.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use domain_payments::{
    CheckoutSession, GatewayError, GatewayPaymentStatus, GatewayVerification, InitializePayment,
    PaymentGateway,
};

/// Gateway double driven by per-reference scripts
#[derive(Default)]
pub struct ScriptedGateway {
    outcomes: Mutex<HashMap<String, GatewayPaymentStatus>>,
    amount_overrides: Mutex<HashMap<String, i64>>,
    initialized: Mutex<HashMap<String, i64>>,
    fail_next_initialize: Mutex<Option<GatewayError>>,
    fail_next_verify: Mutex<Option<GatewayError>>,
}

impl ScriptedGateway {
    /// Scripts the verification outcome for a reference
    pub fn script(&self, reference: &str, status: GatewayPaymentStatus) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(reference.to_string(), status);
    }

    /// Scripts a successful verification reporting a different amount
    /// than was initialized
    pub fn script_amount(&self, reference: &str, amount_minor: i64) {
        self.script(reference, GatewayPaymentStatus::Success);
        self.amount_overrides
            .lock()
            .unwrap()
            .insert(reference.to_string(), amount_minor);
    }

    /// Makes the next initialize call fail
    pub fn fail_next_initialize(&self, error: GatewayError) {
        *self.fail_next_initialize.lock().unwrap() = Some(error);
    }

    /// Makes the next verify call fail
    pub fn fail_next_verify(&self, error: GatewayError) {
        *self.fail_next_verify.lock().unwrap() = Some(error);
    }

    /// The amount a reference was initialized with, if any
    pub fn initialized_amount(&self, reference: &str) -> Option<i64> {
        self.initialized.lock().unwrap().get(reference).copied()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize(
        &self,
        request: InitializePayment,
    ) -> Result<CheckoutSession, GatewayError> {
        if let Some(error) = self.fail_next_initialize.lock().unwrap().take() {
            return Err(error);
        }

        self.initialized
            .lock()
            .unwrap()
            .insert(request.reference.clone(), request.amount_minor);

        Ok(CheckoutSession {
            authorization_url: format!("https://checkout.test/{}", request.reference),
            access_code: format!("AC_{}", request.reference),
            reference: request.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError> {
        if let Some(error) = self.fail_next_verify.lock().unwrap().take() {
            return Err(error);
        }

        let status = self
            .outcomes
            .lock()
            .unwrap()
            .get(reference)
            .copied()
            .unwrap_or(GatewayPaymentStatus::Abandoned);

        let amount_minor = self
            .amount_overrides
            .lock()
            .unwrap()
            .get(reference)
            .copied()
            .or_else(|| self.initialized.lock().unwrap().get(reference).copied())
            .unwrap_or(0);

        Ok(GatewayVerification {
            reference: reference.to_string(),
            status,
            amount_minor,
            paid_at: None,
            channel: Some("card".to_string()),
        })
    }
}
