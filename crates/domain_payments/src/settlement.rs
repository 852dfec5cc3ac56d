//! Gateway settlement
//!
//! Confirms gateway transactions and credits invoices exactly once.
//! Both webhook delivery and manual re-verification land here; the
//! conditional pending -> success flip in the transaction store decides
//! which caller gets to apply the money.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use domain_fees::Invoice;

use crate::error::PaymentError;
use crate::gateway::{GatewayPaymentStatus, GatewayVerification, PaymentGateway};
use crate::ports::TransactionStore;
use crate::transaction::TransactionStatus;

/// What settlement concluded for a reference
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// This call confirmed the payment and credited the invoice
    Settled { invoice: Invoice },
    /// The transaction had already been settled; nothing was applied
    AlreadySettled,
    /// The gateway reported the payment failed
    Failed,
    /// The payer has not completed checkout; try again later
    StillPending,
}

/// Verifies gateway transactions against the gateway and settles them
pub struct SettlementVerifier {
    transactions: Arc<dyn TransactionStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl SettlementVerifier {
    pub fn new(transactions: Arc<dyn TransactionStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            transactions,
            gateway,
        }
    }

    /// Settles the transaction with the given reference
    ///
    /// The webhook payload is never trusted for the amount or status; the
    /// gateway's verify endpoint is always consulted. Safe to call any
    /// number of times for the same reference.
    pub async fn settle(&self, reference: &str) -> Result<SettlementOutcome, PaymentError> {
        let transaction = self
            .transactions
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| PaymentError::TransactionNotFound(reference.to_string()))?;

        if transaction.status == TransactionStatus::Success {
            info!(reference = %reference, "Transaction already settled; ignoring");
            return Ok(SettlementOutcome::AlreadySettled);
        }

        let verification = self.gateway.verify(reference).await?;

        match verification.status {
            GatewayPaymentStatus::Success => {
                if verification.amount_minor != transaction.amount.as_minor_units() {
                    return Err(PaymentError::AmountMismatch {
                        reference: reference.to_string(),
                        recorded_minor: transaction.amount.as_minor_units(),
                        gateway_minor: verification.amount_minor,
                    });
                }

                let metadata = verification_metadata(&verification);
                // The flip and the credit land in one store unit: a failed
                // credit leaves the transaction pending so the gateway's
                // retry can try the whole settlement again, and a
                // concurrent duplicate delivery finds nothing pending.
                match self
                    .transactions
                    .settle_and_credit(reference, Some(&metadata))
                    .await?
                {
                    Some(invoice) => {
                        info!(
                            tenant = %transaction.tenant_id,
                            reference = %reference,
                            invoice = %transaction.invoice_id,
                            amount = %transaction.amount,
                            status = %invoice.status,
                            "Gateway payment settled"
                        );
                        Ok(SettlementOutcome::Settled { invoice })
                    }
                    None => {
                        info!(
                            reference = %reference,
                            "Lost settlement race; transaction already settled"
                        );
                        Ok(SettlementOutcome::AlreadySettled)
                    }
                }
            }
            GatewayPaymentStatus::Failed => {
                if transaction.status == TransactionStatus::Pending {
                    self.transactions.mark_failed(reference).await?;
                }
                warn!(reference = %reference, "Gateway reported payment failed");
                Ok(SettlementOutcome::Failed)
            }
            GatewayPaymentStatus::Abandoned => {
                info!(reference = %reference, "Payment not completed yet");
                Ok(SettlementOutcome::StillPending)
            }
        }
    }
}

/// What the gateway reported, kept verbatim on the transaction
fn verification_metadata(verification: &GatewayVerification) -> serde_json::Value {
    serde_json::json!({
        "channel": verification.channel,
        "paid_at": verification.paid_at,
        "amount_minor": verification.amount_minor,
    })
}
