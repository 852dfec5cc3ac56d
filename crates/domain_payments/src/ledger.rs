//! Payment ledger
//!
//! Entry points for getting money onto an invoice: manual recording by
//! the bursar, and gateway checkout initiation. Manual payments settle
//! immediately; gateway payments settle later through the verifier.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use core_kernel::{InvoiceId, Money, TenantId};
use domain_fees::{Invoice, InvoiceStore};

use crate::error::PaymentError;
use crate::gateway::{CheckoutSession, InitializePayment, PaymentGateway};
use crate::ports::TransactionStore;
use crate::transaction::{PaymentMethod, PaymentTransaction};

/// Outcome of recording a manual payment
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub transaction: PaymentTransaction,
    /// The invoice after the payment was applied
    pub invoice: Invoice,
}

/// Outcome of initiating a gateway checkout
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub transaction: PaymentTransaction,
    pub checkout: CheckoutSession,
}

/// Records payments and opens gateway checkouts
pub struct PaymentLedger {
    invoices: Arc<dyn InvoiceStore>,
    transactions: Arc<dyn TransactionStore>,
    gateway: Arc<dyn PaymentGateway>,
    callback_url: Option<String>,
}

impl PaymentLedger {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        transactions: Arc<dyn TransactionStore>,
        gateway: Arc<dyn PaymentGateway>,
        callback_url: Option<String>,
    ) -> Self {
        Self {
            invoices,
            transactions,
            gateway,
            callback_url,
        }
    }

    /// Records a manual payment and applies it to the invoice
    ///
    /// The amount must be positive, in the invoice's currency, and no
    /// larger than the outstanding balance; a bursar over-keying an
    /// amount is rejected rather than recorded as an overpayment.
    pub async fn record_manual(
        &self,
        tenant: TenantId,
        invoice_id: InvoiceId,
        amount: Money,
        method: PaymentMethod,
        recorded_by: Option<String>,
    ) -> Result<PaymentReceipt, PaymentError> {
        if !method.is_manual() {
            return Err(PaymentError::Validation(
                "Gateway payments must go through checkout initiation".to_string(),
            ));
        }
        if !amount.is_positive() {
            return Err(PaymentError::Validation(
                "Payment amount must be positive".to_string(),
            ));
        }

        let invoice = self.invoices.get(tenant, invoice_id).await?;
        if amount.currency() != invoice.amount.currency() {
            return Err(PaymentError::Validation(format!(
                "Payment currency {} does not match invoice currency {}",
                amount.currency().code(),
                invoice.amount.currency().code()
            )));
        }

        let outstanding = invoice.outstanding();
        if amount > outstanding {
            warn!(
                tenant = %tenant,
                invoice = %invoice_id,
                amount = %amount,
                outstanding = %outstanding,
                "Manual payment exceeds outstanding balance"
            );
            return Err(PaymentError::ExceedsBalance { outstanding });
        }

        let transaction = PaymentTransaction::manual(
            tenant,
            invoice_id,
            invoice.student_id,
            amount,
            method,
            recorded_by,
        );
        // One store unit: the ledger row and the invoice credit land
        // together or not at all, so a failure here is safe to re-submit.
        let invoice = self.transactions.post_settled(transaction.clone()).await?;

        info!(
            tenant = %tenant,
            invoice = %invoice_id,
            transaction = %transaction.id,
            method = %transaction.method,
            amount = %amount,
            status = %invoice.status,
            "Manual payment recorded"
        );

        Ok(PaymentReceipt {
            transaction,
            invoice,
        })
    }

    /// Opens a gateway checkout for an invoice
    ///
    /// A pending transaction is written before the gateway is called, so
    /// the reference exists by the time any webhook can mention it. If
    /// the gateway call fails the transaction is marked failed and the
    /// gateway error is returned; nothing is retried here.
    pub async fn initiate_checkout(
        &self,
        tenant: TenantId,
        invoice_id: InvoiceId,
        payer_email: String,
        amount: Option<Money>,
    ) -> Result<CheckoutReceipt, PaymentError> {
        let invoice = self.invoices.get(tenant, invoice_id).await?;
        let outstanding = invoice.outstanding();

        // Defaults to paying off the full balance
        let amount = amount.unwrap_or(outstanding);
        if !amount.is_positive() {
            return Err(PaymentError::Validation(
                "Nothing left to pay on this invoice".to_string(),
            ));
        }
        if amount.currency() != invoice.amount.currency() {
            return Err(PaymentError::Validation(format!(
                "Payment currency {} does not match invoice currency {}",
                amount.currency().code(),
                invoice.amount.currency().code()
            )));
        }
        if amount > outstanding {
            return Err(PaymentError::ExceedsBalance { outstanding });
        }

        let transaction =
            PaymentTransaction::gateway_pending(tenant, invoice_id, invoice.student_id, amount);
        self.transactions.insert(transaction.clone()).await?;

        let request = InitializePayment {
            email: payer_email,
            amount_minor: amount.as_minor_units(),
            reference: transaction.reference.clone(),
            callback_url: self.callback_url.clone(),
        };

        let checkout = match self.gateway.initialize(request).await {
            Ok(checkout) => checkout,
            Err(err) => {
                warn!(
                    tenant = %tenant,
                    invoice = %invoice_id,
                    reference = %transaction.reference,
                    error = %err,
                    "Checkout initialization failed"
                );
                self.transactions
                    .mark_failed(&transaction.reference)
                    .await?;
                return Err(err.into());
            }
        };

        info!(
            tenant = %tenant,
            invoice = %invoice_id,
            reference = %transaction.reference,
            amount = %amount,
            "Checkout session initiated"
        );

        Ok(CheckoutReceipt {
            transaction,
            checkout,
        })
    }
}
