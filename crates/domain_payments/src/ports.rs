//! Payments domain ports

use async_trait::async_trait;

use core_kernel::{DomainPort, InvoiceId, PortError, TenantId};
use domain_fees::Invoice;

use crate::transaction::PaymentTransaction;

/// Transaction persistence
///
/// `settle_and_credit` is the settlement gate: the pending -> success
/// flip and the invoice credit must land as one unit, and the flip must
/// be conditional, so that concurrent webhook deliveries for the same
/// reference credit the invoice exactly once and a failed credit leaves
/// the transaction pending for a retry.
#[async_trait]
pub trait TransactionStore: DomainPort {
    /// Persists a new transaction; the reference must be unique
    async fn insert(&self, transaction: PaymentTransaction) -> Result<(), PortError>;

    /// Persists an already-settled transaction and credits its invoice
    /// as one unit; neither write survives without the other. Returns
    /// the invoice after the credit.
    async fn post_settled(&self, transaction: PaymentTransaction) -> Result<Invoice, PortError>;

    /// Looks a transaction up by its reference. References are globally
    /// unique, so no tenant scope is needed; webhooks carry none.
    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentTransaction>, PortError>;

    /// Lists all transactions recorded against an invoice, newest first
    async fn list_for_invoice(
        &self,
        tenant: TenantId,
        invoice: InvoiceId,
    ) -> Result<Vec<PaymentTransaction>, PortError>;

    /// Flips a pending transaction to success, stores what the gateway
    /// reported, and credits the invoice, all in one unit. Returns the
    /// credited invoice, or None when the transaction was no longer
    /// pending and nothing was applied.
    async fn settle_and_credit(
        &self,
        reference: &str,
        gateway_metadata: Option<&serde_json::Value>,
    ) -> Result<Option<Invoice>, PortError>;

    /// Marks a pending transaction failed
    async fn mark_failed(&self, reference: &str) -> Result<(), PortError>;
}
