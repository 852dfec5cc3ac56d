//! Request/response data transfer objects
//!
//! Requests carry plain decimals; the handler attaches the tenant's
//! configured currency. Identifiers travel as prefixed display strings
//! (INV-..., TXN-...) and are parsed back leniently.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{Money, Term};
use domain_fees::{Invoice, InvoiceStatus};
use domain_payments::{CheckoutReceipt, PaymentMethod, PaymentTransaction, TransactionStatus};
use domain_reconciliation::{CashCountEntry, ReconciliationSession, SessionStatus};

// ============================================================================
// Invoices
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateInvoicesRequest {
    pub term: Term,
    /// Academic session, e.g. "2025/2026"
    pub session: String,
    /// Also bill optional fee categories (default: mandatory only)
    #[serde(default)]
    pub include_optional: bool,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: String,
    pub student_id: String,
    pub term: Term,
    pub session: String,
    pub amount: Money,
    pub amount_paid: Money,
    /// Balance still payable, floored at zero
    pub balance: Money,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id.to_string(),
            student_id: invoice.student_id.to_string(),
            term: invoice.term,
            session: invoice.session.to_string(),
            amount: invoice.amount,
            amount_paid: invoice.amount_paid,
            balance: invoice.outstanding(),
            status: invoice.status,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

// ============================================================================
// Payments
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub invoice_id: Uuid,
    /// Payer's email, passed to the gateway
    pub email: String,
    /// Omit to pay the full outstanding balance
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub invoice_id: String,
    pub reference: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub recorded_by: Option<String>,
    pub gateway_metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentTransaction> for TransactionResponse {
    fn from(txn: PaymentTransaction) -> Self {
        Self {
            id: txn.id.to_string(),
            invoice_id: txn.invoice_id.to_string(),
            reference: txn.reference,
            amount: txn.amount,
            method: txn.method,
            status: txn.status,
            recorded_by: txn.recorded_by,
            gateway_metadata: txn.gateway_metadata,
            created_at: txn.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentRecordedResponse {
    pub transaction: TransactionResponse,
    pub invoice: InvoiceResponse,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
    pub amount: Money,
}

impl From<CheckoutReceipt> for CheckoutResponse {
    fn from(receipt: CheckoutReceipt) -> Self {
        Self {
            reference: receipt.checkout.reference,
            authorization_url: receipt.checkout.authorization_url,
            access_code: receipt.checkout.access_code,
            amount: receipt.transaction.amount,
        }
    }
}

/// Gateway webhook envelope; only the reference is trusted
#[derive(Debug, Deserialize)]
pub struct GatewayWebhookEvent {
    pub event: String,
    pub data: GatewayWebhookData,
}

#[derive(Debug, Deserialize)]
pub struct GatewayWebhookData {
    pub reference: String,
}

// ============================================================================
// Result access
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub term: Term,
    pub session: String,
}

// ============================================================================
// Reconciliation
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub date: NaiveDate,
    pub system_cash_total: Money,
    pub system_bank_total: Money,
    pub physical_cash_total: Money,
    pub variance: Money,
    pub status: SessionStatus,
    pub close_note: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<ReconciliationSession> for SessionResponse {
    fn from(session: ReconciliationSession) -> Self {
        Self {
            id: session.id.to_string(),
            date: session.date,
            system_cash_total: session.system_cash_total,
            system_bank_total: session.system_bank_total,
            physical_cash_total: session.physical_cash_total,
            variance: session.variance,
            status: session.status,
            close_note: session.close_note,
            closed_at: session.closed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CashCountRequest {
    pub entries: Vec<CashCountEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CloseDayRequest {
    /// Optional variance justification recorded on the session
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatementImportRequest {
    pub lines: Vec<StatementLineRow>,
}

#[derive(Debug, Deserialize)]
pub struct StatementLineRow {
    pub date: NaiveDate,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct StatementImportResponse {
    pub imported: usize,
}
