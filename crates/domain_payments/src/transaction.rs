//! Payment transaction model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::{InvoiceId, Money, StudentId, TenantId, TransactionId};

/// How the money arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash handed to the bursar
    Cash,
    /// Bank transfer confirmed from a statement
    BankTransfer,
    /// Card payment on a physical POS terminal
    Pos,
    /// Online card payment through the gateway
    Gateway,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Pos => "pos",
            PaymentMethod::Gateway => "gateway",
        }
    }

    /// Manual methods are recorded by the bursar and settle immediately;
    /// only gateway payments go through the pending/verify lifecycle.
    pub fn is_manual(&self) -> bool {
        !matches!(self, PaymentMethod::Gateway)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "pos" => Ok(PaymentMethod::Pos),
            "gateway" => Ok(PaymentMethod::Gateway),
            other => Err(format!("Unknown payment method: {other}")),
        }
    }
}

/// Lifecycle of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Checkout initiated, money not yet confirmed
    Pending,
    /// Money confirmed and credited to the invoice
    Success,
    /// Gateway reported the payment failed
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("Unknown transaction status: {other}")),
        }
    }
}

/// One payment against an invoice
///
/// `reference` is unique across all tenants; for gateway payments it is
/// the string handed to the gateway at initialization and echoed back by
/// webhooks, so settlement can locate the transaction without any tenant
/// context in the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub student_id: StudentId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub reference: String,
    /// Who keyed the payment in, for manual entries
    pub recorded_by: Option<String>,
    /// Whatever the gateway reported at settlement (channel, paid_at),
    /// kept opaque; always None for manual payments
    pub gateway_metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generates a fresh gateway reference, e.g. "FEE-550e8400-..."
pub fn new_reference() -> String {
    format!("FEE-{}", Uuid::new_v4())
}

impl PaymentTransaction {
    /// A manual payment, recorded as settled immediately
    pub fn manual(
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        student_id: StudentId,
        amount: Money,
        method: PaymentMethod,
        recorded_by: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new_v7(),
            tenant_id,
            invoice_id,
            student_id,
            amount,
            method,
            status: TransactionStatus::Success,
            reference: new_reference(),
            recorded_by,
            gateway_metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A gateway payment awaiting confirmation
    pub fn gateway_pending(
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        student_id: StudentId,
        amount: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new_v7(),
            tenant_id,
            invoice_id,
            student_id,
            amount,
            method: PaymentMethod::Gateway,
            status: TransactionStatus::Pending,
            reference: new_reference(),
            recorded_by: None,
            gateway_metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status == TransactionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn ngn(v: rust_decimal::Decimal) -> Money {
        Money::new(v, Currency::NGN)
    }

    #[test]
    fn manual_transaction_settles_immediately() {
        let txn = PaymentTransaction::manual(
            TenantId::new(),
            InvoiceId::new(),
            StudentId::new(),
            ngn(dec!(5000)),
            PaymentMethod::Cash,
            Some("bursar@school".to_string()),
        );
        assert_eq!(txn.status, TransactionStatus::Success);
        assert!(txn.is_settled());
        assert!(txn.reference.starts_with("FEE-"));
    }

    #[test]
    fn gateway_transaction_starts_pending() {
        let txn = PaymentTransaction::gateway_pending(
            TenantId::new(),
            InvoiceId::new(),
            StudentId::new(),
            ngn(dec!(5000)),
        );
        assert_eq!(txn.method, PaymentMethod::Gateway);
        assert_eq!(txn.status, TransactionStatus::Pending);
        assert!(!txn.is_settled());
    }

    #[test]
    fn references_are_unique() {
        assert_ne!(new_reference(), new_reference());
    }

    #[test]
    fn method_round_trip() {
        for method in [
            PaymentMethod::Cash,
            PaymentMethod::BankTransfer,
            PaymentMethod::Pos,
            PaymentMethod::Gateway,
        ] {
            let parsed: PaymentMethod = method.as_str().parse().unwrap();
            assert_eq!(parsed, method);
        }
    }

    #[test]
    fn status_serde_is_snake_case() {
        let json = serde_json::to_string(&TransactionStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
