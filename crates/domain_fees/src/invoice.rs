//! Invoice aggregate and the balance/status rule
//!
//! An invoice is created once by the generator and mutated only by
//! successful payments applied to it. Its status is never stored
//! independently of the rule below: every mutation site recomputes it from
//! `amount` and `amount_paid` in the same operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AcademicSession, InvoiceId, Money, StudentId, TenantId, Term};

/// Payment status of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Nothing has been paid
    Owing,
    /// Some but not all of the amount has been paid
    Partial,
    /// The full amount (or more) has been paid
    Paid,
}

impl InvoiceStatus {
    /// Derives the status from the billed amount and the cumulative amount paid
    ///
    /// This is the single source of truth for invoice status; the SQL
    /// adapter mirrors it inside its atomic update so database state can
    /// never hold an inconsistent pair.
    pub fn derive(amount: Money, amount_paid: Money) -> Self {
        if amount_paid >= amount {
            InvoiceStatus::Paid
        } else if amount_paid.is_positive() {
            InvoiceStatus::Partial
        } else {
            InvoiceStatus::Owing
        }
    }

    /// Returns the canonical lowercase name used in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Owing => "owing",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owing" => Ok(InvoiceStatus::Owing),
            "partial" => Ok(InvoiceStatus::Partial),
            "paid" => Ok(InvoiceStatus::Paid),
            other => Err(format!("Unknown invoice status: {other}")),
        }
    }
}

/// A per-student, per-term billing record with a running balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Owning tenant (school)
    pub tenant_id: TenantId,
    /// Student being billed
    pub student_id: StudentId,
    /// School term
    pub term: Term,
    /// Academic session
    pub session: AcademicSession,
    /// Total amount due
    pub amount: Money,
    /// Cumulative amount settled against this invoice
    pub amount_paid: Money,
    /// Derived payment status
    pub status: InvoiceStatus,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a new unpaid invoice
    pub fn new(
        tenant_id: TenantId,
        student_id: StudentId,
        term: Term,
        session: AcademicSession,
        amount: Money,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: InvoiceId::new_v7(),
            tenant_id,
            student_id,
            term,
            session,
            amount,
            amount_paid: Money::zero(amount.currency()),
            status: InvoiceStatus::derive(amount, Money::zero(amount.currency())),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the signed balance: amount minus amount paid
    ///
    /// Negative when the invoice has been overpaid by a gateway settlement.
    pub fn balance(&self) -> Money {
        self.amount - self.amount_paid
    }

    /// Returns the balance still payable, floored at zero
    pub fn outstanding(&self) -> Money {
        self.balance().max_zero()
    }

    /// Applies a settled payment amount and recomputes the status
    ///
    /// Callers that persist invoices must perform the equivalent of this
    /// method in a single atomic statement or under a row lock; this
    /// in-process form exists for aggregates held in memory (tests,
    /// in-memory adapters) and for deriving expected state.
    pub fn apply_payment(&mut self, amount: Money) {
        self.amount_paid = self.amount_paid + amount;
        self.status = InvoiceStatus::derive(self.amount, self.amount_paid);
        self.updated_at = Utc::now();
    }
}
