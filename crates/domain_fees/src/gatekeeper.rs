//! Result access gate
//!
//! Protected content (student result records) is withheld until the
//! student's invoice for the term is fully paid. The gate re-evaluates on
//! every call so a just-completed payment unlocks immediately; nothing
//! here is cached.

use std::sync::Arc;

use serde::Serialize;

use core_kernel::{AcademicSession, Money, StudentId, TenantId, Term};

use crate::error::FeesError;
use crate::invoice::InvoiceStatus;
use crate::ports::InvoiceStore;

/// Whether content is unlocked, and the balance still payable if not
#[derive(Debug, Clone, Serialize)]
pub struct AccessDecision {
    /// True only when the term's invoice status is paid
    pub unlocked: bool,
    /// Outstanding balance shown to the consumer, floored at zero
    pub balance: Money,
}

/// Policy consumed by protected-content views
pub struct ResultGate {
    invoices: Arc<dyn InvoiceStore>,
    currency: core_kernel::Currency,
}

impl ResultGate {
    /// Creates a gate reading from the given invoice store
    pub fn new(invoices: Arc<dyn InvoiceStore>, currency: core_kernel::Currency) -> Self {
        Self { invoices, currency }
    }

    /// Evaluates the gate for a student's term
    ///
    /// A student with no invoice for the term has not been billed yet;
    /// content stays locked with a zero balance rather than leaking results
    /// before billing has run.
    pub async fn evaluate(
        &self,
        tenant: TenantId,
        student: StudentId,
        term: Term,
        session: &AcademicSession,
    ) -> Result<AccessDecision, FeesError> {
        let invoice = self
            .invoices
            .find_for_student(tenant, student, term, session)
            .await?;

        let decision = match invoice {
            Some(invoice) => AccessDecision {
                unlocked: invoice.status == InvoiceStatus::Paid,
                balance: invoice.outstanding(),
            },
            None => AccessDecision {
                unlocked: false,
                balance: Money::zero(self.currency),
            },
        };

        Ok(decision)
    }
}
