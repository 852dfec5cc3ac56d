//! Batch invoice generation
//!
//! Materializes one invoice per eligible student from the fee schedule for
//! an active term/session. The (tenant, student, term, session) unique key
//! is the idempotency guard: re-running the batch is a no-op for students
//! already billed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use core_kernel::{AcademicSession, Money, TenantId, Term};

use crate::error::FeesError;
use crate::invoice::Invoice;
use crate::ports::{FeeCatalog, InsertOutcome, InvoiceStore, StudentDirectory};

/// Controls which schedule entries a generation run includes
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationPolicy {
    /// Include optional (opt-in) fee categories in every invoice.
    /// Defaults to mandatory-only billing.
    pub include_optional: bool,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            include_optional: false,
        }
    }
}

/// Result of a generation batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Invoices inserted by this run
    pub generated: u32,
    /// Students whose invoice already existed (idempotent re-run)
    pub already_billed: u32,
    /// Students skipped for lack of a class assignment
    pub skipped_no_class: u32,
    /// Students skipped because no schedule entry matched their class
    pub skipped_no_schedule: u32,
}

impl GenerationSummary {
    /// Total students skipped rather than billed
    pub fn skipped(&self) -> u32 {
        self.skipped_no_class + self.skipped_no_schedule
    }
}

/// The batch invoice generator
pub struct InvoiceGenerator {
    students: Arc<dyn StudentDirectory>,
    catalog: Arc<dyn FeeCatalog>,
    invoices: Arc<dyn InvoiceStore>,
}

impl InvoiceGenerator {
    /// Creates a generator over the given ports
    pub fn new(
        students: Arc<dyn StudentDirectory>,
        catalog: Arc<dyn FeeCatalog>,
        invoices: Arc<dyn InvoiceStore>,
    ) -> Self {
        Self {
            students,
            catalog,
            invoices,
        }
    }

    /// Generates invoices for every eligible student in the term
    ///
    /// Students without a class assignment, or whose class has no matching
    /// schedule entries, are counted as skipped; they are never invoiced
    /// for zero. A unique-key conflict means the student was already
    /// billed and is not an error.
    pub async fn generate(
        &self,
        tenant: TenantId,
        term: Term,
        session: AcademicSession,
        policy: GenerationPolicy,
    ) -> Result<GenerationSummary, FeesError> {
        let students = self.students.active_students(tenant).await?;
        info!(
            tenant = %tenant,
            term = %term,
            session = %session,
            students = students.len(),
            include_optional = policy.include_optional,
            "Starting invoice generation"
        );

        let mut summary = GenerationSummary::default();

        for student in students {
            let Some(classroom) = student.classroom_id else {
                summary.skipped_no_class += 1;
                continue;
            };

            let entries = self
                .catalog
                .schedule_for_class(tenant, classroom, term, &session)
                .await?;

            let billable: Vec<_> = entries
                .into_iter()
                .filter(|e| e.mandatory || policy.include_optional)
                .collect();

            let Some(first) = billable.first() else {
                warn!(
                    tenant = %tenant,
                    student = %student.id,
                    classroom = %classroom,
                    "No fee schedule entries for class; skipping student"
                );
                summary.skipped_no_schedule += 1;
                continue;
            };

            let mut amount = Money::zero(first.amount.currency());
            for entry in &billable {
                amount = amount.checked_add(&entry.amount)?;
            }

            let invoice = Invoice::new(tenant, student.id, term, session.clone(), amount);
            match self.invoices.insert_if_absent(invoice).await? {
                InsertOutcome::Inserted => summary.generated += 1,
                InsertOutcome::AlreadyExists => summary.already_billed += 1,
            }
        }

        info!(
            tenant = %tenant,
            generated = summary.generated,
            already_billed = summary.already_billed,
            skipped = summary.skipped(),
            "Invoice generation complete"
        );

        Ok(summary)
    }
}
