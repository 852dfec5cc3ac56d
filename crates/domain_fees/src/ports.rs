//! Fees domain ports
//!
//! These traits define everything the fee domain needs from its
//! surroundings: the student roster, the fee schedule, and invoice
//! persistence. The PostgreSQL adapters live in `infra_db`; tests use
//! in-memory implementations.

use async_trait::async_trait;

use core_kernel::{
    AcademicSession, ClassroomId, DomainPort, InvoiceId, Money, PortError, StudentId, TenantId,
    Term,
};

use crate::catalog::FeeScheduleEntry;
use crate::invoice::Invoice;

/// A student as the generator sees them
#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: StudentId,
    /// None when the student has not been assigned to a class; such
    /// students are skipped (and counted) by the generator.
    pub classroom_id: Option<ClassroomId>,
}

/// Read access to the student roster
#[async_trait]
pub trait StudentDirectory: DomainPort {
    /// Returns all active students for the tenant
    async fn active_students(&self, tenant: TenantId) -> Result<Vec<StudentRecord>, PortError>;
}

/// Read access to the fee schedule
#[async_trait]
pub trait FeeCatalog: DomainPort {
    /// Returns the schedule entries for a class in a term/session
    async fn schedule_for_class(
        &self,
        tenant: TenantId,
        classroom: ClassroomId,
        term: Term,
        session: &AcademicSession,
    ) -> Result<Vec<FeeScheduleEntry>, PortError>;
}

/// Outcome of a conditional invoice insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The invoice was inserted
    Inserted,
    /// An invoice already exists for (tenant, student, term, session);
    /// the unique key absorbed the write
    AlreadyExists,
}

/// Invoice persistence
///
/// `apply_settled_amount` is the single mutation path for `amount_paid`.
/// Implementations must make the increment and the status recomputation
/// one atomic operation (a conditional UPDATE or a row lock), so that
/// concurrent payments cannot lose updates and status can never be
/// observed inconsistent with `amount_paid`.
#[async_trait]
pub trait InvoiceStore: DomainPort {
    /// Inserts the invoice unless one already exists for its unique key
    async fn insert_if_absent(&self, invoice: Invoice) -> Result<InsertOutcome, PortError>;

    /// Fetches an invoice by id within the tenant scope
    async fn get(&self, tenant: TenantId, id: InvoiceId) -> Result<Invoice, PortError>;

    /// Finds a student's invoice for a term/session, if any
    async fn find_for_student(
        &self,
        tenant: TenantId,
        student: StudentId,
        term: Term,
        session: &AcademicSession,
    ) -> Result<Option<Invoice>, PortError>;

    /// Lists all of a student's invoices, newest first
    async fn list_for_student(
        &self,
        tenant: TenantId,
        student: StudentId,
    ) -> Result<Vec<Invoice>, PortError>;

    /// Atomically adds a settled amount to `amount_paid` and recomputes the
    /// status, returning the updated invoice
    async fn apply_settled_amount(
        &self,
        tenant: TenantId,
        id: InvoiceId,
        amount: Money,
    ) -> Result<Invoice, PortError>;
}
