//! Reconciliation domain ports

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use core_kernel::{
    DomainPort, Money, PortError, ReconciliationSessionId, StatementLineId, TenantId,
    TransactionId,
};
use domain_payments::PaymentMethod;

use crate::cash_count::CashCount;
use crate::matching::{BankStatementLine, SettledPayment};
use crate::session::ReconciliationSession;

/// Outcome of a conditional session insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInsertOutcome {
    Inserted,
    /// A session for (tenant, date) already exists
    AlreadyExists,
}

/// Session persistence
#[async_trait]
pub trait SessionStore: DomainPort {
    /// Inserts the session unless one exists for its (tenant, date)
    async fn insert_if_absent(
        &self,
        session: ReconciliationSession,
    ) -> Result<SessionInsertOutcome, PortError>;

    /// Fetches a session by id within the tenant scope
    async fn get(
        &self,
        tenant: TenantId,
        id: ReconciliationSessionId,
    ) -> Result<ReconciliationSession, PortError>;

    /// Finds the session for a day, if one has been opened
    async fn find_by_date(
        &self,
        tenant: TenantId,
        date: NaiveDate,
    ) -> Result<Option<ReconciliationSession>, PortError>;

    /// Persists the counted total and its derived variance
    async fn record_cash_totals(
        &self,
        tenant: TenantId,
        id: ReconciliationSessionId,
        physical_cash_total: Money,
        variance: Money,
    ) -> Result<(), PortError>;

    /// Conditionally closes an open session, stamping the optional
    /// variance justification. Returns true if this call performed the
    /// close, false if the session was already closed.
    async fn close_if_open(
        &self,
        tenant: TenantId,
        id: ReconciliationSessionId,
        note: Option<&str>,
    ) -> Result<bool, PortError>;
}

/// Cash count persistence
#[async_trait]
pub trait CashCountStore: DomainPort {
    /// Replaces the session's entire count sheet. Resubmission is a full
    /// overwrite, not an append.
    async fn replace_for_session(
        &self,
        tenant: TenantId,
        session: ReconciliationSessionId,
        counts: Vec<CashCount>,
    ) -> Result<(), PortError>;

    /// Returns the session's current count sheet
    async fn list_for_session(
        &self,
        tenant: TenantId,
        session: ReconciliationSessionId,
    ) -> Result<Vec<CashCount>, PortError>;
}

/// Statement line persistence
#[async_trait]
pub trait StatementStore: DomainPort {
    /// Appends imported lines to the session
    async fn insert_lines(&self, lines: Vec<BankStatementLine>) -> Result<(), PortError>;

    /// Returns all of the session's lines, matched and unmatched
    async fn list_for_session(
        &self,
        tenant: TenantId,
        session: ReconciliationSessionId,
    ) -> Result<Vec<BankStatementLine>, PortError>;

    /// Records established (line, ledger entry) pairings
    async fn record_matches(
        &self,
        tenant: TenantId,
        matches: &[(StatementLineId, TransactionId)],
    ) -> Result<(), PortError>;
}

/// Read access to settled payments, for matching and day totals
#[async_trait]
pub trait SettledLedger: DomainPort {
    /// Settled payments whose settlement day falls in [from, to]
    async fn settled_between(
        &self,
        tenant: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SettledPayment>, PortError>;
}

/// A day's settled total for one payment method
#[derive(Debug, Clone, Serialize)]
pub struct MethodTotal {
    pub method: PaymentMethod,
    pub count: u32,
    pub total: Money,
}

/// Delivery of the day-close summary to whoever reads it
///
/// Failure here never undoes a close; the session stays closed and the
/// failure is logged.
#[async_trait]
pub trait ReportChannel: DomainPort {
    async fn send_day_close_report(
        &self,
        report: &crate::service::DayCloseReport,
    ) -> Result<(), PortError>;
}
