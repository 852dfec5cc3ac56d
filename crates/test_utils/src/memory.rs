//! In-memory port adapters
//!
//! Hashmap-and-vec implementations of every persistence port, good enough
//! to wire whole services together in tests without PostgreSQL. The
//! conditional-update semantics (idempotent inserts, the pending -> success
//! settlement flip, close-if-open) match what the SQL adapters do.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use core_kernel::{
    AcademicSession, ClassroomId, DomainPort, HealthCheckResult, HealthCheckable, HealthStatus,
    InvoiceId, Money, PortError, ReconciliationSessionId, StatementLineId, StudentId, TenantId,
    Term, TransactionId,
};
use domain_fees::{
    FeeCatalog, FeeScheduleEntry, InsertOutcome, Invoice, InvoiceStore, StudentDirectory,
    StudentRecord,
};
use domain_payments::{PaymentTransaction, TransactionStatus, TransactionStore};
use domain_reconciliation::{
    BankStatementLine, CashCount, CashCountStore, DayCloseReport, ReconciliationSession,
    ReportChannel, SessionInsertOutcome, SessionStatus, SessionStore, SettledLedger,
    SettledPayment, StatementStore,
};

// ============================================================================
// Roster and catalog
// ============================================================================

/// A fixed student roster
#[derive(Default)]
pub struct MemoryStudentDirectory {
    rows: Mutex<Vec<(TenantId, StudentRecord)>>,
}

impl MemoryStudentDirectory {
    pub fn seed(&self, tenant: TenantId, student: StudentId, classroom: Option<ClassroomId>) {
        self.rows.lock().unwrap().push((
            tenant,
            StudentRecord {
                id: student,
                classroom_id: classroom,
            },
        ));
    }
}

impl DomainPort for MemoryStudentDirectory {}

#[async_trait]
impl StudentDirectory for MemoryStudentDirectory {
    async fn active_students(&self, tenant: TenantId) -> Result<Vec<StudentRecord>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == tenant)
            .map(|(_, s)| s.clone())
            .collect())
    }
}

/// A fixed fee schedule
#[derive(Default)]
pub struct MemoryFeeCatalog {
    entries: Mutex<Vec<FeeScheduleEntry>>,
}

impl MemoryFeeCatalog {
    pub fn seed(&self, entry: FeeScheduleEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

impl DomainPort for MemoryFeeCatalog {}

#[async_trait]
impl FeeCatalog for MemoryFeeCatalog {
    async fn schedule_for_class(
        &self,
        tenant: TenantId,
        classroom: ClassroomId,
        term: Term,
        session: &AcademicSession,
    ) -> Result<Vec<FeeScheduleEntry>, PortError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.tenant_id == tenant
                    && e.classroom_id == classroom
                    && e.term == term
                    && &e.session == session
            })
            .cloned()
            .collect())
    }
}

// ============================================================================
// Invoices
// ============================================================================

/// Invoice persistence backed by a vec
#[derive(Default)]
pub struct MemoryInvoiceStore {
    rows: Mutex<Vec<Invoice>>,
    fail_next_apply: Mutex<bool>,
}

impl MemoryInvoiceStore {
    pub fn seed(&self, invoice: Invoice) {
        self.rows.lock().unwrap().push(invoice);
    }

    /// Makes the next credit fail, for exercising posting failures
    pub fn fail_next_apply(&self) {
        *self.fail_next_apply.lock().unwrap() = true;
    }
}

impl DomainPort for MemoryInvoiceStore {}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn insert_if_absent(&self, invoice: Invoice) -> Result<InsertOutcome, PortError> {
        let mut rows = self.rows.lock().unwrap();
        let exists = rows.iter().any(|i| {
            i.tenant_id == invoice.tenant_id
                && i.student_id == invoice.student_id
                && i.term == invoice.term
                && i.session == invoice.session
        });
        if exists {
            return Ok(InsertOutcome::AlreadyExists);
        }
        rows.push(invoice);
        Ok(InsertOutcome::Inserted)
    }

    async fn get(&self, tenant: TenantId, id: InvoiceId) -> Result<Invoice, PortError> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.tenant_id == tenant && i.id == id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Invoice", id))
    }

    async fn find_for_student(
        &self,
        tenant: TenantId,
        student: StudentId,
        term: Term,
        session: &AcademicSession,
    ) -> Result<Option<Invoice>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|i| {
                i.tenant_id == tenant
                    && i.student_id == student
                    && i.term == term
                    && &i.session == session
            })
            .cloned())
    }

    async fn list_for_student(
        &self,
        tenant: TenantId,
        student: StudentId,
    ) -> Result<Vec<Invoice>, PortError> {
        let mut invoices: Vec<Invoice> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.tenant_id == tenant && i.student_id == student)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    async fn apply_settled_amount(
        &self,
        tenant: TenantId,
        id: InvoiceId,
        amount: Money,
    ) -> Result<Invoice, PortError> {
        if std::mem::take(&mut *self.fail_next_apply.lock().unwrap()) {
            return Err(PortError::connection("Invoice store unavailable"));
        }
        let mut rows = self.rows.lock().unwrap();
        let invoice = rows
            .iter_mut()
            .find(|i| i.tenant_id == tenant && i.id == id)
            .ok_or_else(|| PortError::not_found("Invoice", id))?;
        invoice.apply_payment(amount);
        Ok(invoice.clone())
    }
}

// ============================================================================
// Transactions (and the settled-ledger view over them)
// ============================================================================

/// Transaction persistence backed by a vec
///
/// Also serves the reconciliation domain's `SettledLedger` view, the way
/// the SQL adapter does over the same table. Holds the invoice store so
/// the posting operations can credit invoices in the same unit, like the
/// SQL adapter's database transactions.
pub struct MemoryTransactionStore {
    rows: Mutex<Vec<PaymentTransaction>>,
    invoices: Arc<MemoryInvoiceStore>,
}

impl MemoryTransactionStore {
    pub fn new(invoices: Arc<MemoryInvoiceStore>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            invoices,
        }
    }

    pub fn seed(&self, transaction: PaymentTransaction) {
        self.rows.lock().unwrap().push(transaction);
    }

    pub fn all(&self) -> Vec<PaymentTransaction> {
        self.rows.lock().unwrap().clone()
    }
}

impl DomainPort for MemoryTransactionStore {}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn insert(&self, transaction: PaymentTransaction) -> Result<(), PortError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|t| t.reference == transaction.reference) {
            return Err(PortError::conflict("Duplicate transaction reference"));
        }
        rows.push(transaction);
        Ok(())
    }

    async fn post_settled(&self, transaction: PaymentTransaction) -> Result<Invoice, PortError> {
        {
            let rows = self.rows.lock().unwrap();
            if rows.iter().any(|t| t.reference == transaction.reference) {
                return Err(PortError::conflict("Duplicate transaction reference"));
            }
        }
        // Credit first; the ledger row is only kept once the credit lands,
        // matching the all-or-nothing SQL unit.
        let invoice = self
            .invoices
            .apply_settled_amount(transaction.tenant_id, transaction.invoice_id, transaction.amount)
            .await?;
        self.rows.lock().unwrap().push(transaction);
        Ok(invoice)
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentTransaction>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.reference == reference)
            .cloned())
    }

    async fn list_for_invoice(
        &self,
        tenant: TenantId,
        invoice: InvoiceId,
    ) -> Result<Vec<PaymentTransaction>, PortError> {
        let mut transactions: Vec<PaymentTransaction> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.tenant_id == tenant && t.invoice_id == invoice)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    async fn settle_and_credit(
        &self,
        reference: &str,
        gateway_metadata: Option<&serde_json::Value>,
    ) -> Result<Option<Invoice>, PortError> {
        let (tenant, invoice_id, amount) = {
            let rows = self.rows.lock().unwrap();
            match rows
                .iter()
                .find(|t| t.reference == reference && t.status == TransactionStatus::Pending)
            {
                Some(t) => (t.tenant_id, t.invoice_id, t.amount),
                None => return Ok(None),
            }
        };

        // Credit first, flip after; a failed credit leaves the
        // transaction pending, matching the SQL adapter's rollback.
        let invoice = self
            .invoices
            .apply_settled_amount(tenant, invoice_id, amount)
            .await?;

        let mut rows = self.rows.lock().unwrap();
        if let Some(transaction) = rows
            .iter_mut()
            .find(|t| t.reference == reference && t.status == TransactionStatus::Pending)
        {
            transaction.status = TransactionStatus::Success;
            transaction.gateway_metadata = gateway_metadata.cloned();
            transaction.updated_at = Utc::now();
        }
        Ok(Some(invoice))
    }

    async fn mark_failed(&self, reference: &str) -> Result<(), PortError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(transaction) = rows
            .iter_mut()
            .find(|t| t.reference == reference && t.status == TransactionStatus::Pending)
        {
            transaction.status = TransactionStatus::Failed;
            transaction.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl SettledLedger for MemoryTransactionStore {
    async fn settled_between(
        &self,
        tenant: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SettledPayment>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.tenant_id == tenant && t.status == TransactionStatus::Success)
            .filter(|t| {
                let settled_on = t.updated_at.date_naive();
                settled_on >= from && settled_on <= to
            })
            .map(|t| SettledPayment {
                transaction_id: t.id,
                amount: t.amount,
                date: t.updated_at.date_naive(),
                method: t.method,
            })
            .collect())
    }
}

// ============================================================================
// Reconciliation stores
// ============================================================================

/// Session persistence backed by a vec
#[derive(Default)]
pub struct MemorySessionStore {
    rows: Mutex<Vec<ReconciliationSession>>,
}

impl DomainPort for MemorySessionStore {}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert_if_absent(
        &self,
        session: ReconciliationSession,
    ) -> Result<SessionInsertOutcome, PortError> {
        let mut rows = self.rows.lock().unwrap();
        let exists = rows
            .iter()
            .any(|s| s.tenant_id == session.tenant_id && s.date == session.date);
        if exists {
            return Ok(SessionInsertOutcome::AlreadyExists);
        }
        rows.push(session);
        Ok(SessionInsertOutcome::Inserted)
    }

    async fn get(
        &self,
        tenant: TenantId,
        id: ReconciliationSessionId,
    ) -> Result<ReconciliationSession, PortError> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.tenant_id == tenant && s.id == id)
            .cloned()
            .ok_or_else(|| PortError::not_found("ReconciliationSession", id))
    }

    async fn find_by_date(
        &self,
        tenant: TenantId,
        date: NaiveDate,
    ) -> Result<Option<ReconciliationSession>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.tenant_id == tenant && s.date == date)
            .cloned())
    }

    async fn record_cash_totals(
        &self,
        tenant: TenantId,
        id: ReconciliationSessionId,
        physical_cash_total: Money,
        variance: Money,
    ) -> Result<(), PortError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(session) = rows.iter_mut().find(|s| {
            s.tenant_id == tenant && s.id == id && s.status == SessionStatus::Open
        }) {
            session.physical_cash_total = physical_cash_total;
            session.variance = variance;
        }
        Ok(())
    }

    async fn close_if_open(
        &self,
        tenant: TenantId,
        id: ReconciliationSessionId,
        note: Option<&str>,
    ) -> Result<bool, PortError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|s| {
            s.tenant_id == tenant && s.id == id && s.status == SessionStatus::Open
        }) {
            Some(session) => {
                session.status = SessionStatus::Closed;
                session.close_note = note.map(str::to_owned);
                session.closed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Cash count persistence backed by a vec
#[derive(Default)]
pub struct MemoryCashCountStore {
    rows: Mutex<Vec<CashCount>>,
}

impl DomainPort for MemoryCashCountStore {}

#[async_trait]
impl CashCountStore for MemoryCashCountStore {
    async fn replace_for_session(
        &self,
        tenant: TenantId,
        session: ReconciliationSessionId,
        counts: Vec<CashCount>,
    ) -> Result<(), PortError> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|c| !(c.tenant_id == tenant && c.session_id == session));
        rows.extend(counts);
        Ok(())
    }

    async fn list_for_session(
        &self,
        tenant: TenantId,
        session: ReconciliationSessionId,
    ) -> Result<Vec<CashCount>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.tenant_id == tenant && c.session_id == session)
            .cloned()
            .collect())
    }
}

/// Statement line persistence backed by a vec
#[derive(Default)]
pub struct MemoryStatementStore {
    rows: Mutex<Vec<BankStatementLine>>,
}

impl DomainPort for MemoryStatementStore {}

#[async_trait]
impl StatementStore for MemoryStatementStore {
    async fn insert_lines(&self, lines: Vec<BankStatementLine>) -> Result<(), PortError> {
        self.rows.lock().unwrap().extend(lines);
        Ok(())
    }

    async fn list_for_session(
        &self,
        tenant: TenantId,
        session: ReconciliationSessionId,
    ) -> Result<Vec<BankStatementLine>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.tenant_id == tenant && l.session_id == session)
            .cloned()
            .collect())
    }

    async fn record_matches(
        &self,
        tenant: TenantId,
        matches: &[(StatementLineId, TransactionId)],
    ) -> Result<(), PortError> {
        let mut rows = self.rows.lock().unwrap();
        for (line_id, transaction_id) in matches {
            if let Some(line) = rows.iter_mut().find(|l| {
                l.tenant_id == tenant && l.id == *line_id && l.matched_transaction_id.is_none()
            }) {
                line.matched_transaction_id = Some(*transaction_id);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Report channel and health
// ============================================================================

/// Captures day-close reports, optionally failing on demand
#[derive(Default)]
pub struct CapturingReportChannel {
    sent: Mutex<Vec<DayCloseReport>>,
    fail_next: Mutex<bool>,
}

impl CapturingReportChannel {
    /// Makes the next delivery fail
    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<DayCloseReport> {
        self.sent.lock().unwrap().clone()
    }
}

impl DomainPort for CapturingReportChannel {}

#[async_trait]
impl ReportChannel for CapturingReportChannel {
    async fn send_day_close_report(&self, report: &DayCloseReport) -> Result<(), PortError> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(PortError::connection("Report channel unavailable"));
        }
        self.sent.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// A health check that always reports healthy
#[derive(Debug, Clone, Default)]
pub struct AlwaysHealthy;

#[async_trait]
impl HealthCheckable for AlwaysHealthy {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            status: HealthStatus::Healthy,
            latency_ms: 0,
            message: None,
        }
    }
}
