//! Tests for invoice generation and result gating over in-memory ports

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal_macros::dec;

use core_kernel::{
    AcademicSession, ClassroomId, Currency, InvoiceId, Money, PortError, StudentId, TenantId, Term,
};
use domain_fees::{
    FeeCategory, FeeCatalog, FeeScheduleEntry, GenerationPolicy, InsertOutcome, Invoice,
    InvoiceGenerator, InvoiceStatus, InvoiceStore, ResultGate, StudentDirectory, StudentRecord,
};

fn ngn(value: rust_decimal::Decimal) -> Money {
    Money::new(value, Currency::NGN)
}

// ============================================================================
// In-memory adapters
// ============================================================================

struct FixedRoster {
    students: Vec<StudentRecord>,
}

impl core_kernel::DomainPort for FixedRoster {}

#[async_trait]
impl StudentDirectory for FixedRoster {
    async fn active_students(&self, _tenant: TenantId) -> Result<Vec<StudentRecord>, PortError> {
        Ok(self.students.clone())
    }
}

struct FixedCatalog {
    entries: Vec<FeeScheduleEntry>,
}

impl core_kernel::DomainPort for FixedCatalog {}

#[async_trait]
impl FeeCatalog for FixedCatalog {
    async fn schedule_for_class(
        &self,
        tenant: TenantId,
        classroom: ClassroomId,
        term: Term,
        session: &AcademicSession,
    ) -> Result<Vec<FeeScheduleEntry>, PortError> {
        Ok(self
            .entries
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

#[derive(Default)]
struct MemoryInvoices {
    rows: Mutex<Vec<Invoice>>,
}

impl core_kernel::DomainPort for MemoryInvoices {}

#[async_trait]
impl InvoiceStore for MemoryInvoices {
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
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.tenant_id == tenant && i.student_id == student)
            .cloned()
            .collect())
    }

    async fn apply_settled_amount(
        &self,
        tenant: TenantId,
        id: InvoiceId,
        amount: Money,
    ) -> Result<Invoice, PortError> {
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
// Fixtures
// ============================================================================

struct Fixture {
    tenant: TenantId,
    session: AcademicSession,
    roster: Arc<FixedRoster>,
    catalog: Arc<FixedCatalog>,
    invoices: Arc<MemoryInvoices>,
}

/// Three students: two in a class with a schedule, one unassigned.
fn fixture() -> Fixture {
    let tenant = TenantId::new();
    let session = AcademicSession::starting(2025);
    let classroom = ClassroomId::new();

    let tuition = FeeCategory::mandatory(tenant, "Tuition");
    let exams = FeeCategory::mandatory(tenant, "Examination");
    let bus = FeeCategory::optional(tenant, "Bus");

    let entries = vec![
        FeeScheduleEntry::new(
            &tuition,
            classroom,
            Term::First,
            session.clone(),
            ngn(dec!(80000)),
        ),
        FeeScheduleEntry::new(
            &exams,
            classroom,
            Term::First,
            session.clone(),
            ngn(dec!(5000)),
        ),
        FeeScheduleEntry::new(
            &bus,
            classroom,
            Term::First,
            session.clone(),
            ngn(dec!(15000)),
        ),
    ];

    let roster = FixedRoster {
        students: vec![
            StudentRecord {
                id: StudentId::new(),
                classroom_id: Some(classroom),
            },
            StudentRecord {
                id: StudentId::new(),
                classroom_id: Some(classroom),
            },
            StudentRecord {
                id: StudentId::new(),
                classroom_id: None,
            },
        ],
    };

    Fixture {
        tenant,
        session,
        roster: Arc::new(roster),
        catalog: Arc::new(FixedCatalog { entries }),
        invoices: Arc::new(MemoryInvoices::default()),
    }
}

fn generator(fx: &Fixture) -> InvoiceGenerator {
    InvoiceGenerator::new(fx.roster.clone(), fx.catalog.clone(), fx.invoices.clone())
}

// ============================================================================
// Generator tests
// ============================================================================

#[tokio::test]
async fn generates_mandatory_fees_only_by_default() {
    let fx = fixture();
    let summary = generator(&fx)
        .generate(
            fx.tenant,
            Term::First,
            fx.session.clone(),
            GenerationPolicy::default(),
        )
        .await
        .unwrap();

    assert_eq!(summary.generated, 2);
    assert_eq!(summary.skipped_no_class, 1);
    assert_eq!(summary.skipped_no_schedule, 0);

    let billed = fx.roster.students[0].id;
    let invoice = fx
        .invoices
        .find_for_student(fx.tenant, billed, Term::First, &fx.session)
        .await
        .unwrap()
        .unwrap();
    // 80000 tuition + 5000 exams; optional bus fee excluded
    assert_eq!(invoice.amount, ngn(dec!(85000)));
    assert_eq!(invoice.status, InvoiceStatus::Owing);
}

#[tokio::test]
async fn policy_can_include_optional_fees() {
    let fx = fixture();
    generator(&fx)
        .generate(
            fx.tenant,
            Term::First,
            fx.session.clone(),
            GenerationPolicy {
                include_optional: true,
            },
        )
        .await
        .unwrap();

    let billed = fx.roster.students[0].id;
    let invoice = fx
        .invoices
        .find_for_student(fx.tenant, billed, Term::First, &fx.session)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.amount, ngn(dec!(100000)));
}

#[tokio::test]
async fn regeneration_is_idempotent() {
    let fx = fixture();
    let gen = generator(&fx);

    let first = gen
        .generate(
            fx.tenant,
            Term::First,
            fx.session.clone(),
            GenerationPolicy::default(),
        )
        .await
        .unwrap();
    let second = gen
        .generate(
            fx.tenant,
            Term::First,
            fx.session.clone(),
            GenerationPolicy::default(),
        )
        .await
        .unwrap();

    assert_eq!(first.generated, 2);
    assert_eq!(second.generated, 0);
    assert_eq!(second.already_billed, 2);

    // Amounts unchanged by the re-run
    let billed = fx.roster.students[0].id;
    let invoice = fx
        .invoices
        .find_for_student(fx.tenant, billed, Term::First, &fx.session)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.amount, ngn(dec!(85000)));
}

#[tokio::test]
async fn class_without_schedule_is_skipped_not_zero_billed() {
    let fx = fixture();
    // Second term has no schedule entries at all
    let summary = generator(&fx)
        .generate(
            fx.tenant,
            Term::Second,
            fx.session.clone(),
            GenerationPolicy::default(),
        )
        .await
        .unwrap();

    assert_eq!(summary.generated, 0);
    assert_eq!(summary.skipped_no_schedule, 2);
    assert_eq!(summary.skipped_no_class, 1);

    let billed = fx.roster.students[0].id;
    let invoice = fx
        .invoices
        .find_for_student(fx.tenant, billed, Term::Second, &fx.session)
        .await
        .unwrap();
    assert!(invoice.is_none());
}

// ============================================================================
// Gate tests
// ============================================================================

#[tokio::test]
async fn gate_tracks_invoice_status_without_caching() {
    let fx = fixture();
    generator(&fx)
        .generate(
            fx.tenant,
            Term::First,
            fx.session.clone(),
            GenerationPolicy::default(),
        )
        .await
        .unwrap();

    let gate = ResultGate::new(fx.invoices.clone(), Currency::NGN);
    let student = fx.roster.students[0].id;

    let locked = gate
        .evaluate(fx.tenant, student, Term::First, &fx.session)
        .await
        .unwrap();
    assert!(!locked.unlocked);
    assert_eq!(locked.balance, ngn(dec!(85000)));

    // Partial payment narrows the balance but keeps the gate closed
    let invoice = fx
        .invoices
        .find_for_student(fx.tenant, student, Term::First, &fx.session)
        .await
        .unwrap()
        .unwrap();
    fx.invoices
        .apply_settled_amount(fx.tenant, invoice.id, ngn(dec!(35000)))
        .await
        .unwrap();

    let partial = gate
        .evaluate(fx.tenant, student, Term::First, &fx.session)
        .await
        .unwrap();
    assert!(!partial.unlocked);
    assert_eq!(partial.balance, ngn(dec!(50000)));

    // Settling the remainder unlocks on the very next evaluation
    fx.invoices
        .apply_settled_amount(fx.tenant, invoice.id, ngn(dec!(50000)))
        .await
        .unwrap();

    let unlocked = gate
        .evaluate(fx.tenant, student, Term::First, &fx.session)
        .await
        .unwrap();
    assert!(unlocked.unlocked);
    assert!(unlocked.balance.is_zero());
}

#[tokio::test]
async fn unbilled_student_stays_locked_with_zero_balance() {
    let fx = fixture();
    let gate = ResultGate::new(fx.invoices.clone(), Currency::NGN);

    let decision = gate
        .evaluate(fx.tenant, StudentId::new(), Term::First, &fx.session)
        .await
        .unwrap();
    assert!(!decision.unlocked);
    assert!(decision.balance.is_zero());
}
