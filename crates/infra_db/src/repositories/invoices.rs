//! Invoice repository
//!
//! The two concurrency-sensitive operations live here. Generation relies
//! on `ON CONFLICT DO NOTHING` against the (tenant, student, term,
//! session) unique key, and applying a payment is a single UPDATE that
//! increments `amount_paid` and recomputes `status` in the same
//! statement, mirroring `InvoiceStatus::derive`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{
    AcademicSession, DomainPort, InvoiceId, Money, PortError, StudentId, TenantId, Term,
};
use domain_fees::{InsertOutcome, Invoice, InvoiceStore};

use crate::error::DatabaseError;

use super::{money_from_row, parse_column};

/// Invoice persistence on PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresInvoiceStore {
    pool: PgPool,
}

impl PostgresInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    tenant_id: Uuid,
    student_id: Uuid,
    term: String,
    session: String,
    amount: Decimal,
    amount_paid: Decimal,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self) -> Result<Invoice, PortError> {
        Ok(Invoice {
            id: InvoiceId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            student_id: StudentId::from_uuid(self.student_id),
            term: parse_column("term", &self.term)?,
            session: parse_column("session", &self.session)?,
            amount: money_from_row(self.amount, &self.currency)?,
            amount_paid: money_from_row(self.amount_paid, &self.currency)?,
            status: parse_column("status", &self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    id, tenant_id, student_id, term, session,
    amount, amount_paid, currency, status, created_at, updated_at
"#;

/// Applies a settled amount to an invoice on the given executor
///
/// Increment and status recomputation in one statement; concurrent
/// payments serialize on the row lock and each sees the other's
/// increment. Shared with the transaction repository so payment posting
/// can run it inside the same database transaction as the ledger write.
pub(crate) async fn credit_invoice<'e, E>(
    executor: E,
    tenant: TenantId,
    id: InvoiceId,
    amount: Money,
) -> Result<Invoice, PortError>
where
    E: sqlx::PgExecutor<'e>,
{
    let row: Option<InvoiceRow> = sqlx::query_as(&format!(
        r#"
        UPDATE invoices
        SET amount_paid = amount_paid + $3,
            status = CASE
                WHEN amount_paid + $3 >= amount THEN 'paid'
                WHEN amount_paid + $3 > 0 THEN 'partial'
                ELSE 'owing'
            END,
            updated_at = NOW()
        WHERE tenant_id = $1 AND id = $2
        RETURNING {SELECT_COLUMNS}
        "#
    ))
    .bind(tenant.as_uuid())
    .bind(id.as_uuid())
    .bind(amount.amount())
    .fetch_optional(executor)
    .await
    .map_err(DatabaseError::from)?;

    row.ok_or_else(|| PortError::not_found("Invoice", id))?
        .into_invoice()
}

impl DomainPort for PostgresInvoiceStore {}

#[async_trait]
impl InvoiceStore for PostgresInvoiceStore {
    async fn insert_if_absent(&self, invoice: Invoice) -> Result<InsertOutcome, PortError> {
        let result = sqlx::query(
            r#"
            INSERT INTO invoices (
                id, tenant_id, student_id, term, session,
                amount, amount_paid, currency, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (tenant_id, student_id, term, session) DO NOTHING
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.tenant_id.as_uuid())
        .bind(invoice.student_id.as_uuid())
        .bind(invoice.term.as_str())
        .bind(invoice.session.to_string())
        .bind(invoice.amount.amount())
        .bind(invoice.amount_paid.amount())
        .bind(invoice.amount.currency().code())
        .bind(invoice.status.as_str())
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 1 {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    async fn get(&self, tenant: TenantId, id: InvoiceId) -> Result<Invoice, PortError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM invoices WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        row.ok_or_else(|| PortError::not_found("Invoice", id))?
            .into_invoice()
    }

    async fn find_for_student(
        &self,
        tenant: TenantId,
        student: StudentId,
        term: Term,
        session: &AcademicSession,
    ) -> Result<Option<Invoice>, PortError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM invoices
            WHERE tenant_id = $1 AND student_id = $2 AND term = $3 AND session = $4
            "#
        ))
        .bind(tenant.as_uuid())
        .bind(student.as_uuid())
        .bind(term.as_str())
        .bind(session.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        row.map(InvoiceRow::into_invoice).transpose()
    }

    async fn list_for_student(
        &self,
        tenant: TenantId,
        student: StudentId,
    ) -> Result<Vec<Invoice>, PortError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM invoices
            WHERE tenant_id = $1 AND student_id = $2
            ORDER BY created_at DESC
            "#
        ))
        .bind(tenant.as_uuid())
        .bind(student.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter().map(InvoiceRow::into_invoice).collect()
    }

    async fn apply_settled_amount(
        &self,
        tenant: TenantId,
        id: InvoiceId,
        amount: Money,
    ) -> Result<Invoice, PortError> {
        credit_invoice(&self.pool, tenant, id, amount).await
    }
}
