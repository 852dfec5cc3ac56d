//! Student roster and fee schedule repositories

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{
    AcademicSession, ClassroomId, DomainPort, FeeCategoryId, FeeScheduleId, PortError, StudentId,
    TenantId, Term,
};
use domain_fees::{FeeCatalog, FeeScheduleEntry, StudentDirectory, StudentRecord};

use crate::error::DatabaseError;

use super::{money_from_row, parse_column};

/// Reads the student roster from the `students` table
#[derive(Debug, Clone)]
pub struct PostgresStudentDirectory {
    pool: PgPool,
}

impl PostgresStudentDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct StudentRow {
    id: Uuid,
    classroom_id: Option<Uuid>,
}

impl DomainPort for PostgresStudentDirectory {}

#[async_trait]
impl StudentDirectory for PostgresStudentDirectory {
    async fn active_students(&self, tenant: TenantId) -> Result<Vec<StudentRecord>, PortError> {
        let rows: Vec<StudentRow> = sqlx::query_as(
            r#"
            SELECT id, classroom_id
            FROM students
            WHERE tenant_id = $1 AND active
            ORDER BY id
            "#,
        )
        .bind(tenant.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| StudentRecord {
                id: StudentId::from_uuid(row.id),
                classroom_id: row.classroom_id.map(ClassroomId::from_uuid),
            })
            .collect())
    }
}

/// Reads the fee schedule, joined with its categories
#[derive(Debug, Clone)]
pub struct PostgresFeeCatalog {
    pool: PgPool,
}

impl PostgresFeeCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    tenant_id: Uuid,
    classroom_id: Uuid,
    category_id: Uuid,
    mandatory: bool,
    term: String,
    session: String,
    amount: Decimal,
    currency: String,
}

impl ScheduleRow {
    fn into_entry(self) -> Result<FeeScheduleEntry, PortError> {
        Ok(FeeScheduleEntry {
            id: FeeScheduleId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            classroom_id: ClassroomId::from_uuid(self.classroom_id),
            category_id: FeeCategoryId::from_uuid(self.category_id),
            mandatory: self.mandatory,
            term: parse_column("term", &self.term)?,
            session: parse_column("session", &self.session)?,
            amount: money_from_row(self.amount, &self.currency)?,
        })
    }
}

impl DomainPort for PostgresFeeCatalog {}

#[async_trait]
impl FeeCatalog for PostgresFeeCatalog {
    async fn schedule_for_class(
        &self,
        tenant: TenantId,
        classroom: ClassroomId,
        term: Term,
        session: &AcademicSession,
    ) -> Result<Vec<FeeScheduleEntry>, PortError> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.tenant_id, s.classroom_id, s.category_id,
                   c.mandatory, s.term, s.session, s.amount, s.currency
            FROM fee_schedule s
            JOIN fee_categories c ON c.id = s.category_id
            WHERE s.tenant_id = $1
              AND s.classroom_id = $2
              AND s.term = $3
              AND s.session = $4
            ORDER BY s.id
            "#,
        )
        .bind(tenant.as_uuid())
        .bind(classroom.as_uuid())
        .bind(term.as_str())
        .bind(session.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter().map(ScheduleRow::into_entry).collect()
    }
}
