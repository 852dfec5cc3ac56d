//! Reconciliation repositories: sessions, cash counts, statement lines

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{
    CashCountId, DomainPort, Money, PortError, ReconciliationSessionId, StatementLineId, TenantId,
    TransactionId,
};
use domain_reconciliation::{
    BankStatementLine, CashCount, CashCountStore, ReconciliationSession, SessionInsertOutcome,
    SessionStore, StatementStore,
};

use crate::error::DatabaseError;

use super::{money_from_row, parse_column};

// ============================================================================
// Sessions
// ============================================================================

/// Session persistence on PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    tenant_id: Uuid,
    session_date: NaiveDate,
    system_cash_total: Decimal,
    system_bank_total: Decimal,
    physical_cash_total: Decimal,
    variance: Decimal,
    currency: String,
    status: String,
    close_note: Option<String>,
    closed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> Result<ReconciliationSession, PortError> {
        Ok(ReconciliationSession {
            id: ReconciliationSessionId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            date: self.session_date,
            system_cash_total: money_from_row(self.system_cash_total, &self.currency)?,
            system_bank_total: money_from_row(self.system_bank_total, &self.currency)?,
            physical_cash_total: money_from_row(self.physical_cash_total, &self.currency)?,
            variance: money_from_row(self.variance, &self.currency)?,
            status: parse_column("status", &self.status)?,
            close_note: self.close_note,
            closed_at: self.closed_at,
            created_at: self.created_at,
        })
    }
}
impl DomainPort for PostgresSessionStore {}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn insert_if_absent(
        &self,
        session: ReconciliationSession,
    ) -> Result<SessionInsertOutcome, PortError> {
        let result = sqlx::query(
            r#"
            INSERT INTO reconciliation_sessions (
                id, tenant_id, session_date, system_cash_total, system_bank_total,
                physical_cash_total, variance, currency, status, close_note,
                closed_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (tenant_id, session_date) DO NOTHING
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.tenant_id.as_uuid())
        .bind(session.date)
        .bind(session.system_cash_total.amount())
        .bind(session.system_bank_total.amount())
        .bind(session.physical_cash_total.amount())
        .bind(session.variance.amount())
        .bind(session.system_cash_total.currency().code())
        .bind(session.status.as_str())
        .bind(&session.close_note)
        .bind(session.closed_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 1 {
            Ok(SessionInsertOutcome::Inserted)
        } else {
            Ok(SessionInsertOutcome::AlreadyExists)
        }
    }

    async fn get(
        &self,
        tenant: TenantId,
        id: ReconciliationSessionId,
    ) -> Result<ReconciliationSession, PortError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, session_date, system_cash_total, system_bank_total,
                   physical_cash_total, variance, currency, status, close_note,
                   closed_at, created_at
            FROM reconciliation_sessions
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        row.ok_or_else(|| PortError::not_found("ReconciliationSession", id))?
            .into_session()
    }

    async fn find_by_date(
        &self,
        tenant: TenantId,
        date: NaiveDate,
    ) -> Result<Option<ReconciliationSession>, PortError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, session_date, system_cash_total, system_bank_total,
                   physical_cash_total, variance, currency, status, close_note,
                   closed_at, created_at
            FROM reconciliation_sessions
            WHERE tenant_id = $1 AND session_date = $2
            "#,
        )
        .bind(tenant.as_uuid())
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        row.map(SessionRow::into_session).transpose()
    }

    async fn record_cash_totals(
        &self,
        tenant: TenantId,
        id: ReconciliationSessionId,
        physical_cash_total: Money,
        variance: Money,
    ) -> Result<(), PortError> {
        sqlx::query(
            r#"
            UPDATE reconciliation_sessions
            SET physical_cash_total = $3, variance = $4
            WHERE tenant_id = $1 AND id = $2 AND status = 'open'
            "#,
        )
        .bind(tenant.as_uuid())
        .bind(id.as_uuid())
        .bind(physical_cash_total.amount())
        .bind(variance.amount())
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(())
    }

    async fn close_if_open(
        &self,
        tenant: TenantId,
        id: ReconciliationSessionId,
        note: Option<&str>,
    ) -> Result<bool, PortError> {
        let result = sqlx::query(
            r#"
            UPDATE reconciliation_sessions
            SET status = 'closed', closed_at = NOW(), close_note = $3
            WHERE tenant_id = $1 AND id = $2 AND status = 'open'
            "#,
        )
        .bind(tenant.as_uuid())
        .bind(id.as_uuid())
        .bind(note)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Cash counts
// ============================================================================

/// Cash count persistence on PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresCashCountStore {
    pool: PgPool,
}

impl PostgresCashCountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CashCountRow {
    id: Uuid,
    tenant_id: Uuid,
    session_id: Uuid,
    denomination: i32,
    bundle_count: i32,
    loose_count: i32,
}

impl DomainPort for PostgresCashCountStore {}

#[async_trait]
impl CashCountStore for PostgresCashCountStore {
    async fn replace_for_session(
        &self,
        tenant: TenantId,
        session: ReconciliationSessionId,
        counts: Vec<CashCount>,
    ) -> Result<(), PortError> {
        // Delete-then-insert under one transaction; resubmission replaces
        // the sheet wholesale.
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        sqlx::query("DELETE FROM cash_counts WHERE tenant_id = $1 AND session_id = $2")
            .bind(tenant.as_uuid())
            .bind(session.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;

        for count in &counts {
            sqlx::query(
                r#"
                INSERT INTO cash_counts (
                    id, tenant_id, session_id, denomination, bundle_count, loose_count
                ) VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(count.id.as_uuid())
            .bind(count.tenant_id.as_uuid())
            .bind(count.session_id.as_uuid())
            .bind(count.denomination as i32)
            .bind(count.bundle_count as i32)
            .bind(count.loose_count as i32)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn list_for_session(
        &self,
        tenant: TenantId,
        session: ReconciliationSessionId,
    ) -> Result<Vec<CashCount>, PortError> {
        let rows: Vec<CashCountRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, session_id, denomination, bundle_count, loose_count
            FROM cash_counts
            WHERE tenant_id = $1 AND session_id = $2
            ORDER BY denomination DESC
            "#,
        )
        .bind(tenant.as_uuid())
        .bind(session.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        // Columns carry CHECK (>= 0) constraints, so the sign casts hold
        Ok(rows
            .into_iter()
            .map(|row| CashCount {
                id: CashCountId::from_uuid(row.id),
                tenant_id: TenantId::from_uuid(row.tenant_id),
                session_id: ReconciliationSessionId::from_uuid(row.session_id),
                denomination: row.denomination as u32,
                bundle_count: row.bundle_count as u32,
                loose_count: row.loose_count as u32,
            })
            .collect())
    }
}

// ============================================================================
// Statement lines
// ============================================================================

/// Statement line persistence on PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresStatementStore {
    pool: PgPool,
}

impl PostgresStatementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct StatementRow {
    id: Uuid,
    tenant_id: Uuid,
    session_id: Uuid,
    line_date: NaiveDate,
    amount: Decimal,
    currency: String,
    description: String,
    matched_transaction_id: Option<Uuid>,
}

impl StatementRow {
    fn into_line(self) -> Result<BankStatementLine, PortError> {
        Ok(BankStatementLine {
            id: StatementLineId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            session_id: ReconciliationSessionId::from_uuid(self.session_id),
            date: self.line_date,
            amount: money_from_row(self.amount, &self.currency)?,
            description: self.description,
            matched_transaction_id: self.matched_transaction_id.map(TransactionId::from_uuid),
        })
    }
}

impl DomainPort for PostgresStatementStore {}

#[async_trait]
impl StatementStore for PostgresStatementStore {
    async fn insert_lines(&self, lines: Vec<BankStatementLine>) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO statement_lines (
                    id, tenant_id, session_id, line_date, amount, currency,
                    description, matched_transaction_id
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(line.tenant_id.as_uuid())
            .bind(line.session_id.as_uuid())
            .bind(line.date)
            .bind(line.amount.amount())
            .bind(line.amount.currency().code())
            .bind(&line.description)
            .bind(line.matched_transaction_id.map(|id| *id.as_uuid()))
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn list_for_session(
        &self,
        tenant: TenantId,
        session: ReconciliationSessionId,
    ) -> Result<Vec<BankStatementLine>, PortError> {
        let rows: Vec<StatementRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, session_id, line_date, amount, currency,
                   description, matched_transaction_id
            FROM statement_lines
            WHERE tenant_id = $1 AND session_id = $2
            ORDER BY line_date, id
            "#,
        )
        .bind(tenant.as_uuid())
        .bind(session.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter().map(StatementRow::into_line).collect()
    }

    async fn record_matches(
        &self,
        tenant: TenantId,
        matches: &[(StatementLineId, TransactionId)],
    ) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        for (line_id, transaction_id) in matches {
            sqlx::query(
                r#"
                UPDATE statement_lines
                SET matched_transaction_id = $3
                WHERE tenant_id = $1 AND id = $2 AND matched_transaction_id IS NULL
                "#,
            )
            .bind(tenant.as_uuid())
            .bind(line_id.as_uuid())
            .bind(transaction_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }
}
