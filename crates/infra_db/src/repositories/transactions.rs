//! Payment transaction repository
//!
//! Also implements the reconciliation domain's read-side `SettledLedger`,
//! since both views are over the same table.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{DomainPort, InvoiceId, PortError, StudentId, TenantId, TransactionId};
use domain_fees::Invoice;
use domain_payments::{PaymentTransaction, TransactionStore};
use domain_reconciliation::{SettledLedger, SettledPayment};

use crate::error::DatabaseError;

use super::invoices::credit_invoice;
use super::{money_from_row, parse_column};

/// Transaction persistence on PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    tenant_id: Uuid,
    invoice_id: Uuid,
    student_id: Uuid,
    amount: Decimal,
    currency: String,
    method: String,
    status: String,
    reference: String,
    recorded_by: Option<String>,
    gateway_metadata: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self) -> Result<PaymentTransaction, PortError> {
        let gateway_metadata = self
            .gateway_metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| {
                PortError::from(DatabaseError::CorruptRow(format!(
                    "gateway_metadata: {e}"
                )))
            })?;

        Ok(PaymentTransaction {
            id: TransactionId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            invoice_id: InvoiceId::from_uuid(self.invoice_id),
            student_id: StudentId::from_uuid(self.student_id),
            amount: money_from_row(self.amount, &self.currency)?,
            method: parse_column("method", &self.method)?,
            status: parse_column("status", &self.status)?,
            reference: self.reference,
            recorded_by: self.recorded_by,
            gateway_metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    id, tenant_id, invoice_id, student_id, amount, currency,
    method, status, reference, recorded_by, gateway_metadata,
    created_at, updated_at
"#;

/// Inserts a transaction row on the given executor
async fn insert_row<'e, E>(executor: E, transaction: &PaymentTransaction) -> Result<(), PortError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, tenant_id, invoice_id, student_id, amount, currency,
            method, status, reference, recorded_by, gateway_metadata,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(transaction.id.as_uuid())
    .bind(transaction.tenant_id.as_uuid())
    .bind(transaction.invoice_id.as_uuid())
    .bind(transaction.student_id.as_uuid())
    .bind(transaction.amount.amount())
    .bind(transaction.amount.currency().code())
    .bind(transaction.method.as_str())
    .bind(transaction.status.as_str())
    .bind(&transaction.reference)
    .bind(&transaction.recorded_by)
    .bind(transaction.gateway_metadata.as_ref().map(|m| m.to_string()))
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .execute(executor)
    .await
    .map_err(DatabaseError::from)?;

    Ok(())
}

/// Row returned by the settlement flip, enough to credit the invoice
#[derive(sqlx::FromRow)]
struct SettleTarget {
    tenant_id: Uuid,
    invoice_id: Uuid,
    amount: Decimal,
    currency: String,
}

impl DomainPort for PostgresTransactionStore {}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn insert(&self, transaction: PaymentTransaction) -> Result<(), PortError> {
        insert_row(&self.pool, &transaction).await
    }

    async fn post_settled(&self, transaction: PaymentTransaction) -> Result<Invoice, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        insert_row(&mut *tx, &transaction).await?;
        let invoice = credit_invoice(
            &mut *tx,
            transaction.tenant_id,
            transaction.invoice_id,
            transaction.amount,
        )
        .await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        Ok(invoice)
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentTransaction>, PortError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM transactions WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        row.map(TransactionRow::into_transaction).transpose()
    }

    async fn list_for_invoice(
        &self,
        tenant: TenantId,
        invoice: InvoiceId,
    ) -> Result<Vec<PaymentTransaction>, PortError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM transactions
            WHERE tenant_id = $1 AND invoice_id = $2
            ORDER BY created_at DESC
            "#
        ))
        .bind(tenant.as_uuid())
        .bind(invoice.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(TransactionRow::into_transaction)
            .collect()
    }

    async fn settle_and_credit(
        &self,
        reference: &str,
        gateway_metadata: Option<&serde_json::Value>,
    ) -> Result<Option<Invoice>, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        // The status predicate makes this the settlement arbiter: exactly
        // one concurrent caller gets a row back and applies the credit.
        // A failed credit rolls the flip back with it, so the transaction
        // stays pending and the settlement can be retried whole.
        let target: Option<SettleTarget> = sqlx::query_as(
            r#"
            UPDATE transactions
            SET status = 'success',
                gateway_metadata = COALESCE($2, gateway_metadata),
                updated_at = NOW()
            WHERE reference = $1 AND status = 'pending'
            RETURNING tenant_id, invoice_id, amount, currency
            "#,
        )
        .bind(reference)
        .bind(gateway_metadata.map(|m| m.to_string()))
        .fetch_optional(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;

        let Some(target) = target else {
            return Ok(None);
        };

        let amount = money_from_row(target.amount, &target.currency)?;
        let invoice = credit_invoice(
            &mut *tx,
            TenantId::from_uuid(target.tenant_id),
            InvoiceId::from_uuid(target.invoice_id),
            amount,
        )
        .await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        Ok(Some(invoice))
    }

    async fn mark_failed(&self, reference: &str) -> Result<(), PortError> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'failed', updated_at = NOW()
            WHERE reference = $1 AND status = 'pending'
            "#,
        )
        .bind(reference)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct SettledRow {
    id: Uuid,
    amount: Decimal,
    currency: String,
    method: String,
    settled_on: NaiveDate,
}

#[async_trait]
impl SettledLedger for PostgresTransactionStore {
    async fn settled_between(
        &self,
        tenant: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SettledPayment>, PortError> {
        let rows: Vec<SettledRow> = sqlx::query_as(
            r#"
            SELECT id, amount, currency, method,
                   (updated_at AT TIME ZONE 'UTC')::date AS settled_on
            FROM transactions
            WHERE tenant_id = $1
              AND status = 'success'
              AND (updated_at AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3
            ORDER BY updated_at
            "#,
        )
        .bind(tenant.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| {
                Ok(SettledPayment {
                    transaction_id: TransactionId::from_uuid(row.id),
                    amount: money_from_row(row.amount, &row.currency)?,
                    date: row.settled_on,
                    method: parse_column("method", &row.method)?,
                })
            })
            .collect()
    }
}
