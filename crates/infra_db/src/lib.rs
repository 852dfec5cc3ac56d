//! Database infrastructure layer
//!
//! PostgreSQL implementations of the domain ports, built on SQLx. Each
//! repository owns a clone of the shared pool and maps rows to domain
//! types at the boundary; nothing above this crate sees SQL or sqlx
//! types.
//!
//! Concurrency-sensitive writes (idempotent invoice generation, the
//! settlement pending -> success flip, applying payments) are expressed
//! as single conditional statements so the database, not application
//! code, arbitrates races.

pub mod error;
pub mod pool;
pub mod repositories;

pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabaseHealth, DatabasePool};
pub use repositories::catalog::{PostgresFeeCatalog, PostgresStudentDirectory};
pub use repositories::invoices::PostgresInvoiceStore;
pub use repositories::reconciliation::{
    PostgresCashCountStore, PostgresSessionStore, PostgresStatementStore,
};
pub use repositories::transactions::PostgresTransactionStore;
