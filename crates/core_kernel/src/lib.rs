//! Core Kernel - Foundational types for the school fee ledger
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Academic calendar types (terms and sessions)
//! - Strongly-typed identifiers and port infrastructure

pub mod academic;
pub mod identifiers;
pub mod money;
pub mod ports;

pub use academic::{AcademicSession, SessionParseError, Term, TermParseError};
pub use identifiers::{
    CashCountId, ClassroomId, FeeCategoryId, FeeScheduleId, InvoiceId,
    ReconciliationSessionId, StatementLineId, StudentId, TenantId, TransactionId,
};
pub use money::{Currency, Money, MoneyError};
pub use ports::{DomainPort, HealthCheckResult, HealthCheckable, HealthStatus, PortError};
