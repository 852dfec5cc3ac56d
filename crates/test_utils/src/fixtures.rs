//! Pre-built test fixtures
//!
//! Ready-to-use test data for the fee ledger. Everything bills in NGN,
//! mirroring the default deployment currency.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{AcademicSession, Currency, Money, StudentId, TenantId, Term};
use domain_fees::Invoice;

/// Creates an NGN amount
pub fn ngn(value: Decimal) -> Money {
    Money::new(value, Currency::NGN)
}

/// The standard term fee used across fixtures
pub fn term_fee() -> Money {
    ngn(dec!(85000))
}

/// The academic session fixtures bill against
pub fn session() -> AcademicSession {
    AcademicSession::starting(2025)
}

/// A date inside the fixtures' session
pub fn school_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

/// An unpaid first-term invoice for the given student
pub fn owing_invoice(tenant: TenantId, student: StudentId) -> Invoice {
    Invoice::new(tenant, student, Term::First, session(), term_fee())
}
