//! Reconciliation session lifecycle

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{Money, ReconciliationSessionId, TenantId};

use crate::error::ReconciliationError;

/// Whether the day is still being worked on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(SessionStatus::Open),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(format!("Unknown session status: {other}")),
        }
    }
}

/// One bursar working day for one school
///
/// Unique per (tenant, date). All cash counts and statement lines hang
/// off a session; once closed it is immutable forever. The system totals
/// are frozen at open time from the day's settled ledger; the physical
/// total and variance follow the latest submitted count sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationSession {
    pub id: ReconciliationSessionId,
    pub tenant_id: TenantId,
    /// The calendar day being reconciled
    pub date: NaiveDate,
    /// Settled cash takings for the day, per the ledger
    pub system_cash_total: Money,
    /// Settled bank-side takings (transfer, POS, gateway) for the day
    pub system_bank_total: Money,
    /// What the bursar physically counted; zero until a sheet is in
    pub physical_cash_total: Money,
    /// system_cash_total - physical_cash_total, signed
    pub variance: Money,
    pub status: SessionStatus,
    /// Optional variance justification recorded at close
    pub close_note: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ReconciliationSession {
    /// Opens a new session for a day with the ledger totals already summed
    pub fn open(
        tenant_id: TenantId,
        date: NaiveDate,
        system_cash_total: Money,
        system_bank_total: Money,
    ) -> Self {
        let physical = Money::zero(system_cash_total.currency());
        Self {
            id: ReconciliationSessionId::new_v7(),
            tenant_id,
            date,
            variance: system_cash_total - physical,
            system_cash_total,
            system_bank_total,
            physical_cash_total: physical,
            status: SessionStatus::Open,
            close_note: None,
            closed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Records the counted total and re-derives the variance
    pub fn record_physical_total(&mut self, counted: Money) {
        self.physical_cash_total = counted;
        self.variance = self.system_cash_total - counted;
    }

    /// Fails with `SessionClosed` unless the session is still open
    pub fn ensure_open(&self) -> Result<(), ReconciliationError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ReconciliationError::SessionClosed { date: self.date })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn ngn(v: rust_decimal::Decimal) -> Money {
        Money::new(v, Currency::NGN)
    }

    fn open_session(cash: Money) -> ReconciliationSession {
        ReconciliationSession::open(
            TenantId::new(),
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            cash,
            ngn(dec!(0)),
        )
    }

    #[test]
    fn new_session_is_open() {
        let session = open_session(ngn(dec!(50000)));
        assert!(session.is_open());
        assert!(session.ensure_open().is_ok());
        assert!(session.closed_at.is_none());
        assert!(session.close_note.is_none());
        // Nothing counted yet: the whole system total is unaccounted for
        assert_eq!(session.physical_cash_total, ngn(dec!(0)));
        assert_eq!(session.variance, ngn(dec!(50000)));
    }

    #[test]
    fn counting_re_derives_the_variance() {
        let mut session = open_session(ngn(dec!(50000)));

        session.record_physical_total(ngn(dec!(48000)));
        assert_eq!(session.variance, ngn(dec!(2000)));

        // Counting more than the system recorded gives a signed variance
        session.record_physical_total(ngn(dec!(51000)));
        assert_eq!(session.variance, ngn(dec!(-1000)));
    }

    #[test]
    fn closed_session_rejects_mutation() {
        let mut session = open_session(ngn(dec!(0)));
        session.status = SessionStatus::Closed;
        session.closed_at = Some(Utc::now());

        let err = session.ensure_open().unwrap_err();
        assert!(matches!(err, ReconciliationError::SessionClosed { .. }));
    }
}
