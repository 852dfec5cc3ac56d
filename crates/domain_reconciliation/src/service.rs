//! Reconciliation workflow
//!
//! Orchestrates the day: open (or resume) the session, take the cash
//! count, import and match the bank statement, close and report.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use core_kernel::{Currency, Money, PortError, ReconciliationSessionId, TenantId};
use domain_payments::PaymentMethod;

use crate::cash_count::{sheet_total, CashCount};
use crate::error::ReconciliationError;
use crate::matching::{auto_match, BankStatementLine, MatchReport, MATCH_WINDOW_DAYS};
use crate::ports::{
    CashCountStore, MethodTotal, ReportChannel, SessionInsertOutcome, SessionStore, SettledLedger,
    StatementStore,
};
use crate::session::ReconciliationSession;

/// One denomination row as submitted by the bursar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashCountEntry {
    pub denomination: u32,
    pub bundle_count: u32,
    pub loose_count: u32,
}

/// What a cash count submission added up to
#[derive(Debug, Clone, Serialize)]
pub struct CashCountSummary {
    pub entries: usize,
    pub total: Money,
    /// System cash minus the counted total, signed
    pub variance: Money,
}

/// One statement row as imported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementLineInput {
    pub date: NaiveDate,
    pub amount: Money,
    pub description: String,
}

/// The frozen summary produced by closing a day
#[derive(Debug, Clone, Serialize)]
pub struct DayCloseReport {
    pub tenant_id: TenantId,
    pub session_id: ReconciliationSessionId,
    pub date: NaiveDate,
    /// Settled cash takings per the ledger
    pub system_cash_total: Money,
    /// Settled bank-side takings per the ledger
    pub system_bank_total: Money,
    /// Physical cash counted, from the final count sheet
    pub physical_cash_total: Money,
    /// system_cash_total - physical_cash_total, signed
    pub variance: Money,
    /// Settled ledger totals for the day, per payment method
    pub method_totals: Vec<MethodTotal>,
    pub matched_lines: usize,
    pub unmatched_lines: usize,
    /// Variance justification supplied at close, if any
    pub note: Option<String>,
    pub closed_at: DateTime<Utc>,
}

/// Drives reconciliation sessions end to end
pub struct ReconciliationService {
    sessions: Arc<dyn SessionStore>,
    counts: Arc<dyn CashCountStore>,
    statements: Arc<dyn StatementStore>,
    ledger: Arc<dyn SettledLedger>,
    reports: Arc<dyn ReportChannel>,
    currency: Currency,
}

impl ReconciliationService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        counts: Arc<dyn CashCountStore>,
        statements: Arc<dyn StatementStore>,
        ledger: Arc<dyn SettledLedger>,
        reports: Arc<dyn ReportChannel>,
        currency: Currency,
    ) -> Self {
        Self {
            sessions,
            counts,
            statements,
            ledger,
            reports,
            currency,
        }
    }

    /// Returns the session for the day, opening one if none exists
    ///
    /// Concurrent callers for the same day all end up with the same
    /// session: the (tenant, date) unique key absorbs the duplicate
    /// insert and the loser re-fetches.
    pub async fn open_or_resume(
        &self,
        tenant: TenantId,
        date: NaiveDate,
    ) -> Result<ReconciliationSession, ReconciliationError> {
        if let Some(existing) = self.sessions.find_by_date(tenant, date).await? {
            return Ok(existing);
        }

        // Freeze the day's ledger totals into the new session row
        let payments = self.ledger.settled_between(tenant, date, date).await?;
        let (system_cash, system_bank) = split_by_side(&payments, self.currency);

        let session = ReconciliationSession::open(tenant, date, system_cash, system_bank);
        match self.sessions.insert_if_absent(session.clone()).await? {
            SessionInsertOutcome::Inserted => {
                info!(tenant = %tenant, date = %date, session = %session.id, "Reconciliation session opened");
                Ok(session)
            }
            SessionInsertOutcome::AlreadyExists => self
                .sessions
                .find_by_date(tenant, date)
                .await?
                .ok_or_else(|| {
                    PortError::internal("Session vanished between insert and fetch").into()
                }),
        }
    }

    /// Replaces the session's cash count sheet
    pub async fn submit_cash_count(
        &self,
        tenant: TenantId,
        session_id: ReconciliationSessionId,
        entries: Vec<CashCountEntry>,
    ) -> Result<CashCountSummary, ReconciliationError> {
        let session = self.sessions.get(tenant, session_id).await?;
        session.ensure_open()?;

        let mut seen = HashMap::new();
        let mut counts = Vec::with_capacity(entries.len());
        for entry in entries {
            if seen.insert(entry.denomination, ()).is_some() {
                return Err(ReconciliationError::Validation(format!(
                    "Duplicate denomination {} in count sheet",
                    entry.denomination
                )));
            }
            counts.push(CashCount::new(
                tenant,
                session_id,
                entry.denomination,
                entry.bundle_count,
                entry.loose_count,
            )?);
        }

        let total = sheet_total(&counts, self.currency);
        let variance = session.system_cash_total - total;
        let summary = CashCountSummary {
            entries: counts.len(),
            total,
            variance,
        };

        self.counts
            .replace_for_session(tenant, session_id, counts)
            .await?;
        self.sessions
            .record_cash_totals(tenant, session_id, total, variance)
            .await?;

        info!(
            tenant = %tenant,
            session = %session_id,
            entries = summary.entries,
            total = %summary.total,
            variance = %summary.variance,
            "Cash count recorded"
        );

        Ok(summary)
    }

    /// Appends imported bank statement lines to the session
    pub async fn import_statement(
        &self,
        tenant: TenantId,
        session_id: ReconciliationSessionId,
        rows: Vec<StatementLineInput>,
    ) -> Result<usize, ReconciliationError> {
        let session = self.sessions.get(tenant, session_id).await?;
        session.ensure_open()?;

        let lines: Vec<BankStatementLine> = rows
            .into_iter()
            .map(|row| {
                BankStatementLine::new(tenant, session_id, row.date, row.amount, row.description)
            })
            .collect();
        let imported = lines.len();

        self.statements.insert_lines(lines).await?;
        info!(tenant = %tenant, session = %session_id, imported, "Statement lines imported");

        Ok(imported)
    }

    /// Auto-matches the session's statement lines against settled payments
    pub async fn run_auto_match(
        &self,
        tenant: TenantId,
        session_id: ReconciliationSessionId,
    ) -> Result<MatchReport, ReconciliationError> {
        let session = self.sessions.get(tenant, session_id).await?;
        session.ensure_open()?;

        let lines = self.statements.list_for_session(tenant, session_id).await?;
        let window = Duration::days(MATCH_WINDOW_DAYS);
        let payments = self
            .ledger
            .settled_between(tenant, session.date - window, session.date + window)
            .await?;

        let report = auto_match(&lines, &payments);
        if !report.matched.is_empty() {
            self.statements
                .record_matches(tenant, &report.matched)
                .await?;
        }

        info!(
            tenant = %tenant,
            session = %session_id,
            matched = report.matched.len(),
            unmatched_lines = report.unmatched_lines.len(),
            unmatched_payments = report.unmatched_payments.len(),
            "Auto-match complete"
        );

        Ok(report)
    }

    /// Closes the day and sends the summary report
    ///
    /// Closing is irreversible. The report is assembled before the close
    /// is committed; a failure to deliver it is logged and swallowed, the
    /// close stands either way.
    pub async fn close_day(
        &self,
        tenant: TenantId,
        session_id: ReconciliationSessionId,
        note: Option<String>,
    ) -> Result<DayCloseReport, ReconciliationError> {
        let session = self.sessions.get(tenant, session_id).await?;
        session.ensure_open()?;

        let counts = self.counts.list_for_session(tenant, session_id).await?;
        let lines = self.statements.list_for_session(tenant, session_id).await?;
        let payments = self
            .ledger
            .settled_between(tenant, session.date, session.date)
            .await?;

        let closed = self
            .sessions
            .close_if_open(tenant, session_id, note.as_deref())
            .await?;
        if !closed {
            // A concurrent close won
            return Err(ReconciliationError::SessionClosed { date: session.date });
        }

        let physical = sheet_total(&counts, self.currency);
        let matched_lines = lines.iter().filter(|l| l.is_matched()).count();
        let report = DayCloseReport {
            tenant_id: tenant,
            session_id,
            date: session.date,
            system_cash_total: session.system_cash_total,
            system_bank_total: session.system_bank_total,
            variance: session.system_cash_total - physical,
            physical_cash_total: physical,
            method_totals: method_totals(&payments, self.currency),
            matched_lines,
            unmatched_lines: lines.len() - matched_lines,
            note,
            closed_at: Utc::now(),
        };

        info!(
            tenant = %tenant,
            session = %session_id,
            date = %report.date,
            cash = %report.physical_cash_total,
            variance = %report.variance,
            "Reconciliation session closed"
        );

        if let Err(err) = self.reports.send_day_close_report(&report).await {
            warn!(
                tenant = %tenant,
                session = %session_id,
                error = %err,
                "Day-close report delivery failed; session remains closed"
            );
        }

        Ok(report)
    }
}

/// Splits a day's settled payments into cash and bank-side totals
fn split_by_side(
    payments: &[crate::matching::SettledPayment],
    currency: Currency,
) -> (Money, Money) {
    let mut cash = Money::zero(currency);
    let mut bank = Money::zero(currency);
    for payment in payments {
        match payment.method {
            PaymentMethod::Cash => cash = cash + payment.amount,
            _ => bank = bank + payment.amount,
        }
    }
    (cash, bank)
}

fn method_totals(
    payments: &[crate::matching::SettledPayment],
    currency: Currency,
) -> Vec<MethodTotal> {
    let mut by_method: HashMap<PaymentMethod, (u32, Money)> = HashMap::new();
    for payment in payments {
        let entry = by_method
            .entry(payment.method)
            .or_insert((0, Money::zero(currency)));
        entry.0 += 1;
        entry.1 = entry.1 + payment.amount;
    }

    let mut totals: Vec<MethodTotal> = by_method
        .into_iter()
        .map(|(method, (count, total))| MethodTotal {
            method,
            count,
            total,
        })
        .collect();
    totals.sort_by_key(|t| t.method.as_str());
    totals
}
