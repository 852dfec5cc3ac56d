//! Bank statement auto-matching
//!
//! Pairs imported statement lines with settled ledger entries by exact
//! amount, tolerating a one-day skew in either direction because banks
//! post transfers on the next business day. Matching is greedy in
//! statement order; each ledger entry is consumed at most once. Anything
//! left over is surfaced for the bursar to resolve by hand.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{Money, ReconciliationSessionId, StatementLineId, TenantId, TransactionId};
use domain_payments::PaymentMethod;

/// Maximum date skew, in days, between a statement line and a payment
pub const MATCH_WINDOW_DAYS: i64 = 1;

/// One row imported from the school's bank statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankStatementLine {
    pub id: StatementLineId,
    pub tenant_id: TenantId,
    pub session_id: ReconciliationSessionId,
    /// Value date as printed on the statement
    pub date: NaiveDate,
    pub amount: Money,
    /// Narration as printed, kept verbatim for the bursar
    pub description: String,
    /// Set once the line has been matched to a ledger entry
    pub matched_transaction_id: Option<TransactionId>,
}

impl BankStatementLine {
    pub fn new(
        tenant_id: TenantId,
        session_id: ReconciliationSessionId,
        date: NaiveDate,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: StatementLineId::new_v7(),
            tenant_id,
            session_id,
            date,
            amount,
            description: description.into(),
            matched_transaction_id: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched_transaction_id.is_some()
    }
}

/// A settled ledger entry as the matcher sees it
#[derive(Debug, Clone)]
pub struct SettledPayment {
    pub transaction_id: TransactionId,
    pub amount: Money,
    /// Calendar day the payment settled
    pub date: NaiveDate,
    pub method: PaymentMethod,
}

/// What auto-matching concluded
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchReport {
    /// (statement line, ledger entry) pairs established by this run
    pub matched: Vec<(StatementLineId, TransactionId)>,
    /// Statement lines nothing in the ledger accounts for
    pub unmatched_lines: Vec<StatementLineId>,
    /// Settled payments absent from the statement
    pub unmatched_payments: Vec<TransactionId>,
    /// Fraction of statement lines accounted for, counting earlier runs;
    /// 1.0 for an empty statement
    pub confidence: f64,
}

impl MatchReport {
    pub fn is_fully_reconciled(&self) -> bool {
        self.unmatched_lines.is_empty() && self.unmatched_payments.is_empty()
    }
}

fn within_window(a: NaiveDate, b: NaiveDate) -> bool {
    (a - b).num_days().abs() <= MATCH_WINDOW_DAYS
}

/// Greedily pairs unmatched statement lines with settled payments
///
/// Lines already matched by a previous run keep their pairing and do not
/// participate again.
pub fn auto_match(lines: &[BankStatementLine], payments: &[SettledPayment]) -> MatchReport {
    let mut report = MatchReport::default();
    let mut consumed = vec![false; payments.len()];

    // Payments already referenced by previously matched lines are off the
    // table before this run starts.
    for line in lines.iter().filter(|l| l.is_matched()) {
        if let Some(idx) = payments
            .iter()
            .position(|p| Some(p.transaction_id) == line.matched_transaction_id)
        {
            consumed[idx] = true;
        }
    }

    for line in lines.iter().filter(|l| !l.is_matched()) {
        let candidate = payments.iter().enumerate().find(|(idx, p)| {
            !consumed[*idx] && p.amount == line.amount && within_window(line.date, p.date)
        });

        match candidate {
            Some((idx, payment)) => {
                consumed[idx] = true;
                report.matched.push((line.id, payment.transaction_id));
            }
            None => report.unmatched_lines.push(line.id),
        }
    }

    for (idx, payment) in payments.iter().enumerate() {
        if !consumed[idx] {
            report.unmatched_payments.push(payment.transaction_id);
        }
    }

    report.confidence = if lines.is_empty() {
        1.0
    } else {
        let accounted = lines.len() - report.unmatched_lines.len();
        accounted as f64 / lines.len() as f64
    };

    report
}
