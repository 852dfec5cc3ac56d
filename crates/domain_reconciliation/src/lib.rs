//! Reconciliation domain
//!
//! End-of-day bookkeeping for the bursar: one session per school per
//! calendar day, holding the physical cash count and imported bank
//! statement lines. Statement lines are auto-matched against settled
//! ledger entries, and closing the day freezes the session and sends a
//! summary report. A closed session can never be reopened or edited.

pub mod cash_count;
pub mod error;
pub mod matching;
pub mod ports;
pub mod service;
pub mod session;

pub use cash_count::{sheet_total, CashCount, NOTES_PER_BUNDLE};
pub use error::ReconciliationError;
pub use matching::{
    auto_match, BankStatementLine, MatchReport, SettledPayment, MATCH_WINDOW_DAYS,
};
pub use ports::{
    CashCountStore, MethodTotal, ReportChannel, SessionInsertOutcome, SessionStore, SettledLedger,
    StatementStore,
};
pub use service::{
    CashCountEntry, CashCountSummary, DayCloseReport, ReconciliationService, StatementLineInput,
};
pub use session::{ReconciliationSession, SessionStatus};
