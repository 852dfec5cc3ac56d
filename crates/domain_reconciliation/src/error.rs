//! Reconciliation domain errors

use chrono::NaiveDate;
use thiserror::Error;

use core_kernel::{MoneyError, PortError};

/// Errors that can occur in the reconciliation domain
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// The session for this day has been closed; nothing may change
    #[error("Reconciliation session for {date} is closed")]
    SessionClosed { date: NaiveDate },

    /// The request was malformed
    #[error("Invalid reconciliation input: {0}")]
    Validation(String),

    /// Money arithmetic failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// A port operation failed
    #[error(transparent)]
    Port(#[from] PortError),
}
