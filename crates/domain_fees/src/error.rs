//! Fees domain errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError};

/// Errors that can occur in the fees domain
#[derive(Debug, Error)]
pub enum FeesError {
    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Money arithmetic failed (mixed currencies in the schedule)
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// A port operation failed
    #[error(transparent)]
    Port(#[from] PortError),
}
