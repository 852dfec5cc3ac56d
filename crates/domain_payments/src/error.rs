//! Payments domain errors

use thiserror::Error;

use core_kernel::{Money, MoneyError, PortError};

use crate::gateway::GatewayError;

/// Errors that can occur in the payments domain
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The request was malformed (non-positive amount, wrong method)
    #[error("Invalid payment: {0}")]
    Validation(String),

    /// A manual payment may not exceed the invoice's outstanding balance
    #[error("Payment exceeds outstanding balance of {outstanding}")]
    ExceedsBalance { outstanding: Money },

    /// No transaction with the given reference
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// The gateway's verified amount disagrees with the recorded
    /// transaction; settlement refuses to guess which is right
    #[error("Gateway amount {gateway_minor} does not match recorded amount {recorded_minor} for {reference}")]
    AmountMismatch {
        reference: String,
        recorded_minor: i64,
        gateway_minor: i64,
    },

    /// The gateway call failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Money arithmetic failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// A port operation failed
    #[error(transparent)]
    Port(#[from] PortError),
}
