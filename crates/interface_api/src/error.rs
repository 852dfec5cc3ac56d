//! API error handling
//!
//! Domain errors cross into HTTP here. Each variant is one taxonomy
//! class with a stable machine-readable `error` string; gateway
//! failures become 502 so callers can distinguish "our fault" from
//! "the card processor's fault".

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use core_kernel::PortError;
use domain_fees::FeesError;
use domain_payments::{GatewayError, PaymentError};
use domain_reconciliation::ReconciliationError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            ApiError::Gateway(msg) => (StatusCode::BAD_GATEWAY, "gateway_error", msg.clone()),
            ApiError::Consistency(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "consistency_error",
                msg.clone(),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{entity_type} {id}"))
            }
            PortError::Validation { message } => ApiError::Validation(message),
            PortError::Conflict { message } => ApiError::Conflict(message),
            PortError::Unauthorized { message } => ApiError::Forbidden(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<FeesError> for ApiError {
    fn from(err: FeesError) -> Self {
        match err {
            FeesError::InvoiceNotFound(id) => ApiError::NotFound(format!("Invoice {id}")),
            FeesError::Money(e) => ApiError::Validation(e.to_string()),
            FeesError::Port(e) => e.into(),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Gateway(err.to_string())
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation(msg) => ApiError::Validation(msg),
            PaymentError::ExceedsBalance { outstanding } => ApiError::Validation(format!(
                "Payment exceeds outstanding balance of {outstanding}"
            )),
            PaymentError::TransactionNotFound(reference) => {
                ApiError::NotFound(format!("Transaction {reference}"))
            }
            PaymentError::AmountMismatch { .. } => ApiError::Consistency(err.to_string()),
            PaymentError::Gateway(e) => e.into(),
            PaymentError::Money(e) => ApiError::Validation(e.to_string()),
            PaymentError::Port(e) => e.into(),
        }
    }
}

impl From<ReconciliationError> for ApiError {
    fn from(err: ReconciliationError) -> Self {
        match err {
            ReconciliationError::SessionClosed { date } => {
                ApiError::Conflict(format!("Reconciliation session for {date} is closed"))
            }
            ReconciliationError::Validation(msg) => ApiError::Validation(msg),
            ReconciliationError::Money(e) => ApiError::Validation(e.to_string()),
            ReconciliationError::Port(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_session_maps_to_conflict() {
        let err: ApiError = ReconciliationError::SessionClosed {
            date: chrono::NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        }
        .into();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn gateway_timeout_maps_to_bad_gateway() {
        let err: ApiError = PaymentError::Gateway(GatewayError::Timeout { seconds: 10 }).into();
        assert!(matches!(err, ApiError::Gateway(_)));
    }
}
