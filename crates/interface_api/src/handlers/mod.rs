//! HTTP request handlers

pub mod access;
pub mod health;
pub mod invoices;
pub mod payments;
pub mod reconciliation;
pub mod webhooks;

use std::str::FromStr;

use crate::auth::{has_role, Claims};
use crate::error::ApiError;

/// Rejects the request unless the caller holds the role (or admin)
fn require_role(claims: &Claims, role: &str) -> Result<(), ApiError> {
    if has_role(claims, role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("Requires {role} role")))
    }
}

/// Parses a typed identifier from a path segment
///
/// Accepts both the prefixed display form ("INV-...") and a bare UUID.
fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid identifier '{raw}'")))
}
