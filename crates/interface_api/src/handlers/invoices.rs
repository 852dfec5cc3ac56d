//! Invoice handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use core_kernel::{AcademicSession, InvoiceId, StudentId};
use domain_fees::{GenerationPolicy, GenerationSummary};

use crate::auth::{roles, Claims};
use crate::dto::{GenerateInvoicesRequest, InvoiceResponse};
use crate::error::ApiError;
use crate::handlers::{parse_id, require_role};
use crate::AppState;

/// Runs batch invoice generation for a term
///
/// Idempotent: re-posting the same term/session reports the prior
/// invoices as `already_billed` instead of duplicating them.
pub async fn generate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<GenerateInvoicesRequest>,
) -> Result<(StatusCode, Json<GenerationSummary>), ApiError> {
    require_role(&claims, roles::BURSAR)?;

    let session: AcademicSession = request
        .session
        .parse()
        .map_err(|e: core_kernel::SessionParseError| ApiError::Validation(e.to_string()))?;
    let policy = GenerationPolicy {
        include_optional: request.include_optional,
    };

    let summary = state
        .generator
        .generate(claims.tenant(), request.term, session, policy)
        .await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

/// Gets an invoice by ID
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let id: InvoiceId = parse_id(&id)?;
    let invoice = state.invoices.get(claims.tenant(), id).await?;

    Ok(Json(invoice.into()))
}

/// Lists a student's invoices, newest first
pub async fn list_for_student(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Vec<InvoiceResponse>>, ApiError> {
    let student: StudentId = parse_id(&id)?;
    let invoices = state
        .invoices
        .list_for_student(claims.tenant(), student)
        .await?;

    Ok(Json(invoices.into_iter().map(Into::into).collect()))
}
