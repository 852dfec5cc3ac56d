//! Result access handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use core_kernel::{AcademicSession, StudentId};
use domain_fees::AccessDecision;

use crate::auth::Claims;
use crate::dto::AccessQuery;
use crate::handlers::parse_id;
use crate::error::ApiError;
use crate::AppState;

/// Evaluates whether a student's results are unlocked for a term
///
/// Re-evaluated on every call; a settlement that just landed unlocks
/// immediately.
pub async fn check_access(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessDecision>, ApiError> {
    let student: StudentId = parse_id(&id)?;
    let session: AcademicSession = query
        .session
        .parse()
        .map_err(|e: core_kernel::SessionParseError| ApiError::Validation(e.to_string()))?;

    let decision = state
        .gate
        .evaluate(claims.tenant(), student, query.term, &session)
        .await?;

    Ok(Json(decision))
}
