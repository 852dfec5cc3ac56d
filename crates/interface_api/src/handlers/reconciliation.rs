//! Reconciliation handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use core_kernel::{Money, ReconciliationSessionId};
use domain_reconciliation::{CashCountSummary, DayCloseReport, MatchReport, StatementLineInput};

use crate::auth::{roles, Claims};
use crate::dto::{
    CashCountRequest, CloseDayRequest, OpenSessionRequest, SessionResponse,
    StatementImportRequest, StatementImportResponse,
};
use crate::error::ApiError;
use crate::handlers::{parse_id, require_role};
use crate::AppState;

/// Opens the reconciliation session for a day, or resumes the existing one
pub async fn open_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    require_role(&claims, roles::BURSAR)?;

    let session = state
        .reconciliation
        .open_or_resume(claims.tenant(), request.date)
        .await?;

    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Gets a reconciliation session by ID
pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session: ReconciliationSessionId = parse_id(&id)?;
    let session = state
        .sessions
        .get(claims.tenant(), session)
        .await?;

    Ok(Json(session.into()))
}

/// Replaces the session's cash count sheet
pub async fn submit_cash_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(request): Json<CashCountRequest>,
) -> Result<Json<CashCountSummary>, ApiError> {
    require_role(&claims, roles::BURSAR)?;

    let session: ReconciliationSessionId = parse_id(&id)?;
    let summary = state
        .reconciliation
        .submit_cash_count(
            claims.tenant(),
            session,
            request.entries,
        )
        .await?;

    Ok(Json(summary))
}

/// Imports bank statement lines into the session
pub async fn import_statement(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(request): Json<StatementImportRequest>,
) -> Result<Json<StatementImportResponse>, ApiError> {
    require_role(&claims, roles::BURSAR)?;

    let session: ReconciliationSessionId = parse_id(&id)?;
    let currency = state.currency();
    let rows: Vec<StatementLineInput> = request
        .lines
        .into_iter()
        .map(|line| StatementLineInput {
            date: line.date,
            amount: Money::new(line.amount, currency),
            description: line.description,
        })
        .collect();

    let imported = state
        .reconciliation
        .import_statement(claims.tenant(), session, rows)
        .await?;

    Ok(Json(StatementImportResponse { imported }))
}

/// Auto-matches statement lines against settled payments
pub async fn auto_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<MatchReport>, ApiError> {
    require_role(&claims, roles::BURSAR)?;

    let session: ReconciliationSessionId = parse_id(&id)?;
    let report = state
        .reconciliation
        .run_auto_match(claims.tenant(), session)
        .await?;

    Ok(Json(report))
}

/// Closes the day and returns the frozen summary report
///
/// The body is optional; when present it may carry a variance note.
pub async fn close_day(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    body: Option<Json<CloseDayRequest>>,
) -> Result<Json<DayCloseReport>, ApiError> {
    require_role(&claims, roles::BURSAR)?;

    let session: ReconciliationSessionId = parse_id(&id)?;
    let note = body.and_then(|Json(request)| request.note);
    let report = state
        .reconciliation
        .close_day(claims.tenant(), session, note)
        .await?;

    Ok(Json(report))
}
