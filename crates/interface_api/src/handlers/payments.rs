//! Payment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use core_kernel::{InvoiceId, Money};
use domain_payments::SettlementOutcome;

use crate::auth::{roles, Claims};
use crate::dto::{
    CheckoutRequest, CheckoutResponse, PaymentRecordedResponse, RecordPaymentRequest,
    TransactionResponse,
};
use crate::error::ApiError;
use crate::handlers::{parse_id, require_role};
use crate::AppState;

/// Records a manual payment against an invoice
pub async fn record_manual(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentRecordedResponse>), ApiError> {
    require_role(&claims, roles::BURSAR)?;

    let amount = Money::new(request.amount, state.currency());
    let receipt = state
        .ledger
        .record_manual(
            claims.tenant(),
            InvoiceId::from_uuid(request.invoice_id),
            amount,
            request.method,
            Some(claims.sub.clone()),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentRecordedResponse {
            transaction: receipt.transaction.into(),
            invoice: receipt.invoice.into(),
        }),
    ))
}

/// Opens a gateway checkout session for an invoice
pub async fn initiate_checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let amount = request.amount.map(|a| Money::new(a, state.currency()));
    let receipt = state
        .ledger
        .initiate_checkout(
            claims.tenant(),
            InvoiceId::from_uuid(request.invoice_id),
            request.email,
            amount,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// Re-verifies a gateway transaction and settles it if confirmed
///
/// The fallback path for webhooks that never arrived; idempotent per
/// reference.
pub async fn verify(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(reference): Path<String>,
) -> Result<Json<SettlementOutcome>, ApiError> {
    // References are globally unique; scope the lookup to the caller's
    // tenant before touching the gateway.
    let transaction = state
        .transactions
        .find_by_reference(&reference)
        .await?
        .filter(|t| t.tenant_id == claims.tenant())
        .ok_or_else(|| ApiError::NotFound(format!("Transaction {reference}")))?;

    let outcome = state.verifier.settle(&transaction.reference).await?;
    Ok(Json(outcome))
}

/// Lists an invoice's transactions, newest first
pub async fn list_for_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let invoice: InvoiceId = parse_id(&id)?;
    let transactions = state
        .transactions
        .list_for_invoice(claims.tenant(), invoice)
        .await?;

    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}
