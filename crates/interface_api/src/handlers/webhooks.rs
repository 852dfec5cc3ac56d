//! Gateway webhook handler

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::dto::GatewayWebhookEvent;
use crate::error::ApiError;
use crate::AppState;

/// Receives gateway payment notifications
///
/// The payload is only trusted for the reference; settlement re-verifies
/// status and amount with the gateway before crediting anything. Duplicate
/// deliveries settle at most once and every delivery after the first gets
/// the same 200.
pub async fn gateway_webhook(
    State(state): State<AppState>,
    Json(event): Json<GatewayWebhookEvent>,
) -> Result<StatusCode, ApiError> {
    info!(
        event = %event.event,
        reference = %event.data.reference,
        "Gateway webhook received"
    );

    // Unknown references 404 and transient gateway failures 502, so the
    // gateway retries those deliveries later.
    state.verifier.settle(&event.data.reference).await?;

    Ok(StatusCode::OK)
}
