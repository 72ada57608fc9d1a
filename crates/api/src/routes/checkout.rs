//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use order_store::{OrderStore, SagaLog};
use saga::{CheckoutOutcome, CheckoutRequest, NotificationService, PaymentGateway};
use serde::Serialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub status: &'static str,
}

/// POST /cart/checkout — run one checkout saga.
///
/// 200 on success, 402 when the payment did not complete, 500 when the
/// order could not be persisted, 400 for a malformed request.
#[tracing::instrument(skip(state, payload))]
pub async fn checkout<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError>
where
    S: OrderStore + SagaLog + Clone + 'static,
    P: PaymentGateway + 'static,
    N: NotificationService + 'static,
{
    let Json(request) = payload.map_err(|e| {
        metrics::counter!("cart_saga_total", "status" => "error").increment(1);
        tracing::warn!(error = %e, "invalid checkout body");
        ApiError::BadRequest("Invalid request".to_string())
    })?;

    let result = state.orchestrator.checkout(&request).await?;

    match result.outcome {
        CheckoutOutcome::Success => Ok(Json(CheckoutResponse {
            order_id: result.order_id.into_inner(),
            status: CheckoutOutcome::Success.as_str(),
        })),
        CheckoutOutcome::PaymentFailed => Err(ApiError::PaymentFailed(result.order_id)),
        CheckoutOutcome::InternalError => Err(ApiError::Internal(format!(
            "failed to create order {}",
            result.order_id
        ))),
    }
}
