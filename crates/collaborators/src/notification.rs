//! Demo notification service: logs the message and acknowledges it.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

/// Service name reported on `/health`.
pub const SERVICE_NAME: &str = "notification";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8083;

/// Simulated delivery time.
pub const DEFAULT_DELIVERY_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    pub order_id: String,
    pub user_id: String,
    pub message: String,
}

/// Builds the notification router: `POST /notify`.
pub fn router(delivery_delay: Duration) -> Router {
    Router::new()
        .route("/notify", post(notify))
        .with_state(Arc::new(delivery_delay))
}

#[tracing::instrument(skip(delay, payload))]
async fn notify(
    State(delay): State<Arc<Duration>>,
    payload: Result<Json<NotificationRequest>, JsonRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(e) => {
            metrics::counter!("notifications_sent_total", "status" => "error").increment(1);
            tracing::warn!(error = %e, "invalid notification request");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "Invalid request" })),
            );
        }
    };

    tokio::time::sleep(*delay).await;

    tracing::info!(
        order_id = %request.order_id,
        user_id = %request.user_id,
        message = %request.message,
        "notification sent"
    );
    metrics::counter!("notifications_sent_total", "status" => "success").increment(1);

    (StatusCode::OK, Json(serde_json::json!({ "status": "sent" })))
}
