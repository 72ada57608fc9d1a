//! Demo frontend gateway: forwards checkouts to the cart service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Client;
use saga::CheckoutRequest;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{CollaboratorError, Result};

/// Service name reported on `/health`.
pub const SERVICE_NAME: &str = "frontend";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default cart service base URL.
pub const DEFAULT_CART_URL: &str = "http://cart:8081";

/// Bound on the forwarded checkout call.
pub const CART_TIMEOUT: Duration = Duration::from_secs(10);

const INDEX_HTML: &str = r#"<html>
<body>
    <h1>E-Commerce Demo</h1>
    <p>Endpoints:</p>
    <ul>
        <li>POST /checkout - Process checkout</li>
        <li>GET /health - Health check</li>
        <li>GET /metrics - Prometheus metrics</li>
    </ul>
</body>
</html>
"#;

/// Client for the cart service's checkout endpoint.
#[derive(Debug, Clone)]
pub struct CartClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CartResponse {
    order_id: String,
}

impl CartClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Reads `CART_SERVICE_URL` (default `http://cart:8081`).
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("CART_SERVICE_URL").unwrap_or_else(|_| DEFAULT_CART_URL.to_string());
        Self::new(base_url, CART_TIMEOUT)
    }

    /// Forwards the checkout and returns the order identifier on success.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/cart/checkout", self.base_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::CartRejected(status.as_u16()));
        }
        let body: CartResponse = response.json().await?;
        Ok(body.order_id)
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub order_id: String,
    pub status: &'static str,
    pub message: &'static str,
}

/// Builds the frontend router: `GET /` and `POST /checkout`.
pub fn router(cart: CartClient) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/checkout", post(checkout))
        .with_state(Arc::new(cart))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[tracing::instrument(skip(cart, payload))]
async fn checkout(
    State(cart): State<Arc<CartClient>>,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();

    let response = match payload {
        Err(e) => {
            tracing::warn!(error = %e, "invalid checkout request");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "Invalid request" })),
            )
                .into_response()
        }
        Ok(Json(request)) => match cart.checkout(&request).await {
            Ok(order_id) => Json(CheckoutResponse {
                order_id,
                status: "success",
                message: "Order processed successfully",
            })
            .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "cart service error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(CheckoutResponse {
                        order_id: String::new(),
                        status: "failed",
                        message: "Checkout failed",
                    }),
                )
                    .into_response()
            }
        },
    };
    let status = response.status();

    metrics::counter!(
        "frontend_http_requests_total",
        "method" => "POST",
        "endpoint" => "/checkout",
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(
        "frontend_http_duration_seconds",
        "method" => "POST",
        "endpoint" => "/checkout"
    )
    .record(start.elapsed().as_secs_f64());

    response
}
