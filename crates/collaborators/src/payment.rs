//! Demo payment service: approves or declines charges at random.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CollaboratorError, Result};

/// Service name reported on `/health`.
pub const SERVICE_NAME: &str = "payment";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8082;

/// Payment service settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfig {
    /// Probability in `[0, 1]` that a charge is declined.
    pub failure_rate: f64,
    /// Simulated processing time is drawn from `min_delay..=max_delay`.
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.2,
            min_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
        }
    }
}

impl PaymentConfig {
    /// Reads `FAILURE_RATE` (default 0.2).
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = std::env::var("FAILURE_RATE") {
            config.failure_rate = parse_failure_rate(&value)?;
        }
        Ok(config)
    }

    /// Instant, deterministic settings for tests.
    pub fn immediate(failure_rate: f64) -> Self {
        Self {
            failure_rate,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

fn parse_failure_rate(value: &str) -> Result<f64> {
    let invalid = |reason: &str| CollaboratorError::InvalidConfig {
        var: "FAILURE_RATE",
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let rate: f64 = value.trim().parse().map_err(|_| invalid("not a number"))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(invalid("must be between 0 and 1"));
    }
    Ok(rate)
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub order_id: String,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Builds the payment router: `POST /payment/process`.
pub fn router(config: PaymentConfig) -> Router {
    Router::new()
        .route("/payment/process", post(process))
        .with_state(Arc::new(config))
}

#[tracing::instrument(skip(config, payload))]
async fn process(
    State(config): State<Arc<PaymentConfig>>,
    payload: std::result::Result<Json<PaymentRequest>, JsonRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    let start = Instant::now();
    let response = match payload {
        Ok(Json(request)) => charge(&config, request).await,
        Err(e) => {
            metrics::counter!("payment_requests_total", "status" => "error").increment(1);
            tracing::warn!(error = %e, "invalid payment request");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "Invalid request" })),
            )
        }
    };
    metrics::histogram!("payment_duration_seconds").record(start.elapsed().as_secs_f64());
    response
}

async fn charge(config: &PaymentConfig, request: PaymentRequest) -> (StatusCode, Json<serde_json::Value>) {
    let (delay, declined) = {
        let mut rng = rand::thread_rng();
        let delay = if config.max_delay > config.min_delay {
            rng.gen_range(config.min_delay..=config.max_delay)
        } else {
            config.min_delay
        };
        (delay, rng.r#gen::<f64>() < config.failure_rate)
    };
    tokio::time::sleep(delay).await;

    let (status, body) = if declined {
        metrics::counter!("payment_requests_total", "status" => "failed").increment(1);
        tracing::warn!(order_id = %request.order_id, "payment declined (simulated)");
        (
            StatusCode::PAYMENT_REQUIRED,
            PaymentResponse {
                status: "failed",
                transaction_id: None,
                message: Some("Payment processing failed".to_string()),
            },
        )
    } else {
        metrics::counter!("payment_requests_total", "status" => "success").increment(1);
        tracing::info!(order_id = %request.order_id, amount = request.amount, "payment successful");
        (
            StatusCode::OK,
            PaymentResponse {
                status: "success",
                transaction_id: Some(transaction_id()),
                message: None,
            },
        )
    };

    (status, Json(serde_json::to_value(body).unwrap_or_default()))
}

/// `TXN-` followed by the current Unix time in nanoseconds, base 36.
fn transaction_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default().unsigned_abs();
    format!("TXN-{}", to_base36(nanos))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
