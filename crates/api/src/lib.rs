//! Cart service: the HTTP entry point of the checkout saga.
//!
//! Provides the checkout endpoint and read-only order inspection, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{OrderStore, SagaLog};
use saga::{
    CheckoutOrchestrator, HttpNotificationService, HttpPaymentGateway, NotificationService,
    OrchestratorConfig, PaymentGateway, SagaError,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "cart";

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, P, N>(state: Arc<AppState<S, P, N>>, metrics_handle: PrometheusHandle) -> Router
where
    S: OrderStore + SagaLog + Clone + 'static,
    P: PaymentGateway + 'static,
    N: NotificationService + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart/checkout", post(routes::checkout::checkout::<S, P, N>))
        .route("/orders", get(routes::orders::list::<S, P, N>))
        .route("/orders/{id}", get(routes::orders::get::<S, P, N>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state around an orchestrator.
pub fn create_state<S, P, N>(
    store: S,
    payment: P,
    notification: N,
    config: OrchestratorConfig,
) -> Arc<AppState<S, P, N>>
where
    S: OrderStore + SagaLog + Clone + 'static,
    P: PaymentGateway,
    N: NotificationService,
{
    Arc::new(AppState {
        orchestrator: CheckoutOrchestrator::with_config(store, payment, notification, config),
    })
}

/// Creates the production state: HTTP collaborators configured from `config`.
pub fn create_http_state<S>(
    store: S,
    config: &Config,
) -> Result<Arc<AppState<S, HttpPaymentGateway, HttpNotificationService>>, SagaError>
where
    S: OrderStore + SagaLog + Clone + 'static,
{
    let payment = HttpPaymentGateway::new(&config.payment_service_url, config.payment_timeout)?;
    let notification = HttpNotificationService::new(
        &config.notification_service_url,
        config.notification_timeout,
    )?;
    tracing::info!(
        payment = payment.base_url(),
        notification = notification.base_url(),
        persistence = %config.order_persistence,
        "collaborators configured"
    );
    Ok(create_state(
        store,
        payment,
        notification,
        config.orchestrator_config(),
    ))
}
