//! Integration tests for the demo services, alone and wired around the cart.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use collaborators::{CartClient, PaymentConfig, frontend, notification, payment, telemetry};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use order_store::{InMemoryOrderStore, OrderStatus, OrderStore};
use tower::ServiceExt;

fn metrics_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// A cart stand-in that always answers with `status` and `body`.
fn canned_cart(status: StatusCode, body: serde_json::Value) -> Router {
    Router::new().route(
        "/cart/checkout",
        post(move || {
            let body = body.clone();
            async move { (status, Json(body)) }
        }),
    )
}

const CHECKOUT_BODY: &str = r#"{"user_id":"u1","amount":100,"items":[{"product_id":"p1","quantity":2,"price":50}]}"#;

#[tokio::test]
async fn test_payment_approves_when_failure_rate_zero() {
    let app = payment::router(PaymentConfig::immediate(0.0));

    let response = app
        .oneshot(post_json("/payment/process", r#"{"order_id":"ORD-1","amount":100.0}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert!(json["transaction_id"].as_str().unwrap().starts_with("TXN-"));
}

#[tokio::test]
async fn test_payment_declines_when_failure_rate_one() {
    let app = payment::router(PaymentConfig::immediate(1.0));

    let response = app
        .oneshot(post_json("/payment/process", r#"{"order_id":"ORD-1","amount":100.0}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "failed");
    assert_eq!(json["message"], "Payment processing failed");
    assert!(json.get("transaction_id").is_none());
}

#[tokio::test]
async fn test_payment_rejects_malformed_body() {
    let app = payment::router(PaymentConfig::immediate(0.0));

    let response = app
        .oneshot(post_json("/payment/process", "{nope"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_notification_acknowledges() {
    let app = notification::router(Duration::ZERO);

    let response = app
        .oneshot(post_json(
            "/notify",
            r#"{"order_id":"ORD-1","user_id":"u1","message":"Your order has been confirmed"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "sent");
}

#[tokio::test]
async fn test_notification_rejects_missing_fields() {
    let app = notification::router(Duration::ZERO);

    let response = app
        .oneshot(post_json("/notify", r#"{"order_id":"ORD-1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_service_name() {
    let app = telemetry::with_observability(
        notification::router(Duration::ZERO),
        notification::SERVICE_NAME,
        metrics_handle(),
    );

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "notification");
}

#[tokio::test]
async fn test_frontend_index_page() {
    let cart = CartClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
    let app = frontend::router(cart);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("POST /checkout"));
}

#[tokio::test]
async fn test_frontend_forwards_success() {
    let cart_url = spawn(canned_cart(
        StatusCode::OK,
        serde_json::json!({"order_id": "ORD-42", "status": "success"}),
    ))
    .await;
    let app = frontend::router(CartClient::new(cart_url, Duration::from_secs(2)).unwrap());

    let response = app.oneshot(post_json("/checkout", CHECKOUT_BODY)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["order_id"], "ORD-42");
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Order processed successfully");
}

#[tokio::test]
async fn test_frontend_maps_cart_decline_to_failure() {
    let cart_url = spawn(canned_cart(
        StatusCode::PAYMENT_REQUIRED,
        serde_json::json!({"error": "Payment failed", "status": "payment_failed"}),
    ))
    .await;
    let app = frontend::router(CartClient::new(cart_url, Duration::from_secs(2)).unwrap());

    let response = app.oneshot(post_json("/checkout", CHECKOUT_BODY)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["status"], "failed");
    assert_eq!(json["message"], "Checkout failed");
    assert!(json.get("order_id").is_none());
}

#[tokio::test]
async fn test_frontend_cart_unreachable() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let cart = CartClient::new(format!("http://{addr}"), Duration::from_secs(1)).unwrap();
    let app = frontend::router(cart);

    let response = app.oneshot(post_json("/checkout", CHECKOUT_BODY)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["status"], "failed");
}

#[tokio::test]
async fn test_frontend_rejects_malformed_body() {
    let cart = CartClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
    let app = frontend::router(cart);

    let response = app.oneshot(post_json("/checkout", "[]")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

struct Stack {
    frontend_url: String,
    store: InMemoryOrderStore,
    client: reqwest::Client,
}

/// Runs payment, notification, cart and frontend on loopback ports.
async fn spawn_stack(failure_rate: f64) -> Stack {
    let payment_url = spawn(payment::router(PaymentConfig::immediate(failure_rate))).await;
    let notification_url = spawn(notification::router(Duration::ZERO)).await;

    let store = InMemoryOrderStore::new();
    let config = api::config::Config {
        payment_service_url: payment_url,
        notification_service_url: notification_url,
        payment_timeout: Duration::from_secs(2),
        notification_timeout: Duration::from_secs(2),
        ..api::config::Config::default()
    };
    let state = api::create_http_state(store.clone(), &config).unwrap();
    let cart_url = spawn(api::create_app(state, metrics_handle())).await;

    let cart = CartClient::new(cart_url, Duration::from_secs(5)).unwrap();
    let frontend_url = spawn(frontend::router(cart)).await;

    Stack {
        frontend_url,
        store,
        client: reqwest::Client::new(),
    }
}

impl Stack {
    async fn checkout(&self) -> (u16, serde_json::Value) {
        let response = self
            .client
            .post(format!("{}/checkout", self.frontend_url))
            .header("content-type", "application/json")
            .body(CHECKOUT_BODY)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_end_to_end_success() {
    let stack = spawn_stack(0.0).await;

    let (status, json) = stack.checkout().await;

    assert_eq!(status, 200);
    assert_eq!(json["status"], "success");
    let order_id = json["order_id"].as_str().unwrap();
    assert!(order_id.starts_with("ORD-"));

    let orders = stack.store.list_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_id.as_str(), order_id);
    assert_eq!(orders[0].status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_end_to_end_declined_payment_compensates() {
    let stack = spawn_stack(1.0).await;

    let (status, json) = stack.checkout().await;

    assert_eq!(status, 500);
    assert_eq!(json["status"], "failed");

    let orders = stack.store.list_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Failed);
}
