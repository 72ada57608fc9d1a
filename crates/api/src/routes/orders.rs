//! Read-only order inspection endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::OrderId;
use order_store::{Order, OrderStore, SagaLog};
use saga::{NotificationService, PaymentGateway};
use serde::Serialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub user_id: String,
    pub amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id.into_inner(),
            user_id: order.user_id,
            amount: order.amount.to_decimal(),
            status: order.status.to_string(),
            created_at: order.created_at,
        }
    }
}

/// GET /orders/{id} — load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: OrderStore + SagaLog + Clone + 'static,
    P: PaymentGateway + 'static,
    N: NotificationService + 'static,
{
    let order_id = OrderId::new(id);
    let order = state
        .store()
        .get_order(&order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))?;
    Ok(Json(order.into()))
}

/// GET /orders — list all orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: OrderStore + SagaLog + Clone + 'static,
    P: PaymentGateway + 'static,
    N: NotificationService + 'static,
{
    let orders = state.store().list_orders().await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}
