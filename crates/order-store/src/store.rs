use async_trait::async_trait;

use crate::{Order, OrderId, OrderStatus, Result};

/// Core trait for order persistence.
///
/// Implementations are shared by every concurrent checkout, so they must be
/// thread-safe (Send + Sync). Orders are independent rows: calls for distinct
/// order identifiers never block or fail because of each other.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order.
    ///
    /// Fails with `DuplicateOrder` if an order with the same identifier
    /// already exists. Orders are never deleted.
    async fn create_order(&self, order: &Order) -> Result<()>;

    /// Moves an order to a new status.
    ///
    /// Fails with `OrderNotFound` for unknown identifiers and with
    /// `InvalidTransition` if the current status may not move to `status`.
    async fn update_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<()>;

    /// Retrieves a single order.
    ///
    /// Returns None if the order doesn't exist.
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// Lists all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;
}
