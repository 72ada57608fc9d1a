use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    Order, OrderId, OrderStatus, OrderStoreError, Result,
    saga_log::{SagaLog, SagaLogEntry, SagaStep},
    store::OrderStore,
};

#[derive(Debug, Default)]
struct InMemoryState {
    orders: HashMap<OrderId, Order>,
    saga_log: HashMap<OrderId, SagaLogEntry>,
    unavailable: bool,
    failing_updates: u32,
    create_calls: usize,
    status_updates: usize,
}

/// In-memory order store for testing and local runs.
///
/// Provides the same interface as the PostgreSQL implementation, plus
/// switches to simulate an unreachable store or failing status updates.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `Unavailable` until reset.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Makes the next `count` status updates fail with `Unavailable`.
    pub async fn fail_next_updates(&self, count: u32) {
        self.state.write().await.failing_updates = count;
    }

    /// Makes all status updates fail (or succeed again when `false`).
    pub async fn set_fail_on_update(&self, fail: bool) {
        self.state.write().await.failing_updates = if fail { u32::MAX } else { 0 };
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns how many times `create_order` was called, successful or not.
    pub async fn create_calls(&self) -> usize {
        self.state.read().await.create_calls
    }

    /// Returns how many status updates were applied.
    pub async fn status_updates(&self) -> usize {
        self.state.read().await.status_updates
    }

    fn check_available(state: &InMemoryState) -> Result<()> {
        if state.unavailable {
            return Err(OrderStoreError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        state.create_calls += 1;
        Self::check_available(&state)?;

        if state.orders.contains_key(&order.order_id) {
            return Err(OrderStoreError::DuplicateOrder(order.order_id.clone()));
        }
        state.orders.insert(order.order_id.clone(), order.clone());
        Ok(())
    }

    async fn update_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<()> {
        let mut state = self.state.write().await;
        Self::check_available(&state)?;

        if state.failing_updates > 0 {
            if state.failing_updates != u32::MAX {
                state.failing_updates -= 1;
            }
            return Err(OrderStoreError::Unavailable(
                "simulated status update failure".to_string(),
            ));
        }

        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))?;

        if !order.status.can_transition_to(status) {
            return Err(OrderStoreError::InvalidTransition {
                order_id: order_id.clone(),
                from: order.status,
                to: status,
            });
        }
        order.status = status;
        state.status_updates += 1;
        Ok(())
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Self::check_available(&state)?;
        Ok(state.orders.get(order_id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Self::check_available(&state)?;
        let mut orders: Vec<_> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_id.cmp(&a.order_id))
        });
        Ok(orders)
    }
}

#[async_trait]
impl SagaLog for InMemoryOrderStore {
    async fn record(&self, order_id: &OrderId, step: SagaStep) -> Result<()> {
        let mut state = self.state.write().await;
        Self::check_available(&state)?;
        state.saga_log.insert(
            order_id.clone(),
            SagaLogEntry {
                order_id: order_id.clone(),
                last_step: step,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn last_step(&self, order_id: &OrderId) -> Result<Option<SagaStep>> {
        let state = self.state.read().await;
        Self::check_available(&state)?;
        Ok(state.saga_log.get(order_id).map(|e| e.last_step))
    }

    async fn stranded(&self, older_than: DateTime<Utc>) -> Result<Vec<SagaLogEntry>> {
        let state = self.state.read().await;
        Self::check_available(&state)?;
        let mut entries: Vec<_> = state
            .saga_log
            .values()
            .filter(|e| e.last_step.needs_recovery() && e.updated_at < older_than)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.updated_at);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::Money;

    fn order(id: &str) -> Order {
        Order::pending(OrderId::new(id), "u1", Money::from_cents(10_000))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryOrderStore::new();
        store.create_order(&order("ORD-1")).await.unwrap();

        let loaded = store.get_order(&OrderId::new("ORD-1")).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert_eq!(loaded.amount.cents(), 10_000);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = InMemoryOrderStore::new();
        store.create_order(&order("ORD-1")).await.unwrap();

        let result = store.create_order(&order("ORD-1")).await;
        assert!(matches!(result, Err(OrderStoreError::DuplicateOrder(_))));
        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.create_calls().await, 2);
    }

    #[tokio::test]
    async fn test_update_status_and_terminal_guard() {
        let store = InMemoryOrderStore::new();
        let id = OrderId::new("ORD-1");
        store.create_order(&order("ORD-1")).await.unwrap();

        store.update_status(&id, OrderStatus::Failed).await.unwrap();
        let result = store.update_status(&id, OrderStatus::Pending).await;
        assert!(matches!(
            result,
            Err(OrderStoreError::InvalidTransition {
                from: OrderStatus::Failed,
                to: OrderStatus::Pending,
                ..
            })
        ));
        assert_eq!(store.status_updates().await, 1);
    }

    #[tokio::test]
    async fn test_update_unknown_order() {
        let store = InMemoryOrderStore::new();
        let result = store
            .update_status(&OrderId::new("missing"), OrderStatus::Failed)
            .await;
        assert!(matches!(result, Err(OrderStoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_unavailable_switch() {
        let store = InMemoryOrderStore::new();
        store.set_unavailable(true).await;
        assert!(matches!(
            store.create_order(&order("ORD-1")).await,
            Err(OrderStoreError::Unavailable(_))
        ));

        store.set_unavailable(false).await;
        store.create_order(&order("ORD-1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_fail_next_updates_counts_down() {
        let store = InMemoryOrderStore::new();
        let id = OrderId::new("ORD-1");
        store.create_order(&order("ORD-1")).await.unwrap();
        store.fail_next_updates(2).await;

        assert!(store.update_status(&id, OrderStatus::Failed).await.is_err());
        assert!(store.update_status(&id, OrderStatus::Failed).await.is_err());
        store.update_status(&id, OrderStatus::Failed).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let store = InMemoryOrderStore::new();
        let mut older = order("ORD-1");
        older.created_at -= Duration::seconds(10);
        store.create_order(&older).await.unwrap();
        store.create_order(&order("ORD-2")).await.unwrap();

        let orders = store.list_orders().await.unwrap();
        assert_eq!(orders[0].order_id.as_str(), "ORD-2");
        assert_eq!(orders[1].order_id.as_str(), "ORD-1");
    }

    #[tokio::test]
    async fn test_saga_log_keeps_latest_step() {
        let store = InMemoryOrderStore::new();
        let id = OrderId::new("ORD-1");

        store.record(&id, SagaStep::OrderPersisted).await.unwrap();
        store.record(&id, SagaStep::PaymentDispatched).await.unwrap();
        assert_eq!(
            store.last_step(&id).await.unwrap(),
            Some(SagaStep::PaymentDispatched)
        );
        assert_eq!(store.last_step(&OrderId::new("other")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stranded_filters_by_step_and_age() {
        let store = InMemoryOrderStore::new();
        store
            .record(&OrderId::new("ORD-1"), SagaStep::PaymentDispatched)
            .await
            .unwrap();
        store
            .record(&OrderId::new("ORD-2"), SagaStep::Completed)
            .await
            .unwrap();

        let later = Utc::now() + Duration::seconds(1);
        let stranded = store.stranded(later).await.unwrap();
        assert_eq!(stranded.len(), 1);
        assert_eq!(stranded[0].order_id.as_str(), "ORD-1");

        let earlier = Utc::now() - Duration::seconds(60);
        assert!(store.stranded(earlier).await.unwrap().is_empty());
    }
}
