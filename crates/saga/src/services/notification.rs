//! Notification service trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;

use crate::error::SagaError;

/// Trait for sending order notifications. Delivery is best-effort.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Sends `message` to the user about an order.
    async fn notify(&self, order_id: &OrderId, user_id: &str, message: &str)
    -> Result<(), SagaError>;
}

/// A notification recorded by [`InMemoryNotificationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub order_id: OrderId,
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<SentNotification>,
    attempts: usize,
    fail_on_notify: bool,
    hang: bool,
}

/// In-memory notification service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    /// Creates a new in-memory notification service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail every notify call.
    pub fn set_fail_on_notify(&self, fail: bool) {
        self.state.write().unwrap().fail_on_notify = fail;
    }

    /// Configures the service to never answer.
    pub fn set_hang(&self, hang: bool) {
        self.state.write().unwrap().hang = hang;
    }

    /// Returns the number of notify calls received, delivered or not.
    pub fn attempt_count(&self) -> usize {
        self.state.read().unwrap().attempts
    }

    /// Returns the notifications delivered so far.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.state.read().unwrap().sent.clone()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn notify(
        &self,
        order_id: &OrderId,
        user_id: &str,
        message: &str,
    ) -> Result<(), SagaError> {
        let hang = {
            let mut state = self.state.write().unwrap();
            state.attempts += 1;
            if state.fail_on_notify {
                return Err(SagaError::NotificationFailed(
                    "mailer unavailable".to_string(),
                ));
            }
            if !state.hang {
                state.sent.push(SentNotification {
                    order_id: order_id.clone(),
                    user_id: user_id.to_string(),
                    message: message.to_string(),
                });
            }
            state.hang
        };

        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}
