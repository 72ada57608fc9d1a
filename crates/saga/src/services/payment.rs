//! Payment gateway trait and in-memory implementation.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{Money, OrderId};

use crate::error::SagaError;

/// Result of a confirmed charge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Transaction ID, when the gateway returns one.
    pub transaction_id: Option<String>,
}

/// Trait for payment processing operations.
///
/// `Ok` means the charge was confirmed. Any `Err` means the payment did not
/// complete: [`SagaError::PaymentDeclined`] when the gateway refused, and
/// [`SagaError::PaymentUnreachable`] when it could not give an answer.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges `amount` for an order.
    async fn charge(&self, order_id: &OrderId, amount: Money) -> Result<PaymentReceipt, SagaError>;
}

/// How the in-memory gateway answers a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentBehavior {
    #[default]
    Approve,
    Decline,
    Unreachable,
    /// Never answers.
    Hang,
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    charges: Vec<(OrderId, Money)>,
    next_id: u32,
    behavior: PaymentBehavior,
    delay: Option<Duration>,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway that approves every charge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how subsequent charges are answered.
    pub fn set_behavior(&self, behavior: PaymentBehavior) {
        self.state.write().unwrap().behavior = behavior;
    }

    /// Configures the gateway to decline charges.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.set_behavior(if fail {
            PaymentBehavior::Decline
        } else {
            PaymentBehavior::Approve
        });
    }

    /// Delays every answer by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().unwrap().delay = delay;
    }

    /// Returns the number of charge calls received.
    pub fn charge_count(&self) -> usize {
        self.state.read().unwrap().charges.len()
    }

    /// Returns every charge call received, in order.
    pub fn charges(&self) -> Vec<(OrderId, Money)> {
        self.state.read().unwrap().charges.clone()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(&self, order_id: &OrderId, amount: Money) -> Result<PaymentReceipt, SagaError> {
        let (behavior, delay) = {
            let mut state = self.state.write().unwrap();
            state.charges.push((order_id.clone(), amount));
            (state.behavior, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match behavior {
            PaymentBehavior::Approve => {
                let mut state = self.state.write().unwrap();
                state.next_id += 1;
                Ok(PaymentReceipt {
                    transaction_id: Some(format!("TXN-{:04}", state.next_id)),
                })
            }
            PaymentBehavior::Decline => {
                Err(SagaError::PaymentDeclined("Payment declined".to_string()))
            }
            PaymentBehavior::Unreachable => Err(SagaError::PaymentUnreachable(
                "connection refused".to_string(),
            )),
            PaymentBehavior::Hang => std::future::pending().await,
        }
    }
}
