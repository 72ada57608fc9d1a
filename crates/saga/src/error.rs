//! Saga error types.

use common::OrderId;
use order_store::OrderStoreError;
use thiserror::Error;

use crate::state::SagaStage;

/// Errors that can occur during checkout saga operations.
///
/// Only validation, store, and payment failures shape what the caller sees.
/// Compensation and notification failures are logged and absorbed by the
/// orchestrator.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The checkout request is malformed; rejected before the saga starts.
    #[error("Invalid checkout request: {0}")]
    Validation(String),

    /// The order could not be persisted at saga start.
    #[error("Order store unavailable: {0}")]
    StoreUnavailable(#[source] OrderStoreError),

    /// The payment gateway answered and refused the charge.
    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    /// The payment gateway could not be reached, failed, or timed out.
    #[error("Payment gateway unreachable: {0}")]
    PaymentUnreachable(String),

    /// Marking the order `failed` after a payment failure did not succeed.
    #[error("Compensation for order {order_id} failed: {reason}")]
    CompensationFailed { order_id: OrderId, reason: String },

    /// The notification could not be delivered.
    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    /// The saga attempted a transition its state machine does not allow.
    #[error("Invalid saga transition: {from} -> {to}")]
    InvalidTransition { from: SagaStage, to: SagaStage },

    /// A collaborator client could not be constructed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Order store error outside the checkout path (e.g. recovery).
    #[error("Order store error: {0}")]
    Store(#[from] OrderStoreError),
}

impl SagaError {
    /// Returns true for errors that mean "payment not completed".
    pub fn is_payment_failure(&self) -> bool {
        matches!(
            self,
            SagaError::PaymentDeclined(_) | SagaError::PaymentUnreachable(_)
        )
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
