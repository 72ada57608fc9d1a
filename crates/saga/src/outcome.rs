//! Caller-visible result of a checkout.

use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::state::SagaState;

/// The three outcomes a checkout can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Order persisted and payment confirmed.
    Success,
    /// Payment not completed; the order was compensated.
    PaymentFailed,
    /// The order could not be persisted; nothing else ran.
    InternalError,
}

impl CheckoutOutcome {
    /// Returns the outcome name used in responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutOutcome::Success => "success",
            CheckoutOutcome::PaymentFailed => "payment_failed",
            CheckoutOutcome::InternalError => "internal_error",
        }
    }

    /// Returns the `status` label recorded on `cart_saga_total`.
    pub fn metric_label(&self) -> &'static str {
        match self {
            CheckoutOutcome::Success => "success",
            CheckoutOutcome::PaymentFailed => "compensated",
            CheckoutOutcome::InternalError => "failed",
        }
    }
}

impl std::fmt::Display for CheckoutOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a finished checkout saga hands back to the entry point.
#[derive(Debug, Clone)]
pub struct CheckoutResult {
    pub order_id: OrderId,
    pub outcome: CheckoutOutcome,
    /// Final progress of the saga instance.
    pub state: SagaState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(CheckoutOutcome::Success.to_string(), "success");
        assert_eq!(CheckoutOutcome::PaymentFailed.to_string(), "payment_failed");
        assert_eq!(CheckoutOutcome::InternalError.to_string(), "internal_error");
    }

    #[test]
    fn test_metric_labels() {
        assert_eq!(CheckoutOutcome::Success.metric_label(), "success");
        assert_eq!(CheckoutOutcome::PaymentFailed.metric_label(), "compensated");
        assert_eq!(CheckoutOutcome::InternalError.metric_label(), "failed");
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&CheckoutOutcome::PaymentFailed).unwrap();
        assert_eq!(json, "\"payment_failed\"");
    }
}
