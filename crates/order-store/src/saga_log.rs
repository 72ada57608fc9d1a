//! Per-order record of the last completed checkout step.
//!
//! The checkout saga itself keeps no durable state. The saga log is the
//! minimal trail needed to find orders stranded in `pending` after a crash
//! or a failed compensation, so a recovery scan can settle them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrderId, Result};

/// The last step a checkout saga reached for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStep {
    /// The order row was written as `pending`.
    OrderPersisted,
    /// The charge request was sent; its outcome is not yet known.
    PaymentDispatched,
    /// The payment gateway confirmed the charge.
    PaymentConfirmed,
    /// The order was marked `failed` after a payment failure.
    Compensated,
    /// Compensation was attempted and gave up; needs reconciliation.
    CompensationPending,
    /// The saga finished successfully.
    Completed,
}

impl SagaStep {
    /// Returns true if an order whose log stops at this step still needs
    /// compensating when found by a recovery scan.
    pub fn needs_recovery(&self) -> bool {
        matches!(
            self,
            SagaStep::OrderPersisted | SagaStep::PaymentDispatched | SagaStep::CompensationPending
        )
    }

    /// Returns the step name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStep::OrderPersisted => "order_persisted",
            SagaStep::PaymentDispatched => "payment_dispatched",
            SagaStep::PaymentConfirmed => "payment_confirmed",
            SagaStep::Compensated => "compensated",
            SagaStep::CompensationPending => "compensation_pending",
            SagaStep::Completed => "completed",
        }
    }
}

impl std::fmt::Display for SagaStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SagaStep {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "order_persisted" => Ok(SagaStep::OrderPersisted),
            "payment_dispatched" => Ok(SagaStep::PaymentDispatched),
            "payment_confirmed" => Ok(SagaStep::PaymentConfirmed),
            "compensated" => Ok(SagaStep::Compensated),
            "compensation_pending" => Ok(SagaStep::CompensationPending),
            "completed" => Ok(SagaStep::Completed),
            other => Err(format!("unknown saga step '{other}'")),
        }
    }
}

/// One row of the saga log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SagaLogEntry {
    pub order_id: OrderId,
    pub last_step: SagaStep,
    pub updated_at: DateTime<Utc>,
}

/// Storage for the saga log.
#[async_trait]
pub trait SagaLog: Send + Sync {
    /// Records `step` as the latest step for the order, replacing any earlier one.
    async fn record(&self, order_id: &OrderId, step: SagaStep) -> Result<()>;

    /// Returns the latest recorded step for the order.
    async fn last_step(&self, order_id: &OrderId) -> Result<Option<SagaStep>>;

    /// Returns entries that need recovery and were last updated before `older_than`.
    async fn stranded(&self, older_than: DateTime<Utc>) -> Result<Vec<SagaLogEntry>>;
}
