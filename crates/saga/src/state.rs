//! Saga state machine.

use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::error::SagaError;

/// The stage of a checkout saga instance.
///
/// State transitions:
/// ```text
/// Started ──┬──► OrderPersisted ──► PaymentPending ──┬──► PaymentOk ──┬──► Notified ─────┬──► Done
///           │                           ▲             │               └──► NotifySkipped ─┤
///           │                           │             └──► PaymentFailed ─────────────────┘
///           ├───────────────────────────┘ (order persistence skipped)
///           └──► InternalError
/// ```
///
/// The machine is single-pass: no stage is entered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SagaStage {
    #[default]
    Started,
    OrderPersisted,
    PaymentPending,
    PaymentOk,
    PaymentFailed,
    Notified,
    NotifySkipped,
    /// Terminal: reached after success or payment failure.
    Done,
    /// Terminal: the order could not be persisted.
    InternalError,
}

impl SagaStage {
    /// Returns true if the machine may move from `self` to `next`.
    pub fn can_transition_to(&self, next: SagaStage) -> bool {
        use SagaStage::*;
        matches!(
            (self, next),
            (Started, OrderPersisted)
                | (Started, PaymentPending)
                | (Started, InternalError)
                | (OrderPersisted, PaymentPending)
                | (PaymentPending, PaymentOk)
                | (PaymentPending, PaymentFailed)
                | (PaymentOk, Notified)
                | (PaymentOk, NotifySkipped)
                | (PaymentFailed, Done)
                | (Notified, Done)
                | (NotifySkipped, Done)
        )
    }

    /// Returns true if this is a terminal stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaStage::Done | SagaStage::InternalError)
    }

    /// Returns the stage name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStage::Started => "started",
            SagaStage::OrderPersisted => "order_persisted",
            SagaStage::PaymentPending => "payment_pending",
            SagaStage::PaymentOk => "payment_ok",
            SagaStage::PaymentFailed => "payment_failed",
            SagaStage::Notified => "notified",
            SagaStage::NotifySkipped => "notify_skipped",
            SagaStage::Done => "done",
            SagaStage::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for SagaStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress of one checkout saga.
///
/// Lives only for the duration of a single checkout call and is owned by
/// the invocation that created it. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaState {
    order_id: OrderId,
    stage: SagaStage,
    payment_completed: bool,
    notification_sent: bool,
    history: Vec<SagaStage>,
}

impl SagaState {
    /// Creates the state for a saga that just started.
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            stage: SagaStage::Started,
            payment_completed: false,
            notification_sent: false,
            history: vec![SagaStage::Started],
        }
    }

    /// Moves the saga to `next`, rejecting transitions the machine forbids.
    pub fn advance(&mut self, next: SagaStage) -> Result<(), SagaError> {
        if !self.stage.can_transition_to(next) {
            return Err(SagaError::InvalidTransition {
                from: self.stage,
                to: next,
            });
        }
        match next {
            SagaStage::PaymentOk => self.payment_completed = true,
            SagaStage::Notified => self.notification_sent = true,
            _ => {}
        }
        tracing::debug!(order_id = %self.order_id, from = %self.stage, to = %next, "saga transition");
        self.stage = next;
        self.history.push(next);
        Ok(())
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn stage(&self) -> SagaStage {
        self.stage
    }

    pub fn payment_completed(&self) -> bool {
        self.payment_completed
    }

    pub fn notification_sent(&self) -> bool {
        self.notification_sent
    }

    /// Every stage visited, in order.
    pub fn history(&self) -> &[SagaStage] {
        &self.history
    }
}
