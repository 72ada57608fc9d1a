//! Orchestrator settings.

use std::time::Duration;

use crate::compensation::CompensationPolicy;
use crate::order_checkout::{
    CONFIRMATION_MESSAGE, DEFAULT_NOTIFICATION_TIMEOUT, DEFAULT_PAYMENT_TIMEOUT,
};

/// Whether the saga writes the order before charging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderPersistence {
    /// Step A runs; a store failure aborts the checkout.
    #[default]
    Required,
    /// Degraded mode: no order row, no compensation, no saga log.
    Skip,
}

impl OrderPersistence {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPersistence::Required => "required",
            OrderPersistence::Skip => "skip",
        }
    }
}

impl std::fmt::Display for OrderPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderPersistence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "required" => Ok(OrderPersistence::Required),
            "skip" => Ok(OrderPersistence::Skip),
            other => Err(format!(
                "unknown order persistence mode '{other}', expected 'required' or 'skip'"
            )),
        }
    }
}

/// Settings for [`CheckoutOrchestrator`](crate::CheckoutOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub payment_timeout: Duration,
    pub notification_timeout: Duration,
    pub persistence: OrderPersistence,
    pub compensation: CompensationPolicy,
    pub notification_message: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
            notification_timeout: DEFAULT_NOTIFICATION_TIMEOUT,
            persistence: OrderPersistence::Required,
            compensation: CompensationPolicy::default(),
            notification_message: CONFIRMATION_MESSAGE.to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_payment_timeout(mut self, timeout: Duration) -> Self {
        self.payment_timeout = timeout;
        self
    }

    pub fn with_notification_timeout(mut self, timeout: Duration) -> Self {
        self.notification_timeout = timeout;
        self
    }

    pub fn with_persistence(mut self, persistence: OrderPersistence) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_compensation(mut self, policy: CompensationPolicy) -> Self {
        self.compensation = policy;
        self
    }
}
