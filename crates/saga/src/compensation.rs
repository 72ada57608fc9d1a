//! Compensating action for a failed payment.
//!
//! The only compensation in the checkout saga is marking the order `failed`.
//! It is idempotent: an order that is already `failed` counts as compensated,
//! so the inline path, the cancellation guard and the recovery scan can all
//! race on the same order safely.

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use common::OrderId;
use order_store::{OrderStatus, OrderStore, OrderStoreError, SagaLog, SagaStep};

use crate::error::SagaError;

/// Bounded retry policy for compensation.
///
/// The default is a single attempt with no retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for CompensationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl CompensationPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            ..Self::default()
        }
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Delay before each attempt. The first is always zero; the rest double.
    fn delays(&self) -> impl Iterator<Item = Duration> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.initial_backoff)
            .with_max_delay(self.max_backoff)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .build();
        std::iter::once(Duration::ZERO).chain(backoff)
    }
}

/// Marks the order `failed`, retrying per `policy`.
///
/// On success records `compensated` in the saga log. On exhaustion records
/// `compensation_pending`, bumps `cart_compensation_failures_total` and
/// returns [`SagaError::CompensationFailed`]; the order stays `pending`.
#[tracing::instrument(skip(store, policy), fields(%order_id, max_attempts = policy.max_attempts))]
pub async fn compensate_order<S>(
    store: &S,
    order_id: &OrderId,
    policy: &CompensationPolicy,
) -> Result<(), SagaError>
where
    S: OrderStore + SagaLog + ?Sized,
{
    let mut last_error = None;

    for (attempt, delay) in policy.delays().enumerate() {
        if attempt > 0 {
            tokio::time::sleep(delay).await;
        }

        match store.update_status(order_id, OrderStatus::Failed).await {
            Ok(()) => {
                tracing::info!(attempt = attempt + 1, "order compensated");
                record_step(store, order_id, SagaStep::Compensated).await;
                return Ok(());
            }
            Err(OrderStoreError::InvalidTransition {
                from: OrderStatus::Failed,
                ..
            }) => {
                tracing::debug!("order already failed");
                record_step(store, order_id, SagaStep::Compensated).await;
                return Ok(());
            }
            Err(e @ (OrderStoreError::OrderNotFound(_) | OrderStoreError::InvalidTransition { .. })) => {
                last_error = Some(e);
                break;
            }
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "compensation attempt failed"
                );
                last_error = Some(e);
            }
        }
    }

    let reason = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no compensation attempts made".to_string());
    metrics::counter!("cart_compensation_failures_total").increment(1);
    tracing::error!(reason = %reason, "compensation gave up, order left pending");
    record_step(store, order_id, SagaStep::CompensationPending).await;

    Err(SagaError::CompensationFailed {
        order_id: order_id.clone(),
        reason,
    })
}

/// Best-effort saga log write.
pub(crate) async fn record_step<S>(store: &S, order_id: &OrderId, step: SagaStep)
where
    S: SagaLog + ?Sized,
{
    if let Err(e) = store.record(order_id, step).await {
        tracing::warn!(%order_id, %step, error = %e, "failed to record saga step");
    }
}

/// Saga log write retried per `policy`. Returns false once every attempt failed.
pub(crate) async fn record_step_with_retry<S>(
    store: &S,
    order_id: &OrderId,
    step: SagaStep,
    policy: &CompensationPolicy,
) -> bool
where
    S: SagaLog + ?Sized,
{
    for (attempt, delay) in policy.delays().enumerate() {
        if attempt > 0 {
            tokio::time::sleep(delay).await;
        }
        match store.record(order_id, step).await {
            Ok(()) => return true,
            Err(e) => tracing::warn!(
                %order_id,
                %step,
                attempt = attempt + 1,
                error = %e,
                "failed to record saga step"
            ),
        }
    }
    false
}

/// Compensates the order if dropped while armed.
///
/// Armed once the charge is dispatched. If the checkout future is dropped
/// before the payment outcome is known (for example the client hung up),
/// the outcome is unknown and the order is compensated on a spawned task.
pub struct CompensationGuard<S>
where
    S: OrderStore + SagaLog + 'static,
{
    store: Option<S>,
    order_id: OrderId,
    policy: CompensationPolicy,
}

impl<S> CompensationGuard<S>
where
    S: OrderStore + SagaLog + 'static,
{
    pub fn arm(store: S, order_id: OrderId, policy: CompensationPolicy) -> Self {
        Self {
            store: Some(store),
            order_id,
            policy,
        }
    }

    /// The payment outcome is known; nothing to do on drop.
    pub fn disarm(mut self) {
        self.store = None;
    }

    pub fn is_armed(&self) -> bool {
        self.store.is_some()
    }
}

impl<S> Drop for CompensationGuard<S>
where
    S: OrderStore + SagaLog + 'static,
{
    fn drop(&mut self) {
        let Some(store) = self.store.take() else {
            return;
        };

        let order_id = self.order_id.clone();
        let policy = self.policy.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(%order_id, "checkout cancelled with payment outstanding, compensating");
                metrics::counter!("cart_saga_cancelled_total").increment(1);
                handle.spawn(async move {
                    let _ = compensate_order(&store, &order_id, &policy).await;
                });
            }
            Err(_) => {
                tracing::error!(%order_id, "checkout cancelled outside a runtime, order left pending");
            }
        }
    }
}
