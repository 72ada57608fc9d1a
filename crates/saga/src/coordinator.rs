//! Checkout orchestrator.

use std::time::Instant;

use common::OrderId;
use order_store::{Order, OrderStore, SagaLog, SagaStep};

use crate::compensation::{
    CompensationGuard, compensate_order, record_step, record_step_with_retry,
};
use crate::config::{OrchestratorConfig, OrderPersistence};
use crate::error::SagaError;
use crate::order_checkout;
use crate::outcome::{CheckoutOutcome, CheckoutResult};
use crate::recovery::ConfirmedPayments;
use crate::request::CheckoutRequest;
use crate::services::notification::NotificationService;
use crate::services::payment::PaymentGateway;
use crate::state::{SagaStage, SagaState};

/// Orchestrates checkout sagas.
///
/// The coordinator drives a 3-step saga (persist order → charge payment →
/// notify) strictly in sequence. A payment failure is compensated by marking
/// the order `failed`; a notification failure is logged and swallowed.
///
/// The coordinator holds no per-request mutable state and is shared by every
/// concurrent checkout.
pub struct CheckoutOrchestrator<S, P, N>
where
    S: OrderStore + SagaLog + Clone + 'static,
    P: PaymentGateway,
    N: NotificationService,
{
    store: S,
    payment: P,
    notification: N,
    config: OrchestratorConfig,
    confirmed: ConfirmedPayments,
}

impl<S, P, N> CheckoutOrchestrator<S, P, N>
where
    S: OrderStore + SagaLog + Clone + 'static,
    P: PaymentGateway,
    N: NotificationService,
{
    /// Creates an orchestrator with default settings.
    pub fn new(store: S, payment: P, notification: N) -> Self {
        Self::with_config(store, payment, notification, OrchestratorConfig::default())
    }

    pub fn with_config(store: S, payment: P, notification: N, config: OrchestratorConfig) -> Self {
        Self {
            store,
            payment,
            notification,
            config,
            confirmed: ConfirmedPayments::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Paid orders the saga log failed to record; hand to [`SagaRecovery`](crate::SagaRecovery).
    pub fn confirmed_payments(&self) -> ConfirmedPayments {
        self.confirmed.clone()
    }

    /// Runs one checkout saga.
    ///
    /// Returns `Err` only for a request that fails validation, in which case
    /// nothing was written and no collaborator was called. Every saga that
    /// starts ends in one of the three [`CheckoutOutcome`]s.
    #[tracing::instrument(
        skip(self, request),
        fields(
            saga_type = order_checkout::SAGA_TYPE,
            user_id = %request.user_id,
            order_id = tracing::field::Empty,
        )
    )]
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<CheckoutResult, SagaError> {
        let checkout = match request.validate() {
            Ok(checkout) => checkout,
            Err(e) => {
                metrics::counter!("cart_saga_total", "status" => "error").increment(1);
                tracing::warn!(error = %e, "checkout rejected");
                return Err(e);
            }
        };

        let saga_start = Instant::now();
        let order_id = OrderId::generate();
        tracing::Span::current().record("order_id", order_id.as_str());
        let mut state = SagaState::new(order_id.clone());
        let persisted = self.config.persistence == OrderPersistence::Required;

        // 1. Step A: Persist the order
        if persisted {
            tracing::info!(step = order_checkout::STEP_PERSIST_ORDER, "saga step started");
            let order = Order::pending(order_id.clone(), &checkout.user_id, checkout.amount);
            if let Err(e) = self.store.create_order(&order).await {
                let e = SagaError::StoreUnavailable(e);
                tracing::error!(error = %e, "failed to persist order");
                state.advance(SagaStage::InternalError)?;
                return Ok(self.finish(state, CheckoutOutcome::InternalError, saga_start));
            }
            state.advance(SagaStage::OrderPersisted)?;
            self.record_step(&order_id, SagaStep::OrderPersisted).await;
        } else {
            tracing::warn!("order persistence skipped, order will not be stored");
        }

        // 2. Step B: Charge the payment gateway
        tracing::info!(step = order_checkout::STEP_PROCESS_PAYMENT, "saga step started");
        state.advance(SagaStage::PaymentPending)?;
        let guard = persisted.then(|| {
            CompensationGuard::arm(
                self.store.clone(),
                order_id.clone(),
                self.config.compensation.clone(),
            )
        });
        self.record_step(&order_id, SagaStep::PaymentDispatched).await;

        let charge = tokio::time::timeout(
            self.config.payment_timeout,
            self.payment.charge(&order_id, checkout.amount),
        )
        .await
        .unwrap_or_else(|_| {
            Err(SagaError::PaymentUnreachable(format!(
                "timed out after {:?}",
                self.config.payment_timeout
            )))
        });

        let payment_logged = match charge {
            Ok(receipt) => {
                if let Some(guard) = guard {
                    guard.disarm();
                }
                state.advance(SagaStage::PaymentOk)?;
                tracing::info!(
                    transaction_id = receipt.transaction_id.as_deref().unwrap_or(""),
                    "payment confirmed"
                );
                self.record_step_durable(&order_id, SagaStep::PaymentConfirmed)
                    .await
            }
            Err(e) => {
                match &e {
                    SagaError::PaymentDeclined(_) => {
                        tracing::warn!(error = %e, "payment declined");
                    }
                    _ => tracing::error!(error = %e, "payment gateway unreachable"),
                }
                state.advance(SagaStage::PaymentFailed)?;

                if persisted
                    && let Err(comp) =
                        compensate_order(&self.store, &order_id, &self.config.compensation).await
                {
                    tracing::error!(error = %comp, "compensation failed");
                }
                if let Some(guard) = guard {
                    guard.disarm();
                }

                state.advance(SagaStage::Done)?;
                return Ok(self.finish(state, CheckoutOutcome::PaymentFailed, saga_start));
            }
        };

        // 3. Step C: Notify the user
        tracing::info!(step = order_checkout::STEP_SEND_NOTIFICATION, "saga step started");
        let notified = tokio::time::timeout(
            self.config.notification_timeout,
            self.notification.notify(
                &order_id,
                &checkout.user_id,
                &self.config.notification_message,
            ),
        )
        .await
        .unwrap_or_else(|_| {
            Err(SagaError::NotificationFailed(format!(
                "timed out after {:?}",
                self.config.notification_timeout
            )))
        });

        match notified {
            Ok(()) => state.advance(SagaStage::Notified)?,
            Err(e) => {
                metrics::counter!("cart_notification_failures_total").increment(1);
                tracing::warn!(error = %e, "notification failed, continuing");
                state.advance(SagaStage::NotifySkipped)?;
            }
        }

        state.advance(SagaStage::Done)?;
        let completed_logged = self.record_step_durable(&order_id, SagaStep::Completed).await;
        if !payment_logged && !completed_logged {
            // The log still reads `payment_dispatched`; keep recovery from compensating.
            metrics::counter!("cart_saga_log_failures_total").increment(1);
            tracing::error!("saga log missed a confirmed payment, order held for recovery");
            self.confirmed.insert(order_id.clone()).await;
        }
        Ok(self.finish(state, CheckoutOutcome::Success, saga_start))
    }

    fn finish(
        &self,
        state: SagaState,
        outcome: CheckoutOutcome,
        saga_start: Instant,
    ) -> CheckoutResult {
        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("cart_saga_duration_seconds").record(duration);
        metrics::counter!("cart_saga_total", "status" => outcome.metric_label()).increment(1);
        tracing::info!(%outcome, duration, "saga finished");

        CheckoutResult {
            order_id: state.order_id().clone(),
            outcome,
            state,
        }
    }

    async fn record_step(&self, order_id: &OrderId, step: SagaStep) {
        if self.config.persistence == OrderPersistence::Required {
            record_step(&self.store, order_id, step).await;
        }
    }

    /// Like `record_step`, retried under the compensation policy.
    async fn record_step_durable(&self, order_id: &OrderId, step: SagaStep) -> bool {
        if self.config.persistence != OrderPersistence::Required {
            return true;
        }
        record_step_with_retry(&self.store, order_id, step, &self.config.compensation).await
    }
}
