//! Recovery scan for sagas stranded between steps.
//!
//! A crash after step A, or a compensation that gave up, leaves an order
//! `pending` with no saga to finish it. The scan reads the saga log and
//! settles every such order whose last step is older than a threshold.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::OrderId;
use order_store::{OrderStatus, OrderStore, SagaLog, SagaStep};
use tokio::sync::RwLock;

use crate::compensation::{CompensationPolicy, compensate_order, record_step};
use crate::error::SagaError;

/// Counts from one recovery scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Stranded log entries found.
    pub scanned: usize,
    /// Orders moved from `pending` to `failed`.
    pub compensated: usize,
    /// Orders already terminal; only the log was updated.
    pub settled: usize,
    /// Orders that could not be compensated this round.
    pub failed: usize,
}

/// Orders whose charge was confirmed but whose saga log could not say so.
///
/// Shared by the orchestrator, which fills it, and the recovery scan, which
/// settles these orders instead of compensating them.
#[derive(Debug, Clone, Default)]
pub struct ConfirmedPayments {
    orders: Arc<RwLock<HashSet<OrderId>>>,
}

impl ConfirmedPayments {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order_id: OrderId) {
        self.orders.write().await.insert(order_id);
    }

    pub async fn contains(&self, order_id: &OrderId) -> bool {
        self.orders.read().await.contains(order_id)
    }

    pub async fn remove(&self, order_id: &OrderId) {
        self.orders.write().await.remove(order_id);
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

/// Finds and compensates stranded checkout sagas.
pub struct SagaRecovery<S>
where
    S: OrderStore + SagaLog,
{
    store: S,
    policy: CompensationPolicy,
    confirmed: ConfirmedPayments,
}

impl<S> SagaRecovery<S>
where
    S: OrderStore + SagaLog,
{
    pub fn new(store: S, policy: CompensationPolicy) -> Self {
        Self {
            store,
            policy,
            confirmed: ConfirmedPayments::new(),
        }
    }

    /// Shares the orchestrator's set of confirmed but unlogged payments.
    pub fn with_confirmed_payments(mut self, confirmed: ConfirmedPayments) -> Self {
        self.confirmed = confirmed;
        self
    }

    /// Settles every saga whose last step needs recovery and is older than
    /// `stale_after`.
    ///
    /// `stale_after` must exceed the payment timeout, or the scan may
    /// compensate a saga that is still waiting on its charge.
    #[tracing::instrument(skip(self))]
    pub async fn scan(&self, stale_after: Duration) -> Result<RecoveryReport, SagaError> {
        let stale_after = chrono::Duration::from_std(stale_after)
            .map_err(|e| SagaError::Configuration(format!("invalid staleness threshold: {e}")))?;
        let entries = self.store.stranded(Utc::now() - stale_after).await?;

        let mut report = RecoveryReport {
            scanned: entries.len(),
            ..RecoveryReport::default()
        };

        for entry in entries {
            let order_id = entry.order_id;
            let order = match self.store.get_order(&order_id).await {
                Ok(Some(order)) => order,
                Ok(None) => {
                    tracing::warn!(%order_id, "saga log entry without an order");
                    report.failed += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%order_id, error = %e, "failed to read stranded order");
                    report.failed += 1;
                    continue;
                }
            };
            let paid = self.confirmed.contains(&order_id).await;

            match order.status {
                OrderStatus::Pending if paid => {
                    tracing::info!(%order_id, "payment was confirmed, settling without compensation");
                    match self.store.record(&order_id, SagaStep::Completed).await {
                        Ok(()) => self.confirmed.remove(&order_id).await,
                        Err(e) => {
                            tracing::warn!(%order_id, error = %e, "saga log still unwritable");
                        }
                    }
                    report.settled += 1;
                }
                OrderStatus::Pending => {
                    tracing::info!(%order_id, last_step = %entry.last_step, "compensating stranded order");
                    match compensate_order(&self.store, &order_id, &self.policy).await {
                        Ok(()) => report.compensated += 1,
                        Err(_) => report.failed += 1,
                    }
                }
                OrderStatus::Failed => {
                    record_step(&self.store, &order_id, SagaStep::Compensated).await;
                    report.settled += 1;
                }
                OrderStatus::Completed => {
                    record_step(&self.store, &order_id, SagaStep::Completed).await;
                    report.settled += 1;
                }
            }
        }

        if report.scanned > 0 {
            metrics::counter!("cart_recovery_compensations_total")
                .increment(report.compensated as u64);
            tracing::info!(
                scanned = report.scanned,
                compensated = report.compensated,
                settled = report.settled,
                failed = report.failed,
                "recovery scan finished"
            );
        }
        Ok(report)
    }

    /// Scans every `interval` until `shutdown` resolves.
    pub async fn run<F>(self, interval: Duration, stale_after: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!(?interval, ?stale_after, "recovery scanner started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.scan(stale_after).await {
                        tracing::error!(error = %e, "recovery scan failed");
                    }
                }
            }
        }
        tracing::info!("recovery scanner stopped");
    }
}
