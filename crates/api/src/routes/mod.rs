//! HTTP handlers and the state they share.

pub mod checkout;
pub mod health;
pub mod metrics;
pub mod orders;

use order_store::{OrderStore, SagaLog};
use saga::{CheckoutOrchestrator, NotificationService, PaymentGateway};

/// Shared application state accessible from all handlers.
pub struct AppState<S, P, N>
where
    S: OrderStore + SagaLog + Clone + 'static,
    P: PaymentGateway,
    N: NotificationService,
{
    pub orchestrator: CheckoutOrchestrator<S, P, N>,
}

impl<S, P, N> AppState<S, P, N>
where
    S: OrderStore + SagaLog + Clone + 'static,
    P: PaymentGateway,
    N: NotificationService,
{
    pub fn store(&self) -> &S {
        self.orchestrator.store()
    }
}
