//! Saga pattern implementation for checkout.
//!
//! The checkout saga follows these steps:
//! 1. Persist the order as `pending`
//! 2. Charge the payment gateway
//! 3. Notify the user
//!
//! A payment failure is compensated by marking the order `failed`.
//! A notification failure never changes the outcome.

pub mod compensation;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod order_checkout;
pub mod outcome;
pub mod recovery;
pub mod request;
pub mod services;
pub mod state;

pub use compensation::{CompensationGuard, CompensationPolicy, compensate_order};
pub use config::{OrchestratorConfig, OrderPersistence};
pub use coordinator::CheckoutOrchestrator;
pub use error::SagaError;
pub use outcome::{CheckoutOutcome, CheckoutResult};
pub use recovery::{ConfirmedPayments, RecoveryReport, SagaRecovery};
pub use request::{CheckoutRequest, LineItem, ValidatedCheckout, ValidatedItem};
pub use services::{
    HttpNotificationService, HttpPaymentGateway, InMemoryNotificationService,
    InMemoryPaymentGateway, NotificationService, PaymentBehavior, PaymentGateway, PaymentReceipt,
    SentNotification,
};
pub use state::{SagaStage, SagaState};
