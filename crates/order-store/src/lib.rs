//! Order persistence for the checkout saga.
//!
//! Provides the [`OrderStore`] consumed by the orchestrator to create orders
//! and compensate them, and the [`SagaLog`] used to find sagas stranded by a
//! crash between steps. Both have an in-memory and a PostgreSQL backend.

pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod saga_log;
pub mod store;

pub use common::{Money, OrderId};
pub use error::{OrderStoreError, Result};
pub use memory::InMemoryOrderStore;
pub use order::{Order, OrderStatus};
pub use postgres::{ConnectOptions, PostgresOrderStore};
pub use saga_log::{SagaLog, SagaLogEntry, SagaStep};
pub use store::OrderStore;
