//! Shared value types for the checkout saga services.

pub mod money;
pub mod order_id;

pub use money::Money;
pub use order_id::OrderId;
