//! Downstream demo services around the cart: payment, notification, and
//! the frontend gateway. Each is an axum router plus a thin binary; tests
//! also run them in-process as collaborators of the cart service.

pub mod error;
pub mod frontend;
pub mod notification;
pub mod payment;
pub mod telemetry;

pub use error::{CollaboratorError, Result};
pub use frontend::CartClient;
pub use payment::PaymentConfig;
