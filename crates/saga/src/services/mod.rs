//! External collaborator traits, in-memory implementations and HTTP clients.

pub mod http;
pub mod notification;
pub mod payment;

pub use http::{HttpNotificationService, HttpPaymentGateway};
pub use notification::{InMemoryNotificationService, NotificationService, SentNotification};
pub use payment::{InMemoryPaymentGateway, PaymentBehavior, PaymentGateway, PaymentReceipt};
