//! Checkout saga constants.

use std::time::Duration;

/// The saga type identifier for checkout.
pub const SAGA_TYPE: &str = "Checkout";

/// Step name: Persist the order as pending.
pub const STEP_PERSIST_ORDER: &str = "persist_order";

/// Step name: Charge the payment gateway.
pub const STEP_PROCESS_PAYMENT: &str = "process_payment";

/// Step name: Notify the user.
pub const STEP_SEND_NOTIFICATION: &str = "send_notification";

/// Message sent to the user after a successful checkout.
pub const CONFIRMATION_MESSAGE: &str = "Your order has been confirmed";

/// Default bound on the payment call.
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on the notification call.
pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);
