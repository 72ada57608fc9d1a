//! HTTP clients for the payment and notification services.

use std::time::Duration;

use async_trait::async_trait;
use common::{Money, OrderId};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::SagaError;
use crate::services::notification::NotificationService;
use crate::services::payment::{PaymentGateway, PaymentReceipt};

fn build_client(timeout: Duration) -> Result<Client, SagaError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SagaError::Configuration(format!("failed to build HTTP client: {e}")))
}

fn normalize_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

#[derive(Debug, Serialize)]
struct ChargeRequest<'a> {
    order_id: &'a str,
    amount: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ChargeResponse {
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Payment gateway reached over HTTP at `{base_url}/payment/process`.
///
/// Only a 2xx answer is a confirmed charge. A 4xx answer is a decline;
/// 5xx, transport errors and timeouts mean the gateway was unreachable.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SagaError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[tracing::instrument(skip(self), fields(%order_id, amount = %amount))]
    async fn charge(&self, order_id: &OrderId, amount: Money) -> Result<PaymentReceipt, SagaError> {
        let url = format!("{}/payment/process", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ChargeRequest {
                order_id: order_id.as_str(),
                amount: amount.to_decimal(),
            })
            .send()
            .await
            .map_err(|e| SagaError::PaymentUnreachable(e.to_string()))?;

        let status = response.status();
        // The body is optional on every status.
        let body: ChargeResponse = response.json().await.unwrap_or_default();

        if status.is_success() {
            Ok(PaymentReceipt {
                transaction_id: body.transaction_id,
            })
        } else if status.is_client_error() {
            Err(SagaError::PaymentDeclined(body.message.unwrap_or_else(
                || format!("payment service returned {status}"),
            )))
        } else {
            Err(SagaError::PaymentUnreachable(format!(
                "payment service returned {status}"
            )))
        }
    }
}

#[derive(Debug, Serialize)]
struct NotifyRequest<'a> {
    order_id: &'a str,
    user_id: &'a str,
    message: &'a str,
}

/// Notification service reached over HTTP at `{base_url}/notify`.
///
/// The response body is ignored; any non-2xx answer is a failure.
#[derive(Debug, Clone)]
pub struct HttpNotificationService {
    client: Client,
    base_url: String,
}

impl HttpNotificationService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SagaError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl NotificationService for HttpNotificationService {
    #[tracing::instrument(skip(self, message), fields(%order_id))]
    async fn notify(
        &self,
        order_id: &OrderId,
        user_id: &str,
        message: &str,
    ) -> Result<(), SagaError> {
        let url = format!("{}/notify", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&NotifyRequest {
                order_id: order_id.as_str(),
                user_id,
                message,
            })
            .send()
            .await
            .map_err(|e| SagaError::NotificationFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SagaError::NotificationFailed(format!(
                "notification service returned {status}"
            )))
        }
    }
}
