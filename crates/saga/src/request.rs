//! Checkout request and its validation.

use common::Money;
use serde::{Deserialize, Serialize};

use crate::error::SagaError;

/// A line item as received on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub quantity: i64,
    pub price: f64,
}

/// The checkout request as received on the wire.
///
/// Immutable input to the saga. Call [`CheckoutRequest::validate`] before
/// starting a saga; nothing is written for a request that fails validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub amount: f64,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

/// A validated line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// A checkout request that passed validation, with amounts in cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCheckout {
    pub user_id: String,
    pub amount: Money,
    pub items: Vec<ValidatedItem>,
}

impl CheckoutRequest {
    /// Creates a request with no line items.
    pub fn new(user_id: impl Into<String>, amount: f64) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            items: Vec::new(),
        }
    }

    /// Adds a line item.
    pub fn with_item(mut self, product_id: impl Into<String>, quantity: i64, price: f64) -> Self {
        self.items.push(LineItem {
            product_id: product_id.into(),
            quantity,
            price,
        });
        self
    }

    /// Checks the request and converts amounts to cents.
    pub fn validate(&self) -> Result<ValidatedCheckout, SagaError> {
        let user_id = self.user_id.trim();
        if user_id.is_empty() {
            return Err(SagaError::Validation("user_id is required".to_string()));
        }

        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(SagaError::Validation(format!(
                "amount must be greater than 0, got {}",
                self.amount
            )));
        }
        let amount = Money::from_decimal(self.amount)
            .filter(Money::is_positive)
            .ok_or_else(|| {
                SagaError::Validation(format!(
                    "amount must be at least 0.01, got {}",
                    self.amount
                ))
            })?;

        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| validate_item(index, item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedCheckout {
            user_id: user_id.to_string(),
            amount,
            items,
        })
    }
}

fn validate_item(index: usize, item: &LineItem) -> Result<ValidatedItem, SagaError> {
    if item.product_id.trim().is_empty() {
        return Err(SagaError::Validation(format!(
            "items[{index}]: product_id is required"
        )));
    }

    let quantity = u32::try_from(item.quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| {
            SagaError::Validation(format!(
                "items[{index}]: quantity must be at least 1, got {}",
                item.quantity
            ))
        })?;

    let unit_price = Money::from_decimal(item.price)
        .filter(|m| !m.is_negative())
        .ok_or_else(|| {
            SagaError::Validation(format!(
                "items[{index}]: price must be 0 or more, got {}",
                item.price
            ))
        })?;

    if unit_price.checked_mul(quantity).is_none() {
        return Err(SagaError::Validation(format!(
            "items[{index}]: line total out of range ({} x {})",
            item.quantity, item.price
        )));
    }

    Ok(ValidatedItem {
        product_id: item.product_id.clone(),
        quantity,
        unit_price,
    })
}
