use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Order totals attached to a conversion as `custom_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub currency: String,
    pub total: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum InvalidOrder {
    #[error("Order id must be positive")]
    Id,
    #[error("Currency must be a three-letter ISO 4217 code")]
    Currency,
    #[error("Total must be a non-negative number")]
    Total,
}

#[derive(Debug, Deserialize)]
pub struct UpsertOrderRequest {
    pub currency: String,
    pub total: f64,
}

impl UpsertOrderRequest {
    /// Validate and normalise into the stored order; the currency is upper-cased
    pub fn into_order(self, id: i64) -> Result<Order, InvalidOrder> {
        if id <= 0 {
            return Err(InvalidOrder::Id);
        }

        let currency = self.currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(InvalidOrder::Currency);
        }

        if !self.total.is_finite() || self.total < 0.0 {
            return Err(InvalidOrder::Total);
        }

        Ok(Order {
            id,
            currency,
            total: self.total,
        })
    }
}
