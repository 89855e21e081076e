use crate::ids::{Currency, PaymentMethod};
use chrono::{DateTime, Utc};
use paylane_core::ValidationError;
use rust_decimal::Decimal;
use serde::Serialize;

/// Minimal transfer record. Percentage and tiered bonus awards resolve the
/// transaction amount through this registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub source_currency: Currency,
    pub dest_currency: Currency,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub source_currency: Currency,
    pub dest_currency: Currency,
    pub payment_method: PaymentMethod,
}

impl NewTransaction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError(
                "transaction id must not be empty".to_string(),
            ));
        }
        if self.user_id.trim().is_empty() {
            return Err(ValidationError("user_id must not be empty".to_string()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError(
                "transaction amount must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
