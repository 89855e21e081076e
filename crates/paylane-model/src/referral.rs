use crate::ids::Currency;
use chrono::{DateTime, Utc};
use paylane_core::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RuleStatus {
    Active,
    Disabled,
}

impl RuleStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Disabled => "Disabled",
        }
    }
}

impl std::str::FromStr for RuleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Disabled" => Ok(Self::Disabled),
            other => Err(ValidationError(format!("unknown rule status {other:?}"))),
        }
    }
}

/// Referral reward rule. At most one rule may exist per base currency; the
/// store enforces the uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferralRule {
    pub id: i64,
    pub base_currency: Currency,
    pub reward_amount: Decimal,
    pub referee_reward_amount: Decimal,
    pub min_transaction_amount: Decimal,
    pub status: RuleStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReferralRule {
    pub base_currency: Currency,
    pub reward_amount: Decimal,
    pub referee_reward_amount: Decimal,
    pub min_transaction_amount: Decimal,
    pub status: RuleStatus,
}

impl NewReferralRule {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reward_amount <= Decimal::ZERO {
            return Err(ValidationError(
                "reward_amount must be positive".to_string(),
            ));
        }
        if self.referee_reward_amount < Decimal::ZERO {
            return Err(ValidationError(
                "referee_reward_amount must not be negative".to_string(),
            ));
        }
        if self.min_transaction_amount < Decimal::ZERO {
            return Err(ValidationError(
                "min_transaction_amount must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
