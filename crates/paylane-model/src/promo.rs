use crate::ids::{Corridor, Currency, PaymentMethod, PromoCodeId};
use crate::limits::{BudgetLimit, UsageLimit};
use chrono::{DateTime, Utc};
use paylane_core::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DiscountKind {
    Fixed,
    Percentage,
    FeeWaiver,
    FxBoost,
}

impl DiscountKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "Fixed",
            Self::Percentage => "Percentage",
            Self::FeeWaiver => "FeeWaiver",
            Self::FxBoost => "FxBoost",
        }
    }
}

impl std::str::FromStr for DiscountKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fixed" => Ok(Self::Fixed),
            "Percentage" => Ok(Self::Percentage),
            "FeeWaiver" => Ok(Self::FeeWaiver),
            "FxBoost" => Ok(Self::FxBoost),
            other => Err(ValidationError(format!("unknown discount kind {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PromoStatus {
    Active,
    Disabled,
}

impl PromoStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Disabled => "Disabled",
        }
    }
}

impl std::str::FromStr for PromoStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Disabled" => Ok(Self::Disabled),
            other => Err(ValidationError(format!("unknown promo status {other:?}"))),
        }
    }
}

/// Target user segment for a promo campaign. Each variant carries its own
/// typed criteria; there is no free-form criteria object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SegmentRule {
    All,
    New { max_transaction_count: u32 },
    Churned { inactivity_days: u32 },
}

impl Default for SegmentRule {
    fn default() -> Self {
        Self::All
    }
}

/// Redemption restrictions. Every empty list means "unrestricted" for that
/// dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestrictionSet {
    #[serde(default)]
    pub corridors: Vec<Corridor>,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
    #[serde(default)]
    pub affiliates: Vec<String>,
}

impl RestrictionSet {
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.corridors.is_empty() && self.payment_methods.is_empty() && self.affiliates.is_empty()
    }

    #[must_use]
    pub fn allows_corridor(&self, source: &Currency, dest: &Currency) -> bool {
        self.corridors.is_empty()
            || self
                .corridors
                .iter()
                .any(|c| &c.source == source && &c.dest == dest)
    }

    #[must_use]
    pub fn allows_payment_method(&self, method: &PaymentMethod) -> bool {
        self.payment_methods.is_empty() || self.payment_methods.contains(method)
    }

    #[must_use]
    pub fn allows_affiliate(&self, affiliate: Option<&str>) -> bool {
        if self.affiliates.is_empty() {
            return true;
        }
        affiliate.is_some_and(|a| self.affiliates.iter().any(|x| x == a))
    }
}

/// A promo code as held in the registry, counters included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromoCode {
    pub id: i64,
    pub code: PromoCodeId,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub min_amount: Decimal,
    pub max_discount: Option<Decimal>,
    pub currency: Currency,
    pub usage_limit_global: UsageLimit,
    pub usage_limit_per_user: UsageLimit,
    pub usage_count: u64,
    pub total_discount_utilized: Decimal,
    pub budget_limit: BudgetLimit,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: PromoStatus,
    pub restrictions: RestrictionSet,
    pub segment: SegmentRule,
    pub created_at: DateTime<Utc>,
    pub last_campaign_at: Option<DateTime<Utc>>,
}

impl PromoCode {
    /// Validity window is half-open: `[starts_at, ends_at)`.
    #[must_use]
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }
}

/// One committed promo redemption. Kept as its own read model, deliberately
/// not unified with the credit ledger; the two meet only in the
/// cost-incurred aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedemptionRecord {
    pub id: i64,
    pub promo_id: i64,
    pub code: PromoCodeId,
    pub user_id: Option<String>,
    pub discount_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Validated definition for creating a promo code.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPromoCode {
    pub code: PromoCodeId,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub min_amount: Decimal,
    pub max_discount: Option<Decimal>,
    pub currency: Currency,
    pub usage_limit_global: UsageLimit,
    pub usage_limit_per_user: UsageLimit,
    pub budget_limit: BudgetLimit,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: PromoStatus,
    pub restrictions: RestrictionSet,
    pub segment: SegmentRule,
}

impl NewPromoCode {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.value <= Decimal::ZERO {
            return Err(ValidationError("promo value must be positive".to_string()));
        }
        if self.kind == DiscountKind::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err(ValidationError(
                "percentage promo value must not exceed 100".to_string(),
            ));
        }
        if self.max_discount.is_some() && self.kind != DiscountKind::Percentage {
            return Err(ValidationError(
                "max_discount applies to percentage promos only".to_string(),
            ));
        }
        if let Some(cap) = self.max_discount {
            if cap <= Decimal::ZERO {
                return Err(ValidationError("max_discount must be positive".to_string()));
            }
        }
        if self.min_amount < Decimal::ZERO {
            return Err(ValidationError(
                "min_amount must not be negative".to_string(),
            ));
        }
        if self.ends_at <= self.starts_at {
            return Err(ValidationError(
                "promo window must end after it starts".to_string(),
            ));
        }
        Ok(())
    }
}
