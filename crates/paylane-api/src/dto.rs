// SPDX-License-Identifier: Apache-2.0

use paylane_model::{
    CommissionMode, DiscountKind, EligibilityRule, EntryType, LoyaltyRule, PromoStatus,
    ReasonCode, RestrictionSet, RuleStatus, SchemeStatus, SegmentRule, Tier,
};
use rust_decimal::Decimal;
use serde::Deserialize;

/// `POST /api/promocodes`. Date fields accept RFC 3339 or `YYYY-MM-DD`;
/// the portal's legacy field names are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePromoRequest {
    pub code: String,
    #[serde(alias = "type")]
    pub kind: DiscountKind,
    pub value: Decimal,
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub usage_limit_global: Option<i64>,
    #[serde(default)]
    pub usage_limit_per_user: Option<i64>,
    #[serde(default)]
    pub budget_limit: Option<Decimal>,
    #[serde(alias = "start_date")]
    pub starts_at: String,
    #[serde(alias = "end_date")]
    pub ends_at: String,
    #[serde(default)]
    pub status: Option<PromoStatus>,
    #[serde(default)]
    pub restrictions: Option<RestrictionSet>,
    #[serde(default)]
    pub segment: Option<SegmentRule>,
}

/// `PUT /api/promocodes/:id/status`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePromoStatusRequest {
    pub status: PromoStatus,
}

/// `POST /api/promocodes/validate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatePromoRequest {
    pub code: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    pub source_currency: String,
    pub dest_currency: String,
    pub payment_method: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub affiliate_id: Option<String>,
}

/// `POST /api/promocodes/apply` — the commit step.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyPromoRequest {
    pub code: String,
    pub discount_amount: Decimal,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// `POST`/`PUT /api/bonus-schemes[/:id]`. `is_tiered` and `tiers` must
/// agree; the table itself is validated when parsed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemeRequest {
    pub name: String,
    pub kind: paylane_model::BonusKind,
    #[serde(default)]
    pub credit_amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub min_transaction_amount: Option<Decimal>,
    #[serde(default)]
    pub loyalty: Option<LoyaltyRule>,
    #[serde(default)]
    pub commission: Option<CommissionMode>,
    #[serde(default)]
    pub is_tiered: Option<bool>,
    #[serde(default)]
    pub tiers: Option<Vec<Tier>>,
    #[serde(default)]
    pub eligibility: Option<EligibilityRule>,
    #[serde(alias = "start_date")]
    pub starts_at: String,
    #[serde(alias = "end_date")]
    pub ends_at: String,
    #[serde(default)]
    pub status: Option<SchemeStatus>,
}

/// `POST /api/credits/award-bonus`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwardBonusRequest {
    pub user_id: String,
    pub scheme_id: i64,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub admin_user: Option<String>,
}

/// `POST /api/credits/manual`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualAdjustRequest {
    pub user_id: String,
    pub amount: Decimal,
    #[serde(alias = "type")]
    pub entry_type: EntryType,
    pub reason_code: ReasonCode,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub scheme_id: Option<i64>,
    #[serde(default)]
    pub admin_user: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// `POST`/`PUT /api/referral-rules[/:id]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferralRuleRequest {
    pub base_currency: String,
    pub reward_amount: Decimal,
    #[serde(default)]
    pub referee_reward_amount: Option<Decimal>,
    #[serde(default)]
    pub min_transaction_amount: Option<Decimal>,
    #[serde(default)]
    pub status: Option<RuleStatus>,
}

/// `POST /api/transactions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionRequest {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    pub source_currency: String,
    pub dest_currency: String,
    pub payment_method: String,
}
