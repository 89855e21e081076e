// SPDX-License-Identifier: Apache-2.0

//! DTO-to-domain conversions. Every function returns the fully validated
//! domain definition or the first field error.

use crate::dto::{CreatePromoRequest, ReferralRuleRequest, SchemeRequest, TransactionRequest};
use crate::params::parse_datetime;
use paylane_core::ValidationError;
use paylane_model::{
    BudgetLimit, CommissionMode, Currency, NewBonusScheme, NewPromoCode, NewReferralRule,
    NewTransaction, PaymentMethod, PromoCodeId, PromoStatus, RuleStatus, SchemeStatus,
    SegmentRule, TierTable, UsageLimit,
};
use rust_decimal::Decimal;

fn currency_or_default(raw: Option<&str>, default_currency: &str) -> Result<Currency, ValidationError> {
    match raw {
        Some(value) => Currency::parse(value),
        None => Currency::parse(default_currency),
    }
}

pub fn promo_definition(
    req: &CreatePromoRequest,
    default_currency: &str,
) -> Result<NewPromoCode, ValidationError> {
    let definition = NewPromoCode {
        code: PromoCodeId::parse(&req.code)?,
        kind: req.kind,
        value: req.value,
        min_amount: req.min_amount.unwrap_or(Decimal::ZERO),
        max_discount: req.max_discount,
        currency: currency_or_default(req.currency.as_deref(), default_currency)?,
        usage_limit_global: UsageLimit::from_raw(req.usage_limit_global.unwrap_or(-1)),
        usage_limit_per_user: UsageLimit::from_raw(req.usage_limit_per_user.unwrap_or(-1)),
        budget_limit: BudgetLimit::from_raw(req.budget_limit.unwrap_or(Decimal::NEGATIVE_ONE)),
        starts_at: parse_datetime(&req.starts_at)?,
        ends_at: parse_datetime(&req.ends_at)?,
        status: req.status.unwrap_or(PromoStatus::Active),
        restrictions: req.restrictions.clone().unwrap_or_default(),
        segment: req.segment.clone().unwrap_or(SegmentRule::All),
    };
    definition.validate()?;
    Ok(definition)
}

pub fn scheme_definition(
    req: &SchemeRequest,
    default_currency: &str,
) -> Result<NewBonusScheme, ValidationError> {
    let tiers = match (req.is_tiered, &req.tiers) {
        (Some(false) | None, None) => None,
        (Some(false), Some(_)) => {
            return Err(ValidationError(
                "tiers supplied but is_tiered is false".to_string(),
            ));
        }
        (Some(true), None) => {
            return Err(ValidationError(
                "is_tiered scheme requires a tier table".to_string(),
            ));
        }
        (Some(true) | None, Some(raw)) => Some(TierTable::parse(raw.clone())?),
    };
    let credit_amount = match (req.credit_amount, tiers.is_some()) {
        (Some(amount), _) => amount,
        // tiered schemes take their values from the table
        (None, true) => Decimal::ZERO,
        (None, false) => {
            return Err(ValidationError(
                "credit_amount is required for non-tiered schemes".to_string(),
            ));
        }
    };
    let definition = NewBonusScheme {
        name: req.name.trim().to_string(),
        kind: req.kind,
        credit_amount,
        currency: currency_or_default(req.currency.as_deref(), default_currency)?,
        min_transaction_amount: req.min_transaction_amount.unwrap_or(Decimal::ZERO),
        loyalty: req.loyalty,
        commission: req.commission.unwrap_or(CommissionMode::Fixed),
        tiers,
        eligibility: req.eligibility.clone().unwrap_or_default(),
        starts_at: parse_datetime(&req.starts_at)?,
        ends_at: parse_datetime(&req.ends_at)?,
        status: req.status.unwrap_or(SchemeStatus::Active),
    };
    definition.validate()?;
    Ok(definition)
}

pub fn referral_definition(req: &ReferralRuleRequest) -> Result<NewReferralRule, ValidationError> {
    let definition = NewReferralRule {
        base_currency: Currency::parse(&req.base_currency)?,
        reward_amount: req.reward_amount,
        referee_reward_amount: req.referee_reward_amount.unwrap_or(Decimal::ZERO),
        min_transaction_amount: req.min_transaction_amount.unwrap_or(Decimal::ZERO),
        status: req.status.unwrap_or(RuleStatus::Active),
    };
    definition.validate()?;
    Ok(definition)
}

/// The settlement currency defaults to the source currency when absent.
pub fn transaction_definition(req: &TransactionRequest) -> Result<NewTransaction, ValidationError> {
    let source_currency = Currency::parse(&req.source_currency)?;
    let currency = match req.currency.as_deref() {
        Some(value) => Currency::parse(value)?,
        None => source_currency.clone(),
    };
    let definition = NewTransaction {
        id: req.id.trim().to_string(),
        user_id: req.user_id.trim().to_string(),
        amount: req.amount,
        currency,
        source_currency,
        dest_currency: Currency::parse(&req.dest_currency)?,
        payment_method: PaymentMethod::parse(&req.payment_method)?,
    };
    definition.validate()?;
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use paylane_model::DiscountKind;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn promo_definition_fills_defaults_and_normalizes_code() {
        let req: CreatePromoRequest = serde_json::from_value(json!({
            "code": "save20",
            "type": "Percentage",
            "value": 20,
            "start_date": "2025-01-01",
            "end_date": "2026-01-01"
        }))
        .unwrap();
        let definition = promo_definition(&req, "USD").unwrap();
        assert_eq!(definition.code.as_str(), "SAVE20");
        assert_eq!(definition.kind, DiscountKind::Percentage);
        assert_eq!(definition.currency.as_str(), "USD");
        assert!(definition.usage_limit_global.is_unlimited());
        assert!(definition.budget_limit.is_unlimited());
        assert_eq!(definition.min_amount, Decimal::ZERO);
    }

    #[test]
    fn promo_definition_rejects_bad_dates() {
        let req: CreatePromoRequest = serde_json::from_value(json!({
            "code": "X",
            "kind": "Fixed",
            "value": 5,
            "starts_at": "soon",
            "ends_at": "2026-01-01"
        }))
        .unwrap();
        assert!(promo_definition(&req, "USD").is_err());
    }

    #[test]
    fn scheme_definition_requires_consistent_tier_flags() {
        let base = json!({
            "name": "tiered",
            "kind": "transaction-threshold-credit",
            "start_date": "2025-01-01",
            "end_date": "2026-01-01"
        });

        let mut flagged = base.clone();
        flagged["is_tiered"] = json!(true);
        let req: SchemeRequest = serde_json::from_value(flagged).unwrap();
        assert!(scheme_definition(&req, "USD").is_err());

        let mut with_table = base.clone();
        with_table["tiers"] = json!([{"min": 0, "max": 1000, "value": 50}]);
        let req: SchemeRequest = serde_json::from_value(with_table).unwrap();
        let definition = scheme_definition(&req, "USD").unwrap();
        assert!(definition.tiers.is_some());
        assert_eq!(definition.credit_amount, Decimal::ZERO);

        let mut contradicted = base;
        contradicted["is_tiered"] = json!(false);
        contradicted["tiers"] = json!([{"min": 0, "max": 1000, "value": 50}]);
        let req: SchemeRequest = serde_json::from_value(contradicted).unwrap();
        assert!(scheme_definition(&req, "USD").is_err());
    }

    #[test]
    fn scheme_definition_requires_credit_amount_when_flat() {
        let req: SchemeRequest = serde_json::from_value(json!({
            "name": "flat",
            "kind": "request-money-credit",
            "start_date": "2025-01-01",
            "end_date": "2026-01-01"
        }))
        .unwrap();
        assert!(scheme_definition(&req, "USD").is_err());
    }

    #[test]
    fn transaction_definition_defaults_currency_to_source() {
        let req: TransactionRequest = serde_json::from_value(json!({
            "id": "txn-1",
            "user_id": "u1",
            "amount": dec!(100),
            "source_currency": "gbp",
            "dest_currency": "inr",
            "payment_method": "Card"
        }))
        .unwrap();
        let definition = transaction_definition(&req).unwrap();
        assert_eq!(definition.currency.as_str(), "GBP");
        assert_eq!(definition.payment_method.as_str(), "card");
    }
}
