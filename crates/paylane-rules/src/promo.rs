// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use paylane_model::{Currency, PaymentMethod, PromoCode, PromoStatus};
use rust_decimal::Decimal;

/// Proposed transfer a promo code is being validated against.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionContext {
    pub amount: Decimal,
    pub currency: Currency,
    pub source_currency: Currency,
    pub dest_currency: Currency,
    pub payment_method: PaymentMethod,
    pub user_id: Option<String>,
    pub affiliate_id: Option<String>,
}

/// Why a promo code does not apply. The first failing check wins; there is
/// no partial credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PromoRejection {
    NotFound,
    ExpiredOrInactive,
    UsageCapReached,
    BudgetCapReached,
    BelowThreshold,
    CorridorNotAllowed,
    MethodNotAllowed,
    PerUserCapReached,
    AffiliateNotAllowed,
}

impl PromoRejection {
    #[must_use]
    pub const fn as_code(self) -> &'static str {
        match self {
            Self::NotFound => "PROMO_NOT_FOUND",
            Self::ExpiredOrInactive => "PROMO_EXPIRED_OR_INACTIVE",
            Self::UsageCapReached => "USAGE_CAP_REACHED",
            Self::BudgetCapReached => "BUDGET_CAP_REACHED",
            Self::BelowThreshold => "BELOW_MIN_THRESHOLD",
            Self::CorridorNotAllowed => "CORRIDOR_NOT_ALLOWED",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::PerUserCapReached => "PER_USER_CAP_REACHED",
            Self::AffiliateNotAllowed => "AFFILIATE_NOT_ALLOWED",
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotFound => "promo code not found",
            Self::ExpiredOrInactive => "promo code is expired or inactive",
            Self::UsageCapReached => "promo code usage limit reached",
            Self::BudgetCapReached => "promo code budget exhausted",
            Self::BelowThreshold => "transaction amount is below the promo minimum",
            Self::CorridorNotAllowed => "promo code is not valid for this corridor",
            Self::MethodNotAllowed => "promo code is not valid for this payment method",
            Self::PerUserCapReached => "per-user usage limit reached for this promo code",
            Self::AffiliateNotAllowed => "promo code is restricted to specific affiliates",
        }
    }
}

impl std::fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for PromoRejection {}

/// Accepted quote. `FeeWaiver` and `FxBoost` codes carry no currency
/// discount of their own; the waived fee belongs to the caller and the rate
/// boost is an uninterpreted delta for the FX layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromoQuote {
    pub discount_amount: Decimal,
    pub fee_waived: bool,
    pub rate_boost: Option<Decimal>,
}

/// Read-only eligibility evaluation. `prior_user_redemptions` is the
/// caller-resolved redemption count for (promo, user); it only matters when
/// the promo carries a finite per-user cap and the context names a user.
pub fn evaluate_promo(
    promo: &PromoCode,
    ctx: &TransactionContext,
    prior_user_redemptions: u64,
    now: DateTime<Utc>,
) -> Result<PromoQuote, PromoRejection> {
    if promo.status != PromoStatus::Active || !promo.in_window(now) {
        return Err(PromoRejection::ExpiredOrInactive);
    }
    if !promo.usage_limit_global.allows(promo.usage_count) {
        return Err(PromoRejection::UsageCapReached);
    }
    if !promo.budget_limit.has_headroom(promo.total_discount_utilized) {
        return Err(PromoRejection::BudgetCapReached);
    }
    if ctx.amount < promo.min_amount {
        return Err(PromoRejection::BelowThreshold);
    }
    if !promo
        .restrictions
        .allows_corridor(&ctx.source_currency, &ctx.dest_currency)
    {
        return Err(PromoRejection::CorridorNotAllowed);
    }
    if !promo.restrictions.allows_payment_method(&ctx.payment_method) {
        return Err(PromoRejection::MethodNotAllowed);
    }
    if ctx.user_id.is_some() && !promo.usage_limit_per_user.allows(prior_user_redemptions) {
        return Err(PromoRejection::PerUserCapReached);
    }
    if !promo
        .restrictions
        .allows_affiliate(ctx.affiliate_id.as_deref())
    {
        return Err(PromoRejection::AffiliateNotAllowed);
    }
    Ok(quote(promo, ctx.amount))
}

fn quote(promo: &PromoCode, amount: Decimal) -> PromoQuote {
    use paylane_model::DiscountKind;
    match promo.kind {
        DiscountKind::Fixed => PromoQuote {
            discount_amount: promo.value,
            fee_waived: false,
            rate_boost: None,
        },
        DiscountKind::Percentage => {
            let mut discount = amount * promo.value / Decimal::ONE_HUNDRED;
            if let Some(cap) = promo.max_discount {
                discount = discount.min(cap);
            }
            PromoQuote {
                discount_amount: discount,
                fee_waived: false,
                rate_boost: None,
            }
        }
        DiscountKind::FeeWaiver => PromoQuote {
            discount_amount: Decimal::ZERO,
            fee_waived: true,
            rate_boost: None,
        },
        DiscountKind::FxBoost => PromoQuote {
            discount_amount: Decimal::ZERO,
            fee_waived: false,
            rate_boost: Some(promo.value),
        },
        _ => unreachable!("unhandled DiscountKind variant"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use paylane_model::{
        BudgetLimit, Corridor, DiscountKind, PromoCodeId, RestrictionSet, SegmentRule, UsageLimit,
    };
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn promo(kind: DiscountKind, value: Decimal) -> PromoCode {
        PromoCode {
            id: 1,
            code: PromoCodeId::parse("SAVE20").unwrap(),
            kind,
            value,
            min_amount: dec!(100),
            max_discount: None,
            currency: Currency::parse("USD").unwrap(),
            usage_limit_global: UsageLimit::Unlimited,
            usage_limit_per_user: UsageLimit::Unlimited,
            usage_count: 0,
            total_discount_utilized: Decimal::ZERO,
            budget_limit: BudgetLimit::Unlimited,
            starts_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            status: PromoStatus::Active,
            restrictions: RestrictionSet::default(),
            segment: SegmentRule::All,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            last_campaign_at: None,
        }
    }

    fn ctx(amount: Decimal) -> TransactionContext {
        TransactionContext {
            amount,
            currency: Currency::parse("USD").unwrap(),
            source_currency: Currency::parse("USD").unwrap(),
            dest_currency: Currency::parse("PHP").unwrap(),
            payment_method: PaymentMethod::parse("card").unwrap(),
            user_id: Some("u1".to_string()),
            affiliate_id: None,
        }
    }

    #[test]
    fn save20_scenario_accepts_large_amount() {
        let quote =
            evaluate_promo(&promo(DiscountKind::Percentage, dec!(20)), &ctx(dec!(500)), 0, now())
                .expect("accepted");
        assert_eq!(quote.discount_amount, dec!(100));
        assert!(!quote.fee_waived);
        assert!(quote.rate_boost.is_none());
    }

    #[test]
    fn save20_scenario_rejects_below_threshold() {
        let err =
            evaluate_promo(&promo(DiscountKind::Percentage, dec!(20)), &ctx(dec!(50)), 0, now())
                .unwrap_err();
        assert_eq!(err, PromoRejection::BelowThreshold);
    }

    #[test]
    fn disabled_code_is_rejected_before_other_checks() {
        let mut p = promo(DiscountKind::Percentage, dec!(20));
        p.status = PromoStatus::Disabled;
        p.usage_count = 100;
        p.usage_limit_global = UsageLimit::Capped(1);
        let err = evaluate_promo(&p, &ctx(dec!(500)), 0, now()).unwrap_err();
        assert_eq!(err, PromoRejection::ExpiredOrInactive);
    }

    #[test]
    fn window_is_half_open_at_the_end() {
        let mut p = promo(DiscountKind::Fixed, dec!(5));
        p.ends_at = now();
        let err = evaluate_promo(&p, &ctx(dec!(500)), 0, now()).unwrap_err();
        assert_eq!(err, PromoRejection::ExpiredOrInactive);
        p.ends_at = now() + chrono::Duration::seconds(1);
        assert!(evaluate_promo(&p, &ctx(dec!(500)), 0, now()).is_ok());
    }

    #[test]
    fn exhausted_usage_cap_rejects() {
        let mut p = promo(DiscountKind::Fixed, dec!(5));
        p.usage_limit_global = UsageLimit::Capped(3);
        p.usage_count = 3;
        let err = evaluate_promo(&p, &ctx(dec!(500)), 0, now()).unwrap_err();
        assert_eq!(err, PromoRejection::UsageCapReached);
    }

    #[test]
    fn exhausted_budget_rejects() {
        let mut p = promo(DiscountKind::Fixed, dec!(5));
        p.budget_limit = BudgetLimit::Capped(dec!(100));
        p.total_discount_utilized = dec!(100);
        let err = evaluate_promo(&p, &ctx(dec!(500)), 0, now()).unwrap_err();
        assert_eq!(err, PromoRejection::BudgetCapReached);
    }

    #[test]
    fn corridor_restriction_applies() {
        let mut p = promo(DiscountKind::Fixed, dec!(5));
        p.restrictions.corridors = vec![Corridor::parse("GBP-INR").unwrap()];
        let err = evaluate_promo(&p, &ctx(dec!(500)), 0, now()).unwrap_err();
        assert_eq!(err, PromoRejection::CorridorNotAllowed);

        p.restrictions.corridors = vec![Corridor::parse("USD-PHP").unwrap()];
        assert!(evaluate_promo(&p, &ctx(dec!(500)), 0, now()).is_ok());
    }

    #[test]
    fn payment_method_restriction_applies() {
        let mut p = promo(DiscountKind::Fixed, dec!(5));
        p.restrictions.payment_methods = vec![PaymentMethod::parse("bank_transfer").unwrap()];
        let err = evaluate_promo(&p, &ctx(dec!(500)), 0, now()).unwrap_err();
        assert_eq!(err, PromoRejection::MethodNotAllowed);
    }

    #[test]
    fn per_user_cap_applies_only_when_user_is_known() {
        let mut p = promo(DiscountKind::Fixed, dec!(5));
        p.usage_limit_per_user = UsageLimit::Capped(1);
        let err = evaluate_promo(&p, &ctx(dec!(500)), 1, now()).unwrap_err();
        assert_eq!(err, PromoRejection::PerUserCapReached);

        let mut anonymous = ctx(dec!(500));
        anonymous.user_id = None;
        assert!(evaluate_promo(&p, &anonymous, 1, now()).is_ok());
    }

    #[test]
    fn affiliate_restriction_requires_membership() {
        let mut p = promo(DiscountKind::Fixed, dec!(5));
        p.restrictions.affiliates = vec!["acme".to_string()];
        let err = evaluate_promo(&p, &ctx(dec!(500)), 0, now()).unwrap_err();
        assert_eq!(err, PromoRejection::AffiliateNotAllowed);

        let mut with_affiliate = ctx(dec!(500));
        with_affiliate.affiliate_id = Some("acme".to_string());
        assert!(evaluate_promo(&p, &with_affiliate, 0, now()).is_ok());
    }

    #[test]
    fn percentage_discount_clamps_to_max_discount() {
        let mut p = promo(DiscountKind::Percentage, dec!(20));
        p.max_discount = Some(dec!(30));
        let quote = evaluate_promo(&p, &ctx(dec!(500)), 0, now()).expect("accepted");
        assert_eq!(quote.discount_amount, dec!(30));
    }

    #[test]
    fn fee_waiver_and_fx_boost_carry_no_discount() {
        let waiver = evaluate_promo(&promo(DiscountKind::FeeWaiver, dec!(1)), &ctx(dec!(500)), 0, now())
            .expect("accepted");
        assert_eq!(waiver.discount_amount, Decimal::ZERO);
        assert!(waiver.fee_waived);

        let boost =
            evaluate_promo(&promo(DiscountKind::FxBoost, dec!(0.015)), &ctx(dec!(500)), 0, now())
                .expect("accepted");
        assert_eq!(boost.discount_amount, Decimal::ZERO);
        assert_eq!(boost.rate_boost, Some(dec!(0.015)));
    }

    proptest! {
        #[test]
        fn clamped_percentage_never_exceeds_cap(amount in 100u64..10_000_000, cap in 1u64..10_000) {
            let mut p = promo(DiscountKind::Percentage, dec!(20));
            let cap = Decimal::from(cap);
            p.max_discount = Some(cap);
            let quote = evaluate_promo(&p, &ctx(Decimal::from(amount)), 0, now()).expect("accepted");
            prop_assert!(quote.discount_amount <= cap);
            prop_assert!(quote.discount_amount >= Decimal::ZERO);
        }
    }
}
