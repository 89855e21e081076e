// SPDX-License-Identifier: Apache-2.0

use crate::bonus::{compute_bonus_amount, BonusRejection, CREDIT_EXPIRY_DAYS};
use crate::promo::{evaluate_promo, PromoQuote, PromoRejection, TransactionContext};
use chrono::{DateTime, Duration, Utc};
use paylane_core::ports::Clock;
use paylane_core::ValidationError;
use paylane_model::ledger::balance_of;
use paylane_model::{
    Currency, EntryType, LedgerEntry, NewLedgerEntry, PromoCode, PromoCodeId, ReasonCode,
    SchemeStatus, UsageLimit,
};
use paylane_store::{CommitOutcome, LedgerFilter, StoreBackend, StoreError};
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Debug)]
#[non_exhaustive]
pub enum PromoError {
    Rejected(PromoRejection),
    Store(StoreError),
}

impl std::fmt::Display for PromoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(r) => write!(f, "{r}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PromoError {}

impl From<StoreError> for PromoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPromo {
    pub promo: PromoCode,
    pub quote: PromoQuote,
}

/// Promo registry front: evaluation quotes a discount, application commits
/// it. The two stay separate steps, but the commit re-validates both caps
/// inside the store's atomic unit, so a stale quote can reject but never
/// overrun a cap.
pub struct PromoService {
    store: Arc<dyn StoreBackend>,
    clock: Arc<dyn Clock>,
}

impl PromoService {
    pub fn new(store: Arc<dyn StoreBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Read-only validation: resolves the code, resolves the per-user
    /// redemption count when it matters, and quotes the discount.
    pub async fn validate(
        &self,
        raw_code: &str,
        ctx: &TransactionContext,
    ) -> Result<ValidatedPromo, PromoError> {
        let code = PromoCodeId::parse(raw_code)
            .map_err(|_| PromoError::Rejected(PromoRejection::NotFound))?;
        let promo = self
            .store
            .find_promo_by_code(&code)
            .await?
            .ok_or(PromoError::Rejected(PromoRejection::NotFound))?;
        let prior = match (&ctx.user_id, promo.usage_limit_per_user) {
            (Some(user), UsageLimit::Capped(_)) => {
                self.store.count_user_redemptions(promo.id, user).await?
            }
            _ => 0,
        };
        let quote = evaluate_promo(&promo, ctx, prior, self.clock.now())
            .map_err(PromoError::Rejected)?;
        Ok(ValidatedPromo { promo, quote })
    }

    /// Commit step: bumps the usage counter and cumulative discount, and
    /// appends the redemption record.
    pub async fn apply(
        &self,
        raw_code: &str,
        discount_amount: Decimal,
        user_id: Option<&str>,
    ) -> Result<PromoCode, PromoError> {
        let code = PromoCodeId::parse(raw_code)
            .map_err(|_| PromoError::Rejected(PromoRejection::NotFound))?;
        let promo = self
            .store
            .find_promo_by_code(&code)
            .await?
            .ok_or(PromoError::Rejected(PromoRejection::NotFound))?;
        match self
            .store
            .commit_redemption(promo.id, user_id, discount_amount, self.clock.now())
            .await?
        {
            CommitOutcome::Committed(updated) => Ok(updated),
            CommitOutcome::UsageCapReached => {
                Err(PromoError::Rejected(PromoRejection::UsageCapReached))
            }
            CommitOutcome::BudgetCapReached => {
                Err(PromoError::Rejected(PromoRejection::BudgetCapReached))
            }
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum CreditError {
    Rejected(BonusRejection),
    Invalid(ValidationError),
    Store(StoreError),
}

impl std::fmt::Display for CreditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(r) => write!(f, "{r}"),
            Self::Invalid(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CreditError {}

impl From<StoreError> for CreditError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AwardedCredit {
    pub entry: LedgerEntry,
    pub amount: Decimal,
    pub currency: Currency,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManualAdjustment {
    pub user_id: String,
    pub amount: Decimal,
    pub entry_type: EntryType,
    pub reason_code: ReasonCode,
    pub notes: String,
    pub scheme_id: Option<i64>,
    pub admin_user: Option<String>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentOutcome {
    pub entry: LedgerEntry,
    pub idempotent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreditStatement {
    pub balance: Decimal,
    pub cost_incurred: Decimal,
    pub history: Vec<LedgerEntry>,
}

/// Credit ledger front: scheme awards, audited manual adjustments, and the
/// balance/history read model.
pub struct CreditService {
    store: Arc<dyn StoreBackend>,
    clock: Arc<dyn Clock>,
}

impl CreditService {
    pub fn new(store: Arc<dyn StoreBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn award_bonus(
        &self,
        user_id: &str,
        scheme_id: i64,
        transaction_id: Option<&str>,
        admin_user: Option<&str>,
    ) -> Result<AwardedCredit, CreditError> {
        if user_id.trim().is_empty() {
            return Err(CreditError::Invalid(ValidationError(
                "user_id must not be empty".to_string(),
            )));
        }
        let scheme = self
            .store
            .get_scheme(scheme_id)
            .await?
            .ok_or(CreditError::Rejected(BonusRejection::SchemeNotFound))?;
        let now = self.clock.now();
        if now > scheme.ends_at {
            return Err(CreditError::Rejected(BonusRejection::SchemeExpired));
        }
        if scheme.status != SchemeStatus::Active {
            return Err(CreditError::Rejected(BonusRejection::SchemeInactive));
        }
        if scheme.eligibility.one_time_only
            && self.store.user_has_earned(user_id, scheme_id).await?
        {
            return Err(CreditError::Rejected(BonusRejection::AlreadyEarned));
        }
        let txn = match transaction_id {
            Some(id) => Some(
                self.store
                    .get_transaction(id)
                    .await?
                    .ok_or(CreditError::Rejected(BonusRejection::TransactionNotFound))?,
            ),
            None => None,
        };
        let amount = compute_bonus_amount(&scheme, txn.as_ref().map(|t| t.amount))
            .map_err(CreditError::Rejected)?;
        let expires_at = now + Duration::days(CREDIT_EXPIRY_DAYS);
        let reference_id = transaction_id
            .map(str::to_string)
            .unwrap_or_else(|| format!("scheme:{scheme_id}"));
        let entry = self
            .store
            .append_ledger_entry(
                NewLedgerEntry {
                    user_id: user_id.to_string(),
                    amount,
                    entry_type: EntryType::Earned,
                    scheme_id: Some(scheme_id),
                    reference_id,
                    reason_code: None,
                    notes: None,
                    admin_user: admin_user.map(str::to_string),
                    expires_at: Some(expires_at),
                },
                now,
            )
            .await?;
        Ok(AwardedCredit {
            entry,
            amount,
            currency: scheme.currency,
            expires_at,
        })
    }

    /// Audited manual balance change. Notes are mandatory: silently
    /// undocumented adjustments are rejected, not normalized.
    pub async fn manual_adjust(
        &self,
        req: ManualAdjustment,
    ) -> Result<AdjustmentOutcome, CreditError> {
        if !matches!(req.entry_type, EntryType::Earned | EntryType::Voided) {
            return Err(CreditError::Invalid(ValidationError(
                "manual adjustments must be Earned or Voided".to_string(),
            )));
        }
        if req.notes.trim().is_empty() {
            return Err(CreditError::Invalid(ValidationError(
                "notes are required for manual adjustments".to_string(),
            )));
        }
        if req.user_id.trim().is_empty() {
            return Err(CreditError::Invalid(ValidationError(
                "user_id must not be empty".to_string(),
            )));
        }
        if req.amount == Decimal::ZERO {
            return Err(CreditError::Invalid(ValidationError(
                "amount must not be zero".to_string(),
            )));
        }
        let now = self.clock.now();
        let reference_id = match req.idempotency_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                let tag = format!("manual:{key}");
                if let Some(existing) = self
                    .store
                    .find_ledger_entry_by_reference(&req.user_id, &tag)
                    .await?
                {
                    return Ok(AdjustmentOutcome {
                        entry: existing,
                        idempotent: true,
                    });
                }
                tag
            }
            _ => format!("manual:{}", now.timestamp_millis()),
        };
        let entry = self
            .store
            .append_ledger_entry(
                NewLedgerEntry {
                    user_id: req.user_id,
                    amount: req.amount,
                    entry_type: req.entry_type,
                    scheme_id: req.scheme_id,
                    reference_id,
                    reason_code: Some(req.reason_code),
                    notes: Some(req.notes),
                    admin_user: req.admin_user,
                    expires_at: None,
                },
                now,
            )
            .await?;
        Ok(AdjustmentOutcome {
            entry,
            idempotent: false,
        })
    }

    /// Balance, filtered history, and cost incurred. The balance covers
    /// every entry regardless of filters; the cost aggregate combines
    /// Earned ledger amounts and promo redemption discounts in range.
    pub async fn statement(
        &self,
        user_id: &str,
        filter: &LedgerFilter,
    ) -> Result<CreditStatement, CreditError> {
        let entries = self.store.ledger_entries_for_user(user_id).await?;
        let balance = balance_of(&entries);
        let earned_in_range: Decimal = entries
            .iter()
            .filter(|e| e.entry_type == EntryType::Earned && filter.range.contains(e.created_at))
            .map(|e| e.amount)
            .sum();
        let redemptions = self
            .store
            .redemptions_for_user(user_id, &filter.range)
            .await?;
        let promo_cost: Decimal = redemptions.iter().map(|r| r.discount_amount).sum();
        let mut history: Vec<LedgerEntry> =
            entries.into_iter().filter(|e| filter.matches(e)).collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(CreditStatement {
            balance,
            cost_incurred: earned_in_range + promo_cost,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use paylane_core::ports::FixedClock;
    use paylane_model::{
        BonusKind, BudgetLimit, CommissionMode, Currency, DiscountKind, EligibilityRule,
        NewBonusScheme, NewPromoCode, NewTransaction, PaymentMethod, PromoStatus, RestrictionSet,
        SegmentRule, Tier, TierTable,
    };
    use paylane_store::MemoryBackend;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn services() -> (Arc<MemoryBackend>, PromoService, CreditService) {
        let store = Arc::new(MemoryBackend::new());
        let clock = Arc::new(FixedClock(now()));
        let promo = PromoService::new(store.clone(), clock.clone());
        let credit = CreditService::new(store.clone(), clock);
        (store, promo, credit)
    }

    fn save20(usage_limit: UsageLimit) -> NewPromoCode {
        NewPromoCode {
            code: PromoCodeId::parse("SAVE20").unwrap(),
            kind: DiscountKind::Percentage,
            value: dec!(20),
            min_amount: dec!(100),
            max_discount: None,
            currency: Currency::parse("USD").unwrap(),
            usage_limit_global: usage_limit,
            usage_limit_per_user: UsageLimit::Unlimited,
            budget_limit: BudgetLimit::Unlimited,
            starts_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            status: PromoStatus::Active,
            restrictions: RestrictionSet::default(),
            segment: SegmentRule::All,
        }
    }

    fn usd_ctx(amount: Decimal) -> TransactionContext {
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

    fn one_time_scheme(tiers: Option<TierTable>) -> NewBonusScheme {
        NewBonusScheme {
            name: "threshold".to_string(),
            kind: BonusKind::TransactionThresholdCredit,
            credit_amount: dec!(25),
            currency: Currency::parse("USD").unwrap(),
            min_transaction_amount: Decimal::ZERO,
            loyalty: None,
            commission: CommissionMode::Fixed,
            tiers,
            eligibility: EligibilityRule::default(),
            starts_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            status: paylane_model::SchemeStatus::Active,
        }
    }

    fn record_txn(amount: Decimal, id: &str) -> NewTransaction {
        NewTransaction {
            id: id.to_string(),
            user_id: "u1".to_string(),
            amount,
            currency: Currency::parse("USD").unwrap(),
            source_currency: Currency::parse("USD").unwrap(),
            dest_currency: Currency::parse("PHP").unwrap(),
            payment_method: PaymentMethod::parse("card").unwrap(),
        }
    }

    #[tokio::test]
    async fn repeated_validate_and_apply_track_counters_exactly() {
        let (store, promo, _) = services();
        store.insert_promo(save20(UsageLimit::Unlimited), now()).await.unwrap();

        let mut total = Decimal::ZERO;
        for i in 1..=4u64 {
            let validated = promo.validate("save20", &usd_ctx(dec!(500))).await.unwrap();
            assert_eq!(validated.quote.discount_amount, dec!(100));
            let updated = promo
                .apply("SAVE20", validated.quote.discount_amount, Some("u1"))
                .await
                .unwrap();
            total += dec!(100);
            assert_eq!(updated.usage_count, i);
            assert_eq!(updated.total_discount_utilized, total);
        }
    }

    #[tokio::test]
    async fn usage_cap_rejects_extra_apply() {
        let (store, promo, _) = services();
        store
            .insert_promo(save20(UsageLimit::Capped(2)), now())
            .await
            .unwrap();
        for _ in 0..2 {
            promo.apply("SAVE20", dec!(10), None).await.unwrap();
        }
        let err = promo.apply("SAVE20", dec!(10), None).await.unwrap_err();
        assert!(matches!(
            err,
            PromoError::Rejected(PromoRejection::UsageCapReached)
        ));
    }

    #[tokio::test]
    async fn unknown_code_is_not_found_for_validate_and_apply() {
        let (_, promo, _) = services();
        let err = promo.validate("NOPE", &usd_ctx(dec!(500))).await.unwrap_err();
        assert!(matches!(err, PromoError::Rejected(PromoRejection::NotFound)));
        let err = promo.apply("NOPE", dec!(5), None).await.unwrap_err();
        assert!(matches!(err, PromoError::Rejected(PromoRejection::NotFound)));
    }

    #[tokio::test]
    async fn per_user_cap_counts_only_that_users_redemptions() {
        let (store, promo, _) = services();
        let mut def = save20(UsageLimit::Unlimited);
        def.usage_limit_per_user = UsageLimit::Capped(1);
        store.insert_promo(def, now()).await.unwrap();

        promo.apply("SAVE20", dec!(10), Some("u1")).await.unwrap();
        let err = promo.validate("SAVE20", &usd_ctx(dec!(500))).await.unwrap_err();
        assert!(matches!(
            err,
            PromoError::Rejected(PromoRejection::PerUserCapReached)
        ));

        let mut other = usd_ctx(dec!(500));
        other.user_id = Some("u2".to_string());
        assert!(promo.validate("SAVE20", &other).await.is_ok());
    }

    #[tokio::test]
    async fn award_fixed_scheme_appends_earned_entry_with_ninety_day_expiry() {
        let (store, _, credit) = services();
        let scheme = store.insert_scheme(one_time_scheme(None), now()).await.unwrap();

        let awarded = credit
            .award_bonus("u1", scheme.id, None, Some("admin@paylane"))
            .await
            .unwrap();
        assert_eq!(awarded.amount, dec!(25));
        assert_eq!(awarded.expires_at, now() + Duration::days(90));
        assert_eq!(awarded.entry.entry_type, EntryType::Earned);
        assert_eq!(awarded.entry.scheme_id, Some(scheme.id));
        assert_eq!(awarded.entry.reference_id, format!("scheme:{}", scheme.id));
    }

    #[tokio::test]
    async fn one_time_scheme_rejects_second_award_regardless_of_transaction() {
        let (store, _, credit) = services();
        let scheme = store.insert_scheme(one_time_scheme(None), now()).await.unwrap();
        store.insert_transaction(record_txn(dec!(900), "txn-1"), now()).await.unwrap();
        store.insert_transaction(record_txn(dec!(800), "txn-2"), now()).await.unwrap();

        credit
            .award_bonus("u1", scheme.id, Some("txn-1"), None)
            .await
            .unwrap();
        let err = credit
            .award_bonus("u1", scheme.id, Some("txn-2"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CreditError::Rejected(BonusRejection::AlreadyEarned)
        ));
    }

    #[tokio::test]
    async fn tiered_award_resolves_bands_and_hard_fails_gaps() {
        let (store, _, credit) = services();
        let tiers = TierTable::parse(vec![
            Tier { min: dec!(0), max: Some(dec!(1000)), value: dec!(50) },
            Tier { min: dec!(1001), max: Some(dec!(5000)), value: dec!(100) },
            Tier { min: dec!(5001), max: None, value: dec!(200) },
        ])
        .unwrap();
        let mut def = one_time_scheme(Some(tiers));
        def.eligibility.one_time_only = false;
        let scheme = store.insert_scheme(def, now()).await.unwrap();
        store.insert_transaction(record_txn(dec!(500000), "txn-big"), now()).await.unwrap();
        store.insert_transaction(record_txn(dec!(500), "txn-small"), now()).await.unwrap();
        store.insert_transaction(record_txn(dec!(1000.5), "txn-gap"), now()).await.unwrap();

        let awarded = credit.award_bonus("u1", scheme.id, Some("txn-big"), None).await.unwrap();
        assert_eq!(awarded.amount, dec!(200));
        let awarded = credit.award_bonus("u1", scheme.id, Some("txn-small"), None).await.unwrap();
        assert_eq!(awarded.amount, dec!(50));

        let err = credit
            .award_bonus("u1", scheme.id, Some("txn-gap"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CreditError::Rejected(BonusRejection::TierMismatch)
        ));
    }

    #[tokio::test]
    async fn tiered_award_without_transaction_is_rejected() {
        let (store, _, credit) = services();
        let tiers = TierTable::parse(vec![Tier {
            min: dec!(0),
            max: None,
            value: dec!(10),
        }])
        .unwrap();
        let scheme = store
            .insert_scheme(one_time_scheme(Some(tiers)), now())
            .await
            .unwrap();
        let err = credit.award_bonus("u1", scheme.id, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            CreditError::Rejected(BonusRejection::TransactionRequired)
        ));
    }

    #[tokio::test]
    async fn expired_and_inactive_schemes_reject_in_that_order() {
        let (store, _, credit) = services();
        let mut def = one_time_scheme(None);
        def.ends_at = now() - Duration::days(1);
        def.status = paylane_model::SchemeStatus::Inactive;
        let scheme = store.insert_scheme(def, now()).await.unwrap();
        let err = credit.award_bonus("u1", scheme.id, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            CreditError::Rejected(BonusRejection::SchemeExpired)
        ));

        let mut def = one_time_scheme(None);
        def.status = paylane_model::SchemeStatus::Inactive;
        let scheme = store.insert_scheme(def, now()).await.unwrap();
        let err = credit.award_bonus("u1", scheme.id, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            CreditError::Rejected(BonusRejection::SchemeInactive)
        ));
    }

    #[tokio::test]
    async fn manual_adjustment_requires_notes_for_every_type_and_reason() {
        let (_, _, credit) = services();
        for entry_type in [EntryType::Earned, EntryType::Voided] {
            for reason in [
                ReasonCode::Goodwill,
                ReasonCode::Correction,
                ReasonCode::ManualAdjustment,
            ] {
                let err = credit
                    .manual_adjust(ManualAdjustment {
                        user_id: "u1".to_string(),
                        amount: dec!(10),
                        entry_type,
                        reason_code: reason,
                        notes: "   ".to_string(),
                        scheme_id: None,
                        admin_user: None,
                        idempotency_key: None,
                    })
                    .await
                    .unwrap_err();
                assert!(matches!(err, CreditError::Invalid(_)));
            }
        }
    }

    #[tokio::test]
    async fn manual_adjustment_rejects_non_manual_entry_types() {
        let (_, _, credit) = services();
        for entry_type in [EntryType::Applied, EntryType::Expired] {
            let err = credit
                .manual_adjust(ManualAdjustment {
                    user_id: "u1".to_string(),
                    amount: dec!(10),
                    entry_type,
                    reason_code: ReasonCode::Correction,
                    notes: "documented".to_string(),
                    scheme_id: None,
                    admin_user: None,
                    idempotency_key: None,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, CreditError::Invalid(_)));
        }
    }

    #[tokio::test]
    async fn idempotency_key_replays_return_the_original_entry() {
        let (store, _, credit) = services();
        let req = ManualAdjustment {
            user_id: "u1".to_string(),
            amount: dec!(15),
            entry_type: EntryType::Earned,
            reason_code: ReasonCode::Goodwill,
            notes: "service outage apology".to_string(),
            scheme_id: None,
            admin_user: Some("admin@paylane".to_string()),
            idempotency_key: Some("retry-42".to_string()),
        };
        let first = credit.manual_adjust(req.clone()).await.unwrap();
        assert!(!first.idempotent);
        let second = credit.manual_adjust(req).await.unwrap();
        assert!(second.idempotent);
        assert_eq!(second.entry.id, first.entry.id);
        assert_eq!(store.ledger_entries_for_user("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn statement_balance_ignores_filters_and_cost_spans_both_models() {
        let (store, promo, credit) = services();
        store.insert_promo(save20(UsageLimit::Unlimited), now()).await.unwrap();

        credit
            .manual_adjust(ManualAdjustment {
                user_id: "u1".to_string(),
                amount: dec!(50),
                entry_type: EntryType::Earned,
                reason_code: ReasonCode::Goodwill,
                notes: "welcome".to_string(),
                scheme_id: None,
                admin_user: None,
                idempotency_key: Some("a".to_string()),
            })
            .await
            .unwrap();
        credit
            .manual_adjust(ManualAdjustment {
                user_id: "u1".to_string(),
                amount: dec!(-20),
                entry_type: EntryType::Voided,
                reason_code: ReasonCode::Correction,
                notes: "clawback".to_string(),
                scheme_id: None,
                admin_user: None,
                idempotency_key: Some("b".to_string()),
            })
            .await
            .unwrap();
        credit
            .manual_adjust(ManualAdjustment {
                user_id: "u1".to_string(),
                amount: dec!(5.30),
                entry_type: EntryType::Earned,
                reason_code: ReasonCode::Goodwill,
                notes: "gesture".to_string(),
                scheme_id: None,
                admin_user: None,
                idempotency_key: Some("c".to_string()),
            })
            .await
            .unwrap();
        promo.apply("SAVE20", dec!(12.50), Some("u1")).await.unwrap();

        let unfiltered = credit.statement("u1", &LedgerFilter::default()).await.unwrap();
        assert_eq!(unfiltered.balance, dec!(35.30));
        assert_eq!(unfiltered.cost_incurred, dec!(55.30) + dec!(12.50));
        assert_eq!(unfiltered.history.len(), 3);

        // a narrow filter reshapes history and cost, never the balance
        let filter = LedgerFilter {
            entry_type: Some(EntryType::Voided),
            range: paylane_store::DateRange {
                start: Some(now() + Duration::days(1)),
                end: None,
            },
            ..LedgerFilter::default()
        };
        let filtered = credit.statement("u1", &filter).await.unwrap();
        assert_eq!(filtered.balance, dec!(35.30));
        assert_eq!(filtered.cost_incurred, Decimal::ZERO);
        assert!(filtered.history.is_empty());
    }
}
