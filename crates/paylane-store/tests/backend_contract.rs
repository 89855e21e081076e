// SPDX-License-Identifier: Apache-2.0

//! Contract tests run against every backend: the SQLite store and the
//! in-memory fake must be indistinguishable to callers.

use chrono::{DateTime, TimeZone, Utc};
use paylane_model::{
    BonusKind, BudgetLimit, CommissionMode, Currency, DiscountKind, EligibilityRule, EntryType,
    NewBonusScheme, NewLedgerEntry, NewPromoCode, NewReferralRule, NewTransaction, PaymentMethod,
    PromoCodeId, PromoStatus, ReasonCode, RestrictionSet, RuleStatus, SchemeStatus, SegmentRule,
    UsageLimit,
};
use paylane_store::{
    CommitOutcome, DateRange, MemoryBackend, SqliteBackend, StoreBackend, StoreError,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn promo(code: &str, usage_limit: UsageLimit, budget: BudgetLimit) -> NewPromoCode {
    NewPromoCode {
        code: PromoCodeId::parse(code).unwrap(),
        kind: DiscountKind::Percentage,
        value: dec!(20),
        min_amount: dec!(100),
        max_discount: None,
        currency: Currency::parse("USD").unwrap(),
        usage_limit_global: usage_limit,
        usage_limit_per_user: UsageLimit::Unlimited,
        budget_limit: budget,
        starts_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ends_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        status: PromoStatus::Active,
        restrictions: RestrictionSet::default(),
        segment: SegmentRule::All,
    }
}

fn scheme(name: &str) -> NewBonusScheme {
    NewBonusScheme {
        name: name.to_string(),
        kind: BonusKind::TransactionThresholdCredit,
        credit_amount: dec!(25),
        currency: Currency::parse("USD").unwrap(),
        min_transaction_amount: dec!(0),
        loyalty: None,
        commission: CommissionMode::Fixed,
        tiers: None,
        eligibility: EligibilityRule::default(),
        starts_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ends_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        status: SchemeStatus::Active,
    }
}

fn earned(user: &str, amount: Decimal, reference: &str) -> NewLedgerEntry {
    NewLedgerEntry {
        user_id: user.to_string(),
        amount,
        entry_type: EntryType::Earned,
        scheme_id: None,
        reference_id: reference.to_string(),
        reason_code: Some(ReasonCode::Goodwill),
        notes: Some("test credit".to_string()),
        admin_user: None,
        expires_at: None,
    }
}

async fn backends() -> Vec<Box<dyn StoreBackend>> {
    vec![
        Box::new(MemoryBackend::new()),
        Box::new(SqliteBackend::open_in_memory().expect("open sqlite")),
    ]
}

#[tokio::test]
async fn promo_round_trip_and_case_insensitive_lookup() {
    for store in backends().await {
        let created = store
            .insert_promo(promo("Save20", UsageLimit::Unlimited, BudgetLimit::Unlimited), t0())
            .await
            .expect("insert");
        assert_eq!(created.code.as_str(), "SAVE20");
        assert_eq!(created.usage_count, 0);
        assert_eq!(created.total_discount_utilized, Decimal::ZERO);

        let found = store
            .find_promo_by_code(&PromoCodeId::parse("save20").unwrap())
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found, created, "backend {}", store.backend_tag());

        let listed = store.list_promos().await.expect("list");
        assert_eq!(listed.len(), 1);
    }
}

#[tokio::test]
async fn duplicate_promo_code_conflicts() {
    for store in backends().await {
        store
            .insert_promo(promo("TWICE", UsageLimit::Unlimited, BudgetLimit::Unlimited), t0())
            .await
            .expect("first insert");
        let err = store
            .insert_promo(promo("twice", UsageLimit::Unlimited, BudgetLimit::Unlimited), t0())
            .await
            .expect_err("duplicate");
        assert!(
            matches!(err, StoreError::Conflict(_)),
            "backend {}: {err}",
            store.backend_tag()
        );
    }
}

#[tokio::test]
async fn status_toggle_and_delete() {
    for store in backends().await {
        let created = store
            .insert_promo(promo("TOGGLE", UsageLimit::Unlimited, BudgetLimit::Unlimited), t0())
            .await
            .expect("insert");
        let disabled = store
            .set_promo_status(created.id, PromoStatus::Disabled)
            .await
            .expect("disable");
        assert_eq!(disabled.status, PromoStatus::Disabled);

        store.delete_promo(created.id).await.expect("delete");
        assert!(store.get_promo(created.id).await.expect("get").is_none());
        assert!(matches!(
            store.delete_promo(created.id).await,
            Err(StoreError::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn sequential_commits_advance_counters_exactly() {
    for store in backends().await {
        let created = store
            .insert_promo(promo("COUNT", UsageLimit::Unlimited, BudgetLimit::Unlimited), t0())
            .await
            .expect("insert");
        for i in 1..=5u64 {
            let outcome = store
                .commit_redemption(created.id, Some("u1"), dec!(10), t0())
                .await
                .expect("commit");
            let CommitOutcome::Committed(updated) = outcome else {
                panic!("commit {i} rejected on {}", store.backend_tag());
            };
            assert_eq!(updated.usage_count, i);
            assert_eq!(updated.total_discount_utilized, dec!(10) * Decimal::from(i));
        }
        assert_eq!(
            store.count_user_redemptions(created.id, "u1").await.unwrap(),
            5
        );
    }
}

#[tokio::test]
async fn usage_cap_rejects_commit_past_limit() {
    for store in backends().await {
        let created = store
            .insert_promo(promo("CAP2", UsageLimit::Capped(2), BudgetLimit::Unlimited), t0())
            .await
            .expect("insert");
        for _ in 0..2 {
            let outcome = store
                .commit_redemption(created.id, None, dec!(5), t0())
                .await
                .expect("commit");
            assert!(matches!(outcome, CommitOutcome::Committed(_)));
        }
        let outcome = store
            .commit_redemption(created.id, None, dec!(5), t0())
            .await
            .expect("commit call");
        assert!(
            matches!(outcome, CommitOutcome::UsageCapReached),
            "backend {}",
            store.backend_tag()
        );
        let promo = store.get_promo(created.id).await.unwrap().unwrap();
        assert_eq!(promo.usage_count, 2, "rejected commit must not count");
    }
}

#[tokio::test]
async fn budget_cap_rejects_overrunning_commit() {
    for store in backends().await {
        let created = store
            .insert_promo(
                promo("BUDGET", UsageLimit::Unlimited, BudgetLimit::Capped(dec!(100))),
                t0(),
            )
            .await
            .expect("insert");
        let outcome = store
            .commit_redemption(created.id, None, dec!(60), t0())
            .await
            .unwrap();
        assert!(matches!(outcome, CommitOutcome::Committed(_)));
        let outcome = store
            .commit_redemption(created.id, None, dec!(50), t0())
            .await
            .unwrap();
        assert!(
            matches!(outcome, CommitOutcome::BudgetCapReached),
            "backend {}",
            store.backend_tag()
        );
        let outcome = store
            .commit_redemption(created.id, None, dec!(40), t0())
            .await
            .unwrap();
        assert!(matches!(outcome, CommitOutcome::Committed(_)));
    }
}

#[tokio::test]
async fn redemption_range_query_is_half_open() {
    for store in backends().await {
        let created = store
            .insert_promo(promo("RANGE", UsageLimit::Unlimited, BudgetLimit::Unlimited), t0())
            .await
            .unwrap();
        let early = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap();
        store
            .commit_redemption(created.id, Some("u1"), dec!(5), early)
            .await
            .unwrap();
        store
            .commit_redemption(created.id, Some("u1"), dec!(7), late)
            .await
            .unwrap();
        let range = DateRange {
            start: Some(early),
            end: Some(late),
        };
        let rows = store.redemptions_for_user("u1", &range).await.unwrap();
        assert_eq!(rows.len(), 1, "backend {}", store.backend_tag());
        assert_eq!(rows[0].discount_amount, dec!(5));
    }
}

#[tokio::test]
async fn scheme_round_trip_and_update() {
    for store in backends().await {
        let created = store.insert_scheme(scheme("welcome"), t0()).await.unwrap();
        assert_eq!(created.name, "welcome");

        let mut replacement = scheme("welcome-v2");
        replacement.status = SchemeStatus::Inactive;
        let updated = store.update_scheme(created.id, replacement).await.unwrap();
        assert_eq!(updated.name, "welcome-v2");
        assert_eq!(updated.status, SchemeStatus::Inactive);
        assert_eq!(updated.created_at, created.created_at);

        store.delete_scheme(created.id).await.unwrap();
        assert!(store.get_scheme(created.id).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn ledger_is_append_only_and_queryable_by_reference() {
    for store in backends().await {
        store
            .append_ledger_entry(earned("u9", dec!(50), "txn-1"), t0())
            .await
            .unwrap();
        store
            .append_ledger_entry(earned("u9", dec!(-20), "manual:key-1"), t0())
            .await
            .unwrap();

        let entries = store.ledger_entries_for_user("u9").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, dec!(50));

        let found = store
            .find_ledger_entry_by_reference("u9", "manual:key-1")
            .await
            .unwrap()
            .expect("reference hit");
        assert_eq!(found.amount, dec!(-20));
        assert!(store
            .find_ledger_entry_by_reference("u9", "manual:other")
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn user_has_earned_tracks_scheme_references() {
    for store in backends().await {
        let created = store.insert_scheme(scheme("loyal"), t0()).await.unwrap();
        assert!(!store.user_has_earned("u1", created.id).await.unwrap());
        let mut entry = earned("u1", dec!(25), "txn-9");
        entry.scheme_id = Some(created.id);
        store.append_ledger_entry(entry, t0()).await.unwrap();
        assert!(store.user_has_earned("u1", created.id).await.unwrap());
        assert!(!store.user_has_earned("u2", created.id).await.unwrap());
    }
}

#[tokio::test]
async fn referral_rules_are_unique_per_base_currency() {
    for store in backends().await {
        let rule = NewReferralRule {
            base_currency: Currency::parse("GBP").unwrap(),
            reward_amount: dec!(10),
            referee_reward_amount: dec!(5),
            min_transaction_amount: dec!(100),
            status: RuleStatus::Active,
        };
        let created = store.insert_referral_rule(rule.clone(), t0()).await.unwrap();
        let err = store
            .insert_referral_rule(rule.clone(), t0())
            .await
            .expect_err("duplicate currency");
        assert!(matches!(err, StoreError::Conflict(_)));

        let second = NewReferralRule {
            base_currency: Currency::parse("EUR").unwrap(),
            ..rule.clone()
        };
        let second = store.insert_referral_rule(second, t0()).await.unwrap();

        // moving the second rule onto GBP must also conflict
        let clash = NewReferralRule {
            base_currency: Currency::parse("GBP").unwrap(),
            ..rule
        };
        let err = store
            .update_referral_rule(second.id, clash)
            .await
            .expect_err("update clash");
        assert!(
            matches!(err, StoreError::Conflict(_)),
            "backend {}",
            store.backend_tag()
        );
        store.delete_referral_rule(created.id).await.unwrap();
    }
}

#[tokio::test]
async fn transactions_round_trip() {
    for store in backends().await {
        let txn = NewTransaction {
            id: "txn-100".to_string(),
            user_id: "u1".to_string(),
            amount: dec!(500),
            currency: Currency::parse("USD").unwrap(),
            source_currency: Currency::parse("USD").unwrap(),
            dest_currency: Currency::parse("PHP").unwrap(),
            payment_method: PaymentMethod::parse("card").unwrap(),
        };
        store.insert_transaction(txn.clone(), t0()).await.unwrap();
        let fetched = store
            .get_transaction("txn-100")
            .await
            .unwrap()
            .expect("present");
        assert_eq!(fetched.amount, dec!(500));
        assert!(matches!(
            store.insert_transaction(txn, t0()).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(
            store.list_transactions_for_user("u1").await.unwrap().len(),
            1
        );
    }
}

#[tokio::test]
async fn sqlite_backend_persists_across_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("paylane.db");
    {
        let store = SqliteBackend::open(&path).expect("open");
        store
            .insert_promo(promo("DURABLE", UsageLimit::Unlimited, BudgetLimit::Unlimited), t0())
            .await
            .expect("insert");
    }
    let store = SqliteBackend::open(&path).expect("reopen");
    let found = store
        .find_promo_by_code(&PromoCodeId::parse("DURABLE").unwrap())
        .await
        .expect("find")
        .expect("present");
    assert_eq!(found.code.as_str(), "DURABLE");
}
