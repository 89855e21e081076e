// SPDX-License-Identifier: Apache-2.0

use crate::{CommitOutcome, DateRange, StoreBackend, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paylane_model::{
    BonusScheme, EntryType, LedgerEntry, NewBonusScheme, NewLedgerEntry, NewPromoCode,
    NewReferralRule, NewTransaction, PromoCode, PromoCodeId, PromoStatus, RedemptionRecord,
    ReferralRule, TransactionRecord,
};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    promos: Vec<PromoCode>,
    redemptions: Vec<RedemptionRecord>,
    schemes: Vec<BonusScheme>,
    ledger: Vec<LedgerEntry>,
    rules: Vec<ReferralRule>,
    transactions: Vec<TransactionRecord>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory store with the same semantics as the SQLite backend. Used by
/// unit and service tests so the evaluator and recorder never need a real
/// database.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn insert_promo(
        &self,
        promo: NewPromoCode,
        at: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.promos.iter().any(|p| p.code == promo.code) {
            return Err(StoreError::Conflict("duplicate promo code".to_string()));
        }
        let id = inner.next_id();
        let row = PromoCode {
            id,
            code: promo.code,
            kind: promo.kind,
            value: promo.value,
            min_amount: promo.min_amount,
            max_discount: promo.max_discount,
            currency: promo.currency,
            usage_limit_global: promo.usage_limit_global,
            usage_limit_per_user: promo.usage_limit_per_user,
            usage_count: 0,
            total_discount_utilized: Decimal::ZERO,
            budget_limit: promo.budget_limit,
            starts_at: promo.starts_at,
            ends_at: promo.ends_at,
            status: promo.status,
            restrictions: promo.restrictions,
            segment: promo.segment,
            created_at: at,
            last_campaign_at: None,
        };
        inner.promos.push(row.clone());
        Ok(row)
    }

    async fn list_promos(&self) -> Result<Vec<PromoCode>, StoreError> {
        let inner = self.inner.lock().await;
        let mut out = inner.promos.clone();
        out.sort_by_key(|p| std::cmp::Reverse(p.id));
        Ok(out)
    }

    async fn get_promo(&self, id: i64) -> Result<Option<PromoCode>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.promos.iter().find(|p| p.id == id).cloned())
    }

    async fn find_promo_by_code(
        &self,
        code: &PromoCodeId,
    ) -> Result<Option<PromoCode>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.promos.iter().find(|p| &p.code == code).cloned())
    }

    async fn set_promo_status(
        &self,
        id: i64,
        status: PromoStatus,
    ) -> Result<PromoCode, StoreError> {
        let mut inner = self.inner.lock().await;
        let promo = inner
            .promos
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("promo {id}")))?;
        promo.status = status;
        Ok(promo.clone())
    }

    async fn touch_promo_campaign(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError> {
        let mut inner = self.inner.lock().await;
        let promo = inner
            .promos
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("promo {id}")))?;
        promo.last_campaign_at = Some(at);
        Ok(promo.clone())
    }

    async fn delete_promo(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.promos.len();
        inner.promos.retain(|p| p.id != id);
        if inner.promos.len() == before {
            return Err(StoreError::NotFound(format!("promo {id}")));
        }
        inner.redemptions.retain(|r| r.promo_id != id);
        Ok(())
    }

    async fn commit_redemption(
        &self,
        promo_id: i64,
        user_id: Option<&str>,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<CommitOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let promo = inner
            .promos
            .iter_mut()
            .find(|p| p.id == promo_id)
            .ok_or_else(|| StoreError::NotFound(format!("promo {promo_id}")))?;
        if !promo.usage_limit_global.allows(promo.usage_count) {
            return Ok(CommitOutcome::UsageCapReached);
        }
        if !promo.budget_limit.admits(promo.total_discount_utilized, amount) {
            return Ok(CommitOutcome::BudgetCapReached);
        }
        promo.usage_count += 1;
        promo.total_discount_utilized += amount;
        let updated = promo.clone();
        inner.redemptions.push(RedemptionRecord {
            id,
            promo_id,
            code: updated.code.clone(),
            user_id: user_id.map(str::to_string),
            discount_amount: amount,
            created_at: at,
        });
        Ok(CommitOutcome::Committed(updated))
    }

    async fn count_user_redemptions(
        &self,
        promo_id: i64,
        user_id: &str,
    ) -> Result<u64, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .redemptions
            .iter()
            .filter(|r| r.promo_id == promo_id && r.user_id.as_deref() == Some(user_id))
            .count() as u64)
    }

    async fn redemptions_for_user(
        &self,
        user_id: &str,
        range: &DateRange,
    ) -> Result<Vec<RedemptionRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .redemptions
            .iter()
            .filter(|r| r.user_id.as_deref() == Some(user_id) && range.contains(r.created_at))
            .cloned()
            .collect())
    }

    async fn insert_scheme(
        &self,
        scheme: NewBonusScheme,
        at: DateTime<Utc>,
    ) -> Result<BonusScheme, StoreError> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let row = BonusScheme {
            id,
            name: scheme.name,
            kind: scheme.kind,
            credit_amount: scheme.credit_amount,
            currency: scheme.currency,
            min_transaction_amount: scheme.min_transaction_amount,
            loyalty: scheme.loyalty,
            commission: scheme.commission,
            tiers: scheme.tiers,
            eligibility: scheme.eligibility,
            starts_at: scheme.starts_at,
            ends_at: scheme.ends_at,
            status: scheme.status,
            created_at: at,
        };
        inner.schemes.push(row.clone());
        Ok(row)
    }

    async fn list_schemes(&self) -> Result<Vec<BonusScheme>, StoreError> {
        let inner = self.inner.lock().await;
        let mut out = inner.schemes.clone();
        out.sort_by_key(|s| std::cmp::Reverse(s.id));
        Ok(out)
    }

    async fn get_scheme(&self, id: i64) -> Result<Option<BonusScheme>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.schemes.iter().find(|s| s.id == id).cloned())
    }

    async fn update_scheme(
        &self,
        id: i64,
        scheme: NewBonusScheme,
    ) -> Result<BonusScheme, StoreError> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .schemes
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("scheme {id}")))?;
        row.name = scheme.name;
        row.kind = scheme.kind;
        row.credit_amount = scheme.credit_amount;
        row.currency = scheme.currency;
        row.min_transaction_amount = scheme.min_transaction_amount;
        row.loyalty = scheme.loyalty;
        row.commission = scheme.commission;
        row.tiers = scheme.tiers;
        row.eligibility = scheme.eligibility;
        row.starts_at = scheme.starts_at;
        row.ends_at = scheme.ends_at;
        row.status = scheme.status;
        Ok(row.clone())
    }

    async fn delete_scheme(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.schemes.len();
        inner.schemes.retain(|s| s.id != id);
        if inner.schemes.len() == before {
            return Err(StoreError::NotFound(format!("scheme {id}")));
        }
        Ok(())
    }

    async fn append_ledger_entry(
        &self,
        entry: NewLedgerEntry,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, StoreError> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let row = LedgerEntry {
            id,
            user_id: entry.user_id,
            amount: entry.amount,
            entry_type: entry.entry_type,
            scheme_id: entry.scheme_id,
            reference_id: entry.reference_id,
            reason_code: entry.reason_code,
            notes: entry.notes,
            admin_user: entry.admin_user,
            expires_at: entry.expires_at,
            created_at: at,
        };
        inner.ledger.push(row.clone());
        Ok(row)
    }

    async fn ledger_entries_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .ledger
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_ledger_entry_by_reference(
        &self,
        user_id: &str,
        reference_id: &str,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .ledger
            .iter()
            .find(|e| e.user_id == user_id && e.reference_id == reference_id)
            .cloned())
    }

    async fn user_has_earned(&self, user_id: &str, scheme_id: i64) -> Result<bool, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.ledger.iter().any(|e| {
            e.user_id == user_id
                && e.scheme_id == Some(scheme_id)
                && e.entry_type == EntryType::Earned
        }))
    }

    async fn insert_referral_rule(
        &self,
        rule: NewReferralRule,
        at: DateTime<Utc>,
    ) -> Result<ReferralRule, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner
            .rules
            .iter()
            .any(|r| r.base_currency == rule.base_currency)
        {
            return Err(StoreError::Conflict("duplicate base currency".to_string()));
        }
        let id = inner.next_id();
        let row = ReferralRule {
            id,
            base_currency: rule.base_currency,
            reward_amount: rule.reward_amount,
            referee_reward_amount: rule.referee_reward_amount,
            min_transaction_amount: rule.min_transaction_amount,
            status: rule.status,
            created_at: at,
        };
        inner.rules.push(row.clone());
        Ok(row)
    }

    async fn list_referral_rules(&self) -> Result<Vec<ReferralRule>, StoreError> {
        let inner = self.inner.lock().await;
        let mut out = inner.rules.clone();
        out.sort_by_key(|r| std::cmp::Reverse(r.id));
        Ok(out)
    }

    async fn get_referral_rule(&self, id: i64) -> Result<Option<ReferralRule>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.rules.iter().find(|r| r.id == id).cloned())
    }

    async fn update_referral_rule(
        &self,
        id: i64,
        rule: NewReferralRule,
    ) -> Result<ReferralRule, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner
            .rules
            .iter()
            .any(|r| r.id != id && r.base_currency == rule.base_currency)
        {
            return Err(StoreError::Conflict("duplicate base currency".to_string()));
        }
        let row = inner
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("referral rule {id}")))?;
        row.base_currency = rule.base_currency;
        row.reward_amount = rule.reward_amount;
        row.referee_reward_amount = rule.referee_reward_amount;
        row.min_transaction_amount = rule.min_transaction_amount;
        row.status = rule.status;
        Ok(row.clone())
    }

    async fn delete_referral_rule(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.rules.len();
        inner.rules.retain(|r| r.id != id);
        if inner.rules.len() == before {
            return Err(StoreError::NotFound(format!("referral rule {id}")));
        }
        Ok(())
    }

    async fn insert_transaction(
        &self,
        txn: NewTransaction,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.transactions.iter().any(|t| t.id == txn.id) {
            return Err(StoreError::Conflict("duplicate transaction id".to_string()));
        }
        let row = TransactionRecord {
            id: txn.id,
            user_id: txn.user_id,
            amount: txn.amount,
            currency: txn.currency,
            source_currency: txn.source_currency,
            dest_currency: txn.dest_currency,
            payment_method: txn.payment_method,
            created_at: at,
        };
        inner.transactions.push(row.clone());
        Ok(row)
    }

    async fn get_transaction(&self, id: &str) -> Result<Option<TransactionRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn list_transactions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }
}
