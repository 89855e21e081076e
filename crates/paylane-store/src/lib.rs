// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paylane_model::{
    BonusScheme, EntryType, LedgerEntry, NewBonusScheme, NewLedgerEntry, NewPromoCode,
    NewReferralRule, NewTransaction, PromoCode, PromoCodeId, PromoStatus, RedemptionRecord,
    ReferralRule, TransactionRecord,
};
use rust_decimal::Decimal;

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

pub const CRATE_NAME: &str = "paylane-store";

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    NotFound(String),
    Conflict(String),
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::Backend(msg) => write!(f, "backend failure: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Backend(value.to_string())
    }
}

/// Half-open `[start, end)` timestamp range; either bound may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| s <= at) && self.end.is_none_or(|e| at < e)
    }
}

/// History filter for ledger queries. Filters shape the returned history
/// only; balances are always computed over every entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    pub range: DateRange,
    pub entry_type: Option<EntryType>,
    pub scheme_id: Option<i64>,
}

impl LedgerFilter {
    #[must_use]
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.range.contains(entry.created_at)
            && self.entry_type.is_none_or(|t| entry.entry_type == t)
            && self.scheme_id.is_none_or(|s| entry.scheme_id == Some(s))
    }
}

/// Result of an atomic redemption commit. Cap re-validation and the counter
/// increments happen in one unit; a cap overrun is an outcome, not a state
/// the registry can reach.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed(PromoCode),
    UsageCapReached,
    BudgetCapReached,
}

/// Storage port for the registries, the redemption log, and the credit
/// ledger. Backends return rows in insertion order unless noted.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    // --- promo registry ---

    async fn insert_promo(
        &self,
        promo: NewPromoCode,
        at: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError>;
    /// Newest first.
    async fn list_promos(&self) -> Result<Vec<PromoCode>, StoreError>;
    async fn get_promo(&self, id: i64) -> Result<Option<PromoCode>, StoreError>;
    async fn find_promo_by_code(
        &self,
        code: &PromoCodeId,
    ) -> Result<Option<PromoCode>, StoreError>;
    async fn set_promo_status(
        &self,
        id: i64,
        status: PromoStatus,
    ) -> Result<PromoCode, StoreError>;
    async fn touch_promo_campaign(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError>;
    async fn delete_promo(&self, id: i64) -> Result<(), StoreError>;

    /// Atomically re-validates both caps, bumps `usage_count` and
    /// `total_discount_utilized`, and appends the redemption record.
    async fn commit_redemption(
        &self,
        promo_id: i64,
        user_id: Option<&str>,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<CommitOutcome, StoreError>;
    async fn count_user_redemptions(
        &self,
        promo_id: i64,
        user_id: &str,
    ) -> Result<u64, StoreError>;
    async fn redemptions_for_user(
        &self,
        user_id: &str,
        range: &DateRange,
    ) -> Result<Vec<RedemptionRecord>, StoreError>;

    // --- bonus scheme registry ---

    async fn insert_scheme(
        &self,
        scheme: NewBonusScheme,
        at: DateTime<Utc>,
    ) -> Result<BonusScheme, StoreError>;
    /// Newest first.
    async fn list_schemes(&self) -> Result<Vec<BonusScheme>, StoreError>;
    async fn get_scheme(&self, id: i64) -> Result<Option<BonusScheme>, StoreError>;
    async fn update_scheme(
        &self,
        id: i64,
        scheme: NewBonusScheme,
    ) -> Result<BonusScheme, StoreError>;
    async fn delete_scheme(&self, id: i64) -> Result<(), StoreError>;

    // --- credit ledger (append-only) ---

    async fn append_ledger_entry(
        &self,
        entry: NewLedgerEntry,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, StoreError>;
    async fn ledger_entries_for_user(&self, user_id: &str)
        -> Result<Vec<LedgerEntry>, StoreError>;
    async fn find_ledger_entry_by_reference(
        &self,
        user_id: &str,
        reference_id: &str,
    ) -> Result<Option<LedgerEntry>, StoreError>;
    async fn user_has_earned(&self, user_id: &str, scheme_id: i64) -> Result<bool, StoreError>;

    // --- referral rules ---

    async fn insert_referral_rule(
        &self,
        rule: NewReferralRule,
        at: DateTime<Utc>,
    ) -> Result<ReferralRule, StoreError>;
    async fn list_referral_rules(&self) -> Result<Vec<ReferralRule>, StoreError>;
    async fn get_referral_rule(&self, id: i64) -> Result<Option<ReferralRule>, StoreError>;
    async fn update_referral_rule(
        &self,
        id: i64,
        rule: NewReferralRule,
    ) -> Result<ReferralRule, StoreError>;
    async fn delete_referral_rule(&self, id: i64) -> Result<(), StoreError>;

    // --- transactions ---

    async fn insert_transaction(
        &self,
        txn: NewTransaction,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord, StoreError>;
    async fn get_transaction(&self, id: &str) -> Result<Option<TransactionRecord>, StoreError>;
    async fn list_transactions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError>;
}
