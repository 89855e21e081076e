// SPDX-License-Identifier: Apache-2.0

use crate::{CommitOutcome, DateRange, StoreBackend, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use paylane_model::{
    BonusKind, BonusScheme, BudgetLimit, CommissionMode, Currency, DiscountKind, EligibilityRule,
    EntryType, LedgerEntry, LoyaltyRule, NewBonusScheme, NewLedgerEntry, NewPromoCode,
    NewReferralRule, NewTransaction, PaymentMethod, PromoCode, PromoCodeId, PromoStatus,
    ReasonCode, RedemptionRecord, ReferralRule, RestrictionSet, RuleStatus, SchemeStatus,
    SegmentRule, TierTable, TransactionRecord, UsageLimit,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS promo_codes (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      code TEXT NOT NULL UNIQUE,
      kind TEXT NOT NULL,
      value TEXT NOT NULL,
      min_amount TEXT NOT NULL,
      max_discount TEXT,
      currency TEXT NOT NULL,
      usage_limit_global INTEGER NOT NULL,
      usage_limit_per_user INTEGER NOT NULL,
      usage_count INTEGER NOT NULL DEFAULT 0,
      total_discount_utilized TEXT NOT NULL DEFAULT '0',
      budget_limit TEXT NOT NULL DEFAULT '-1',
      starts_at TEXT NOT NULL,
      ends_at TEXT NOT NULL,
      status TEXT NOT NULL,
      restrictions TEXT NOT NULL,
      segment TEXT NOT NULL,
      created_at TEXT NOT NULL,
      last_campaign_at TEXT
    );

    CREATE TABLE IF NOT EXISTS promo_redemptions (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      promo_id INTEGER NOT NULL REFERENCES promo_codes(id) ON DELETE CASCADE,
      code TEXT NOT NULL,
      user_id TEXT,
      discount_amount TEXT NOT NULL,
      created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_promo_redemptions_user
      ON promo_redemptions(user_id, created_at);
    CREATE INDEX IF NOT EXISTS idx_promo_redemptions_promo
      ON promo_redemptions(promo_id, user_id);

    CREATE TABLE IF NOT EXISTS bonus_schemes (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL,
      kind TEXT NOT NULL,
      credit_amount TEXT NOT NULL,
      currency TEXT NOT NULL,
      min_transaction_amount TEXT NOT NULL,
      loyalty TEXT,
      commission TEXT NOT NULL,
      tiers TEXT,
      eligibility TEXT NOT NULL,
      starts_at TEXT NOT NULL,
      ends_at TEXT NOT NULL,
      status TEXT NOT NULL,
      created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS credit_ledger (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      user_id TEXT NOT NULL,
      amount TEXT NOT NULL,
      entry_type TEXT NOT NULL,
      scheme_id INTEGER,
      reference_id TEXT NOT NULL,
      reason_code TEXT,
      notes TEXT,
      admin_user TEXT,
      expires_at TEXT,
      created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_credit_ledger_user
      ON credit_ledger(user_id, created_at);
    CREATE INDEX IF NOT EXISTS idx_credit_ledger_reference
      ON credit_ledger(user_id, reference_id);
    CREATE INDEX IF NOT EXISTS idx_credit_ledger_scheme
      ON credit_ledger(user_id, scheme_id, entry_type);

    CREATE TABLE IF NOT EXISTS referral_rules (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      base_currency TEXT NOT NULL UNIQUE,
      reward_amount TEXT NOT NULL,
      referee_reward_amount TEXT NOT NULL,
      min_transaction_amount TEXT NOT NULL,
      status TEXT NOT NULL,
      created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS transactions (
      id TEXT PRIMARY KEY,
      user_id TEXT NOT NULL,
      amount TEXT NOT NULL,
      currency TEXT NOT NULL,
      source_currency TEXT NOT NULL,
      dest_currency TEXT NOT NULL,
      payment_method TEXT NOT NULL,
      created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_user
      ON transactions(user_id, created_at);
";

const PROMO_COLS: &str = "id, code, kind, value, min_amount, max_discount, currency, \
     usage_limit_global, usage_limit_per_user, usage_count, total_discount_utilized, \
     budget_limit, starts_at, ends_at, status, restrictions, segment, created_at, \
     last_campaign_at";

const SCHEME_COLS: &str = "id, name, kind, credit_amount, currency, min_transaction_amount, \
     loyalty, commission, tiers, eligibility, starts_at, ends_at, status, created_at";

const LEDGER_COLS: &str = "id, user_id, amount, entry_type, scheme_id, reference_id, \
     reason_code, notes, admin_user, expires_at, created_at";

/// SQLite-backed store. One connection guarded by an async mutex; every
/// multi-statement write runs inside an Immediate transaction so cap checks
/// and counter bumps cannot interleave.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn promo_by_id(conn: &Connection, id: i64) -> Result<Option<PromoCode>, StoreError> {
        conn.query_row(
            &format!("SELECT {PROMO_COLS} FROM promo_codes WHERE id = ?1"),
            params![id],
            promo_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    fn scheme_by_id(conn: &Connection, id: i64) -> Result<Option<BonusScheme>, StoreError> {
        conn.query_row(
            &format!("SELECT {SCHEME_COLS} FROM bonus_schemes WHERE id = ?1"),
            params![id],
            scheme_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    fn rule_by_id(conn: &Connection, id: i64) -> Result<Option<ReferralRule>, StoreError> {
        conn.query_row(
            "SELECT id, base_currency, reward_amount, referee_reward_amount, \
             min_transaction_amount, status, created_at FROM referral_rules WHERE id = ?1",
            params![id],
            rule_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    fn entry_by_id(conn: &Connection, id: i64) -> Result<Option<LedgerEntry>, StoreError> {
        conn.query_row(
            &format!("SELECT {LEDGER_COLS} FROM credit_ledger WHERE id = ?1"),
            params![id],
            entry_from_row,
        )
        .optional()
        .map_err(Into::into)
    }
}

fn dt_to_sql(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conv(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn dt_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conv(idx, e))
}

fn dt_col_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| conv(idx, e)),
        None => Ok(None),
    }
}

fn decimal_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conv(idx, e))
}

fn decimal_col_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => Decimal::from_str(&raw).map(Some).map_err(|e| conv(idx, e)),
        None => Ok(None),
    }
}

fn json_col<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conv(idx, e))
}

fn json_col_opt<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| conv(idx, e)),
        None => Ok(None),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn conflict_on_constraint(err: rusqlite::Error, message: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(message.to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

fn promo_from_row(row: &Row<'_>) -> rusqlite::Result<PromoCode> {
    let code_raw: String = row.get(1)?;
    let kind_raw: String = row.get(2)?;
    let currency_raw: String = row.get(6)?;
    let status_raw: String = row.get(14)?;
    Ok(PromoCode {
        id: row.get(0)?,
        code: PromoCodeId::parse(&code_raw).map_err(|e| conv(1, e))?,
        kind: DiscountKind::from_str(&kind_raw).map_err(|e| conv(2, e))?,
        value: decimal_col(row, 3)?,
        min_amount: decimal_col(row, 4)?,
        max_discount: decimal_col_opt(row, 5)?,
        currency: Currency::parse(&currency_raw).map_err(|e| conv(6, e))?,
        usage_limit_global: UsageLimit::from_raw(row.get(7)?),
        usage_limit_per_user: UsageLimit::from_raw(row.get(8)?),
        usage_count: row.get::<_, i64>(9)?.max(0) as u64,
        total_discount_utilized: decimal_col(row, 10)?,
        budget_limit: BudgetLimit::from_raw(decimal_col(row, 11)?),
        starts_at: dt_col(row, 12)?,
        ends_at: dt_col(row, 13)?,
        status: PromoStatus::from_str(&status_raw).map_err(|e| conv(14, e))?,
        restrictions: json_col::<RestrictionSet>(row, 15)?,
        segment: json_col::<SegmentRule>(row, 16)?,
        created_at: dt_col(row, 17)?,
        last_campaign_at: dt_col_opt(row, 18)?,
    })
}

fn redemption_from_row(row: &Row<'_>) -> rusqlite::Result<RedemptionRecord> {
    let code_raw: String = row.get(2)?;
    Ok(RedemptionRecord {
        id: row.get(0)?,
        promo_id: row.get(1)?,
        code: PromoCodeId::parse(&code_raw).map_err(|e| conv(2, e))?,
        user_id: row.get(3)?,
        discount_amount: decimal_col(row, 4)?,
        created_at: dt_col(row, 5)?,
    })
}

fn scheme_from_row(row: &Row<'_>) -> rusqlite::Result<BonusScheme> {
    let kind_raw: String = row.get(2)?;
    let currency_raw: String = row.get(4)?;
    let commission_raw: String = row.get(7)?;
    let status_raw: String = row.get(12)?;
    Ok(BonusScheme {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: BonusKind::from_str(&kind_raw).map_err(|e| conv(2, e))?,
        credit_amount: decimal_col(row, 3)?,
        currency: Currency::parse(&currency_raw).map_err(|e| conv(4, e))?,
        min_transaction_amount: decimal_col(row, 5)?,
        loyalty: json_col_opt::<LoyaltyRule>(row, 6)?,
        commission: CommissionMode::from_str(&commission_raw).map_err(|e| conv(7, e))?,
        tiers: json_col_opt::<TierTable>(row, 8)?,
        eligibility: json_col::<EligibilityRule>(row, 9)?,
        starts_at: dt_col(row, 10)?,
        ends_at: dt_col(row, 11)?,
        status: SchemeStatus::from_str(&status_raw).map_err(|e| conv(12, e))?,
        created_at: dt_col(row, 13)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let entry_type_raw: String = row.get(3)?;
    let reason_raw: Option<String> = row.get(6)?;
    let reason_code = match reason_raw {
        Some(raw) => Some(ReasonCode::from_str(&raw).map_err(|e| conv(6, e))?),
        None => None,
    };
    Ok(LedgerEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: decimal_col(row, 2)?,
        entry_type: EntryType::from_str(&entry_type_raw).map_err(|e| conv(3, e))?,
        scheme_id: row.get(4)?,
        reference_id: row.get(5)?,
        reason_code,
        notes: row.get(7)?,
        admin_user: row.get(8)?,
        expires_at: dt_col_opt(row, 9)?,
        created_at: dt_col(row, 10)?,
    })
}

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<ReferralRule> {
    let currency_raw: String = row.get(1)?;
    let status_raw: String = row.get(5)?;
    Ok(ReferralRule {
        id: row.get(0)?,
        base_currency: Currency::parse(&currency_raw).map_err(|e| conv(1, e))?,
        reward_amount: decimal_col(row, 2)?,
        referee_reward_amount: decimal_col(row, 3)?,
        min_transaction_amount: decimal_col(row, 4)?,
        status: RuleStatus::from_str(&status_raw).map_err(|e| conv(5, e))?,
        created_at: dt_col(row, 6)?,
    })
}

fn txn_from_row(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    let currency_raw: String = row.get(3)?;
    let source_raw: String = row.get(4)?;
    let dest_raw: String = row.get(5)?;
    let method_raw: String = row.get(6)?;
    Ok(TransactionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: decimal_col(row, 2)?,
        currency: Currency::parse(&currency_raw).map_err(|e| conv(3, e))?,
        source_currency: Currency::parse(&source_raw).map_err(|e| conv(4, e))?,
        dest_currency: Currency::parse(&dest_raw).map_err(|e| conv(5, e))?,
        payment_method: PaymentMethod::parse(&method_raw).map_err(|e| conv(6, e))?,
        created_at: dt_col(row, 7)?,
    })
}

#[async_trait]
impl StoreBackend for SqliteBackend {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    async fn insert_promo(
        &self,
        promo: NewPromoCode,
        at: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError> {
        let conn = self.conn.lock().await;
        let restrictions = to_json(&promo.restrictions)?;
        let segment = to_json(&promo.segment)?;
        conn.execute(
            "INSERT INTO promo_codes (code, kind, value, min_amount, max_discount, currency, \
             usage_limit_global, usage_limit_per_user, usage_count, total_discount_utilized, \
             budget_limit, starts_at, ends_at, status, restrictions, segment, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                promo.code.as_str(),
                promo.kind.as_str(),
                promo.value.to_string(),
                promo.min_amount.to_string(),
                promo.max_discount.map(|d| d.to_string()),
                promo.currency.as_str(),
                promo.usage_limit_global.as_raw(),
                promo.usage_limit_per_user.as_raw(),
                0i64,
                Decimal::ZERO.to_string(),
                promo.budget_limit.as_raw().to_string(),
                dt_to_sql(promo.starts_at),
                dt_to_sql(promo.ends_at),
                promo.status.as_str(),
                restrictions,
                segment,
                dt_to_sql(at),
            ],
        )
        .map_err(|e| conflict_on_constraint(e, "duplicate promo code"))?;
        let id = conn.last_insert_rowid();
        Self::promo_by_id(&conn, id)?
            .ok_or_else(|| StoreError::Backend("inserted promo row missing".to_string()))
    }

    async fn list_promos(&self) -> Result<Vec<PromoCode>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {PROMO_COLS} FROM promo_codes ORDER BY id DESC"))?;
        let rows = stmt.query_map([], promo_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    async fn get_promo(&self, id: i64) -> Result<Option<PromoCode>, StoreError> {
        let conn = self.conn.lock().await;
        Self::promo_by_id(&conn, id)
    }

    async fn find_promo_by_code(
        &self,
        code: &PromoCodeId,
    ) -> Result<Option<PromoCode>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            &format!("SELECT {PROMO_COLS} FROM promo_codes WHERE code = ?1"),
            params![code.as_str()],
            promo_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    async fn set_promo_status(
        &self,
        id: i64,
        status: PromoStatus,
    ) -> Result<PromoCode, StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE promo_codes SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("promo {id}")));
        }
        Self::promo_by_id(&conn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("promo {id}")))
    }

    async fn touch_promo_campaign(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<PromoCode, StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE promo_codes SET last_campaign_at = ?1 WHERE id = ?2",
            params![dt_to_sql(at), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("promo {id}")));
        }
        Self::promo_by_id(&conn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("promo {id}")))
    }

    async fn delete_promo(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute("DELETE FROM promo_codes WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("promo {id}")));
        }
        Ok(())
    }

    async fn commit_redemption(
        &self,
        promo_id: i64,
        user_id: Option<&str>,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<CommitOutcome, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let promo = tx
            .query_row(
                &format!("SELECT {PROMO_COLS} FROM promo_codes WHERE id = ?1"),
                params![promo_id],
                promo_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("promo {promo_id}")))?;
        if !promo.usage_limit_global.allows(promo.usage_count) {
            return Ok(CommitOutcome::UsageCapReached);
        }
        if !promo
            .budget_limit
            .admits(promo.total_discount_utilized, amount)
        {
            return Ok(CommitOutcome::BudgetCapReached);
        }
        let new_total = promo.total_discount_utilized + amount;
        tx.execute(
            "UPDATE promo_codes SET usage_count = usage_count + 1, \
             total_discount_utilized = ?1 WHERE id = ?2",
            params![new_total.to_string(), promo_id],
        )?;
        tx.execute(
            "INSERT INTO promo_redemptions (promo_id, code, user_id, discount_amount, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                promo_id,
                promo.code.as_str(),
                user_id,
                amount.to_string(),
                dt_to_sql(at),
            ],
        )?;
        let updated = tx
            .query_row(
                &format!("SELECT {PROMO_COLS} FROM promo_codes WHERE id = ?1"),
                params![promo_id],
                promo_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::Backend("promo vanished mid-commit".to_string()))?;
        tx.commit()?;
        Ok(CommitOutcome::Committed(updated))
    }

    async fn count_user_redemptions(
        &self,
        promo_id: i64,
        user_id: &str,
    ) -> Result<u64, StoreError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM promo_redemptions WHERE promo_id = ?1 AND user_id = ?2",
            params![promo_id, user_id],
            |r| r.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    async fn redemptions_for_user(
        &self,
        user_id: &str,
        range: &DateRange,
    ) -> Result<Vec<RedemptionRecord>, StoreError> {
        let conn = self.conn.lock().await;
        let mut sql = String::from(
            "SELECT id, promo_id, code, user_id, discount_amount, created_at \
             FROM promo_redemptions WHERE user_id = ?1",
        );
        let mut bind: Vec<Value> = vec![Value::Text(user_id.to_string())];
        if let Some(start) = range.start {
            bind.push(Value::Text(dt_to_sql(start)));
            sql.push_str(&format!(" AND created_at >= ?{}", bind.len()));
        }
        if let Some(end) = range.end {
            bind.push(Value::Text(dt_to_sql(end)));
            sql.push_str(&format!(" AND created_at < ?{}", bind.len()));
        }
        sql.push_str(" ORDER BY id");
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind.iter()), redemption_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    async fn insert_scheme(
        &self,
        scheme: NewBonusScheme,
        at: DateTime<Utc>,
    ) -> Result<BonusScheme, StoreError> {
        let conn = self.conn.lock().await;
        let loyalty = scheme.loyalty.as_ref().map(to_json).transpose()?;
        let tiers = scheme.tiers.as_ref().map(to_json).transpose()?;
        let eligibility = to_json(&scheme.eligibility)?;
        conn.execute(
            "INSERT INTO bonus_schemes (name, kind, credit_amount, currency, \
             min_transaction_amount, loyalty, commission, tiers, eligibility, starts_at, \
             ends_at, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                scheme.name,
                scheme.kind.as_str(),
                scheme.credit_amount.to_string(),
                scheme.currency.as_str(),
                scheme.min_transaction_amount.to_string(),
                loyalty,
                scheme.commission.as_str(),
                tiers,
                eligibility,
                dt_to_sql(scheme.starts_at),
                dt_to_sql(scheme.ends_at),
                scheme.status.as_str(),
                dt_to_sql(at),
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::scheme_by_id(&conn, id)?
            .ok_or_else(|| StoreError::Backend("inserted scheme row missing".to_string()))
    }

    async fn list_schemes(&self) -> Result<Vec<BonusScheme>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare_cached(&format!("SELECT {SCHEME_COLS} FROM bonus_schemes ORDER BY id DESC"))?;
        let rows = stmt.query_map([], scheme_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    async fn get_scheme(&self, id: i64) -> Result<Option<BonusScheme>, StoreError> {
        let conn = self.conn.lock().await;
        Self::scheme_by_id(&conn, id)
    }

    async fn update_scheme(
        &self,
        id: i64,
        scheme: NewBonusScheme,
    ) -> Result<BonusScheme, StoreError> {
        let conn = self.conn.lock().await;
        let loyalty = scheme.loyalty.as_ref().map(to_json).transpose()?;
        let tiers = scheme.tiers.as_ref().map(to_json).transpose()?;
        let eligibility = to_json(&scheme.eligibility)?;
        let changed = conn.execute(
            "UPDATE bonus_schemes SET name = ?1, kind = ?2, credit_amount = ?3, currency = ?4, \
             min_transaction_amount = ?5, loyalty = ?6, commission = ?7, tiers = ?8, \
             eligibility = ?9, starts_at = ?10, ends_at = ?11, status = ?12 WHERE id = ?13",
            params![
                scheme.name,
                scheme.kind.as_str(),
                scheme.credit_amount.to_string(),
                scheme.currency.as_str(),
                scheme.min_transaction_amount.to_string(),
                loyalty,
                scheme.commission.as_str(),
                tiers,
                eligibility,
                dt_to_sql(scheme.starts_at),
                dt_to_sql(scheme.ends_at),
                scheme.status.as_str(),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("scheme {id}")));
        }
        Self::scheme_by_id(&conn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("scheme {id}")))
    }

    async fn delete_scheme(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute("DELETE FROM bonus_schemes WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("scheme {id}")));
        }
        Ok(())
    }

    async fn append_ledger_entry(
        &self,
        entry: NewLedgerEntry,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO credit_ledger (user_id, amount, entry_type, scheme_id, reference_id, \
             reason_code, notes, admin_user, expires_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.user_id,
                entry.amount.to_string(),
                entry.entry_type.as_str(),
                entry.scheme_id,
                entry.reference_id,
                entry.reason_code.map(ReasonCode::as_str),
                entry.notes,
                entry.admin_user,
                entry.expires_at.map(dt_to_sql),
                dt_to_sql(at),
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::entry_by_id(&conn, id)?
            .ok_or_else(|| StoreError::Backend("inserted ledger row missing".to_string()))
    }

    async fn ledger_entries_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {LEDGER_COLS} FROM credit_ledger WHERE user_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![user_id], entry_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    async fn find_ledger_entry_by_reference(
        &self,
        user_id: &str,
        reference_id: &str,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            &format!(
                "SELECT {LEDGER_COLS} FROM credit_ledger \
                 WHERE user_id = ?1 AND reference_id = ?2 ORDER BY id LIMIT 1"
            ),
            params![user_id, reference_id],
            entry_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    async fn user_has_earned(&self, user_id: &str, scheme_id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM credit_ledger \
             WHERE user_id = ?1 AND scheme_id = ?2 AND entry_type = 'Earned')",
            params![user_id, scheme_id],
            |r| r.get(0),
        )?;
        Ok(exists != 0)
    }

    async fn insert_referral_rule(
        &self,
        rule: NewReferralRule,
        at: DateTime<Utc>,
    ) -> Result<ReferralRule, StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO referral_rules (base_currency, reward_amount, referee_reward_amount, \
             min_transaction_amount, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                rule.base_currency.as_str(),
                rule.reward_amount.to_string(),
                rule.referee_reward_amount.to_string(),
                rule.min_transaction_amount.to_string(),
                rule.status.as_str(),
                dt_to_sql(at),
            ],
        )
        .map_err(|e| conflict_on_constraint(e, "duplicate base currency"))?;
        let id = conn.last_insert_rowid();
        Self::rule_by_id(&conn, id)?
            .ok_or_else(|| StoreError::Backend("inserted rule row missing".to_string()))
    }

    async fn list_referral_rules(&self) -> Result<Vec<ReferralRule>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT id, base_currency, reward_amount, referee_reward_amount, \
             min_transaction_amount, status, created_at FROM referral_rules ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], rule_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    async fn get_referral_rule(&self, id: i64) -> Result<Option<ReferralRule>, StoreError> {
        let conn = self.conn.lock().await;
        Self::rule_by_id(&conn, id)
    }

    async fn update_referral_rule(
        &self,
        id: i64,
        rule: NewReferralRule,
    ) -> Result<ReferralRule, StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE referral_rules SET base_currency = ?1, reward_amount = ?2, \
                 referee_reward_amount = ?3, min_transaction_amount = ?4, status = ?5 \
                 WHERE id = ?6",
                params![
                    rule.base_currency.as_str(),
                    rule.reward_amount.to_string(),
                    rule.referee_reward_amount.to_string(),
                    rule.min_transaction_amount.to_string(),
                    rule.status.as_str(),
                    id,
                ],
            )
            .map_err(|e| conflict_on_constraint(e, "duplicate base currency"))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("referral rule {id}")));
        }
        Self::rule_by_id(&conn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("referral rule {id}")))
    }

    async fn delete_referral_rule(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute("DELETE FROM referral_rules WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("referral rule {id}")));
        }
        Ok(())
    }

    async fn insert_transaction(
        &self,
        txn: NewTransaction,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord, StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO transactions (id, user_id, amount, currency, source_currency, \
             dest_currency, payment_method, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                txn.id,
                txn.user_id,
                txn.amount.to_string(),
                txn.currency.as_str(),
                txn.source_currency.as_str(),
                txn.dest_currency.as_str(),
                txn.payment_method.as_str(),
                dt_to_sql(at),
            ],
        )
        .map_err(|e| conflict_on_constraint(e, "duplicate transaction id"))?;
        conn.query_row(
            "SELECT id, user_id, amount, currency, source_currency, dest_currency, \
             payment_method, created_at FROM transactions WHERE id = ?1",
            params![txn.id],
            txn_from_row,
        )
        .map_err(Into::into)
    }

    async fn get_transaction(&self, id: &str) -> Result<Option<TransactionRecord>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, user_id, amount, currency, source_currency, dest_currency, \
             payment_method, created_at FROM transactions WHERE id = ?1",
            params![id],
            txn_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    async fn list_transactions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT id, user_id, amount, currency, source_currency, dest_currency, \
             payment_method, created_at FROM transactions WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![user_id], txn_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}
