use chrono::{DateTime, Utc};
use paylane_core::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EntryType {
    Earned,
    Applied,
    Expired,
    Voided,
}

impl EntryType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Earned => "Earned",
            Self::Applied => "Applied",
            Self::Expired => "Expired",
            Self::Voided => "Voided",
        }
    }
}

impl FromStr for EntryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Earned" => Ok(Self::Earned),
            "Applied" => Ok(Self::Applied),
            "Expired" => Ok(Self::Expired),
            "Voided" => Ok(Self::Voided),
            other => Err(ValidationError(format!("unknown entry type {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ReasonCode {
    Goodwill,
    Correction,
    ManualAdjustment,
}

impl ReasonCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Goodwill => "Goodwill",
            Self::Correction => "Correction",
            Self::ManualAdjustment => "ManualAdjustment",
        }
    }
}

impl FromStr for ReasonCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Goodwill" => Ok(Self::Goodwill),
            "Correction" => Ok(Self::Correction),
            "ManualAdjustment" => Ok(Self::ManualAdjustment),
            other => Err(ValidationError(format!("unknown reason code {other:?}"))),
        }
    }
}

/// One append-only credit-ledger row. Entries are never mutated or deleted;
/// a user's balance is the signed sum of all their entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: String,
    pub amount: Decimal,
    pub entry_type: EntryType,
    pub scheme_id: Option<i64>,
    pub reference_id: String,
    pub reason_code: Option<ReasonCode>,
    pub notes: Option<String>,
    pub admin_user: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub user_id: String,
    pub amount: Decimal,
    pub entry_type: EntryType,
    pub scheme_id: Option<i64>,
    pub reference_id: String,
    pub reason_code: Option<ReasonCode>,
    pub notes: Option<String>,
    pub admin_user: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewLedgerEntry {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError("user_id must not be empty".to_string()));
        }
        if self.amount == Decimal::ZERO {
            return Err(ValidationError("ledger amount must not be zero".to_string()));
        }
        if self.reference_id.trim().is_empty() {
            return Err(ValidationError(
                "reference_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Signed balance over a slice of entries.
#[must_use]
pub fn balance_of(entries: &[LedgerEntry]) -> Decimal {
    entries.iter().map(|e| e.amount).sum()
}
