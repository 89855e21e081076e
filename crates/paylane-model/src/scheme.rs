use crate::ids::Currency;
use crate::promo::SegmentRule;
use chrono::{DateTime, Utc};
use paylane_core::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum BonusKind {
    LoyaltyCredit,
    TransactionThresholdCredit,
    RequestMoneyCredit,
}

impl BonusKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoyaltyCredit => "loyalty-credit",
            Self::TransactionThresholdCredit => "transaction-threshold-credit",
            Self::RequestMoneyCredit => "request-money-credit",
        }
    }
}

impl std::str::FromStr for BonusKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loyalty-credit" => Ok(Self::LoyaltyCredit),
            "transaction-threshold-credit" => Ok(Self::TransactionThresholdCredit),
            "request-money-credit" => Ok(Self::RequestMoneyCredit),
            other => Err(ValidationError(format!("unknown bonus kind {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CommissionMode {
    Fixed,
    Percentage,
}

impl CommissionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "Fixed",
            Self::Percentage => "Percentage",
        }
    }
}

impl std::str::FromStr for CommissionMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fixed" => Ok(Self::Fixed),
            "Percentage" => Ok(Self::Percentage),
            other => Err(ValidationError(format!(
                "unknown commission mode {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SchemeStatus {
    Active,
    Inactive,
    Expired,
}

impl SchemeStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Expired => "Expired",
        }
    }
}

impl std::str::FromStr for SchemeStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Inactive" => Ok(Self::Inactive),
            "Expired" => Ok(Self::Expired),
            other => Err(ValidationError(format!("unknown scheme status {other:?}"))),
        }
    }
}

/// One commission tier. `max == None` means the tier is open-ended upward.
/// Bounds are inclusive on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tier {
    pub min: Decimal,
    pub max: Option<Decimal>,
    pub value: Decimal,
}

impl Tier {
    #[must_use]
    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.min && self.max.is_none_or(|max| amount <= max)
    }
}

/// Ordered, non-overlapping tier table. A transaction amount falls in at
/// most one tier; tables are validated at parse time so lookup never has to
/// break ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TierTable(Vec<Tier>);

impl TierTable {
    pub fn parse(tiers: Vec<Tier>) -> Result<Self, ValidationError> {
        if tiers.is_empty() {
            return Err(ValidationError("tier table must not be empty".to_string()));
        }
        for (i, tier) in tiers.iter().enumerate() {
            if tier.min < Decimal::ZERO {
                return Err(ValidationError(format!(
                    "tier {i} min must not be negative"
                )));
            }
            if tier.value <= Decimal::ZERO {
                return Err(ValidationError(format!("tier {i} value must be positive")));
            }
            match tier.max {
                Some(max) if max < tier.min => {
                    return Err(ValidationError(format!(
                        "tier {i} max {max} is below its min {}",
                        tier.min
                    )));
                }
                None if i + 1 != tiers.len() => {
                    return Err(ValidationError(format!(
                        "open-ended tier {i} must be the last tier"
                    )));
                }
                _ => {}
            }
        }
        for window in tiers.windows(2) {
            let (prev, next) = (&window[0], &window[1]);
            if next.min <= prev.min {
                return Err(ValidationError(
                    "tiers must be sorted by ascending min".to_string(),
                ));
            }
            if prev.max.is_none_or(|max| next.min <= max) {
                return Err(ValidationError(format!(
                    "tier starting at {} overlaps the previous tier",
                    next.min
                )));
            }
        }
        Ok(Self(tiers))
    }

    /// The unique tier containing `amount`, if any. A miss is the caller's
    /// hard failure, not a fallback.
    #[must_use]
    pub fn lookup(&self, amount: Decimal) -> Option<&Tier> {
        self.0.iter().find(|t| t.contains(amount))
    }

    #[must_use]
    pub fn tiers(&self) -> &[Tier] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for TierTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tiers = Vec::<Tier>::deserialize(deserializer)?;
        Self::parse(tiers).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoyaltyRule {
    pub min_transactions: u32,
    pub time_period_days: u32,
}

fn default_one_time_only() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EligibilityRule {
    #[serde(default)]
    pub segment: SegmentRule,
    #[serde(default = "default_one_time_only")]
    pub one_time_only: bool,
}

impl Default for EligibilityRule {
    fn default() -> Self {
        Self {
            segment: SegmentRule::All,
            one_time_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusScheme {
    pub id: i64,
    pub name: String,
    pub kind: BonusKind,
    pub credit_amount: Decimal,
    pub currency: Currency,
    pub min_transaction_amount: Decimal,
    pub loyalty: Option<LoyaltyRule>,
    pub commission: CommissionMode,
    pub tiers: Option<TierTable>,
    pub eligibility: EligibilityRule,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: SchemeStatus,
    pub created_at: DateTime<Utc>,
}

impl BonusScheme {
    #[must_use]
    pub fn is_tiered(&self) -> bool {
        self.tiers.is_some()
    }
}

/// Validated definition for creating or replacing a bonus scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBonusScheme {
    pub name: String,
    pub kind: BonusKind,
    pub credit_amount: Decimal,
    pub currency: Currency,
    pub min_transaction_amount: Decimal,
    pub loyalty: Option<LoyaltyRule>,
    pub commission: CommissionMode,
    pub tiers: Option<TierTable>,
    pub eligibility: EligibilityRule,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: SchemeStatus,
}

impl NewBonusScheme {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError("scheme name must not be empty".to_string()));
        }
        if self.ends_at <= self.starts_at {
            return Err(ValidationError(
                "scheme window must end after it starts".to_string(),
            ));
        }
        if self.min_transaction_amount < Decimal::ZERO {
            return Err(ValidationError(
                "min_transaction_amount must not be negative".to_string(),
            ));
        }
        match &self.tiers {
            Some(table) => {
                if self.commission == CommissionMode::Percentage {
                    for tier in table.tiers() {
                        if tier.value > Decimal::ONE_HUNDRED {
                            return Err(ValidationError(
                                "percentage tier value must not exceed 100".to_string(),
                            ));
                        }
                    }
                }
            }
            None => {
                if self.credit_amount <= Decimal::ZERO {
                    return Err(ValidationError(
                        "credit_amount must be positive".to_string(),
                    ));
                }
                if self.commission == CommissionMode::Percentage
                    && self.credit_amount > Decimal::ONE_HUNDRED
                {
                    return Err(ValidationError(
                        "percentage credit_amount must not exceed 100".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tier(min: Decimal, max: Option<Decimal>, value: Decimal) -> Tier {
        Tier { min, max, value }
    }

    #[test]
    fn tier_table_accepts_sorted_disjoint_tiers() {
        let table = TierTable::parse(vec![
            tier(dec!(0), Some(dec!(1000)), dec!(50)),
            tier(dec!(1001), Some(dec!(5000)), dec!(100)),
            tier(dec!(5001), None, dec!(200)),
        ])
        .expect("valid table");
        assert_eq!(table.tiers().len(), 3);
    }

    #[test]
    fn tier_table_rejects_overlap() {
        let err = TierTable::parse(vec![
            tier(dec!(0), Some(dec!(1000)), dec!(50)),
            tier(dec!(1000), Some(dec!(5000)), dec!(100)),
        ])
        .unwrap_err();
        assert!(err.0.contains("overlaps"));
    }

    #[test]
    fn tier_table_rejects_unsorted_input() {
        assert!(TierTable::parse(vec![
            tier(dec!(1001), Some(dec!(5000)), dec!(100)),
            tier(dec!(0), Some(dec!(1000)), dec!(50)),
        ])
        .is_err());
    }

    #[test]
    fn open_ended_tier_must_be_last() {
        assert!(TierTable::parse(vec![
            tier(dec!(0), None, dec!(50)),
            tier(dec!(1001), Some(dec!(5000)), dec!(100)),
        ])
        .is_err());
    }

    #[test]
    fn lookup_hits_at_most_one_tier() {
        let table = TierTable::parse(vec![
            tier(dec!(0), Some(dec!(1000)), dec!(50)),
            tier(dec!(1001), Some(dec!(5000)), dec!(100)),
            tier(dec!(5001), None, dec!(200)),
        ])
        .unwrap();
        assert_eq!(table.lookup(dec!(500)).unwrap().value, dec!(50));
        assert_eq!(table.lookup(dec!(1500)).unwrap().value, dec!(100));
        assert_eq!(table.lookup(dec!(500000)).unwrap().value, dec!(200));
        assert!(table.lookup(dec!(1000.5)).is_none());
    }

    #[test]
    fn eligibility_defaults_to_one_time_only() {
        let rule: EligibilityRule = serde_json::from_str("{}").unwrap();
        assert!(rule.one_time_only);
        assert_eq!(rule.segment, SegmentRule::All);
    }

    #[test]
    fn bonus_kind_uses_kebab_case_on_the_wire() {
        let json = serde_json::to_string(&BonusKind::TransactionThresholdCredit).unwrap();
        assert_eq!(json, "\"transaction-threshold-credit\"");
    }
}
