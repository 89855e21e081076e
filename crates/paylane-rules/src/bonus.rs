// SPDX-License-Identifier: Apache-2.0

use paylane_model::{BonusScheme, CommissionMode};
use rust_decimal::Decimal;

/// Every awarded credit expires this many days after the award. Fixed
/// platform policy; the scheme's own validity window does not change it.
pub const CREDIT_EXPIRY_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BonusRejection {
    SchemeNotFound,
    SchemeExpired,
    SchemeInactive,
    AlreadyEarned,
    TierMismatch,
    TransactionRequired,
    TransactionNotFound,
}

impl BonusRejection {
    #[must_use]
    pub const fn as_code(self) -> &'static str {
        match self {
            Self::SchemeNotFound => "SCHEME_NOT_FOUND",
            Self::SchemeExpired => "SCHEME_EXPIRED",
            Self::SchemeInactive => "SCHEME_INACTIVE",
            Self::AlreadyEarned => "ALREADY_EARNED",
            Self::TierMismatch => "TIER_MISMATCH",
            Self::TransactionRequired => "TRANSACTION_REQUIRED",
            Self::TransactionNotFound => "TRANSACTION_NOT_FOUND",
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::SchemeNotFound => "bonus scheme not found",
            Self::SchemeExpired => "bonus scheme has expired",
            Self::SchemeInactive => "bonus scheme is not active",
            Self::AlreadyEarned => "user has already earned from this one-time scheme",
            Self::TierMismatch => "transaction amount matches no tier",
            Self::TransactionRequired => "this scheme requires a transaction reference",
            Self::TransactionNotFound => "referenced transaction not found",
        }
    }
}

impl std::fmt::Display for BonusRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for BonusRejection {}

/// Commission amount for an award against `txn_amount`.
///
/// Tier lookup is a hard gate: an amount that falls between tiers is
/// `TierMismatch`, never a zero-credit success or a fallback tier.
pub fn compute_bonus_amount(
    scheme: &BonusScheme,
    txn_amount: Option<Decimal>,
) -> Result<Decimal, BonusRejection> {
    match &scheme.tiers {
        None => match scheme.commission {
            CommissionMode::Fixed => Ok(scheme.credit_amount),
            CommissionMode::Percentage => {
                let amount = txn_amount.ok_or(BonusRejection::TransactionRequired)?;
                Ok(amount * scheme.credit_amount / Decimal::ONE_HUNDRED)
            }
            _ => unreachable!("unhandled CommissionMode variant"),
        },
        Some(table) => {
            let amount = txn_amount.ok_or(BonusRejection::TransactionRequired)?;
            let tier = table.lookup(amount).ok_or(BonusRejection::TierMismatch)?;
            match scheme.commission {
                CommissionMode::Fixed => Ok(tier.value),
                CommissionMode::Percentage => Ok(amount * tier.value / Decimal::ONE_HUNDRED),
                _ => unreachable!("unhandled CommissionMode variant"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use paylane_model::{
        BonusKind, Currency, EligibilityRule, SchemeStatus, Tier, TierTable,
    };
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn scheme(commission: CommissionMode, tiers: Option<TierTable>) -> BonusScheme {
        BonusScheme {
            id: 1,
            name: "test".to_string(),
            kind: BonusKind::TransactionThresholdCredit,
            credit_amount: dec!(25),
            currency: Currency::parse("USD").unwrap(),
            min_transaction_amount: Decimal::ZERO,
            loyalty: None,
            commission,
            tiers,
            eligibility: EligibilityRule::default(),
            starts_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            status: SchemeStatus::Active,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn standard_tiers() -> TierTable {
        TierTable::parse(vec![
            Tier {
                min: dec!(0),
                max: Some(dec!(1000)),
                value: dec!(50),
            },
            Tier {
                min: dec!(1001),
                max: Some(dec!(5000)),
                value: dec!(100),
            },
            Tier {
                min: dec!(5001),
                max: None,
                value: dec!(200),
            },
        ])
        .unwrap()
    }

    #[test]
    fn fixed_scheme_pays_flat_credit_without_a_transaction() {
        let amount = compute_bonus_amount(&scheme(CommissionMode::Fixed, None), None).unwrap();
        assert_eq!(amount, dec!(25));
    }

    #[test]
    fn percentage_scheme_requires_a_transaction() {
        let err = compute_bonus_amount(&scheme(CommissionMode::Percentage, None), None)
            .unwrap_err();
        assert_eq!(err, BonusRejection::TransactionRequired);

        let amount =
            compute_bonus_amount(&scheme(CommissionMode::Percentage, None), Some(dec!(400)))
                .unwrap();
        assert_eq!(amount, dec!(100));
    }

    #[test]
    fn tiered_scheme_resolves_each_band() {
        let s = scheme(CommissionMode::Fixed, Some(standard_tiers()));
        assert_eq!(compute_bonus_amount(&s, Some(dec!(500))).unwrap(), dec!(50));
        assert_eq!(
            compute_bonus_amount(&s, Some(dec!(1500))).unwrap(),
            dec!(100)
        );
        assert_eq!(
            compute_bonus_amount(&s, Some(dec!(500000))).unwrap(),
            dec!(200)
        );
    }

    #[test]
    fn tier_gap_is_a_hard_mismatch() {
        let s = scheme(CommissionMode::Fixed, Some(standard_tiers()));
        let err = compute_bonus_amount(&s, Some(dec!(1000.5))).unwrap_err();
        assert_eq!(err, BonusRejection::TierMismatch);
    }

    #[test]
    fn tiered_percentage_applies_tier_rate_to_amount() {
        let tiers = TierTable::parse(vec![
            Tier {
                min: dec!(0),
                max: Some(dec!(1000)),
                value: dec!(1),
            },
            Tier {
                min: dec!(1001),
                max: None,
                value: dec!(2),
            },
        ])
        .unwrap();
        let s = scheme(CommissionMode::Percentage, Some(tiers));
        assert_eq!(compute_bonus_amount(&s, Some(dec!(500))).unwrap(), dec!(5));
        assert_eq!(
            compute_bonus_amount(&s, Some(dec!(2000))).unwrap(),
            dec!(40)
        );
    }

    proptest! {
        #[test]
        fn tiered_lookup_never_pays_outside_the_matched_band(raw in 0u64..1_000_000) {
            let amount = Decimal::from(raw);
            let s = scheme(CommissionMode::Fixed, Some(standard_tiers()));
            match compute_bonus_amount(&s, Some(amount)) {
                Ok(value) => {
                    let expected = if amount <= dec!(1000) {
                        dec!(50)
                    } else if amount >= dec!(1001) && amount <= dec!(5000) {
                        dec!(100)
                    } else {
                        dec!(200)
                    };
                    prop_assert_eq!(value, expected);
                }
                Err(err) => prop_assert_eq!(err, BonusRejection::TierMismatch),
            }
        }
    }
}
