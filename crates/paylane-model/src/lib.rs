#![forbid(unsafe_code)]

pub mod ids;
pub mod ledger;
pub mod limits;
pub mod promo;
pub mod referral;
pub mod scheme;
pub mod transaction;

pub use ids::{Corridor, Currency, PaymentMethod, PromoCodeId};
pub use ledger::{EntryType, LedgerEntry, NewLedgerEntry, ReasonCode};
pub use limits::{BudgetLimit, UsageLimit};
pub use promo::{
    DiscountKind, NewPromoCode, PromoCode, PromoStatus, RedemptionRecord, RestrictionSet,
    SegmentRule,
};
pub use referral::{NewReferralRule, ReferralRule, RuleStatus};
pub use scheme::{
    BonusKind, BonusScheme, CommissionMode, EligibilityRule, LoyaltyRule, NewBonusScheme,
    SchemeStatus, Tier, TierTable,
};
pub use transaction::{NewTransaction, TransactionRecord};

pub use paylane_core::ValidationError;

pub const CRATE_NAME: &str = "paylane-model";
