// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod bonus;
pub mod promo;
pub mod service;

pub use bonus::{compute_bonus_amount, BonusRejection, CREDIT_EXPIRY_DAYS};
pub use promo::{evaluate_promo, PromoQuote, PromoRejection, TransactionContext};
pub use service::{
    AdjustmentOutcome, AwardedCredit, CreditError, CreditService, CreditStatement,
    ManualAdjustment, PromoError, PromoService, ValidatedPromo,
};

pub const CRATE_NAME: &str = "paylane-rules";
