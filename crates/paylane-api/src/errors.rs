// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

/// Closed set of machine-readable error codes the API emits. Wire form is
/// SCREAMING_SNAKE, matching the portal contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiErrorCode {
    ValidationFailed,
    MissingField,
    NotFound,
    DuplicateCode,
    DuplicateCurrency,
    PromoNotFound,
    PromoExpiredOrInactive,
    UsageCapReached,
    BudgetCapReached,
    BelowMinThreshold,
    CorridorNotAllowed,
    MethodNotAllowed,
    PerUserCapReached,
    AffiliateNotAllowed,
    SchemeNotFound,
    SchemeExpired,
    SchemeInactive,
    AlreadyEarned,
    TierMismatch,
    TransactionRequired,
    TransactionNotFound,
    Internal,
}

impl ApiErrorCode {
    pub const ALL: &'static [Self] = &[
        Self::ValidationFailed,
        Self::MissingField,
        Self::NotFound,
        Self::DuplicateCode,
        Self::DuplicateCurrency,
        Self::PromoNotFound,
        Self::PromoExpiredOrInactive,
        Self::UsageCapReached,
        Self::BudgetCapReached,
        Self::BelowMinThreshold,
        Self::CorridorNotAllowed,
        Self::MethodNotAllowed,
        Self::PerUserCapReached,
        Self::AffiliateNotAllowed,
        Self::SchemeNotFound,
        Self::SchemeExpired,
        Self::SchemeInactive,
        Self::AlreadyEarned,
        Self::TierMismatch,
        Self::TransactionRequired,
        Self::TransactionNotFound,
        Self::Internal,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::MissingField => "MISSING_FIELD",
            Self::NotFound => "NOT_FOUND",
            Self::DuplicateCode => "DUPLICATE_CODE",
            Self::DuplicateCurrency => "DUPLICATE_CURRENCY",
            Self::PromoNotFound => "PROMO_NOT_FOUND",
            Self::PromoExpiredOrInactive => "PROMO_EXPIRED_OR_INACTIVE",
            Self::UsageCapReached => "USAGE_CAP_REACHED",
            Self::BudgetCapReached => "BUDGET_CAP_REACHED",
            Self::BelowMinThreshold => "BELOW_MIN_THRESHOLD",
            Self::CorridorNotAllowed => "CORRIDOR_NOT_ALLOWED",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::PerUserCapReached => "PER_USER_CAP_REACHED",
            Self::AffiliateNotAllowed => "AFFILIATE_NOT_ALLOWED",
            Self::SchemeNotFound => "SCHEME_NOT_FOUND",
            Self::SchemeExpired => "SCHEME_EXPIRED",
            Self::SchemeInactive => "SCHEME_INACTIVE",
            Self::AlreadyEarned => "ALREADY_EARNED",
            Self::TierMismatch => "TIER_MISMATCH",
            Self::TransactionRequired => "TRANSACTION_REQUIRED",
            Self::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            Self::Internal => "INTERNAL",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == raw)
    }
}

impl std::fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ApiErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApiErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown error code {raw:?}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ValidationFailed, message, json!({}))
    }

    #[must_use]
    pub fn missing_field(name: &str) -> Self {
        Self::new(
            ApiErrorCode::MissingField,
            format!("missing required field: {name}"),
            json!({"field": name}),
        )
    }

    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::new(ApiErrorCode::NotFound, format!("{what} not found"), json!({}))
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message, json!({}))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
