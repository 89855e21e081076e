use paylane_core::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

pub const PROMO_CODE_MAX_LEN: usize = 32;
pub const PAYMENT_METHOD_MAX_LEN: usize = 32;

/// ISO-4217-style currency code, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct Currency(String);

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl Currency {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.len() != 3 || !s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError(format!(
                "currency must be a 3-letter code, got {input:?}"
            )));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered source-destination currency pair defining a transfer route.
///
/// Canonical text form is `SRC-DST`, e.g. `USD-PHP`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Corridor {
    pub source: Currency,
    pub dest: Currency,
}

impl Corridor {
    #[must_use]
    pub fn new(source: Currency, dest: Currency) -> Self {
        Self { source, dest }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let Some((src, dst)) = input.trim().split_once('-') else {
            return Err(ValidationError(format!(
                "corridor must be SRC-DST, got {input:?}"
            )));
        };
        Ok(Self {
            source: Currency::parse(src)?,
            dest: Currency::parse(dst)?,
        })
    }

    #[must_use]
    pub fn canonical_string(&self) -> String {
        format!("{}-{}", self.source, self.dest)
    }
}

impl Display for Corridor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.source, self.dest)
    }
}

impl Serialize for Corridor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical_string())
    }
}

impl<'de> Deserialize<'de> for Corridor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Payment method tag, normalized to lowercase snake form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct PaymentMethod(String);

impl<'de> Deserialize<'de> for PaymentMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl PaymentMethod {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim().to_ascii_lowercase();
        if s.is_empty() {
            return Err(ValidationError("payment method must not be empty".to_string()));
        }
        if s.len() > PAYMENT_METHOD_MAX_LEN {
            return Err(ValidationError(format!(
                "payment method exceeds max length {PAYMENT_METHOD_MAX_LEN}"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(ValidationError(
                "payment method must match [a-z0-9_-]+".to_string(),
            ));
        }
        Ok(Self(s))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Promo code identifier. Codes are case-insensitive; the canonical form is
/// uppercase and all lookups go through it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct PromoCodeId(String);

impl<'de> Deserialize<'de> for PromoCodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl PromoCodeId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim().to_ascii_uppercase();
        if s.is_empty() {
            return Err(ValidationError("promo code must not be empty".to_string()));
        }
        if s.len() > PROMO_CODE_MAX_LEN {
            return Err(ValidationError(format!(
                "promo code exceeds max length {PROMO_CODE_MAX_LEN}"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(ValidationError(
                "promo code must match [A-Z0-9_-]+".to_string(),
            ));
        }
        Ok(Self(s))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PromoCodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_normalizes_to_uppercase() {
        assert_eq!(Currency::parse("usd").unwrap().as_str(), "USD");
        assert_eq!(Currency::parse(" php ").unwrap().as_str(), "PHP");
    }

    #[test]
    fn currency_rejects_bad_codes() {
        assert!(Currency::parse("").is_err());
        assert!(Currency::parse("US").is_err());
        assert!(Currency::parse("USDT").is_err());
        assert!(Currency::parse("U5D").is_err());
    }

    #[test]
    fn corridor_round_trips_canonical_form() {
        let corridor = Corridor::parse("usd-php").unwrap();
        assert_eq!(corridor.canonical_string(), "USD-PHP");
        assert_eq!(Corridor::parse("USD-PHP").unwrap(), corridor);
    }

    #[test]
    fn corridor_rejects_missing_separator() {
        assert!(Corridor::parse("USDPHP").is_err());
    }

    #[test]
    fn promo_code_is_case_insensitive() {
        let a = PromoCodeId::parse("save20").unwrap();
        let b = PromoCodeId::parse("SAVE20").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "SAVE20");
    }

    #[test]
    fn payment_method_normalizes() {
        assert_eq!(
            PaymentMethod::parse(" Bank_Transfer ").unwrap().as_str(),
            "bank_transfer"
        );
        assert!(PaymentMethod::parse("").is_err());
        assert!(PaymentMethod::parse("has space").is_err());
    }
}
