use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Usage-count cap. The wire convention inherited from the admin portal is
/// `-1` for unlimited, any non-negative integer for a finite cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageLimit {
    Unlimited,
    Capped(u64),
}

impl UsageLimit {
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Self::Unlimited
        } else {
            Self::Capped(raw as u64)
        }
    }

    #[must_use]
    pub fn as_raw(self) -> i64 {
        match self {
            Self::Unlimited => -1,
            Self::Capped(n) => n as i64,
        }
    }

    /// Whether one more use is allowed given the current count.
    #[must_use]
    pub fn allows(self, current: u64) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Capped(cap) => current < cap,
        }
    }

    #[must_use]
    pub fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

impl Serialize for UsageLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_raw())
    }
}

impl<'de> Deserialize<'de> for UsageLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_raw(i64::deserialize(deserializer)?))
    }
}

/// Cumulative-discount budget cap. `-1` on the wire means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLimit {
    Unlimited,
    Capped(Decimal),
}

impl BudgetLimit {
    #[must_use]
    pub fn from_raw(raw: Decimal) -> Self {
        if raw.is_sign_negative() {
            Self::Unlimited
        } else {
            Self::Capped(raw)
        }
    }

    #[must_use]
    pub fn as_raw(self) -> Decimal {
        match self {
            Self::Unlimited => Decimal::NEGATIVE_ONE,
            Self::Capped(cap) => cap,
        }
    }

    /// Evaluator check: more budget remains while the utilized total is
    /// strictly below the cap.
    #[must_use]
    pub fn has_headroom(self, utilized: Decimal) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Capped(cap) => utilized < cap,
        }
    }

    /// Commit check: the utilized total after adding `amount` must not
    /// exceed the cap.
    #[must_use]
    pub fn admits(self, utilized: Decimal, amount: Decimal) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Capped(cap) => utilized + amount <= cap,
        }
    }

    #[must_use]
    pub fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

impl Serialize for BudgetLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.as_raw(), serializer)
    }
}

impl<'de> Deserialize<'de> for BudgetLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_raw(<Decimal as Deserialize>::deserialize(
            deserializer,
        )?))
    }
}
