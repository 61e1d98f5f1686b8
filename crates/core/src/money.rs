//! Monetary amounts in the system's single currency.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Amount in the currency's smallest unit.
///
/// The system currency has no minor unit, so one `Money` unit is one franc.
/// All arithmetic is checked; overflow surfaces as a validation error rather
/// than wrapping.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn new(units: i64) -> Self {
        Self(units)
    }

    pub const fn units(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    pub fn checked_sub(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_is_checked() {
        assert_eq!(Money::new(50_000).checked_add(Money::new(250)).unwrap(), Money::new(50_250));
        assert!(Money::new(i64::MAX).checked_add(Money::new(1)).is_err());
        assert!(Money::new(i64::MIN).checked_sub(Money::new(1)).is_err());
    }

    #[test]
    fn serializes_as_bare_number() {
        let json = serde_json::to_string(&Money::new(4000)).unwrap();
        assert_eq!(json, "4000");
    }

    proptest::proptest! {
        #[test]
        fn add_then_sub_restores_the_amount(a in -1_000_000_000i64..1_000_000_000, b in -1_000_000_000i64..1_000_000_000) {
            let sum = Money::new(a).checked_add(Money::new(b)).unwrap();
            proptest::prop_assert_eq!(sum.checked_sub(Money::new(b)).unwrap(), Money::new(a));
        }
    }
}
