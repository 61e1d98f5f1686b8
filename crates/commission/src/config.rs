use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use agencyops_core::{DomainError, Money, ValueObject};

/// Commission schedule attached to an operation type.
///
/// Serialized with an internal `type` tag, matching the catalog JSON:
/// `{"type":"tiers","tiers":[{"from":0,"to":50000,"commission":"250"}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CommissionConfig {
    None,
    Fixed { amount: Money },
    /// `rate` is a percentage (1.5 means 1.5%).
    Percentage { rate: Decimal },
    Tiers { tiers: Vec<CommissionTier> },
}

impl ValueObject for CommissionConfig {}

impl Default for CommissionConfig {
    fn default() -> Self {
        CommissionConfig::None
    }
}

/// One bracket of a tiered schedule. `to: None` is the unbounded last tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionTier {
    pub from: Money,
    pub to: Option<Money>,
    pub commission: TierCommission,
}

impl CommissionTier {
    pub fn bounded(from: i64, to: i64, commission: TierCommission) -> Self {
        Self {
            from: Money::new(from),
            to: Some(Money::new(to)),
            commission,
        }
    }

    pub fn unbounded(from: i64, commission: TierCommission) -> Self {
        Self {
            from: Money::new(from),
            to: None,
            commission,
        }
    }

    /// Whether `principal` falls inside this bracket (both ends inclusive).
    pub fn covers(&self, principal: Money) -> bool {
        self.from <= principal && self.to.is_none_or(|to| principal <= to)
    }
}

/// Commission of a single tier: an absolute amount or a percentage.
///
/// On the wire an amount is a number or a numeric string (`250`, `"250"`);
/// a percentage is a string with a `%` suffix (`"0.8%"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierCommission {
    Amount(Money),
    Percent(Decimal),
}

impl FromStr for TierCommission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rate) = s.strip_suffix('%') {
            let rate = Decimal::from_str(rate.trim())
                .map_err(|e| DomainError::config(format!("invalid tier percentage '{s}': {e}")))?;
            return Ok(TierCommission::Percent(rate));
        }
        let units = s
            .parse::<i64>()
            .map_err(|e| DomainError::config(format!("invalid tier amount '{s}': {e}")))?;
        Ok(TierCommission::Amount(Money::new(units)))
    }
}

impl core::fmt::Display for TierCommission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TierCommission::Amount(m) => write!(f, "{m}"),
            TierCommission::Percent(rate) => write!(f, "{}%", rate.normalize()),
        }
    }
}

impl Serialize for TierCommission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TierCommission::Amount(m) => serializer.serialize_i64(m.units()),
            TierCommission::Percent(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for TierCommission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Units(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Units(units) => Ok(TierCommission::Amount(Money::new(units))),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_catalog_tier_json() {
        let json = r#"{
            "type": "tiers",
            "tiers": [
                {"from": 0, "to": 50000, "commission": "250"},
                {"from": 50001, "to": 200000, "commission": "1%"},
                {"from": 200001, "to": null, "commission": "0.8%"}
            ]
        }"#;

        let cfg: CommissionConfig = serde_json::from_str(json).unwrap();
        let CommissionConfig::Tiers { tiers } = cfg else {
            panic!("expected tiers");
        };
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].commission, TierCommission::Amount(Money::new(250)));
        assert_eq!(tiers[1].commission, TierCommission::Percent(dec!(1)));
        assert_eq!(tiers[2].commission, TierCommission::Percent(dec!(0.8)));
        assert_eq!(tiers[2].to, None);
    }

    #[test]
    fn parses_flat_configs() {
        let fixed: CommissionConfig = serde_json::from_str(r#"{"type":"fixed","amount":100}"#).unwrap();
        assert_eq!(fixed, CommissionConfig::Fixed { amount: Money::new(100) });

        let pct: CommissionConfig = serde_json::from_str(r#"{"type":"percentage","rate":1.5}"#).unwrap();
        assert_eq!(pct, CommissionConfig::Percentage { rate: dec!(1.5) });

        let none: CommissionConfig = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
        assert_eq!(none, CommissionConfig::None);
    }

    #[test]
    fn numeric_tier_commission_is_an_amount() {
        let tier: CommissionTier =
            serde_json::from_str(r#"{"from": 0, "to": null, "commission": 75}"#).unwrap();
        assert_eq!(tier.commission, TierCommission::Amount(Money::new(75)));
    }

    #[test]
    fn garbage_tier_commission_is_rejected() {
        let res: Result<CommissionTier, _> =
            serde_json::from_str(r#"{"from": 0, "to": null, "commission": "abc%"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn percent_serializes_with_suffix() {
        let json = serde_json::to_string(&TierCommission::Percent(dec!(0.80))).unwrap();
        assert_eq!(json, r#""0.8%""#);
        let json = serde_json::to_string(&TierCommission::Amount(Money::new(250))).unwrap();
        assert_eq!(json, "250");
    }

    #[test]
    fn bounds_are_inclusive() {
        let tier = CommissionTier::bounded(50_001, 200_000, TierCommission::Percent(dec!(1)));
        assert!(!tier.covers(Money::new(50_000)));
        assert!(tier.covers(Money::new(50_001)));
        assert!(tier.covers(Money::new(200_000)));
        assert!(!tier.covers(Money::new(200_001)));
    }
}
