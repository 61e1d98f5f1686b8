//! Engine configuration, loaded from `AGENCYOPS_*` environment variables.
//!
//! Invalid values never abort startup: they are logged and replaced by the
//! default.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use agencyops_core::Money;

/// Platform fee charged when no per-agency override exists.
pub const DEFAULT_FEE: Money = Money::new(250);

/// Who is credited the commission of a validated transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionBeneficiary {
    #[default]
    Agent,
    /// The agency chef; falls back to the agent when the agency has none.
    Chef,
}

impl FromStr for CommissionBeneficiary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agent" => Ok(Self::Agent),
            "chef" | "chef_agence" => Ok(Self::Chef),
            other => Err(format!("unknown commission beneficiary '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub default_fee: Money,
    pub commission_beneficiary: CommissionBeneficiary,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_fee: DEFAULT_FEE,
            commission_beneficiary: CommissionBeneficiary::Agent,
        }
    }
}

impl EngineConfig {
    /// - `AGENCYOPS_DEFAULT_FEE`: non-negative integer (default 250)
    /// - `AGENCYOPS_COMMISSION_BENEFICIARY`: `agent` | `chef` (default `agent`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("AGENCYOPS_DEFAULT_FEE") {
            match raw.trim().parse::<i64>() {
                Ok(units) if units >= 0 => config.default_fee = Money::new(units),
                _ => tracing::warn!(value = %raw, "invalid AGENCYOPS_DEFAULT_FEE; using {DEFAULT_FEE}"),
            }
        }

        if let Some(raw) = lookup("AGENCYOPS_COMMISSION_BENEFICIARY") {
            match raw.parse() {
                Ok(beneficiary) => config.commission_beneficiary = beneficiary,
                Err(err) => tracing::warn!(error = %err, "invalid AGENCYOPS_COMMISSION_BENEFICIARY; using agent"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(load(&[]), EngineConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = load(&[
            ("AGENCYOPS_DEFAULT_FEE", "300"),
            ("AGENCYOPS_COMMISSION_BENEFICIARY", "Chef"),
        ]);
        assert_eq!(cfg.default_fee, Money::new(300));
        assert_eq!(cfg.commission_beneficiary, CommissionBeneficiary::Chef);
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = load(&[
            ("AGENCYOPS_DEFAULT_FEE", "-1"),
            ("AGENCYOPS_COMMISSION_BENEFICIARY", "banque"),
        ]);
        assert_eq!(cfg, EngineConfig::default());
    }
}
