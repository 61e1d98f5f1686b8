use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use agencyops_core::{DomainError, DomainResult, Money};

use crate::config::{CommissionConfig, CommissionTier, TierCommission};

/// Compute the commission owed for an operation of `principal`.
///
/// The config is re-validated on every call since it is read back from storage.
/// An uncovered amount is a `Config` error, never a silent zero.
pub fn compute_commission(principal: Money, config: &CommissionConfig) -> DomainResult<Money> {
    if principal.is_negative() {
        return Err(DomainError::validation("principal must not be negative"));
    }

    if let Err(err) = validate_commission_config(config) {
        tracing::error!(error = %err, "refusing to compute commission from invalid config");
        return Err(err);
    }

    match config {
        CommissionConfig::None => Ok(Money::ZERO),
        CommissionConfig::Fixed { amount } => Ok(*amount),
        CommissionConfig::Percentage { rate } => percent_of(principal, *rate),
        CommissionConfig::Tiers { tiers } => {
            let tier = tiers
                .iter()
                .find(|t| t.covers(principal))
                .ok_or_else(|| DomainError::config(format!("no tier covers amount {principal}")))?;
            apply_tier(tier.commission, principal)
        }
    }
}

/// Check that a commission config is well-formed.
///
/// Tiers must start at 0, be ascending and contiguous (`to + 1 == next.from`),
/// and only the last tier may (and must) be unbounded.
pub fn validate_commission_config(config: &CommissionConfig) -> DomainResult<()> {
    match config {
        CommissionConfig::None => Ok(()),
        CommissionConfig::Fixed { amount } => ensure_amount(*amount),
        CommissionConfig::Percentage { rate } => ensure_rate(*rate),
        CommissionConfig::Tiers { tiers } => validate_tiers(tiers),
    }
}

fn validate_tiers(tiers: &[CommissionTier]) -> DomainResult<()> {
    let Some(first) = tiers.first() else {
        return Err(DomainError::config("tier list is empty"));
    };
    if first.from != Money::ZERO {
        return Err(DomainError::config(format!(
            "first tier must start at 0 (starts at {})",
            first.from
        )));
    }

    let last_idx = tiers.len() - 1;
    for (idx, tier) in tiers.iter().enumerate() {
        match tier.commission {
            TierCommission::Amount(amount) => ensure_amount(amount)?,
            TierCommission::Percent(rate) => ensure_rate(rate)?,
        }

        match (tier.to, idx == last_idx) {
            (None, true) => {}
            (Some(_), true) => {
                return Err(DomainError::config("last tier must be unbounded"));
            }
            (None, false) => {
                return Err(DomainError::config(format!(
                    "only the last tier may be unbounded (tier {idx})"
                )));
            }
            (Some(to), false) => {
                if to < tier.from {
                    return Err(DomainError::config(format!(
                        "tier {idx} ends ({to}) before it starts ({})",
                        tier.from
                    )));
                }
                let next_from = tiers[idx + 1].from;
                let expected = to
                    .checked_add(Money::new(1))
                    .map_err(|_| DomainError::config(format!("tier {idx} upper bound overflows")))?;
                if next_from != expected {
                    return Err(DomainError::config(format!(
                        "tiers {idx} and {} are not contiguous ({to} then {next_from})",
                        idx + 1
                    )));
                }
            }
        }
    }

    Ok(())
}

fn ensure_amount(amount: Money) -> DomainResult<()> {
    if amount.is_negative() {
        return Err(DomainError::config(format!("commission amount {amount} is negative")));
    }
    Ok(())
}

fn ensure_rate(rate: Decimal) -> DomainResult<()> {
    if rate.is_sign_negative() || rate > Decimal::ONE_HUNDRED {
        return Err(DomainError::config(format!("commission rate {rate}% is out of range")));
    }
    Ok(())
}

fn apply_tier(commission: TierCommission, principal: Money) -> DomainResult<Money> {
    match commission {
        TierCommission::Amount(amount) => Ok(amount),
        TierCommission::Percent(rate) => percent_of(principal, rate),
    }
}

/// `principal * rate / 100`, rounded half-up to whole units.
fn percent_of(principal: Money, rate: Decimal) -> DomainResult<Money> {
    let raw = Decimal::from(principal.units())
        .checked_mul(rate)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| DomainError::validation("commission overflow"))?;

    raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .map(Money::new)
        .ok_or_else(|| DomainError::validation("commission overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn transfer_schedule() -> CommissionConfig {
        CommissionConfig::Tiers {
            tiers: vec![
                CommissionTier::bounded(0, 50_000, TierCommission::Amount(Money::new(250))),
                CommissionTier::bounded(50_001, 200_000, TierCommission::Percent(dec!(1))),
                CommissionTier::unbounded(200_001, TierCommission::Percent(dec!(0.8))),
            ],
        }
    }

    fn commission(principal: i64, cfg: &CommissionConfig) -> i64 {
        compute_commission(Money::new(principal), cfg).unwrap().units()
    }

    #[test]
    fn tiered_schedule_picks_the_covering_tier() {
        let cfg = transfer_schedule();
        assert_eq!(commission(30_000, &cfg), 250);
        assert_eq!(commission(50_000, &cfg), 250);
        assert_eq!(commission(100_000, &cfg), 1_000);
        assert_eq!(commission(500_000, &cfg), 4_000);
        assert_eq!(commission(0, &cfg), 250);
    }

    #[test]
    fn fixed_ignores_principal() {
        let cfg = CommissionConfig::Fixed { amount: Money::new(100) };
        assert_eq!(commission(12_500, &cfg), 100);
        assert_eq!(commission(0, &cfg), 100);
    }

    #[test]
    fn none_is_zero() {
        assert_eq!(commission(75_000, &CommissionConfig::None), 0);
    }

    #[test]
    fn percentage_rounds_half_up() {
        let cfg = CommissionConfig::Percentage { rate: dec!(1.5) };
        assert_eq!(commission(1_000, &cfg), 15);
        // 1.5% of 1_001 = 15.015
        assert_eq!(commission(1_001, &cfg), 15);

        let cfg = CommissionConfig::Percentage { rate: dec!(1) };
        // 0.5 rounds up, 0.49 rounds down
        assert_eq!(commission(50, &cfg), 1);
        assert_eq!(commission(49, &cfg), 0);
        assert_eq!(commission(150, &cfg), 2);
    }

    #[test]
    fn negative_principal_is_a_validation_error() {
        let err = compute_commission(Money::new(-1), &CommissionConfig::None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn gap_between_tiers_is_a_config_error_not_zero() {
        let cfg = CommissionConfig::Tiers {
            tiers: vec![
                CommissionTier::bounded(0, 50_000, TierCommission::Amount(Money::new(250))),
                CommissionTier::unbounded(60_000, TierCommission::Percent(dec!(1))),
            ],
        };
        let err = compute_commission(Money::new(55_000), &cfg).unwrap_err();
        assert!(matches!(err, DomainError::Config(_)));
        // Covered amounts are refused too: the whole config is corrupt.
        assert!(compute_commission(Money::new(10), &cfg).is_err());
    }

    #[test]
    fn malformed_tier_layouts_are_rejected() {
        let overlapping = CommissionConfig::Tiers {
            tiers: vec![
                CommissionTier::bounded(0, 100, TierCommission::Amount(Money::new(1))),
                CommissionTier::unbounded(50, TierCommission::Amount(Money::new(2))),
            ],
        };
        let bounded_last = CommissionConfig::Tiers {
            tiers: vec![CommissionTier::bounded(0, 100, TierCommission::Amount(Money::new(1)))],
        };
        let unbounded_middle = CommissionConfig::Tiers {
            tiers: vec![
                CommissionTier::unbounded(0, TierCommission::Amount(Money::new(1))),
                CommissionTier::unbounded(101, TierCommission::Amount(Money::new(2))),
            ],
        };
        let not_from_zero = CommissionConfig::Tiers {
            tiers: vec![CommissionTier::unbounded(1, TierCommission::Amount(Money::new(1)))],
        };
        let inverted = CommissionConfig::Tiers {
            tiers: vec![
                CommissionTier::bounded(0, 100, TierCommission::Amount(Money::new(1))),
                CommissionTier::bounded(101, 50, TierCommission::Amount(Money::new(1))),
                CommissionTier::unbounded(51, TierCommission::Amount(Money::new(1))),
            ],
        };
        let empty = CommissionConfig::Tiers { tiers: vec![] };

        for cfg in [overlapping, bounded_last, unbounded_middle, not_from_zero, inverted, empty] {
            assert!(
                matches!(validate_commission_config(&cfg), Err(DomainError::Config(_))),
                "expected config error for {cfg:?}"
            );
        }
    }

    #[test]
    fn out_of_range_rates_and_amounts_are_rejected() {
        assert!(validate_commission_config(&CommissionConfig::Percentage { rate: dec!(100.5) }).is_err());
        assert!(validate_commission_config(&CommissionConfig::Percentage { rate: dec!(-1) }).is_err());
        assert!(validate_commission_config(&CommissionConfig::Fixed { amount: Money::new(-5) }).is_err());
        assert!(validate_commission_config(&CommissionConfig::Percentage { rate: dec!(100) }).is_ok());
    }

    fn tier_commission() -> impl Strategy<Value = TierCommission> {
        prop_oneof![
            (0i64..10_000).prop_map(|u| TierCommission::Amount(Money::new(u))),
            (0i64..=1_000).prop_map(|tenths| TierCommission::Percent(Decimal::new(tenths, 1))),
        ]
    }

    fn valid_tiers() -> impl Strategy<Value = CommissionConfig> {
        (
            prop::collection::vec((1i64..1_000_000, tier_commission()), 0..6),
            tier_commission(),
        )
            .prop_map(|(bounded, last)| {
                let mut tiers = Vec::new();
                let mut from = 0i64;
                for (width, commission) in bounded {
                    let to = from + width - 1;
                    tiers.push(CommissionTier::bounded(from, to, commission));
                    from = to + 1;
                }
                tiers.push(CommissionTier::unbounded(from, last));
                CommissionConfig::Tiers { tiers }
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every non-negative principal is covered by a valid tier schedule.
        #[test]
        fn valid_tiers_cover_every_principal(cfg in valid_tiers(), principal in 0i64..10_000_000_000) {
            prop_assert!(validate_commission_config(&cfg).is_ok());
            let out = compute_commission(Money::new(principal), &cfg);
            prop_assert!(out.is_ok());
            prop_assert!(!out.unwrap().is_negative());
        }

        /// Property: a percentage commission never exceeds the principal.
        #[test]
        fn percentage_is_bounded_by_principal(tenths in 0i64..=1_000, principal in 0i64..1_000_000_000) {
            let cfg = CommissionConfig::Percentage { rate: Decimal::new(tenths, 1) };
            let out = compute_commission(Money::new(principal), &cfg).unwrap();
            prop_assert!(out <= Money::new(principal));
        }
    }
}
