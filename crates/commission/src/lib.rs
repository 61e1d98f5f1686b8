//! Commission engine: fixed, percentage and tiered schedules.
//!
//! Pure functions only: no IO, no storage. Amounts are [`Money`] in the
//! currency's smallest unit; rates are exact decimals.
//!
//! [`Money`]: agencyops_core::Money

pub mod compute;
pub mod config;

pub use compute::{compute_commission, validate_commission_config};
pub use config::{CommissionConfig, CommissionTier, TierCommission};
