//! `agencyops-recharges` — agent balance top-up requests.
//!
//! Ownership is fixed at creation by the agency hierarchy: only the agency's
//! chef (or admin_general) decides, there is no claim queue.

pub mod recharge;

pub use recharge::{
    ApproveRecharge, RechargeApproved, RechargeCommand, RechargeEvent, RechargeRejected, RechargeRequest,
    RechargeRequested, RechargeStatus, RejectRecharge, RequestRecharge,
};
