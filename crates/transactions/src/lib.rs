//! `agencyops-transactions` — the financial operation state machine.
//!
//! ```text
//! PendingValidation ──claim──▶ Assigned ──validate──▶ Validated
//!        ▲                        │    └───reject───▶ Rejected
//!        └────────release─────────┘
//! ```

pub mod transaction;

pub use transaction::{
    ClaimTransaction, ReassignTransaction, RejectTransaction, ReleaseTransaction, SubmitTransaction,
    Transaction, TransactionClaimed, TransactionCommand, TransactionEvent, TransactionReassigned,
    TransactionRejected, TransactionReleased, TransactionStatus, TransactionSubmitted,
    TransactionValidated, ValidateTransaction,
};
