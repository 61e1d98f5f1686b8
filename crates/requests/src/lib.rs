//! `agencyops-requests` — support tickets.
//!
//! Same claim/finalize pattern as transactions, with a single terminal state:
//! a request is always resolved with a response, never rejected.

pub mod request;

pub use request::{
    ClaimRequest, ReassignRequest, ReleaseRequest, RequestClaimed, RequestReassigned, RequestReleased,
    RequestResolved, RequestStatus, RequestSubmitted, ResolveRequest, SubmitRequest, SupportRequest,
    SupportRequestCommand, SupportRequestEvent,
};
