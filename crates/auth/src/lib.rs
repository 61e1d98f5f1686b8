//! `agencyops-auth` — authorization boundary for the workflows.
//!
//! Authentication itself is external: this crate validates already-issued
//! token claims and decides, per actor, which workflow actions are legal.
//! It is decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{Action, AuthzError, Grant, Resource, Workflow, authorize, can_perform};
pub use claims::{Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError, validate_claims};
pub use permissions::SubAdminPermissions;
pub use principal::Actor;
pub use roles::Role;
