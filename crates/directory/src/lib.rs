//! `agencyops-directory` — users (profiles), agencies and balance changes.

pub mod agency;
pub mod profile;

pub use agency::Agency;
pub use profile::{Profile, ProfileChange, ProfileStatus};
