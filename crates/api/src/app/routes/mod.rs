use axum::{Router, routing::get};

pub mod accounts;
pub mod audit;
pub mod catalog;
pub mod proofs;
pub mod recharges;
pub mod requests;
pub mod stats;
pub mod system;
pub mod transactions;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/transactions", transactions::router())
        .nest("/proofs", proofs::router())
        .nest("/recharges", recharges::router())
        .nest("/requests", requests::router())
        .nest("/accounts", accounts::router())
        .nest("/catalog", catalog::router())
        .nest("/stats", stats::router())
        .nest("/audit", audit::router())
}
