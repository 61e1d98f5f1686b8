//! Proof/attachment upload. The returned `reference` is what a transaction
//! submission cites as `proof_ref`.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Extension},
    http::{HeaderMap, StatusCode, header},
    response::Response,
    routing::post,
};

use agencyops_infra::MAX_PROOF_BYTES;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(upload))
        // Leave room for the engine to answer an oversized file itself.
        .layer(DefaultBodyLimit::max(MAX_PROOF_BYTES + 1))
}

/// POST /proofs
///
/// Raw file body; the `Content-Type` header names its format.
pub async fn upload(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    errors::respond(
        StatusCode::CREATED,
        services.engine().upload_proof(ctx.user_id(), &body, content_type),
    )
}
