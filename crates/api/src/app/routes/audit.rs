//! Live feed of committed workflow transitions (Server-Sent Events).

use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::app::errors;
use crate::app::services::{self, AppServices};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/stream", get(stream))
}

/// GET /audit/stream
///
/// admin_general only. Each SSE event is named after the domain event
/// (`transactions.transaction.validated`...) and carries the JSON transition
/// record.
pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Response {
    let actor = match services.engine().actor(ctx.user_id()) {
        Ok(actor) => actor,
        Err(e) => return errors::workflow_error_to_response(e),
    };
    if !actor.is_admin_general() {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "permission_denied",
            "only admin_general may follow the audit stream",
        );
    }

    services::audit_sse_stream(services).into_response()
}
