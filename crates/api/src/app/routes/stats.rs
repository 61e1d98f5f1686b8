use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
};

use agencyops_core::UserId;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/me", get(mine))
        .route("/users/:id", get(for_user))
        .route("/global", get(global))
        .route("/agencies", get(agencies))
        .route("/sub-admins", get(sub_admins))
}

/// The caller's own dashboard, shaped by their role.
pub async fn mine(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Response {
    errors::respond(StatusCode::OK, services.engine().dashboard(ctx.user_id(), ctx.user_id()))
}

pub async fn for_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Response {
    let target: UserId = match errors::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, services.engine().dashboard(ctx.user_id(), target))
}

pub async fn global(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Response {
    errors::respond(StatusCode::OK, services.engine().global_dashboard(ctx.user_id()))
}

pub async fn agencies(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Response {
    errors::respond(StatusCode::OK, services.engine().agency_list_with_stats(ctx.user_id()))
}

pub async fn sub_admins(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Response {
    errors::respond(StatusCode::OK, services.engine().sub_admin_list_with_stats(ctx.user_id()))
}
