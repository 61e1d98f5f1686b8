use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::post,
};

use agencyops_auth::SubAdminPermissions;
use agencyops_core::UserId;

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/commissions/transfer", post(transfer_commissions))
        .route("/:id/status", post(set_status))
        .route("/:id/permissions", post(set_permissions))
}

pub async fn transfer_commissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    ApiJson(body): ApiJson<dto::TransferCommissionsRequest>,
) -> Response {
    errors::respond(
        StatusCode::OK,
        services.engine().transfer_commissions(ctx.user_id(), body.amount),
    )
}

pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::SetStatusRequest>,
) -> Response {
    let target: UserId = match errors::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        services
            .engine()
            .set_user_status(ctx.user_id(), target, body.status, body.reason),
    )
}

pub async fn set_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SubAdminPermissions>,
) -> Response {
    let target: UserId = match errors::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        services.engine().set_sub_admin_permissions(ctx.user_id(), target, body),
    )
}
