use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use agencyops_core::RechargeId;
use agencyops_infra::NewRecharge;

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(request).get(mine))
        .route("/pending", get(pending))
        .route("/direct", post(direct))
        .route("/:id/approve", post(approve))
        .route("/:id/reject", post(reject))
}

pub async fn request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    ApiJson(body): ApiJson<NewRecharge>,
) -> Response {
    errors::respond(StatusCode::CREATED, services.engine().request_recharge(ctx.user_id(), body))
}

pub async fn mine(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Response {
    errors::respond(StatusCode::OK, services.engine().my_recharges(ctx.user_id()))
}

pub async fn pending(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Response {
    errors::respond(StatusCode::OK, services.engine().pending_recharges(ctx.user_id()))
}

/// Chef-to-agent transfer with no request behind it.
pub async fn direct(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    ApiJson(body): ApiJson<dto::DirectRechargeRequest>,
) -> Response {
    errors::respond(
        StatusCode::OK,
        services.engine().direct_recharge(ctx.user_id(), body.agent_id, body.amount),
    )
}

pub async fn approve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Response {
    let id: RechargeId = match errors::parse_id(&id, "recharge") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, services.engine().approve_recharge(ctx.user_id(), id))
}

pub async fn reject(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::RejectRequest>,
) -> Response {
    let id: RechargeId = match errors::parse_id(&id, "recharge") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        services.engine().reject_recharge(ctx.user_id(), id, &body.reason),
    )
}
