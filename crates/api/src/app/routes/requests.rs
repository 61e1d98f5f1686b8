use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use agencyops_core::RequestId;
use agencyops_infra::NewSupportRequest;

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit).get(mine))
        .route("/queue", get(queue))
        .route("/:id", get(get_request))
        .route("/:id/claim", post(claim))
        .route("/:id/release", post(release))
        .route("/:id/reassign", post(reassign))
        .route("/:id/resolve", post(resolve))
}

fn request_id(raw: &str) -> Result<RequestId, Response> {
    errors::parse_id(raw, "request")
}

pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    ApiJson(body): ApiJson<NewSupportRequest>,
) -> Response {
    errors::respond(
        StatusCode::CREATED,
        services.engine().submit_support_request(ctx.user_id(), body),
    )
}

pub async fn mine(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Response {
    errors::respond(StatusCode::OK, services.engine().my_support_requests(ctx.user_id()))
}

pub async fn queue(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Query(q): Query<dto::QueueQuery>,
) -> Response {
    errors::respond(
        StatusCode::OK,
        services.engine().support_request_queue(ctx.user_id(), q.view),
    )
}

pub async fn get_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match request_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, services.engine().support_request(ctx.user_id(), id))
}

pub async fn claim(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match request_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, services.engine().claim_support_request(ctx.user_id(), id))
}

pub async fn release(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match request_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, services.engine().release_support_request(ctx.user_id(), id))
}

pub async fn reassign(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::ReassignRequest>,
) -> Response {
    let id = match request_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        services.engine().reassign_support_request(ctx.user_id(), id, body.assignee),
    )
}

pub async fn resolve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::ResolveRequest>,
) -> Response {
    let id = match request_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        services.engine().resolve_support_request(ctx.user_id(), id, &body.reponse),
    )
}
