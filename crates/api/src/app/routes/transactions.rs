use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use agencyops_core::TransactionId;
use agencyops_infra::NewTransaction;

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit).get(history))
        .route("/queue", get(queue))
        .route("/:id", get(get_transaction))
        .route("/:id/claim", post(claim))
        .route("/:id/release", post(release))
        .route("/:id/reassign", post(reassign))
        .route("/:id/validate", post(validate))
        .route("/:id/reject", post(reject))
}

fn transaction_id(raw: &str) -> Result<TransactionId, Response> {
    errors::parse_id(raw, "transaction")
}

pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    ApiJson(body): ApiJson<NewTransaction>,
) -> Response {
    errors::respond(
        StatusCode::CREATED,
        services.engine().submit_transaction(ctx.user_id(), body),
    )
}

/// Agents see their own transactions, chefs their agency's, staff everything.
pub async fn history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Response {
    errors::respond(StatusCode::OK, services.engine().transaction_history(ctx.user_id()))
}

pub async fn queue(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Query(q): Query<dto::QueueQuery>,
) -> Response {
    errors::respond(StatusCode::OK, services.engine().transaction_queue(ctx.user_id(), q.view))
}

pub async fn get_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match transaction_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, services.engine().transaction_detail(ctx.user_id(), id))
}

pub async fn claim(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match transaction_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, services.engine().claim_transaction(ctx.user_id(), id))
}

pub async fn release(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match transaction_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, services.engine().release_transaction(ctx.user_id(), id))
}

pub async fn reassign(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::ReassignRequest>,
) -> Response {
    let id = match transaction_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        services.engine().reassign_transaction(ctx.user_id(), id, body.assignee),
    )
}

pub async fn validate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match transaction_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, services.engine().validate_transaction(ctx.user_id(), id))
}

pub async fn reject(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::RejectRequest>,
) -> Response {
    let id = match transaction_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        services.engine().reject_transaction(ctx.user_id(), id, &body.reason),
    )
}
