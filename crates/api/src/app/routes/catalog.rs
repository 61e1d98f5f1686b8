use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
};

use agencyops_catalog::OperationType;
use agencyops_core::{AgencyId, OperationTypeId};

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/operation-types", get(available).post(register))
        .route("/operation-types/:id/status", post(set_status))
        .route("/agencies/:id/access", put(set_access))
}

/// Active operation types the caller's agency may submit.
pub async fn available(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> Response {
    errors::respond(StatusCode::OK, services.engine().available_operation_types(ctx.user_id()))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    ApiJson(body): ApiJson<OperationType>,
) -> Response {
    errors::respond(
        StatusCode::CREATED,
        services.engine().register_operation_type(ctx.user_id(), body),
    )
}

pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::SetOperationTypeStatusRequest>,
) -> Response {
    let id: OperationTypeId = match errors::parse_id(&id, "operation type") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        services
            .engine()
            .set_operation_type_status(ctx.user_id(), &id, body.status),
    )
}

pub async fn set_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::AgencyAccessRequest>,
) -> Response {
    let agency: AgencyId = match errors::parse_id(&id, "agency") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        services
            .engine()
            .set_agency_access(ctx.user_id(), agency, body.op_type_ids),
    )
}
