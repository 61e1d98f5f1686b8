use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use agencyops_infra::WorkflowError;

pub fn status_for(err: &WorkflowError) -> StatusCode {
    match err {
        WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
        WorkflowError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::AlreadyClaimed { .. } | WorkflowError::AlreadyFinalized(_) | WorkflowError::Conflict(_) => {
            StatusCode::CONFLICT
        }
        WorkflowError::Config(_) | WorkflowError::InsufficientFunds { .. } | WorkflowError::NoAgencyChef(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        WorkflowError::Publish(_) => StatusCode::BAD_GATEWAY,
    }
}

pub fn workflow_error_to_response(err: WorkflowError) -> Response {
    let status = status_for(&err);
    let mut body = json!({
        "error": err.code(),
        "message": err.to_string(),
    });
    if let WorkflowError::AlreadyClaimed { holder } = &err {
        body["holder"] = json!(holder.to_string());
    }
    (status, Json(body)).into_response()
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Serialize a workflow outcome with `status`, or map its error.
pub fn respond<T: Serialize>(status: StatusCode, result: Result<T, WorkflowError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => workflow_error_to_response(e),
    }
}

/// Parse a path id, answering 400 `invalid_id` on failure.
pub fn parse_id<T: core::str::FromStr>(raw: &str, what: &str) -> Result<T, Response> {
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agencyops_core::{AgencyId, Money, UserId};

    #[test]
    fn workflow_errors_map_to_documented_statuses() {
        let cases = [
            (WorkflowError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (WorkflowError::Config("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (WorkflowError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (WorkflowError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (WorkflowError::AlreadyClaimed { holder: UserId::new() }, StatusCode::CONFLICT),
            (WorkflowError::AlreadyFinalized("validated".into()), StatusCode::CONFLICT),
            (WorkflowError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                WorkflowError::InsufficientFunds {
                    available: Money::new(1),
                    required: Money::new(2),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (WorkflowError::NoAgencyChef(AgencyId::new()), StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{err:?}");
        }
    }
}
