use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use blogbus_core::DomainError;
use blogbus_events::ValidationError;

use crate::app::event_api::PublishError;
use crate::app::services::CommandError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 400 with the structured issue list.
pub fn validation_error_to_response(err: &ValidationError) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "message": err.to_string(),
            "errors": err.issues(),
        })),
    )
        .into_response()
}

pub fn json_rejection_to_response(err: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_json", err.body_text())
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::MissingField(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::AlreadyExists(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::Mismatch(_) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "mismatch", message),
    }
}

pub fn publish_error_to_response(err: &PublishError) -> axum::response::Response {
    json_error(StatusCode::BAD_GATEWAY, "publish_error", err.to_string())
}

pub fn command_error_to_response(err: CommandError) -> axum::response::Response {
    match err {
        CommandError::Domain(e) => domain_error_to_response(e),
        CommandError::Publish(e) => publish_error_to_response(&e),
    }
}
