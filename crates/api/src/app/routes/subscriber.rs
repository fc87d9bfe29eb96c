//! `POST /events`: the delivery endpoint every subscriber service exposes.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::debug;

use blogbus_events::{Event, RawEvent, ValidationError, validate};

use crate::app::{
    dto, errors,
    services::{BlogServices, ModerationServices, Verdict},
};

pub fn blog_router() -> Router {
    Router::new().route("/events", post(receive_blog_event))
}

pub fn moderation_router() -> Router {
    Router::new().route("/events", post(receive_moderation_event))
}

/// Validate a delivery. Unknown kinds come back as `Ok(None)`: they are
/// acknowledged and ignored so older services tolerate newer producers.
fn accept(body: Result<Json<RawEvent>, JsonRejection>) -> Result<Option<(RawEvent, Event)>, axum::response::Response> {
    let Json(raw) = body.map_err(errors::json_rejection_to_response)?;

    match validate(&raw) {
        Ok(event) => Ok(Some((raw, event))),
        Err(ValidationError::UnknownKind { kind }) => {
            debug!(%kind, "ignoring unknown event kind");
            Ok(None)
        }
        Err(e) => Err(errors::validation_error_to_response(&e)),
    }
}

fn ack(status: &'static str) -> axum::response::Response {
    (StatusCode::CREATED, Json(dto::Ack::new(status))).into_response()
}

pub async fn receive_blog_event(
    Extension(services): Extension<Arc<BlogServices>>,
    body: Result<Json<RawEvent>, JsonRejection>,
) -> axum::response::Response {
    let (raw, event) = match accept(body) {
        Ok(Some(accepted)) => accepted,
        Ok(None) => return ack("ignored"),
        Err(response) => return response,
    };

    let receipt = services.receive(raw.sequence, &event).await;
    ack(receipt.as_str())
}

pub async fn receive_moderation_event(
    Extension(services): Extension<Arc<ModerationServices>>,
    body: Result<Json<RawEvent>, JsonRejection>,
) -> axum::response::Response {
    let event = match accept(body) {
        Ok(Some((_, event))) => event,
        Ok(None) => return ack("ignored"),
        Err(response) => return response,
    };

    match services.receive(&event).await {
        Ok(Verdict::Published { sequence }) => (
            StatusCode::CREATED,
            Json(json!({ "status": "moderated", "sequence": sequence })),
        )
            .into_response(),
        Ok(Verdict::NotApplicable) => ack("ignored"),
        Err(e) => errors::publish_error_to_response(&e),
    }
}
