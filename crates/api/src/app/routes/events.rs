//! Bus endpoints: ingestion, history reads and dispatch visibility.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::warn;

use blogbus_events::{RawEvent, validate};
use blogbus_infra::event_log::EventLog;

use crate::app::{dto, errors, services::BusServices};

pub fn router() -> Router {
    Router::new()
        .route("/events", post(append_event).get(list_events))
        .route("/dispatch/stats", get(dispatch_stats))
}

/// POST /events
///
/// Validate, append, broadcast. The response never depends on delivery.
pub async fn append_event(
    Extension(services): Extension<Arc<BusServices>>,
    body: Result<Json<RawEvent>, JsonRejection>,
) -> axum::response::Response {
    let Json(raw) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    let event = match validate(&raw) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "rejected event");
            return errors::validation_error_to_response(&e);
        }
    };

    match services.log.append(event) {
        Ok(stored) => (
            StatusCode::CREATED,
            Json(json!({
                "status": "OK",
                "sequence": stored.sequence_number(),
            })),
        )
            .into_response(),
        Err(e) => errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "event_log_error", e.to_string()),
    }
}

/// GET /events?after=n
///
/// Full ordered history (or the tail after `n`), each record carrying its
/// `sequence` and `acceptedAt`.
pub async fn list_events(
    Extension(services): Extension<Arc<BusServices>>,
    Query(query): Query<dto::EventsQuery>,
) -> axum::response::Response {
    let history = match query.after {
        Some(after) => services.log.list_after(after),
        None => services.log.list(),
    };

    match history {
        Ok(events) => Json(events).into_response(),
        Err(e) => errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "event_log_error", e.to_string()),
    }
}

/// GET /dispatch/stats
pub async fn dispatch_stats(Extension(services): Extension<Arc<BusServices>>) -> impl IntoResponse {
    let head = services.log.head().unwrap_or_default();
    Json(json!({
        "head": head,
        "subscribers": services.dispatcher.stats().snapshot(),
    }))
}
