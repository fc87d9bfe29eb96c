use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde_json::json;

use crate::app::services::BlogServices;
use crate::config::ServiceKind;

/// GET /health
///
/// State-owning services also report how their startup replay went.
pub async fn health(
    Extension(kind): Extension<ServiceKind>,
    blog: Option<Extension<Arc<BlogServices>>>,
) -> Json<serde_json::Value> {
    let mut body = json!({
        "status": "ok",
        "service": kind.as_str(),
    });
    if let (true, Some(Extension(services))) = (kind.owns_state(), blog) {
        body["replay"] = json!(services.replay_report());
    }
    Json(body)
}
