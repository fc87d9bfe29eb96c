//! Query service endpoints: the joined post + comments view.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use blogbus_core::PostId;
use blogbus_infra::projections::PostThread;

use crate::app::{errors, services::BlogServices};

pub fn router() -> Router {
    Router::new()
        .route("/posts", get(list_threads))
        .route("/posts/:id/comments", get(thread_comments))
}

/// GET /posts
///
/// Map of post id to `{ id, title, comments }`.
pub async fn list_threads(Extension(services): Extension<Arc<BlogServices>>) -> impl IntoResponse {
    let threads: BTreeMap<String, PostThread> = services
        .view()
        .list()
        .into_iter()
        .map(|t| (t.id.to_string(), t))
        .collect();
    Json(threads)
}

/// GET /posts/:id/comments
pub async fn thread_comments(
    Extension(services): Extension<Arc<BlogServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match services.view().comments(&PostId::from(id)) {
        Some(comments) => Json(comments).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "unknown post"),
    }
}
