//! Posts service endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};

use blogbus_core::PostId;

use crate::app::{dto, errors, services::BlogServices};

pub fn router() -> Router {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", delete(delete_post))
}

/// GET /posts
///
/// Map of post id to `{ id, title }`.
pub async fn list_posts(Extension(services): Extension<Arc<BlogServices>>) -> impl IntoResponse {
    let posts: BTreeMap<String, dto::PostSummary> = services
        .view()
        .list()
        .into_iter()
        .map(|t| (t.id.to_string(), dto::PostSummary::from(t)))
        .collect();
    Json(posts)
}

/// POST /posts { title }
pub async fn create_post(
    Extension(services): Extension<Arc<BlogServices>>,
    body: Result<Json<dto::CreatePostRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    let title = body.title.clone();
    match services.create_post(body.title).await {
        Ok(id) => (StatusCode::CREATED, Json(dto::PostSummary { id, title })).into_response(),
        Err(e) => errors::command_error_to_response(e),
    }
}

/// DELETE /posts/:id
pub async fn delete_post(
    Extension(services): Extension<Arc<BlogServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PostId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.delete_post(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::command_error_to_response(e),
    }
}
