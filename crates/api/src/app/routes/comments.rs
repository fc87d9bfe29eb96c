//! Comments service endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use blogbus_core::PostId;

use crate::app::{dto, errors, services::BlogServices};

pub fn router() -> Router {
    Router::new().route("/posts/:id/comments", get(list_comments).post(create_comment))
}

/// GET /posts/:id/comments
///
/// Comments of a post this service has not heard of yet are simply empty.
pub async fn list_comments(
    Extension(services): Extension<Arc<BlogServices>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let comments = services.view().comments(&PostId::from(id)).unwrap_or_default();
    Json(comments)
}

/// POST /posts/:id/comments { content }
pub async fn create_comment(
    Extension(services): Extension<Arc<BlogServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::CreateCommentRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };
    let post_id: PostId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.create_comment(post_id, body.content).await {
        Ok(comment) => (StatusCode::CREATED, Json(comment)).into_response(),
        Err(e) => errors::command_error_to_response(e),
    }
}
