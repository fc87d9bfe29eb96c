use axum::Router;

use crate::config::ServiceKind;

pub mod comments;
pub mod events;
pub mod posts;
pub mod query;
pub mod subscriber;
pub mod system;

/// Endpoints served by one kind of service (`/health` is added for all).
pub fn router(kind: ServiceKind) -> Router {
    match kind {
        ServiceKind::Bus => events::router(),
        ServiceKind::Posts => posts::router().merge(subscriber::blog_router()),
        ServiceKind::Comments => comments::router().merge(subscriber::blog_router()),
        ServiceKind::Query => query::router().merge(subscriber::blog_router()),
        ServiceKind::Moderation => subscriber::moderation_router(),
    }
}
