//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: what each service holds (log + dispatcher, projection, policy)
//! - `routes/`: HTTP routes + handlers (one file per service surface)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses
//! - `event_api.rs`: producer-side client for the bus

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::config::{ServiceConfig, ServiceKind};
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod event_api;
pub mod routes;
pub mod services;

use blogbus_infra::event_bus::BroadcastDispatcher;
use services::{BlogServices, BusServices, ModerationServices, StartupError};

/// A service ready to serve: its router, plus what has to be drained on exit.
#[derive(Debug)]
pub struct App {
    pub router: Router,
    dispatcher: Option<Arc<BroadcastDispatcher>>,
}

impl App {
    /// Deliver whatever the bus still has queued for its subscribers.
    ///
    /// Call once the server has stopped accepting requests. Nothing to do for
    /// services other than the bus.
    pub async fn drain(&self) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.shutdown().await;
        }
    }
}

/// Build the configured service (public entrypoint used by `main.rs`).
///
/// State-owning services replay the bus's history first; if that fails the
/// service does not start.
pub async fn build_app(config: &ServiceConfig) -> Result<App, StartupError> {
    let routes = Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router(config.kind));

    let (routes, dispatcher) = match config.kind {
        ServiceKind::Bus => {
            let bus = Arc::new(BusServices::build(config)?);
            let dispatcher = bus.dispatcher.clone();
            (routes.layer(Extension(bus)), Some(dispatcher))
        }
        ServiceKind::Posts | ServiceKind::Comments | ServiceKind::Query => {
            let blog = Arc::new(BlogServices::bootstrap(config).await?);
            (routes.layer(Extension(blog)), None)
        }
        ServiceKind::Moderation => {
            let moderation = Arc::new(ModerationServices::build(config)?);
            (routes.layer(Extension(moderation)), None)
        }
    };

    Ok(App {
        router: with_common_layers(routes, config.kind),
        dispatcher,
    })
}

fn with_common_layers(routes: Router, kind: ServiceKind) -> Router {
    routes.layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(middleware::trace_requests))
            .layer(Extension(kind)),
    )
}
