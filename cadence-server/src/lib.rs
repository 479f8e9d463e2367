//! cadence-server - REST surface over the Cadence scheduling engine
//!
//! The router is built here rather than in `main` so tests can drive it
//! in-process with `tower::ServiceExt::oneshot`.

pub mod error;
pub mod routes;

use axum::Router;
use libcadence::CadenceService;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
pub struct AppState {
    pub service: CadenceService,
}

impl AppState {
    pub fn new(service: CadenceService) -> Self {
        Self { service }
    }
}

/// Build the full application router
pub fn app(state: Arc<AppState>) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
