pub mod calendar;
pub mod dto;
pub mod posts;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// Build all routes for the API
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(posts::routes())
        .merge(calendar::routes())
}
