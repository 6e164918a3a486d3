use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the route tree.
///
/// ```text
/// GET    /        -> index
/// POST   /jobs    -> start_job
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index::index))
        .route("/jobs", post(handlers::jobs::start_job))
}
