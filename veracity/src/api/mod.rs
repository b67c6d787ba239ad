pub mod handlers;
pub mod models;


use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Assemble the full HTTP surface.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/v1/detect", post(handlers::detect::detect_text))
        .route("/api/v1/detect/url", post(handlers::detect::detect_url))
        .route("/api/v1/detect/batch", post(handlers::detect::detect_batch))
        .route("/api/v1/jobs/{id}", get(handlers::jobs::job_status))
        .route("/api/v1/usage", get(handlers::usage::usage_status))
        .route(
            "/api/v1/keys",
            post(handlers::api_keys::create_key).get(handlers::api_keys::list_keys),
        )
        .route("/api/v1/keys/{id}", delete(handlers::api_keys::revoke_key))
        .route(
            "/admin/api/v1/blocklist",
            post(handlers::blocklist::add_rule).get(handlers::blocklist::list_rules),
        )
        .route(
            "/admin/api/v1/blocklist/{pattern}",
            delete(handlers::blocklist::remove_rule),
        )
        .route("/admin/api/v1/workers/backfill", post(handlers::workers::run_backfill))
        .route("/admin/api/v1/workers/submissions", post(handlers::workers::run_submissions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
