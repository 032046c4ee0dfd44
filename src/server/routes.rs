//! Router configuration for the API server.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use super::handlers;
use super::middleware::{cors_layer, security_headers};
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.settings.max_body_bytes;
    let cors = cors_layer(state.settings.cors_origin.as_deref());

    let router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Collections
        .route(
            "/api/users",
            get(handlers::get_users).post(handlers::post_users),
        )
        .route(
            "/api/guesses",
            get(handlers::get_guesses).post(handlers::post_guesses),
        )
        .route(
            "/api/results",
            get(handlers::get_results).post(handlers::post_results),
        )
        // Read-only aggregates
        .route("/api/stats", get(handlers::stats))
        .route("/api/leaderboard", get(handlers::api_leaderboard))
        .route("/api/system-info", get(handlers::system_info))
        // Maintenance
        .route("/api/backup", post(handlers::backup))
        .route("/api/export-csv", post(handlers::export_csv))
        .route("/api/clear-all", post(handlers::clear_all))
        .route(
            "/api/restart-competition",
            post(handlers::restart_competition),
        )
        .route("/api/restore", post(handlers::restore))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state);

    security_headers(router)
}
