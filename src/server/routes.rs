//! Route definitions for the server

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Creates the main application router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // HTML shell
        .route("/", get(handlers::new_session))
        .route(
            "/sessions/:session_id",
            get(handlers::show_session)
                .post(handlers::submit_form)
                .delete(handlers::end_session),
        )
        .route("/sessions/:session_id/dataset", post(handlers::upload_dataset))
        // JSON API
        .route("/api/sessions", post(handlers::api_create_session))
        .route("/api/sessions/:session_id/dataset", put(handlers::api_put_dataset))
        .route("/api/sessions/:session_id/view", post(handlers::api_view))
        // Add middleware
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Add shared state
        .with_state(state)
}
