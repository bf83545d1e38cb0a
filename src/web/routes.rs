//! Route definitions for the HTTP API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::HttpConfig;
use crate::AppState;

use super::api;

/// Create the main router with all routes
pub fn create_router(app_state: Arc<AppState>, config: &HttpConfig) -> Router {
    let cors = if config.cors_enabled {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/api/status", get(api::get_status))
        .route("/api/config", get(api::get_config))
        .route("/api/frame", get(api::get_frame))
        .route("/api/expressions", get(api::list_expressions))
        // Chat input events
        .route("/api/input", post(api::set_input))
        .route("/api/input/focus", post(api::focus_input))
        .route("/api/input/blur", post(api::blur_input))
        .route("/api/speech", post(api::set_speech))
        .route("/api/chat", post(api::send_chat))
        // SSE stream for renderers
        .route("/api/stream", get(api::frame_stream))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
