//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - The transaction sync endpoint
//! - Health check
//! - Bearer token authentication middleware

pub mod middleware;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tally_core::sync::CommandDispatcher;
use tally_shared::JwtService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Applies sync commands.
    pub dispatcher: Arc<dyn CommandDispatcher>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
