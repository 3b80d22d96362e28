//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{habits, health, triggers, users};
use crate::state::AppState;

/// Maximum concurrent requests for client API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Maximum concurrent manual trigger requests. Sweeps are serialized anyway.
const TRIGGER_MAX_CONCURRENT_REQUESTS: usize = 4;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Client API
/// - `GET /v1/users` - List users
/// - `PUT /v1/users/:user_id/push-token` - Replace a user's push token
/// - `GET /v1/habits` - List habit records in a date range
/// - `POST /v1/habits/:date/:user_id/toggle` - Toggle one habit
///
/// ## Triggers (Service API Key auth)
/// - `POST /v1/triggers/habit-write` - Run the write trigger
/// - `POST /v1/triggers/tick` - Run one sweep
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let trigger_routes = Router::new()
        .route("/habit-write", post(triggers::habit_write))
        .route("/tick", post(triggers::tick))
        .layer(ConcurrencyLimitLayer::new(TRIGGER_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Users
        .route("/users", get(users::list_users))
        .route("/users/:user_id/push-token", put(users::set_push_token))
        // Habits
        .route("/habits", get(habits::list_habits))
        .route("/habits/:date/:user_id/toggle", post(habits::toggle_habit))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        .nest("/triggers", trigger_routes);

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout_seconds)))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
