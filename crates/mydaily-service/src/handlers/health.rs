//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Storage backend in use.
    pub store_backend: &'static str,
    /// Aggregation policy applied to activations.
    pub aggregation_policy: &'static str,
    /// Whether a push transport is configured.
    pub push_configured: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "mydaily",
        version: env!("CARGO_PKG_VERSION"),
        store_backend: state.config.store_backend.as_str(),
        aggregation_policy: state.triggers.aggregator().policy().as_str(),
        push_configured: state.config.fcm.is_configured(),
    })
}
