//! Health check endpoint
//!
//! Liveness only: provider reachability is not checked.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    tracing::trace!(port = state.config().server.port, "Health check");
    (StatusCode::OK, Json(HealthResponse { status: "OK" }))
}
