//! Health check handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub policies: usize,
}

/// Liveness probe - always returns OK if the service is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - checks the policy store answers
pub async fn ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, StatusCode> {
    match state.billing.list_policies().await {
        Ok(policies) => Ok(Json(ReadyResponse {
            status: "ready",
            policies: policies.len(),
        })),
        Err(e) => {
            tracing::error!(error = ?e, "Policy store health check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
