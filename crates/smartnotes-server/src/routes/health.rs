//! Health check endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub store: StoreHealth,
    pub generation_enabled: bool,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub backend: String,
    pub healthy: bool,
}

/// Health check endpoint.
/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store = state.service.store();
    let healthy = match store.health_check().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Card store health check failed");
            false
        }
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            store: StoreHealth {
                backend: store.backend().to_string(),
                healthy,
            },
            generation_enabled: state.service.generation_enabled(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
