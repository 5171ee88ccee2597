//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (store answers)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::routes::blocking;
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness probe.
/// Returns 200 once the log store answers a count.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    match store_event_count(&state).await {
        Some(_) => StatusCode::OK,
        None => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let events = store_event_count(&state).await;

    let (status, storage) = match events {
        Some(_) => ("healthy", "ok"),
        None => ("unhealthy", "error"),
    };

    Json(HealthResponse {
        status: status.to_string(),
        storage: storage.to_string(),
        events,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn store_event_count(state: &AppState) -> Option<u64> {
    let store = Arc::clone(&state.store);

    match blocking(move || Ok(store.count()?)).await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
