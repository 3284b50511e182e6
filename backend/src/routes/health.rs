//! Health check endpoints
//!
//! - /health - Basic health check
//! - /health/ready - Readiness probe, pings the credential store
//! - /health/live - Liveness probe, OK whenever the process is serving

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// True when logins can be served, i.e. a signing secret is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_signing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_store: Option<&'static str>,
}

impl HealthResponse {
    fn basic(status: &'static str) -> Self {
        Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
            token_signing: None,
            credential_store: None,
        }
    }
}

/// Basic health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::basic("healthy"))
}

/// Liveness probe
pub async fn liveness_check() -> Json<HealthResponse> {
    Json(HealthResponse::basic("alive"))
}

/// Readiness probe - 503 while the credential store is unreachable.
///
/// A missing signing secret is reported but does not fail readiness:
/// signup still works, and login reports the misconfiguration itself.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let store_ok = match state.users.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Credential store readiness check failed");
            false
        }
    };

    let response = HealthResponse {
        status: if store_ok { "ready" } else { "not_ready" },
        version: env!("CARGO_PKG_VERSION"),
        token_signing: Some(state.auth().tokens().has_secret()),
        credential_store: Some(if store_ok { "healthy" } else { "unhealthy" }),
    };

    if store_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
