//! Prometheus metrics
//!
//! Counters are recorded through the `metrics` facade. Until a recorder is
//! installed (see [`install_metrics_recorder`]) every call is a no-op, which
//! is what tests and `metrics.enabled = false` rely on.

use crate::error::ApiError;
use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const SIGNUP_TOTAL: &str = "auth_signup_requests_total";
const LOGIN_TOTAL: &str = "auth_login_requests_total";
const RATE_LIMITED_TOTAL: &str = "auth_rate_limited_total";

/// Install the global Prometheus recorder. Call at most once per process.
pub fn install_metrics_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))
}

/// Outcome label for a handler result
pub fn outcome<T>(result: &Result<T, ApiError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(ApiError::Validation(_)) => "invalid",
        Err(ApiError::Conflict) => "conflict",
        Err(ApiError::InvalidCredentials) => "unauthorized",
        Err(ApiError::TooManyRequests) => "rate_limited",
        Err(ApiError::Configuration(_)) => "misconfigured",
        Err(ApiError::Internal(_)) | Err(ApiError::Store(_)) => "error",
    }
}

pub fn record_signup(outcome: &'static str) {
    metrics::counter!(SIGNUP_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_login(outcome: &'static str) {
    metrics::counter!(LOGIN_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!(RATE_LIMITED_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome(&Ok::<(), ApiError>(())), "success");
        assert_eq!(outcome::<()>(&Err(ApiError::Conflict)), "conflict");
        assert_eq!(outcome::<()>(&Err(ApiError::InvalidCredentials)), "unauthorized");
        assert_eq!(
            outcome::<()>(&Err(ApiError::Validation("bad".to_string()))),
            "invalid"
        );
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_signup("success");
        record_login("unauthorized");
        record_rate_limited();
    }
}
