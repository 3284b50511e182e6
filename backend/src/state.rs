//! Application state management
//!
//! This module provides the shared application state that is passed
//! to all request handlers via Axum's state extraction.
//!
//! Everything here is built once at startup: the token keys, the rate
//! limiter and the repository handle. Cloning is O(1).

use crate::auth::{IpRateLimiter, TokenIssuer};
use crate::config::AppConfig;
use crate::repositories::UserRepository;
use crate::services::AuthService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Credential store, also used by readiness checks
    pub users: Arc<dyn UserRepository>,
    pub auth: AuthService,
    /// Signup admission control, one bucket per client IP
    pub rate_limiter: IpRateLimiter,
    /// Present only when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state
    ///
    /// # Note
    /// This derives the JWT keys from the config secret, so it should only
    /// be called once at application startup.
    pub fn new(users: Arc<dyn UserRepository>, config: AppConfig) -> Self {
        let tokens = TokenIssuer::new(config.jwt_secret(), config.jwt.expiry_secs);
        let auth = AuthService::new(
            Arc::clone(&users),
            tokens,
            config.database.operation_timeout(),
        );
        let rate_limiter = IpRateLimiter::from_config(&config.rate_limit);

        Self {
            config: Arc::new(config),
            users,
            auth,
            rate_limiter,
            metrics: None,
        }
    }

    /// Attach an installed Prometheus recorder
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    #[inline]
    pub fn rate_limiter(&self) -> &IpRateLimiter {
        &self.rate_limiter
    }
}
