//! Common test utilities for integration tests
//!
//! Builds the full router over the in-memory credential store so the
//! HTTP surface can be exercised without a database.

#![allow(dead_code)]

use auth_service_backend::{
    config::AppConfig, repositories::InMemoryUserRepository, routes, state::AppState,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only-32chars";

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub users: InMemoryUserRepository,
}

impl TestApp {
    /// Create a new test application with a signing secret configured
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a test application that has no signing secret
    pub fn without_secret() -> Self {
        let mut config = test_config();
        config.jwt.secret = None;
        Self::with_config(config)
    }

    pub fn with_config(config: AppConfig) -> Self {
        let users = InMemoryUserRepository::new();
        let state = AppState::new(Arc::new(users.clone()), config);
        let app = routes::create_router(state);

        Self { app, users }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        self.send(request).await
    }

    /// Make a POST request with JSON body on behalf of `client_ip`
    pub async fn post(&self, path: &str, body: &str, client_ip: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .header("X-Forwarded-For", client_ip)
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        (status, body_str)
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.jwt.secret = Some(TEST_SECRET.to_string());
    config
}
