//! Rate limiting middleware
//!
//! Applied as a route layer on the signup endpoint. Runs before the body is
//! parsed, so rejected requests never reach validation or the store.

use super::client_ip::client_ip;
use crate::error::ApiError;
use crate::state::AppState;
use crate::telemetry;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use tracing::warn;

/// Reject the request with 429 once its client IP has no tokens left
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // ConnectInfo is absent when the router is driven without a listener (tests)
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let ip = client_ip(
        request.headers(),
        peer,
        state.config().rate_limit.trust_proxy_headers,
    );

    if !state.rate_limiter().admit(&ip) {
        warn!(client_ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
        telemetry::record_rate_limited();
        return Err(ApiError::TooManyRequests);
    }

    Ok(next.run(request).await)
}
