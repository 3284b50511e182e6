//! Authentication routes
//!
//! Provides endpoints for user registration and login.
//!
//! # Performance Optimizations
//!
//! - Uses pre-computed JWT keys from AppState (no per-request allocation)
//! - Password hashing runs on blocking thread pool (doesn't block async runtime)

use super::extract::JsonBody;
use crate::auth::enforce_rate_limit;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::telemetry;
use auth_service_shared::{LoginRequest, SignUpRequest, TokenResponse, UserResponse};
use axum::{extract::State, http::StatusCode, middleware, routing::post, Json, Router};

/// Create auth routes
///
/// Only signup is rate limited; the limiter needs the state up front.
pub fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/signup",
            post(signup).route_layer(middleware::from_fn_with_state(state, enforce_rate_limit)),
        )
        .route("/login", post(login))
}

/// Register a new user
///
/// POST /api/v1/signup
async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let result = state.auth().sign_up(req).await;
    telemetry::record_signup(telemetry::outcome(&result));
    Ok((StatusCode::CREATED, Json(result?)))
}

/// Login with email and password
///
/// POST /api/v1/login
async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let result = state.auth().login(req).await;
    telemetry::record_login(telemetry::outcome(&result));
    Ok(Json(TokenResponse { token: result? }))
}
