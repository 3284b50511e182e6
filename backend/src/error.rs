//! Application error handling
//!
//! This module provides unified error handling for the API,
//! converting internal errors to appropriate HTTP responses.
//! Internal detail is logged here and never reaches the response body.

use crate::auth::TokenError;
use crate::repositories::RepositoryError;
use auth_service_shared::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

pub const USER_EXISTS_MESSAGE: &str = "User already exists";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";
pub const TOO_MANY_REQUESTS_MESSAGE: &str = "Too many requests. Please try again later.";
pub const CONFIGURATION_ERROR_MESSAGE: &str = "Server configuration error";
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Duplicate account. Carries no detail about which field collided.
    #[error("Conflict: user already exists")]
    Conflict,

    /// Unknown email and wrong password are deliberately the same variant
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Store error")]
    Store(#[source] RepositoryError),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateEmail => ApiError::Conflict,
            other => ApiError::Store(other),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingSecret => ApiError::Configuration(err.to_string()),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Configuration(_) | ApiError::Internal(_) | ApiError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Validation(msg) => msg,
            ApiError::Conflict => USER_EXISTS_MESSAGE.to_string(),
            ApiError::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE.to_string(),
            ApiError::TooManyRequests => TOO_MANY_REQUESTS_MESSAGE.to_string(),
            ApiError::Configuration(detail) => {
                error!("Configuration error: {}", detail);
                CONFIGURATION_ERROR_MESSAGE.to_string()
            }
            ApiError::Internal(err) => {
                error!("Internal error: {:?}", err);
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            ApiError::Store(err) => {
                error!("Store error: {:?}", err);
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
