//! Signup and login orchestration
//!
//! # Performance Optimizations
//!
//! - Password hashing/verification runs on blocking thread pool
//! - Token issuer holds pre-computed keys
//! - Every store call is bounded by the configured operation timeout

use crate::auth::{PasswordService, TokenIssuer};
use crate::error::ApiError;
use crate::repositories::{RepositoryError, UserRecord, UserRepository};
use auth_service_shared::{describe_errors, LoginRequest, SignUpRequest, UserResponse};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// Authentication service
///
/// Cheap to clone: the repository and token keys are behind `Arc`.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenIssuer,
    operation_timeout: Duration,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenIssuer, operation_timeout: Duration) -> Self {
        Self {
            users,
            tokens,
            operation_timeout,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Register a new user and return its public projection
    ///
    /// # Performance
    /// Password hashing is offloaded to blocking thread pool via `spawn_blocking`.
    pub async fn sign_up(&self, req: SignUpRequest) -> Result<UserResponse, ApiError> {
        req.validate()
            .map_err(|e| ApiError::Validation(describe_errors(&e)))?;

        if self.store(self.users.find_by_email(&req.email)).await?.is_some() {
            debug!("Signup rejected: email already registered");
            return Err(ApiError::Conflict);
        }

        let password_hash = PasswordService::hash_async(req.password)
            .await
            .map_err(ApiError::Internal)?;

        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            name: req.name,
            email: req.email,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        // A concurrent signup may have taken the email since the lookup;
        // the store reports that as DuplicateEmail, which maps to Conflict.
        self.store(self.users.insert(&user)).await?;

        info!(user_id = %user.id, "User registered");
        Ok(user.into())
    }

    /// Check credentials and issue a bearer token
    ///
    /// Unknown email and wrong password produce the same error after the
    /// same amount of hashing work.
    pub async fn login(&self, req: LoginRequest) -> Result<String, ApiError> {
        req.validate()
            .map_err(|e| ApiError::Validation(describe_errors(&e)))?;

        let Some(user) = self.store(self.users.find_by_email(&req.email)).await? else {
            // Same bcrypt cost as a mismatch, so timing does not reveal the account
            PasswordService::verify_dummy_async(req.password).await;
            return Err(ApiError::InvalidCredentials);
        };

        let valid = PasswordService::verify_async(req.password, user.password_hash.clone())
            .await
            .map_err(ApiError::Internal)?;

        if !valid {
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id, &user.email)?;

        info!(user_id = %user.id, "User logged in");
        Ok(token)
    }

    /// Run a store operation under the operation timeout. Never retried.
    async fn store<T, F>(&self, operation: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        tokio::time::timeout(self.operation_timeout, operation)
            .await
            .map_err(|_| RepositoryError::Timeout(self.operation_timeout))?
            .map_err(ApiError::from)
    }
}
