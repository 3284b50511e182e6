//! User repository for credential storage

use async_trait::async_trait;
use auth_service_shared::UserResponse;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// User record as persisted
///
/// Holds the password hash, so it must never be serialized directly;
/// convert to [`UserResponse`] for anything outward facing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Credential store failures
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("email is already registered")]
    DuplicateEmail,

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Credential store
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;

    /// Persist a new user.
    ///
    /// Fails with [`RepositoryError::DuplicateEmail`] if the email is taken,
    /// even when a concurrent insert won the race after the caller's lookup.
    async fn insert(&self, user: &UserRecord) -> Result<(), RepositoryError>;

    /// Cheap connectivity probe for readiness checks
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// PostgreSQL-backed user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert(&self, user: &UserRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(RepositoryError::DuplicateEmail)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        crate::db::health_check(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_projection_drops_password_hash() {
        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            password_hash: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            created_at: now,
            updated_at: now,
        };
        let id = record.id;

        let response = UserResponse::from(record);
        let json = serde_json::to_string(&response).unwrap();

        assert_eq!(response.id, id.to_string());
        assert!(!json.contains("password"));
        assert!(!json.contains("$2b$"));
    }

    // Postgres-backed behaviour is covered in tests/postgres_integration_test.rs
}
