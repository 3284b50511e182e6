//! In-memory user repository
//!
//! Used by the test suite and by `database.backend = "memory"` for local
//! runs without Postgres. Uniqueness is checked under the same write lock
//! as the insert, which gives the same guarantee as the unique index.

use super::user::{RepositoryError, UserRecord, UserRepository};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-local credential store keyed by email
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self.users.read().get(email).cloned())
    }

    async fn insert(&self, user: &UserRecord) -> Result<(), RepositoryError> {
        let mut users = self.users.write();
        if users.contains_key(&user.email) {
            return Err(RepositoryError::DuplicateEmail);
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
