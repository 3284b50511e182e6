//! Password hashing using bcrypt
//!
//! Provides salted one-way hashing and constant-time verification.
//!
//! # Performance Considerations
//!
//! bcrypt is intentionally CPU-intensive. Request handlers should use the
//! `_async` variants, which run on the blocking thread pool.

use anyhow::{bail, Result};
use auth_service_shared::MAX_PASSWORD_BYTES;
use std::sync::OnceLock;
use tracing::warn;

/// Work factor, fixed at build time
pub const HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash checked on lookup misses so they cost the same as a mismatch
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Password hashing service
pub struct PasswordService;

impl PasswordService {
    /// Hash a password using bcrypt (blocking operation)
    ///
    /// # Performance Note
    /// This is CPU-intensive. For async contexts, use `hash_async`.
    ///
    /// Fails for passwords over [`MAX_PASSWORD_BYTES`], which bcrypt would
    /// otherwise truncate.
    pub fn hash(password: &str) -> Result<String> {
        if password.len() > MAX_PASSWORD_BYTES {
            bail!("Password exceeds {} bytes", MAX_PASSWORD_BYTES);
        }
        bcrypt::hash(password, HASH_COST)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
    }

    /// Hash a password asynchronously (non-blocking)
    ///
    /// Spawns the CPU-intensive work on a blocking thread pool,
    /// preventing it from blocking the async runtime.
    pub async fn hash_async(password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || Self::hash(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Verify a password against a hash (blocking operation)
    ///
    /// Returns `Ok(false)` on mismatch and an error only when the stored
    /// hash cannot be parsed. A password over [`MAX_PASSWORD_BYTES`] never
    /// matches, since no stored hash can have been made from one.
    pub fn verify(password: &str, hash: &str) -> Result<bool> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        bcrypt::verify(password, hash).map_err(|e| anyhow::anyhow!("Invalid hash format: {}", e))
    }

    /// Verify a password asynchronously (non-blocking)
    ///
    /// Spawns the CPU-intensive work on a blocking thread pool.
    pub async fn verify_async(password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || Self::verify(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Burn one verification's worth of work without a real hash
    pub async fn verify_dummy_async(password: String) {
        let result = tokio::task::spawn_blocking(move || {
            let hash = DUMMY_HASH.get_or_init(|| bcrypt::hash("dummy-password", HASH_COST).ok());
            if let Some(hash) = hash {
                let _ = Self::verify(&password, hash);
            }
        })
        .await;

        if let Err(e) = result {
            warn!("Dummy verification task failed: {}", e);
        }
    }
}
