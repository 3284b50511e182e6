//! Credential store
//!
//! Provides the data access layer for user records.

pub mod memory;
pub mod user;

pub use memory::InMemoryUserRepository;
pub use user::{PgUserRepository, RepositoryError, UserRecord, UserRepository};
