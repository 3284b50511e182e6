//! Auth Service Shared Library
//!
//! Wire types and input validation shared between the backend and any
//! client that talks to the authentication API.

pub mod types;
pub mod validation;

// Re-export commonly used items
pub use types::*;
pub use validation::{describe_errors, validate_password_bytes, MAX_PASSWORD_BYTES};
