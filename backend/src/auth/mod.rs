//! Authentication module
//!
//! Password hashing (bcrypt), bearer token issuance (HS256 JWT) and the
//! per-IP rate limiter guarding registration.

mod client_ip;
mod jwt;
mod middleware;
mod password;
mod rate_limit;

pub use client_ip::{client_ip, UNKNOWN_CLIENT};
pub use jwt::{Claims, TokenError, TokenIssuer, ALGORITHM};
pub use middleware::enforce_rate_limit;
pub use password::{PasswordService, HASH_COST};
pub use rate_limit::IpRateLimiter;
